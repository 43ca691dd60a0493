//! The closed set of value kinds a slice may carry.

use serde::{Deserialize, Serialize};

/// Kinds of slices. Adding a kind is a schema change, never a runtime decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SliceKind {
    ByteSlice = 1,
    ColorSlice = 2,
    DoubleSlice = 3,
    FloatSlice = 4,
    StringSlice = 5,
    UShortSlice = 6,
}

/// How a kind's value is stored in its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// A scalar stored inline.
    Fixed,

    /// A length-prefixed byte vector or string, referenced by offset.
    VariableLength,

    /// A nested record, referenced by offset.
    Reference,
}

impl SliceKind {
    pub const ALL: [SliceKind; 6] = [
        Self::ByteSlice,
        Self::ColorSlice,
        Self::DoubleSlice,
        Self::FloatSlice,
        Self::StringSlice,
        Self::UShortSlice,
    ];

    /// Wire tag, as stored in batch buffers. `0` is never a valid kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn capability(self) -> Capability {
        match self {
            Self::DoubleSlice | Self::FloatSlice | Self::UShortSlice => Capability::Fixed,
            Self::ByteSlice | Self::StringSlice => Capability::VariableLength,
            Self::ColorSlice => Capability::Reference,
        }
    }

    /// Number of fields declared by records of this kind.
    pub fn field_count(self) -> u16 {
        crate::record::SLICE_FIELD_COUNT
    }

    /// Byte width of the index field.
    pub fn index_width(self) -> usize {
        match self {
            Self::ByteSlice | Self::DoubleSlice | Self::FloatSlice | Self::StringSlice => 8,
            Self::ColorSlice => 4,
            Self::UShortSlice => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ByteSlice => "byte",
            Self::ColorSlice => "color",
            Self::DoubleSlice => "double",
            Self::FloatSlice => "float",
            Self::StringSlice => "string",
            Self::UShortSlice => "ushort",
        }
    }
}

impl std::fmt::Display for SliceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in SliceKind::ALL {
            assert_eq!(SliceKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(SliceKind::from_tag(0), None);
        assert_eq!(SliceKind::from_tag(7), None);
    }

    #[test]
    fn test_three_capabilities_cover_all_kinds() {
        let count = |cap| {
            SliceKind::ALL
                .iter()
                .filter(|kind| kind.capability() == cap)
                .count()
        };

        assert_eq!(count(Capability::Fixed), 3);
        assert_eq!(count(Capability::VariableLength), 2);
        assert_eq!(count(Capability::Reference), 1);
        assert!(SliceKind::ALL.iter().all(|kind| kind.field_count() == 2));
    }
}

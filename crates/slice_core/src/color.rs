//! Color-space records referenced by color slices.
//!
//! A color space is its own record holding a tag and a reference to the
//! record with the channel values. Color slices point at it by offset, so
//! the color space lives as long as the buffer, not as long as the slice.

use serde::{Deserialize, Serialize};

use crate::builder::{Offset, SliceBuilder};
use crate::error::{CodecResult, Error, Violation};
use crate::table::{AnyTable, Follow, Inline, Reference, Table};
use crate::verifier::{Verifier, Verify};
use crate::view::BufferView;

pub const COLOR_TAG_FIELD: u16 = 0;
pub const COLOR_VALUE_FIELD: u16 = 1;
pub const COLOR_SPACE_FIELD_COUNT: u16 = 2;

/// Channel records declare four fields in this order.
const CHANNEL_FIELD_COUNT: u16 = 4;

const RGBA_TAG: u8 = 1;
const HSLA_TAG: u8 = 2;

/// A color in one of the supported spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum ColorSpace {
    Rgba(Rgba),
    Hsla(Hsla),
}

/// 8-bit red, green, blue and alpha channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

/// Hue, saturation, lightness and alpha as doubles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hsla {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub alpha: f64,
}

/// Schema marker for the color-space record.
#[derive(Debug)]
pub struct ColorSpaceTable;

/// Schema marker for the RGBA channel record.
#[derive(Debug)]
pub struct RgbaTable;

/// Schema marker for the HSLA channel record.
#[derive(Debug)]
pub struct HslaTable;

impl ColorSpace {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Rgba(_) => RGBA_TAG,
            Self::Hsla(_) => HSLA_TAG,
        }
    }

    /// Write the channel record, then the color-space record referring to it.
    pub fn encode(&self, builder: &mut SliceBuilder) -> CodecResult<Offset<ColorSpaceTable>> {
        let channels = match self {
            Self::Rgba(c) => {
                let handle = builder.start_record(CHANNEL_FIELD_COUNT)?;
                builder.add_field(0, c.red, 0)?;
                builder.add_field(1, c.green, 0)?;
                builder.add_field(2, c.blue, 0)?;
                builder.add_field(3, c.alpha, 0)?;
                builder.end_record(handle)?
            }
            Self::Hsla(c) => {
                let handle = builder.start_record(CHANNEL_FIELD_COUNT)?;
                builder.add_field(0, c.hue, 0.0)?;
                builder.add_field(1, c.saturation, 0.0)?;
                builder.add_field(2, c.lightness, 0.0)?;
                builder.add_field(3, c.alpha, 0.0)?;
                builder.end_record(handle)?
            }
        };

        let handle = builder.start_record(COLOR_SPACE_FIELD_COUNT)?;
        builder.add_field(COLOR_TAG_FIELD, self.tag(), 0)?;
        builder.add_offset_field(COLOR_VALUE_FIELD, Some(channels))?;
        Ok(builder.end_record(handle)?.cast())
    }
}

/// Zero-copy view over an encoded color space.
#[derive(Debug, Clone, Copy)]
pub struct ColorSpaceView<'a> {
    table: Table<'a>,
}

impl<'a> ColorSpaceView<'a> {
    pub fn tag(&self) -> CodecResult<u8> {
        self.table.get(COLOR_TAG_FIELD, 0)
    }

    /// The channel record, reached through one extra offset hop.
    pub fn channels(&self) -> CodecResult<Option<Table<'a>>> {
        self.table
            .get_field::<Reference<AnyTable>>(COLOR_VALUE_FIELD)
    }

    pub fn to_color(&self) -> CodecResult<ColorSpace> {
        let tag = self.tag()?;
        if tag != RGBA_TAG && tag != HSLA_TAG {
            return Err(unknown_tag(tag));
        }

        let channels = self.channels()?.ok_or_else(missing_channels)?;

        match tag {
            RGBA_TAG => Ok(ColorSpace::Rgba(Rgba {
                red: channels.get(0, 0)?,
                green: channels.get(1, 0)?,
                blue: channels.get(2, 0)?,
                alpha: channels.get(3, 0)?,
            })),
            _ => Ok(ColorSpace::Hsla(Hsla {
                hue: channels.get(0, 0.0)?,
                saturation: channels.get(1, 0.0)?,
                lightness: channels.get(2, 0.0)?,
                alpha: channels.get(3, 0.0)?,
            })),
        }
    }
}

fn unknown_tag(tag: u8) -> Error {
    Error::malformed(Violation::UnknownTag {
        what: "color space",
        tag,
    })
}

fn missing_channels() -> Error {
    Error::malformed(Violation::MissingField {
        what: "color space",
        field: COLOR_VALUE_FIELD,
    })
}

impl Follow for ColorSpaceTable {
    type Inner<'a> = ColorSpaceView<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<ColorSpaceView<'a>> {
        Ok(ColorSpaceView {
            table: Table::new(buf, loc),
        })
    }
}

impl Follow for RgbaTable {
    type Inner<'a> = Table<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<Table<'a>> {
        Ok(Table::new(buf, loc))
    }
}

impl Follow for HslaTable {
    type Inner<'a> = Table<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<Table<'a>> {
        Ok(Table::new(buf, loc))
    }
}

impl Verify for ColorSpaceTable {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let mut table = verifier.visit_table(pos)?;
        table.field::<Inline<u8>>(COLOR_TAG_FIELD)?;

        let channels = match table.table().get(COLOR_TAG_FIELD, 0)? {
            RGBA_TAG => table.field::<Reference<RgbaTable>>(COLOR_VALUE_FIELD)?,
            HSLA_TAG => table.field::<Reference<HslaTable>>(COLOR_VALUE_FIELD)?,
            tag => return Err(unknown_tag(tag)),
        };
        if channels.is_none() {
            return Err(missing_channels());
        }

        table.finish();
        Ok(())
    }
}

impl Verify for RgbaTable {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let mut table = verifier.visit_table(pos)?;
        for field in 0..CHANNEL_FIELD_COUNT {
            table.field::<Inline<u8>>(field)?;
        }
        table.finish();
        Ok(())
    }
}

impl Verify for HslaTable {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let mut table = verifier.visit_table(pos)?;
        for field in 0..CHANNEL_FIELD_COUNT {
            table.field::<Inline<f64>>(field)?;
        }
        table.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::{verify, VerifierOptions};

    fn encode_root(color: ColorSpace) -> Vec<u8> {
        let mut builder = SliceBuilder::new();
        let root = color.encode(&mut builder).unwrap();
        builder.finish(root).unwrap()
    }

    fn decode_root(buf: &[u8]) -> CodecResult<ColorSpace> {
        let table = Table::root(buf)?;
        ColorSpaceTable::follow(table.buffer(), table.position())?.to_color()
    }

    #[test]
    fn test_rgba() {
        let color = ColorSpace::Rgba(Rgba {
            red: 255,
            green: 0,
            blue: 128,
            alpha: 255,
        });
        let buf = encode_root(color);

        assert_eq!(decode_root(&buf).unwrap(), color);
        verify::<ColorSpaceTable>(&buf, &VerifierOptions::default()).unwrap();
    }

    #[test]
    fn test_hsla() {
        let color = ColorSpace::Hsla(Hsla {
            hue: 210.0,
            saturation: 0.5,
            lightness: 0.0,
            alpha: 1.0,
        });
        let buf = encode_root(color);

        assert_eq!(decode_root(&buf).unwrap(), color);
        verify::<ColorSpaceTable>(&buf, &VerifierOptions::default()).unwrap();
    }

    #[test]
    fn test_unknown_tag() {
        let mut builder = SliceBuilder::new();
        let handle = builder.start_record(COLOR_SPACE_FIELD_COUNT).unwrap();
        builder.add_field(COLOR_TAG_FIELD, 9_u8, 0).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let expected = Error::MalformedBuffer(Violation::UnknownTag {
            what: "color space",
            tag: 9,
        });
        assert_eq!(decode_root(&buf).unwrap_err(), expected);
        assert_eq!(
            verify::<ColorSpaceTable>(&buf, &VerifierOptions::default()).unwrap_err(),
            expected
        );
    }

    #[test]
    fn test_missing_channels() {
        let mut builder = SliceBuilder::new();
        let handle = builder.start_record(COLOR_SPACE_FIELD_COUNT).unwrap();
        builder.add_field(COLOR_TAG_FIELD, RGBA_TAG, 0).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let expected = Error::MalformedBuffer(Violation::MissingField {
            what: "color space",
            field: COLOR_VALUE_FIELD,
        });
        assert_eq!(decode_root(&buf).unwrap_err(), expected);
        assert_eq!(
            verify::<ColorSpaceTable>(&buf, &VerifierOptions::default()).unwrap_err(),
            expected
        );
    }

    #[test]
    fn test_color_slice_with_missing_channels_fails_verification() {
        use crate::record::{SLICE_FIELD_COUNT, VALUE_FIELD};
        use crate::value::SliceKind;
        use crate::verifier::verify_slice;

        let mut builder = SliceBuilder::new();
        let handle = builder.start_record(COLOR_SPACE_FIELD_COUNT).unwrap();
        builder.add_field(COLOR_TAG_FIELD, RGBA_TAG, 0).unwrap();
        let color = builder.end_record(handle).unwrap();

        let handle = builder.start_record(SLICE_FIELD_COUNT).unwrap();
        builder.add_offset_field(VALUE_FIELD, Some(color)).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let expected = Error::MalformedBuffer(Violation::MissingField {
            what: "color space",
            field: COLOR_VALUE_FIELD,
        });
        assert_eq!(
            verify_slice(SliceKind::ColorSlice, &buf, &VerifierOptions::default()).unwrap_err(),
            expected
        );
        assert_eq!(
            crate::record::Slice::decode(SliceKind::ColorSlice, &buf).unwrap_err(),
            expected
        );
    }
}

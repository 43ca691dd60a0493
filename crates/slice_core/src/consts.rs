//! Wire layout constants shared between the builder, the decoder and the verifier.
//!
//! All multi-byte values are little endian.

/// Unsigned offset to a child (string, vector or record), relative to where it is stored.
pub type UOffset = u32;
/// Signed offset from a record to its vtable. `vtable = record - soffset`.
pub type SOffset = i32;
/// Entry inside a vtable: a byte offset relative to the record start. `0` means absent.
pub type VOffset = u16;

pub const SIZE_UOFFSET: usize = std::mem::size_of::<UOffset>();
pub const SIZE_SOFFSET: usize = std::mem::size_of::<SOffset>();
pub const SIZE_VOFFSET: usize = std::mem::size_of::<VOffset>();

/// Byte size of the buffer header holding the root offset.
pub const ROOT_HEADER_SIZE: usize = SIZE_UOFFSET;

/// Vtable header: vtable byte size, then record inline byte size.
pub const VTABLE_HEADER_SIZE: usize = 2 * SIZE_VOFFSET;

/// Vector and string length prefix (element count).
pub const SIZE_LEN_PREFIX: usize = SIZE_UOFFSET;

/// Largest buffer the builder produces. Every offset fits a positive `i32`.
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;

/// Strings carry one uncounted zero byte after their contents.
pub const STRING_TERMINATOR: u8 = 0;

/// Byte position of a field's entry inside a vtable.
pub const fn vtable_entry_pos(field: u16) -> usize {
    VTABLE_HEADER_SIZE + field as usize * SIZE_VOFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vtable_entry_positions() {
        assert_eq!(vtable_entry_pos(0), 4);
        assert_eq!(vtable_entry_pos(1), 6);
        assert_eq!(vtable_entry_pos(2), 8);
    }
}

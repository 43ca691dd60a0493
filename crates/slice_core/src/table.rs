//! Zero-copy record access: the buffer header, vtable lookups and typed field reads.
//!
//! A record starts with a signed offset to its vtable (`vtable = record - soffset`).
//! The vtable holds its own byte size, the record's inline byte size and one
//! 2-byte entry per declared field. An entry of `0`, or a field beyond the
//! declared count, means the field was elided and its default applies.

use std::marker::PhantomData;

use crate::consts::{vtable_entry_pos, SOffset, VOffset, ROOT_HEADER_SIZE, VTABLE_HEADER_SIZE};
use crate::error::{CodecResult, Error, Violation};
use crate::scalar::Scalar;
use crate::view::BufferView;

/// Types that can be located at a position inside a buffer.
pub trait Follow {
    /// The borrowed value produced by following a position.
    type Inner<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<Self::Inner<'a>>;
}

/// Types with a fixed inline width. These can be record fields and vector elements.
pub trait Element: Follow {
    const WIDTH: usize;
}

/// A scalar stored in place.
#[derive(Debug)]
pub struct Inline<T>(PhantomData<T>);

/// A 4-byte offset stored in place, pointing forward to a `T`.
///
/// Reading it costs one extra hop compared to [Inline].
#[derive(Debug)]
pub struct Reference<T>(PhantomData<T>);

/// A record whose schema is not known statically.
#[derive(Debug)]
pub struct AnyTable;

impl<T: Scalar> Follow for Inline<T> {
    type Inner<'a> = T;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<T> {
        buf.read(loc)
    }
}

impl<T: Scalar> Element for Inline<T> {
    const WIDTH: usize = T::SIZE;
}

impl<T: Follow> Follow for Reference<T> {
    type Inner<'a> = T::Inner<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<Self::Inner<'a>> {
        let target = buf.follow_offset(loc)?;
        T::follow(buf, target)
    }
}

impl<T: Follow> Element for Reference<T> {
    const WIDTH: usize = crate::consts::SIZE_UOFFSET;
}

impl Follow for AnyTable {
    type Inner<'a> = Table<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<Table<'a>> {
        Ok(Table::new(buf, loc))
    }
}

/// Reads the buffer header: the little-endian offset from byte 0 to the root record.
pub fn root_offset(bytes: &[u8]) -> CodecResult<usize> {
    if bytes.len() < ROOT_HEADER_SIZE {
        return Err(Error::malformed(Violation::TooShort {
            needed: ROOT_HEADER_SIZE,
            len: bytes.len(),
        }));
    }

    let value: SOffset = BufferView::new(bytes).read(0)?;
    match usize::try_from(value) {
        Ok(pos) => Ok(pos),
        Err(_) => Err(Error::malformed(Violation::NegativeOffset { pos: 0, value })),
    }
}

/// A view over one record inside a buffer.
#[derive(Clone, Copy, Debug)]
pub struct Table<'a> {
    buf: BufferView<'a>,
    pos: usize,
}

impl<'a> Table<'a> {
    pub fn new(buf: BufferView<'a>, pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Wrap the root record of a finished buffer.
    pub fn root(bytes: &'a [u8]) -> CodecResult<Self> {
        let pos = root_offset(bytes)?;
        Ok(Self::new(BufferView::new(bytes), pos))
    }

    /// Absolute position of the record in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn buffer(&self) -> BufferView<'a> {
        self.buf
    }

    /// Absolute position of this record's vtable.
    pub fn vtable_position(&self) -> CodecResult<usize> {
        let soffset: SOffset = self.buf.read(self.pos)?;
        let vtable = self.pos as i64 - soffset as i64;

        match usize::try_from(vtable) {
            Ok(vtable) if vtable < self.buf.len() => Ok(vtable),
            _ => Err(Error::malformed(Violation::VtableOutOfBounds {
                record: self.pos,
                soffset,
            })),
        }
    }

    /// Number of fields the writer declared for this record.
    pub fn declared_fields(&self) -> CodecResult<u16> {
        let vtable_size: VOffset = self.buf.read(self.vtable_position()?)?;
        Ok((vtable_size as usize).saturating_sub(VTABLE_HEADER_SIZE) as u16 / 2)
    }

    /// Byte size of the record's inline part (vtable offset plus inline fields).
    pub fn inline_size(&self) -> CodecResult<u16> {
        self.buf.read(self.vtable_position()? + 2)
    }

    /// Position of `field` inside the buffer, or `None` when it is absent and
    /// readers must use the field's default.
    pub fn field_offset(&self, field: u16) -> CodecResult<Option<usize>> {
        let vtable = self.vtable_position()?;
        let vtable_size: VOffset = self.buf.read(vtable)?;

        let entry = vtable_entry_pos(field);
        if entry + 2 > vtable_size as usize {
            return Ok(None);
        }

        match self.buf.read::<VOffset>(vtable + entry)? {
            0 => Ok(None),
            offset => Ok(Some(self.pos + offset as usize)),
        }
    }

    /// Read a scalar field, falling back to `default` when the field is absent.
    pub fn get<T: Scalar>(&self, field: u16, default: T) -> CodecResult<T> {
        match self.field_offset(field)? {
            Some(pos) => self.buf.read(pos),
            None => Ok(default),
        }
    }

    /// Follow a field of any kind. `None` when the field is absent.
    pub fn get_field<F: Follow>(&self, field: u16) -> CodecResult<Option<F::Inner<'a>>> {
        self.field_offset(field)?
            .map(|pos| F::follow(self.buf, pos))
            .transpose()
    }
}

//! Variable-length payloads referenced by offset from a parent record.
//!
//! A vector is a 4-byte element count followed by densely packed elements.
//! Elements are either fixed-size scalars or 4-byte offsets to sub-records.
//! A string is a byte vector followed by one zero byte that is not counted.

use std::marker::PhantomData;

use crate::consts::{SIZE_LEN_PREFIX, STRING_TERMINATOR};
use crate::error::{CodecResult, Error};
use crate::scalar::Scalar;
use crate::table::{Element, Follow, Inline};
use crate::view::BufferView;

/// How string contents are checked on the way in and out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StringMode {
    /// Contents must be valid UTF-8.
    #[default]
    Strict,

    /// Contents are raw bytes.
    Lenient,
}

/// A length-prefixed sequence of `E`.
#[derive(Debug)]
pub struct Vector<E>(PhantomData<E>);

/// A length-prefixed, zero-terminated string.
#[derive(Debug)]
pub struct Str;

impl<E: Element> Follow for Vector<E> {
    type Inner<'a> = VectorView<'a, E>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<Self::Inner<'a>> {
        let len: u32 = buf.read(loc)?;

        Ok(VectorView {
            buf,
            start: loc + SIZE_LEN_PREFIX,
            len: len as usize,
            marker: PhantomData,
        })
    }
}

impl Follow for Str {
    type Inner<'a> = StrView<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<StrView<'a>> {
        let len: u32 = buf.read(loc)?;
        let start = loc + SIZE_LEN_PREFIX;
        let bytes = buf.slice(start, len as usize)?;

        Ok(StrView { buf, start, bytes })
    }
}

/// Zero-copy view over an encoded vector.
pub struct VectorView<'a, E> {
    buf: BufferView<'a>,
    start: usize,
    len: usize,
    marker: PhantomData<E>,
}

impl<E> Clone for VectorView<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for VectorView<'_, E> {}

impl<E> std::fmt::Debug for VectorView<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorView")
            .field("start", &self.start)
            .field("len", &self.len)
            .finish()
    }
}

impl<'a, E: Element> VectorView<'a, E> {
    /// The default value of an absent vector field.
    pub fn empty() -> Self {
        Self {
            buf: BufferView::empty(),
            start: 0,
            len: 0,
            marker: PhantomData,
        }
    }

    /// Stored element count.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element `index`, bounds-checked against the stored length.
    pub fn get(&self, index: usize) -> CodecResult<E::Inner<'a>> {
        if index >= self.len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        E::follow(self.buf, self.start + index * E::WIDTH)
    }

    pub fn iter(&self) -> impl Iterator<Item = CodecResult<E::Inner<'a>>> + '_ {
        (0..self.len).map(move |index| self.get(index))
    }
}

impl<'a, T: Scalar> VectorView<'a, Inline<T>> {
    /// Copy every element out of the buffer.
    pub fn to_vec(&self) -> CodecResult<Vec<T>> {
        self.iter().collect()
    }
}

impl<'a> VectorView<'a, Inline<u8>> {
    /// The element bytes, borrowed straight from the buffer.
    pub fn bytes(&self) -> CodecResult<&'a [u8]> {
        self.buf.slice(self.start, self.len)
    }
}

/// Zero-copy view over an encoded string.
#[derive(Clone, Copy, Debug)]
pub struct StrView<'a> {
    buf: BufferView<'a>,
    start: usize,
    bytes: &'a [u8],
}

impl<'a> StrView<'a> {
    /// The default value of an absent string field.
    pub fn empty() -> Self {
        Self {
            buf: BufferView::new(&[STRING_TERMINATOR]),
            start: 0,
            bytes: &[],
        }
    }

    /// Byte length, not counting the terminator.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw contents (lenient mode).
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Contents as UTF-8 (strict mode).
    pub fn as_str(&self) -> CodecResult<&'a str> {
        Ok(std::str::from_utf8(self.bytes)?)
    }

    /// Whether the uncounted zero byte follows the contents.
    pub fn is_terminated(&self) -> bool {
        matches!(
            self.buf.read::<u8>(self.start + self.bytes.len()),
            Ok(STRING_TERMINATOR)
        )
    }
}

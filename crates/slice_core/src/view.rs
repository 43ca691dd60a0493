//! Bounds-checked access into an encoded buffer.

use crate::error::{CodecResult, Error, Violation};
use crate::scalar::Scalar;

/// A reference into an existing slice of bytes.
///
/// Every read is bounds-checked and reported as [Error::MalformedBuffer]
/// instead of panicking. The viewer never copies or mutates the slice, so
/// any number of viewers may share one buffer across threads.
#[derive(Clone, Copy, Debug)]
pub struct BufferView<'a> {
    bytes: &'a [u8],
}

impl<'a> BufferView<'a> {
    /// Create a new viewer on a byte slice
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// A viewer over nothing. Used for default (absent) vectors and strings.
    pub fn empty() -> Self {
        Self { bytes: &[] }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The underlying bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the `len` bytes starting at `pos`.
    pub fn slice(&self, pos: usize, len: usize) -> CodecResult<&'a [u8]> {
        pos.checked_add(len)
            .and_then(|end| self.bytes.get(pos..end))
            .ok_or_else(|| {
                Error::malformed(Violation::OutOfBounds {
                    pos,
                    len,
                    buffer_len: self.bytes.len(),
                })
            })
    }

    /// Read a little-endian scalar at `pos`.
    pub fn read<T: Scalar>(&self, pos: usize) -> CodecResult<T> {
        self.slice(pos, T::SIZE).map(T::read_le)
    }

    /// Check that `len` bytes starting at `pos` lie inside the buffer.
    pub fn check_span(&self, pos: usize, len: usize) -> CodecResult<()> {
        self.slice(pos, len).map(|_| ())
    }

    /// Resolve an unsigned offset stored at `pos` into the absolute position it points at.
    pub fn follow_offset(&self, pos: usize) -> CodecResult<usize> {
        let offset: u32 = self.read(pos)?;

        pos.checked_add(offset as usize).ok_or_else(|| {
            Error::malformed(Violation::OutOfBounds {
                pos,
                len: offset as usize,
                buffer_len: self.bytes.len(),
            })
        })
    }
}

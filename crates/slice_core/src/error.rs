//! Error implementations

use thiserror::Error;

use crate::fsm::{BuilderEvent, BuilderState};

/// Result type used throughout the codec.
pub type CodecResult<T> = std::result::Result<T, Error>;

/// Custom error object for this library
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The buffer cannot hold the structure an accessor or the verifier expected.
    ///
    /// Fatal to the decode call. Never retried by the codec.
    #[error("malformed buffer: {0}")]
    MalformedBuffer(Violation),

    /// Vector or string element access beyond the stored length.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The encoder API was called out of sequence.
    ///
    /// This is a bug in the producer. The builder refuses any further calls.
    #[error("builder misuse: {0}")]
    BuilderMisuse(Misuse),

    /// String data is not valid UTF-8 in strict mode.
    #[error("invalid utf-8 string data: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Structural problems found while reading a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("buffer of {len} bytes is shorter than the {needed} bytes required")]
    TooShort { needed: usize, len: usize },

    #[error("read of {len} bytes at {pos} exceeds buffer of {buffer_len} bytes")]
    OutOfBounds {
        pos: usize,
        len: usize,
        buffer_len: usize,
    },

    #[error("negative offset {value} at {pos}")]
    NegativeOffset { pos: usize, value: i32 },

    #[error("record at {record} points to a vtable outside the buffer (soffset {soffset})")]
    VtableOutOfBounds { record: usize, soffset: i32 },

    #[error("vtable at {pos} declares invalid size {size}")]
    InvalidVtable { pos: usize, size: u16 },

    #[error("record at {pos} declares invalid inline size {size}")]
    InvalidRecordSize { pos: usize, size: u16 },

    #[error("field {field} at offset {offset} overruns record of {record_size} bytes")]
    FieldOutsideRecord {
        field: u16,
        offset: u16,
        record_size: u16,
    },

    #[error("string at {pos} is missing its zero terminator")]
    MissingTerminator { pos: usize },

    #[error("nesting deeper than {limit} records")]
    DepthLimit { limit: usize },

    #[error("more than {limit} records")]
    TableLimit { limit: usize },

    #[error("batch holds {kinds} kind tags for {slices} slices")]
    LengthMismatch { kinds: usize, slices: usize },

    #[error("unknown {what} tag {tag}")]
    UnknownTag { what: &'static str, tag: u8 },

    #[error("{what} is missing field {field}")]
    MissingField { what: &'static str, field: u16 },
}

/// Ways the encoder API can be driven incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Misuse {
    #[error("{event:?} is not allowed while the builder is {state:?}")]
    OutOfSequence {
        state: BuilderState,
        event: BuilderEvent,
    },

    #[error("builder was poisoned by an earlier misuse")]
    Poisoned,

    #[error("field {field} added after field {last}")]
    FieldOutOfOrder { field: u16, last: u16 },

    #[error("field {field} exceeds the record's {field_count} declared fields")]
    FieldOutOfRange { field: u16, field_count: u16 },

    #[error("record handle does not belong to the open record")]
    StaleHandle,

    #[error("offset {offset} does not refer to finished data ({used} bytes written)")]
    UnknownOffset { offset: u32, used: u32 },

    #[error("element of {got} bytes pushed into a vector of {expected}-byte elements")]
    ElementSizeMismatch { expected: usize, got: usize },

    #[error("vector declared {declared} elements but received {pushed}")]
    VectorLengthMismatch { declared: usize, pushed: usize },

    #[error("record declares {field_count} fields, at most {max} fit a vtable")]
    TooManyFields { field_count: u16, max: u16 },

    #[error("record inline size {size} does not fit a vtable entry")]
    RecordTooLarge { size: usize },

    #[error("buffer would grow past {limit} bytes")]
    BufferTooLarge { limit: usize },
}

impl Error {
    pub(crate) fn malformed(violation: Violation) -> Self {
        Self::MalformedBuffer(violation)
    }

    pub(crate) fn misuse(misuse: Misuse) -> Self {
        Self::BuilderMisuse(misuse)
    }
}

impl From<Violation> for Error {
    fn from(value: Violation) -> Self {
        Self::MalformedBuffer(value)
    }
}

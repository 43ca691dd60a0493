//! Indexed slices and the buffer format that carries them.
//!
//! A slice is an (index, value) pair of one of six fixed kinds. Slices are
//! encoded as records in a table/vtable buffer: every record points at a
//! small table of field offsets, absent fields cost nothing, and readers
//! that know fewer or more fields than the writer still agree on the rest.
//!
//! Encoding goes through a [SliceBuilder], which writes back to front.
//! Decoding never copies: [SliceView], [BatchView] and friends read straight
//! out of the borrowed buffer, and every read is bounds-checked. Buffers from
//! outside the trust boundary can additionally be walked once by the
//! [verifier] before use.
//!
//! ```
//! use slice_core::{DoubleSlice, Slice, SliceKind};
//!
//! let bytes = DoubleSlice::new(7, 0.25).encode().unwrap();
//! let slice = Slice::decode(SliceKind::DoubleSlice, &bytes).unwrap();
//! assert_eq!(slice, DoubleSlice::new(7, 0.25).into());
//! ```

pub mod batch;
pub mod builder;
pub mod color;
pub mod consts;
pub mod error;
pub mod fsm;
pub mod record;
pub mod scalar;
pub mod table;
pub mod value;
pub mod vector;
pub mod verifier;
pub mod view;

pub use batch::{encode_batch, encode_batch_into, verify_batch, BatchView};
pub use builder::{Offset, RecordHandle, SliceBuilder};
pub use color::{ColorSpace, Hsla, Rgba};
pub use error::{CodecResult, Error, Misuse, Violation};
pub use record::{
    ByteSlice, ColorSlice, DoubleSlice, FloatSlice, Slice, SliceRecord, SliceValue, SliceView,
    StringSlice, UShortSlice,
};
pub use table::Table;
pub use value::{Capability, SliceKind};
pub use vector::StringMode;
pub use verifier::{verify, verify_slice, VerifierOptions};

/// Default constants used by builders and verifiers.
pub mod defaults {

    /// Initial byte capacity of a new builder. Grows by doubling.
    pub const DEFAULT_BUILDER_CAPACITY: usize = 1024;

    /// Deepest chain of nested records a verifier follows.
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    /// Most records a verifier visits in one pass.
    pub const DEFAULT_MAX_TABLES: usize = 1_000_000;
}

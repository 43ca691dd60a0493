//! Command-line args for slicec

use std::{fmt::Display, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use slice_core::{SliceKind, StringMode, VerifierOptions};

/// Encode, decode and verify indexed-slice buffers
#[derive(Parser)]
#[clap(name = "slicec", version)]
pub(crate) struct CliArgs {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Encode a single slice.
    Encode {
        /// The kind of slice to encode.
        #[clap(short, long)]
        kind: KindArg,

        /// The slice index.
        #[clap(short, long)]
        #[clap(default_value_t = 0)]
        index: u64,

        /// The value: a number, text, hex bytes, or `rgba:r,g,b,a` / `hsla:h,s,l,a` / `none` for colors.
        #[clap(short, long)]
        #[clap(default_value = "")]
        value: String,

        /// Write fields even when they hold the default value.
        #[clap(long)]
        force_defaults: bool,

        #[clap(flatten)]
        output: OutputArgs,
    },

    /// Encode a JSON array of slices into one batch buffer.
    EncodeBatch {
        /// JSON file holding the slices, e.g. `[{"kind": "double", "index": 7, "value": 0.5}]`.
        #[clap(short, long)]
        input: PathBuf,

        #[clap(flatten)]
        output: OutputArgs,
    },

    /// Decode a buffer and print its slices as JSON.
    Decode {
        /// Kind of a single-slice buffer. Omit for batch buffers.
        #[clap(short, long)]
        kind: Option<KindArg>,

        #[clap(flatten)]
        input: InputArgs,

        /// Verify the buffer before decoding it.
        #[clap(long)]
        verify: bool,

        /// Pretty-print the JSON output.
        #[clap(long)]
        pretty: bool,
    },

    /// Verify a buffer without decoding it.
    Verify {
        /// Kind of a single-slice buffer. Omit for batch buffers.
        #[clap(short, long)]
        kind: Option<KindArg>,

        #[clap(flatten)]
        input: InputArgs,

        #[clap(flatten)]
        limits: LimitArgs,
    },
}

/// Where an encoded buffer comes from
#[derive(Args)]
#[group(required = true, multiple = false)]
pub(crate) struct InputArgs {
    /// Read the buffer from a file.
    #[clap(short, long)]
    pub file: Option<PathBuf>,

    /// Read the buffer from a hex string.
    #[clap(long)]
    pub hex: Option<String>,
}

/// Where an encoded buffer goes
#[derive(Args)]
pub(crate) struct OutputArgs {
    /// Write the buffer to a file instead of printing it as hex.
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

/// Verifier limits
#[derive(Args)]
pub(crate) struct LimitArgs {
    /// Deepest chain of nested records to follow.
    #[clap(long)]
    #[clap(default_value_t = slice_core::defaults::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Most records to visit.
    #[clap(long)]
    #[clap(default_value_t = slice_core::defaults::DEFAULT_MAX_TABLES)]
    pub max_tables: usize,

    /// Accept strings that are not valid UTF-8.
    #[clap(long)]
    pub lenient: bool,
}

impl From<&LimitArgs> for VerifierOptions {
    fn from(args: &LimitArgs) -> Self {
        Self {
            max_depth: args.max_depth,
            max_tables: args.max_tables,
            string_mode: match args.lenient {
                true => StringMode::Lenient,
                false => StringMode::Strict,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum KindArg {
    /// A byte vector, given as hex.
    Byte,

    /// An RGBA or HSLA color.
    Color,

    /// A 64-bit float.
    Double,

    /// A 32-bit float.
    Float,

    /// A UTF-8 string.
    String,

    /// An unsigned 16-bit integer with an 8-bit index.
    #[value(name = "ushort")]
    UShort,
}

impl From<KindArg> for SliceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Byte => SliceKind::ByteSlice,
            KindArg::Color => SliceKind::ColorSlice,
            KindArg::Double => SliceKind::DoubleSlice,
            KindArg::Float => SliceKind::FloatSlice,
            KindArg::String => SliceKind::StringSlice,
            KindArg::UShort => SliceKind::UShortSlice,
        }
    }
}

impl Display for KindArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", SliceKind::from(*self))
    }
}

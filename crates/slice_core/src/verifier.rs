//! Hardening mode: a single structural walk over an untrusted buffer.
//!
//! Accessors on views only check what they touch. Buffers arriving from
//! outside the trust boundary can be verified once up front; after a
//! successful walk every typed accessor of the verified schema is known to
//! stay inside the buffer.

use crate::consts::{
    vtable_entry_pos, VOffset, SIZE_LEN_PREFIX, SIZE_SOFFSET, SIZE_UOFFSET, STRING_TERMINATOR,
    VTABLE_HEADER_SIZE,
};
use crate::error::{CodecResult, Error, Violation};
use crate::record::verify_kind;
use crate::scalar::Scalar;
use crate::table::{root_offset, AnyTable, Element, Inline, Reference, Table};
use crate::value::SliceKind;
use crate::vector::{Str, StringMode, Vector};
use crate::view::BufferView;

/// Limits and string handling for a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Deepest allowed chain of nested records.
    pub max_depth: usize,

    /// Most records visited in one pass.
    pub max_tables: usize,

    /// Whether strings must hold valid UTF-8.
    pub string_mode: StringMode,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            max_depth: crate::defaults::DEFAULT_MAX_DEPTH,
            max_tables: crate::defaults::DEFAULT_MAX_TABLES,
            string_mode: StringMode::Strict,
        }
    }
}

/// Schema types that know how to check their own encoding at a position.
pub trait Verify {
    /// Scalars need no walk beyond their span.
    const INLINE: bool = false;

    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()>;
}

/// State of one verification pass.
#[derive(Debug)]
pub struct Verifier<'a> {
    buf: BufferView<'a>,
    options: VerifierOptions,
    depth: usize,
    tables: usize,
}

impl<'a> Verifier<'a> {
    pub fn new(bytes: &'a [u8], options: VerifierOptions) -> Self {
        Self {
            buf: BufferView::new(bytes),
            options,
            depth: 0,
            tables: 0,
        }
    }

    pub fn buffer(&self) -> BufferView<'a> {
        self.buf
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Number of records visited so far.
    pub fn tables_visited(&self) -> usize {
        self.tables
    }

    pub fn in_bounds(&self, pos: usize, len: usize) -> CodecResult<()> {
        self.buf.check_span(pos, len)
    }

    /// Check a vector header at `pos` and its element span. Returns the first
    /// element position and the element count.
    pub fn vector_span(&self, pos: usize, width: usize) -> CodecResult<(usize, usize)> {
        let len: u32 = self.buf.read(pos)?;
        let start = pos + SIZE_LEN_PREFIX;

        let total = (len as usize).checked_mul(width).ok_or_else(|| {
            Error::malformed(Violation::OutOfBounds {
                pos: start,
                len: usize::MAX,
                buffer_len: self.buf.len(),
            })
        })?;
        self.in_bounds(start, total)?;

        Ok((start, len as usize))
    }

    /// Check the record header and vtable at `pos`.
    pub fn visit_table(&mut self, pos: usize) -> CodecResult<TableVerifier<'_, 'a>> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(Error::malformed(Violation::DepthLimit {
                limit: self.options.max_depth,
            }));
        }

        self.tables += 1;
        if self.tables > self.options.max_tables {
            return Err(Error::malformed(Violation::TableLimit {
                limit: self.options.max_tables,
            }));
        }

        let table = Table::new(self.buf, pos);
        let vtable = table.vtable_position()?;

        let vtable_size: VOffset = self.buf.read(vtable)?;
        if (vtable_size as usize) < VTABLE_HEADER_SIZE || vtable_size % 2 != 0 {
            return Err(Error::malformed(Violation::InvalidVtable {
                pos: vtable,
                size: vtable_size,
            }));
        }
        self.in_bounds(vtable, vtable_size as usize)?;

        let inline_size = table.inline_size()?;
        if (inline_size as usize) < SIZE_UOFFSET {
            return Err(Error::malformed(Violation::InvalidRecordSize {
                pos,
                size: inline_size,
            }));
        }
        self.in_bounds(pos, inline_size as usize)?;

        Ok(TableVerifier {
            verifier: self,
            table,
            vtable,
            vtable_size,
            inline_size,
        })
    }
}

/// Field-by-field checks for one record. Call [TableVerifier::finish] when done.
#[derive(Debug)]
pub struct TableVerifier<'v, 'a> {
    verifier: &'v mut Verifier<'a>,
    table: Table<'a>,
    vtable: usize,
    vtable_size: VOffset,
    inline_size: VOffset,
}

impl<'v, 'a> TableVerifier<'v, 'a> {
    /// The record being verified. Only fields already checked are safe to read.
    pub fn table(&self) -> Table<'a> {
        self.table
    }

    pub fn verifier(&mut self) -> &mut Verifier<'a> {
        self.verifier
    }

    /// Check that `field` (if present) sits inside the record, without
    /// following it. Returns its absolute position.
    pub fn field_position<F: Element>(&mut self, field: u16) -> CodecResult<Option<usize>> {
        let entry = vtable_entry_pos(field);
        if entry + 2 > self.vtable_size as usize {
            return Ok(None);
        }

        let offset: VOffset = self.verifier.buf.read(self.vtable + entry)?;
        if offset == 0 {
            return Ok(None);
        }

        // entries below the soffset would alias the record header
        if (offset as usize) < SIZE_SOFFSET || offset as usize + F::WIDTH > self.inline_size as usize {
            return Err(Error::malformed(Violation::FieldOutsideRecord {
                field,
                offset,
                record_size: self.inline_size,
            }));
        }

        Ok(Some(self.table.position() + offset as usize))
    }

    /// Check `field` (if present) and everything it refers to.
    pub fn field<F: Element + Verify>(&mut self, field: u16) -> CodecResult<Option<usize>> {
        let pos = self.field_position::<F>(field)?;

        if let Some(pos) = pos {
            F::run_verifier(self.verifier, pos)?;
        }

        Ok(pos)
    }

    pub fn finish(self) {
        self.verifier.depth -= 1;
    }
}

impl<T: Scalar> Verify for Inline<T> {
    const INLINE: bool = true;

    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        verifier.in_bounds(pos, T::SIZE)
    }
}

impl<T: Verify> Verify for Reference<T> {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let target = verifier.buf.follow_offset(pos)?;
        T::run_verifier(verifier, target)
    }
}

impl<E: Element + Verify> Verify for Vector<E> {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let (start, len) = verifier.vector_span(pos, E::WIDTH)?;

        if !E::INLINE {
            for i in 0..len {
                E::run_verifier(verifier, start + i * E::WIDTH)?;
            }
        }

        Ok(())
    }
}

impl Verify for Str {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let (start, len) = verifier.vector_span(pos, 1)?;

        let terminator = start + len;
        match verifier.buf.read::<u8>(terminator) {
            Ok(STRING_TERMINATOR) => (),
            _ => {
                return Err(Error::malformed(Violation::MissingTerminator {
                    pos: terminator,
                }))
            }
        }

        if verifier.options.string_mode == StringMode::Strict {
            std::str::from_utf8(verifier.buf.slice(start, len)?)?;
        }

        Ok(())
    }
}

impl Verify for AnyTable {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        verifier.visit_table(pos)?.finish();
        Ok(())
    }
}

/// Verify a whole buffer whose root record is a `T`.
pub fn verify<T: Verify>(bytes: &[u8], options: &VerifierOptions) -> CodecResult<()> {
    let root = root_offset(bytes)?;
    let mut verifier = Verifier::new(bytes, options.clone());

    T::run_verifier(&mut verifier, root).map_err(|e| {
        log::warn!("buffer of {} bytes failed verification: {}", bytes.len(), e);
        e
    })
}

/// Verify a single-slice buffer of the given kind.
pub fn verify_slice(kind: SliceKind, bytes: &[u8], options: &VerifierOptions) -> CodecResult<()> {
    let root = root_offset(bytes)?;
    let mut verifier = Verifier::new(bytes, options.clone());

    verify_kind(kind, &mut verifier, root).map_err(|e| {
        log::warn!("{} slice buffer failed verification: {}", kind, e);
        e
    })
}

//! Many slices of mixed kinds in one buffer.
//!
//! The root record holds two parallel vectors: the kind tag of every slice
//! and a reference to its record. Slices of the same kind share vtables.

use crate::builder::{Offset, SliceBuilder};
use crate::consts::SIZE_UOFFSET;
use crate::error::{CodecResult, Error, Violation};
use crate::record::{verify_kind, Slice};
use crate::table::{AnyTable, Follow, Inline, Reference, Table};
use crate::value::SliceKind;
use crate::vector::{Vector, VectorView};
use crate::verifier::{verify, Verifier, VerifierOptions, Verify};
use crate::view::BufferView;

pub const KINDS_FIELD: u16 = 0;
pub const SLICES_FIELD: u16 = 1;
pub const BATCH_FIELD_COUNT: u16 = 2;

type KindsField = Reference<Vector<Inline<u8>>>;
type SlicesField = Reference<Vector<Reference<AnyTable>>>;

/// Schema marker for the batch root record.
#[derive(Debug)]
pub struct BatchTable;

/// Write every slice, then the batch record listing them.
pub fn encode_batch_into(builder: &mut SliceBuilder, slices: &[Slice]) -> CodecResult<Offset<BatchTable>> {
    let records = slices
        .iter()
        .map(|slice| slice.encode_into(builder))
        .collect::<CodecResult<Vec<_>>>()?;

    let tags = slices.iter().map(|slice| slice.kind().tag()).collect::<Vec<_>>();
    let kinds = builder.create_vector(&tags)?;
    let records = builder.create_offset_vector(&records)?;

    let handle = builder.start_record(BATCH_FIELD_COUNT)?;
    builder.add_offset_field(KINDS_FIELD, Some(kinds))?;
    builder.add_offset_field(SLICES_FIELD, Some(records))?;
    Ok(builder.end_record(handle)?.cast())
}

pub fn encode_batch(slices: &[Slice]) -> CodecResult<Vec<u8>> {
    let mut builder = SliceBuilder::new();
    let root = encode_batch_into(&mut builder, slices)?;
    builder.finish(root)
}

/// Verify a whole batch buffer, including every slice against its declared kind.
pub fn verify_batch(bytes: &[u8], options: &VerifierOptions) -> CodecResult<()> {
    verify::<BatchTable>(bytes, options)
}

fn unknown_kind(tag: u8) -> Error {
    Error::malformed(Violation::UnknownTag {
        what: "slice kind",
        tag,
    })
}

/// Zero-copy view over an encoded batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchView<'a> {
    table: Table<'a>,
    kinds: VectorView<'a, Inline<u8>>,
    slices: VectorView<'a, Reference<AnyTable>>,
}

impl<'a> BatchView<'a> {
    pub fn root(bytes: &'a [u8]) -> CodecResult<Self> {
        Self::from_table(Table::root(bytes)?)
    }

    pub fn from_table(table: Table<'a>) -> CodecResult<Self> {
        let kinds = table
            .get_field::<KindsField>(KINDS_FIELD)?
            .unwrap_or_else(VectorView::empty);
        let slices = table
            .get_field::<SlicesField>(SLICES_FIELD)?
            .unwrap_or_else(VectorView::empty);

        if kinds.len() != slices.len() {
            return Err(Error::malformed(Violation::LengthMismatch {
                kinds: kinds.len(),
                slices: slices.len(),
            }));
        }

        Ok(Self {
            table,
            kinds,
            slices,
        })
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn kind(&self, index: usize) -> CodecResult<SliceKind> {
        let tag = self.kinds.get(index)?;
        SliceKind::from_tag(tag).ok_or_else(|| unknown_kind(tag))
    }

    /// The batch record itself.
    pub fn table(&self) -> Table<'a> {
        self.table
    }

    /// The record of slice `index` together with its kind, without copying.
    pub fn slice_table(&self, index: usize) -> CodecResult<(SliceKind, Table<'a>)> {
        Ok((self.kind(index)?, self.slices.get(index)?))
    }

    pub fn get(&self, index: usize) -> CodecResult<Slice> {
        let (kind, table) = self.slice_table(index)?;
        Slice::from_table(kind, table)
    }

    pub fn iter(&self) -> impl Iterator<Item = CodecResult<Slice>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn to_vec(&self) -> CodecResult<Vec<Slice>> {
        self.iter().collect()
    }
}

impl Follow for BatchTable {
    type Inner<'a> = BatchView<'a>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<BatchView<'a>> {
        BatchView::from_table(Table::new(buf, loc))
    }
}

/// Element span of the vector referenced from the field at `pos`, or an empty
/// span for an absent field.
fn referenced_span(verifier: &Verifier<'_>, pos: Option<usize>, width: usize) -> CodecResult<(usize, usize)> {
    match pos {
        Some(pos) => {
            let target = verifier.buffer().follow_offset(pos)?;
            verifier.vector_span(target, width)
        }
        None => Ok((0, 0)),
    }
}

impl Verify for BatchTable {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let mut table = verifier.visit_table(pos)?;
        let kinds = table.field::<KindsField>(KINDS_FIELD)?;
        let slices = table.field_position::<SlicesField>(SLICES_FIELD)?;

        let verifier = table.verifier();
        let (kinds_start, kinds_len) = referenced_span(verifier, kinds, 1)?;
        let (slices_start, slices_len) = referenced_span(verifier, slices, SIZE_UOFFSET)?;

        if kinds_len != slices_len {
            return Err(Error::malformed(Violation::LengthMismatch {
                kinds: kinds_len,
                slices: slices_len,
            }));
        }

        for i in 0..slices_len {
            let tag: u8 = verifier.buffer().read(kinds_start + i)?;
            let kind = SliceKind::from_tag(tag).ok_or_else(|| unknown_kind(tag))?;

            let record = verifier.buffer().follow_offset(slices_start + i * SIZE_UOFFSET)?;
            verify_kind(kind, verifier, record)?;
        }

        table.finish();
        Ok(())
    }
}

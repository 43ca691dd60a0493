//! Slice records: one (index, value) pair of a fixed kind.
//!
//! Every kind shares one record layout. The index is always field 0 and the
//! value always field 1; new fields may only ever be appended after them.
//! What differs per kind is captured by a [SliceValue] marker type, so the
//! six kinds are one generic [SliceRecord] rather than six copies.

use std::fmt::Debug;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::builder::{Offset, SliceBuilder};
use crate::color::{ColorSpace, ColorSpaceTable, ColorSpaceView};
use crate::error::CodecResult;
use crate::scalar::Scalar;
use crate::table::{AnyTable, Element, Follow, Inline, Reference, Table};
use crate::value::SliceKind;
use crate::vector::{Str, StrView, Vector, VectorView};
use crate::verifier::{Verifier, Verify};
use crate::view::BufferView;

pub const INDEX_FIELD: u16 = 0;
pub const VALUE_FIELD: u16 = 1;
pub const SLICE_FIELD_COUNT: u16 = 2;

/// Per-kind schema of a slice value.
pub trait SliceValue: Sized + 'static {
    const KIND: SliceKind;

    /// Integer type of the index field.
    type Index: Scalar + Serialize + DeserializeOwned;

    /// How the value field is stored: [Inline] or [Reference].
    type Field: Element + Verify;

    /// Borrowed value, with the kind's default applied when the field is absent.
    type View<'a>: Copy + Debug;

    /// Owned value handed to consumers.
    type Value: Clone + Debug + PartialEq + Default + Serialize + DeserializeOwned;

    /// Children written before the record is opened.
    type Staged: Copy;

    fn or_default<'a>(found: Option<<Self::Field as Follow>::Inner<'a>>) -> Self::View<'a>;

    fn to_value(view: Self::View<'_>) -> CodecResult<Self::Value>;

    /// Write anything the value field refers to. Runs before the record opens.
    fn stage(builder: &mut SliceBuilder, value: &Self::Value) -> CodecResult<Self::Staged>;

    /// Write the value field into the open record.
    fn add_value(builder: &mut SliceBuilder, staged: Self::Staged) -> CodecResult<()>;
}

/// Impl [SliceValue] for kinds whose value is a scalar stored in place
macro_rules! fixed_slice_value {
    ($(#[$meta: meta])* $marker: ident => $kind: ident, $index: ty, $value: ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $marker;

        impl SliceValue for $marker {
            const KIND: SliceKind = SliceKind::$kind;

            type Index = $index;
            type Field = Inline<$value>;
            type View<'a> = $value;
            type Value = $value;
            type Staged = $value;

            fn or_default<'a>(
                found: Option<<Self::Field as Follow>::Inner<'a>>,
            ) -> Self::View<'a> {
                found.unwrap_or_default()
            }

            fn to_value(view: Self::View<'_>) -> CodecResult<Self::Value> {
                Ok(view)
            }

            fn stage(_: &mut SliceBuilder, value: &Self::Value) -> CodecResult<Self::Staged> {
                Ok(*value)
            }

            fn add_value(builder: &mut SliceBuilder, staged: Self::Staged) -> CodecResult<()> {
                builder.add_field(VALUE_FIELD, staged, <$value>::default())
            }
        }
    };
}

fixed_slice_value! {
    /// 64-bit float values.
    Double => DoubleSlice, u64, f64
}

fixed_slice_value! {
    /// 32-bit float values.
    Float => FloatSlice, u64, f32
}

fixed_slice_value! {
    /// Unsigned 16-bit values with an 8-bit index.
    UShort => UShortSlice, u8, u16
}

/// Byte vector values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bytes;

impl SliceValue for Bytes {
    const KIND: SliceKind = SliceKind::ByteSlice;

    type Index = u64;
    type Field = Reference<Vector<Inline<u8>>>;
    type View<'a> = VectorView<'a, Inline<u8>>;
    type Value = Vec<u8>;
    type Staged = Option<Offset<Vector<Inline<u8>>>>;

    fn or_default<'a>(found: Option<<Self::Field as Follow>::Inner<'a>>) -> Self::View<'a> {
        found.unwrap_or_else(VectorView::empty)
    }

    fn to_value(view: Self::View<'_>) -> CodecResult<Self::Value> {
        Ok(view.bytes()?.to_vec())
    }

    fn stage(builder: &mut SliceBuilder, value: &Self::Value) -> CodecResult<Self::Staged> {
        match value.is_empty() {
            true => Ok(None),
            false => builder.create_byte_vector(value).map(Some),
        }
    }

    fn add_value(builder: &mut SliceBuilder, staged: Self::Staged) -> CodecResult<()> {
        builder.add_offset_field(VALUE_FIELD, staged)
    }
}

/// UTF-8 string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Text;

impl SliceValue for Text {
    const KIND: SliceKind = SliceKind::StringSlice;

    type Index = u64;
    type Field = Reference<Str>;
    type View<'a> = StrView<'a>;
    type Value = String;
    type Staged = Option<Offset<Str>>;

    fn or_default<'a>(found: Option<<Self::Field as Follow>::Inner<'a>>) -> Self::View<'a> {
        found.unwrap_or_else(StrView::empty)
    }

    fn to_value(view: Self::View<'_>) -> CodecResult<Self::Value> {
        Ok(view.as_str()?.to_owned())
    }

    fn stage(builder: &mut SliceBuilder, value: &Self::Value) -> CodecResult<Self::Staged> {
        match value.is_empty() {
            true => Ok(None),
            false => builder.create_string(value).map(Some),
        }
    }

    fn add_value(builder: &mut SliceBuilder, staged: Self::Staged) -> CodecResult<()> {
        builder.add_offset_field(VALUE_FIELD, staged)
    }
}

/// References to a color-space record. Absent by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color;

impl SliceValue for Color {
    const KIND: SliceKind = SliceKind::ColorSlice;

    type Index = u32;
    type Field = Reference<ColorSpaceTable>;
    type View<'a> = Option<ColorSpaceView<'a>>;
    type Value = Option<ColorSpace>;
    type Staged = Option<Offset<ColorSpaceTable>>;

    fn or_default<'a>(found: Option<<Self::Field as Follow>::Inner<'a>>) -> Self::View<'a> {
        found
    }

    fn to_value(view: Self::View<'_>) -> CodecResult<Self::Value> {
        view.map(|color| color.to_color()).transpose()
    }

    fn stage(builder: &mut SliceBuilder, value: &Self::Value) -> CodecResult<Self::Staged> {
        value.as_ref().map(|color| color.encode(builder)).transpose()
    }

    fn add_value(builder: &mut SliceBuilder, staged: Self::Staged) -> CodecResult<()> {
        builder.add_offset_field(VALUE_FIELD, staged)
    }
}

/// An owned (index, value) pair of kind `V`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SliceRecord<V: SliceValue> {
    pub index: V::Index,
    pub value: V::Value,
}

pub type ByteSlice = SliceRecord<Bytes>;
pub type ColorSlice = SliceRecord<Color>;
pub type DoubleSlice = SliceRecord<Double>;
pub type FloatSlice = SliceRecord<Float>;
pub type StringSlice = SliceRecord<Text>;
pub type UShortSlice = SliceRecord<UShort>;

impl<V: SliceValue> SliceRecord<V> {
    pub fn new(index: V::Index, value: V::Value) -> Self {
        Self { index, value }
    }

    pub fn kind(&self) -> SliceKind {
        V::KIND
    }

    /// Write the record (and its children) into a builder with no open record.
    pub fn encode_into(&self, builder: &mut SliceBuilder) -> CodecResult<Offset<SliceTable<V>>> {
        let staged = V::stage(builder, &self.value)?;

        let handle = builder.start_record(SLICE_FIELD_COUNT)?;
        builder.add_field(INDEX_FIELD, self.index, V::Index::default())?;
        V::add_value(builder, staged)?;

        Ok(builder.end_record(handle)?.cast())
    }

    /// Encode the record as the root of a new buffer.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut builder = SliceBuilder::new();
        let root = self.encode_into(&mut builder)?;
        builder.finish(root)
    }

    /// Decode a buffer whose root is a record of kind `V`.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        SliceView::<V>::root(bytes)?.to_record()
    }
}

/// Schema marker for a slice record of kind `V`.
#[derive(Debug)]
pub struct SliceTable<V>(PhantomData<V>);

/// Zero-copy view over an encoded slice record.
pub struct SliceView<'a, V> {
    table: Table<'a>,
    marker: PhantomData<V>,
}

impl<V> Clone for SliceView<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for SliceView<'_, V> {}

impl<V: SliceValue> Debug for SliceView<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceView")
            .field("kind", &V::KIND)
            .field("position", &self.table.position())
            .finish()
    }
}

impl<'a, V: SliceValue> SliceView<'a, V> {
    pub fn from_table(table: Table<'a>) -> Self {
        Self {
            table,
            marker: PhantomData,
        }
    }

    /// Wrap the root record of a finished buffer.
    pub fn root(bytes: &'a [u8]) -> CodecResult<Self> {
        Table::root(bytes).map(Self::from_table)
    }

    pub fn table(&self) -> Table<'a> {
        self.table
    }

    pub fn index(&self) -> CodecResult<V::Index> {
        self.table.get(INDEX_FIELD, V::Index::default())
    }

    pub fn value(&self) -> CodecResult<V::View<'a>> {
        let found = self.table.get_field::<V::Field>(VALUE_FIELD)?;
        Ok(V::or_default(found))
    }

    /// Copy the record out of the buffer.
    pub fn to_record(&self) -> CodecResult<SliceRecord<V>> {
        Ok(SliceRecord {
            index: self.index()?,
            value: V::to_value(self.value()?)?,
        })
    }
}

impl<'a> SliceView<'a, Bytes> {
    pub fn value_length(&self) -> CodecResult<usize> {
        Ok(self.value()?.len())
    }

    pub fn get_value(&self, index: usize) -> CodecResult<u8> {
        self.value()?.get(index)
    }

    /// The value bytes, borrowed from the buffer.
    pub fn value_bytes(&self) -> CodecResult<&'a [u8]> {
        self.value()?.bytes()
    }
}

impl<V: SliceValue> Follow for SliceTable<V> {
    type Inner<'a> = SliceView<'a, V>;

    fn follow<'a>(buf: BufferView<'a>, loc: usize) -> CodecResult<SliceView<'a, V>> {
        Ok(SliceView::from_table(Table::new(buf, loc)))
    }
}

impl<V: SliceValue> Verify for SliceTable<V> {
    fn run_verifier(verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
        let mut table = verifier.visit_table(pos)?;
        table.field::<Inline<V::Index>>(INDEX_FIELD)?;
        table.field::<V::Field>(VALUE_FIELD)?;
        table.finish();
        Ok(())
    }
}

/// An owned slice of any kind, as handed to state-apply and UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slice {
    Byte(ByteSlice),
    Color(ColorSlice),
    Double(DoubleSlice),
    Float(FloatSlice),
    String(StringSlice),
    #[serde(rename = "ushort")]
    UShort(UShortSlice),
}

/// Run `$body` with `$record` bound to the record inside any [Slice] variant.
macro_rules! dispatch {
    ($slice: expr, $record: ident => $body: expr) => {
        match $slice {
            Slice::Byte($record) => $body,
            Slice::Color($record) => $body,
            Slice::Double($record) => $body,
            Slice::Float($record) => $body,
            Slice::String($record) => $body,
            Slice::UShort($record) => $body,
        }
    };
}

/// Impl `From<SliceRecord<V>>` for [Slice]
macro_rules! slice_from_record {
    ($($marker: ident => $variant: ident),+) => {
        $(
            impl From<SliceRecord<$marker>> for Slice {
                fn from(record: SliceRecord<$marker>) -> Self {
                    Self::$variant(record)
                }
            }
        )+
    };
}

slice_from_record! {
    Bytes => Byte,
    Color => Color,
    Double => Double,
    Float => Float,
    Text => String,
    UShort => UShort
}

impl Slice {
    pub fn kind(&self) -> SliceKind {
        dispatch!(self, record => record.kind())
    }

    /// The index, widened to 64 bits.
    pub fn index(&self) -> u64 {
        match self {
            Self::Byte(r) => r.index,
            Self::Color(r) => r.index as u64,
            Self::Double(r) => r.index,
            Self::Float(r) => r.index,
            Self::String(r) => r.index,
            Self::UShort(r) => r.index as u64,
        }
    }

    pub fn encode_into(&self, builder: &mut SliceBuilder) -> CodecResult<Offset<AnyTable>> {
        dispatch!(self, record => record.encode_into(builder).map(Offset::cast))
    }

    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        dispatch!(self, record => record.encode())
    }

    /// Decode a single-slice buffer. The kind travels out of band.
    pub fn decode(kind: SliceKind, bytes: &[u8]) -> CodecResult<Self> {
        Self::from_table(kind, Table::root(bytes)?)
    }

    /// Copy a record of the given kind out of its buffer.
    pub fn from_table(kind: SliceKind, table: Table<'_>) -> CodecResult<Self> {
        let slice = match kind {
            SliceKind::ByteSlice => Self::Byte(SliceView::from_table(table).to_record()?),
            SliceKind::ColorSlice => Self::Color(SliceView::from_table(table).to_record()?),
            SliceKind::DoubleSlice => Self::Double(SliceView::from_table(table).to_record()?),
            SliceKind::FloatSlice => Self::Float(SliceView::from_table(table).to_record()?),
            SliceKind::StringSlice => Self::String(SliceView::from_table(table).to_record()?),
            SliceKind::UShortSlice => Self::UShort(SliceView::from_table(table).to_record()?),
        };

        Ok(slice)
    }
}

/// Verify the record of the given kind at `pos`.
pub(crate) fn verify_kind(kind: SliceKind, verifier: &mut Verifier<'_>, pos: usize) -> CodecResult<()> {
    match kind {
        SliceKind::ByteSlice => SliceTable::<Bytes>::run_verifier(verifier, pos),
        SliceKind::ColorSlice => SliceTable::<Color>::run_verifier(verifier, pos),
        SliceKind::DoubleSlice => SliceTable::<Double>::run_verifier(verifier, pos),
        SliceKind::FloatSlice => SliceTable::<Float>::run_verifier(verifier, pos),
        SliceKind::StringSlice => SliceTable::<Text>::run_verifier(verifier, pos),
        SliceKind::UShortSlice => SliceTable::<UShort>::run_verifier(verifier, pos),
    }
}

//! Buffer encoder.
//!
//! The buffer is laid out back to front: data is written at the tail of an
//! internal vector and the head moves towards index 0. Positions handed out
//! while building ([Offset]) are distances from the tail, so they stay valid
//! when the vector grows. Children (strings, vectors, nested records) must
//! be finished before the record that refers to them.

use std::marker::PhantomData;

use crate::consts::{
    SOffset, UOffset, VOffset, MAX_BUFFER_SIZE, SIZE_LEN_PREFIX, SIZE_SOFFSET, SIZE_UOFFSET,
    SIZE_VOFFSET, STRING_TERMINATOR, VTABLE_HEADER_SIZE,
};
use crate::error::{CodecResult, Error, Misuse};
use crate::fsm::{BuilderEvent, BuilderState, TransitableState};
use crate::scalar::Scalar;
use crate::table::{AnyTable, Inline, Reference};
use crate::vector::{Str, StringMode, Vector};

/// Most fields a record may declare while its vtable size still fits a [VOffset].
const MAX_FIELD_COUNT: u16 = ((VOffset::MAX as usize - VTABLE_HEADER_SIZE) / SIZE_VOFFSET) as u16;

/// Position of finished data inside a builder, typed by what it points at.
pub struct Offset<T> {
    value: UOffset,
    marker: PhantomData<T>,
}

impl<T> Offset<T> {
    fn new(value: UOffset) -> Self {
        Self {
            value,
            marker: PhantomData,
        }
    }

    /// Distance from the end of the buffer, in bytes.
    pub fn value(&self) -> UOffset {
        self.value
    }

    /// Reinterpret the target, e.g. a raw record as a schema-typed record.
    pub fn cast<U>(self) -> Offset<U> {
        Offset::new(self.value)
    }
}

impl<T> Clone for Offset<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Offset<T> {}

impl<T> PartialEq for Offset<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Offset<T> {}

impl<T> std::fmt::Debug for Offset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Offset({})", self.value)
    }
}

/// Token for the record currently open in a [SliceBuilder].
#[derive(Debug)]
#[must_use = "a record handle must be passed to end_record"]
pub struct RecordHandle {
    generation: u64,
}

#[derive(Debug)]
struct OpenRecord {
    generation: u64,
    start: UOffset,
    field_count: u16,
    last_field: Option<u16>,
}

#[derive(Debug)]
struct OpenVector {
    elem_size: usize,
    declared: usize,
    pushed: usize,
}

#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    field: u16,
    offset: UOffset,
}

/// Builds one buffer out of records, vectors and strings.
///
/// Not reentrant: one record or vector may be open at a time. Any misuse
/// poisons the builder and every later call fails.
#[derive(Debug)]
pub struct SliceBuilder {
    buf: Vec<u8>,
    head: usize,
    min_align: usize,
    state: BuilderState,
    generation: u64,
    record: Option<OpenRecord>,
    vector: Option<OpenVector>,
    fields: Vec<FieldLoc>,
    vtables: Vec<UOffset>,
    force_defaults: bool,
}

impl Default for SliceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SliceBuilder {
    pub fn new() -> Self {
        Self::with_capacity(crate::defaults::DEFAULT_BUILDER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BUFFER_SIZE);

        Self {
            buf: vec![0; capacity],
            head: capacity,
            min_align: 1,
            state: BuilderState::default(),
            generation: 0,
            record: None,
            vector: None,
            fields: Vec::new(),
            vtables: Vec::new(),
            force_defaults: false,
        }
    }

    /// Write scalar fields even when they equal their default.
    pub fn set_force_defaults(&mut self, force: bool) {
        self.force_defaults = force;
    }

    /// Number of bytes written so far.
    pub fn offset(&self) -> UOffset {
        (self.buf.len() - self.head) as UOffset
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Open a record with `field_count` declared fields.
    pub fn start_record(&mut self, field_count: u16) -> CodecResult<RecordHandle> {
        self.transition(BuilderEvent::StartRecord)?;

        if field_count > MAX_FIELD_COUNT {
            return Err(self.poison(Misuse::TooManyFields {
                field_count,
                max: MAX_FIELD_COUNT,
            }));
        }

        self.generation += 1;
        self.fields.clear();
        self.record = Some(OpenRecord {
            generation: self.generation,
            start: self.offset(),
            field_count,
            last_field: None,
        });

        Ok(RecordHandle {
            generation: self.generation,
        })
    }

    /// Add a scalar field to the open record, unless it equals `default`.
    pub fn add_field<T: Scalar>(&mut self, field: u16, value: T, default: T) -> CodecResult<()> {
        self.transition(BuilderEvent::Field)?;
        self.check_field_order(field)?;

        if value.same_bits(default) && !self.force_defaults {
            return Ok(());
        }

        let offset = self.push(value)?;
        self.fields.push(FieldLoc { field, offset });

        Ok(())
    }

    /// Add a reference to finished data to the open record. `None` is elided.
    pub fn add_offset_field<T>(&mut self, field: u16, child: Option<Offset<T>>) -> CodecResult<()> {
        self.transition(BuilderEvent::Field)?;
        self.check_field_order(field)?;

        let Some(child) = child else {
            return Ok(());
        };

        let offset = self.push_uoffset(child.value)?;
        self.fields.push(FieldLoc { field, offset });

        Ok(())
    }

    /// Close the open record, writing (or reusing) its vtable.
    pub fn end_record(&mut self, handle: RecordHandle) -> CodecResult<Offset<AnyTable>> {
        self.transition(BuilderEvent::EndRecord)?;

        let record = match self.record.take() {
            Some(record) if record.generation == handle.generation => record,
            _ => return Err(self.poison(Misuse::StaleHandle)),
        };

        // placeholder for the vtable offset, patched below
        self.prep(SIZE_SOFFSET, 0)?;
        self.push_raw::<SOffset>(0);
        let object_offset = self.offset();

        let object_size = (object_offset - record.start) as usize;
        if object_size > VOffset::MAX as usize {
            return Err(self.poison(Misuse::RecordTooLarge { size: object_size }));
        }

        let mut entries = vec![0 as VOffset; record.field_count as usize];
        for loc in &self.fields {
            entries[loc.field as usize] = (object_offset - loc.offset) as VOffset;
        }
        self.fields.clear();

        let existing = self
            .vtables
            .iter()
            .copied()
            .find(|&vt| self.vtable_matches(vt, object_size as VOffset, &entries));

        let vtable_offset = match existing {
            Some(vt) => {
                log::trace!("reusing vtable at {} for record at {}", vt, object_offset);
                vt
            }
            None => {
                let vtable_size = VTABLE_HEADER_SIZE + entries.len() * SIZE_VOFFSET;
                self.reserve(vtable_size)?;

                for entry in entries.iter().rev() {
                    self.push_raw(*entry);
                }
                self.push_raw(object_size as VOffset);
                self.push_raw(vtable_size as VOffset);

                let vt = self.offset();
                self.vtables.push(vt);
                vt
            }
        };

        // vtable = record - soffset, both measured from the front of the final buffer
        let soffset = vtable_offset as i64 - object_offset as i64;
        let record_pos = self.buf.len() - object_offset as usize;
        (soffset as SOffset).write_le(&mut self.buf[record_pos..record_pos + SIZE_SOFFSET]);

        Ok(Offset::new(object_offset))
    }

    /// Open a vector of `count` elements of `elem_size` bytes each.
    ///
    /// Elements are pushed last to first.
    pub fn start_vector(&mut self, elem_size: usize, count: usize) -> CodecResult<()> {
        self.transition(BuilderEvent::StartVector)?;

        let Some(total) = elem_size.checked_mul(count) else {
            return Err(self.poison(Misuse::BufferTooLarge {
                limit: MAX_BUFFER_SIZE,
            }));
        };

        let alignment = match elem_size.is_power_of_two() {
            true => elem_size.min(8),
            false => 1,
        };

        self.prep(SIZE_UOFFSET, total)?;
        self.prep(alignment, total)?;
        self.vector = Some(OpenVector {
            elem_size,
            declared: count,
            pushed: 0,
        });

        Ok(())
    }

    /// Push one scalar element into the open vector.
    pub fn push_element<T: Scalar>(&mut self, value: T) -> CodecResult<()> {
        self.transition(BuilderEvent::Element)?;
        self.count_element(T::SIZE)?;

        self.push(value)?;
        Ok(())
    }

    /// Push one reference element into the open vector.
    pub fn push_offset_element<T>(&mut self, child: Offset<T>) -> CodecResult<()> {
        self.transition(BuilderEvent::Element)?;
        self.count_element(SIZE_UOFFSET)?;

        self.push_uoffset(child.value)?;
        Ok(())
    }

    /// Close the open vector by writing its element count.
    pub fn end_vector<E>(&mut self) -> CodecResult<Offset<Vector<E>>> {
        self.transition(BuilderEvent::EndVector)?;

        let Some(vector) = self.vector.take() else {
            return Err(self.poison(Misuse::OutOfSequence {
                state: BuilderState::InVector,
                event: BuilderEvent::EndVector,
            }));
        };

        if vector.pushed != vector.declared {
            return Err(self.poison(Misuse::VectorLengthMismatch {
                declared: vector.declared,
                pushed: vector.pushed,
            }));
        }

        let offset = self.push(vector.declared as u32)?;
        Ok(Offset::new(offset))
    }

    /// Write a UTF-8 string.
    pub fn create_string(&mut self, s: &str) -> CodecResult<Offset<Str>> {
        self.create_string_bytes(s.as_bytes(), StringMode::Lenient)
    }

    /// Write string contents given as bytes.
    ///
    /// In [StringMode::Strict] invalid UTF-8 is rejected with [Error::Encoding]
    /// and nothing is written; the builder stays usable.
    pub fn create_string_bytes(&mut self, bytes: &[u8], mode: StringMode) -> CodecResult<Offset<Str>> {
        if mode == StringMode::Strict {
            std::str::from_utf8(bytes)?;
        }

        self.transition(BuilderEvent::Child)?;

        self.prep(SIZE_LEN_PREFIX, bytes.len() + 1)?;
        self.push_raw(STRING_TERMINATOR);
        self.push_bytes(bytes);
        let offset = self.push(bytes.len() as u32)?;

        Ok(Offset::new(offset))
    }

    /// Write a byte vector.
    pub fn create_byte_vector(&mut self, bytes: &[u8]) -> CodecResult<Offset<Vector<Inline<u8>>>> {
        self.transition(BuilderEvent::Child)?;

        self.prep(SIZE_LEN_PREFIX, bytes.len())?;
        self.push_bytes(bytes);
        let offset = self.push(bytes.len() as u32)?;

        Ok(Offset::new(offset))
    }

    /// Write a vector of scalars.
    pub fn create_vector<T: Scalar>(&mut self, items: &[T]) -> CodecResult<Offset<Vector<Inline<T>>>> {
        self.start_vector(T::SIZE, items.len())?;
        for item in items.iter().rev() {
            self.push_element(*item)?;
        }
        self.end_vector()
    }

    /// Write a vector of references to finished data.
    pub fn create_offset_vector<T>(
        &mut self,
        items: &[Offset<T>],
    ) -> CodecResult<Offset<Vector<Reference<T>>>> {
        self.start_vector(SIZE_UOFFSET, items.len())?;
        for item in items.iter().rev() {
            self.push_offset_element(*item)?;
        }
        self.end_vector()
    }

    /// Write the root offset and hand out the finished buffer.
    pub fn finish<T>(mut self, root: Offset<T>) -> CodecResult<Vec<u8>> {
        self.transition(BuilderEvent::Finish)?;

        self.prep(self.min_align, SIZE_UOFFSET)?;
        self.push_uoffset(root.value)?;

        log::debug!(
            "finished buffer of {} bytes ({} vtables)",
            self.offset(),
            self.vtables.len()
        );

        Ok(self.buf.split_off(self.head))
    }

    /// Apply `event` to the state machine, poisoning the builder on rejection.
    fn transition(&mut self, event: BuilderEvent) -> CodecResult<()> {
        if self.state == BuilderState::Poisoned {
            return Err(Error::misuse(Misuse::Poisoned));
        }

        match self.state.ingest(event) {
            Ok(()) => Ok(()),
            Err(rejected) => Err(self.poison(Misuse::OutOfSequence {
                state: rejected.state,
                event: rejected.event,
            })),
        }
    }

    fn poison(&mut self, misuse: Misuse) -> Error {
        log::debug!("builder poisoned: {}", misuse);
        self.state = BuilderState::Poisoned;
        Error::misuse(misuse)
    }

    fn check_field_order(&mut self, field: u16) -> CodecResult<()> {
        let Some(record) = self.record.as_mut() else {
            return Err(self.poison(Misuse::Poisoned));
        };

        if field >= record.field_count {
            let field_count = record.field_count;
            return Err(self.poison(Misuse::FieldOutOfRange { field, field_count }));
        }

        if let Some(last) = record.last_field.filter(|&last| field <= last) {
            return Err(self.poison(Misuse::FieldOutOfOrder { field, last }));
        }

        record.last_field = Some(field);
        Ok(())
    }

    fn count_element(&mut self, size: usize) -> CodecResult<()> {
        let Some(vector) = self.vector.as_mut() else {
            return Err(self.poison(Misuse::Poisoned));
        };

        if vector.elem_size != size {
            let expected = vector.elem_size;
            return Err(self.poison(Misuse::ElementSizeMismatch {
                expected,
                got: size,
            }));
        }

        if vector.pushed == vector.declared {
            let declared = vector.declared;
            return Err(self.poison(Misuse::VectorLengthMismatch {
                declared,
                pushed: declared + 1,
            }));
        }

        vector.pushed += 1;
        Ok(())
    }

    /// Whether the vtable written at `vt` matches the given layout byte for byte.
    fn vtable_matches(&self, vt: UOffset, object_size: VOffset, entries: &[VOffset]) -> bool {
        let pos = self.buf.len() - vt as usize;
        let read = |at: usize| VOffset::read_le(&self.buf[at..at + SIZE_VOFFSET]);

        let vtable_size = VTABLE_HEADER_SIZE + entries.len() * SIZE_VOFFSET;
        if read(pos) as usize != vtable_size || read(pos + SIZE_VOFFSET) != object_size {
            return false;
        }

        entries
            .iter()
            .enumerate()
            .all(|(i, entry)| read(pos + VTABLE_HEADER_SIZE + i * SIZE_VOFFSET) == *entry)
    }

    /// Make sure `additional` bytes can be written in front of the head.
    fn reserve(&mut self, additional: usize) -> CodecResult<()> {
        if additional <= self.head {
            return Ok(());
        }

        let used = self.buf.len() - self.head;
        let required = used + additional;
        if required > MAX_BUFFER_SIZE {
            return Err(self.poison(Misuse::BufferTooLarge {
                limit: MAX_BUFFER_SIZE,
            }));
        }

        let new_len = (self.buf.len() * 2).max(required).min(MAX_BUFFER_SIZE);
        log::trace!("growing builder from {} to {} bytes", self.buf.len(), new_len);

        let mut grown = vec![0; new_len];
        grown[new_len - used..].copy_from_slice(&self.buf[self.head..]);
        self.head = new_len - used;
        self.buf = grown;

        Ok(())
    }

    /// Pad so that after writing `additional` bytes the head is aligned to `size`.
    fn prep(&mut self, size: usize, additional: usize) -> CodecResult<()> {
        if size > self.min_align {
            self.min_align = size;
        }

        let used = self.buf.len() - self.head;
        let padding = (!(used + additional)).wrapping_add(1) & (size - 1);

        self.reserve(padding + size + additional)?;
        for _ in 0..padding {
            self.head -= 1;
            self.buf[self.head] = 0;
        }

        Ok(())
    }

    /// Write a scalar in front of the head. Space must already be reserved.
    fn push_raw<T: Scalar>(&mut self, value: T) {
        self.head -= T::SIZE;
        value.write_le(&mut self.buf[self.head..self.head + T::SIZE]);
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.head -= bytes.len();
        self.buf[self.head..self.head + bytes.len()].copy_from_slice(bytes);
    }

    fn push<T: Scalar>(&mut self, value: T) -> CodecResult<UOffset> {
        self.prep(T::SIZE, 0)?;
        self.push_raw(value);
        Ok(self.offset())
    }

    /// Write an offset to `target`, relative to where the offset itself lands.
    fn push_uoffset(&mut self, target: UOffset) -> CodecResult<UOffset> {
        self.prep(SIZE_UOFFSET, 0)?;

        let used = self.offset();
        if target == 0 || target > used {
            return Err(self.poison(Misuse::UnknownOffset {
                offset: target,
                used,
            }));
        }

        self.push_raw(used - target + SIZE_UOFFSET as UOffset);
        Ok(self.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    #[test]
    fn test_buffer_layout() {
        let mut builder = SliceBuilder::new();
        let handle = builder.start_record(2).unwrap();
        builder.add_field(0, 42_u64, 0).unwrap();
        builder.add_field(1, 7_u16, 0).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        // root offset header, then the data
        let root_pos = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
        assert!(root_pos >= 4 && root_pos < buf.len());

        // record points at its vtable
        let soffset = i32::from_le_bytes(buf[root_pos..root_pos + 4].try_into().unwrap());
        let vtable = (root_pos as i64 - soffset as i64) as usize;
        let vtable_size = u16::from_le_bytes(buf[vtable..vtable + 2].try_into().unwrap());
        assert_eq!(vtable_size, 8, "header plus two entries");

        // the whole buffer is aligned to the widest scalar
        assert_eq!(buf.len() % 8, 0);

        let table = Table::root(&buf).unwrap();
        assert_eq!(table.get::<u64>(0, 0).unwrap(), 42);
        assert_eq!(table.get::<u16>(1, 0).unwrap(), 7);
    }

    #[test]
    fn test_scalars_are_aligned() {
        let mut builder = SliceBuilder::new();
        let text = builder.create_string("abc").unwrap();
        let handle = builder.start_record(3).unwrap();
        builder.add_field(0, 1_u8, 0).unwrap();
        builder.add_field(1, 2.5_f64, 0.0).unwrap();
        builder.add_offset_field(2, Some(text)).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let table = Table::root(&buf).unwrap();
        let pos = table.field_offset(1).unwrap().unwrap();
        assert_eq!(pos % 8, 0);
        assert_eq!(table.get::<f64>(1, 0.0).unwrap(), 2.5);
    }

    #[test]
    fn test_vtable_dedup() {
        let mut builder = SliceBuilder::new();

        let mut records = Vec::new();
        for n in 1..=3_u32 {
            let handle = builder.start_record(2).unwrap();
            builder.add_field(0, n, 0).unwrap();
            builder.add_field(1, n, 0).unwrap();
            records.push(builder.end_record(handle).unwrap());
        }
        assert_eq!(builder.vtables.len(), 1);

        // different layout gets its own vtable
        let handle = builder.start_record(2).unwrap();
        builder.add_field(0, 0_u32, 0).unwrap();
        builder.add_field(1, 9_u32, 0).unwrap();
        records.push(builder.end_record(handle).unwrap());
        assert_eq!(builder.vtables.len(), 2);

        let vector = builder.create_offset_vector(&records).unwrap();
        let handle = builder.start_record(1).unwrap();
        builder.add_offset_field(0, Some(vector)).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let root = Table::root(&buf).unwrap();
        let list = root
            .get_field::<Reference<Vector<Reference<AnyTable>>>>(0)
            .unwrap()
            .unwrap();
        let read = list
            .iter()
            .map(|t| {
                let t = t.unwrap();
                (t.get::<u32>(0, 0).unwrap(), t.get::<u32>(1, 0).unwrap())
            })
            .collect::<Vec<_>>();
        assert_eq!(read, vec![(1, 1), (2, 2), (3, 3), (0, 9)]);
    }

    #[test]
    fn test_default_elision_and_force() {
        let build = |force: bool| {
            let mut builder = SliceBuilder::new();
            builder.set_force_defaults(force);
            let handle = builder.start_record(2).unwrap();
            builder.add_field(0, 0_u64, 0).unwrap();
            builder.add_field(1, -0.0_f64, 0.0).unwrap();
            let root = builder.end_record(handle).unwrap();
            builder.finish(root).unwrap()
        };

        let elided = build(false);
        let table = Table::root(&elided).unwrap();
        assert_eq!(table.field_offset(0).unwrap(), None);
        // -0.0 differs from 0.0 bitwise and is kept
        assert!(table.field_offset(1).unwrap().is_some());
        assert!(table.get::<f64>(1, 0.0).unwrap().is_sign_negative());

        let forced = build(true);
        let table = Table::root(&forced).unwrap();
        assert!(table.field_offset(0).unwrap().is_some());
        assert!(forced.len() > elided.len());
    }

    #[test]
    fn test_growth_keeps_offsets() {
        // RUST_LOG=trace shows each growth step
        let _ = pretty_env_logger::try_init();

        let mut builder = SliceBuilder::with_capacity(1);
        let payload = (0..=255_u8).cycle().take(10_000).collect::<Vec<_>>();
        let bytes = builder.create_byte_vector(&payload).unwrap();
        let text = builder.create_string("tail").unwrap();

        let handle = builder.start_record(2).unwrap();
        builder.add_offset_field(0, Some(bytes)).unwrap();
        builder.add_offset_field(1, Some(text)).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let table = Table::root(&buf).unwrap();
        let read = table
            .get_field::<Reference<Vector<Inline<u8>>>>(0)
            .unwrap()
            .unwrap();
        assert_eq!(read.bytes().unwrap(), payload.as_slice());
        let text = table.get_field::<Reference<Str>>(1).unwrap().unwrap();
        assert_eq!(text.as_str().unwrap(), "tail");
    }

    #[test]
    fn test_misuse_field_out_of_order() {
        let mut builder = SliceBuilder::new();
        let _handle = builder.start_record(2).unwrap();
        builder.add_field(1, 1_u8, 0).unwrap();

        let err = builder.add_field(0, 1_u8, 0).unwrap_err();
        assert_eq!(
            err,
            Error::BuilderMisuse(Misuse::FieldOutOfOrder { field: 0, last: 1 })
        );

        // fatal to the build
        assert_eq!(builder.state(), BuilderState::Poisoned);
        assert_eq!(
            builder.create_string("x").unwrap_err(),
            Error::BuilderMisuse(Misuse::Poisoned)
        );
    }

    #[test]
    fn test_misuse_elided_field_still_ordered() {
        let mut builder = SliceBuilder::new();
        let _handle = builder.start_record(2).unwrap();
        builder.add_field(1, 0_u8, 0).unwrap();

        assert!(matches!(
            builder.add_field(1, 5_u8, 0),
            Err(Error::BuilderMisuse(Misuse::FieldOutOfOrder { .. }))
        ));
    }

    #[test]
    fn test_misuse_field_out_of_range() {
        let mut builder = SliceBuilder::new();
        let _handle = builder.start_record(2).unwrap();

        assert_eq!(
            builder.add_field(2, 1_u8, 0).unwrap_err(),
            Error::BuilderMisuse(Misuse::FieldOutOfRange {
                field: 2,
                field_count: 2
            })
        );
    }

    #[test]
    fn test_misuse_too_many_fields() {
        let mut builder = SliceBuilder::new();
        assert_eq!(
            builder.start_record(32766).unwrap_err(),
            Error::BuilderMisuse(Misuse::TooManyFields {
                field_count: 32766,
                max: 32765
            })
        );
        assert_eq!(builder.state(), BuilderState::Poisoned);

        // the largest vtable still fits and keeps its fields
        let mut builder = SliceBuilder::new();
        let handle = builder.start_record(32765).unwrap();
        builder.add_field(0, 42_u32, 0).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let table = Table::root(&buf).unwrap();
        assert_eq!(table.declared_fields().unwrap(), 32765);
        assert_eq!(table.get::<u32>(0, 0).unwrap(), 42);
    }

    #[test]
    fn test_misuse_record_too_large() {
        let mut builder = SliceBuilder::new();
        let handle = builder.start_record(10_000).unwrap();
        for field in 0..10_000_u16 {
            builder.add_field(field, 1_u64, 0).unwrap();
        }

        assert!(matches!(
            builder.end_record(handle),
            Err(Error::BuilderMisuse(Misuse::RecordTooLarge { size })) if size > u16::MAX as usize
        ));
        assert_eq!(builder.state(), BuilderState::Poisoned);
    }

    #[test]
    fn test_misuse_nested_records() {
        let mut builder = SliceBuilder::new();
        let _first = builder.start_record(2).unwrap();

        assert_eq!(
            builder.start_record(2).unwrap_err(),
            Error::BuilderMisuse(Misuse::OutOfSequence {
                state: BuilderState::InRecord,
                event: BuilderEvent::StartRecord
            })
        );
    }

    #[test]
    fn test_misuse_child_inside_record() {
        let mut builder = SliceBuilder::new();
        let _handle = builder.start_record(1).unwrap();

        assert!(matches!(
            builder.create_string("late"),
            Err(Error::BuilderMisuse(Misuse::OutOfSequence {
                event: BuilderEvent::Child,
                ..
            }))
        ));
    }

    #[test]
    fn test_misuse_stale_handle() {
        let mut builder = SliceBuilder::new();
        let first = builder.start_record(1).unwrap();
        let root = builder.end_record(first).unwrap();

        let _second = builder.start_record(1).unwrap();
        let forged = RecordHandle { generation: 1 };
        assert_eq!(
            builder.end_record(forged).unwrap_err(),
            Error::BuilderMisuse(Misuse::StaleHandle)
        );
        assert!(builder.finish(root).is_err());
    }

    #[test]
    fn test_misuse_finish_with_open_record() {
        let mut builder = SliceBuilder::new();
        let first = builder.start_record(1).unwrap();
        let root = builder.end_record(first).unwrap();
        let _open = builder.start_record(1).unwrap();

        assert!(matches!(
            builder.finish(root),
            Err(Error::BuilderMisuse(Misuse::OutOfSequence {
                event: BuilderEvent::Finish,
                ..
            }))
        ));
    }

    #[test]
    fn test_misuse_vector_length() {
        let mut builder = SliceBuilder::new();
        builder.start_vector(4, 2).unwrap();
        builder.push_element(1_u32).unwrap();
        assert_eq!(
            builder.end_vector::<Inline<u32>>().unwrap_err(),
            Error::BuilderMisuse(Misuse::VectorLengthMismatch {
                declared: 2,
                pushed: 1
            })
        );

        let mut builder = SliceBuilder::new();
        builder.start_vector(4, 1).unwrap();
        assert_eq!(
            builder.push_element(1_u16).unwrap_err(),
            Error::BuilderMisuse(Misuse::ElementSizeMismatch {
                expected: 4,
                got: 2
            })
        );
    }

    #[test]
    fn test_misuse_unknown_offset() {
        let mut other = SliceBuilder::new();
        let far = other.create_byte_vector(&[0; 64]).unwrap();

        let mut builder = SliceBuilder::new();
        let handle = builder.start_record(1).unwrap();
        assert!(matches!(
            builder.add_offset_field(0, Some(far)),
            Err(Error::BuilderMisuse(Misuse::UnknownOffset { .. }))
        ));
        drop(handle);
    }

    #[test]
    fn test_strict_string_rejects_invalid_utf8() {
        let mut builder = SliceBuilder::new();
        let err = builder
            .create_string_bytes(&[0xc3, 0x28], StringMode::Strict)
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));

        // not a misuse: the caller may retry leniently
        assert_eq!(builder.state(), BuilderState::Idle);
        builder
            .create_string_bytes(&[0xc3, 0x28], StringMode::Lenient)
            .unwrap();
    }

    #[test]
    fn test_scalar_vector() {
        let mut builder = SliceBuilder::new();
        let values = builder.create_vector(&[1.5_f32, -2.0, 8.25]).unwrap();
        let handle = builder.start_record(1).unwrap();
        builder.add_offset_field(0, Some(values)).unwrap();
        let root = builder.end_record(handle).unwrap();
        let buf = builder.finish(root).unwrap();

        let table = Table::root(&buf).unwrap();
        let values = table
            .get_field::<Reference<Vector<Inline<f32>>>>(0)
            .unwrap()
            .unwrap();
        assert_eq!(values.to_vec().unwrap(), vec![1.5, -2.0, 8.25]);
    }
}

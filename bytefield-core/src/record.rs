//! Record containers: an owned buffer plus borrowed views into it
//!
//! [`Record`] exclusively owns its buffer and the layout state of itself and
//! every embedded record. [`RecordRef`] and [`RecordMut`] are views at a
//! master offset inside that buffer; embedded records are reached by
//! re-deriving a view through the parent, so a view can never observe a
//! layout it was not derived from. Handles that must outlive a borrow use
//! [`RecordHandle`], which is checked against the layout generation.

use crate::error::LayoutError;
use crate::field::{decode_value, encode_value, resized_state, Extent, ResizeMode};
use crate::layout::{effective, effective_mut, state_shape, state_size, FieldState, Layout};
use crate::proxy::{ArrayMut, ArrayRef, ByteRange, ByteRangeMut};
use crate::resize::splice;
use crate::schema::{FieldDef, FieldId, FieldKind, Schema};
use crate::types::Value;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use bytes::{Bytes, BytesMut};
use core::fmt;
use core::ops::Range;

#[cfg(feature = "logging")]
use tracing::debug;

fn bounds(field: &str, start: usize, size: usize, len: usize) -> Result<Range<usize>, LayoutError> {
    if start + size > len {
        return Err(LayoutError::OutOfBounds {
            field: field.to_string(),
            offset: start,
            size,
            len,
        });
    }
    Ok(start..start + size)
}

fn expected(field: &str, expected: &'static str, kind: &FieldKind) -> LayoutError {
    LayoutError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: kind.kind_name(),
    }
}

/// A record instance owning its byte buffer
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    layout: Layout,
    buf: BytesMut,
    generation: u64,
}

impl Record {
    /// Allocate a zeroed record of the schema's minimum size
    pub fn new(schema: Arc<Schema>) -> Self {
        let layout = Layout::minimal(&schema);
        let mut buf = BytesMut::with_capacity(schema.min_size());
        buf.resize(schema.min_size(), 0);
        Self {
            schema,
            layout,
            buf,
            generation: 0,
        }
    }

    /// Allocate a record and assign initial field values in order
    pub fn with<I, N, V>(schema: Arc<Schema>, values: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Self::new(schema);
        for (name, value) in values {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }

    /// Adopt an existing buffer without copying
    ///
    /// Every instance-sized field starts at its minimum extent; use
    /// [`ResizeMode::Reinterpret`] to declare extents already present in
    /// the buffer.
    pub fn from_bytes_mut(schema: Arc<Schema>, buf: BytesMut) -> Result<Self, LayoutError> {
        if buf.len() < schema.min_size() {
            return Err(LayoutError::OutOfBounds {
                field: schema.name().to_string(),
                offset: 0,
                size: schema.min_size(),
                len: buf.len(),
            });
        }

        #[cfg(feature = "logging")]
        debug!(
            "Adopted buffer of {} bytes for record '{}'",
            buf.len(),
            schema.name()
        );

        Ok(Self {
            layout: Layout::minimal(&schema),
            schema,
            buf,
            generation: 0,
        })
    }

    /// Copy `data` into a new record buffer
    pub fn from_slice(schema: Arc<Schema>, data: &[u8]) -> Result<Self, LayoutError> {
        Self::from_bytes_mut(schema, BytesMut::from(data))
    }

    pub(crate) fn from_parts(schema: Arc<Schema>, layout: Layout, bytes: &[u8]) -> Self {
        Self {
            schema,
            layout,
            buf: BytesMut::from(bytes),
            generation: 0,
        }
    }

    pub(crate) fn into_parts(self) -> (Arc<Schema>, Layout, BytesMut) {
        (self.schema, self.layout, self.buf)
    }

    pub(crate) fn has_schema(&self, schema: &Arc<Schema>) -> bool {
        Arc::ptr_eq(&self.schema, schema) || *self.schema == **schema
    }

    /// Bytes covered by the record's current size
    pub(crate) fn used_bytes(&self) -> Result<&[u8], LayoutError> {
        let range = bounds(self.schema.name(), 0, self.size(), self.buf.len())?;
        Ok(&self.buf[range])
    }

    /// Schema of the record
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Layout generation, incremented by every change of an instance size
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The backing buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Freeze the backing buffer for interchange
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Give up the backing buffer
    pub fn into_bytes_mut(self) -> BytesMut {
        self.buf
    }

    /// Lowercase hex rendering of the backing buffer
    pub fn to_hex(&self) -> String {
        hex::encode(&self.buf)
    }

    /// Read-only view of the record
    pub fn view(&self) -> RecordRef<'_> {
        RecordRef::new(&self.schema, &self.layout, &self.buf, 0)
    }

    /// Mutable view of the record
    pub fn view_mut(&mut self) -> RecordMut<'_> {
        RecordMut {
            schema: &*self.schema,
            layout: &mut self.layout,
            buf: &mut self.buf,
            master: 0,
            generation: &mut self.generation,
        }
    }

    /// Current size in bytes
    pub fn size(&self) -> usize {
        self.view().size()
    }

    /// Absolute offset of a field
    pub fn field_offset(&self, name: &str) -> Result<usize, LayoutError> {
        self.view().field_offset(name)
    }

    /// Current size of a field
    pub fn field_size(&self, name: &str) -> Result<usize, LayoutError> {
        self.view().field_size(name)
    }

    /// Raw bytes of any field at its current extent
    pub fn field_bytes(&self, name: &str) -> Result<&[u8], LayoutError> {
        self.view().field_bytes(name)
    }

    /// Decode a field
    pub fn get(&self, name: &str) -> Result<Value, LayoutError> {
        self.view().get(name)
    }

    /// Check whether a slot is bound
    pub fn is_bound(&self, name: &str) -> Result<bool, LayoutError> {
        self.view().is_bound(name)
    }

    /// Kind of a field, resolving a bound slot
    pub fn field_kind(&self, name: &str) -> Result<&FieldKind, LayoutError> {
        self.view().field_kind(name)
    }

    /// View of an embedded record
    pub fn record(&self, name: &str) -> Result<RecordRef<'_>, LayoutError> {
        self.view().record(name)
    }

    /// View of a byte-range field
    pub fn bytes(&self, name: &str) -> Result<ByteRange<'_>, LayoutError> {
        self.view().bytes(name)
    }

    /// View of an array field
    pub fn array(&self, name: &str) -> Result<ArrayRef<'_>, LayoutError> {
        self.view().array(name)
    }

    /// Assign a field, resizing the buffer if its size changes
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), LayoutError> {
        self.view_mut().set(name, value)
    }

    /// Resize an instance-sized field, shifting following bytes
    pub fn resize(&mut self, name: &str, extent: impl Into<Extent>) -> Result<(), LayoutError> {
        self.view_mut().resize(name, extent)
    }

    /// Resize an instance-sized field with an explicit mode
    pub fn resize_with(
        &mut self,
        name: &str,
        extent: impl Into<Extent>,
        mode: ResizeMode,
    ) -> Result<(), LayoutError> {
        self.view_mut().resize_with(name, extent, mode)
    }

    /// Bind a runtime-typed slot to a kind
    pub fn bind(&mut self, name: &str, kind: FieldKind) -> Result<(), LayoutError> {
        self.view_mut().bind(name, kind)
    }

    /// Mutable view of an embedded record
    pub fn record_mut(&mut self, name: &str) -> Result<RecordMut<'_>, LayoutError> {
        self.view_mut().into_record(name)
    }

    /// Mutable view of a byte-range field
    pub fn bytes_mut(&mut self, name: &str) -> Result<ByteRangeMut<'_>, LayoutError> {
        self.view_mut().into_bytes_mut(name)
    }

    /// Mutable view of an array field
    pub fn array_mut(&mut self, name: &str) -> Result<ArrayMut<'_>, LayoutError> {
        self.view_mut().into_array_mut(name)
    }

    /// Capture a path of embedded record fields for later use
    pub fn handle(&self, path: &[&str]) -> Result<RecordHandle, LayoutError> {
        let mut view = self.view();
        for name in path {
            view = view.record(name)?;
        }
        Ok(RecordHandle {
            path: path.iter().map(|s| s.to_string()).collect(),
            generation: self.generation,
        })
    }

    /// Re-derive the view a handle points at
    ///
    /// Fails with [`LayoutError::StaleHandle`] if any instance size changed
    /// since the handle was taken.
    pub fn open(&mut self, handle: &RecordHandle) -> Result<RecordMut<'_>, LayoutError> {
        if handle.generation != self.generation {
            return Err(LayoutError::StaleHandle {
                taken: handle.generation,
                current: self.generation,
            });
        }
        let mut view = self.view_mut();
        for name in &handle.path {
            view = view.into_record(name)?;
        }
        Ok(view)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.has_schema(&other.schema) && self.layout == other.layout && self.buf == other.buf
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("schema", &self.schema.name())
            .field("size", &self.size())
            .field("bytes", &self.to_hex())
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for byte in self.buf.iter() {
            write!(f, " {:02x}", byte)?;
        }
        write!(f, " ]")
    }
}

/// A path to an embedded record, valid for one layout generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHandle {
    path: Vec<String>,
    generation: u64,
}

impl RecordHandle {
    /// Field names leading from the top-level record to the target
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Generation the handle was taken at
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Read-only view of a record at a master offset in a buffer
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a> {
    schema: &'a Schema,
    layout: &'a Layout,
    buf: &'a [u8],
    master: usize,
}

impl<'a> RecordRef<'a> {
    pub(crate) fn new(schema: &'a Schema, layout: &'a Layout, buf: &'a [u8], master: usize) -> Self {
        Self {
            schema,
            layout,
            buf,
            master,
        }
    }

    fn lookup(&self, name: &str) -> Result<(FieldId, &'a FieldDef), LayoutError> {
        let id = self.schema.field_id(name)?;
        Ok((id, self.schema.def(id)))
    }

    fn range(&self, id: FieldId) -> Result<Range<usize>, LayoutError> {
        let start = self.master + self.layout.field_offset(self.schema, id);
        let size = self.layout.field_size(self.schema, id);
        bounds(self.schema.def(id).name(), start, size, self.buf.len())
    }

    /// Schema of the record
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Start of the record within the bytes it views
    ///
    /// For records reached from a [`Record`] this is the absolute offset in
    /// its buffer; array element views are relative to the array's bytes.
    pub fn master_offset(&self) -> usize {
        self.master
    }

    /// Current size in bytes
    pub fn size(&self) -> usize {
        self.layout.extent(self.schema)
    }

    /// Offset of a field within the bytes the view covers
    pub fn field_offset(&self, name: &str) -> Result<usize, LayoutError> {
        let (id, _) = self.lookup(name)?;
        Ok(self.master + self.layout.field_offset(self.schema, id))
    }

    /// Current size of a field
    pub fn field_size(&self, name: &str) -> Result<usize, LayoutError> {
        let (id, _) = self.lookup(name)?;
        Ok(self.layout.field_size(self.schema, id))
    }

    /// Bytes of the record at its current size
    pub fn as_bytes(&self) -> Result<&'a [u8], LayoutError> {
        let range = bounds(self.schema.name(), self.master, self.size(), self.buf.len())?;
        Ok(&self.buf[range])
    }

    /// Raw bytes of any field at its current extent
    pub fn field_bytes(&self, name: &str) -> Result<&'a [u8], LayoutError> {
        let (id, _) = self.lookup(name)?;
        let range = self.range(id)?;
        Ok(&self.buf[range])
    }

    /// Decode a field
    pub fn get(&self, name: &str) -> Result<Value, LayoutError> {
        let (id, def) = self.lookup(name)?;
        let range = self.range(id)?;
        decode_value(name, def.kind(), self.layout.state(id), &self.buf[range])
    }

    /// Check whether a slot is bound; non-slot fields always are
    pub fn is_bound(&self, name: &str) -> Result<bool, LayoutError> {
        let (id, _) = self.lookup(name)?;
        Ok(!matches!(self.layout.state(id), FieldState::Slot(None)))
    }

    /// Kind of a field, resolving a bound slot to the kind it is bound to
    pub fn field_kind(&self, name: &str) -> Result<&'a FieldKind, LayoutError> {
        let (id, def) = self.lookup(name)?;
        let (kind, _) = effective(name, def.kind(), self.layout.state(id))?;
        Ok(kind)
    }

    /// View of an embedded record
    pub fn record(&self, name: &str) -> Result<RecordRef<'a>, LayoutError> {
        let (id, def) = self.lookup(name)?;
        let (kind, state) = effective(name, def.kind(), self.layout.state(id))?;
        match (kind, state) {
            (FieldKind::Record(schema), FieldState::Record(layout)) => Ok(RecordRef::new(
                schema,
                layout,
                self.buf,
                self.master + self.layout.field_offset(self.schema, id),
            )),
            (kind, _) => Err(expected(name, "record", kind)),
        }
    }

    /// View of a byte-range field
    pub fn bytes(&self, name: &str) -> Result<ByteRange<'a>, LayoutError> {
        let (id, def) = self.lookup(name)?;
        let (kind, _) = effective(name, def.kind(), self.layout.state(id))?;
        if !matches!(kind, FieldKind::Bytes { .. }) {
            return Err(expected(name, "bytes", kind));
        }
        let range = self.range(id)?;
        Ok(ByteRange::new(&self.buf[range]))
    }

    /// View of an array field
    pub fn array(&self, name: &str) -> Result<ArrayRef<'a>, LayoutError> {
        let (id, def) = self.lookup(name)?;
        let (kind, state) = effective(name, def.kind(), self.layout.state(id))?;
        let (shape, element) = match (kind, state_shape(kind, state)) {
            (FieldKind::Array { element, .. }, Some(shape)) => (shape, &**element),
            (kind, _) => return Err(expected(name, "array", kind)),
        };
        let range = self.range(id)?;
        Ok(ArrayRef::new(def.name(), &self.buf[range], shape, element))
    }
}

/// Mutable view of a record at a master offset in a shared buffer
#[derive(Debug)]
pub struct RecordMut<'a> {
    schema: &'a Schema,
    layout: &'a mut Layout,
    buf: &'a mut BytesMut,
    master: usize,
    generation: &'a mut u64,
}

impl<'a> RecordMut<'a> {
    /// Read-only view of the same record
    pub fn as_view(&self) -> RecordRef<'_> {
        RecordRef::new(self.schema, &*self.layout, &self.buf[..], self.master)
    }

    /// Shorter-lived mutable view of the same record
    pub fn reborrow(&mut self) -> RecordMut<'_> {
        RecordMut {
            schema: self.schema,
            layout: &mut *self.layout,
            buf: &mut *self.buf,
            master: self.master,
            generation: &mut *self.generation,
        }
    }

    /// Schema of the record
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Absolute start of the record within the buffer
    pub fn master_offset(&self) -> usize {
        self.master
    }

    /// Current size in bytes
    pub fn size(&self) -> usize {
        self.layout.extent(self.schema)
    }

    /// Absolute offset of a field
    pub fn field_offset(&self, name: &str) -> Result<usize, LayoutError> {
        self.as_view().field_offset(name)
    }

    /// Current size of a field
    pub fn field_size(&self, name: &str) -> Result<usize, LayoutError> {
        self.as_view().field_size(name)
    }

    /// Decode a field
    pub fn get(&self, name: &str) -> Result<Value, LayoutError> {
        self.as_view().get(name)
    }

    /// Check whether a slot is bound
    pub fn is_bound(&self, name: &str) -> Result<bool, LayoutError> {
        self.as_view().is_bound(name)
    }

    /// Kind of a field, resolving a bound slot
    pub fn field_kind(&self, name: &str) -> Result<&FieldKind, LayoutError> {
        self.as_view().field_kind(name)
    }

    fn lookup(&self, name: &str) -> Result<(FieldId, &'a FieldDef), LayoutError> {
        let id = self.schema.field_id(name)?;
        Ok((id, self.schema.def(id)))
    }

    fn bump(&mut self) {
        *self.generation = self.generation.wrapping_add(1);
    }

    /// Assign a field
    ///
    /// The value is encoded and validated first; only then is the buffer
    /// spliced (if the field's size changes) and the bytes copied in.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), LayoutError> {
        let (id, def) = self.lookup(name)?;
        let start = self.master + self.layout.field_offset(self.schema, id);
        let state = self.layout.state(id);
        let old_size = state_size(def.kind(), state);
        let encoded = encode_value(name, def.kind(), state, value.into())?;
        let new_size = encoded.bytes.len();

        bounds(name, start, old_size, self.buf.len())?;
        if new_size != old_size {
            #[cfg(feature = "logging")]
            debug!(
                "Resizing '{}' at offset {} from {} to {} bytes on assignment",
                name, start, old_size, new_size
            );

            splice(self.buf, name, start, old_size, new_size)?;
            self.bump();
        }

        self.buf[start..start + new_size].copy_from_slice(&encoded.bytes);
        *self.layout.state_mut(id) = encoded.state;
        Ok(())
    }

    /// Resize an instance-sized field, shifting following bytes
    pub fn resize(&mut self, name: &str, extent: impl Into<Extent>) -> Result<(), LayoutError> {
        self.resize_with(name, extent, ResizeMode::Shift)
    }

    /// Resize an instance-sized field with an explicit mode
    pub fn resize_with(
        &mut self,
        name: &str,
        extent: impl Into<Extent>,
        mode: ResizeMode,
    ) -> Result<(), LayoutError> {
        let (id, def) = self.lookup(name)?;
        let state = self.layout.state(id);
        let new_state = resized_state(name, def.kind(), state, extent.into())?;
        if new_state == *state {
            return Ok(());
        }

        let old_size = state_size(def.kind(), state);
        let new_size = state_size(def.kind(), &new_state);
        let start = self.master + self.layout.field_offset(self.schema, id);

        #[cfg(feature = "logging")]
        debug!(
            "Resizing '{}' at offset {} from {} to {} bytes ({:?})",
            name, start, old_size, new_size, mode
        );

        if mode == ResizeMode::Shift {
            splice(self.buf, name, start, old_size, new_size)?;
        }
        *self.layout.state_mut(id) = new_state;
        self.bump();
        Ok(())
    }

    /// Bind a runtime-typed slot to a kind, resizing it to the kind's size
    pub fn bind(&mut self, name: &str, kind: FieldKind) -> Result<(), LayoutError> {
        #[cfg(feature = "logging")]
        debug!("Binding slot '{}' to {}", name, kind.kind_name());

        self.resize_with(name, Extent::Kind(kind), ResizeMode::Shift)
    }

    /// Mutable view of an embedded record
    pub fn record_mut(&mut self, name: &str) -> Result<RecordMut<'_>, LayoutError> {
        self.reborrow().into_record(name)
    }

    /// Convert into a mutable view of an embedded record
    pub fn into_record(self, name: &str) -> Result<RecordMut<'a>, LayoutError> {
        let (id, def) = self.lookup(name)?;
        let RecordMut {
            schema,
            layout,
            buf,
            master,
            generation,
        } = self;
        let start = master + layout.field_offset(schema, id);
        let (kind, state) = effective_mut(name, def.kind(), layout.state_mut(id))?;
        match (kind, state) {
            (FieldKind::Record(schema), FieldState::Record(layout)) => Ok(RecordMut {
                schema: &**schema,
                layout,
                buf,
                master: start,
                generation,
            }),
            (kind, _) => Err(expected(name, "record", kind)),
        }
    }

    /// Mutable view of a byte-range field
    pub fn bytes_mut(&mut self, name: &str) -> Result<ByteRangeMut<'_>, LayoutError> {
        self.reborrow().into_bytes_mut(name)
    }

    /// Convert into a mutable view of a byte-range field
    pub fn into_bytes_mut(self, name: &str) -> Result<ByteRangeMut<'a>, LayoutError> {
        let len = self.as_view().bytes(name)?.len();
        let start = self.as_view().field_offset(name)?;
        let RecordMut { buf, .. } = self;
        Ok(ByteRangeMut::new(&mut buf[start..start + len]))
    }

    /// Mutable view of an array field
    pub fn array_mut(&mut self, name: &str) -> Result<ArrayMut<'_>, LayoutError> {
        self.reborrow().into_array_mut(name)
    }

    /// Convert into a mutable view of an array field
    pub fn into_array_mut(self, name: &str) -> Result<ArrayMut<'a>, LayoutError> {
        let (id, def) = self.lookup(name)?;
        let start = self.master + self.layout.field_offset(self.schema, id);
        let size = self.layout.field_size(self.schema, id);
        let range = bounds(name, start, size, self.buf.len())?;

        let RecordMut { layout, buf, .. } = self;
        let layout: &'a Layout = layout;
        let (kind, state) = effective(name, def.kind(), layout.state(id))?;
        let (shape, element) = match (kind, state_shape(kind, state)) {
            (FieldKind::Array { element, .. }, Some(shape)) => (shape, &**element),
            (kind, _) => return Err(expected(name, "array", kind)),
        };
        Ok(ArrayMut::new(def.name(), &mut buf[range], shape, element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Endianness, NdArray};
    use alloc::vec;

    fn header() -> Arc<Schema> {
        Schema::builder("Header")
            .field("magic", FieldKind::u32(Endianness::Big))
            .field("name", FieldKind::string(None))
            .field("tail", FieldKind::u16(Endianness::Little))
            .build()
            .unwrap()
    }

    #[test]
    fn test_fresh_record_has_min_size() {
        let record = Record::new(header());
        assert_eq!(record.size(), 6);
        assert_eq!(record.as_bytes().len(), 6);
        assert_eq!(record.get("name").unwrap(), Value::from(""));
    }

    #[test]
    fn test_variable_string_shifts_tail() {
        let mut record = Record::new(header());
        record.set("magic", 0xCAFE_BABEu32).unwrap();
        record.set("tail", 0x1234u16).unwrap();
        record.set("name", "hi").unwrap();

        assert_eq!(record.size(), 8);
        assert_eq!(record.field_offset("tail").unwrap(), 6);
        assert_eq!(record.get("tail").unwrap(), Value::UInt(0x1234));
        assert_eq!(record.get("magic").unwrap(), Value::UInt(0xCAFE_BABE));
        assert_eq!(record.as_bytes(), &[0xca, 0xfe, 0xba, 0xbe, b'h', b'i', 0x34, 0x12]);
        assert_eq!(record.generation(), 1);
    }

    #[test]
    fn test_resize_same_length_is_noop() {
        let mut record = Record::new(header());
        record.set("name", "abc").unwrap();
        let generation = record.generation();
        record.resize("name", 3usize).unwrap();
        assert_eq!(record.as_bytes().len(), 9);
        assert_eq!(record.generation(), generation);
    }

    #[test]
    fn test_fixed_field_rejects_resize() {
        let mut record = Record::new(header());
        assert!(matches!(
            record.resize("tail", 4usize),
            Err(LayoutError::NotResizable(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_after_external_truncation() {
        let mut record = Record::new(header());
        record.set("name", "hello").unwrap();
        let mut buf = record.into_bytes_mut();
        buf.truncate(7);
        let mut record = Record::from_bytes_mut(header(), buf).unwrap();
        record
            .resize_with("name", 5usize, ResizeMode::Reinterpret)
            .unwrap();
        assert!(matches!(
            record.get("tail"),
            Err(LayoutError::OutOfBounds { offset: 9, size: 2, len: 7, .. })
        ));
    }

    #[test]
    fn test_slot_binding() {
        let schema = Schema::builder("S")
            .field("tag", FieldKind::u8())
            .field("value", FieldKind::slot())
            .field("end", FieldKind::u8())
            .build()
            .unwrap();
        let mut record = Record::new(schema);
        record.set("end", 0xEEu8).unwrap();
        assert!(!record.is_bound("value").unwrap());
        assert_eq!(
            record.get("value"),
            Err(LayoutError::UnboundSlot("value".to_string()))
        );
        assert!(matches!(
            record.set("value", 1u8),
            Err(LayoutError::UnboundSlot(_))
        ));

        record.bind("value", FieldKind::u16(Endianness::Big)).unwrap();
        assert_eq!(
            record.field_kind("value").unwrap(),
            &FieldKind::u16(Endianness::Big)
        );
        record.set("value", 0x0102u16).unwrap();
        assert_eq!(record.as_bytes(), &[0, 1, 2, 0xEE]);
        assert_eq!(record.get("value").unwrap(), Value::UInt(0x0102));

        record.bind("value", FieldKind::string(None)).unwrap();
        assert_eq!(record.size(), 2);
        record.set("value", "xyz").unwrap();
        assert_eq!(record.as_bytes(), &[0, b'x', b'y', b'z', 0xEE]);
        assert_eq!(record.get("end").unwrap(), Value::UInt(0xEE));
    }

    #[test]
    fn test_dynamic_array_reshape_on_assignment() {
        let schema = Schema::builder("A")
            .field("values", FieldKind::dynamic_array(FieldKind::u8()))
            .field("end", FieldKind::u8())
            .build()
            .unwrap();
        let mut record = Record::new(schema);
        record.set("end", 9u8).unwrap();
        let grid = NdArray::new(vec![2, 2], (1u8..=4).map(Value::from).collect()).unwrap();
        record.set("values", grid.clone()).unwrap();
        assert_eq!(record.as_bytes(), &[1, 2, 3, 4, 9]);
        assert_eq!(record.get("values").unwrap(), Value::Array(grid));

        let mut view = record.array_mut("values").unwrap();
        view.set(&[1, 0], 30u8).unwrap();
        assert_eq!(view.get(&[1, 0]).unwrap(), Value::UInt(30));
        assert_eq!(record.as_bytes(), &[1, 2, 30, 4, 9]);
    }

    #[test]
    fn test_stale_handle_detected() {
        let inner = Schema::builder("Inner")
            .field("x", FieldKind::u8())
            .build()
            .unwrap();
        let outer = Schema::builder("Outer")
            .field("data", FieldKind::bytes(None))
            .field("inner", FieldKind::record(inner))
            .build()
            .unwrap();
        let mut record = Record::new(outer);
        let handle = record.handle(&["inner"]).unwrap();
        record.open(&handle).unwrap().set("x", 5u8).unwrap();
        record.resize("data", 8usize).unwrap();
        assert!(matches!(
            record.open(&handle),
            Err(LayoutError::StaleHandle { taken: 0, current: 1 })
        ));
        let fresh = record.handle(&["inner"]).unwrap();
        assert_eq!(record.open(&fresh).unwrap().get("x").unwrap(), Value::UInt(5));
        assert_eq!(record.field_offset("inner").unwrap(), 8);
    }

    #[test]
    fn test_display_renders_hex_bytes() {
        let record = Record::with(header(), [("magic", 1u32)]).unwrap();
        assert_eq!(record.to_string(), "[ 00 00 00 01 00 00 ]");
        assert_eq!(record.to_hex(), "000000010000");
    }
}

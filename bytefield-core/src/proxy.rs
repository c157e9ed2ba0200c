//! Write-through views over byte-range and array fields
//!
//! A proxy borrows the exact byte range of one field. Reads decode straight
//! from the buffer and writes encode straight into it; there is no value
//! cache to flush. Because a proxy holds a borrow of the record, the borrow
//! checker rejects any resize while it is alive.

use crate::array::{element_count, linear_index, unravel_index};
use crate::error::LayoutError;
use crate::field::{decode_value, encode_value};
use crate::layout::{FieldState, Layout};
use crate::record::RecordRef;
use crate::schema::FieldKind;
use crate::types::{NdArray, Value};
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut, Range};

fn byte_index_error(index: usize, len: usize) -> LayoutError {
    LayoutError::IndexOutOfRange {
        index: vec![index],
        shape: vec![len],
    }
}

/// Read-only view of a byte-range field
#[derive(Debug, Clone, Copy)]
pub struct ByteRange<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteRange<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Byte at `index`
    pub fn get(&self, index: usize) -> Result<u8, LayoutError> {
        self.bytes
            .get(index)
            .copied()
            .ok_or_else(|| byte_index_error(index, self.bytes.len()))
    }

    /// The viewed bytes
    pub fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    /// Detached copy of the bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl Deref for ByteRange<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

/// Mutable write-through view of a byte-range field
#[derive(Debug)]
pub struct ByteRangeMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> ByteRangeMut<'a> {
    pub(crate) fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Byte at `index`
    pub fn get(&self, index: usize) -> Result<u8, LayoutError> {
        self.bytes
            .get(index)
            .copied()
            .ok_or_else(|| byte_index_error(index, self.bytes.len()))
    }

    /// Overwrite the byte at `index`
    pub fn set(&mut self, index: usize, value: u8) -> Result<(), LayoutError> {
        let len = self.bytes.len();
        let byte = self
            .bytes
            .get_mut(index)
            .ok_or_else(|| byte_index_error(index, len))?;
        *byte = value;
        Ok(())
    }

    /// Overwrite the whole range; `data` must have the range's length
    pub fn copy_from(&mut self, data: &[u8]) -> Result<(), LayoutError> {
        if data.len() != self.bytes.len() {
            return Err(LayoutError::LengthMismatch {
                field: "<byte range>".to_string(),
                expected: self.bytes.len(),
                actual: data.len(),
            });
        }
        self.bytes.copy_from_slice(data);
        Ok(())
    }

    /// Set every byte of the range to `value`
    pub fn fill(&mut self, value: u8) {
        self.bytes.fill(value);
    }

    /// Detached copy of the bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl Deref for ByteRangeMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl DerefMut for ByteRangeMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

/// Shape and element information shared by both array views
#[derive(Debug, Clone)]
struct ArrayInfo<'a> {
    field: &'a str,
    shape: &'a [usize],
    element: &'a FieldKind,
    element_size: usize,
    element_state: FieldState,
}

impl<'a> ArrayInfo<'a> {
    fn new(field: &'a str, shape: &'a [usize], element: &'a FieldKind) -> Self {
        Self {
            field,
            shape,
            element,
            element_size: element.min_size(),
            element_state: FieldState::initial(element),
        }
    }

    fn len(&self) -> usize {
        element_count(self.shape)
    }

    fn flat_range(&self, linear: usize) -> Result<Range<usize>, LayoutError> {
        if linear >= self.len() {
            return Err(LayoutError::IndexOutOfRange {
                index: vec![linear],
                shape: self.shape.to_vec(),
            });
        }
        let start = linear * self.element_size;
        Ok(start..start + self.element_size)
    }

    fn range(&self, index: &[usize]) -> Result<Range<usize>, LayoutError> {
        self.flat_range(linear_index(self.shape, index)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, LayoutError> {
        decode_value(self.field, self.element, &self.element_state, bytes)
    }

    fn element_layout(&self) -> Result<&Layout, LayoutError> {
        match &self.element_state {
            FieldState::Record(layout) => Ok(layout),
            _ => Err(LayoutError::TypeMismatch {
                field: self.field.to_string(),
                expected: "record",
                found: self.element.kind_name(),
            }),
        }
    }
}

/// Read-only view of an array field
#[derive(Debug, Clone)]
pub struct ArrayRef<'a> {
    bytes: &'a [u8],
    info: ArrayInfo<'a>,
}

impl<'a> ArrayRef<'a> {
    pub(crate) fn new(
        field: &'a str,
        bytes: &'a [u8],
        shape: &'a [usize],
        element: &'a FieldKind,
    ) -> Self {
        Self {
            bytes,
            info: ArrayInfo::new(field, shape, element),
        }
    }

    /// Current shape
    pub fn shape(&self) -> &'a [usize] {
        self.info.shape
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.info.len()
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of every element
    pub fn element_kind(&self) -> &'a FieldKind {
        self.info.element
    }

    /// Size of one element in bytes
    pub fn element_size(&self) -> usize {
        self.info.element_size
    }

    /// Element at an n-dimensional index
    pub fn get(&self, index: &[usize]) -> Result<Value, LayoutError> {
        let range = self.info.range(index)?;
        self.info.decode(&self.bytes[range])
    }

    /// Element at a row-major linear position
    pub fn get_flat(&self, linear: usize) -> Result<Value, LayoutError> {
        let range = self.info.flat_range(linear)?;
        self.info.decode(&self.bytes[range])
    }

    /// Elements in row-major order
    pub fn iter(&self) -> impl Iterator<Item = Result<Value, LayoutError>> + '_ {
        (0..self.len()).map(move |i| self.get_flat(i))
    }

    /// View of a record element
    pub fn record(&self, index: &[usize]) -> Result<RecordRef<'_>, LayoutError> {
        let range = self.info.range(index)?;
        let schema = match self.info.element {
            FieldKind::Record(schema) => schema,
            other => {
                return Err(LayoutError::TypeMismatch {
                    field: self.info.field.to_string(),
                    expected: "record",
                    found: other.kind_name(),
                })
            }
        };
        let layout = self.info.element_layout()?;
        Ok(RecordRef::new(schema, layout, self.bytes, range.start))
    }

    /// Read one field of a record element
    pub fn get_field(&self, index: &[usize], field: &str) -> Result<Value, LayoutError> {
        self.record(index)?.get(field)
    }

    /// Materialize a detached copy of the whole array
    pub fn to_array(&self) -> Result<NdArray, LayoutError> {
        let values = self.iter().collect::<Result<Vec<_>, _>>()?;
        NdArray::new(self.info.shape.to_vec(), values)
    }
}

/// Mutable write-through view of an array field
///
/// The shape is fixed for the lifetime of the view; reshaping goes through
/// the owning record.
#[derive(Debug)]
pub struct ArrayMut<'a> {
    bytes: &'a mut [u8],
    info: ArrayInfo<'a>,
}

impl<'a> ArrayMut<'a> {
    pub(crate) fn new(
        field: &'a str,
        bytes: &'a mut [u8],
        shape: &'a [usize],
        element: &'a FieldKind,
    ) -> Self {
        Self {
            bytes,
            info: ArrayInfo::new(field, shape, element),
        }
    }

    /// Read-only view of the same array
    pub fn as_view(&self) -> ArrayRef<'_> {
        ArrayRef {
            bytes: self.bytes,
            info: self.info.clone(),
        }
    }

    /// Current shape
    pub fn shape(&self) -> &'a [usize] {
        self.info.shape
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.info.len()
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at an n-dimensional index
    pub fn get(&self, index: &[usize]) -> Result<Value, LayoutError> {
        let range = self.info.range(index)?;
        self.info.decode(&self.bytes[range])
    }

    /// Element at a row-major linear position
    pub fn get_flat(&self, linear: usize) -> Result<Value, LayoutError> {
        let range = self.info.flat_range(linear)?;
        self.info.decode(&self.bytes[range])
    }

    fn write(&mut self, range: Range<usize>, value: Value) -> Result<(), LayoutError> {
        let encoded = encode_value(
            self.info.field,
            self.info.element,
            &self.info.element_state,
            value,
        )?;
        self.bytes[range].copy_from_slice(&encoded.bytes);
        Ok(())
    }

    /// Overwrite the element at an n-dimensional index
    pub fn set(&mut self, index: &[usize], value: impl Into<Value>) -> Result<(), LayoutError> {
        let range = self.info.range(index)?;
        self.write(range, value.into())
    }

    /// Overwrite the element at a row-major linear position
    pub fn set_flat(&mut self, linear: usize, value: impl Into<Value>) -> Result<(), LayoutError> {
        let range = self.info.flat_range(linear)?;
        self.write(range, value.into())
    }

    /// Read one field of a record element
    pub fn get_field(&self, index: &[usize], field: &str) -> Result<Value, LayoutError> {
        self.as_view().get_field(index, field)
    }

    /// Overwrite one field of a record element in place
    pub fn set_field(
        &mut self,
        index: &[usize],
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), LayoutError> {
        let range = self.info.range(index)?;
        let schema = match self.info.element {
            FieldKind::Record(schema) => schema,
            other => {
                return Err(LayoutError::TypeMismatch {
                    field: self.info.field.to_string(),
                    expected: "record",
                    found: other.kind_name(),
                })
            }
        };
        let layout = self.info.element_layout()?;
        let id = schema.field_id(field)?;
        let kind = schema.def(id).kind();
        let start = range.start + layout.field_offset(schema, id);
        let encoded = encode_value(field, kind, layout.state(id), value.into())?;
        self.bytes[start..start + encoded.bytes.len()].copy_from_slice(&encoded.bytes);
        Ok(())
    }

    /// Overwrite every element in row-major order
    pub fn fill(&mut self, value: impl Into<Value>) -> Result<(), LayoutError> {
        let value = value.into();
        for i in 0..self.len() {
            let range = self.info.flat_range(i)?;
            self.write(range, value.clone())?;
        }
        Ok(())
    }

    /// N-dimensional index of a linear position
    pub fn unravel(&self, linear: usize) -> Result<Vec<usize>, LayoutError> {
        unravel_index(self.info.shape, linear)
    }

    /// Materialize a detached copy of the whole array
    pub fn to_array(&self) -> Result<NdArray, LayoutError> {
        self.as_view().to_array()
    }
}

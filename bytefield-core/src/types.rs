//! Core types for Bytefield values and encodings

use crate::error::LayoutError;
use crate::record::Record;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// Byte order of a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    /// Host byte order
    #[default]
    Native,
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// Text encoding of a string field
///
/// Only the single-byte encodings and the UTF family are supported.
/// Multi-byte legacy code pages such as Shift-JIS or GBK are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// UTF-8
    #[default]
    Utf8,
    /// 7-bit ASCII
    Ascii,
    /// ISO-8859-1, one byte per code point below 256
    Latin1,
    /// UTF-16, little-endian code units
    Utf16Le,
    /// UTF-16, big-endian code units
    Utf16Be,
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Single precision float
    F32(f32),
    /// Double precision float
    F64(f64),
    /// Boolean
    Bool(bool),
    /// Decoded text
    Str(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// N-dimensional array of values
    Array(NdArray),
    /// Detached copy of an embedded record
    Record(Record),
}

impl Value {
    /// Name of the variant, used in type mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
        }
    }

    /// Get the value as a signed integer, if it is an integer that fits
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Get the value as an unsigned integer, if it is a non-negative integer
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(v) => u64::try_from(v).ok(),
            Value::UInt(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as a double, if it is a float
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a byte slice
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the value as an array
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get the value as a record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $wide:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $wide)
                }
            }
        )*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64);
impl_from_int!(UInt, u64: u8, u16, u32, u64);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Value::Array(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

/// Row-major n-dimensional array of values
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    values: Vec<Value>,
}

impl NdArray {
    /// Create an array with the given shape; `values` are in row-major order
    pub fn new(shape: Vec<usize>, values: Vec<Value>) -> Result<Self, LayoutError> {
        if shape.is_empty() {
            return Err(LayoutError::InvalidSchema(
                "array shape cannot be empty".to_string(),
            ));
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(LayoutError::ShapeMismatch {
                field: String::new(),
                expected: shape,
                actual: alloc::vec![values.len()],
            });
        }
        Ok(Self { shape, values })
    }

    /// Create a one-dimensional array
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self {
            shape: alloc::vec![values.len()],
            values,
        }
    }

    /// Shape of the array
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element at an n-dimensional index
    pub fn get(&self, index: &[usize]) -> Option<&Value> {
        let linear = crate::array::linear_index(&self.shape, index).ok()?;
        self.values.get(linear)
    }

    /// Elements in row-major order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the array, returning its elements in row-major order
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl<T: Into<Value>> FromIterator<T> for NdArray {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

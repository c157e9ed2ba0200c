//! Field-level get/set contract: decode a field's bytes into a [`Value`]
//! and encode a [`Value`] into the bytes and instance state of a field

use crate::array::element_count;
use crate::codec;
use crate::constants::MAX_LAYOUT_SIZE;
use crate::error::LayoutError;
use crate::layout::{state_shape, state_size, Bound, FieldState, Layout};
use crate::record::Record;
use crate::schema::{too_large, validate_shape, FieldKind};
use crate::types::{NdArray, Value};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use bytes::Bytes;

/// New extent for an instance-sized field
#[derive(Debug, Clone, PartialEq)]
pub enum Extent {
    /// Length in bytes of a variable string or byte range
    Len(usize),
    /// Shape of a dynamic array
    Shape(Vec<usize>),
    /// Kind a runtime-typed slot is bound to
    Kind(FieldKind),
}

impl From<usize> for Extent {
    fn from(len: usize) -> Self {
        Extent::Len(len)
    }
}

impl From<Vec<usize>> for Extent {
    fn from(shape: Vec<usize>) -> Self {
        Extent::Shape(shape)
    }
}

impl From<FieldKind> for Extent {
    fn from(kind: FieldKind) -> Self {
        Extent::Kind(kind)
    }
}

/// How a resize treats the bytes of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Splice the buffer so following fields keep their bytes
    #[default]
    Shift,
    /// Only change the recorded extent; the buffer is left as is. Used to
    /// decode a buffer whose dynamic lengths are already present.
    Reinterpret,
}

/// Encoded bytes of a value together with the instance state they imply
pub(crate) struct Encoded {
    pub(crate) bytes: Vec<u8>,
    pub(crate) state: FieldState,
}

/// Decode the bytes of one field
///
/// `bytes` must be exactly the field's current byte range.
pub(crate) fn decode_value(
    field: &str,
    kind: &FieldKind,
    state: &FieldState,
    bytes: &[u8],
) -> Result<Value, LayoutError> {
    let value = match kind {
        FieldKind::Int { signed, endian, .. } => {
            if *signed {
                Value::Int(codec::read_int(bytes, *endian))
            } else {
                Value::UInt(codec::read_uint(bytes, *endian))
            }
        }
        FieldKind::Float { endian } => Value::F32(codec::read_f32(bytes, *endian)),
        FieldKind::Double { endian } => Value::F64(codec::read_f64(bytes, *endian)),
        FieldKind::Bool { endian, .. } => Value::Bool(codec::read_uint(bytes, *endian) != 0),
        FieldKind::Str { encoding, .. } => Value::Str(codec::decode_text(bytes, *encoding)?),
        FieldKind::Bytes { .. } => Value::Bytes(bytes.to_vec()),
        FieldKind::Record(schema) => {
            let layout = match state {
                FieldState::Record(layout) => layout.clone(),
                _ => Layout::minimal(schema),
            };
            Value::Record(Record::from_parts(schema.clone(), layout, bytes))
        }
        FieldKind::Array { element, .. } => {
            let shape = state_shape(kind, state).unwrap_or(&[0]).to_vec();
            let elem_size = element.min_size();
            let elem_state = FieldState::initial(element);
            let values = (0..element_count(&shape))
                .map(|i| {
                    let start = i * elem_size;
                    decode_value(field, element, &elem_state, &bytes[start..start + elem_size])
                })
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(NdArray::new(shape, values)?)
        }
        FieldKind::Slot => match state {
            FieldState::Slot(Some(bound)) => decode_value(field, &bound.kind, &bound.state, bytes)?,
            _ => return Err(LayoutError::UnboundSlot(field.to_string())),
        },
    };
    Ok(value)
}

fn type_mismatch(field: &str, expected: &'static str, value: &Value) -> LayoutError {
    LayoutError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: value.type_name(),
    }
}

/// Encode a value for a field currently in `state`
///
/// Nothing is written to a buffer here: every check that can fail runs
/// before the caller splices or copies.
pub(crate) fn encode_value(
    field: &str,
    kind: &FieldKind,
    state: &FieldState,
    value: Value,
) -> Result<Encoded, LayoutError> {
    let fixed = |bytes: Vec<u8>| Encoded {
        bytes,
        state: FieldState::Fixed,
    };

    match kind {
        FieldKind::Int {
            width,
            signed,
            endian,
        } => {
            let wide: i128 = match value {
                Value::Int(v) => v as i128,
                Value::UInt(v) => v as i128,
                ref other => return Err(type_mismatch(field, "int", other)),
            };
            let raw = codec::int_bits(wide, *width, *signed).ok_or_else(|| {
                LayoutError::ValueOutOfRange {
                    field: field.to_string(),
                    value: format!("{}", wide),
                }
            })?;
            let mut bytes = vec![0u8; *width as usize];
            codec::write_uint(&mut bytes, raw, *endian);
            Ok(fixed(bytes))
        }
        FieldKind::Float { endian } | FieldKind::Double { endian } => {
            let v = value
                .as_f64()
                .ok_or_else(|| type_mismatch(field, "float", &value))?;
            let mut bytes = vec![0u8; kind.min_size()];
            if matches!(kind, FieldKind::Float { .. }) {
                codec::write_f32(&mut bytes, v as f32, *endian);
            } else {
                codec::write_f64(&mut bytes, v, *endian);
            }
            Ok(fixed(bytes))
        }
        FieldKind::Bool { width, endian } => {
            let v = value
                .as_bool()
                .ok_or_else(|| type_mismatch(field, "bool", &value))?;
            let mut bytes = vec![0u8; *width as usize];
            codec::write_uint(&mut bytes, v as u64, *endian);
            Ok(fixed(bytes))
        }
        FieldKind::Str { length, encoding } => {
            let text = match value {
                Value::Str(s) => s,
                ref other => return Err(type_mismatch(field, "string", other)),
            };
            let mut bytes = codec::encode_text(&text, *encoding)?;
            match length {
                Some(len) => {
                    if bytes.len() > *len {
                        return Err(LayoutError::LengthMismatch {
                            field: field.to_string(),
                            expected: *len,
                            actual: bytes.len(),
                        });
                    }
                    bytes.resize(*len, 0);
                    Ok(fixed(bytes))
                }
                None => {
                    let len = bytes.len();
                    Ok(Encoded {
                        bytes,
                        state: FieldState::Len(len),
                    })
                }
            }
        }
        FieldKind::Bytes { length } => {
            let bytes = match value {
                Value::Bytes(b) => b,
                ref other => return Err(type_mismatch(field, "bytes", other)),
            };
            match length {
                Some(len) if bytes.len() != *len => Err(LayoutError::LengthMismatch {
                    field: field.to_string(),
                    expected: *len,
                    actual: bytes.len(),
                }),
                Some(_) => Ok(fixed(bytes)),
                None => {
                    let len = bytes.len();
                    Ok(Encoded {
                        bytes,
                        state: FieldState::Len(len),
                    })
                }
            }
        }
        FieldKind::Record(schema) => {
            let record = match value {
                Value::Record(r) => r,
                ref other => return Err(type_mismatch(field, "record", other)),
            };
            if !record.has_schema(schema) {
                return Err(LayoutError::SchemaMismatch {
                    field: field.to_string(),
                    expected: schema.name().to_string(),
                    actual: record.schema().name().to_string(),
                });
            }
            let bytes = record.used_bytes()?.to_vec();
            let (_, layout, _) = record.into_parts();
            Ok(Encoded {
                bytes,
                state: FieldState::Record(layout),
            })
        }
        FieldKind::Array { shape, element } => {
            let array = match value {
                Value::Array(a) => a,
                ref other => return Err(type_mismatch(field, "array", other)),
            };
            let new_state = match shape {
                Some(declared) => {
                    if declared.as_slice() != array.shape() {
                        return Err(LayoutError::ShapeMismatch {
                            field: field.to_string(),
                            expected: declared.clone(),
                            actual: array.shape().to_vec(),
                        });
                    }
                    FieldState::Fixed
                }
                None => {
                    validate_shape(field, array.shape())?;
                    FieldState::Shape(array.shape().to_vec())
                }
            };
            let elem_state = FieldState::initial(element);
            let mut bytes = Vec::with_capacity(element.min_size() * array.len());
            for item in array.into_values() {
                let encoded = encode_value(field, element, &elem_state, item)?;
                bytes.extend_from_slice(&encoded.bytes);
            }
            Ok(Encoded {
                bytes,
                state: new_state,
            })
        }
        FieldKind::Slot => match state {
            FieldState::Slot(Some(bound)) => {
                let inner = encode_value(field, &bound.kind, &bound.state, value)?;
                Ok(Encoded {
                    bytes: inner.bytes,
                    state: FieldState::Slot(Some(Box::new(Bound {
                        kind: bound.kind.clone(),
                        state: inner.state,
                    }))),
                })
            }
            _ => Err(LayoutError::UnboundSlot(field.to_string())),
        },
    }
}

/// Compute the state of a field after resizing it to `extent`
pub(crate) fn resized_state(
    field: &str,
    kind: &FieldKind,
    state: &FieldState,
    extent: Extent,
) -> Result<FieldState, LayoutError> {
    match (kind, state, extent) {
        (FieldKind::Str { length: None, .. }, _, Extent::Len(len))
        | (FieldKind::Bytes { length: None }, _, Extent::Len(len)) => {
            if len > MAX_LAYOUT_SIZE {
                return Err(too_large(field, len));
            }
            Ok(FieldState::Len(len))
        }
        (FieldKind::Array { shape: None, element }, _, Extent::Shape(shape)) => {
            validate_shape(field, &shape)?;
            let bytes = element_count(&shape).saturating_mul(element.min_size());
            if bytes > MAX_LAYOUT_SIZE {
                return Err(too_large(field, bytes));
            }
            Ok(FieldState::Shape(shape))
        }
        (FieldKind::Slot, _, Extent::Kind(bound)) => {
            bound.validate(field)?;
            if matches!(bound, FieldKind::Slot) {
                return Err(LayoutError::InvalidSchema(format!(
                    "slot '{}' cannot be bound to another slot",
                    field
                )));
            }
            let state = FieldState::initial(&bound);
            Ok(FieldState::Slot(Some(Box::new(Bound { kind: bound, state }))))
        }
        (FieldKind::Slot, FieldState::Slot(Some(bound)), extent) => {
            let state = resized_state(field, &bound.kind, &bound.state, extent)?;
            Ok(FieldState::Slot(Some(Box::new(Bound {
                kind: bound.kind.clone(),
                state,
            }))))
        }
        (FieldKind::Slot, _, _) => Err(LayoutError::UnboundSlot(field.to_string())),
        _ => Err(LayoutError::NotResizable(field.to_string())),
    }
}

/// Interpret `bytes` as one value of `kind`
///
/// Variable-length kinds take the whole input; a dynamic array takes as
/// many whole elements as fit.
pub fn unpack(bytes: &[u8], kind: &FieldKind) -> Result<Value, LayoutError> {
    const FIELD: &str = "<unpack>";
    kind.validate(FIELD)?;
    let mut state = FieldState::initial(kind);
    match (kind, &mut state) {
        (_, FieldState::Len(len)) => *len = bytes.len(),
        (FieldKind::Array { element, .. }, FieldState::Shape(shape)) => {
            *shape = vec![bytes.len() / element.min_size().max(1)];
        }
        _ => {}
    }
    let size = state_size(kind, &state);
    if size > bytes.len() {
        return Err(LayoutError::OutOfBounds {
            field: String::from(FIELD),
            offset: 0,
            size,
            len: bytes.len(),
        });
    }
    decode_value(FIELD, kind, &state, &bytes[..size])
}

/// Produce the encoding of one value for `kind`
pub fn pack(value: impl Into<Value>, kind: &FieldKind) -> Result<Bytes, LayoutError> {
    const FIELD: &str = "<pack>";
    kind.validate(FIELD)?;
    let encoded = encode_value(FIELD, kind, &FieldState::initial(kind), value.into())?;
    Ok(Bytes::from(encoded.bytes))
}

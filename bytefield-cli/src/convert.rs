//! Conversion between JSON and field values
//!
//! Byte ranges are rendered as lowercase hex strings; arrays become nested
//! JSON arrays following their shape; embedded records become objects.

use anyhow::{bail, Context, Result};
use bytefield_core::{FieldKind, LayoutError, NdArray, Record, RecordRef, Value};
use serde_json::{json, Map, Number, Value as Json};
use tracing::warn;

/// Render a decoded value as JSON
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Int(v) => Json::from(*v),
        Value::UInt(v) => Json::from(*v),
        Value::F32(v) => float_to_json(*v as f64),
        Value::F64(v) => float_to_json(*v),
        Value::Bool(v) => Json::Bool(*v),
        Value::Str(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(hex::encode(b)),
        Value::Array(a) => nest(a.shape(), a.values()),
        Value::Record(r) => record_to_json(r.view()),
    }
}

fn float_to_json(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

fn nest(shape: &[usize], values: &[Value]) -> Json {
    match shape {
        [] | [_] => Json::Array(values.iter().map(value_to_json).collect()),
        [outer, inner @ ..] => {
            let stride: usize = inner.iter().product();
            Json::Array(
                (0..*outer)
                    .map(|i| nest(inner, &values[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}

/// Render every field of a record as a JSON object
///
/// Unbound slots render as `null`; fields that cannot be decoded render as
/// `{"error": ..}` so the rest of the record is still shown.
pub fn record_to_json(view: RecordRef<'_>) -> Json {
    let mut object = Map::new();
    for field in view.schema().fields() {
        let name = field.name();
        let json = match view.get(name) {
            Ok(value) => value_to_json(&value),
            Err(LayoutError::UnboundSlot(_)) => Json::Null,
            Err(e) => {
                warn!("Cannot decode '{}': {}", name, e);
                json!({ "error": e.to_string() })
            }
        };
        object.insert(name.to_string(), json);
    }
    Json::Object(object)
}

/// Convert JSON into a value for a field of `kind`
pub fn json_to_value(json: &Json, kind: &FieldKind) -> Result<Value> {
    let value = match kind {
        FieldKind::Int { signed: true, .. } => {
            Value::Int(json.as_i64().context("expected a signed integer")?)
        }
        FieldKind::Int { signed: false, .. } => {
            Value::UInt(json.as_u64().context("expected an unsigned integer")?)
        }
        FieldKind::Float { .. } => Value::F32(json.as_f64().context("expected a number")? as f32),
        FieldKind::Double { .. } => Value::F64(json.as_f64().context("expected a number")?),
        FieldKind::Bool { .. } => Value::Bool(json.as_bool().context("expected true or false")?),
        FieldKind::Str { .. } => Value::Str(json.as_str().context("expected a string")?.to_string()),
        FieldKind::Bytes { .. } => Value::Bytes(json_to_bytes(json)?),
        FieldKind::Record(schema) => {
            let object = json.as_object().context("expected a JSON object")?;
            let mut record = Record::new(schema.clone());
            for (name, item) in object {
                let kind = record.field_kind(name)?.clone();
                let value = json_to_value(item, &kind)
                    .with_context(|| format!("Invalid value for '{}'", name))?;
                record.set(name, value)?;
            }
            Value::Record(record)
        }
        FieldKind::Array { element, .. } => {
            if !json.is_array() {
                bail!("expected a JSON array");
            }
            let mut shape = Vec::new();
            let mut leaves = Vec::new();
            flatten(json, 0, &mut shape, &mut None, &mut leaves)?;
            let values = leaves
                .into_iter()
                .map(|leaf| json_to_value(leaf, element))
                .collect::<Result<Vec<_>>>()?;
            Value::Array(NdArray::new(shape, values)?)
        }
        FieldKind::Slot => bail!("slot has to be bound before it can be assigned"),
    };
    Ok(value)
}

fn json_to_bytes(json: &Json) -> Result<Vec<u8>> {
    match json {
        Json::String(s) => hex::decode(s).with_context(|| format!("'{}' is not valid hex", s)),
        Json::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .context("byte arrays hold integers 0..=255")
            })
            .collect(),
        _ => bail!("expected a hex string or an array of bytes"),
    }
}

/// Collect the leaves of nested JSON arrays in row-major order, checking
/// that every level has the same length
fn flatten<'j>(
    json: &'j Json,
    depth: usize,
    shape: &mut Vec<usize>,
    rank: &mut Option<usize>,
    leaves: &mut Vec<&'j Json>,
) -> Result<()> {
    match json {
        Json::Array(items) => {
            if rank.map_or(false, |r| depth >= r) {
                bail!("ragged array: unexpected nesting at depth {}", depth);
            }
            match shape.get(depth) {
                None => shape.push(items.len()),
                Some(&len) if len != items.len() => bail!(
                    "ragged array: expected {} items at depth {}, found {}",
                    len,
                    depth,
                    items.len()
                ),
                Some(_) => {}
            }
            for item in items {
                flatten(item, depth + 1, shape, rank, leaves)?;
            }
        }
        leaf => {
            match *rank {
                None => *rank = Some(depth),
                Some(r) if r != depth => {
                    bail!("ragged array: element at depth {} instead of {}", depth, r)
                }
                Some(_) => {}
            }
            leaves.push(leaf);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytefield_core::{Endianness, Schema};

    #[test]
    fn test_scalars_follow_kind() {
        let kind = FieldKind::u16(Endianness::Big);
        assert_eq!(json_to_value(&json!(7), &kind).unwrap(), Value::UInt(7));
        assert!(json_to_value(&json!(-7), &kind).is_err());
        assert_eq!(
            json_to_value(&json!(-7), &FieldKind::i8()).unwrap(),
            Value::Int(-7)
        );
        assert_eq!(
            json_to_value(&json!("00ff"), &FieldKind::bytes(None)).unwrap(),
            Value::Bytes(vec![0, 255])
        );
        assert_eq!(
            json_to_value(&json!([1, 2]), &FieldKind::bytes(None)).unwrap(),
            Value::Bytes(vec![1, 2])
        );
    }

    #[test]
    fn test_nested_arrays_round_trip() {
        let kind = FieldKind::dynamic_array(FieldKind::u8());
        let json = json!([[1, 2, 3], [4, 5, 6]]);
        let value = json_to_value(&json, &kind).unwrap();
        assert_eq!(value.as_array().unwrap().shape(), &[2, 3]);
        assert_eq!(value_to_json(&value), json);

        assert!(json_to_value(&json!([[1, 2], [3]]), &kind).is_err());
        assert!(json_to_value(&json!([[1, 2], 3]), &kind).is_err());
    }

    #[test]
    fn test_record_object() {
        let schema = Schema::builder("Pair")
            .field("key", FieldKind::string(None))
            .field("value", FieldKind::i32(Endianness::Little))
            .build()
            .unwrap();
        let kind = FieldKind::record(schema);
        let value = json_to_value(&json!({ "key": "k", "value": -1 }), &kind).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.size(), 5);
        assert_eq!(record_to_json(record.view()), json!({ "key": "k", "value": -1 }));
    }
}

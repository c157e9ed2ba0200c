//! Fuzzing entry points for bytefield-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_inspect

use bytefield_core::{
    Endianness, Extent, FieldKind, Record, RecordRef, ResizeMode, Schema, SchemaDecl,
    TextEncoding, Value,
};
use std::sync::Arc;

fn inner() -> Option<Arc<Schema>> {
    Schema::builder("Inner")
        .field("a", FieldKind::i32(Endianness::Little))
        .field("blob", FieldKind::bytes(None))
        .build()
        .ok()
}

fn target(inner: &Arc<Schema>) -> Option<Arc<Schema>> {
    Schema::builder("Target")
        .field("tag", FieldKind::u8())
        .field("text_len", FieldKind::u8())
        .field("items_len", FieldKind::u8())
        .field("text", FieldKind::string_with(None, TextEncoding::Utf16Le))
        .field("items", FieldKind::dynamic_array(FieldKind::u16(Endianness::Big)))
        .field("inner", FieldKind::record(inner.clone()))
        .field("slot", FieldKind::slot())
        .field_after("tail", FieldKind::u32(Endianness::Big), "slot", 0)
        .build()
        .ok()
}

fn slot_kind(selector: u8, inner: &Arc<Schema>) -> FieldKind {
    match selector % 5 {
        0 => FieldKind::double(Endianness::Little),
        1 => FieldKind::string(None),
        2 => FieldKind::array(vec![2, 2], FieldKind::i8()),
        3 => FieldKind::record(inner.clone()),
        _ => FieldKind::boolean(),
    }
}

/// Decode every field, descending into embedded records
fn read_all(view: RecordRef<'_>) {
    for field in view.schema().fields() {
        let _ = view.get(field.name());
        if let Ok(nested) = view.record(field.name()) {
            read_all(nested);
        }
        if let Ok(array) = view.array(field.name()) {
            let _ = array.to_array();
        }
    }
}

/// Interpret arbitrary bytes as a record whose dynamic extents come from
/// its own header bytes
pub fn fuzz_inspect(data: &[u8]) {
    let Some(inner) = inner() else { return };
    let Some(schema) = target(&inner) else { return };
    let Ok(mut record) = Record::from_slice(schema, data) else {
        return;
    };

    let header = |i: usize| data.get(i).copied().unwrap_or(0);
    let _ = record.resize_with("text", header(1) as usize, ResizeMode::Reinterpret);
    let _ = record.resize_with(
        "items",
        Extent::Shape(vec![header(2) as usize]),
        ResizeMode::Reinterpret,
    );
    if let Ok(mut nested) = record.record_mut("inner") {
        let _ = nested.resize_with("blob", header(0) as usize, ResizeMode::Reinterpret);
    }
    let _ = record.resize_with(
        "slot",
        Extent::Kind(slot_kind(header(0), &inner)),
        ResizeMode::Reinterpret,
    );

    read_all(record.view());
    let _ = record.to_string();
}

/// Apply an arbitrary sequence of edits, checking the buffer always
/// matches the record size and the trailing field keeps its value
pub fn fuzz_edit(data: &[u8]) {
    let Some(inner) = inner() else { return };
    let Some(schema) = target(&inner) else { return };
    let mut record = Record::new(schema);
    if record.set("tail", 0xDEAD_BEEFu32).is_err() {
        return;
    }

    for op in data.chunks(2) {
        let arg = op.get(1).copied().unwrap_or(0);
        let _ = match op[0] % 7 {
            0 => record.set("text", "x".repeat(arg as usize % 32)),
            1 => record.resize("items", Extent::Shape(vec![arg as usize % 16])),
            2 => record
                .record_mut("inner")
                .and_then(|mut nested| nested.set("blob", vec![arg; arg as usize % 24])),
            3 => record.bind("slot", slot_kind(arg, &inner)),
            4 => record.set("slot", Value::from(arg)),
            5 => record.resize("text", arg as usize % 40),
            _ => record
                .array_mut("items")
                .and_then(|mut items| items.fill(arg as u16)),
        };

        assert_eq!(record.as_bytes().len(), record.size());
        assert_eq!(record.get("tail"), Ok(Value::UInt(0xDEAD_BEEF)));
    }
}

/// Parse arbitrary bytes as a JSON schema declaration and lay it out
pub fn fuzz_schema(data: &[u8]) {
    let Ok(decl) = serde_json::from_slice::<SchemaDecl>(data) else {
        return;
    };
    let Ok(schema) = decl.into_schema() else {
        return;
    };
    let record = Record::new(schema);
    assert_eq!(record.as_bytes().len(), record.schema().min_size());
    read_all(record.view());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_inspect_empty() {
        fuzz_inspect(&[]);
    }

    #[test]
    fn test_fuzz_inspect_random() {
        fuzz_inspect(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22, 0x33]);
        fuzz_inspect(&[0xFF; 1024]);
    }

    #[test]
    fn test_fuzz_edit_sequences() {
        fuzz_edit(&[]);
        fuzz_edit(&[0, 5, 1, 3, 2, 7, 3, 1, 4, 9, 5, 0, 6, 2]);
        let ops: Vec<u8> = (0..=255u8).collect();
        fuzz_edit(&ops);
    }

    #[test]
    fn test_fuzz_schema() {
        fuzz_schema(b"not json");
        fuzz_schema(br#"{"name":"S","fields":[{"name":"a","kind":{"type":"int","width":3}}]}"#);
        fuzz_schema(
            br#"{"name":"S","fields":[
                {"name":"a","kind":{"type":"string"}},
                {"name":"b","kind":{"type":"array","shape":[2,2],"element":{"type":"double"}}},
                {"name":"c","kind":{"type":"slot"},"offset":{"after":{"field":"a","delta":-0}}}
            ]}"#,
        );
    }
}

//! Known-answer layout vectors
//!
//! Each vector builds a record through the public API and compares the
//! backing buffer with a hex literal.

use bytefield_core::{
    Endianness, Extent, FieldKind, NdArray, Record, Schema, TextEncoding, Value,
};

fn assert_hex(record: &Record, expected: &str) {
    let expected = hex::decode(expected).unwrap();
    assert_eq!(record.as_bytes(), &expected[..], "got {}", record);
}

#[test]
fn vector_endianness() {
    let schema = Schema::builder("Ints")
        .field("be", FieldKind::u32(Endianness::Big))
        .field("le", FieldKind::u32(Endianness::Little))
        .field("neg", FieldKind::i16(Endianness::Big))
        .field("f", FieldKind::float(Endianness::Big))
        .build()
        .unwrap();
    let record = Record::with(
        schema,
        [
            ("be", Value::from(0x0102_0304u32)),
            ("le", Value::from(0x0102_0304u32)),
            ("neg", Value::from(-2i16)),
            ("f", Value::from(1.0f32)),
        ],
    )
    .unwrap();
    assert_hex(&record, "0102030404030201fffe3f800000");
}

#[test]
fn vector_fixed_strings_and_bools() {
    let schema = Schema::builder("Fixed")
        .field("name", FieldKind::string(Some(6)))
        .field("wide", FieldKind::string_with(Some(4), TextEncoding::Utf16Be))
        .field("ok", FieldKind::boolean_with(2, Endianness::Little))
        .build()
        .unwrap();
    let record = Record::with(
        schema,
        [
            ("name", Value::from("abc")),
            ("wide", Value::from("hi")),
            ("ok", Value::from(true)),
        ],
    )
    .unwrap();
    assert_hex(&record, "616263000000006800690100");
}

#[test]
fn vector_dynamic_sections() {
    let schema = Schema::builder("Sections")
        .field("count", FieldKind::u8())
        .field("items", FieldKind::dynamic_array(FieldKind::u16(Endianness::Big)))
        .field("note", FieldKind::string_with(None, TextEncoding::Ascii))
        .field("end", FieldKind::u8())
        .build()
        .unwrap();
    let mut record = Record::new(schema);
    record.set("end", 0xFFu8).unwrap();
    record.set("count", 2u8).unwrap();
    record
        .set("items", NdArray::from_iter([0x0A0Bu16, 0x0C0D]))
        .unwrap();
    record.set("note", "ok").unwrap();
    assert_hex(&record, "020a0b0c0d6f6bff");

    record.resize("items", Extent::Shape(vec![1])).unwrap();
    assert_hex(&record, "020a0b6f6bff");

    record.resize("note", 0usize).unwrap();
    assert_hex(&record, "020a0bff");
}

#[test]
fn vector_embedded_record() {
    let inner = Schema::builder("Inner")
        .field("len", FieldKind::u8())
        .field("body", FieldKind::bytes(None))
        .build()
        .unwrap();
    let outer = Schema::builder("Outer")
        .field("a", FieldKind::u8())
        .field("inner", FieldKind::record(inner))
        .field("z", FieldKind::u8())
        .build()
        .unwrap();

    let mut record = Record::with(outer, [("a", 0x11u8), ("z", 0x99u8)]).unwrap();
    let mut nested = record.record_mut("inner").unwrap();
    nested.set("body", vec![0xC0u8, 0xDE]).unwrap();
    nested.set("len", 2u8).unwrap();
    assert_hex(&record, "1102c0de99");
}

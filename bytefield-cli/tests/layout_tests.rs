use std::fs;
use tempfile::tempdir;

use bytefield_cli::commands::layout;
use bytefield_cli::input::{apply_extents, parse_schema};
use bytefield_cli::ExtentArg;
use bytefield_core::Record;

const FRAME: &str = r#"{
  "name": "Frame",
  "fields": [
    { "name": "len", "kind": { "type": "int", "width": 1, "signed": false } },
    { "name": "body", "kind": { "type": "bytes" } },
    { "name": "inner", "kind": { "type": "record", "schema": {
        "name": "Inner",
        "fields": [ { "name": "a", "kind": { "type": "int", "width": 2 } } ]
    } } },
    { "name": "crc", "kind": { "type": "int", "width": 2, "signed": false }, "offset": { "after": { "field": "body", "delta": 2 } } },
    { "name": "tag", "kind": { "type": "string", "length": 2 }, "offset": { "absolute": 0 } }
  ]
}"#;

#[test]
fn test_describe_fresh_record() {
    let record = Record::new(parse_schema(FRAME).unwrap());
    let rows = layout::describe(record.view()).unwrap();

    let summary: Vec<(&str, usize, usize)> = rows
        .iter()
        .map(|r| (r.path.as_str(), r.offset, r.size))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("len", 0, 1),
            ("body", 1, 0),
            ("inner", 1, 2),
            ("inner.a", 1, 2),
            ("crc", 3, 2),
            ("tag", 0, 2),
        ]
    );
    assert_eq!(rows[3].kind, "int");
    assert_eq!(rows[1].bytes.as_deref(), Some(""));
}

#[test]
fn test_describe_follows_extents() {
    let schema = parse_schema(FRAME).unwrap();
    let mut record = Record::from_slice(schema, &[3, 1, 2, 3, 0xAA, 0xBB, 0x12, 0x34]).unwrap();
    let extents: Vec<ExtentArg> = vec!["body=3".parse().unwrap()];
    apply_extents(&mut record, &extents).unwrap();

    let rows = layout::describe(record.view()).unwrap();
    let crc = rows.iter().find(|r| r.path == "crc").unwrap();
    assert_eq!(crc.offset, 6);
    assert_eq!(crc.bytes.as_deref(), Some("1234"));
    let inner = rows.iter().find(|r| r.path == "inner.a").unwrap();
    assert_eq!(inner.offset, 4);
    assert_eq!(inner.bytes.as_deref(), Some("aabb"));
}

#[test]
fn test_describe_marks_out_of_bounds() {
    let schema = parse_schema(FRAME).unwrap();
    let mut record = Record::from_slice(schema, &[0; 7]).unwrap();
    apply_extents(&mut record, &["body=10".parse().unwrap()]).unwrap();

    let rows = layout::describe(record.view()).unwrap();
    let body = rows.iter().find(|r| r.path == "body").unwrap();
    assert_eq!(body.bytes, None);
}

#[test]
fn test_execute_with_and_without_input() {
    let dir = tempdir().unwrap();
    let schema_path = dir.path().join("frame.json");
    let input_path = dir.path().join("frame.bin");
    fs::write(&schema_path, FRAME).unwrap();
    fs::write(&input_path, [1u8, 9, 0, 0, 0, 0, 0]).unwrap();

    let schema = schema_path.to_str().unwrap();
    assert!(layout::execute(schema, None, &[], false).is_ok());
    assert!(layout::execute(
        schema,
        Some(input_path.to_str().unwrap()),
        &["body=1".parse().unwrap()],
        true
    )
    .is_ok());
    assert!(layout::execute(schema, None, &["tag=3".parse().unwrap()], false).is_err());
}

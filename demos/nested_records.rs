//! Embedded records and arrays sharing one buffer

use bytefield_core::{Endianness, FieldKind, Record, Schema, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Bytefield Nested Records Example\n");

    let vertex = Schema::builder("Vertex")
        .field("x", FieldKind::float(Endianness::Little))
        .field("y", FieldKind::float(Endianness::Little))
        .build()?;
    let label = Schema::builder("Label")
        .field("lang", FieldKind::string(Some(2)))
        .field("text", FieldKind::string(None))
        .build()?;
    let shape = Schema::builder("Shape")
        .field("id", FieldKind::u32(Endianness::Little))
        .field("label", FieldKind::record(label.clone()))
        .field("vertices", FieldKind::dynamic_array(FieldKind::record(vertex)))
        .field("end", FieldKind::u8())
        .build()?;

    let mut record = Record::new(shape);
    record.set("id", 7u32)?;
    record.set("end", 0xEDu8)?;
    println!("Fresh record: {} bytes", record.size());

    // Assign a whole embedded record
    let english = Record::with(label, [("lang", "en"), ("text", "triangle")])?;
    record.set("label", english)?;
    println!(
        "After label: {} bytes, vertices at {}",
        record.size(),
        record.field_offset("vertices")?
    );

    // Grow the array, then write vertices through the proxy
    record.resize("vertices", vec![3usize])?;
    {
        let mut vertices = record.array_mut("vertices")?;
        let corners = [(0.0f32, 0.0f32), (1.0, 0.0), (0.5, 1.0)];
        for (i, (x, y)) in corners.into_iter().enumerate() {
            vertices.set_field(&[i], "x", x)?;
            vertices.set_field(&[i], "y", y)?;
        }
    }

    // Edit the embedded record through the parent; everything after it moves
    record.record_mut("label")?.set("text", "right triangle")?;

    let vertices = record.array("vertices")?;
    for i in 0..vertices.len() {
        let v = vertices.record(&[i])?;
        println!("  vertex {}: ({:?}, {:?})", i, v.get("x")?, v.get("y")?);
    }
    println!(
        "Label: {:?}, end marker still {:?}",
        record.record("label")?.get("text")?,
        record.get("end")?
    );
    assert_eq!(record.get("end")?, Value::UInt(0xED));
    println!("\n{}", record);

    Ok(())
}

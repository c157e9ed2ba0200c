//! Editing a length-prefixed packet in place

use bytefield_core::{Endianness, FieldKind, Record, ResizeMode, Schema, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Bytefield Packet Editing Example\n");

    let schema = Schema::builder("Packet")
        .field("magic", FieldKind::u32(Endianness::Big))
        .field("len", FieldKind::u16(Endianness::Big))
        .field("payload", FieldKind::bytes(None))
        .field("checksum", FieldKind::u16(Endianness::Big))
        .build()?;

    let mut packet = Record::new(schema.clone());
    packet.set("magic", 0x4259_5445u32)?;
    packet.set("checksum", 0xFFFFu16)?;
    println!("Empty packet ({} bytes): {}", packet.size(), packet);

    for payload in ["hello", "a longer payload", "bye"] {
        packet.set("payload", payload.as_bytes())?;
        packet.set("len", payload.len() as u16)?;
        println!(
            "payload {:>18?} -> {} bytes, checksum at {}: {}",
            payload,
            packet.size(),
            packet.field_offset("checksum")?,
            packet
        );
    }

    // Round-trip through a plain buffer: the length header tells us the
    // payload extent of the incoming bytes
    let wire = packet.into_bytes();
    let mut decoded = Record::from_slice(schema, &wire)?;
    let len = decoded
        .get("len")?
        .as_u64()
        .ok_or("length header is not an unsigned integer")? as usize;
    decoded.resize_with("payload", len, ResizeMode::Reinterpret)?;

    if let Value::Bytes(payload) = decoded.get("payload")? {
        println!("\nDecoded payload: {:?}", String::from_utf8_lossy(&payload));
    }
    println!("Decoded checksum: {:?}", decoded.get("checksum")?);

    Ok(())
}

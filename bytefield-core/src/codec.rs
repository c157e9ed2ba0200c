//! Stateless value <-> bytes conversion for scalars and text
//!
//! Every function here is a pure function of `(bytes, format)` and never
//! touches record layout. Callers hand in exactly the bytes of one value.

use crate::error::LayoutError;
use crate::types::{Endianness, TextEncoding};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

fn is_little(endian: Endianness) -> bool {
    match endian {
        Endianness::Little => true,
        Endianness::Big => false,
        Endianness::Native => cfg!(target_endian = "little"),
    }
}

/// Read an unsigned integer of `bytes.len()` (1..=8) bytes
pub fn read_uint(bytes: &[u8], endian: Endianness) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | *b as u64;
    if is_little(endian) {
        bytes.iter().rev().fold(0, fold)
    } else {
        bytes.iter().fold(0, fold)
    }
}

/// Read a two's complement signed integer of `bytes.len()` (1..=8) bytes
pub fn read_int(bytes: &[u8], endian: Endianness) -> i64 {
    let raw = read_uint(bytes, endian);
    let shift = 64 - 8 * bytes.len() as u32;
    ((raw << shift) as i64) >> shift
}

/// Write the low `out.len()` bytes of `raw`
pub fn write_uint(out: &mut [u8], raw: u64, endian: Endianness) {
    let width = out.len();
    for (i, byte) in out.iter_mut().enumerate() {
        let shift = if is_little(endian) { i } else { width - 1 - i };
        *byte = (raw >> (8 * shift)) as u8;
    }
}

/// Range-check `value` against an integer of `width` bytes and return its
/// two's complement bit pattern
pub fn int_bits(value: i128, width: u8, signed: bool) -> Option<u64> {
    let bits = 8 * width as u32;
    let (min, max) = if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    };
    (min..=max).contains(&value).then_some(value as u64)
}

/// Decode a single precision float
pub fn read_f32(bytes: &[u8], endian: Endianness) -> f32 {
    f32::from_bits(read_uint(bytes, endian) as u32)
}

/// Decode a double precision float
pub fn read_f64(bytes: &[u8], endian: Endianness) -> f64 {
    f64::from_bits(read_uint(bytes, endian))
}

/// Encode a single precision float into 4 bytes
pub fn write_f32(out: &mut [u8], value: f32, endian: Endianness) {
    write_uint(out, value.to_bits() as u64, endian);
}

/// Encode a double precision float into 8 bytes
pub fn write_f64(out: &mut [u8], value: f64, endian: Endianness) {
    write_uint(out, value.to_bits(), endian);
}

/// Decode text in the given encoding
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String, LayoutError> {
    match encoding {
        TextEncoding::Utf8 => core::str::from_utf8(bytes)
            .map(ToString::to_string)
            .map_err(|e| LayoutError::Encoding(e.to_string())),
        TextEncoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(pos) => Err(LayoutError::Encoding(format!(
                "byte 0x{:02x} at position {} is not ascii",
                bytes[pos], pos
            ))),
            None => Ok(bytes.iter().map(|&b| b as char).collect()),
        },
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
            if bytes.len() % 2 != 0 {
                return Err(LayoutError::Encoding(format!(
                    "utf-16 text has odd length {}",
                    bytes.len()
                )));
            }
            let endian = if encoding == TextEncoding::Utf16Le {
                Endianness::Little
            } else {
                Endianness::Big
            };
            let units = bytes.chunks_exact(2).map(|c| read_uint(c, endian) as u16);
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .map_err(|e| LayoutError::Encoding(e.to_string()))
        }
    }
}

/// Encode text in the given encoding
pub fn encode_text(text: &str, encoding: TextEncoding) -> Result<Vec<u8>, LayoutError> {
    match encoding {
        TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        TextEncoding::Ascii | TextEncoding::Latin1 => {
            let limit = if encoding == TextEncoding::Ascii { 0x80 } else { 0x100 };
            text.chars()
                .map(|c| {
                    if (c as u32) < limit {
                        Ok(c as u8)
                    } else {
                        Err(LayoutError::Encoding(format!(
                            "character {:?} cannot be encoded as {:?}",
                            c, encoding
                        )))
                    }
                })
                .collect()
        }
        TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
            let endian = if encoding == TextEncoding::Utf16Le {
                Endianness::Little
            } else {
                Endianness::Big
            };
            let mut out = Vec::with_capacity(text.len() * 2);
            for unit in text.encode_utf16() {
                let mut pair = [0u8; 2];
                write_uint(&mut pair, unit as u64, endian);
                out.extend_from_slice(&pair);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_byte_order() {
        let mut out = [0u8; 4];
        write_uint(&mut out, 0x0102_0304, Endianness::Big);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(read_uint(&out, Endianness::Big), 0x0102_0304);

        write_uint(&mut out, 0x0102_0304, Endianness::Little);
        assert_eq!(out, [4, 3, 2, 1]);
        assert_eq!(read_uint(&out, Endianness::Little), 0x0102_0304);

        write_uint(&mut out, 0x0102_0304, Endianness::Native);
        assert_eq!(out, 0x0102_0304u32.to_ne_bytes());
    }

    #[test]
    fn test_signed_sign_extension() {
        assert_eq!(read_int(&[0xff], Endianness::Little), -1);
        assert_eq!(read_int(&[0x80, 0x00], Endianness::Big), -32768);
        assert_eq!(read_int(&[0xfe, 0xff, 0xff, 0xff], Endianness::Little), -2);
        assert_eq!(read_int(&[0x7f], Endianness::Little), 127);
    }

    #[test]
    fn test_int_bits_range() {
        assert_eq!(int_bits(-1, 1, true), Some(u64::MAX));
        assert_eq!(int_bits(128, 1, true), None);
        assert_eq!(int_bits(255, 1, false), Some(255));
        assert_eq!(int_bits(-1, 2, false), None);
        assert_eq!(int_bits(u64::MAX as i128, 8, false), Some(u64::MAX));
        assert_eq!(int_bits(i64::MIN as i128, 8, true), Some(i64::MIN as u64));
    }

    #[test]
    fn test_float_round_trip() {
        let mut out = [0u8; 8];
        write_f64(&mut out, -2.5, Endianness::Big);
        assert_eq!(out, (-2.5f64).to_be_bytes());
        assert_eq!(read_f64(&out, Endianness::Big), -2.5);

        let mut out = [0u8; 4];
        write_f32(&mut out, 3.25, Endianness::Little);
        assert_eq!(read_f32(&out, Endianness::Little), 3.25);
    }

    #[test]
    fn test_text_encodings() {
        assert_eq!(encode_text("hé", TextEncoding::Utf8).unwrap(), "hé".as_bytes());
        assert_eq!(encode_text("hé", TextEncoding::Latin1).unwrap(), [b'h', 0xe9]);
        assert!(encode_text("hé", TextEncoding::Ascii).is_err());
        assert_eq!(encode_text("hi", TextEncoding::Utf16Be).unwrap(), [0, b'h', 0, b'i']);

        assert_eq!(decode_text(&[b'h', 0xe9], TextEncoding::Latin1).unwrap(), "hé");
        assert_eq!(decode_text(&[b'h', 0, b'i', 0], TextEncoding::Utf16Le).unwrap(), "hi");
        assert!(decode_text(&[0xff, 0xfe], TextEncoding::Utf8).is_err());
        assert!(decode_text(&[0x80], TextEncoding::Ascii).is_err());
        assert!(decode_text(&[0x00], TextEncoding::Utf16Le).is_err());
    }
}

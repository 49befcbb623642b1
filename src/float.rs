//! Float and double encoding algorithms (X.891 10.8, 10.9).
//!
//! IEEE 754 Bitmuster, big-endian, ueber die Integer-Codierung gleicher
//! Breite. Die Textform nutzt `INF`, `-INF` und `NaN` fuer Sonderwerte.

use std::fmt::Write as _;

use crate::Result;
use crate::integer::{join_values, units};

/// Encodes floats as their 4-byte IEEE 754 bit patterns.
pub fn encode_floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_bits().to_be_bytes()).collect()
}

/// Encodes doubles as their 8-byte IEEE 754 bit patterns.
pub fn encode_doubles(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_bits().to_be_bytes()).collect()
}

fn write_float(out: &mut String, value: f64) {
    if value.is_nan() {
        out.push_str("NaN");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "INF" } else { "-INF" });
    } else {
        let _ = write!(out, "{value}");
    }
}

/// Decodes 4-byte bit patterns to text.
pub fn decode_floats(data: &[u8]) -> Result<String> {
    let chunks = units(data, 4, "float")?;
    Ok(join_values(chunks, |out, c| {
        let v = f32::from_bits(u32::from_be_bytes([c[0], c[1], c[2], c[3]]));
        if v.is_finite() {
            // f32 direkt formatieren, sonst erscheinen Rundungsartefakte
            let _ = write!(out, "{v}");
        } else {
            write_float(out, f64::from(v));
        }
    }))
}

/// Decodes 8-byte bit patterns to text.
pub fn decode_doubles(data: &[u8]) -> Result<String> {
    let chunks = units(data, 8, "double")?;
    Ok(join_values(chunks, |out, c| {
        let mut be = [0u8; 8];
        be.copy_from_slice(c);
        write_float(out, f64::from_bits(u64::from_be_bytes(be)));
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn float_bit_pattern() {
        assert_eq!(encode_floats(&[1.0]), vec![0x3F, 0x80, 0x00, 0x00]);
        assert_eq!(decode_floats(&[0x3F, 0x80, 0x00, 0x00]).unwrap(), "1");
    }

    #[test]
    fn float_values_round_trip_as_text() {
        let bytes = encode_floats(&[1.5, -0.25, 1024.0, 0.1]);
        assert_eq!(decode_floats(&bytes).unwrap(), "1.5 -0.25 1024 0.1");
    }

    #[test]
    fn double_specials() {
        let bytes = encode_doubles(&[f64::INFINITY, f64::NEG_INFINITY, f64::NAN, -2.5]);
        assert_eq!(decode_doubles(&bytes).unwrap(), "INF -INF NaN -2.5");
    }

    #[test]
    fn float_specials() {
        let bytes = encode_floats(&[f32::INFINITY, f32::NAN]);
        assert_eq!(decode_floats(&bytes).unwrap(), "INF NaN");
    }

    #[test]
    fn wrong_length() {
        assert_eq!(
            decode_doubles(&[0; 4]),
            Err(Error::InvalidFixedWidthValue { kind: "double", length: 4 })
        );
        assert_eq!(
            decode_floats(&[0; 6]),
            Err(Error::InvalidFixedWidthValue { kind: "float", length: 6 })
        );
    }
}

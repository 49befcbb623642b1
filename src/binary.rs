//! Octet-based encoding algorithms: hexadecimal, base64, UUID and CDATA
//! (X.891 10.2, 10.3, 10.10, 10.11).
//!
//! Hex, Base64 und UUID speichern die Rohdaten unveraendert. Erst beim
//! Decodieren entsteht die Textform. CDATA ist UTF-8 Text.

use base64::Engine;

use crate::integer::{join_values, units};
use crate::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn push_hex(out: &mut String, bytes: &[u8]) {
    for &b in bytes {
        out.push(HEX_DIGITS[usize::from(b >> 4)] as char);
        out.push(HEX_DIGITS[usize::from(b & 0xF)] as char);
    }
}

/// Uppercase hexadecimal text of `data`.
pub fn decode_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    push_hex(&mut out, data);
    out
}

/// Parses hexadecimal text (either case) back to octets.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(Error::invalid_value(format!("odd number of hex digits in '{text}'")));
    }
    let nibble = |d: u8| -> Result<u8> {
        (d as char)
            .to_digit(16)
            .map(|v| v as u8)
            .ok_or_else(|| Error::invalid_value(format!("'{}' is not a hex digit", d as char)))
    };
    digits
        .chunks_exact(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

/// Standard base64 text of `data`.
pub fn decode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Parses standard base64 text back to octets.
pub fn parse_base64(text: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| Error::invalid_value(format!("base64: {e}")))
}

/// Checks that `data` holds whole 16-octet UUIDs.
pub fn encode_uuids(data: &[u8]) -> Result<Vec<u8>> {
    Ok(units(data, 16, "uuid")?.flatten().copied().collect())
}

/// Decodes 16-octet UUIDs to space separated hex strings.
pub fn decode_uuids(data: &[u8]) -> Result<String> {
    let chunks = units(data, 16, "uuid")?;
    Ok(join_values(chunks, push_hex))
}

/// CDATA text as UTF-8 octets.
pub fn encode_cdata(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// UTF-8 octets back to CDATA text.
pub fn decode_cdata(data: &[u8]) -> Result<String> {
    String::from_utf8(data.to_vec()).map_err(|_| Error::malformed("CDATA is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_uppercase() {
        assert_eq!(decode_hex(&[0x00, 0xAB, 0x7f]), "00AB7F");
        assert_eq!(parse_hex("00ab7F").unwrap(), vec![0x00, 0xAB, 0x7F]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn base64_text() {
        assert_eq!(decode_base64(b"hello"), "aGVsbG8=");
        assert_eq!(parse_base64("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn uuid_hex_per_sixteen_octets() {
        let mut data: Vec<u8> = (0u8..16).collect();
        data.extend(std::iter::repeat_n(0xFF, 16));
        let text = decode_uuids(&data).unwrap();
        assert_eq!(
            text,
            "000102030405060708090A0B0C0D0E0F FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF"
        );
    }

    #[test]
    fn uuid_wrong_length() {
        assert_eq!(
            decode_uuids(&[0; 15]),
            Err(Error::InvalidFixedWidthValue { kind: "uuid", length: 15 })
        );
        assert_eq!(
            encode_uuids(&[0; 17]),
            Err(Error::InvalidFixedWidthValue { kind: "uuid", length: 17 })
        );
        assert_eq!(encode_uuids(&[7; 32]).unwrap(), vec![7; 32]);
        assert_eq!(encode_uuids(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn cdata_utf8() {
        let bytes = encode_cdata("a<b>ü");
        assert_eq!(decode_cdata(&bytes).unwrap(), "a<b>ü");
        assert!(decode_cdata(&[0xFF]).is_err());
    }
}

//! Boolean encoding algorithm (X.891 10.7).
//!
//! Die ersten 4 Bits geben an, wie viele Bits am Ende des letzten Octets
//! unbenutzt sind. Danach folgt ein Bit pro Wert (1 = true). Ein einzelner
//! Wert ergibt damit `0x38` (true) oder `0x30` (false).

use crate::bitstream::BitWriter;
use crate::{Error, Result};

/// Encodes booleans, one bit each, behind the 4-bit unused-bit count.
pub fn encode(values: &[bool]) -> Vec<u8> {
    let total_bits = 4 + values.len();
    let unused = (8 - total_bits % 8) % 8;
    let mut writer = BitWriter::new();
    writer.write_bits(unused as u64, 4);
    for &v in values {
        writer.write_bit(v);
    }
    writer.into_vec()
}

/// Decodes to a space separated list of `true`/`false`.
///
/// The padding announced in the high nibble of the first octet is excluded
/// from the final octet.
pub fn decode(data: &[u8]) -> Result<String> {
    let Some(&first) = data.first() else {
        return Ok(String::new());
    };
    let unused = usize::from(first >> 4);
    let available = data.len() * 8 - 4;
    if unused > 7 || unused > available {
        return Err(Error::InvalidFixedWidthValue { kind: "boolean", length: data.len() });
    }
    let count = available - unused;
    let mut out = String::with_capacity(count * 6);
    for i in 0..count {
        let bit = i + 4;
        let set = (data[bit / 8] >> (7 - bit % 8)) & 1 == 1;
        if i > 0 {
            out.push(' ');
        }
        out.push_str(if set { "true" } else { "false" });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_values() {
        assert_eq!(encode(&[true]), vec![0x38]);
        assert_eq!(encode(&[false]), vec![0x30]);
        assert_eq!(decode(&[0x38]).unwrap(), "true");
        assert_eq!(decode(&[0x30]).unwrap(), "false");
    }

    /// Letztes Octet: die angekuendigten Fuellbits werden ignoriert.
    #[test]
    fn trailing_partial_octet() {
        let values = [true, false, true, true, false, true];
        let bytes = encode(&values);
        // 4 + 6 = 10 Bits -> 2 Octets, 6 Fuellbits
        assert_eq!(bytes.len(), 2);
        assert_eq!(bytes[0] >> 4, 6);
        assert_eq!(decode(&bytes).unwrap(), "true false true true false true");
    }

    #[test]
    fn exactly_filled_octets() {
        let values = [false, true, false, true];
        let bytes = encode(&values);
        assert_eq!(bytes, vec![0x05]);
        assert_eq!(decode(&bytes).unwrap(), "false true false true");
    }

    #[test]
    fn bad_padding_rejected() {
        // 0xF0: 15 Fuellbits sind unmoeglich
        assert!(matches!(
            decode(&[0xF0]),
            Err(Error::InvalidFixedWidthValue { kind: "boolean", .. })
        ));
        // 5 Fuellbits bei nur 4 verfuegbaren Bits
        assert!(decode(&[0x50]).is_err());
    }
}

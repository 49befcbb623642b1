//! Integer and length encodings of X.891 Annex C.
//!
//! Die Felder beginnen mitten in einem Octet ("on the n-th bit") und enden
//! immer auf einer Octet-Grenze. Jede Funktion schreibt bzw. liest genau
//! ein solches Feld; die Bits davor gehoeren dem Aufrufer.
//!
//! | Feld                          | Abschnitt | Start |
//! |-------------------------------|-----------|-------|
//! | sequence length               | C.21      | 1     |
//! | non-empty octet string        | C.22      | 2     |
//! | octet string length           | C.23      | 5     |
//! | octet string length           | C.24      | 7     |
//! | index                         | C.25      | 2     |
//! | index                         | C.27      | 3     |
//! | index                         | C.28      | 4     |

use std::io::Read;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// A qualified name field: either a table index or a following literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameRef {
    Index(usize),
    Literal,
}

fn length_u32(len: usize, base: usize) -> Result<u64> {
    u32::try_from(len - base)
        .map(u64::from)
        .map_err(|_| Error::invalid_value(format!("length {len} exceeds the format limit")))
}

/// C.21: length of a sequence in the initial vocabulary.
pub(crate) fn write_sequence_length(w: &mut BitWriter, len: usize) -> Result<()> {
    match len {
        1..=128 => {
            w.write_bit(false);
            w.write_bits((len - 1) as u64, 7);
        }
        129..=1_048_704 => {
            w.write_bits(0b1000, 4);
            w.write_bits((len - 129) as u64, 20);
        }
        _ => return Err(Error::invalid_value(format!("sequence length {len} out of range"))),
    }
    Ok(())
}

pub(crate) fn read_sequence_length<R: Read>(r: &mut BitReader<R>) -> Result<usize> {
    if !r.read_bit()? {
        return Ok(r.read_bits(7)? as usize + 1);
    }
    if r.read_bits(3)? != 0 {
        return Err(Error::malformed("sequence length padding"));
    }
    Ok(r.read_bits(20)? as usize + 129)
}

/// C.22: non-empty octet string starting on the second bit.
pub(crate) fn write_octets_bit2(w: &mut BitWriter, data: &[u8]) -> Result<()> {
    let len = data.len();
    match len {
        0 => return Err(Error::internal("empty octet string where a non-empty one is required")),
        1..=64 => {
            w.write_bit(false);
            w.write_bits((len - 1) as u64, 6);
        }
        65..=320 => {
            w.write_bits(0b10, 2);
            w.write_bits(0, 5);
            w.write_byte((len - 65) as u8);
        }
        _ => {
            w.write_bits(0b11, 2);
            w.write_bits(0, 5);
            w.write_bits(length_u32(len, 321)?, 32);
        }
    }
    w.write_bytes(data);
    Ok(())
}

pub(crate) fn read_octets_bit2<R: Read>(r: &mut BitReader<R>) -> Result<Vec<u8>> {
    let len = if !r.read_bit()? {
        r.read_bits(6)? as usize + 1
    } else if !r.read_bit()? {
        r.read_bits(5)?;
        usize::from(r.read_byte()?) + 65
    } else {
        r.read_bits(5)?;
        r.read_bits(32)? as usize + 321
    };
    r.read_bytes(len)
}

/// C.23: length of an encoded character string starting on the fifth bit.
pub(crate) fn write_length_bit5(w: &mut BitWriter, len: usize) -> Result<()> {
    match len {
        0 => return Err(Error::internal("zero length on the fifth bit")),
        1..=8 => {
            w.write_bit(false);
            w.write_bits((len - 1) as u64, 3);
        }
        9..=264 => {
            w.write_bits(0b1000, 4);
            w.write_byte((len - 9) as u8);
        }
        _ => {
            w.write_bits(0b1100, 4);
            w.write_bits(length_u32(len, 265)?, 32);
        }
    }
    Ok(())
}

pub(crate) fn read_length_bit5<R: Read>(r: &mut BitReader<R>) -> Result<usize> {
    if !r.read_bit()? {
        return Ok(r.read_bits(3)? as usize + 1);
    }
    let large = r.read_bit()?;
    r.read_bits(2)?;
    if large {
        Ok(r.read_bits(32)? as usize + 265)
    } else {
        Ok(usize::from(r.read_byte()?) + 9)
    }
}

/// C.24: length of an encoded character string starting on the seventh bit.
pub(crate) fn write_length_bit7(w: &mut BitWriter, len: usize) -> Result<()> {
    match len {
        0 => return Err(Error::internal("zero length on the seventh bit")),
        1..=2 => {
            w.write_bit(false);
            w.write_bit(len == 2);
        }
        3..=258 => {
            w.write_bits(0b10, 2);
            w.write_byte((len - 3) as u8);
        }
        _ => {
            w.write_bits(0b11, 2);
            w.write_bits(length_u32(len, 259)?, 32);
        }
    }
    Ok(())
}

pub(crate) fn read_length_bit7<R: Read>(r: &mut BitReader<R>) -> Result<usize> {
    if !r.read_bit()? {
        return Ok(usize::from(r.read_bit()?) + 1);
    }
    if r.read_bit()? {
        Ok(r.read_bits(32)? as usize + 259)
    } else {
        Ok(usize::from(r.read_byte()?) + 3)
    }
}

/// C.25: index in `[1, 2^20]` starting on the second bit.
pub(crate) fn write_index_bit2(w: &mut BitWriter, index: usize) {
    debug_assert!(index >= 1);
    match index {
        1..=64 => {
            w.write_bit(false);
            w.write_bits((index - 1) as u64, 6);
        }
        65..=8256 => {
            w.write_bits(0b10, 2);
            w.write_bits((index - 65) as u64, 13);
        }
        _ => {
            w.write_bits(0b110, 3);
            w.write_bits((index - 8257) as u64, 20);
        }
    }
}

/// C.25 and C.17: index, or `11110` announcing a literal qualified name.
pub(crate) fn read_index_bit2<R: Read>(r: &mut BitReader<R>) -> Result<NameRef> {
    if !r.read_bit()? {
        return Ok(NameRef::Index(r.read_bits(6)? as usize + 1));
    }
    if !r.read_bit()? {
        return Ok(NameRef::Index(r.read_bits(13)? as usize + 65));
    }
    if !r.read_bit()? {
        return Ok(NameRef::Index(r.read_bits(20)? as usize + 8257));
    }
    match r.read_bits(2)? {
        0b10 => Ok(NameRef::Literal),
        bits => Err(Error::malformed(format!("illegal index prefix 111{bits:02b} on second bit"))),
    }
}

/// C.27: index starting on the third bit.
pub(crate) fn write_index_bit3(w: &mut BitWriter, index: usize) {
    debug_assert!(index >= 1);
    match index {
        1..=32 => {
            w.write_bit(false);
            w.write_bits((index - 1) as u64, 5);
        }
        33..=2080 => {
            w.write_bits(0b100, 3);
            w.write_bits((index - 33) as u64, 11);
        }
        2081..=526_368 => {
            w.write_bits(0b101, 3);
            w.write_bits((index - 2081) as u64, 19);
        }
        _ => {
            w.write_bits(0b110, 3);
            w.write_bits(0, 7);
            w.write_bits((index - 526_369) as u64, 20);
        }
    }
}

/// C.27 and C.18: index, or `1111` announcing a literal qualified name.
pub(crate) fn read_index_bit3<R: Read>(r: &mut BitReader<R>) -> Result<NameRef> {
    if !r.read_bit()? {
        return Ok(NameRef::Index(r.read_bits(5)? as usize + 1));
    }
    match r.read_bits(2)? {
        0b00 => Ok(NameRef::Index(r.read_bits(11)? as usize + 33)),
        0b01 => Ok(NameRef::Index(r.read_bits(19)? as usize + 2081)),
        0b10 => {
            r.read_bits(7)?;
            Ok(NameRef::Index(r.read_bits(20)? as usize + 526_369))
        }
        _ => {
            if r.read_bit()? {
                Ok(NameRef::Literal)
            } else {
                Err(Error::malformed("illegal index prefix 1110 on third bit"))
            }
        }
    }
}

/// C.28: index starting on the fourth bit.
pub(crate) fn write_index_bit4(w: &mut BitWriter, index: usize) {
    debug_assert!(index >= 1);
    match index {
        1..=16 => {
            w.write_bit(false);
            w.write_bits((index - 1) as u64, 4);
        }
        17..=1040 => {
            w.write_bits(0b100, 3);
            w.write_bits((index - 17) as u64, 10);
        }
        1041..=263_184 => {
            w.write_bits(0b110, 3);
            w.write_bits((index - 1041) as u64, 18);
        }
        _ => {
            w.write_bits(0b111, 3);
            w.write_bits(0, 6);
            w.write_bits((index - 263_185) as u64, 20);
        }
    }
}

pub(crate) fn read_index_bit4<R: Read>(r: &mut BitReader<R>) -> Result<usize> {
    if !r.read_bit()? {
        return Ok(r.read_bits(4)? as usize + 1);
    }
    if !r.read_bit()? {
        r.read_bit()?;
        return Ok(r.read_bits(10)? as usize + 17);
    }
    if !r.read_bit()? {
        return Ok(r.read_bits(18)? as usize + 1041);
    }
    r.read_bits(6)?;
    Ok(r.read_bits(20)? as usize + 263_185)
}

/// UTF-16BE octets of `text`.
pub(crate) fn encode_utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

pub(crate) fn decode_utf16(data: &[u8]) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(Error::malformed("UTF-16 string with an odd number of octets"));
    }
    let units: Vec<u16> =
        data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|_| Error::malformed("invalid UTF-16 string"))
}

pub(crate) fn decode_utf8(data: Vec<u8>) -> Result<String> {
    String::from_utf8(data).map_err(|_| Error::malformed("invalid UTF-8 string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: Vec<u8>) -> BitReader<std::io::Cursor<Vec<u8>>> {
        BitReader::new(std::io::Cursor::new(bytes))
    }

    /// Schreibt `lead` Bits als Praefix, dann das Feld; prueft Laenge und Rueckweg.
    fn bit3(index: usize, octets: usize) {
        let mut w = BitWriter::new();
        w.write_bits(0, 2);
        write_index_bit3(&mut w, index);
        assert!(w.is_aligned(), "index {index}");
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), octets, "index {index}");
        let mut r = reader(bytes);
        r.read_bits(2).unwrap();
        assert_eq!(read_index_bit3(&mut r).unwrap(), NameRef::Index(index));
    }

    #[test]
    fn index_on_third_bit_boundaries() {
        for (i, n) in [(1, 1), (32, 1), (33, 2), (2080, 2), (2081, 3), (526_368, 3), (526_369, 4), (1 << 20, 4)] {
            bit3(i, n);
        }
    }

    #[test]
    fn index_on_second_bit_boundaries() {
        for (i, n) in [(1, 1), (64, 1), (65, 2), (8256, 2), (8257, 3), (1 << 20, 3)] {
            let mut w = BitWriter::new();
            w.write_bit(true);
            write_index_bit2(&mut w, i);
            assert!(w.is_aligned());
            let bytes = w.into_vec();
            assert_eq!(bytes.len(), n, "index {i}");
            let mut r = reader(bytes);
            r.read_bit().unwrap();
            assert_eq!(read_index_bit2(&mut r).unwrap(), NameRef::Index(i));
        }
    }

    #[test]
    fn index_on_fourth_bit_boundaries() {
        for (i, n) in [(1, 1), (16, 1), (17, 2), (1040, 2), (1041, 3), (263_184, 3), (263_185, 4), (1 << 20, 4)] {
            let mut w = BitWriter::new();
            w.write_bits(0b101, 3);
            write_index_bit4(&mut w, i);
            assert!(w.is_aligned());
            let bytes = w.into_vec();
            assert_eq!(bytes.len(), n, "index {i}");
            let mut r = reader(bytes);
            r.read_bits(3).unwrap();
            assert_eq!(read_index_bit4(&mut r).unwrap(), i);
        }
    }

    #[test]
    fn literal_markers() {
        // Attributname literal: 0 + 11110 + p + n
        let mut r = reader(vec![0b0111_1011]);
        r.read_bit().unwrap();
        assert_eq!(read_index_bit2(&mut r).unwrap(), NameRef::Literal);
        assert_eq!(r.read_bits(2).unwrap(), 0b11);
        // Elementname literal: 00 + 1111 + p + n
        let mut r = reader(vec![0b0011_1100]);
        r.read_bits(2).unwrap();
        assert_eq!(read_index_bit3(&mut r).unwrap(), NameRef::Literal);
    }

    #[test]
    fn octet_string_lengths() {
        for len in [1, 64, 65, 320, 321, 5000] {
            let data = vec![0xA5; len];
            let mut w = BitWriter::new();
            w.write_bit(false);
            write_octets_bit2(&mut w, &data).unwrap();
            let mut r = reader(w.into_vec());
            r.read_bit().unwrap();
            assert_eq!(read_octets_bit2(&mut r).unwrap(), data, "len {len}");
        }
    }

    #[test]
    fn small_octet_string_header() {
        let mut w = BitWriter::new();
        w.write_bit(false);
        write_octets_bit2(&mut w, b"ab").unwrap();
        assert_eq!(w.into_vec(), vec![0x01, b'a', b'b']);
    }

    #[test]
    fn lengths_on_fifth_and_seventh_bit() {
        for len in [1, 8, 9, 264, 265, 70_000] {
            let mut w = BitWriter::new();
            w.write_bits(0b0101, 4);
            write_length_bit5(&mut w, len).unwrap();
            assert!(w.is_aligned());
            let mut r = reader(w.into_vec());
            r.read_bits(4).unwrap();
            assert_eq!(read_length_bit5(&mut r).unwrap(), len);
        }
        for len in [1, 2, 3, 258, 259, 70_000] {
            let mut w = BitWriter::new();
            w.write_bits(0b100101, 6);
            write_length_bit7(&mut w, len).unwrap();
            assert!(w.is_aligned());
            let mut r = reader(w.into_vec());
            r.read_bits(6).unwrap();
            assert_eq!(read_length_bit7(&mut r).unwrap(), len);
        }
    }

    #[test]
    fn sequence_lengths() {
        for len in [1, 128, 129, 2000] {
            let mut w = BitWriter::new();
            write_sequence_length(&mut w, len).unwrap();
            let mut r = reader(w.into_vec());
            assert_eq!(read_sequence_length(&mut r).unwrap(), len);
        }
        assert!(write_sequence_length(&mut BitWriter::new(), 0).is_err());
    }

    #[test]
    fn utf16_big_endian() {
        assert_eq!(encode_utf16("a€"), vec![0x00, 0x61, 0x20, 0xAC]);
        assert_eq!(decode_utf16(&[0x00, 0x61, 0x20, 0xAC]).unwrap(), "a€");
        assert!(decode_utf16(&[0x00]).is_err());
        assert!(decode_utf8(vec![0xC3]).is_err());
    }
}

//! Short, int and long encoding algorithms (X.891 10.4, 10.5, 10.6).
//!
//! Jeder Wert wird als Zweierkomplement in 2, 4 oder 8 Octets big-endian
//! abgelegt. Mehrere Werte liegen direkt hintereinander; decodiert ergibt
//! das eine durch Leerzeichen getrennte Liste.

use std::fmt::Write as _;

use crate::{Error, Result};

/// Zerlegt `data` in Einheiten fester Breite.
///
/// Fails with [`Error::InvalidFixedWidthValue`] if the length is not a
/// multiple of `unit`.
pub(crate) fn units<'a>(
    data: &'a [u8],
    unit: usize,
    kind: &'static str,
) -> Result<std::slice::ChunksExact<'a, u8>> {
    if data.len() % unit != 0 {
        return Err(Error::InvalidFixedWidthValue { kind, length: data.len() });
    }
    Ok(data.chunks_exact(unit))
}

/// Haengt die Textform jedes Elements an, getrennt durch ein Leerzeichen.
pub(crate) fn join_values<T>(values: impl Iterator<Item = T>, mut fmt: impl FnMut(&mut String, T)) -> String {
    let mut out = String::new();
    for (i, value) in values.enumerate() {
        if i > 0 {
            out.push(' ');
        }
        fmt(&mut out, value);
    }
    out
}

/// Encodes shorts as 2-byte big-endian values.
pub fn encode_shorts(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Encodes ints as 4-byte big-endian values.
pub fn encode_ints(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Encodes longs as 8-byte big-endian values.
pub fn encode_longs(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Decodes 2-byte values to their decimal text form.
pub fn decode_shorts(data: &[u8]) -> Result<String> {
    let chunks = units(data, 2, "short")?;
    Ok(join_values(chunks, |out, c| {
        let _ = write!(out, "{}", i16::from_be_bytes([c[0], c[1]]));
    }))
}

/// Decodes 4-byte values to their decimal text form.
pub fn decode_ints(data: &[u8]) -> Result<String> {
    let chunks = units(data, 4, "int")?;
    Ok(join_values(chunks, |out, c| {
        let _ = write!(out, "{}", i32::from_be_bytes([c[0], c[1], c[2], c[3]]));
    }))
}

/// Decodes 8-byte values to their decimal text form.
pub fn decode_longs(data: &[u8]) -> Result<String> {
    let chunks = units(data, 8, "long")?;
    Ok(join_values(chunks, |out, c| {
        let mut be = [0u8; 8];
        be.copy_from_slice(c);
        let _ = write!(out, "{}", i64::from_be_bytes(be));
    }))
}

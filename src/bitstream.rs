//! Bit-level writer and reader for Fast Infoset items.
//!
//! Fast Infoset packs item headers MSB-first into octets (X.891 7.2): a field
//! may start "on the third bit" of an octet, after two identification bits.
//! Bits within each byte are numbered 1 (most significant, written first)
//! to 8.

use std::io::{Read, Write};

use crate::stream_buffer::StreamBuffer;
use crate::{Error, Result};

/// Writes individual bits into a growable byte buffer, MSB first.
///
/// Nur das angebrochene Octet liegt ausserhalb von `out`; `used` zaehlt seine
/// belegten Bits von links.
#[derive(Debug, Default)]
pub struct BitWriter {
    out: Vec<u8>,
    partial: u8,
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a single bit. `true` = 1, `false` = 0.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.partial |= u8::from(bit) << (7 - self.used);
        self.used += 1;
        if self.used == 8 {
            self.out.push(self.partial);
            self.partial = 0;
            self.used = 0;
        }
    }

    /// Writes the lower `n` bits of `value`, MSB first. `n` is at most 32.
    pub fn write_bits(&mut self, value: u64, n: u8) {
        debug_assert!(n <= 32, "bit count must be 0..=32, got {n}");
        let mut remaining = n;
        while remaining > 0 {
            let free = 8 - self.used;
            let take = free.min(remaining);
            remaining -= take;
            // die naechsten `take` Bits des Feldes, rechtsbuendig
            let chunk = ((value >> remaining) & ((1u64 << take) - 1)) as u8;
            self.partial |= chunk << (free - take);
            self.used += take;
            if self.used == 8 {
                self.out.push(self.partial);
                self.partial = 0;
                self.used = 0;
            }
        }
    }

    /// Fills the current octet with zero bits. No-op when aligned.
    pub fn align_to_byte(&mut self) {
        if self.used > 0 {
            self.out.push(self.partial);
            self.partial = 0;
            self.used = 0;
        }
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        if self.used == 0 {
            self.out.push(byte);
        } else {
            self.write_bits(u64::from(byte), 8);
        }
    }

    /// Octets; ohne angebrochenes Octet direkt per `extend_from_slice`.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.used == 0 {
            self.out.extend_from_slice(bytes);
        } else {
            bytes.iter().for_each(|&b| self.write_bits(u64::from(b), 8));
        }
    }

    /// `true` when the next bit starts a new octet.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.used == 0
    }

    /// Moves every complete octet into `sink`; a partial octet stays.
    pub fn drain_to(&mut self, sink: &mut impl Write) -> std::io::Result<()> {
        if !self.out.is_empty() {
            sink.write_all(&self.out)?;
            self.out.clear();
        }
        Ok(())
    }

    /// Pads the last octet and returns all bytes.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.out
    }
}

/// Reads bits MSB first from a [`StreamBuffer`].
///
/// Haelt hoechstens ein angebrochenes Octet; alle ausgerichteten Zugriffe
/// gehen direkt an den Puffer.
pub struct BitReader<R> {
    buffer: StreamBuffer<R>,
    /// Angebrochenes Octet, linksbuendig.
    current: u8,
    /// Anzahl ungelesener Bits in `current` (0..=7).
    bits_left: u8,
}

impl<R: Read> BitReader<R> {
    /// Creates a reader over `source`.
    pub fn new(source: R) -> Self {
        Self::from_buffer(StreamBuffer::new(source))
    }

    /// Creates a reader over an existing stream buffer.
    pub fn from_buffer(buffer: StreamBuffer<R>) -> Self {
        Self { buffer, current: 0, bits_left: 0 }
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads `n` bits (at most 32) and returns them MSB first.
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        debug_assert!(n <= 32, "bit count must be 0..=32, got {n}");
        let mut val: u64 = 0;
        let mut remaining = n;
        while remaining > 0 {
            if self.bits_left == 0 {
                self.current = self.buffer.read_byte()?;
                self.bits_left = 8;
            }
            let take = remaining.min(self.bits_left);
            let shifted = u64::from(self.current) >> (8 - take);
            val = (val << take) | shifted;
            // u8-Shift um 8 ist nicht erlaubt
            self.current = if take == 8 { 0 } else { self.current << take };
            self.bits_left -= take;
            remaining -= take;
        }
        Ok(val as u32)
    }

    /// Returns `true` when the next bit starts a new octet.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.bits_left == 0
    }

    /// Discards unread padding bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        self.bits_left = 0;
        self.current = 0;
    }

    /// Reads one whole octet.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.bits_left == 0 {
            self.buffer.read_byte()
        } else {
            Ok(self.read_bits(8)? as u8)
        }
    }

    /// Reads `len` octets. `len == 0` yields an empty vector.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if self.bits_left == 0 {
            self.buffer.read_bytes(len)
        } else {
            (0..len).map(|_| self.read_byte()).collect()
        }
    }

    /// Peeks at the next octet. Only valid on an octet boundary.
    pub fn peek_byte(&mut self) -> Result<u8> {
        if self.bits_left != 0 {
            return Err(Error::internal("peek inside a partially read octet"));
        }
        self.buffer.peek_byte()
    }

    /// Gibt `true` zurueck, wenn keine weiteren Bytes folgen.
    pub fn is_exhausted(&mut self) -> Result<bool> {
        if self.bits_left != 0 {
            return Ok(false);
        }
        self.buffer.is_exhausted()
    }

    /// Consumes the reader and returns the byte source.
    pub fn into_inner(self) -> R {
        self.buffer.into_inner()
    }
}

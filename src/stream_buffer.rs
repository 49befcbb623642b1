//! Block-gepufferter Byte-Leser fuer den Decoder.
//!
//! Haelt genau einen Block von [`BLOCK_SIZE`] Bytes im Speicher und fuellt ihn
//! bei Bedarf aus der Quelle nach. `move_back` spult nur den Cursor im Block
//! zurueck, nie die Quelle selbst.

use std::io::Read;

use crate::{Error, Result};

/// Groesse eines Puffer-Blocks in Bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Reads bytes from `R` one block at a time.
pub struct StreamBuffer<R> {
    source: R,
    block: Box<[u8]>,
    /// Anzahl gueltiger Bytes in `block`.
    len: usize,
    /// Naechstes ungelesenes Byte in `block`.
    offset: usize,
}

impl<R: Read> StreamBuffer<R> {
    /// Creates a buffer over `source`. Nothing is read until the first request.
    pub fn new(source: R) -> Self {
        Self {
            source,
            block: vec![0u8; BLOCK_SIZE].into_boxed_slice(),
            len: 0,
            offset: 0,
        }
    }

    /// Liest den naechsten Block. Kurze Reads werden wiederholt, bis der Block
    /// voll ist oder die Quelle erschoepft ist.
    fn refill(&mut self) -> Result<()> {
        let mut filled = 0;
        while filled < self.block.len() {
            match self.source.read(&mut self.block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Err(Error::UnexpectedEndOfInput);
        }
        log::trace!("stream buffer refilled with {filled} bytes");
        self.len = filled;
        self.offset = 0;
        Ok(())
    }

    /// Reads one byte, refilling the block when it is exhausted.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.offset == self.len {
            self.refill()?;
        }
        let byte = self.block[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    /// Reads exactly `len` bytes, spanning as many refills as needed.
    ///
    /// A `len` of zero is a caller bug and reported as [`Error::Internal`].
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Err(Error::internal("stream buffer read of zero bytes"));
        }
        // Laenge kommt aus dem Stream; nicht blind vorallozieren
        let mut out = Vec::with_capacity(len.min(BLOCK_SIZE));
        if self.offset == self.len {
            self.refill()?;
        }
        loop {
            let wanted = len - out.len();
            let available = self.len - self.offset;
            if available >= wanted {
                out.extend_from_slice(&self.block[self.offset..self.offset + wanted]);
                self.offset += wanted;
                return Ok(out);
            }
            out.extend_from_slice(&self.block[self.offset..self.len]);
            self.offset = self.len;
            self.refill()?;
        }
    }

    /// Reads the next byte without consuming it.
    pub fn peek_byte(&mut self) -> Result<u8> {
        let byte = self.read_byte()?;
        self.move_back(1)?;
        Ok(byte)
    }

    /// Rewinds the cursor by `len` bytes inside the current block.
    ///
    /// Fails with [`Error::Internal`] if that would move before the start of
    /// the block; bytes of earlier blocks are gone.
    pub fn move_back(&mut self, len: usize) -> Result<()> {
        if len > self.offset {
            return Err(Error::internal(format!(
                "stream buffer move back of {len} bytes at offset {}",
                self.offset
            )));
        }
        self.offset -= len;
        Ok(())
    }

    /// Gibt `true` zurueck, wenn weder Block noch Quelle weitere Bytes liefern.
    pub fn is_exhausted(&mut self) -> Result<bool> {
        if self.offset < self.len {
            return Ok(false);
        }
        match self.refill() {
            Ok(()) => Ok(false),
            Err(Error::UnexpectedEndOfInput) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Consumes the buffer and returns the source. Buffered bytes are dropped.
    pub fn into_inner(self) -> R {
        self.source
    }
}

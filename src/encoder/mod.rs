//! Fast Infoset encoder (X.891 7, Annex C).
//!
//! Schreibt fertig aufgeloeste Items: Elemente mit allen Attributen,
//! Character Chunks, Kommentare, PIs und die Dokumenttyp-Deklaration.
//! Namespace-Aufloesung und das Puffern offener Start-Tags uebernimmt
//! [`crate::writer::Writer`]; dieser Encoder entscheidet nur zwischen
//! Tabellenindex und Literal und haelt das Vokabular synchron.
//!
//! # Beispiel
//!
//! ```
//! use erfi::encoder::{Encoder, EncoderConfig, PendingElement};
//! use erfi::QName;
//!
//! let mut enc = Encoder::new(Vec::new(), EncoderConfig::default()).unwrap();
//! enc.start_document().unwrap();
//! enc.write_element(&PendingElement::new(QName::local("root"))).unwrap();
//! enc.write_characters("hi").unwrap();
//! enc.write_end_element().unwrap();
//! enc.end_document().unwrap();
//! let bytes = enc.finish().unwrap().unwrap();
//! assert_eq!(&bytes[..4], &[0xE0, 0x00, 0x00, 0x01]);
//! ```

mod config;
mod pending;

use std::io::Write;

pub use config::{CharacterEncoding, DEFAULT_VALUE_LENGTH_LIMIT, EncoderConfig};
pub use pending::{AttributeValue, NamespaceAttribute, PendingAttribute, PendingElement};

use crate::algorithm::{EncodedValue, Encoding};
use crate::bitstream::BitWriter;
use crate::header::{self, InitialVocabulary, Prolog};
use crate::packed;
use crate::qname::QName;
use crate::string_table::Table;
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};

/// `1111` + 4 Fuellbits: Ende einer Liste.
pub(crate) const TERMINATOR: u8 = 0xF0;
/// Zwei Terminatoren in einem Octet.
pub(crate) const DOUBLE_TERMINATOR: u8 = 0xFF;
/// Leerer nicht-identifizierender String.
pub(crate) const EMPTY_STRING: u8 = 0xFF;
pub(crate) const PROCESSING_INSTRUCTION: u8 = 0xE1;
pub(crate) const COMMENT: u8 = 0xE2;
/// `110001` + System- und Public-Bit.
pub(crate) const DOCUMENT_TYPE: u8 = 0xC4;
pub(crate) const DOCUMENT_TYPE_SYSTEM: u8 = 0x02;
pub(crate) const DOCUMENT_TYPE_PUBLIC: u8 = 0x01;
/// Element mit Namespace-Attributen: `0` + Attribut-Bit + `111000`.
pub(crate) const ELEMENT_NAMESPACES: u8 = 0x38;
pub(crate) const ELEMENT_ATTRIBUTES: u8 = 0x40;
/// `110011` vor Prefix- und Namespace-Bit eines Namespace-Attributs.
pub(crate) const NAMESPACE_ATTRIBUTE: u64 = 0b11_0011;

// Diskriminanten der codierten Zeichenketten (C.19, C.20)
const DISCRIMINANT_ALPHABET: u64 = 0b10;
const DISCRIMINANT_ALGORITHM: u64 = 0b11;

/// Splits an [`Encoding`] into discriminant and 8-bit table slot.
fn encoding_slot(encoding: Encoding) -> Result<(u64, u64)> {
    let (discriminant, index) = match encoding {
        Encoding::Algorithm(i) => (DISCRIMINANT_ALGORITHM, i),
        Encoding::Alphabet(i) => (DISCRIMINANT_ALPHABET, i),
    };
    match index {
        1..=256 => Ok((discriminant, (index - 1) as u64)),
        _ => Err(Error::internal(format!("encoding table index {index} out of range"))),
    }
}

/// Fast Infoset stream encoder over a byte sink.
pub struct Encoder<W: Write> {
    bits: BitWriter,
    sink: Option<W>,
    vocabulary: Vocabulary,
    config: EncoderConfig,
    /// Ein Terminator wartet darauf, mit dem naechsten zu `0xFF` zu verschmelzen.
    terminator_pending: bool,
    started: bool,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder. Nothing is written before [`Encoder::start_document`].
    ///
    /// A base vocabulary from the config is copied; a prefilled base must be
    /// shared under a URI so a decoder can find it.
    pub fn new(sink: W, config: EncoderConfig) -> Result<Self> {
        let vocabulary = match &config.vocabulary {
            Some(base) => {
                if base.external_uri().is_none() && base.has_table_entries() {
                    return Err(Error::invalid_value(
                        "a prefilled vocabulary must be shared under a URI",
                    ));
                }
                base.working_copy()
            }
            None => Vocabulary::new(),
        };
        Ok(Self {
            bits: BitWriter::new(),
            sink: Some(sink),
            vocabulary,
            config,
            terminator_pending: false,
            started: false,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.sink.is_none() {
            return Err(Error::invalid_state("encoder is closed"));
        }
        if !self.started {
            return Err(Error::invalid_state("document not started"));
        }
        Ok(())
    }

    /// Writes the header and the initial vocabulary.
    pub fn start_document(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::invalid_state("document already started"));
        }
        if self.sink.is_none() {
            return Err(Error::invalid_state("encoder is closed"));
        }
        let initial = InitialVocabulary {
            external_vocabulary: self.vocabulary.external_uri().map(str::to_string),
            alphabets: self.vocabulary.alphabets().user_alphabets().map(str::to_string).collect(),
            algorithms: self.vocabulary.algorithms().user_uris().map(str::to_string).collect(),
        };
        log::debug!(
            "start document: external vocabulary {:?}, {} alphabets, {} algorithms",
            initial.external_vocabulary,
            initial.alphabets.len(),
            initial.algorithms.len()
        );
        let prolog = Prolog::new(self.config.declaration, initial);
        header::write_prolog(&mut self.bits, &prolog)?;
        if let Some(version) = self.config.declaration.and_then(|d| d.version()) {
            self.write_non_identifying(Table::OtherStrings, version)?;
        }
        self.started = true;
        Ok(())
    }

    /// Ends the document; terminates the child list.
    pub fn end_document(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.terminate();
        self.flush_terminator();
        Ok(())
    }

    fn flush_terminator(&mut self) {
        if self.terminator_pending {
            self.bits.write_byte(TERMINATOR);
            self.terminator_pending = false;
        }
    }

    fn terminate(&mut self) {
        if self.terminator_pending {
            self.bits.write_byte(DOUBLE_TERMINATOR);
            self.terminator_pending = false;
        } else {
            self.terminator_pending = true;
        }
    }

    /// Writes an element start with all of its attributes.
    pub fn write_element(&mut self, element: &PendingElement) -> Result<()> {
        self.ensure_open()?;
        self.flush_terminator();
        let has_attributes = !element.attributes.is_empty();
        if element.namespace_attributes.is_empty() {
            self.bits.write_bit(false);
            self.bits.write_bit(has_attributes);
        } else {
            let mut first = ELEMENT_NAMESPACES;
            if has_attributes {
                first |= ELEMENT_ATTRIBUTES;
            }
            self.bits.write_byte(first);
            for ns in &element.namespace_attributes {
                self.bits.write_bits(NAMESPACE_ATTRIBUTE, 6);
                self.bits.write_bit(ns.prefix.is_some());
                self.bits.write_bit(ns.namespace.is_some());
                if let Some(prefix) = &ns.prefix {
                    self.write_identifying(Table::Prefixes, prefix)?;
                }
                if let Some(namespace) = &ns.namespace {
                    self.write_identifying(Table::NamespaceNames, namespace)?;
                }
            }
            self.bits.write_byte(TERMINATOR);
            self.bits.write_bits(0, 2);
        }
        self.write_element_name(&element.qname)?;
        for attr in &element.attributes {
            self.bits.write_bit(false);
            self.write_attribute_name(&attr.qname)?;
            match &attr.value {
                AttributeValue::Text(text) => {
                    self.write_non_identifying(Table::AttributeValues, text)?
                }
                AttributeValue::Encoded { encoding, data } => {
                    self.write_encoded_non_identifying(*encoding, data)?
                }
            }
        }
        if has_attributes {
            self.terminate();
        }
        Ok(())
    }

    pub fn write_end_element(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.terminate();
        Ok(())
    }

    /// Writes a character chunk; empty text writes nothing.
    pub fn write_characters(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        if text.is_empty() {
            return Ok(());
        }
        self.flush_terminator();
        self.bits.write_bits(0b10, 2);
        if let Some(index) = self.vocabulary.strings(Table::ContentChunks).index_of(text) {
            self.bits.write_bit(true);
            packed::write_index_bit4(&mut self.bits, index);
            return Ok(());
        }
        let add = text.chars().count() <= self.config.value_length_limit;
        self.bits.write_bit(false);
        self.bits.write_bit(add);
        let encoding = self.config.character_encoding;
        let octets = self.encode_text(text);
        self.bits.write_bits(encoding.discriminant(), 2);
        packed::write_length_bit7(&mut self.bits, octets.len())?;
        self.bits.write_bytes(&octets);
        if add {
            self.vocabulary.strings_mut(Table::ContentChunks).add(text);
        }
        Ok(())
    }

    /// Writes a chunk produced by an encoding algorithm or restricted alphabet.
    ///
    /// Encoded chunks never enter the vocabulary. An empty payload writes nothing.
    pub fn write_encoded_characters(&mut self, encoding: Encoding, value: &EncodedValue) -> Result<()> {
        self.ensure_open()?;
        let data = self.vocabulary.encode_value(encoding, value)?;
        if data.is_empty() {
            return Ok(());
        }
        let (discriminant, slot) = encoding_slot(encoding)?;
        self.flush_terminator();
        self.bits.write_bits(0b1000, 4);
        self.bits.write_bits(discriminant, 2);
        self.bits.write_bits(slot, 8);
        packed::write_length_bit7(&mut self.bits, data.len())?;
        self.bits.write_bytes(&data);
        Ok(())
    }

    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        self.flush_terminator();
        self.bits.write_byte(COMMENT);
        self.write_non_identifying(Table::OtherStrings, text)
    }

    pub fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        self.ensure_open()?;
        if target.is_empty() {
            return Err(Error::invalid_value("processing instruction without target"));
        }
        self.flush_terminator();
        self.bits.write_byte(PROCESSING_INSTRUCTION);
        self.write_identifying(Table::OtherNcNames, target)?;
        self.write_non_identifying(Table::OtherStrings, data)
    }

    /// Writes a document type declaration with its identifiers.
    pub fn write_document_type(&mut self, public_id: Option<&str>, system_id: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let system_id = system_id.filter(|s| !s.is_empty());
        let public_id = public_id.filter(|s| !s.is_empty());
        self.flush_terminator();
        let mut first = DOCUMENT_TYPE;
        if system_id.is_some() {
            first |= DOCUMENT_TYPE_SYSTEM;
        }
        if public_id.is_some() {
            first |= DOCUMENT_TYPE_PUBLIC;
        }
        self.bits.write_byte(first);
        if let Some(id) = system_id {
            self.write_identifying(Table::OtherUris, id)?;
        }
        if let Some(id) = public_id {
            self.write_identifying(Table::OtherUris, id)?;
        }
        // keine eingebetteten PIs: Liste sofort beenden
        self.terminate();
        Ok(())
    }

    /// Passes all complete octets to the sink and flushes it.
    pub fn flush(&mut self) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::invalid_state("encoder is closed"));
        };
        self.bits.drain_to(sink)?;
        sink.flush()?;
        Ok(())
    }

    /// Pads the last octet, writes everything and releases the sink.
    ///
    /// Returns `None` when the sink was already released.
    pub fn finish(&mut self) -> Result<Option<W>> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(None);
        };
        self.bits.align_to_byte();
        self.bits.drain_to(&mut sink)?;
        sink.flush()?;
        Ok(Some(sink))
    }

    fn encode_text(&self, text: &str) -> Vec<u8> {
        match self.config.character_encoding {
            CharacterEncoding::Utf8 => text.as_bytes().to_vec(),
            CharacterEncoding::Utf16 => packed::encode_utf16(text),
        }
    }

    /// C.13: identifying string on the first bit; literals always enter `table`.
    fn write_identifying(&mut self, table: Table, value: &str) -> Result<()> {
        if let Some(index) = self.vocabulary.strings(table).index_of(value) {
            self.bits.write_bit(true);
            packed::write_index_bit2(&mut self.bits, index);
            return Ok(());
        }
        if value.is_empty() {
            return Err(Error::invalid_value(format!("empty string in the {} table", table.name())));
        }
        self.bits.write_bit(false);
        packed::write_octets_bit2(&mut self.bits, value.as_bytes())?;
        self.vocabulary.strings_mut(table).add(value);
        Ok(())
    }

    /// C.14: non-identifying string on the first bit.
    fn write_non_identifying(&mut self, table: Table, value: &str) -> Result<()> {
        if value.is_empty() {
            self.bits.write_byte(EMPTY_STRING);
            return Ok(());
        }
        if let Some(index) = self.vocabulary.strings(table).index_of(value) {
            self.bits.write_bit(true);
            packed::write_index_bit2(&mut self.bits, index);
            return Ok(());
        }
        let add = value.chars().count() <= self.config.value_length_limit;
        let octets = self.encode_text(value);
        self.bits.write_bit(false);
        self.bits.write_bit(add);
        self.bits.write_bits(self.config.character_encoding.discriminant(), 2);
        packed::write_length_bit5(&mut self.bits, octets.len())?;
        self.bits.write_bytes(&octets);
        if add {
            self.vocabulary.strings_mut(table).add(value);
        }
        Ok(())
    }

    /// C.14 with an encoded value; never added to a table.
    fn write_encoded_non_identifying(&mut self, encoding: Encoding, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            self.bits.write_byte(EMPTY_STRING);
            return Ok(());
        }
        let (discriminant, slot) = encoding_slot(encoding)?;
        self.bits.write_bits(0b00, 2);
        self.bits.write_bits(discriminant, 2);
        self.bits.write_bits(slot, 8);
        packed::write_length_bit5(&mut self.bits, data.len())?;
        self.bits.write_bytes(data);
        Ok(())
    }

    /// C.18: element name on the third bit.
    fn write_element_name(&mut self, qname: &QName) -> Result<()> {
        if let Some(index) = self.vocabulary.element_names().index_of(qname) {
            packed::write_index_bit3(&mut self.bits, index);
            return Ok(());
        }
        self.bits.write_bits(0b1111, 4);
        self.write_literal_name(qname)?;
        self.vocabulary.add_element_name(qname);
        Ok(())
    }

    /// C.17: attribute name on the second bit.
    fn write_attribute_name(&mut self, qname: &QName) -> Result<()> {
        if let Some(index) = self.vocabulary.attribute_names().index_of(qname) {
            packed::write_index_bit2(&mut self.bits, index);
            return Ok(());
        }
        self.bits.write_bits(0b11110, 5);
        self.write_literal_name(qname)?;
        self.vocabulary.add_attribute_name(qname);
        Ok(())
    }

    /// Presence bits and the three parts of a literal qualified name.
    fn write_literal_name(&mut self, qname: &QName) -> Result<()> {
        if qname.prefix.is_some() && qname.namespace.is_none() {
            return Err(Error::invalid_namespace(format!("prefixed name {qname} without namespace")));
        }
        self.bits.write_bit(qname.prefix.is_some());
        self.bits.write_bit(qname.namespace.is_some());
        if let Some(prefix) = &qname.prefix {
            self.write_identifying(Table::Prefixes, prefix)?;
        }
        if let Some(namespace) = &qname.namespace {
            self.write_identifying(Table::NamespaceNames, namespace)?;
        }
        self.write_identifying(Table::LocalNames, &qname.local_name)
    }
}

//! Fast Infoset decoder (X.891 7, Annex C).
//!
//! Liest einen Stream Knoten fuer Knoten. Das Vokabular waechst dabei in
//! derselben Reihenfolge wie beim Encoder, sodass jeder Index auf denselben
//! Eintrag zeigt. Der Decoder haelt genau einen [`DecodedNode`], der bei
//! jedem Aufruf von [`Decoder::read_node`] neu befuellt wird.
//!
//! # Beispiel
//!
//! ```
//! use erfi::decoder::{Decoder, DecoderConfig, NodeKind};
//! use erfi::writer::Writer;
//! use erfi::EncoderConfig;
//!
//! let mut w = Writer::new(Vec::new(), EncoderConfig::default()).unwrap();
//! w.start_element(None, None, "greeting").unwrap();
//! w.write_content("Hello").unwrap();
//! let bytes = w.into_inner().unwrap();
//!
//! let mut dec = Decoder::new(bytes.as_slice(), DecoderConfig::default());
//! let mut kinds = Vec::new();
//! while let Some(node) = dec.read_node().unwrap() {
//!     kinds.push(node.kind);
//! }
//! assert_eq!(kinds, [
//!     NodeKind::DocumentStart,
//!     NodeKind::ElementStart,
//!     NodeKind::Text,
//!     NodeKind::ElementEnd,
//!     NodeKind::DocumentEnd,
//! ]);
//! ```

mod config;
mod node;

use std::io::Read;
use std::rc::Rc;

pub use config::DecoderConfig;
pub use node::{Attribute, DecodedNode, NodeKind};

use crate::algorithm::{AlgorithmRegistry, Encoding};
use crate::alphabet::AlphabetRegistry;
use crate::bitstream::BitReader;
use crate::encoder::{
    COMMENT, DOCUMENT_TYPE, DOCUMENT_TYPE_PUBLIC, DOCUMENT_TYPE_SYSTEM, DOUBLE_TERMINATOR,
    ELEMENT_ATTRIBUTES, ELEMENT_NAMESPACES, EMPTY_STRING, NAMESPACE_ATTRIBUTE,
    PROCESSING_INSTRUCTION, TERMINATOR,
};
use crate::header::{self, Declaration, InitialVocabulary};
use crate::packed::{self, NameRef};
use crate::qname::{QName, XMLNS, XMLNS_NAMESPACE};
use crate::string_table::Table;
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Prolog,
    Children,
    Done,
}

/// Pull decoder over a byte source.
pub struct Decoder<R: Read> {
    bits: BitReader<R>,
    config: DecoderConfig,
    vocabulary: Vocabulary,
    stage: Stage,
    declaration: Option<Declaration>,
    standalone: Option<bool>,
    version: Option<String>,
    /// Offene Elemente, fuer Namen und Tiefe der Ende-Knoten.
    elements: Vec<QName>,
    /// Die zweite Haelfte eines `0xFF` wurde schon gelesen.
    terminator_pending: bool,
    node: DecodedNode,
}

fn malformed_index(what: &str, index: usize) -> Error {
    Error::malformed(format!("{what} index {index} is not in the vocabulary"))
}

impl<R: Read> Decoder<R> {
    pub fn new(source: R, config: DecoderConfig) -> Self {
        Self {
            bits: BitReader::new(source),
            config,
            vocabulary: Vocabulary::new(),
            stage: Stage::Prolog,
            declaration: None,
            standalone: None,
            version: None,
            elements: Vec::new(),
            terminator_pending: false,
            node: DecodedNode::default(),
        }
    }

    /// Vocabulary as grown by the nodes read so far.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn declaration(&self) -> Option<Declaration> {
        self.declaration
    }

    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    /// Version string from the header, if the document carries one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Releases the byte source.
    pub fn into_inner(self) -> R {
        self.bits.into_inner()
    }

    /// Reads the next node; `None` once the document has ended.
    pub fn read_node(&mut self) -> Result<Option<&DecodedNode>> {
        match self.stage {
            Stage::Prolog => self.read_document_start()?,
            Stage::Children => self.read_child()?,
            Stage::Done => return Ok(None),
        }
        Ok(Some(&self.node))
    }

    fn read_document_start(&mut self) -> Result<()> {
        let prolog = header::read_prolog(&mut self.bits)?;
        self.vocabulary = self.initial_vocabulary(&prolog.initial_vocabulary)?;
        if prolog.has_version {
            let (version, _) = self.read_non_identifying(Table::OtherStrings)?;
            self.version = Some(version);
        }
        self.declaration = prolog.declaration;
        self.standalone = prolog.standalone;
        self.node.reset(NodeKind::DocumentStart, 0);
        self.stage = Stage::Children;
        Ok(())
    }

    /// Arbeitsvokabular fuer dieses Dokument aus den angekuendigten URIs.
    fn initial_vocabulary(&self, initial: &InitialVocabulary) -> Result<Vocabulary> {
        let mut vocabulary = match &initial.external_vocabulary {
            Some(uri) => self
                .config
                .vocabulary(uri)
                .ok_or_else(|| Error::malformed(format!("unknown external vocabulary {uri}")))?
                .working_copy(),
            None => Vocabulary::new(),
        };
        if initial.alphabets.is_empty() && initial.algorithms.is_empty() {
            return Ok(vocabulary);
        }
        let mut alphabets = AlphabetRegistry::new();
        for alphabet in &initial.alphabets {
            alphabets.register(alphabet)?;
        }
        let mut algorithms = AlgorithmRegistry::new();
        for uri in &initial.algorithms {
            let algorithm = self
                .config
                .algorithms()
                .by_uri(uri)
                .ok_or_else(|| Error::UnknownAlgorithmUri(uri.clone()))?;
            algorithms.register(algorithm)?;
        }
        log::debug!(
            "document registries: {} alphabets, {} algorithms",
            alphabets.user_count(),
            algorithms.user_count()
        );
        vocabulary.set_registries(Rc::new(algorithms), Rc::new(alphabets));
        Ok(vocabulary)
    }

    fn read_child(&mut self) -> Result<()> {
        if self.take_terminator()? {
            return self.end_list();
        }
        let depth = self.elements.len();
        let first = self.bits.peek_byte()?;
        match first {
            b if b & 0x80 == 0 => self.read_element(depth),
            b if b & 0xC0 == 0x80 => {
                if depth == 0 {
                    return Err(Error::malformed("character chunk outside the root element"));
                }
                self.read_characters(depth)
            }
            PROCESSING_INSTRUCTION => self.read_processing_instruction(depth),
            COMMENT => self.read_comment(depth),
            b if b & 0xFC == DOCUMENT_TYPE => {
                if depth != 0 {
                    return Err(Error::malformed("document type declaration inside an element"));
                }
                self.read_document_type()
            }
            b => Err(Error::malformed(format!("unsupported item {b:#04X}"))),
        }
    }

    /// Verbraucht einen Terminator, falls einer ansteht.
    fn take_terminator(&mut self) -> Result<bool> {
        if self.terminator_pending {
            self.terminator_pending = false;
            return Ok(true);
        }
        match self.bits.peek_byte()? {
            TERMINATOR => {
                self.bits.read_byte()?;
                Ok(true)
            }
            DOUBLE_TERMINATOR => {
                self.bits.read_byte()?;
                self.terminator_pending = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn end_list(&mut self) -> Result<()> {
        match self.elements.pop() {
            Some(qname) => {
                self.node.reset(NodeKind::ElementEnd, self.elements.len());
                self.node.qname = Some(qname);
            }
            None => {
                if self.terminator_pending {
                    return Err(Error::malformed("terminator after the end of the document"));
                }
                self.node.reset(NodeKind::DocumentEnd, 0);
                self.stage = Stage::Done;
            }
        }
        Ok(())
    }

    fn read_element(&mut self, depth: usize) -> Result<()> {
        self.node.reset(NodeKind::ElementStart, depth);
        let first = self.bits.peek_byte()?;
        let has_attributes = if first & 0x3F == ELEMENT_NAMESPACES {
            self.bits.read_byte()?;
            self.read_namespace_attributes()?;
            if self.bits.read_bits(2)? != 0 {
                return Err(Error::malformed("padding after namespace attributes"));
            }
            first & ELEMENT_ATTRIBUTES != 0
        } else {
            self.bits.read_bit()?;
            self.bits.read_bit()?
        };
        let qname = match packed::read_index_bit3(&mut self.bits)? {
            NameRef::Index(i) => self
                .vocabulary
                .element_names()
                .get(i)
                .cloned()
                .ok_or_else(|| malformed_index("element name", i))?,
            NameRef::Literal => {
                let qname = self.read_literal_name()?;
                self.vocabulary.add_element_name(&qname);
                qname
            }
        };
        log::trace!("element {qname} at depth {depth}");
        if has_attributes {
            self.read_attributes()?;
        }
        self.node.qname = Some(qname.clone());
        self.elements.push(qname);
        Ok(())
    }

    /// Namespace-Attribute bis zum Terminator; sie erscheinen als
    /// `xmlns`/`xmlns:p` Attribute.
    fn read_namespace_attributes(&mut self) -> Result<()> {
        loop {
            if self.bits.peek_byte()? == TERMINATOR {
                self.bits.read_byte()?;
                return Ok(());
            }
            if u64::from(self.bits.read_bits(6)?) != NAMESPACE_ATTRIBUTE {
                return Err(Error::malformed("invalid namespace attribute"));
            }
            let has_prefix = self.bits.read_bit()?;
            let has_namespace = self.bits.read_bit()?;
            let prefix =
                if has_prefix { Some(self.read_identifying(Table::Prefixes)?) } else { None };
            let namespace = if has_namespace {
                Some(self.read_identifying(Table::NamespaceNames)?)
            } else {
                None
            };
            let qname = match prefix {
                Some(p) => QName::from_parts(Some(XMLNS.into()), Some(XMLNS_NAMESPACE.into()), p),
                None => QName::from_parts(None, Some(XMLNS_NAMESPACE.into()), XMLNS.into()),
            };
            let value = namespace.as_deref().unwrap_or_default().to_string();
            self.node.attributes.push(Attribute { qname, value, encoding: None });
        }
    }

    fn read_attributes(&mut self) -> Result<()> {
        loop {
            match self.bits.peek_byte()? {
                TERMINATOR => {
                    self.bits.read_byte()?;
                    return Ok(());
                }
                // Attributliste und leere Kindliste enden zusammen
                DOUBLE_TERMINATOR => {
                    self.bits.read_byte()?;
                    self.terminator_pending = true;
                    return Ok(());
                }
                b if b & 0x80 != 0 => {
                    return Err(Error::malformed(format!("invalid attribute start {b:#04X}")));
                }
                _ => {}
            }
            self.bits.read_bit()?;
            let qname = match packed::read_index_bit2(&mut self.bits)? {
                NameRef::Index(i) => self
                    .vocabulary
                    .attribute_names()
                    .get(i)
                    .cloned()
                    .ok_or_else(|| malformed_index("attribute name", i))?,
                NameRef::Literal => {
                    let qname = self.read_literal_name()?;
                    self.vocabulary.add_attribute_name(&qname);
                    qname
                }
            };
            let (value, encoding) = self.read_non_identifying(Table::AttributeValues)?;
            self.node.attributes.push(Attribute { qname, value, encoding });
        }
    }

    /// Presence-Bits und die drei Teile eines literalen Namens.
    fn read_literal_name(&mut self) -> Result<QName> {
        let has_prefix = self.bits.read_bit()?;
        let has_namespace = self.bits.read_bit()?;
        if has_prefix && !has_namespace {
            return Err(Error::malformed("literal name with prefix but without namespace"));
        }
        let prefix = if has_prefix { Some(self.read_identifying(Table::Prefixes)?) } else { None };
        let namespace =
            if has_namespace { Some(self.read_identifying(Table::NamespaceNames)?) } else { None };
        let local_name = self.read_identifying(Table::LocalNames)?;
        Ok(QName::from_parts(prefix, namespace, local_name))
    }

    fn read_characters(&mut self, depth: usize) -> Result<()> {
        self.node.reset(NodeKind::Text, depth);
        self.bits.read_bits(2)?;
        if self.bits.read_bit()? {
            let index = packed::read_index_bit4(&mut self.bits)?;
            let chunk = self.lookup(Table::ContentChunks, index)?;
            self.node.value.push_str(&chunk);
            return Ok(());
        }
        let add = self.bits.read_bit()?;
        let discriminant = self.bits.read_bits(2)?;
        let encoding = self.read_encoding(discriminant)?;
        let len = packed::read_length_bit7(&mut self.bits)?;
        let data = self.bits.read_bytes(len)?;
        let text = self.decode_octets(discriminant, encoding, data)?;
        if add {
            self.vocabulary.strings_mut(Table::ContentChunks).add(&text);
        }
        self.node.value = text;
        self.node.encoding = encoding;
        Ok(())
    }

    fn read_comment(&mut self, depth: usize) -> Result<()> {
        self.bits.read_byte()?;
        self.node.reset(NodeKind::Comment, depth);
        let (text, _) = self.read_non_identifying(Table::OtherStrings)?;
        self.node.value = text;
        Ok(())
    }

    fn read_processing_instruction(&mut self, depth: usize) -> Result<()> {
        self.bits.read_byte()?;
        self.node.reset(NodeKind::ProcessingInstruction, depth);
        let target = self.read_identifying(Table::OtherNcNames)?;
        let (data, _) = self.read_non_identifying(Table::OtherStrings)?;
        self.node.qname = Some(QName::from_parts(None, None, target));
        self.node.value = data;
        Ok(())
    }

    fn read_document_type(&mut self) -> Result<()> {
        let first = self.bits.read_byte()?;
        self.node.reset(NodeKind::DocumentType, 0);
        if first & DOCUMENT_TYPE_SYSTEM != 0 {
            self.node.system_id = Some(self.read_identifying(Table::OtherUris)?.to_string());
        }
        if first & DOCUMENT_TYPE_PUBLIC != 0 {
            self.node.public_id = Some(self.read_identifying(Table::OtherUris)?.to_string());
        }
        // eingebettete PIs werden uebersprungen
        while !self.take_terminator()? {
            if self.bits.read_byte()? != PROCESSING_INSTRUCTION {
                return Err(Error::malformed("document type declaration child is not a PI"));
            }
            let target = self.read_identifying(Table::OtherNcNames)?;
            self.read_non_identifying(Table::OtherStrings)?;
            log::debug!("skipping processing instruction {target} in document type declaration");
        }
        Ok(())
    }

    fn lookup(&self, table: Table, index: usize) -> Result<Rc<str>> {
        self.vocabulary
            .strings(table)
            .get(index)
            .cloned()
            .ok_or_else(|| malformed_index(table.name(), index))
    }

    /// C.13; literale Strings kommen immer in die Tabelle.
    fn read_identifying(&mut self, table: Table) -> Result<Rc<str>> {
        if self.bits.read_bit()? {
            return match packed::read_index_bit2(&mut self.bits)? {
                NameRef::Index(i) => self.lookup(table, i),
                NameRef::Literal => Err(Error::malformed("illegal identifying string index")),
            };
        }
        let text: Rc<str> = packed::decode_utf8(packed::read_octets_bit2(&mut self.bits)?)?.into();
        self.vocabulary.strings_mut(table).add(&text);
        Ok(text)
    }

    /// C.14: Text und, falls codiert, die benutzte Codierung.
    fn read_non_identifying(&mut self, table: Table) -> Result<(String, Option<Encoding>)> {
        if self.bits.peek_byte()? == EMPTY_STRING {
            self.bits.read_byte()?;
            return Ok((String::new(), None));
        }
        if self.bits.read_bit()? {
            return match packed::read_index_bit2(&mut self.bits)? {
                NameRef::Index(i) => Ok((self.lookup(table, i)?.to_string(), None)),
                NameRef::Literal => Err(Error::malformed("illegal string index")),
            };
        }
        let add = self.bits.read_bit()?;
        let discriminant = self.bits.read_bits(2)?;
        let encoding = self.read_encoding(discriminant)?;
        let len = packed::read_length_bit5(&mut self.bits)?;
        let data = self.bits.read_bytes(len)?;
        let text = self.decode_octets(discriminant, encoding, data)?;
        if add {
            self.vocabulary.strings_mut(table).add(&text);
        }
        Ok((text, encoding))
    }

    /// Tabellenplatz fuer Alphabet (`10`) oder Algorithmus (`11`).
    fn read_encoding(&mut self, discriminant: u32) -> Result<Option<Encoding>> {
        Ok(match discriminant {
            0b10 => Some(Encoding::Alphabet(self.bits.read_bits(8)? as usize + 1)),
            0b11 => Some(Encoding::Algorithm(self.bits.read_bits(8)? as usize + 1)),
            _ => None,
        })
    }

    fn decode_octets(
        &self,
        discriminant: u32,
        encoding: Option<Encoding>,
        data: Vec<u8>,
    ) -> Result<String> {
        match encoding {
            Some(encoding) => self.vocabulary.decode_value(encoding, &data),
            None if discriminant == 0 => packed::decode_utf8(data),
            None => packed::decode_utf16(&data),
        }
    }
}

/// Decodes a whole document into owned nodes.
pub fn decode(bytes: &[u8], config: DecoderConfig) -> Result<Vec<DecodedNode>> {
    let mut decoder = Decoder::new(bytes, config);
    let mut nodes = Vec::new();
    while let Some(node) = decoder.read_node()? {
        nodes.push(node.clone());
    }
    Ok(nodes)
}

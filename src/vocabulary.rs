//! Vocabulary: the tables an encoder and decoder grow in lockstep
//! (X.891 7.2.13, 8).
//!
//! Ein Vokabular haelt die zwei Qualified-Name-Tabellen, die acht
//! String-Tabellen und gemeinsam genutzte Referenzen auf die Algorithmen-
//! und Alphabet-Registries. Die Registries sind nach dem Erzeugen nur noch
//! lesbar.
//!
//! Es gibt drei Arten, ein Vokabular zu bekommen:
//! - [`Vocabulary::new`]: leer bis auf die fest vergebenen Eintraege,
//! - [`Vocabulary::into_shared`]: als externes Basisvokabular unter einem URI,
//!   das mehrere Dokumente per `Rc` referenzieren,
//! - [`Vocabulary::working_copy`]: tiefe Kopie der Tabellen fuer genau ein
//!   Dokument, Registries werden geteilt.

use std::rc::Rc;

use crate::algorithm::{AlgorithmRegistry, EncodedValue, Encoding};
use crate::alphabet::AlphabetRegistry;
use crate::qname::{QName, XML_NAMESPACE, XML_PREFIX};
use crate::string_table::{Insertion, QNameTable, StringTable, Table};
use crate::{Error, Result};

/// How a vocabulary instance relates to other instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Built for one document.
    Owned,
    /// Read-only base shared across documents, announced by `uri`.
    SharedBase { uri: Rc<str> },
    /// Per-document copy; `external` names the base it was copied from.
    ClonedFrom { external: Option<Rc<str>> },
}

/// String and qualified-name tables plus the encoding registries.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    element_names: QNameTable,
    attribute_names: QNameTable,
    attribute_values: StringTable,
    content_chunks: StringTable,
    local_names: StringTable,
    namespace_names: StringTable,
    prefixes: StringTable,
    other_ncnames: StringTable,
    other_strings: StringTable,
    other_uris: StringTable,
    algorithms: Rc<AlgorithmRegistry>,
    alphabets: Rc<AlphabetRegistry>,
    ownership: Ownership,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    /// Fresh vocabulary with only the built-in entries and registries.
    pub fn new() -> Self {
        Self::with_registries(
            Rc::new(AlgorithmRegistry::new()),
            Rc::new(AlphabetRegistry::new()),
        )
    }

    /// Fresh vocabulary using the given (read-only) registries.
    pub fn with_registries(
        algorithms: Rc<AlgorithmRegistry>,
        alphabets: Rc<AlphabetRegistry>,
    ) -> Self {
        let mut vocab = Self {
            element_names: QNameTable::new("element names"),
            attribute_names: QNameTable::new("attribute names"),
            attribute_values: StringTable::new(Table::AttributeValues.name()),
            content_chunks: StringTable::new(Table::ContentChunks.name()),
            local_names: StringTable::new(Table::LocalNames.name()),
            namespace_names: StringTable::new(Table::NamespaceNames.name()),
            prefixes: StringTable::new(Table::Prefixes.name()),
            other_ncnames: StringTable::new(Table::OtherNcNames.name()),
            other_strings: StringTable::new(Table::OtherStrings.name()),
            other_uris: StringTable::new(Table::OtherUris.name()),
            algorithms,
            alphabets,
            ownership: Ownership::Owned,
        };
        // X.891 8.4: xml Prefix und Namespace haben immer Index 1
        vocab.prefixes.add(XML_PREFIX);
        vocab.namespace_names.add(XML_NAMESPACE);
        vocab
    }

    /// Freezes this vocabulary as an external base announced under `uri`.
    pub fn into_shared(mut self, uri: &str) -> Result<Rc<Self>> {
        if uri.is_empty() {
            return Err(Error::invalid_value("external vocabulary needs a non-empty URI"));
        }
        log::debug!(
            "shared vocabulary {uri}: {} element names, {} attribute names",
            self.element_names.len(),
            self.attribute_names.len()
        );
        self.ownership = Ownership::SharedBase { uri: uri.into() };
        Ok(Rc::new(self))
    }

    /// Deep copy of all tables sharing the registries.
    pub fn working_copy(&self) -> Self {
        let external = match &self.ownership {
            Ownership::Owned => None,
            Ownership::SharedBase { uri } => Some(Rc::clone(uri)),
            Ownership::ClonedFrom { external } => external.clone(),
        };
        Self { ownership: Ownership::ClonedFrom { external }, ..self.clone() }
    }

    pub fn ownership(&self) -> &Ownership {
        &self.ownership
    }

    /// URI of the external base this vocabulary was copied from.
    pub fn external_uri(&self) -> Option<&str> {
        match &self.ownership {
            Ownership::ClonedFrom { external } => external.as_deref(),
            Ownership::SharedBase { uri } => Some(uri),
            Ownership::Owned => None,
        }
    }

    pub fn algorithms(&self) -> &Rc<AlgorithmRegistry> {
        &self.algorithms
    }

    pub fn alphabets(&self) -> &Rc<AlphabetRegistry> {
        &self.alphabets
    }

    /// Replaces the registries; used by the decoder once it has read the
    /// document's initial vocabulary.
    pub(crate) fn set_registries(
        &mut self,
        algorithms: Rc<AlgorithmRegistry>,
        alphabets: Rc<AlphabetRegistry>,
    ) {
        self.algorithms = algorithms;
        self.alphabets = alphabets;
    }

    /// `true` once anything beyond the built-in entries was added.
    pub fn has_table_entries(&self) -> bool {
        !self.element_names.is_empty()
            || !self.attribute_names.is_empty()
            || self.prefixes.len() > 1
            || self.namespace_names.len() > 1
            || [
                &self.attribute_values,
                &self.content_chunks,
                &self.local_names,
                &self.other_ncnames,
                &self.other_strings,
                &self.other_uris,
            ]
            .iter()
            .any(|t| !t.is_empty())
    }

    pub fn element_names(&self) -> &QNameTable {
        &self.element_names
    }

    pub fn attribute_names(&self) -> &QNameTable {
        &self.attribute_names
    }

    /// One of the string tables.
    pub fn strings(&self, table: Table) -> &StringTable {
        match table {
            Table::AttributeValues => &self.attribute_values,
            Table::ContentChunks => &self.content_chunks,
            Table::LocalNames => &self.local_names,
            Table::NamespaceNames => &self.namespace_names,
            Table::Prefixes => &self.prefixes,
            Table::OtherNcNames => &self.other_ncnames,
            Table::OtherStrings => &self.other_strings,
            Table::OtherUris => &self.other_uris,
        }
    }

    pub fn strings_mut(&mut self, table: Table) -> &mut StringTable {
        match table {
            Table::AttributeValues => &mut self.attribute_values,
            Table::ContentChunks => &mut self.content_chunks,
            Table::LocalNames => &mut self.local_names,
            Table::NamespaceNames => &mut self.namespace_names,
            Table::Prefixes => &mut self.prefixes,
            Table::OtherNcNames => &mut self.other_ncnames,
            Table::OtherStrings => &mut self.other_strings,
            Table::OtherUris => &mut self.other_uris,
        }
    }

    /// Adds an element name; a new name also adds its parts.
    pub fn add_element_name(&mut self, qname: &QName) -> Insertion {
        let result = self.element_names.try_add(qname);
        if result.is_new() {
            self.add_name_parts(qname);
        }
        result
    }

    /// Adds an attribute name; a new name also adds its parts.
    pub fn add_attribute_name(&mut self, qname: &QName) -> Insertion {
        let result = self.attribute_names.try_add(qname);
        if result.is_new() {
            self.add_name_parts(qname);
        }
        result
    }

    fn add_name_parts(&mut self, qname: &QName) {
        self.local_names.add(&qname.local_name);
        if let Some(ns) = &qname.namespace {
            self.namespace_names.add(ns);
        }
        if let Some(prefix) = &qname.prefix {
            self.prefixes.add(prefix);
        }
    }

    /// Encodes `value` with an algorithm or alphabet from the registries.
    pub fn encode_value(&self, encoding: Encoding, value: &EncodedValue) -> Result<Vec<u8>> {
        match encoding {
            Encoding::Algorithm(index) => self.algorithms.get(index)?.encode(value),
            Encoding::Alphabet(index) => match value {
                EncodedValue::Text(text) => self.alphabets.get(index)?.encode(text),
                other => Err(Error::invalid_value(format!(
                    "restricted alphabets encode text, got {}",
                    other.kind()
                ))),
            },
        }
    }

    /// Decodes octets produced by [`Vocabulary::encode_value`].
    pub fn decode_value(&self, encoding: Encoding, data: &[u8]) -> Result<String> {
        match encoding {
            Encoding::Algorithm(index) => self.algorithms.get(index)?.decode(data),
            Encoding::Alphabet(index) => self.alphabets.get(index)?.decode(data),
        }
    }
}

//! Vocabulary tables (X.891 7.13, 8.4).
//!
//! Jede Tabelle vergibt 1-basierte Indizes in Einfuegereihenfolge. Ein
//! einmal vergebener Index bleibt fuer die Lebensdauer der Tabelle stabil.
//! Ab 2^20 Eintraegen wird nichts mehr eingefuegt; der Wert wird dann
//! immer literal codiert. Das ist kein Fehler.

use std::rc::Rc;

use crate::FastHashMap;
use crate::qname::QName;

/// Maximum number of entries per table (X.891 8.4.2).
pub const MAX_ENTRIES: usize = 1 << 20;

/// Bis zu dieser Groesse wird linear gesucht, danach ueber eine HashMap.
const LINEAR_THRESHOLD: usize = 64;

/// Result of adding a value to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// Value was added under this index.
    New(usize),
    /// Value was already present under this index.
    Existing(usize),
    /// Table is full; the value has no index.
    Full,
}

impl Insertion {
    /// Index of the value, if it has one.
    pub fn index(self) -> Option<usize> {
        match self {
            Self::New(i) | Self::Existing(i) => Some(i),
            Self::Full => None,
        }
    }

    /// `true` only for [`Insertion::New`].
    pub fn is_new(self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// Identifies one of the vocabulary's string tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    AttributeValues,
    ContentChunks,
    LocalNames,
    NamespaceNames,
    Prefixes,
    OtherNcNames,
    OtherStrings,
    OtherUris,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::AttributeValues => "attribute values",
            Self::ContentChunks => "content character chunks",
            Self::LocalNames => "local names",
            Self::NamespaceNames => "namespace names",
            Self::Prefixes => "prefixes",
            Self::OtherNcNames => "other NCNames",
            Self::OtherStrings => "other strings",
            Self::OtherUris => "other URIs",
        }
    }
}

/// Insertion-ordered string table with 1-based indices.
#[derive(Debug, Clone)]
pub struct StringTable {
    name: &'static str,
    entries: Vec<Rc<str>>,
    /// Lazy angelegt sobald `LINEAR_THRESHOLD` erreicht ist.
    lookup: Option<FastHashMap<Rc<str>, usize>>,
    capacity: usize,
    warned_full: bool,
}

impl StringTable {
    /// Empty table; `name` only appears in log output.
    pub fn new(name: &'static str) -> Self {
        Self::with_limit(name, MAX_ENTRIES)
    }

    /// Table with a smaller entry limit.
    pub(crate) fn with_limit(name: &'static str, capacity: usize) -> Self {
        Self { name, entries: Vec::new(), lookup: None, capacity, warned_full: false }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based index of `value`.
    #[inline]
    pub fn index_of(&self, value: &str) -> Option<usize> {
        match &self.lookup {
            Some(map) => map.get(value).copied(),
            None => self.entries.iter().position(|e| &**e == value).map(|p| p + 1),
        }
    }

    /// Value at a 1-based index.
    pub fn get(&self, index: usize) -> Option<&Rc<str>> {
        index.checked_sub(1).and_then(|pos| self.entries.get(pos))
    }

    /// Adds `value` unless present. A full table refuses silently.
    pub fn add(&mut self, value: &str) -> Insertion {
        if let Some(index) = self.index_of(value) {
            return Insertion::Existing(index);
        }
        if self.entries.len() >= self.capacity {
            if !self.warned_full {
                log::warn!(
                    "{} table reached {} entries, further values are encoded literally",
                    self.name,
                    self.capacity
                );
                self.warned_full = true;
            }
            return Insertion::Full;
        }
        let rc: Rc<str> = value.into();
        let index = self.entries.len() + 1;
        if let Some(map) = &mut self.lookup {
            map.insert(Rc::clone(&rc), index);
        } else if index >= LINEAR_THRESHOLD {
            let mut map =
                FastHashMap::with_capacity_and_hasher(index * 2, ahash::RandomState::default());
            for (pos, e) in self.entries.iter().enumerate() {
                map.insert(Rc::clone(e), pos + 1);
            }
            map.insert(Rc::clone(&rc), index);
            self.lookup = Some(map);
        }
        self.entries.push(rc);
        Insertion::New(index)
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(AsRef::as_ref)
    }
}

/// Qualified name table (element names or attribute names).
///
/// Zweistufig: erst ueber den Local Name, dann lineare Suche ueber die
/// (meist wenigen) Prefix/Namespace-Varianten.
#[derive(Debug, Clone)]
pub struct QNameTable {
    name: &'static str,
    by_local_name: FastHashMap<Rc<str>, Vec<(QName, usize)>>,
    entries: Vec<QName>,
    capacity: usize,
    warned_full: bool,
}

impl QNameTable {
    pub fn new(name: &'static str) -> Self {
        Self::with_limit(name, MAX_ENTRIES)
    }

    pub(crate) fn with_limit(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            by_local_name: FastHashMap::default(),
            entries: Vec::new(),
            capacity,
            warned_full: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based index of `qname`.
    pub fn index_of(&self, qname: &QName) -> Option<usize> {
        self.by_local_name
            .get(&qname.local_name)?
            .iter()
            .find(|(q, _)| q.prefix == qname.prefix && q.namespace == qname.namespace)
            .map(|&(_, index)| index)
    }

    pub fn contains(&self, qname: &QName) -> bool {
        self.index_of(qname).is_some()
    }

    /// Name at a 1-based index.
    pub fn get(&self, index: usize) -> Option<&QName> {
        index.checked_sub(1).and_then(|pos| self.entries.get(pos))
    }

    /// Adds `qname` unless present. A full table refuses silently.
    pub fn try_add(&mut self, qname: &QName) -> Insertion {
        if let Some(index) = self.index_of(qname) {
            return Insertion::Existing(index);
        }
        if self.entries.len() >= self.capacity {
            if !self.warned_full {
                log::warn!("{} table reached {} entries", self.name, self.capacity);
                self.warned_full = true;
            }
            return Insertion::Full;
        }
        let index = self.entries.len() + 1;
        self.by_local_name
            .entry(Rc::clone(&qname.local_name))
            .or_default()
            .push((qname.clone(), index));
        self.entries.push(qname.clone());
        Insertion::New(index)
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &QName> {
        self.entries.iter()
    }
}

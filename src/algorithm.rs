//! Encoding algorithms (X.891 8.3, 10).
//!
//! Die Tabellenindizes 1 bis 10 sind fest vergeben. Eigene Algorithmen
//! werden ueber ihren URI registriert und erhalten die Indizes ab 32 in
//! Registrierungsreihenfolge.

use std::fmt;
use std::rc::Rc;

use crate::{Error, FastIndexMap, Result, binary, boolean, float, integer};

/// Erster Tabellenindex fuer benutzerdefinierte Algorithmen.
pub const FIRST_USER_INDEX: usize = 32;

/// Hoechster Tabellenindex (8-Bit Feld, 1-basiert).
pub const MAX_INDEX: usize = 256;

/// The ten built-in encoding algorithms with their table indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinAlgorithm {
    Hexadecimal = 1,
    Base64 = 2,
    Short = 3,
    Int = 4,
    Long = 5,
    Boolean = 6,
    Float = 7,
    Double = 8,
    Uuid = 9,
    Cdata = 10,
}

impl BuiltinAlgorithm {
    /// Looks up a built-in algorithm by table index.
    pub fn from_index(index: usize) -> Option<Self> {
        Some(match index {
            1 => Self::Hexadecimal,
            2 => Self::Base64,
            3 => Self::Short,
            4 => Self::Int,
            5 => Self::Long,
            6 => Self::Boolean,
            7 => Self::Float,
            8 => Self::Double,
            9 => Self::Uuid,
            10 => Self::Cdata,
            _ => return None,
        })
    }

    /// 1-based table index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hexadecimal => "hexadecimal",
            Self::Base64 => "base64",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Double => "double",
            Self::Uuid => "uuid",
            Self::Cdata => "cdata",
        }
    }

    /// Encodes a typed value. The value variant must match the algorithm.
    pub fn encode(self, value: &EncodedValue) -> Result<Vec<u8>> {
        match (self, value) {
            (Self::Hexadecimal | Self::Base64, EncodedValue::Bytes(b)) => Ok(b.clone()),
            (Self::Uuid, EncodedValue::Bytes(b)) => binary::encode_uuids(b),
            (Self::Short, EncodedValue::Shorts(v)) => Ok(integer::encode_shorts(v)),
            (Self::Int, EncodedValue::Ints(v)) => Ok(integer::encode_ints(v)),
            (Self::Long, EncodedValue::Longs(v)) => Ok(integer::encode_longs(v)),
            (Self::Boolean, EncodedValue::Booleans(v)) => Ok(boolean::encode(v)),
            (Self::Float, EncodedValue::Floats(v)) => Ok(float::encode_floats(v)),
            (Self::Double, EncodedValue::Doubles(v)) => Ok(float::encode_doubles(v)),
            (Self::Cdata, EncodedValue::Text(t)) => Ok(binary::encode_cdata(t)),
            (alg, value) => Err(Error::invalid_value(format!(
                "{} value cannot be encoded with the {} algorithm",
                value.kind(),
                alg.name()
            ))),
        }
    }

    /// Decodes octets to the value's text form.
    pub fn decode(self, data: &[u8]) -> Result<String> {
        match self {
            Self::Hexadecimal => Ok(binary::decode_hex(data)),
            Self::Base64 => Ok(binary::decode_base64(data)),
            Self::Short => integer::decode_shorts(data),
            Self::Int => integer::decode_ints(data),
            Self::Long => integer::decode_longs(data),
            Self::Boolean => boolean::decode(data),
            Self::Float => float::decode_floats(data),
            Self::Double => float::decode_doubles(data),
            Self::Uuid => binary::decode_uuids(data),
            Self::Cdata => binary::decode_cdata(data),
        }
    }
}

/// Caller-supplied data for [`crate::writer::Writer::write_encoded_data`].
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedValue {
    /// Raw octets (hexadecimal, base64, UUID, custom algorithms).
    Bytes(Vec<u8>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Booleans(Vec<bool>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    /// Text (CDATA, restricted alphabets).
    Text(String),
}

impl EncodedValue {
    /// Name of the variant for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Shorts(_) => "short",
            Self::Ints(_) => "int",
            Self::Longs(_) => "long",
            Self::Booleans(_) => "boolean",
            Self::Floats(_) => "float",
            Self::Doubles(_) => "double",
            Self::Text(_) => "text",
        }
    }

    /// `true` if encoding this value yields no data at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytes(v) => v.is_empty(),
            Self::Shorts(v) => v.is_empty(),
            Self::Ints(v) => v.is_empty(),
            Self::Longs(v) => v.is_empty(),
            Self::Booleans(v) => v.is_empty(),
            Self::Floats(v) => v.is_empty(),
            Self::Doubles(v) => v.is_empty(),
            Self::Text(v) => v.is_empty(),
        }
    }
}

/// A user-defined encoding algorithm identified by URI.
pub trait EncodingAlgorithm: fmt::Debug {
    /// URI announced in the document's initial vocabulary.
    fn uri(&self) -> &str;
    /// Encodes `value` to octets.
    fn encode(&self, value: &EncodedValue) -> Result<Vec<u8>>;
    /// Decodes octets to the text reported to the reader.
    fn decode(&self, data: &[u8]) -> Result<String>;
}

/// Selects how a character chunk or attribute value is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Encoding algorithm by 1-based table index.
    Algorithm(usize),
    /// Restricted alphabet by 1-based table index.
    Alphabet(usize),
}

impl From<BuiltinAlgorithm> for Encoding {
    fn from(alg: BuiltinAlgorithm) -> Self {
        Self::Algorithm(alg.index())
    }
}

/// A resolved algorithm table entry.
#[derive(Debug, Clone)]
pub enum Algorithm {
    Builtin(BuiltinAlgorithm),
    User(Rc<dyn EncodingAlgorithm>),
}

impl Algorithm {
    /// Encodes through the built-in or user implementation.
    pub fn encode(&self, value: &EncodedValue) -> Result<Vec<u8>> {
        match self {
            Self::Builtin(alg) => alg.encode(value),
            Self::User(alg) => alg.encode(value),
        }
    }

    /// Decodes through the built-in or user implementation.
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        match self {
            Self::Builtin(alg) => alg.decode(data),
            Self::User(alg) => alg.decode(data),
        }
    }
}

/// Registry of user encoding algorithms keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    user: FastIndexMap<String, Rc<dyn EncodingAlgorithm>>,
}

impl AlgorithmRegistry {
    /// Empty registry; the built-ins need no registration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `algorithm` and returns its table index (32 and up).
    ///
    /// A URI that is already registered keeps its index and implementation.
    pub fn register(&mut self, algorithm: Rc<dyn EncodingAlgorithm>) -> Result<usize> {
        if let Some(pos) = self.user.get_index_of(algorithm.uri()) {
            return Ok(FIRST_USER_INDEX + pos);
        }
        if FIRST_USER_INDEX + self.user.len() > MAX_INDEX {
            return Err(Error::invalid_value("encoding algorithm table is full"));
        }
        let uri = algorithm.uri().to_string();
        log::debug!("registered encoding algorithm {uri} at index {}", FIRST_USER_INDEX + self.user.len());
        let (pos, _) = self.user.insert_full(uri, algorithm);
        Ok(FIRST_USER_INDEX + pos)
    }

    /// Resolves a 1-based table index.
    pub fn get(&self, index: usize) -> Result<Algorithm> {
        if let Some(alg) = BuiltinAlgorithm::from_index(index) {
            return Ok(Algorithm::Builtin(alg));
        }
        index
            .checked_sub(FIRST_USER_INDEX)
            .and_then(|pos| self.user.get_index(pos))
            .map(|(_, alg)| Algorithm::User(Rc::clone(alg)))
            .ok_or(Error::UnknownEncoding { kind: "algorithm", index })
    }

    /// Implementation registered for `uri`.
    pub fn by_uri(&self, uri: &str) -> Option<Rc<dyn EncodingAlgorithm>> {
        self.user.get(uri).cloned()
    }

    /// Table index of a registered URI.
    pub fn index_of(&self, uri: &str) -> Option<usize> {
        self.user.get_index_of(uri).map(|pos| FIRST_USER_INDEX + pos)
    }

    /// Registered URIs in table order.
    pub fn user_uris(&self) -> impl Iterator<Item = &str> {
        self.user.keys().map(String::as_str)
    }

    /// Number of user algorithms.
    pub fn user_count(&self) -> usize {
        self.user.len()
    }
}

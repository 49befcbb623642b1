//! Central error type for the Fast Infoset codec.
//!
//! Every failure is reported as one named condition. Nothing is retried
//! internally; table capacity exhaustion is not an error at all (the value is
//! then written literally).

use core::fmt;
use std::borrow::Cow;

/// All error conditions raised by the encoder, decoder and their helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The byte source ended in the middle of an item.
    UnexpectedEndOfInput,
    /// The input is not a valid Fast Infoset document (X.891 12, Annex C).
    MalformedStream(Cow<'static, str>),
    /// The reserved `xmlns` namespace name was used for a binding.
    ReservedNamespace(String),
    /// A prefix was used that is not bound in any enclosing scope.
    UndefinedPrefix(String),
    /// A non-empty prefix was bound to an empty namespace name.
    NamespaceRequired(String),
    /// Any other namespace misuse (empty namespace lookup, bad `xml` binding).
    InvalidNamespace(Cow<'static, str>),
    /// A restricted alphabet must hold between 2 and 2^20 characters (X.891 8.2).
    AlphabetSize(usize),
    /// A character to encode is not part of the restricted alphabet.
    CharacterNotInAlphabet(char),
    /// Restricted alphabet encoding is only available for 4 and 8 bit widths.
    UnsupportedAlphabetWidth(u8),
    /// A fixed-width payload length is not a multiple of the unit size (X.891 10).
    InvalidFixedWidthValue {
        /// Name of the encoding algorithm (`short`, `int`, `uuid`, ...).
        kind: &'static str,
        /// Offending payload length in bytes.
        length: usize,
    },
    /// A value cannot be represented by the selected encoding.
    InvalidValue(Cow<'static, str>),
    /// An encoding-algorithm or restricted-alphabet table slot is not registered.
    UnknownEncoding {
        /// `"algorithm"` or `"alphabet"`.
        kind: &'static str,
        /// 1-based table index.
        index: usize,
    },
    /// An algorithm URI announced by a document has no registered implementation.
    UnknownAlgorithmUri(String),
    /// An internal invariant was violated (buffer rewind, zero-length read).
    Internal(Cow<'static, str>),
    /// Writer calls arrived in an order the format cannot express.
    InvalidState(Cow<'static, str>),
    /// Error reported by the underlying byte sink or source.
    Io(String),
    /// XML text could not be parsed or written.
    XmlParse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEndOfInput => write!(f, "unexpected end of input"),
            Self::MalformedStream(msg) => {
                if msg.is_empty() {
                    write!(f, "malformed fast infoset stream")
                } else {
                    write!(f, "malformed fast infoset stream: {msg}")
                }
            }
            Self::ReservedNamespace(uri) => write!(f, "reserved namespace: {uri}"),
            Self::UndefinedPrefix(prefix) => {
                write!(f, "undefined namespace for prefix '{prefix}'")
            }
            Self::NamespaceRequired(prefix) => {
                write!(f, "namespace required for prefix '{prefix}'")
            }
            Self::InvalidNamespace(msg) => write!(f, "invalid namespace: {msg}"),
            Self::AlphabetSize(size) => write!(
                f,
                "restricted alphabet must contain 2..=1048576 characters, got {size} (X.891 8.2)"
            ),
            Self::CharacterNotInAlphabet(ch) => {
                write!(f, "character {ch:?} is not in the restricted alphabet")
            }
            Self::UnsupportedAlphabetWidth(bits) => write!(
                f,
                "restricted alphabet encoding with {bits} bits per character is not supported"
            ),
            Self::InvalidFixedWidthValue { kind, length } => write!(
                f,
                "invalid {kind} value: {length} bytes is not a multiple of the {kind} size"
            ),
            Self::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            Self::UnknownEncoding { kind, index } => {
                write!(f, "unknown encoding {kind} at table index {index}")
            }
            Self::UnknownAlgorithmUri(uri) => {
                write!(f, "no encoding algorithm registered for URI {uri}")
            }
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid writer state: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::XmlParse(msg) => write!(f, "XML error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEndOfInput
        } else {
            Self::Io(e.to_string())
        }
    }
}

impl Error {
    /// Erstellt einen `MalformedStream` Fehler mit Nachricht.
    pub fn malformed(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::MalformedStream(msg.into())
    }

    /// Erstellt einen `Internal` Fehler mit Nachricht.
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Erstellt einen `InvalidState` Fehler mit Nachricht.
    pub fn invalid_state(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Erstellt einen `InvalidNamespace` Fehler mit Nachricht.
    pub fn invalid_namespace(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidNamespace(msg.into())
    }

    /// Erstellt einen `InvalidValue` Fehler mit Nachricht.
    pub fn invalid_value(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidValue(msg.into())
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

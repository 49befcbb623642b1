use std::rc::Rc;

use crate::header::Declaration;
use crate::vocabulary::Vocabulary;

/// Zeichencodierung fuer literale nicht-identifizierende Strings (C.19, C.20).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CharacterEncoding {
    #[default]
    Utf8,
    /// UTF-16 big-endian.
    Utf16,
}

impl CharacterEncoding {
    /// Zwei-Bit Diskriminante im Stream.
    pub(crate) fn discriminant(self) -> u64 {
        match self {
            Self::Utf8 => 0b00,
            Self::Utf16 => 0b01,
        }
    }
}

/// Standardgrenze fuer Werte, die in die Vokabular-Tabellen aufgenommen werden.
pub const DEFAULT_VALUE_LENGTH_LIMIT: usize = 64;

/// Encoder-Konfiguration.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// XML-Deklaration vor der Identifikation.
    pub declaration: Option<Declaration>,
    /// Codierung literaler Attributwerte, Zeichenketten und Kommentare.
    pub character_encoding: CharacterEncoding,
    /// Attributwerte und Character Chunks bis zu dieser Laenge (in Zeichen)
    /// werden indiziert. Laengere werden immer literal geschrieben.
    pub value_length_limit: usize,
    /// Basisvokabular. Ein geteiltes Vokabular wird als externes Vokabular
    /// angekuendigt; der Encoder arbeitet immer auf einer Kopie.
    pub vocabulary: Option<Rc<Vocabulary>>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            declaration: None,
            character_encoding: CharacterEncoding::Utf8,
            value_length_limit: DEFAULT_VALUE_LENGTH_LIMIT,
            vocabulary: None,
        }
    }
}

impl EncoderConfig {
    /// Konfiguration mit XML-Deklaration.
    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn with_character_encoding(mut self, encoding: CharacterEncoding) -> Self {
        self.character_encoding = encoding;
        self
    }

    pub fn with_value_length_limit(mut self, limit: usize) -> Self {
        self.value_length_limit = limit;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: Rc<Vocabulary>) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }
}

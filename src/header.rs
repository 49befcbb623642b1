//! Fast Infoset document header (X.891 12, C.1, C.2).
//!
//! Aufbau:
//! - [XML-Deklaration] (optional): eine der neun Formen aus 12.3
//! - Identifikation: `E0 00 00 01`
//! - Presence-Octet: `0` + 7 Bits fuer die optionalen Komponenten
//! - [initial vocabulary], [standalone] (hier behandelt)
//! - [version] (nicht-identifizierender String, schreibt der Encoder)
//!
//! # Beispiel
//!
//! ```
//! use erfi::header::Declaration;
//!
//! let decl = Declaration::V10;
//! assert_eq!(decl.as_str(), "<?xml version='1.0' encoding='finf'?>");
//! assert_eq!(decl.version(), Some("1.0"));
//! assert_eq!(Declaration::parse(decl.as_str().as_bytes()), Some(decl));
//! ```

use std::io::Read;

use crate::bitstream::{BitReader, BitWriter};
use crate::packed;
use crate::{Error, Result};

/// Identification octets following the optional declaration.
pub const MAGIC: [u8; 4] = [0xE0, 0x00, 0x00, 0x01];

/// Laengste der neun Deklarationen plus Reserve.
const MAX_DECLARATION_LEN: usize = 64;

// Presence-Bits im Dokument-Octet (C.2.3)
const ADDITIONAL_DATA: u8 = 0x40;
const INITIAL_VOCABULARY: u8 = 0x20;
const NOTATIONS: u8 = 0x10;
const UNPARSED_ENTITIES: u8 = 0x08;
const CHARACTER_ENCODING_SCHEME: u8 = 0x04;
const STANDALONE: u8 = 0x02;
const VERSION: u8 = 0x01;

// Erstes Octet des initial vocabulary (C.2.5), drei Fuellbits vorne
const EXTERNAL_VOCABULARY: u8 = 0x10;
const RESTRICTED_ALPHABETS: u8 = 0x08;
const ENCODING_ALGORITHMS: u8 = 0x04;
const OTHER_TABLES_FIRST: u8 = 0x03;

/// The nine XML declarations a Fast Infoset document may start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Declaration {
    Finf,
    FinfStandaloneNo,
    FinfStandaloneYes,
    V10,
    V10StandaloneNo,
    V10StandaloneYes,
    V11,
    V11StandaloneNo,
    V11StandaloneYes,
}

impl Declaration {
    const ALL: [Declaration; 9] = [
        Self::Finf,
        Self::FinfStandaloneNo,
        Self::FinfStandaloneYes,
        Self::V10,
        Self::V10StandaloneNo,
        Self::V10StandaloneYes,
        Self::V11,
        Self::V11StandaloneNo,
        Self::V11StandaloneYes,
    ];

    /// Declaration text as written before the identification octets.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finf => "<?xml encoding='finf'?>",
            Self::FinfStandaloneNo => "<?xml encoding='finf' standalone='no'?>",
            Self::FinfStandaloneYes => "<?xml encoding='finf' standalone='yes'?>",
            Self::V10 => "<?xml version='1.0' encoding='finf'?>",
            Self::V10StandaloneNo => "<?xml version='1.0' encoding='finf' standalone='no'?>",
            Self::V10StandaloneYes => "<?xml version='1.0' encoding='finf' standalone='yes'?>",
            Self::V11 => "<?xml version='1.1' encoding='finf'?>",
            Self::V11StandaloneNo => "<?xml version='1.1' encoding='finf' standalone='no'?>",
            Self::V11StandaloneYes => "<?xml version='1.1' encoding='finf' standalone='yes'?>",
        }
    }

    /// Matches declaration bytes exactly.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str().as_bytes() == bytes)
    }

    /// XML version carried by the declaration.
    pub fn version(self) -> Option<&'static str> {
        match self {
            Self::Finf | Self::FinfStandaloneNo | Self::FinfStandaloneYes => None,
            Self::V10 | Self::V10StandaloneNo | Self::V10StandaloneYes => Some("1.0"),
            Self::V11 | Self::V11StandaloneNo | Self::V11StandaloneYes => Some("1.1"),
        }
    }

    /// Standalone flag carried by the declaration.
    pub fn standalone(self) -> Option<bool> {
        match self {
            Self::FinfStandaloneNo | Self::V10StandaloneNo | Self::V11StandaloneNo => Some(false),
            Self::FinfStandaloneYes | Self::V10StandaloneYes | Self::V11StandaloneYes => {
                Some(true)
            }
            _ => None,
        }
    }
}

/// The parts of the initial vocabulary this codec reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialVocabulary {
    /// URI of an external vocabulary the document builds on.
    pub external_vocabulary: Option<String>,
    /// User restricted alphabets, table indices from 16.
    pub alphabets: Vec<String>,
    /// User encoding algorithm URIs, table indices from 32.
    pub algorithms: Vec<String>,
}

impl InitialVocabulary {
    pub fn is_empty(&self) -> bool {
        self.external_vocabulary.is_none() && self.alphabets.is_empty() && self.algorithms.is_empty()
    }
}

/// Everything in front of the version component and the document children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prolog {
    pub declaration: Option<Declaration>,
    pub initial_vocabulary: InitialVocabulary,
    pub standalone: Option<bool>,
    /// A version string follows the prolog.
    pub has_version: bool,
}

impl Prolog {
    /// Prolog for a document written with `declaration`.
    pub fn new(declaration: Option<Declaration>, initial_vocabulary: InitialVocabulary) -> Self {
        Self {
            declaration,
            initial_vocabulary,
            standalone: declaration.and_then(Declaration::standalone),
            has_version: declaration.and_then(Declaration::version).is_some(),
        }
    }
}

/// Writes declaration, identification, presence octet, initial vocabulary
/// and standalone flag.
pub fn write_prolog(w: &mut BitWriter, prolog: &Prolog) -> Result<()> {
    if let Some(decl) = prolog.declaration {
        w.write_bytes(decl.as_str().as_bytes());
    }
    w.write_bytes(&MAGIC);

    let vocab = &prolog.initial_vocabulary;
    let mut presence = 0u8;
    if !vocab.is_empty() {
        presence |= INITIAL_VOCABULARY;
    }
    if prolog.standalone.is_some() {
        presence |= STANDALONE;
    }
    if prolog.has_version {
        presence |= VERSION;
    }
    w.write_byte(presence);

    if !vocab.is_empty() {
        write_initial_vocabulary(w, vocab)?;
    }
    if let Some(standalone) = prolog.standalone {
        w.write_byte(u8::from(standalone));
    }
    Ok(())
}

fn write_initial_vocabulary(w: &mut BitWriter, vocab: &InitialVocabulary) -> Result<()> {
    let mut first = 0u8;
    if vocab.external_vocabulary.is_some() {
        first |= EXTERNAL_VOCABULARY;
    }
    if !vocab.alphabets.is_empty() {
        first |= RESTRICTED_ALPHABETS;
    }
    if !vocab.algorithms.is_empty() {
        first |= ENCODING_ALGORITHMS;
    }
    w.write_byte(first);
    w.write_byte(0);

    if let Some(uri) = &vocab.external_vocabulary {
        w.write_bit(false);
        packed::write_octets_bit2(w, uri.as_bytes())?;
    }
    for list in [&vocab.alphabets, &vocab.algorithms] {
        if list.is_empty() {
            continue;
        }
        packed::write_sequence_length(w, list.len())?;
        for item in list {
            w.write_bit(false);
            packed::write_octets_bit2(w, item.as_bytes())?;
        }
    }
    Ok(())
}

/// Reads everything [`write_prolog`] writes.
///
/// Additional data and the character encoding scheme are skipped; notations,
/// unparsed entities and prefilled string tables are rejected.
pub fn read_prolog<R: Read>(r: &mut BitReader<R>) -> Result<Prolog> {
    let declaration = read_declaration(r)?;
    let magic = [r.read_byte()?, r.read_byte()?, r.read_byte()?, r.read_byte()?];
    if magic != MAGIC {
        return Err(Error::malformed(format!("bad identification {magic:02X?}")));
    }

    let presence = r.read_byte()?;
    if presence & 0x80 != 0 {
        return Err(Error::malformed("document presence octet starts with 1"));
    }
    if presence & (NOTATIONS | UNPARSED_ENTITIES) != 0 {
        return Err(Error::malformed("notations and unparsed entities are not supported"));
    }
    if presence & ADDITIONAL_DATA != 0 {
        let count = packed::read_sequence_length(r)?;
        for _ in 0..count {
            r.read_bit()?;
            let id = packed::read_octets_bit2(r)?;
            r.read_bit()?;
            let data = packed::read_octets_bit2(r)?;
            log::debug!(
                "skipping additional data {} ({} bytes)",
                String::from_utf8_lossy(&id),
                data.len()
            );
        }
    }
    let initial_vocabulary = if presence & INITIAL_VOCABULARY != 0 {
        read_initial_vocabulary(r)?
    } else {
        InitialVocabulary::default()
    };
    if presence & CHARACTER_ENCODING_SCHEME != 0 {
        r.read_bit()?;
        let scheme = packed::read_octets_bit2(r)?;
        log::debug!("character encoding scheme {}", String::from_utf8_lossy(&scheme));
    }
    let standalone = if presence & STANDALONE != 0 {
        match r.read_byte()? {
            0 => Some(false),
            1 => Some(true),
            b => return Err(Error::malformed(format!("standalone octet {b:#04X}"))),
        }
    } else {
        None
    };
    Ok(Prolog { declaration, initial_vocabulary, standalone, has_version: presence & VERSION != 0 })
}

fn read_declaration<R: Read>(r: &mut BitReader<R>) -> Result<Option<Declaration>> {
    if r.peek_byte()? != b'<' {
        return Ok(None);
    }
    let mut text = Vec::with_capacity(MAX_DECLARATION_LEN);
    while !text.ends_with(b"?>") {
        if text.len() == MAX_DECLARATION_LEN {
            return Err(Error::malformed("unterminated XML declaration"));
        }
        text.push(r.read_byte()?);
    }
    let decl = Declaration::parse(&text).ok_or_else(|| {
        Error::malformed(format!("unknown declaration {}", String::from_utf8_lossy(&text)))
    })?;
    log::debug!("declaration {}", decl.as_str());
    Ok(Some(decl))
}

fn read_initial_vocabulary<R: Read>(r: &mut BitReader<R>) -> Result<InitialVocabulary> {
    let first = r.read_byte()?;
    let second = r.read_byte()?;
    if first & 0xE0 != 0 {
        return Err(Error::malformed("initial vocabulary padding bits set"));
    }
    if first & OTHER_TABLES_FIRST != 0 || second != 0 {
        return Err(Error::malformed("prefilled initial vocabulary tables are not supported"));
    }
    let mut vocab = InitialVocabulary::default();
    if first & EXTERNAL_VOCABULARY != 0 {
        r.read_bit()?;
        vocab.external_vocabulary = Some(packed::decode_utf8(packed::read_octets_bit2(r)?)?);
    }
    for (flag, list) in [
        (RESTRICTED_ALPHABETS, &mut vocab.alphabets),
        (ENCODING_ALGORITHMS, &mut vocab.algorithms),
    ] {
        if first & flag == 0 {
            continue;
        }
        let count = packed::read_sequence_length(r)?;
        for _ in 0..count {
            r.read_bit()?;
            list.push(packed::decode_utf8(packed::read_octets_bit2(r)?)?);
        }
    }
    Ok(vocab)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(prolog: &Prolog) -> Prolog {
        let mut w = BitWriter::new();
        write_prolog(&mut w, prolog).unwrap();
        let bytes = w.into_vec();
        let mut r = BitReader::new(bytes.as_slice());
        read_prolog(&mut r).unwrap()
    }

    #[test]
    fn minimal_header_bytes() {
        let mut w = BitWriter::new();
        write_prolog(&mut w, &Prolog::default()).unwrap();
        assert_eq!(w.into_vec(), vec![0xE0, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn all_declarations_parse() {
        for decl in Declaration::ALL {
            let prolog = Prolog::new(Some(decl), InitialVocabulary::default());
            let back = round_trip(&prolog);
            assert_eq!(back, prolog, "{}", decl.as_str());
        }
    }

    #[test]
    fn declaration_sets_flags() {
        let mut w = BitWriter::new();
        write_prolog(&mut w, &Prolog::new(Some(Declaration::V10StandaloneYes), InitialVocabulary::default()))
            .unwrap();
        let bytes = w.into_vec();
        let decl_len = Declaration::V10StandaloneYes.as_str().len();
        assert_eq!(&bytes[decl_len..decl_len + 4], &MAGIC);
        assert_eq!(bytes[decl_len + 4], STANDALONE | VERSION);
        assert_eq!(bytes[decl_len + 5], 0x01);
    }

    #[test]
    fn initial_vocabulary_round_trip() {
        let prolog = Prolog::new(
            None,
            InitialVocabulary {
                external_vocabulary: Some("urn:vocab".into()),
                alphabets: vec!["ab".into(), "0123456789abcdef".into()],
                algorithms: vec!["urn:alg:one".into()],
            },
        );
        assert_eq!(round_trip(&prolog), prolog);
    }

    #[test]
    fn bad_magic() {
        let mut r = BitReader::new(&[0xE0, 0x00, 0x00, 0x02, 0x00][..]);
        assert!(matches!(read_prolog(&mut r), Err(Error::MalformedStream(_))));
    }

    #[test]
    fn unknown_declaration() {
        let bytes = b"<?xml version='2.0'?>\xE0\x00\x00\x01\x00";
        let mut r = BitReader::new(&bytes[..]);
        assert!(read_prolog(&mut r).is_err());
    }

    #[test]
    fn truncated_header() {
        let mut r = BitReader::new(&[0xE0, 0x00][..]);
        assert_eq!(read_prolog(&mut r), Err(Error::UnexpectedEndOfInput));
    }

    #[test]
    fn prefilled_tables_rejected() {
        // initial vocabulary mit gesetztem Prefix-Bit
        let bytes = [0xE0, 0x00, 0x00, 0x01, INITIAL_VOCABULARY, 0x02, 0x00];
        let mut r = BitReader::new(&bytes[..]);
        assert!(matches!(read_prolog(&mut r), Err(Error::MalformedStream(_))));
    }
}

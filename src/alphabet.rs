//! Restricted Alphabets (X.891 8.2, C.19.3, C.20.3).
//!
//! Ein Restricted Alphabet ist eine geordnete Zeichenfolge mit `k` Zeichen.
//! Jedes Zeichen wird als `b`-Bit Index codiert, wobei `b` die kleinste
//! Bitbreite >= 2 mit `2^b > k` ist (siehe [`crate::bit_width::for_alphabet`]).
//!
//! Encodieren ist nur fuer `b == 8` (ein Zeichen pro Octet) und `b == 4`
//! (zwei Zeichen pro Octet, Terminator `0xF` im letzten Nibble) implementiert.
//! Decodieren beherrscht zusaetzlich jede andere Bitbreite.

use std::rc::Rc;

use crate::bit_width;
use crate::{Error, FastHashMap, FastIndexMap, Result};

/// Maximale Alphabetgroesse (X.891 8.2.2).
pub const MAX_ALPHABET_SIZE: usize = 1 << 20;

/// Built-in alphabet 1: numeric characters (X.891 8.2.3).
pub const NUMERIC: &str = "0123456789-+.E ";

/// Built-in alphabet 2: date and time characters (X.891 8.2.4).
pub const DATE_TIME: &str = "0123456789-:TZ ";

/// Erster Tabellenindex fuer benutzerdefinierte Alphabete.
pub const FIRST_USER_INDEX: usize = 16;

/// An ordered character set with its per-character bit width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedAlphabet {
    /// Reihenfolge bestimmt den Index.
    chars: Vec<char>,
    /// Zeichen -> erster Index.
    lookup: FastHashMap<char, u32>,
    bits: u8,
}

impl RestrictedAlphabet {
    /// Builds an alphabet from its characters in index order.
    ///
    /// # Errors
    ///
    /// [`Error::AlphabetSize`] unless the alphabet has 2..=2^20 characters.
    pub fn new(alphabet: &str) -> Result<Self> {
        let chars: Vec<char> = alphabet.chars().collect();
        if chars.len() < 2 || chars.len() > MAX_ALPHABET_SIZE {
            return Err(Error::AlphabetSize(chars.len()));
        }
        Ok(Self::from_chars(chars))
    }

    /// Baut ein Alphabet ohne Groessenpruefung (nur fuer die Built-ins).
    fn from_chars(chars: Vec<char>) -> Self {
        let mut lookup = FastHashMap::with_capacity_and_hasher(chars.len(), Default::default());
        for (i, &ch) in chars.iter().enumerate() {
            lookup.entry(ch).or_insert(i as u32);
        }
        let bits = bit_width::for_alphabet(chars.len());
        Self { chars, lookup, bits }
    }

    /// Anzahl der Zeichen.
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always `false`; alphabets hold at least two characters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Bits per character.
    #[inline]
    pub fn bit_width(&self) -> u8 {
        self.bits
    }

    /// The alphabet as a string, in index order.
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }

    fn index_of(&self, ch: char) -> Result<u32> {
        self.lookup.get(&ch).copied().ok_or(Error::CharacterNotInAlphabet(ch))
    }

    fn char_at(&self, index: u32) -> Result<char> {
        self.chars.get(index as usize).copied().ok_or_else(|| {
            Error::malformed(format!("restricted alphabet index {index} out of range"))
        })
    }

    /// Packs `value` into octets.
    ///
    /// An empty string produces no bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::CharacterNotInAlphabet`] for a foreign character
    /// - [`Error::UnsupportedAlphabetWidth`] unless the width is 4 or 8
    pub fn encode(&self, value: &str) -> Result<Vec<u8>> {
        if value.is_empty() {
            return Ok(Vec::new());
        }
        match self.bits {
            8 => value
                .chars()
                .map(|ch| self.index_of(ch).map(|i| i as u8))
                .collect(),
            4 => {
                let mut out = Vec::with_capacity(value.len().div_ceil(2));
                let mut chars = value.chars();
                while let Some(high) = chars.next() {
                    let high = self.index_of(high)? as u8;
                    let low = match chars.next() {
                        Some(ch) => self.index_of(ch)? as u8,
                        None => bit_width::terminator(4) as u8,
                    };
                    out.push((high << 4) | low);
                }
                Ok(out)
            }
            other => Err(Error::UnsupportedAlphabetWidth(other)),
        }
    }

    /// Unpacks octets produced by an alphabet of this size.
    ///
    /// Stops at the terminator value `2^b - 1` or after `floor(8 * len / b)`
    /// characters, whichever comes first.
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        let mut out = String::with_capacity(data.len() * 2);
        match self.bits {
            8 => {
                for &b in data {
                    out.push(self.char_at(u32::from(b))?);
                }
            }
            4 => {
                for &b in data {
                    out.push(self.char_at(u32::from(b >> 4))?);
                    // xxxx1111: Terminator im unteren Nibble
                    if b & 0xF == 0xF {
                        break;
                    }
                    out.push(self.char_at(u32::from(b & 0xF))?);
                }
            }
            bits => {
                let terminator = bit_width::terminator(bits);
                let count = data.len() * 8 / bits as usize;
                let mut window: u64 = 0;
                let mut window_bits: u8 = 0;
                let mut bytes = data.iter();
                for _ in 0..count {
                    while window_bits < bits {
                        // count garantiert genug Bytes
                        let Some(&b) = bytes.next() else { break };
                        window = (window << 8) | u64::from(b);
                        window_bits += 8;
                    }
                    window_bits -= bits;
                    let index = ((window >> window_bits) as u32) & terminator;
                    window &= (1u64 << window_bits) - 1;
                    if index == terminator {
                        break;
                    }
                    out.push(self.char_at(index)?);
                }
            }
        }
        Ok(out)
    }
}

/// Registry of restricted alphabets by table index.
///
/// Die Built-in Alphabete 1 und 2 sind immer vorhanden. Benutzerdefinierte
/// Alphabete erhalten die Indizes ab 16 in Einfuegereihenfolge.
#[derive(Debug, Clone)]
pub struct AlphabetRegistry {
    builtin: [Rc<RestrictedAlphabet>; 2],
    user: FastIndexMap<String, Rc<RestrictedAlphabet>>,
}

impl AlphabetRegistry {
    /// Registry holding only the built-in alphabets.
    pub fn new() -> Self {
        Self {
            builtin: [
                Rc::new(RestrictedAlphabet::from_chars(NUMERIC.chars().collect())),
                Rc::new(RestrictedAlphabet::from_chars(DATE_TIME.chars().collect())),
            ],
            user: FastIndexMap::default(),
        }
    }

    /// Registers a user alphabet and returns its table index.
    ///
    /// Registering the same character string twice returns the first index.
    pub fn register(&mut self, alphabet: &str) -> Result<usize> {
        if let Some(pos) = self.user.get_index_of(alphabet) {
            return Ok(FIRST_USER_INDEX + pos);
        }
        let parsed = RestrictedAlphabet::new(alphabet)?;
        let (pos, _) = self.user.insert_full(alphabet.to_string(), Rc::new(parsed));
        if FIRST_USER_INDEX + pos > 256 {
            self.user.pop();
            return Err(Error::invalid_value("restricted alphabet table is full"));
        }
        Ok(FIRST_USER_INDEX + pos)
    }

    /// Resolves a 1-based table index.
    pub fn get(&self, index: usize) -> Result<Rc<RestrictedAlphabet>> {
        let found = match index {
            1 | 2 => Some(&self.builtin[index - 1]),
            i if i >= FIRST_USER_INDEX => self.user.get_index(i - FIRST_USER_INDEX).map(|(_, a)| a),
            _ => None,
        };
        found.cloned().ok_or(Error::UnknownEncoding { kind: "alphabet", index })
    }

    /// Table index of a registered user alphabet.
    pub fn index_of(&self, alphabet: &str) -> Option<usize> {
        self.user.get_index_of(alphabet).map(|pos| FIRST_USER_INDEX + pos)
    }

    /// User alphabets in table order.
    pub fn user_alphabets(&self) -> impl Iterator<Item = &str> {
        self.user.keys().map(String::as_str)
    }

    /// Number of user alphabets.
    pub fn user_count(&self) -> usize {
        self.user.len()
    }
}

impl Default for AlphabetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet(k: usize) -> String {
        // Zeichen ab 'A' (k <= 255 bleibt im BMP)
        (0..k as u32).filter_map(|i| char::from_u32(0x41 + i)).collect()
    }

    #[test]
    fn size_limits() {
        assert_eq!(RestrictedAlphabet::new("a"), Err(Error::AlphabetSize(1)));
        assert_eq!(RestrictedAlphabet::new(""), Err(Error::AlphabetSize(0)));
        assert!(RestrictedAlphabet::new("ab").is_ok());
    }

    #[test]
    fn numeric_is_four_bits() {
        let a = RestrictedAlphabet::new(NUMERIC).unwrap();
        assert_eq!(a.len(), 15);
        assert_eq!(a.bit_width(), 4);
    }

    /// Ungerade Laenge: letztes Octet endet mit Nibble 0xF.
    #[test]
    fn four_bit_odd_length_terminator() {
        let a = RestrictedAlphabet::new(NUMERIC).unwrap();
        let bytes = a.encode("123").unwrap();
        assert_eq!(bytes, vec![0x12, 0x3F]);
        assert_eq!(a.decode(&bytes).unwrap(), "123");
    }

    #[test]
    fn four_bit_even_length() {
        let a = RestrictedAlphabet::new(NUMERIC).unwrap();
        let bytes = a.encode("-1.5E3").unwrap();
        assert_eq!(bytes.len(), 3);
        assert_eq!(a.decode(&bytes).unwrap(), "-1.5E3");
    }

    /// Decode stoppt am Terminator, auch wenn weitere Octets folgen.
    #[test]
    fn four_bit_decode_stops_mid_data() {
        let a = RestrictedAlphabet::new(NUMERIC).unwrap();
        assert_eq!(a.decode(&[0x12, 0x3F, 0x45]).unwrap(), "123");
    }

    #[test]
    fn round_trip_four_and_eight_bit_regimes() {
        for k in [8usize, 9, 15, 128, 200, 255] {
            let chars = alphabet(k);
            let a = RestrictedAlphabet::new(&chars).unwrap();
            assert!(matches!(a.bit_width(), 4 | 8), "k={k}");
            let sample: String = chars.chars().rev().chain(chars.chars().take(3)).collect();
            let bytes = a.encode(&sample).unwrap();
            assert_eq!(a.decode(&bytes).unwrap(), sample, "k={k}");
        }
    }

    #[test]
    fn other_widths_refuse_to_encode() {
        for k in [2usize, 3, 4, 7, 16, 100, 127, 256] {
            let chars = alphabet(k);
            let a = RestrictedAlphabet::new(&chars).unwrap();
            let first: String = chars.chars().take(1).collect();
            assert_eq!(
                a.encode(&first),
                Err(Error::UnsupportedAlphabetWidth(a.bit_width())),
                "k={k}"
            );
        }
    }

    #[test]
    fn empty_input_encodes_to_nothing() {
        let a = RestrictedAlphabet::new("ab").unwrap();
        assert_eq!(a.encode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn foreign_character_rejected() {
        let a = RestrictedAlphabet::new(NUMERIC).unwrap();
        assert_eq!(a.encode("12x"), Err(Error::CharacterNotInAlphabet('x')));
    }

    /// 2-Bit Alphabet "abc": Terminator 0b11 beendet die Folge.
    #[test]
    fn general_decode_two_bits() {
        let a = RestrictedAlphabet::new("abc").unwrap();
        assert_eq!(a.bit_width(), 2);
        // a=00 b=01 c=10 | 11 -> "abc"
        assert_eq!(a.decode(&[0b0001_1011]).unwrap(), "abc");
        // Ohne Terminator: 4 Zeichen pro Octet
        assert_eq!(a.decode(&[0b1010_0100]).unwrap(), "ccba");
    }

    /// 3-Bit Alphabet: Zeichen ueberspannen Octet-Grenzen.
    #[test]
    fn general_decode_sliding_window() {
        let a = RestrictedAlphabet::new("abcdefg").unwrap();
        assert_eq!(a.bit_width(), 3);
        // g=110 a=000 d=011 b=001 f=101 c=010 e=100 + Terminator 111
        // 110000 01|1001101 0|10100111
        let data = [0b1100_0001, 0b1001_1010, 0b1010_0111];
        assert_eq!(a.decode(&data).unwrap(), "gadbfce");
        // floor(24 / 3) = 8 Zeichen maximal
        let full = [0u8, 0, 0];
        assert_eq!(a.decode(&full).unwrap(), "aaaaaaaa");
    }

    #[test]
    fn general_decode_nine_bits() {
        let chars = alphabet(300);
        let a = RestrictedAlphabet::new(&chars).unwrap();
        assert_eq!(a.bit_width(), 9);
        // Index 0x101 = 257, dann Terminator 0x1FF
        let data = [0b1000_0000, 0b1111_1111, 0b1100_0000];
        let expected: String = chars.chars().nth(257).into_iter().collect();
        assert_eq!(a.decode(&data).unwrap(), expected);
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        let a = RestrictedAlphabet::new("abcdefghij").unwrap();
        // Nibble 0xC ist kein gueltiger Index bei k=10
        assert!(matches!(a.decode(&[0xC1]), Err(Error::MalformedStream(_))));
    }

    #[test]
    fn registry_builtins_and_user_slots() {
        let mut reg = AlphabetRegistry::new();
        assert_eq!(reg.get(1).unwrap().as_string(), NUMERIC);
        assert_eq!(reg.get(2).unwrap().as_string(), DATE_TIME);
        assert!(reg.get(3).is_err());

        let idx = reg.register("0123456789abcdef").unwrap();
        assert_eq!(idx, 16);
        assert_eq!(reg.register("0123456789abcdef").unwrap(), 16);
        assert_eq!(reg.register("xy").unwrap(), 17);
        assert_eq!(reg.index_of("xy"), Some(17));
        assert_eq!(reg.user_count(), 2);
        assert_eq!(
            reg.get(18),
            Err(Error::UnknownEncoding { kind: "alphabet", index: 18 })
        );
    }
}

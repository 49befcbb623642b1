//! Bitbreite fuer Restricted Alphabets (X.891 8.2, C.20.3).
//!
//! Ein Alphabet mit `k` Zeichen braucht `b` Bits pro Zeichen, so dass
//! `2^b > k` gilt. Der Wert `2^b - 1` bleibt damit frei und dient als
//! Terminator. Die Suche startet bei `b = 2`.

/// Kleinste Bitbreite `b >= 2` mit `2^b > k`.
///
/// - `k = 2..=3`: 2 Bits
/// - `k = 4..=7`: 3 Bits
/// - `k = 8..=15`: 4 Bits
/// - `k = 128..=255`: 8 Bits
/// - `k = 2^20`: 21 Bits
#[inline]
pub fn for_alphabet(k: usize) -> u8 {
    let mut bits: u8 = 2;
    while (1usize << bits) <= k {
        bits += 1;
    }
    bits
}

/// Terminator-Wert fuer eine Bitbreite: alle Bits gesetzt.
#[inline]
pub fn terminator(bits: u8) -> u32 {
    (1u32 << bits) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grundwerte() {
        assert_eq!(for_alphabet(2), 2);
        assert_eq!(for_alphabet(3), 2);
        assert_eq!(for_alphabet(4), 3);
        assert_eq!(for_alphabet(7), 3);
        assert_eq!(for_alphabet(8), 4);
        assert_eq!(for_alphabet(15), 4);
        assert_eq!(for_alphabet(16), 5);
        assert_eq!(for_alphabet(127), 7);
        assert_eq!(for_alphabet(128), 8);
        assert_eq!(for_alphabet(255), 8);
        assert_eq!(for_alphabet(256), 9);
        assert_eq!(for_alphabet(1 << 20), 21);
    }

    /// Der Terminator liegt immer ausserhalb der gueltigen Indizes.
    #[test]
    fn terminator_ausserhalb_des_alphabets() {
        for k in 2..=1000usize {
            let bits = for_alphabet(k);
            assert!(terminator(bits) as usize >= k, "k={k}");
        }
        assert_eq!(terminator(4), 0xF);
        assert_eq!(terminator(8), 0xFF);
    }
}

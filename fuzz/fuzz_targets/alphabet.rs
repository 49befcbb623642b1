#![no_main]
use erfi::alphabet::RestrictedAlphabet;
use libfuzzer_sys::fuzz_target;

// Erste Zeile = Alphabet, Rest = Wert.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Some((chars, value)) = text.split_once('\n') else {
        return;
    };
    let Ok(alphabet) = RestrictedAlphabet::new(chars) else {
        return;
    };
    if let Ok(encoded) = alphabet.encode(value) {
        let decoded = alphabet.decode(&encoded).expect("encoded value must decode");
        assert_eq!(decoded, value);
    }
    let _ = alphabet.decode(value.as_bytes());
});

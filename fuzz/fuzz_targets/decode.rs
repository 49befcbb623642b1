#![no_main]
use libfuzzer_sys::fuzz_target;

// Beliebige Bytes: der Decoder darf Fehler liefern, aber nie paniken.
fuzz_target!(|data: &[u8]| {
    let _ = erfi::decode(data, erfi::DecoderConfig::default());
});

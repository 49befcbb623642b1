#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        if let Ok(bytes) = erfi::encode_xml(xml, erfi::EncoderConfig::default()) {
            // Eigene Ausgabe muss vollstaendig lesbar sein.
            erfi::decode(&bytes, erfi::DecoderConfig::default())
                .expect("encoder output must decode");
            let _ = erfi::decode_to_xml(&bytes, erfi::DecoderConfig::default());
        }
    }
});

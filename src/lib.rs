//! erfi – Fast Infoset (ITU-T X.891) Rust library
//!
//! Binaeres XML: Namen und Werte werden beim ersten Auftreten literal
//! geschrieben und danach ueber Tabellenindizes referenziert.
//!
//! # Beispiel
//!
//! ```
//! use erfi::{DecoderConfig, EncoderConfig, NodeKind, Writer};
//! use erfi::decoder::decode;
//!
//! // Encode
//! let mut writer = Writer::new(Vec::new(), EncoderConfig::default()).unwrap();
//! writer.start_element(None, None, "greeting").unwrap();
//! writer.write_content("Hello").unwrap();
//! writer.end_element().unwrap();
//! let bytes = writer.into_inner().unwrap();
//!
//! // Decode
//! let nodes = decode(&bytes, DecoderConfig::default()).unwrap();
//! assert_eq!(nodes.len(), 5);
//! assert_eq!(nodes[2].kind, NodeKind::Text);
//! assert_eq!(nodes[2].value, "Hello");
//! ```

pub mod algorithm;
pub mod alphabet;
pub mod binary;
pub mod bit_width;
pub mod bitstream;
pub mod boolean;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod float;
pub mod header;
pub mod integer;
pub mod namespace;
pub(crate) mod packed;
pub mod qname;
pub mod stream_buffer;
pub mod string_table;
pub mod vocabulary;
pub mod writer;
pub mod xml;
pub mod xml_serializer;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent; fuer interne Tabellen).
/// Nutzt hashbrown direkt, ohne den SipHash von std.
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (Einfuegereihenfolge = Tabellenindex).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Encoder/Writer
pub use encoder::{CharacterEncoding, Encoder, EncoderConfig};
pub use writer::Writer;

// Public API: Decoder
pub use decoder::{Attribute, DecodedNode, Decoder, DecoderConfig, NodeKind, decode};

// Public API: Types
pub use algorithm::{BuiltinAlgorithm, EncodedValue, Encoding, EncodingAlgorithm};
pub use header::Declaration;
pub use qname::QName;
pub use vocabulary::Vocabulary;

// Public API: XML
pub use xml::{encode_xml, encode_xml_to};
pub use xml_serializer::{decode_to_writer, decode_to_xml};

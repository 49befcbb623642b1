//! End-to-End Round-Trips: XML → Fast Infoset → Knoten bzw. XML.
//!
//! Prueft neben dem Inhalt auch die Indizes, die das Vokabular vergibt;
//! sie muessen bei jedem Lauf mit frischem Vokabular identisch sein.

use std::rc::Rc;

use erfi::string_table::Table;
use erfi::{
    CharacterEncoding, Declaration, DecodedNode, Decoder, DecoderConfig, EncoderConfig, Error,
    NodeKind, QName, Vocabulary, decode, decode_to_xml, encode_xml,
};

// ============================================================================
// Hilfsfunktionen
// ============================================================================

const PREFIXED: &str = r#"<a xmlns:p="urn:x" p:id="7">hello</a>"#;

fn kinds(nodes: &[DecodedNode]) -> Vec<NodeKind> {
    nodes.iter().map(|n| n.kind).collect()
}

/// Decodiert alle Knoten und gibt das Vokabular am Dokumentende zurueck.
fn decode_with_vocabulary(bytes: &[u8]) -> (Vec<DecodedNode>, Vocabulary) {
    let mut decoder = Decoder::new(bytes, DecoderConfig::default());
    let mut nodes = Vec::new();
    while let Some(node) = decoder.read_node().unwrap() {
        nodes.push(node.clone());
    }
    (nodes, decoder.vocabulary().clone())
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn prefixed_attribute_document() {
    let bytes = encode_xml(PREFIXED, EncoderConfig::default()).unwrap();
    let (nodes, _) = decode_with_vocabulary(&bytes);

    assert_eq!(
        kinds(&nodes),
        [
            NodeKind::DocumentStart,
            NodeKind::ElementStart,
            NodeKind::Text,
            NodeKind::ElementEnd,
            NodeKind::DocumentEnd,
        ]
    );
    let root = &nodes[1];
    let name = root.qname.as_ref().unwrap();
    assert_eq!(&*name.local_name, "a");
    assert_eq!(name.prefix_str(), "");
    assert_eq!(name.namespace_str(), "");
    assert_eq!(root.attribute(Some("urn:x"), "id"), Some("7"));

    let declaration = root.attributes.iter().find(|a| a.is_namespace_declaration()).unwrap();
    assert_eq!(declaration.qname.prefix_str(), "xmlns");
    assert_eq!(&*declaration.qname.local_name, "p");
    assert_eq!(declaration.value, "urn:x");

    let id = root.attributes.iter().find(|a| !a.is_namespace_declaration()).unwrap();
    assert_eq!(id.qname, QName::with_prefix(Some("p"), Some("urn:x"), "id"));
    assert_eq!(nodes[2].value, "hello");

    assert_eq!(decode_to_xml(&bytes, DecoderConfig::default()).unwrap(), PREFIXED);
}

#[test]
fn vocabulary_indices_are_deterministic() {
    let first = encode_xml(PREFIXED, EncoderConfig::default()).unwrap();
    let second = encode_xml(PREFIXED, EncoderConfig::default()).unwrap();
    assert_eq!(first, second);

    let (_, vocabulary) = decode_with_vocabulary(&first);
    let local_names = vocabulary.strings(Table::LocalNames);
    assert_eq!(local_names.index_of("a"), Some(1));
    assert_eq!(local_names.index_of("id"), Some(2));
    // xml belegt jeweils Index 1
    assert_eq!(vocabulary.strings(Table::Prefixes).index_of("p"), Some(2));
    assert_eq!(vocabulary.strings(Table::NamespaceNames).index_of("urn:x"), Some(2));
    assert_eq!(vocabulary.element_names().index_of(&QName::local("a")), Some(1));
    assert_eq!(
        vocabulary.attribute_names().index_of(&QName::with_prefix(Some("p"), Some("urn:x"), "id")),
        Some(1)
    );
    assert_eq!(vocabulary.strings(Table::AttributeValues).index_of("7"), Some(1));
    assert_eq!(vocabulary.strings(Table::ContentChunks).index_of("hello"), Some(1));
}

#[test]
fn repeated_names_and_values_use_indices() {
    let once = encode_xml("<r><item k=\"v\">text</item></r>", EncoderConfig::default()).unwrap();
    let twice = encode_xml(
        "<r><item k=\"v\">text</item><item k=\"v\">text</item></r>",
        EncoderConfig::default(),
    )
    .unwrap();
    // zweites item: Name, Attribut, Wert und Chunk jeweils als ein Index-Octet
    assert!(twice.len() - once.len() <= 8, "grew by {}", twice.len() - once.len());

    let nodes = decode(&twice, DecoderConfig::default()).unwrap();
    let items: Vec<_> = nodes
        .iter()
        .filter(|n| n.kind == NodeKind::ElementStart && n.depth == 1)
        .collect();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|n| n.attribute(None, "k") == Some("v")));
}

#[test]
fn long_values_stay_literal() {
    let long = "x".repeat(100);
    let xml = format!("<r><a>{long}</a><a>{long}</a></r>");
    let config = EncoderConfig::default().with_value_length_limit(10);
    let bytes = encode_xml(&xml, config).unwrap();
    let (nodes, vocabulary) = decode_with_vocabulary(&bytes);

    assert!(vocabulary.strings(Table::ContentChunks).is_empty());
    let texts: Vec<_> = nodes.iter().filter(|n| n.kind == NodeKind::Text).collect();
    assert_eq!(texts.len(), 2);
    assert!(texts.iter().all(|n| n.value == long));
    assert_eq!(decode_to_xml(&bytes, DecoderConfig::default()).unwrap(), xml);
}

#[test]
fn utf16_literals_with_declaration() {
    let xml = "<doc lang=\"de\">Gr\u{fc}\u{df}e \u{1F600}<!--kommentar--></doc>";
    let config = EncoderConfig::default()
        .with_declaration(Declaration::V11StandaloneYes)
        .with_character_encoding(CharacterEncoding::Utf16);
    let bytes = encode_xml(xml, config).unwrap();
    assert!(bytes.starts_with(Declaration::V11StandaloneYes.as_str().as_bytes()));

    let mut decoder = Decoder::new(bytes.as_slice(), DecoderConfig::default());
    while decoder.read_node().unwrap().is_some() {}
    assert_eq!(decoder.declaration(), Some(Declaration::V11StandaloneYes));
    assert_eq!(decoder.version(), Some("1.1"));
    assert_eq!(decoder.standalone(), Some(true));

    assert_eq!(
        decode_to_xml(&bytes, DecoderConfig::default()).unwrap(),
        format!("<?xml version=\"1.1\" encoding=\"UTF-8\" standalone=\"yes\"?>{xml}")
    );
}

#[test]
fn prologue_items_and_doctype() {
    let xml = concat!(
        "<?xml version=\"1.0\"?>",
        "<!DOCTYPE note PUBLIC \"-//N//EN\" \"note.dtd\">",
        "<?style href=\"a.css\"?>",
        "<note><to>T</to><![CDATA[<raw>]]></note>",
        "<!--tail-->"
    );
    let bytes = encode_xml(xml, EncoderConfig::default()).unwrap();
    let nodes = decode(&bytes, DecoderConfig::default()).unwrap();
    assert_eq!(
        kinds(&nodes),
        [
            NodeKind::DocumentStart,
            NodeKind::DocumentType,
            NodeKind::ProcessingInstruction,
            NodeKind::ElementStart,
            NodeKind::ElementStart,
            NodeKind::Text,
            NodeKind::ElementEnd,
            NodeKind::Text,
            NodeKind::ElementEnd,
            NodeKind::Comment,
            NodeKind::DocumentEnd,
        ]
    );
    assert_eq!(nodes[1].public_id.as_deref(), Some("-//N//EN"));
    assert_eq!(nodes[1].system_id.as_deref(), Some("note.dtd"));
    assert_eq!(nodes[2].qname.as_ref().map(|q| &*q.local_name), Some("style"));
    assert_eq!(nodes[2].value, "href=\"a.css\"");
    assert_eq!(nodes[7].value, "<raw>");

    assert_eq!(
        decode_to_xml(&bytes, DecoderConfig::default()).unwrap(),
        concat!(
            "<!DOCTYPE note PUBLIC \"-//N//EN\" \"note.dtd\">",
            "<?style href=\"a.css\"?>",
            "<note><to>T</to>&lt;raw&gt;</note>",
            "<!--tail-->"
        )
    );
}

#[test]
fn external_vocabulary_shared_between_documents() {
    let mut base = Vocabulary::new();
    base.add_element_name(&QName::local("record"));
    base.add_attribute_name(&QName::local("id"));
    let base = base.into_shared("urn:example:vocab").unwrap();

    let config = EncoderConfig::default().with_vocabulary(Rc::clone(&base));
    let with_base = encode_xml("<record id=\"1\"/>", config).unwrap();
    let without = encode_xml("<record id=\"1\"/>", EncoderConfig::default()).unwrap();
    assert!(!with_base.windows(6).any(|w| w == b"record"));
    assert!(without.windows(6).any(|w| w == b"record"));

    assert!(matches!(
        decode(&with_base, DecoderConfig::default()),
        Err(Error::MalformedStream(_))
    ));

    let config = DecoderConfig::default().with_vocabulary(Rc::clone(&base)).unwrap();
    assert_eq!(decode_to_xml(&with_base, config.clone()).unwrap(), "<record id=\"1\"/>");
    // Das Basisvokabular bleibt unveraendert und ist wiederverwendbar.
    assert_eq!(base.strings(Table::AttributeValues).len(), 0);
    assert_eq!(decode_to_xml(&with_base, config).unwrap(), "<record id=\"1\"/>");
}

#[test]
fn truncated_documents_fail_cleanly() {
    let bytes = encode_xml(PREFIXED, EncoderConfig::default()).unwrap();
    for len in 0..bytes.len() {
        let result = decode(&bytes[..len], DecoderConfig::default());
        assert!(result.is_err(), "prefix of {len} bytes decoded");
    }
}

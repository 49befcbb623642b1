//! Namespace-Scoping ueber Encoder und Decoder hinweg.
//!
//! Deklarationen gelten fuer den Teilbaum ihres Elements; nach dem Schliessen
//! ist wieder die aeussere Bindung sichtbar.

use erfi::{DecodedNode, DecoderConfig, EncoderConfig, Error, NodeKind, Writer, decode, decode_to_xml, encode_xml};

fn element_namespaces(nodes: &[DecodedNode]) -> Vec<(String, String)> {
    nodes
        .iter()
        .filter(|n| n.kind == NodeKind::ElementStart)
        .filter_map(|n| n.qname.as_ref())
        .map(|q| (q.local_name.to_string(), q.namespace_str().to_string()))
        .collect()
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected.iter().map(|(l, n)| (l.to_string(), n.to_string())).collect()
}

#[test]
fn prefix_shadowing_limited_to_subtree() {
    let xml = concat!(
        r#"<p:r xmlns:p="urn:1">"#,
        r#"<p:a><p:b xmlns:p="urn:2"><p:c/></p:b><p:d/></p:a>"#,
        r#"</p:r>"#
    );
    let bytes = encode_xml(xml, EncoderConfig::default()).unwrap();
    let nodes = decode(&bytes, DecoderConfig::default()).unwrap();
    assert_eq!(
        element_namespaces(&nodes),
        pairs(&[("r", "urn:1"), ("a", "urn:1"), ("b", "urn:2"), ("c", "urn:2"), ("d", "urn:1")])
    );
    assert_eq!(decode_to_xml(&bytes, DecoderConfig::default()).unwrap(), xml);
}

#[test]
fn default_namespace_override_and_undeclare() {
    let xml = r#"<a xmlns="urn:1"><b xmlns="urn:2"><x/></b><c xmlns=""><y/></c><d/></a>"#;
    let bytes = encode_xml(xml, EncoderConfig::default()).unwrap();
    let nodes = decode(&bytes, DecoderConfig::default()).unwrap();
    assert_eq!(
        element_namespaces(&nodes),
        pairs(&[("a", "urn:1"), ("b", "urn:2"), ("x", "urn:2"), ("c", ""), ("y", ""), ("d", "urn:1")])
    );
    assert_eq!(decode_to_xml(&bytes, DecoderConfig::default()).unwrap(), xml);
}

#[test]
fn same_local_name_in_two_namespaces() {
    let xml = r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:item/><b:item/><a:item/></r>"#;
    let bytes = encode_xml(xml, EncoderConfig::default()).unwrap();

    let nodes = decode(&bytes, DecoderConfig::default()).unwrap();
    let items: Vec<_> = element_namespaces(&nodes).into_iter().skip(1).collect();
    assert_eq!(items, pairs(&[("item", "urn:a"), ("item", "urn:b"), ("item", "urn:a")]));
    assert_eq!(decode_to_xml(&bytes, DecoderConfig::default()).unwrap(), xml);
}

#[test]
fn writer_declares_implicit_namespaces() {
    let mut w = Writer::new(Vec::new(), EncoderConfig::default()).unwrap();
    w.start_element(Some("p"), Some("urn:x"), "root").unwrap();
    w.start_attribute(None, Some("urn:y"), "flag").unwrap();
    w.write_content("on").unwrap();
    w.end_attribute().unwrap();
    w.start_element(None, None, "child").unwrap();
    assert_eq!(w.lookup_prefix("urn:x").unwrap().as_deref(), Some("p"));
    w.end_element().unwrap();
    w.end_element().unwrap();
    let bytes = w.into_inner().unwrap();

    let nodes = decode(&bytes, DecoderConfig::default()).unwrap();
    let root = &nodes[1];
    let declared: Vec<_> = root
        .attributes
        .iter()
        .filter(|a| a.is_namespace_declaration())
        .map(|a| a.value.as_str())
        .collect();
    assert!(declared.contains(&"urn:x"));
    assert!(declared.contains(&"urn:y"));
    assert_eq!(root.attribute(Some("urn:y"), "flag"), Some("on"));

    // child erbt keinen Default-Namespace
    assert_eq!(element_namespaces(&nodes)[1], ("child".to_string(), String::new()));
}

#[test]
fn unbound_prefix_in_xml_fails() {
    let result = encode_xml("<q:a/>", EncoderConfig::default());
    assert!(matches!(result, Err(Error::UndefinedPrefix(_) | Error::XmlParse(_))));
}

#[test]
fn xml_prefix_is_predeclared() {
    let xml = r#"<a xml:lang="en">text</a>"#;
    let bytes = encode_xml(xml, EncoderConfig::default()).unwrap();
    let nodes = decode(&bytes, DecoderConfig::default()).unwrap();
    assert_eq!(nodes[1].attribute(Some("http://www.w3.org/XML/1998/namespace"), "lang"), Some("en"));
    assert!(nodes[1].attributes.iter().all(|a| !a.is_namespace_declaration()));
    assert_eq!(decode_to_xml(&bytes, DecoderConfig::default()).unwrap(), xml);
}

//! Knoten, die der Decoder an den Aufrufer liefert.

use crate::algorithm::Encoding;
use crate::qname::QName;

/// Kind of a decoded node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeKind {
    /// Nothing read yet.
    #[default]
    None,
    DocumentStart,
    DocumentEnd,
    ElementStart,
    ElementEnd,
    Text,
    Comment,
    ProcessingInstruction,
    DocumentType,
}

/// Attribute on an element start node.
///
/// Namespace declarations appear as `xmlns` or `xmlns:p` attributes whose
/// value is the namespace name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub qname: QName,
    pub value: String,
    /// Set when the value was produced by an algorithm or alphabet.
    pub encoding: Option<Encoding>,
}

impl Attribute {
    pub fn is_namespace_declaration(&self) -> bool {
        self.qname.is_namespace_declaration()
    }
}

/// One node of the decoded document.
///
/// | kind                    | `qname`           | `value`         |
/// |-------------------------|-------------------|-----------------|
/// | `ElementStart`/`End`    | element name      | empty           |
/// | `Text`                  | none              | chunk text      |
/// | `Comment`               | none              | comment text    |
/// | `ProcessingInstruction` | target as local   | data            |
/// | `DocumentType`          | none              | empty           |
///
/// `DocumentType` carries its identifiers in `public_id` and `system_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedNode {
    pub kind: NodeKind,
    /// Anzahl der umschliessenden Elemente; das Wurzelelement hat Tiefe 0.
    pub depth: usize,
    pub qname: Option<QName>,
    pub value: String,
    pub encoding: Option<Encoding>,
    pub attributes: Vec<Attribute>,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl DecodedNode {
    /// Setzt den Knoten zurueck; die Attributliste behaelt ihre Kapazitaet.
    pub(crate) fn reset(&mut self, kind: NodeKind, depth: usize) {
        self.kind = kind;
        self.depth = depth;
        self.qname = None;
        self.value.clear();
        self.encoding = None;
        self.attributes.clear();
        self.public_id = None;
        self.system_id = None;
    }

    /// Value of the attribute with this local name and namespace.
    pub fn attribute(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &*a.qname.local_name == local_name && a.qname.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_attribute_capacity() {
        let mut node = DecodedNode::default();
        node.reset(NodeKind::ElementStart, 2);
        for i in 0..10 {
            node.attributes.push(Attribute {
                qname: QName::local(&format!("a{i}")),
                value: i.to_string(),
                encoding: None,
            });
        }
        let capacity = node.attributes.capacity();
        node.reset(NodeKind::Text, 3);
        assert!(node.attributes.is_empty());
        assert_eq!(node.attributes.capacity(), capacity);
        assert_eq!(node.kind, NodeKind::Text);
        assert_eq!(node.depth, 3);
    }

    #[test]
    fn attribute_lookup_by_namespace() {
        let mut node = DecodedNode::default();
        node.attributes.push(Attribute {
            qname: QName::with_prefix(Some("p"), Some("urn:x"), "id"),
            value: "7".into(),
            encoding: None,
        });
        assert_eq!(node.attribute(Some("urn:x"), "id"), Some("7"));
        assert_eq!(node.attribute(None, "id"), None);
    }
}

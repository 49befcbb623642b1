//! Gepuffertes Start-Tag.
//!
//! Das Binaerformat verlangt das Attribut-Presence-Bit vor dem Namen des
//! Elements, also muessen alle Attribute bekannt sein, bevor das erste
//! Octet geschrieben wird. Es gibt immer hoechstens ein offenes Element.

use std::rc::Rc;

use crate::algorithm::Encoding;
use crate::qname::QName;

/// Value of a buffered attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Caller text, indexed or written literally.
    Text(String),
    /// Octets produced by an encoding algorithm or restricted alphabet.
    Encoded { encoding: Encoding, data: Vec<u8> },
}

/// Namespace attribute (`xmlns` or `xmlns:p`); `None` parts are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceAttribute {
    pub prefix: Option<Rc<str>>,
    pub namespace: Option<Rc<str>>,
}

/// Regular attribute with a resolved name.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAttribute {
    pub qname: QName,
    pub value: AttributeValue,
}

/// Start tag waiting for its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingElement {
    pub qname: QName,
    pub namespace_attributes: Vec<NamespaceAttribute>,
    pub attributes: Vec<PendingAttribute>,
}

impl PendingElement {
    pub fn new(qname: QName) -> Self {
        Self { qname, namespace_attributes: Vec::new(), attributes: Vec::new() }
    }

    /// Adds a namespace attribute unless one for the same prefix exists.
    pub fn declare(&mut self, prefix: Option<Rc<str>>, namespace: Option<Rc<str>>) {
        if self.namespace_attributes.iter().all(|ns| ns.prefix != prefix) {
            self.namespace_attributes.push(NamespaceAttribute { prefix, namespace });
        }
    }

    pub fn has_attribute(&self, qname: &QName) -> bool {
        self.attributes
            .iter()
            .any(|a| a.qname.local_name == qname.local_name && a.qname.namespace == qname.namespace)
    }
}

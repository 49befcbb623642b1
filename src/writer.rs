//! Push-API ueber dem [`Encoder`].
//!
//! Der Writer loest Prefixe und Namespaces ueber [`NamespaceScopes`] auf,
//! sammelt Attribute im offenen Start-Tag und schreibt es erst beim naechsten
//! strukturellen Aufruf. Namespace-Deklarationen koennen als `xmlns`
//! Attribute geschrieben werden oder entstehen implizit, wenn ein Element
//! oder Attribut einen noch nicht gebundenen Namespace benutzt.
//!
//! # Beispiel
//!
//! ```
//! use erfi::writer::Writer;
//! use erfi::EncoderConfig;
//!
//! let mut w = Writer::new(Vec::new(), EncoderConfig::default()).unwrap();
//! w.start_element(None, None, "a").unwrap();
//! w.start_attribute(Some("xmlns"), None, "p").unwrap();
//! w.write_content("urn:x").unwrap();
//! w.end_attribute().unwrap();
//! w.start_attribute(Some("p"), None, "id").unwrap();
//! w.write_content("7").unwrap();
//! w.end_attribute().unwrap();
//! w.write_content("hello").unwrap();
//! w.end_element().unwrap();
//! w.end_document().unwrap();
//! assert_eq!(w.lookup_prefix("urn:x").unwrap(), None);
//! let bytes = w.into_inner().unwrap();
//! assert!(bytes.len() > 5);
//! ```

use std::io::Write;
use std::rc::Rc;

use crate::algorithm::{EncodedValue, Encoding};
use crate::encoder::{AttributeValue, Encoder, EncoderConfig, PendingAttribute, PendingElement};
use crate::namespace::NamespaceScopes;
use crate::qname::{QName, XML_NAMESPACE, XML_PREFIX, XMLNS, XMLNS_NAMESPACE};
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
    /// `xmlns` oder `xmlns:p`
    Namespace,
    Regular,
}

/// Attribut zwischen `start_attribute` und `end_attribute`.
#[derive(Debug)]
struct OpenAttribute {
    qname: QName,
    kind: AttributeKind,
    text: String,
    encoded: Option<(Encoding, Vec<u8>)>,
}

/// Streaming writer producing a Fast Infoset document.
pub struct Writer<W: Write> {
    encoder: Encoder<W>,
    scopes: NamespaceScopes,
    pending: Option<PendingElement>,
    attribute: Option<OpenAttribute>,
    depth: usize,
    ended: bool,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, config: EncoderConfig) -> Result<Self> {
        Ok(Self {
            encoder: Encoder::new(sink, config)?,
            scopes: NamespaceScopes::new(),
            pending: None,
            attribute: None,
            depth: 0,
            ended: false,
        })
    }

    /// Vocabulary as grown by the document so far.
    pub fn vocabulary(&self) -> &Vocabulary {
        self.encoder.vocabulary()
    }

    /// Writes the header. Called implicitly by the first item.
    pub fn start_document(&mut self) -> Result<()> {
        self.encoder.start_document()
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.ended {
            return Err(Error::invalid_state("document already ended"));
        }
        if !self.encoder.is_started() {
            self.encoder.start_document()?;
        }
        Ok(())
    }

    fn ensure_no_attribute(&self, operation: &str) -> Result<()> {
        if self.attribute.is_some() {
            return Err(Error::invalid_state(format!("{operation} inside an open attribute")));
        }
        Ok(())
    }

    /// Schreibt das offene Start-Tag samt Namespace-Attributen.
    fn flush_pending(&mut self) -> Result<()> {
        let Some(mut element) = self.pending.take() else {
            return Ok(());
        };
        let namespace = match &element.qname.prefix {
            Some(prefix) => self.scopes.lookup(prefix),
            None => self.scopes.default_namespace().cloned(),
        };
        element.qname.namespace = namespace;
        if let Some(default) = self.scopes.declared_default() {
            element.declare(None, default.cloned());
        }
        for (prefix, namespace) in self.scopes.current_bindings() {
            element.declare(Some(Rc::clone(prefix)), Some(Rc::clone(namespace)));
        }
        self.encoder.write_element(&element)
    }

    /// Opens an element. The start tag is written once its attributes are known.
    pub fn start_element(
        &mut self,
        prefix: Option<&str>,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Result<()> {
        self.ensure_no_attribute("start_element")?;
        self.ensure_started()?;
        if local_name.is_empty() {
            return Err(Error::invalid_value("element without local name"));
        }
        self.flush_pending()?;
        let qname = self.scopes.push_scope(prefix, namespace, local_name)?;
        self.pending = Some(PendingElement::new(qname));
        self.depth += 1;
        Ok(())
    }

    /// Opens an attribute of the current start tag.
    ///
    /// `xmlns` and `xmlns:p` become namespace declarations. A namespaced
    /// attribute gets a visible prefix, its own prefix or a generated one.
    pub fn start_attribute(
        &mut self,
        prefix: Option<&str>,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Result<()> {
        self.ensure_no_attribute("start_attribute")?;
        if self.pending.is_none() {
            return Err(Error::invalid_state("attribute outside a start tag"));
        }
        if local_name.is_empty() {
            return Err(Error::invalid_value("attribute without local name"));
        }
        let prefix = non_empty(prefix);
        let namespace = non_empty(namespace);

        let is_declaration = prefix == Some(XMLNS) || (prefix.is_none() && local_name == XMLNS);
        if is_declaration {
            if let Some(ns) = namespace.filter(|ns| *ns != XMLNS_NAMESPACE) {
                return Err(Error::invalid_namespace(format!(
                    "namespace declaration in namespace {ns}"
                )));
            }
            self.attribute = Some(OpenAttribute {
                qname: QName::with_prefix(prefix, Some(XMLNS_NAMESPACE), local_name),
                kind: AttributeKind::Namespace,
                text: String::new(),
                encoded: None,
            });
            return Ok(());
        }

        let qname = match (prefix, namespace) {
            (Some(XML_PREFIX), _) | (None, Some(XML_NAMESPACE)) => {
                QName::with_prefix(Some(XML_PREFIX), Some(XML_NAMESPACE), local_name)
            }
            (_, Some(ns)) => {
                let mut requested = prefix;
                if let Some(p) = requested {
                    let visible = self.scopes.lookup(p);
                    if visible.as_deref() == Some(ns) {
                        return self.open_regular(QName::with_prefix(Some(p), Some(ns), local_name));
                    }
                    if self.scopes.lookup_in_current_scope(p).is_some() {
                        requested = None;
                    }
                }
                let chosen: Rc<str> = match requested {
                    Some(p) => {
                        self.scopes.push_namespace(Some(p), ns)?;
                        p.into()
                    }
                    None => match self.scopes.find_prefix(ns) {
                        Some(p) => p,
                        None => {
                            let p = self.scopes.generate_prefix();
                            self.scopes.push_namespace(Some(&p), ns)?;
                            p
                        }
                    },
                };
                QName::from_parts(Some(chosen), Some(ns.into()), local_name.into())
            }
            (Some(p), None) => {
                let ns = self.scopes.lookup(p).ok_or_else(|| Error::UndefinedPrefix(p.to_string()))?;
                QName::from_parts(Some(p.into()), Some(ns), local_name.into())
            }
            (None, None) => QName::local(local_name),
        };
        self.open_regular(qname)
    }

    fn open_regular(&mut self, qname: QName) -> Result<()> {
        self.attribute = Some(OpenAttribute {
            qname,
            kind: AttributeKind::Regular,
            text: String::new(),
            encoded: None,
        });
        Ok(())
    }

    /// Text for the open attribute, or a character chunk.
    pub fn write_content(&mut self, text: &str) -> Result<()> {
        if let Some(attr) = &mut self.attribute {
            if attr.encoded.is_some() {
                return Err(Error::invalid_state("text after encoded attribute data"));
            }
            attr.text.push_str(text);
            return Ok(());
        }
        if self.depth == 0 {
            return Err(Error::invalid_state("character content outside the root element"));
        }
        self.flush_pending()?;
        self.encoder.write_characters(text)
    }

    /// Encoded value for the open attribute, or an encoded character chunk.
    pub fn write_encoded_data(&mut self, encoding: Encoding, value: &EncodedValue) -> Result<()> {
        if let Some(attr) = &self.attribute {
            if attr.kind == AttributeKind::Namespace {
                return Err(Error::invalid_state("namespace declarations take plain text"));
            }
            if !attr.text.is_empty() || attr.encoded.is_some() {
                return Err(Error::invalid_state("attribute already has a value"));
            }
            let data = self.encoder.vocabulary().encode_value(encoding, value)?;
            if let Some(attr) = &mut self.attribute {
                attr.encoded = Some((encoding, data));
            }
            return Ok(());
        }
        if self.depth == 0 {
            return Err(Error::invalid_state("character content outside the root element"));
        }
        self.flush_pending()?;
        self.encoder.write_encoded_characters(encoding, value)
    }

    /// Closes the open attribute and files it as declaration or attribute.
    pub fn end_attribute(&mut self) -> Result<()> {
        let Some(attr) = self.attribute.take() else {
            return Err(Error::invalid_state("no open attribute"));
        };
        let Some(element) = self.pending.as_mut() else {
            return Err(Error::internal("open attribute without start tag"));
        };
        match attr.kind {
            AttributeKind::Namespace => {
                let value = attr.text;
                if attr.qname.prefix.is_none() {
                    self.scopes.push_namespace(None, &value)?;
                    let ns = (!value.is_empty()).then(|| Rc::from(value.as_str()));
                    element.declare(None, ns);
                } else {
                    let prefix = &*attr.qname.local_name;
                    self.scopes.push_namespace(Some(prefix), &value)?;
                    element.declare(Some(Rc::clone(&attr.qname.local_name)), Some(value.into()));
                }
            }
            AttributeKind::Regular => {
                if element.has_attribute(&attr.qname) {
                    return Err(Error::invalid_state(format!("duplicate attribute {}", attr.qname)));
                }
                let value = match attr.encoded {
                    Some((encoding, data)) => AttributeValue::Encoded { encoding, data },
                    None => AttributeValue::Text(attr.text),
                };
                element.attributes.push(PendingAttribute { qname: attr.qname, value });
            }
        }
        Ok(())
    }

    /// Closes the innermost element.
    pub fn end_element(&mut self) -> Result<()> {
        self.ensure_no_attribute("end_element")?;
        if self.depth == 0 {
            return Err(Error::invalid_state("no open element"));
        }
        self.flush_pending()?;
        self.encoder.write_end_element()?;
        self.scopes.pop_scope()?;
        self.depth -= 1;
        Ok(())
    }

    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.ensure_no_attribute("write_comment")?;
        self.ensure_started()?;
        self.flush_pending()?;
        self.encoder.write_comment(text)
    }

    pub fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        self.ensure_no_attribute("write_processing_instruction")?;
        self.ensure_started()?;
        self.flush_pending()?;
        self.encoder.write_processing_instruction(target, data)
    }

    /// Document type declaration. Only the identifiers are kept; name and
    /// internal subset have no place in the binary format.
    pub fn write_document_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<()> {
        self.ensure_no_attribute("write_document_type")?;
        if self.depth != 0 {
            return Err(Error::invalid_state("document type declaration inside an element"));
        }
        self.ensure_started()?;
        if internal_subset.is_some_and(|s| !s.trim().is_empty()) {
            log::debug!("dropping internal subset of document type {name}");
        }
        self.encoder.write_document_type(public_id, system_id)
    }

    /// Closes open elements and terminates the document.
    pub fn end_document(&mut self) -> Result<()> {
        self.ensure_no_attribute("end_document")?;
        self.ensure_started()?;
        while self.depth > 0 {
            self.end_element()?;
        }
        self.encoder.end_document()?;
        self.ended = true;
        self.encoder.flush()
    }

    /// Passes complete octets to the sink. An open start tag stays buffered.
    pub fn flush(&mut self) -> Result<()> {
        self.encoder.flush()
    }

    /// Ends the document if needed and releases the sink.
    ///
    /// The sink is released exactly once, also when ending the document
    /// fails; later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.encoder.is_closed() {
            return Ok(());
        }
        let ended = self.finish_document();
        let released = self.encoder.finish();
        ended?;
        released.map(drop)
    }

    fn finish_document(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.attribute = None;
        self.end_document()
    }

    /// Ends the document if needed and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish_document()?;
        self.encoder.finish()?.ok_or_else(|| Error::invalid_state("writer is closed"))
    }

    /// Prefix visible for `namespace`: `""` when it is the default namespace.
    pub fn lookup_prefix(&self, namespace: &str) -> Result<Option<Rc<str>>> {
        if namespace.is_empty() {
            return Err(Error::invalid_value("lookup of the empty namespace"));
        }
        if self.scopes.default_namespace().is_some_and(|d| &**d == namespace) {
            return Ok(Some(Rc::from("")));
        }
        Ok(self.scopes.find_prefix(namespace))
    }
}

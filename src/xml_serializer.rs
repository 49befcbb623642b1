//! Decoded nodes to XML text.
//!
//! Schreibt Knoten direkt in ein `impl Write`. Start-Tags bleiben offen,
//! bis der naechste Knoten feststeht, damit leere Elemente als `<a/>`
//! erscheinen. Namespace-Deklarationen kommen als `xmlns` Attribute vom
//! Decoder und werden unveraendert geschrieben.
//!
//! Die Dokumenttyp-Deklaration traegt im Binaerformat keinen Namen; sie wird
//! bis zum Wurzelelement zurueckgehalten und bekommt dessen Namen.

use std::io::{Read, Write};

use crate::decoder::{DecodedNode, Decoder, DecoderConfig, NodeKind};
use crate::qname::QName;
use crate::{Error, Result};

/// Decodes a Fast Infoset document to XML text.
pub fn decode_to_xml(bytes: &[u8], config: DecoderConfig) -> Result<String> {
    let out = decode_to_writer(bytes, Vec::new(), config)?;
    String::from_utf8(out).map_err(|_| Error::XmlParse("XML output is not valid UTF-8".into()))
}

/// Streams a decoded document as XML into `sink` and returns the sink.
pub fn decode_to_writer<R: Read, W: Write>(source: R, sink: W, config: DecoderConfig) -> Result<W> {
    let mut decoder = Decoder::new(source, config);
    let mut serializer = XmlSerializer::new(sink);
    loop {
        let Some(node) = decoder.read_node()? else {
            break;
        };
        if node.kind == NodeKind::DocumentStart {
            serializer.write_declaration(decoder.version(), decoder.standalone())?;
            continue;
        }
        serializer.process(node)?;
    }
    serializer.finish()
}

/// Zurueckgehaltene DOCTYPE-Deklaration samt allem, was ihr folgte.
struct HeldDoctype {
    public_id: Option<String>,
    system_id: Option<String>,
    output: Vec<u8>,
}

/// Streaming serializer for [`DecodedNode`]s.
pub struct XmlSerializer<W: Write> {
    writer: W,
    /// Start-Tag ohne abschliessendes `>`.
    open_tag: bool,
    doctype: Option<HeldDoctype>,
}

impl<W: Write> XmlSerializer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, open_tag: false, doctype: None }
    }

    /// Writes `<?xml ...?>` when the document carried a version.
    pub fn write_declaration(&mut self, version: Option<&str>, standalone: Option<bool>) -> Result<()> {
        let Some(version) = version else {
            return Ok(());
        };
        let mut decl = format!("<?xml version=\"{version}\" encoding=\"UTF-8\"");
        if let Some(standalone) = standalone {
            decl.push_str(if standalone { " standalone=\"yes\"" } else { " standalone=\"no\"" });
        }
        decl.push_str("?>");
        self.write(decl.as_bytes())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.doctype {
            Some(held) => held.output.extend_from_slice(bytes),
            None => self.writer.write_all(bytes)?,
        }
        Ok(())
    }

    fn close_tag(&mut self) -> Result<()> {
        if self.open_tag {
            self.open_tag = false;
            self.write(b">")?;
        }
        Ok(())
    }

    pub fn process(&mut self, node: &DecodedNode) -> Result<()> {
        match node.kind {
            NodeKind::None | NodeKind::DocumentStart => {}
            NodeKind::ElementStart => {
                self.close_tag()?;
                let qname = node.qname.as_ref().ok_or_else(|| Error::internal("element without name"))?;
                if node.depth == 0 {
                    self.release_doctype(qname)?;
                }
                self.write(b"<")?;
                self.write_qname(qname)?;
                for attr in &node.attributes {
                    self.write(b" ")?;
                    self.write_qname(&attr.qname)?;
                    self.write(b"=\"")?;
                    self.write_attribute_value(&attr.value)?;
                    self.write(b"\"")?;
                }
                self.open_tag = true;
            }
            NodeKind::ElementEnd => {
                if self.open_tag {
                    self.open_tag = false;
                    self.write(b"/>")?;
                } else {
                    let qname = node.qname.as_ref().ok_or_else(|| Error::internal("element without name"))?;
                    self.write(b"</")?;
                    self.write_qname(qname)?;
                    self.write(b">")?;
                }
            }
            NodeKind::Text => {
                self.close_tag()?;
                self.write_escaped(&node.value, [b'&', b'<', b'>'], [b"&amp;", b"&lt;", b"&gt;"])?;
            }
            NodeKind::Comment => {
                self.close_tag()?;
                if node.value.contains("--") || node.value.ends_with('-') {
                    return Err(Error::XmlParse("comment contains '--' or ends with '-'".into()));
                }
                self.write(b"<!--")?;
                self.write(node.value.as_bytes())?;
                self.write(b"-->")?;
            }
            NodeKind::ProcessingInstruction => {
                self.close_tag()?;
                if node.value.contains("?>") {
                    return Err(Error::XmlParse("processing instruction data contains '?>'".into()));
                }
                let target = node.qname.as_ref().map_or("", |q| &*q.local_name);
                self.write(b"<?")?;
                self.write(target.as_bytes())?;
                if !node.value.is_empty() {
                    self.write(b" ")?;
                    self.write(node.value.as_bytes())?;
                }
                self.write(b"?>")?;
            }
            NodeKind::DocumentType => {
                self.doctype = Some(HeldDoctype {
                    public_id: node.public_id.clone(),
                    system_id: node.system_id.clone(),
                    output: Vec::new(),
                });
            }
            NodeKind::DocumentEnd => {
                if let Some(held) = self.doctype.take() {
                    log::warn!("document type declaration without root element dropped");
                    self.writer.write_all(&held.output)?;
                }
            }
        }
        Ok(())
    }

    /// Schreibt die zurueckgehaltene DOCTYPE mit dem Namen des Wurzelelements.
    fn release_doctype(&mut self, root: &QName) -> Result<()> {
        let Some(held) = self.doctype.take() else {
            return Ok(());
        };
        self.write(b"<!DOCTYPE ")?;
        self.write_qname(root)?;
        match (&held.public_id, &held.system_id) {
            (Some(public), system) => {
                self.write(b" PUBLIC \"")?;
                self.write(public.as_bytes())?;
                self.write(b"\" \"")?;
                self.write(system.as_deref().unwrap_or_default().as_bytes())?;
                self.write(b"\"")?;
            }
            (None, Some(system)) => {
                self.write(b" SYSTEM \"")?;
                self.write(system.as_bytes())?;
                self.write(b"\"")?;
            }
            (None, None) => {}
        }
        self.write(b">")?;
        self.write(&held.output)
    }

    fn write_qname(&mut self, qname: &QName) -> Result<()> {
        if let Some(prefix) = &qname.prefix {
            self.write(prefix.as_bytes())?;
            self.write(b":")?;
        }
        self.write(qname.local_name.as_bytes())
    }

    /// Ersetzt drei Zeichen per memchr3; Bloecke ohne Treffer am Stueck.
    fn write_escaped(&mut self, s: &str, needle: [u8; 3], replacement: [&[u8]; 3]) -> Result<()> {
        let bytes = s.as_bytes();
        let mut start = 0;
        while let Some(offset) = memchr::memchr3(needle[0], needle[1], needle[2], &bytes[start..]) {
            let pos = start + offset;
            self.write(&bytes[start..pos])?;
            let idx = needle.iter().position(|&n| n == bytes[pos]).unwrap_or(0);
            self.write(replacement[idx])?;
            start = pos + 1;
        }
        self.write(&bytes[start..])
    }

    /// Attribute value with `\n`, `\r` and `\t` as character references.
    fn write_attribute_value(&mut self, value: &str) -> Result<()> {
        let mut start = 0;
        while let Some(offset) = memchr::memchr3(b'\n', b'\r', b'\t', &value.as_bytes()[start..]) {
            let pos = start + offset;
            self.write_escaped(&value[start..pos], [b'&', b'<', b'"'], [b"&amp;", b"&lt;", b"&quot;"])?;
            let reference: &[u8] = match value.as_bytes()[pos] {
                b'\n' => b"&#10;",
                b'\r' => b"&#13;",
                _ => b"&#9;",
            };
            self.write(reference)?;
            start = pos + 1;
        }
        self.write_escaped(&value[start..], [b'&', b'<', b'"'], [b"&amp;", b"&lt;", b"&quot;"])
    }

    /// Flushes and returns the sink.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

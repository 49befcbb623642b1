//! XML text to Fast Infoset.
//!
//! Liest XML mit dem namespace-aware `NsReader` von quick-xml und treibt
//! damit einen [`Writer`]. Prefixe bleiben erhalten: jedes Element und
//! Attribut wird mit seinem lexikalischen Prefix und dem aufgeloesten
//! Namespace geschrieben, `xmlns` Attribute werden als Deklarationen
//! weitergereicht.
//!
//! # Beispiel
//!
//! ```
//! use erfi::{EncoderConfig, DecoderConfig};
//! use erfi::xml::encode_xml;
//! use erfi::xml_serializer::decode_to_xml;
//!
//! let bytes = encode_xml("<a><b>x &amp; y</b></a>", EncoderConfig::default()).unwrap();
//! let xml = decode_to_xml(&bytes, DecoderConfig::default()).unwrap();
//! assert_eq!(xml, "<a><b>x &amp; y</b></a>");
//! ```

use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read, Write};

use memchr::memchr;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{QName as XmlQName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::encoder::EncoderConfig;
use crate::qname::XMLNS;
use crate::writer::Writer;
use crate::{Error, Result};

/// Encodes XML text into a Fast Infoset document.
pub fn encode_xml(xml: &str, config: EncoderConfig) -> Result<Vec<u8>> {
    encode_xml_to(xml.as_bytes(), Vec::new(), config)
}

/// Streams XML from `source` into `sink` and returns the sink.
pub fn encode_xml_to<R: Read, W: Write>(source: R, sink: W, config: EncoderConfig) -> Result<W> {
    let mut writer = Writer::new(sink, config)?;
    let mut reader = NsReader::from_reader(BufReader::new(source));
    reader.config_mut().trim_text(false);
    writer.start_document()?;

    let mut buf = Vec::new();
    let mut depth: usize = 0;
    // Angrenzender Text (auch ueber Entity-Referenzen) wird zu einem Chunk
    let mut pending_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                flush_text(&mut writer, &mut pending_text)?;
                start_element(&reader, &e, &mut writer)?;
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                flush_text(&mut writer, &mut pending_text)?;
                start_element(&reader, &e, &mut writer)?;
                writer.end_element()?;
            }
            Ok(Event::End(_)) => {
                flush_text(&mut writer, &mut pending_text)?;
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::XmlParse("end tag without start tag".into()))?;
                writer.end_element()?;
            }
            Ok(Event::Text(e)) => {
                let raw = utf8(e.as_ref())?;
                let text = quick_xml::escape::unescape(raw)
                    .map_err(|er| Error::XmlParse(er.to_string()))?;
                push_text(depth, &mut pending_text, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = utf8(e.as_ref())?;
                push_text(depth, &mut pending_text, text)?;
            }
            Ok(Event::GeneralRef(e)) => {
                let name = utf8(e.as_ref())?;
                let resolved = resolve_reference(name)?;
                push_text(depth, &mut pending_text, &resolved)?;
            }
            Ok(Event::Comment(e)) => {
                flush_text(&mut writer, &mut pending_text)?;
                writer.write_comment(&normalize_line_endings(utf8(e.as_ref())?))?;
            }
            Ok(Event::PI(e)) => {
                flush_text(&mut writer, &mut pending_text)?;
                let target = utf8(e.target())?;
                // Trennzeichen zwischen Target und Daten gehoert nicht zu den Daten
                let data = utf8(e.content())?.trim_start();
                writer.write_processing_instruction(target, &normalize_line_endings(data))?;
            }
            Ok(Event::DocType(e)) => {
                let doctype = Doctype::parse(utf8(e.as_ref())?);
                writer.write_document_type(
                    &doctype.name,
                    doctype.public_id.as_deref(),
                    doctype.system_id.as_deref(),
                    doctype.internal_subset.as_deref(),
                )?;
            }
            Ok(Event::Decl(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlParse(format!(
                    "{e} at position {}",
                    reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }
    if depth != 0 {
        return Err(Error::XmlParse(format!("{depth} unclosed elements at end of input")));
    }
    writer.end_document()?;
    writer.into_inner()
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::XmlParse(e.to_string()))
}

/// Text ausserhalb des Wurzelelements darf nur Whitespace sein.
fn push_text(depth: usize, pending: &mut String, text: &str) -> Result<()> {
    if depth == 0 {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(Error::XmlParse("character data outside the root element".into()));
    }
    pending.push_str(&normalize_line_endings(text));
    Ok(())
}

fn flush_text<W: Write>(writer: &mut Writer<W>, pending: &mut String) -> Result<()> {
    if !pending.is_empty() {
        writer.write_content(pending)?;
        pending.clear();
    }
    Ok(())
}

fn resolve_reference(name: &str) -> Result<Cow<'static, str>> {
    if let Some(reference) = name.strip_prefix('#') {
        let code_point = match reference.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => reference.parse::<u32>().ok(),
        };
        return code_point
            .and_then(char::from_u32)
            .map(|c| Cow::Owned(c.to_string()))
            .ok_or_else(|| Error::XmlParse(format!("invalid character reference &{name};")));
    }
    resolve_predefined_entity(name)
        .map(Cow::Borrowed)
        .ok_or_else(|| Error::XmlParse(format!("undeclared entity &{name};")))
}

fn split_name(name: &[u8]) -> Result<(Option<&str>, &str)> {
    let name = utf8(name)?;
    Ok(match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    })
}

fn namespace_of(resolved: ResolveResult<'_>) -> Result<Option<&str>> {
    match resolved {
        ResolveResult::Bound(ns) => utf8(ns.into_inner()).map(Some),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::UndefinedPrefix(
            String::from_utf8_lossy(&prefix).into_owned(),
        )),
    }
}

/// Startet ein Element; Namespace-Deklarationen vor den uebrigen Attributen.
fn start_element<R: BufRead, W: Write>(
    reader: &NsReader<R>,
    start: &BytesStart<'_>,
    writer: &mut Writer<W>,
) -> Result<()> {
    let name = start.name();
    let (prefix, local_name) = split_name(name.as_ref())?;
    let (resolved, _) = reader.resolver().resolve_element(name);
    let namespace = namespace_of(resolved)?;
    // Ohne Prefix: "" erzwingt eine Deklaration des Default-Namespace statt
    // einer Wiederverwendung eines anderen Prefixes.
    writer.start_element(Some(prefix.unwrap_or("")), Some(namespace.unwrap_or("")), local_name)?;

    let mut attributes = Vec::new();
    for attr in start.attributes().with_checks(true) {
        let attr = attr.map_err(|e| Error::XmlParse(e.to_string()))?;
        let raw = utf8(attr.value.as_ref())?;
        let value = quick_xml::escape::unescape(raw).map_err(|e| Error::XmlParse(e.to_string()))?;
        let value = normalize_line_endings(&value).into_owned();
        let key = attr.key;
        let (attr_prefix, attr_local) = split_name(key.as_ref())?;
        if attr_prefix == Some(XMLNS) || (attr_prefix.is_none() && attr_local == XMLNS) {
            writer.start_attribute(attr_prefix, None, attr_local)?;
            writer.write_content(&value)?;
            writer.end_attribute()?;
        } else {
            attributes.push((key, value));
        }
    }
    for (key, value) in attributes {
        let (attr_prefix, attr_local) = split_name(XmlQName::as_ref(&key))?;
        let (resolved, _) = reader.resolver().resolve_attribute(key);
        let namespace = namespace_of(resolved)?;
        writer.start_attribute(attr_prefix, namespace, attr_local)?;
        writer.write_content(&value)?;
        writer.end_attribute()?;
    }
    Ok(())
}

/// XML 1.0 2.11: `\r\n` und einzelnes `\r` werden zu `\n`.
fn normalize_line_endings(s: &str) -> Cow<'_, str> {
    if memchr(b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Felder einer DOCTYPE-Deklaration.
#[derive(Debug, Default, PartialEq, Eq)]
struct Doctype {
    name: String,
    public_id: Option<String>,
    system_id: Option<String>,
    internal_subset: Option<String>,
}

impl Doctype {
    /// Zerlegt den Inhalt zwischen `<!DOCTYPE` und `>`.
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let name_end =
            trimmed.find(|c: char| c.is_whitespace() || c == '[').unwrap_or(trimmed.len());
        let mut doctype = Doctype { name: trimmed[..name_end].to_string(), ..Default::default() };
        let mut rest = trimmed[name_end..].trim_start();
        if let Some(after) = rest.strip_prefix("SYSTEM") {
            let (system, remaining) = quoted(after.trim_start());
            doctype.system_id = system;
            rest = remaining.trim_start();
        } else if let Some(after) = rest.strip_prefix("PUBLIC") {
            let (public, remaining) = quoted(after.trim_start());
            let (system, remaining) = quoted(remaining.trim_start());
            doctype.public_id = public;
            doctype.system_id = system;
            rest = remaining.trim_start();
        }
        if let Some(open) = rest.find('[')
            && let Some(close) = rest.rfind(']')
            && close > open
        {
            doctype.internal_subset = Some(rest[open + 1..close].to_string());
        }
        doctype
    }
}

fn quoted(s: &str) -> (Option<String>, &str) {
    let Some(quote) = s.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return (None, s);
    };
    match s[1..].find(quote) {
        Some(end) => (Some(s[1..1 + end].to_string()), &s[end + 2..]),
        None => (None, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{DecoderConfig, NodeKind, decode};
    use crate::qname::QName;

    fn nodes(xml: &str) -> Vec<crate::decoder::DecodedNode> {
        let bytes = encode_xml(xml, EncoderConfig::default()).unwrap();
        decode(&bytes, DecoderConfig::default()).unwrap()
    }

    #[test]
    fn doctype_fields() {
        let d = Doctype::parse(" html PUBLIC \"-//W3C//DTD XHTML 1.0//EN\" 'x.dtd' [<!ENTITY a \"b\">]");
        assert_eq!(d.name, "html");
        assert_eq!(d.public_id.as_deref(), Some("-//W3C//DTD XHTML 1.0//EN"));
        assert_eq!(d.system_id.as_deref(), Some("x.dtd"));
        assert_eq!(d.internal_subset.as_deref(), Some("<!ENTITY a \"b\">"));

        let d = Doctype::parse("root SYSTEM \"root.dtd\"");
        assert_eq!(d.system_id.as_deref(), Some("root.dtd"));
        assert_eq!(d.public_id, None);
    }

    #[test]
    fn references_are_resolved() {
        let n = nodes("<a>&lt;&#65;&#x42;</a>");
        assert_eq!(n[2].kind, NodeKind::Text);
        assert_eq!(n[2].value, "<AB");
    }

    #[test]
    fn undeclared_entity_fails() {
        let err = encode_xml("<a>&nope;</a>", EncoderConfig::default()).unwrap_err();
        assert!(matches!(err, Error::XmlParse(_)), "{err}");
    }

    #[test]
    fn text_outside_root_fails() {
        assert!(encode_xml("<a/>x", EncoderConfig::default()).is_err());
        assert!(encode_xml("\n<a/>\n", EncoderConfig::default()).is_ok());
    }

    #[test]
    fn unclosed_element_fails() {
        assert!(matches!(encode_xml("<a>", EncoderConfig::default()), Err(Error::XmlParse(_))));
    }

    #[test]
    fn line_endings_normalised() {
        let n = nodes("<a>x\r\ny\rz</a>");
        assert_eq!(n[2].value, "x\ny\nz");
    }

    #[test]
    fn prefixes_preserved() {
        let n = nodes(r#"<p:a xmlns:p="urn:x" xmlns="urn:d"><b p:k="v"/></p:a>"#);
        assert_eq!(n[1].qname, Some(QName::with_prefix(Some("p"), Some("urn:x"), "a")));
        assert_eq!(n[2].qname, Some(QName::new("urn:d", "b")));
        assert_eq!(n[2].attribute(Some("urn:x"), "k"), Some("v"));
    }

    #[test]
    fn undeclared_default_namespace() {
        let n = nodes(r#"<a xmlns="urn:d"><b xmlns=""/></a>"#);
        assert_eq!(n[2].qname, Some(QName::local("b")));
        assert_eq!(n[2].attributes.len(), 1);
        assert_eq!(n[2].attributes[0].value, "");
    }

    #[test]
    fn cdata_and_text_coalesce() {
        let n = nodes("<a>x<![CDATA[<y>]]>z</a>");
        assert_eq!(n[2].value, "x<y>z");
        assert_eq!(n[3].kind, NodeKind::ElementEnd);
    }
}

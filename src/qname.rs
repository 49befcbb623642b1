//! Qualified names (X.891 7.6, 8.4).
//!
//! Ein Qualified Name besteht aus optionalem Prefix, optionalem Namespace
//! und Local Name. Gleichheit ist strukturell ueber alle drei Felder: zwei
//! Namen mit gleichem Local Name aber anderem Prefix sind verschieden und
//! bekommen im Vokabular verschiedene Indizes.
//!
//! Leere Strings werden beim Erzeugen zu `None` normalisiert, da das
//! Binaerformat keine leeren Prefixe oder Namespaces kennt.

use std::fmt;
use std::rc::Rc;

/// Reserved prefix `xml`, pre-assigned to prefix index 1.
pub const XML_PREFIX: &str = "xml";

/// Namespace bound to `xml`, pre-assigned to namespace index 1.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix and local name of namespace declaration attributes.
pub const XMLNS: &str = "xmlns";

/// Namespace of namespace declaration attributes; never bindable.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A `{prefix, namespace, local name}` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<Rc<str>>,
    pub namespace: Option<Rc<str>>,
    pub local_name: Rc<str>,
}

fn non_empty(s: Option<&str>) -> Option<Rc<str>> {
    s.filter(|s| !s.is_empty()).map(Rc::from)
}

impl QName {
    /// Name without prefix or namespace.
    pub fn local(local_name: &str) -> Self {
        Self { prefix: None, namespace: None, local_name: Rc::from(local_name) }
    }

    /// Name in `namespace` without prefix (default namespace).
    pub fn new(namespace: &str, local_name: &str) -> Self {
        Self::with_prefix(None, Some(namespace), local_name)
    }

    /// Full triple. Empty prefix or namespace become `None`.
    pub fn with_prefix(prefix: Option<&str>, namespace: Option<&str>, local_name: &str) -> Self {
        Self {
            prefix: non_empty(prefix),
            namespace: non_empty(namespace),
            local_name: Rc::from(local_name),
        }
    }

    /// Builds from already shared components.
    pub fn from_parts(
        prefix: Option<Rc<str>>,
        namespace: Option<Rc<str>>,
        local_name: Rc<str>,
    ) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()),
            namespace: namespace.filter(|n| !n.is_empty()),
            local_name,
        }
    }

    /// Prefix or `""`.
    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// Namespace or `""`.
    pub fn namespace_str(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// `true` for `xmlns` and `xmlns:p` declaration attributes.
    pub fn is_namespace_declaration(&self) -> bool {
        match self.prefix.as_deref() {
            Some(p) => p == XMLNS,
            None => &*self.local_name == XMLNS,
        }
    }
}

impl fmt::Display for QName {
    /// Schreibt den lexikalischen Namen `prefix:local` bzw. `local`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{p}:{}", self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

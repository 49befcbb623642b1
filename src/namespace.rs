//! Namespace scopes for the writer.
//!
//! Ein Frame pro offenem Element. Explizite Prefix-Bindungen liegen auf
//! einem gemeinsamen Stack; jeder Frame merkt sich dessen Hoehe beim
//! Betreten und schneidet beim Verlassen darauf zurueck. Der Default-
//! Namespace wird vom Elternframe geerbt und kann pro Frame einmal neu
//! deklariert werden.
//!
//! Sichtbar ist fuer einen Prefix immer nur die innerste Bindung.

use std::rc::Rc;

use crate::qname::{QName, XML_NAMESPACE, XML_PREFIX, XMLNS, XMLNS_NAMESPACE};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct Binding {
    prefix: Rc<str>,
    namespace: Rc<str>,
}

#[derive(Debug, Clone)]
struct ScopeFrame {
    default_namespace: Option<Rc<str>>,
    /// Default-Namespace wurde in genau diesem Frame deklariert.
    default_declared: bool,
    binding_mark: usize,
    prefix_counter: usize,
}

/// Stack of element scopes with prefix bindings.
#[derive(Debug, Clone)]
pub struct NamespaceScopes {
    frames: Vec<ScopeFrame>,
    bindings: Vec<Binding>,
}

impl Default for NamespaceScopes {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceScopes {
    /// Document-level scope with only `xml` bound.
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame {
                default_namespace: None,
                default_declared: false,
                binding_mark: 1,
                prefix_counter: 1,
            }],
            bindings: vec![Binding { prefix: XML_PREFIX.into(), namespace: XML_NAMESPACE.into() }],
        }
    }

    /// Number of open element scopes.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn top(&self) -> &ScopeFrame {
        // frames[0] wird nie entfernt
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut ScopeFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Opens an element scope and resolves the element's name.
    ///
    /// - prefix without namespace: the prefix must already be bound,
    /// - namespace without prefix: reuse a visible prefix or declare the
    ///   namespace as this scope's default,
    /// - empty prefix: declare the default namespace,
    /// - both: bind the pair (an empty namespace drops the prefix).
    pub fn push_scope(
        &mut self,
        prefix: Option<&str>,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Result<QName> {
        let parent = self.top();
        let frame = ScopeFrame {
            default_namespace: parent.default_namespace.clone(),
            default_declared: false,
            binding_mark: self.bindings.len(),
            prefix_counter: 1,
        };
        self.frames.push(frame);

        let resolved = self.resolve_element(prefix, namespace, local_name);
        if resolved.is_err() {
            // fehlgeschlagenes Element hinterlaesst weder Frame noch Bindungen
            if let Some(frame) = self.frames.pop() {
                self.bindings.truncate(frame.binding_mark);
            }
        }
        resolved
    }

    fn resolve_element(
        &mut self,
        prefix: Option<&str>,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Result<QName> {
        let resolved = match (prefix, namespace) {
            (None | Some(""), None) => {
                QName::from_parts(None, self.top().default_namespace.clone(), local_name.into())
            }
            (Some(p), None) => {
                let ns = self.lookup(p).ok_or_else(|| Error::UndefinedPrefix(p.to_string()))?;
                QName::from_parts(Some(p.into()), Some(ns), local_name.into())
            }
            (None, Some(ns)) => {
                if self.top().default_namespace.as_deref().unwrap_or("") == ns {
                    QName::with_prefix(None, Some(ns), local_name)
                } else if let Some(p) = self.find_prefix(ns) {
                    QName::from_parts(Some(p), Some(ns.into()), local_name.into())
                } else {
                    self.push_namespace(None, ns)?;
                    QName::with_prefix(None, Some(ns), local_name)
                }
            }
            (Some(""), Some(ns)) => {
                self.push_namespace(None, ns)?;
                QName::with_prefix(None, Some(ns), local_name)
            }
            (Some(p), Some(ns)) => {
                let p = if ns.is_empty() { None } else { Some(p) };
                self.push_namespace(p, ns)?;
                QName::with_prefix(p, Some(ns), local_name)
            }
        };
        Ok(resolved)
    }

    /// Binds `prefix` (or the default namespace for `None`) in the current
    /// scope. Returns `false` when the binding was already visible.
    pub fn push_namespace(&mut self, prefix: Option<&str>, namespace: &str) -> Result<bool> {
        if namespace == XMLNS_NAMESPACE {
            return Err(Error::ReservedNamespace(namespace.to_string()));
        }
        let prefix = prefix.filter(|p| !p.is_empty());
        match prefix {
            Some(p) if namespace.is_empty() => Err(Error::NamespaceRequired(p.to_string())),
            Some(XMLNS) => Err(Error::invalid_namespace("prefix xmlns cannot be bound")),
            Some(XML_PREFIX) if namespace != XML_NAMESPACE => Err(Error::invalid_namespace(
                format!("prefix xml cannot be bound to {namespace}"),
            )),
            Some(p) if p != XML_PREFIX && namespace == XML_NAMESPACE => Err(
                Error::invalid_namespace(format!("{XML_NAMESPACE} can only be bound to xml")),
            ),
            Some(p) => {
                if self.lookup(p).as_deref() == Some(namespace) {
                    return Ok(false);
                }
                self.bindings.push(Binding { prefix: p.into(), namespace: namespace.into() });
                Ok(true)
            }
            None => {
                let frame = self.top_mut();
                let current = frame.default_namespace.as_deref().unwrap_or("");
                if current == namespace {
                    return Ok(false);
                }
                if frame.default_declared {
                    return Err(Error::invalid_namespace(format!(
                        "default namespace already declared as '{current}' in this scope"
                    )));
                }
                frame.default_namespace = (!namespace.is_empty()).then(|| namespace.into());
                frame.default_declared = true;
                Ok(true)
            }
        }
    }

    /// Closes the innermost scope and drops its bindings.
    pub fn pop_scope(&mut self) -> Result<()> {
        if self.frames.len() == 1 {
            return Err(Error::invalid_state("no open element scope to pop"));
        }
        if let Some(frame) = self.frames.pop() {
            self.bindings.truncate(frame.binding_mark);
        }
        Ok(())
    }

    /// Namespace visible for `prefix`; `""` asks for the default namespace.
    pub fn lookup(&self, prefix: &str) -> Option<Rc<str>> {
        if prefix.is_empty() {
            return self.top().default_namespace.clone();
        }
        self.bindings
            .iter()
            .rev()
            .find(|b| &*b.prefix == prefix)
            .map(|b| Rc::clone(&b.namespace))
    }

    /// Like [`NamespaceScopes::lookup`] but only bindings of the innermost scope.
    pub fn lookup_in_current_scope(&self, prefix: &str) -> Option<Rc<str>> {
        let frame = self.top();
        if prefix.is_empty() {
            return frame.default_namespace.clone().filter(|_| frame.default_declared);
        }
        self.bindings[frame.binding_mark..]
            .iter()
            .rev()
            .find(|b| &*b.prefix == prefix)
            .map(|b| Rc::clone(&b.namespace))
    }

    /// Innermost prefix bound to `namespace` that is not shadowed.
    ///
    /// Eine Bindung zaehlt nur, wenn ihr Prefix beim normalen Lookup noch
    /// auf denselben Namespace aufloest.
    pub fn find_prefix(&self, namespace: &str) -> Option<Rc<str>> {
        self.bindings
            .iter()
            .rev()
            .filter(|b| &*b.namespace == namespace)
            .find(|b| self.lookup(&b.prefix).as_deref() == Some(namespace))
            .map(|b| Rc::clone(&b.prefix))
    }

    /// Synthetic prefix `d{depth}p{n}` not visible in the current scope.
    pub fn generate_prefix(&mut self) -> Rc<str> {
        let depth = self.depth();
        loop {
            let frame = self.top_mut();
            let candidate = format!("d{depth}p{}", frame.prefix_counter);
            frame.prefix_counter += 1;
            if self.lookup(&candidate).is_none() {
                return candidate.into();
            }
        }
    }

    /// Current default namespace.
    pub fn default_namespace(&self) -> Option<&Rc<str>> {
        self.top().default_namespace.as_ref()
    }

    /// Default namespace declared by the innermost scope itself.
    /// `Some(None)` stands for an undeclaration (`xmlns=""`).
    pub fn declared_default(&self) -> Option<Option<&Rc<str>>> {
        let frame = self.top();
        frame.default_declared.then_some(frame.default_namespace.as_ref())
    }

    /// Prefix bindings made in the innermost scope, in declaration order.
    pub fn current_bindings(&self) -> impl Iterator<Item = (&Rc<str>, &Rc<str>)> {
        self.bindings[self.top().binding_mark..].iter().map(|b| (&b.prefix, &b.namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_prefix_always_bound() {
        let s = NamespaceScopes::new();
        assert_eq!(s.lookup("xml").as_deref(), Some(XML_NAMESPACE));
        assert_eq!(s.find_prefix(XML_NAMESPACE).as_deref(), Some("xml"));
        assert_eq!(s.lookup(""), None);
    }

    /// Bindung auf Tiefe 2 ist in Tiefe 3 sichtbar, nach Pop auf 1 nicht mehr.
    #[test]
    fn binding_visibility_by_depth() {
        let mut s = NamespaceScopes::new();
        s.push_scope(None, None, "one").unwrap();
        s.push_scope(Some("p"), Some("urn:x"), "two").unwrap();
        s.push_scope(None, None, "three").unwrap();
        assert_eq!(s.depth(), 3);
        assert_eq!(s.lookup("p").as_deref(), Some("urn:x"));
        assert_eq!(s.lookup_in_current_scope("p"), None);
        s.pop_scope().unwrap();
        s.pop_scope().unwrap();
        assert_eq!(s.depth(), 1);
        assert_eq!(s.lookup("p"), None);
    }

    #[test]
    fn shadowing_limited_to_subtree() {
        let mut s = NamespaceScopes::new();
        s.push_scope(None, None, "one").unwrap();
        s.push_scope(Some("p"), Some("urn:a"), "two").unwrap();
        s.push_scope(Some("p"), Some("urn:b"), "three").unwrap();
        assert_eq!(s.lookup("p").as_deref(), Some("urn:b"));
        // urn:a ist unter p verdeckt
        assert_eq!(s.find_prefix("urn:a"), None);
        assert_eq!(s.find_prefix("urn:b").as_deref(), Some("p"));
        s.pop_scope().unwrap();
        assert_eq!(s.lookup("p").as_deref(), Some("urn:a"));
        assert_eq!(s.find_prefix("urn:a").as_deref(), Some("p"));
    }

    #[test]
    fn undefined_prefix() {
        let mut s = NamespaceScopes::new();
        assert_eq!(
            s.push_scope(Some("q"), None, "e"),
            Err(Error::UndefinedPrefix("q".into()))
        );
        assert_eq!(s.depth(), 0);
    }

    /// Ein abgelehntes Element darf keine Bindungen zuruecklassen.
    #[test]
    fn failed_push_leaves_scope_unchanged() {
        let mut s = NamespaceScopes::new();
        s.push_scope(Some("p"), Some("urn:1"), "r").unwrap();
        assert!(s.push_scope(Some("q"), None, "bad").is_err());
        assert_eq!(s.depth(), 1);
        assert!(s.push_scope(Some("x"), Some(XMLNS_NAMESPACE), "bad").is_err());
        assert_eq!(s.depth(), 1);
        assert_eq!(s.current_bindings().count(), 1);
        s.pop_scope().unwrap();
        assert_eq!(s.find_prefix("urn:1"), None);
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn namespace_without_prefix_reuses_or_declares_default() {
        let mut s = NamespaceScopes::new();
        let q = s.push_scope(Some("p"), Some("urn:x"), "a").unwrap();
        assert_eq!(q.prefix.as_deref(), Some("p"));
        let q = s.push_scope(None, Some("urn:x"), "b").unwrap();
        assert_eq!(q.prefix.as_deref(), Some("p"));
        let q = s.push_scope(None, Some("urn:y"), "c").unwrap();
        assert_eq!(q.prefix, None);
        assert_eq!(s.declared_default(), Some(Some(&Rc::<str>::from("urn:y"))));
        // Kind erbt den Default
        let q = s.push_scope(None, None, "d").unwrap();
        assert_eq!(q.namespace.as_deref(), Some("urn:y"));
        assert_eq!(s.declared_default(), None);
    }

    #[test]
    fn empty_prefix_forces_default() {
        let mut s = NamespaceScopes::new();
        s.push_scope(Some("p"), Some("urn:x"), "a").unwrap();
        let q = s.push_scope(Some(""), Some("urn:x"), "b").unwrap();
        assert_eq!(q.prefix, None);
        assert_eq!(s.default_namespace().map(|n| &**n), Some("urn:x"));
    }

    #[test]
    fn nested_default_override_and_undeclare() {
        let mut s = NamespaceScopes::new();
        s.push_scope(Some(""), Some("urn:a"), "a").unwrap();
        s.push_scope(Some(""), Some("urn:b"), "b").unwrap();
        assert_eq!(s.lookup("").as_deref(), Some("urn:b"));
        let q = s.push_scope(Some("p"), Some(""), "c").unwrap();
        assert_eq!(q.namespace, None);
        assert_eq!(s.lookup(""), None);
        assert_eq!(s.declared_default(), Some(None));
        s.pop_scope().unwrap();
        s.pop_scope().unwrap();
        assert_eq!(s.lookup("").as_deref(), Some("urn:a"));
    }

    #[test]
    fn push_namespace_rules() {
        let mut s = NamespaceScopes::new();
        s.push_scope(None, None, "a").unwrap();
        assert_eq!(
            s.push_namespace(Some("x"), XMLNS_NAMESPACE),
            Err(Error::ReservedNamespace(XMLNS_NAMESPACE.into()))
        );
        assert_eq!(s.push_namespace(Some("x"), ""), Err(Error::NamespaceRequired("x".into())));
        assert!(matches!(s.push_namespace(Some("xml"), "urn:other"), Err(Error::InvalidNamespace(_))));
        assert!(matches!(s.push_namespace(Some("x"), XML_NAMESPACE), Err(Error::InvalidNamespace(_))));
        assert!(matches!(s.push_namespace(Some("xmlns"), "urn:x"), Err(Error::InvalidNamespace(_))));
        assert_eq!(s.push_namespace(Some("xml"), XML_NAMESPACE), Ok(false));
        assert_eq!(s.push_namespace(Some("x"), "urn:x"), Ok(true));
        assert_eq!(s.push_namespace(Some("x"), "urn:x"), Ok(false));
        assert_eq!(s.current_bindings().count(), 1);
        assert_eq!(s.push_namespace(None, "urn:d"), Ok(true));
        assert!(s.push_namespace(None, "urn:e").is_err());
    }

    #[test]
    fn generated_prefixes_are_unique() {
        let mut s = NamespaceScopes::new();
        s.push_scope(None, None, "a").unwrap();
        s.push_namespace(Some("d1p2"), "urn:taken").unwrap();
        let first = s.generate_prefix();
        assert_eq!(&*first, "d1p1");
        s.push_namespace(Some(&first), "urn:one").unwrap();
        let second = s.generate_prefix();
        assert_eq!(&*second, "d1p3");
    }

    #[test]
    fn pop_at_document_level_fails() {
        let mut s = NamespaceScopes::new();
        assert!(matches!(s.pop_scope(), Err(Error::InvalidState(_))));
    }
}

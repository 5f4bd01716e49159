//! Namespace declaration chains.
//!
//! A [`NsDeclaration`] is one link in a persistent, shared, singly-linked
//! chain of prefix→URI bindings. Each link is tagged with the element nesting
//! level at which it was pushed, so an entire element's worth of declarations
//! can be discarded with one [`NsDeclaration::pop`] call. Links are immutable
//! after creation and shared via `Rc`, which makes it safe to capture a chain
//! pointer into any number of elements' namespace snapshots: appending later
//! siblings never mutates an earlier element's captured scope.
//!
//! A link whose URI is `None` represents an explicit *undeclaration* of its
//! prefix (or of the default namespace, `xmlns=""`). Lookups treat such a
//! link as "found, but empty" — distinct from "not found at all".

pub mod registry;

pub use registry::{NsIndex, NsRegistry};

use std::rc::Rc;

use crate::error::FragmentError;
use crate::tree::ExpandedName;

/// The fixed namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// The fixed namespace URI of namespace declarations themselves; only ever
/// bound to the `xmlns` prefix.
pub const XMLNS_NAMESPACE_URI: &str = "http://www.w3.org/2000/xmlns/";

/// A chain of in-scope namespace declarations, most recent first.
///
/// `None` is the empty chain.
pub type NsChain = Option<Rc<NsDeclaration>>;

/// One prefix→URI binding in a namespace declaration chain.
#[derive(Debug)]
pub struct NsDeclaration {
    /// The rest of the chain (older declarations).
    previous: NsChain,
    /// The most recent default-namespace link strictly before this one.
    /// `None` either when no default is in scope or when this link itself
    /// is the default (checked first by [`find_default`](Self::find_default)).
    default_link: NsChain,
    /// The declared prefix; `None` is the default namespace.
    prefix: Option<String>,
    /// The bound URI; `None` is an explicit undeclaration.
    uri: Option<String>,
    /// Element nesting level at push time.
    level: u32,
}

impl NsDeclaration {
    /// Pushes a new declaration onto `chain`, returning the new chain head.
    #[must_use]
    pub fn push(chain: NsChain, prefix: Option<&str>, uri: Option<&str>, level: u32) -> NsChain {
        let default_link = if prefix.is_none() {
            // This link is the new default; the cache is only consulted for
            // links further down the chain.
            None
        } else {
            Self::find_default(&chain)
        };
        Some(Rc::new(Self {
            previous: chain,
            default_link,
            prefix: prefix.map(str::to_string),
            uri: uri.map(str::to_string),
            level,
        }))
    }

    /// Discards the most recent link(s) whose level is `>= level`, returning
    /// the remaining chain.
    #[must_use]
    pub fn pop(chain: NsChain, level: u32) -> NsChain {
        let mut current = chain;
        while let Some(link) = current {
            if link.level < level {
                return Some(link);
            }
            current = link.previous.clone();
        }
        None
    }

    /// Finds the most recent declaration for `prefix` (shadowing applies).
    ///
    /// Use `prefix = None` to find the default namespace — but prefer
    /// [`find_default`](Self::find_default), which is O(1).
    ///
    /// Returns `None` when no declaration for the prefix exists at all; an
    /// undeclaration is returned as a link whose [`uri`](Self::uri) is `None`.
    #[must_use]
    pub fn find_declaration(chain: &NsChain, prefix: Option<&str>) -> NsChain {
        let mut current = chain.as_ref();
        while let Some(link) = current {
            if link.prefix.as_deref() == prefix {
                return Some(Rc::clone(link));
            }
            current = link.previous.as_ref();
        }
        None
    }

    /// Finds the most recent default-namespace declaration in O(1), via the
    /// cached default link.
    #[must_use]
    pub fn find_default(chain: &NsChain) -> NsChain {
        let link = chain.as_ref()?;
        if link.prefix.is_none() {
            return Some(Rc::clone(link));
        }
        link.default_link.clone()
    }

    /// Returns the URI of the in-scope default namespace, or `None` when no
    /// default namespace is in scope *or* it has been explicitly undeclared.
    #[must_use]
    pub fn find_default_uri(chain: &NsChain) -> Option<String> {
        Self::find_default(chain).and_then(|link| link.uri.clone())
    }

    /// Examines one attribute and, if it is a namespace declaration
    /// (`xmlns="..."` or `xmlns:p="..."`), validates it and pushes a link.
    /// Non-declaration attributes leave the chain untouched.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::MalformedData`] for policy violations: the
    /// `xml` prefix may only be bound to its fixed URI, the `xmlns` prefix
    /// may never be declared, and the fixed URIs may not be bound to any
    /// other prefix.
    pub fn process_attribute(
        chain: NsChain,
        name: &ExpandedName,
        value: &str,
        level: u32,
    ) -> Result<NsChain, FragmentError> {
        let is_default_decl = name.prefix().is_none() && name.local() == "xmlns";
        let declared_prefix = match name.prefix() {
            Some("xmlns") => Some(name.local()),
            _ if is_default_decl => None,
            _ => return Ok(chain),
        };

        if let Some(prefix) = declared_prefix {
            if prefix == "xmlns" {
                return Err(FragmentError::MalformedData(
                    "the 'xmlns' prefix cannot be declared".to_string(),
                ));
            }
            if prefix == "xml" && value != XML_NAMESPACE_URI {
                return Err(FragmentError::MalformedData(
                    "the 'xml' prefix cannot be rebound".to_string(),
                ));
            }
            if value == XML_NAMESPACE_URI && prefix != "xml" {
                return Err(FragmentError::MalformedData(
                    "the XML namespace URI can only be bound to the 'xml' prefix".to_string(),
                ));
            }
        } else if value == XML_NAMESPACE_URI {
            return Err(FragmentError::MalformedData(
                "the XML namespace URI cannot be the default namespace".to_string(),
            ));
        }
        if value == XMLNS_NAMESPACE_URI {
            return Err(FragmentError::MalformedData(
                "the xmlns namespace URI cannot be bound".to_string(),
            ));
        }

        // An empty value undeclares the prefix (or the default namespace).
        let uri = if value.is_empty() { None } else { Some(value) };
        Ok(Self::push(chain, declared_prefix, uri, level))
    }

    /// Fills in `name`'s URI component by resolving its prefix against the
    /// chain. The literal prefixes `xml` and `xmlns` resolve to their fixed
    /// URIs without consulting the chain; unprefixed names take the default
    /// namespace only when `use_default` is set (attribute names do not).
    ///
    /// Returns `false` only when a non-empty prefix has no declaration at
    /// all. Resolution to an undeclared (empty) URI is still `true`.
    pub fn resolve_name(chain: &NsChain, name: &mut ExpandedName, use_default: bool) -> bool {
        match name.prefix() {
            Some("xml") => {
                name.set_uri(Some(XML_NAMESPACE_URI));
                true
            }
            Some("xmlns") => {
                name.set_uri(Some(XMLNS_NAMESPACE_URI));
                true
            }
            Some(prefix) => match Self::find_declaration(chain, Some(prefix)) {
                Some(link) => {
                    name.set_uri(link.uri.as_deref());
                    true
                }
                None => false,
            },
            None => {
                if use_default {
                    let uri = Self::find_default_uri(chain);
                    name.set_uri(uri.as_deref());
                }
                true
            }
        }
    }

    /// The declared prefix; `None` for the default namespace.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The bound URI; `None` for an explicit undeclaration.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The nesting level this link was pushed at.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// The rest of the chain.
    #[must_use]
    pub fn previous(&self) -> &NsChain {
        &self.previous
    }
}

/// Collects the effective in-scope bindings of a chain: for every prefix the
/// nearest (shadowing) declaration wins, and undeclared prefixes are omitted.
/// The implicit `xml` binding is always included.
#[must_use]
pub fn in_scope_bindings(chain: &NsChain) -> Vec<(Option<String>, String)> {
    let mut seen: Vec<Option<&str>> = Vec::new();
    let mut out: Vec<(Option<String>, String)> = Vec::new();
    let mut current = chain.as_ref();
    while let Some(link) = current {
        let prefix = link.prefix.as_deref();
        if !seen.contains(&prefix) {
            seen.push(prefix);
            if let Some(uri) = link.uri.as_deref() {
                out.push((link.prefix.clone(), uri.to_string()));
            }
        }
        current = link.previous.as_ref();
    }
    if !seen.contains(&Some("xml")) {
        out.push((Some("xml".to_string()), XML_NAMESPACE_URI.to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn uri_of(chain: &NsChain, prefix: Option<&str>) -> Option<String> {
        NsDeclaration::find_declaration(chain, prefix)
            .and_then(|link| link.uri().map(str::to_string))
    }

    #[test]
    fn test_find_in_empty_chain() {
        let chain: NsChain = None;
        assert!(NsDeclaration::find_declaration(&chain, Some("p")).is_none());
        assert!(NsDeclaration::find_default(&chain).is_none());
    }

    #[test]
    fn test_shadowing_and_pop() {
        let chain = NsDeclaration::push(None, Some("p"), Some("urn:a"), 1);
        let chain = NsDeclaration::push(chain, Some("p"), Some("urn:b"), 2);

        assert_eq!(uri_of(&chain, Some("p")), Some("urn:b".to_string()));

        let chain = NsDeclaration::pop(chain, 2);
        assert_eq!(uri_of(&chain, Some("p")), Some("urn:a".to_string()));

        let chain = NsDeclaration::pop(chain, 1);
        assert!(NsDeclaration::find_declaration(&chain, Some("p")).is_none());
    }

    #[test]
    fn test_pop_discards_all_deeper_levels() {
        let chain = NsDeclaration::push(None, Some("a"), Some("urn:1"), 1);
        let chain = NsDeclaration::push(chain, Some("b"), Some("urn:2"), 3);
        let chain = NsDeclaration::push(chain, Some("c"), Some("urn:3"), 5);

        let chain = NsDeclaration::pop(chain, 2);
        assert!(uri_of(&chain, Some("b")).is_none());
        assert!(uri_of(&chain, Some("c")).is_none());
        assert_eq!(uri_of(&chain, Some("a")), Some("urn:1".to_string()));
    }

    #[test]
    fn test_default_namespace_lookup_is_cached() {
        let chain = NsDeclaration::push(None, None, Some("urn:default"), 1);
        let chain = NsDeclaration::push(chain, Some("p"), Some("urn:p"), 2);
        let chain = NsDeclaration::push(chain, Some("q"), Some("urn:q"), 3);

        let default = NsDeclaration::find_default(&chain);
        assert_eq!(
            default.as_ref().and_then(|l| l.uri()),
            Some("urn:default")
        );
        assert_eq!(
            NsDeclaration::find_default_uri(&chain),
            Some("urn:default".to_string())
        );
    }

    #[test]
    fn test_default_namespace_undeclaration() {
        let chain = NsDeclaration::push(None, None, Some("urn:outer"), 1);
        // xmlns="" at a deeper level: found, but empty.
        let chain = NsDeclaration::push(chain, None, None, 2);

        let link = NsDeclaration::find_default(&chain);
        assert!(link.is_some(), "undeclaration must still be found");
        assert_eq!(NsDeclaration::find_default_uri(&chain), None);

        // Popping the undeclaration restores the outer default.
        let chain = NsDeclaration::pop(chain, 2);
        assert_eq!(
            NsDeclaration::find_default_uri(&chain),
            Some("urn:outer".to_string())
        );
    }

    #[test]
    fn test_prefix_undeclaration_is_found_but_empty() {
        let chain = NsDeclaration::push(None, Some("p"), Some("urn:a"), 1);
        let chain = NsDeclaration::push(chain, Some("p"), None, 2);

        let link = NsDeclaration::find_declaration(&chain, Some("p"));
        assert!(link.is_some());
        assert_eq!(link.and_then(|l| l.uri().map(str::to_string)), None);
    }

    #[test]
    fn test_process_attribute_default_declaration() {
        let name = ExpandedName::unqualified("xmlns");
        let chain = NsDeclaration::process_attribute(None, &name, "urn:x", 1)
            .expect("valid declaration");
        assert_eq!(NsDeclaration::find_default_uri(&chain), Some("urn:x".to_string()));
    }

    #[test]
    fn test_process_attribute_prefixed_declaration() {
        let name = ExpandedName::qualified(Some("xmlns"), "svg");
        let chain = NsDeclaration::process_attribute(None, &name, "urn:svg", 1)
            .expect("valid declaration");
        assert_eq!(uri_of(&chain, Some("svg")), Some("urn:svg".to_string()));
    }

    #[test]
    fn test_process_attribute_ignores_ordinary_attributes() {
        let name = ExpandedName::unqualified("class");
        let chain = NsDeclaration::process_attribute(None, &name, "big", 1)
            .expect("not a declaration");
        assert!(chain.is_none());
    }

    #[test]
    fn test_process_attribute_rejects_xmlns_prefix_declaration() {
        let name = ExpandedName::qualified(Some("xmlns"), "xmlns");
        let result = NsDeclaration::process_attribute(None, &name, "urn:x", 1);
        assert!(matches!(result, Err(FragmentError::MalformedData(_))));
    }

    #[test]
    fn test_process_attribute_rejects_xml_rebinding() {
        let name = ExpandedName::qualified(Some("xmlns"), "xml");
        let result = NsDeclaration::process_attribute(None, &name, "urn:wrong", 1);
        assert!(result.is_err());

        // Declaring xml to its fixed URI is redundant but legal.
        let ok = NsDeclaration::process_attribute(None, &name, XML_NAMESPACE_URI, 1);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_process_attribute_rejects_fixed_uri_on_other_prefix() {
        let name = ExpandedName::qualified(Some("xmlns"), "fake");
        assert!(NsDeclaration::process_attribute(None, &name, XML_NAMESPACE_URI, 1).is_err());
        assert!(NsDeclaration::process_attribute(None, &name, XMLNS_NAMESPACE_URI, 1).is_err());
    }

    #[test]
    fn test_resolve_name_fixed_prefixes() {
        let chain: NsChain = None;
        let mut name = ExpandedName::qualified(Some("xml"), "lang");
        assert!(NsDeclaration::resolve_name(&chain, &mut name, false));
        assert_eq!(name.uri(), Some(XML_NAMESPACE_URI));
    }

    #[test]
    fn test_resolve_name_unknown_prefix() {
        let chain: NsChain = None;
        let mut name = ExpandedName::qualified(Some("mystery"), "x");
        assert!(!NsDeclaration::resolve_name(&chain, &mut name, false));
    }

    #[test]
    fn test_resolve_name_default_only_for_elements() {
        let chain = NsDeclaration::push(None, None, Some("urn:d"), 1);

        let mut elem = ExpandedName::unqualified("div");
        assert!(NsDeclaration::resolve_name(&chain, &mut elem, true));
        assert_eq!(elem.uri(), Some("urn:d"));

        let mut attr = ExpandedName::unqualified("class");
        assert!(NsDeclaration::resolve_name(&chain, &mut attr, false));
        assert_eq!(attr.uri(), None);
    }

    #[test]
    fn test_in_scope_bindings_shadowing() {
        let chain = NsDeclaration::push(None, Some("p"), Some("urn:old"), 1);
        let chain = NsDeclaration::push(chain, Some("p"), Some("urn:new"), 2);
        let chain = NsDeclaration::push(chain, None, Some("urn:default"), 2);

        let bindings = in_scope_bindings(&chain);
        let p_uri = bindings
            .iter()
            .find(|(p, _)| p.as_deref() == Some("p"))
            .map(|(_, u)| u.as_str());
        assert_eq!(p_uri, Some("urn:new"));
        assert!(bindings.iter().any(|(p, _)| p.is_none()));
        assert!(bindings.iter().any(|(p, u)| p.as_deref() == Some("xml")
            && u == XML_NAMESPACE_URI));
    }

    #[test]
    fn test_in_scope_bindings_omit_undeclared() {
        let chain = NsDeclaration::push(None, Some("p"), Some("urn:a"), 1);
        let chain = NsDeclaration::push(chain, Some("p"), None, 2);

        let bindings = in_scope_bindings(&chain);
        assert!(!bindings.iter().any(|(p, _)| p.as_deref() == Some("p")));
    }
}

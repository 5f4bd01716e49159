//! HTML document arena and its [`TreeAccessor`] backend.
//!
//! HTML trees come from outside this crate; [`HtmlDocument`] is the storage
//! they are loaded into. It deliberately uses a different layout than the
//! fragment arena: explicit first/last-child and sibling links per node
//! rather than per-element child lists, names held as plain lowercase
//! strings, attributes as plain string pairs with no namespace resolution
//! at build time.
//!
//! [`HtmlTreeAccessor`] adapts such a document to the accessor interface.
//! Since the document stores no namespace scopes, the accessor reconstructs
//! them on demand by replaying `xmlns` attributes from the root down to the
//! queried node, caching the result for the last node asked about.

use std::cell::RefCell;
use std::num::NonZeroU32;

use crate::accessor::{AccessorNodeType, TreeAccessor};
use crate::fragment::DocumentInformation;
use crate::ns::registry::{NsIndex, NsRegistry};
use crate::ns::{self, NsChain, NsDeclaration};
use crate::tree::ExpandedName;

/// Identifier of a node stored in an [`HtmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HtmlNodeId(NonZeroU32);

impl HtmlNodeId {
    /// # Panics
    ///
    /// Panics if `index` is 0 (the placeholder slot).
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("HtmlNodeId index must be non-zero"))
    }

    fn index(self) -> usize {
        self.0.get() as usize
    }
}

/// The kind and payload of an HTML node.
#[derive(Debug, Clone)]
pub enum HtmlNodeKind {
    /// An element with a lowercase tag name and plain string attributes.
    Element {
        /// The lowercase tag name.
        name: String,
        /// Attribute name/value pairs, names lowercase, in document order.
        attributes: Vec<(String, String)>,
    },
    /// A text node.
    Text(String),
    /// A comment node.
    Comment(String),
}

#[derive(Debug, Clone)]
struct HtmlNodeData {
    kind: HtmlNodeKind,
    parent: Option<HtmlNodeId>,
    first_child: Option<HtmlNodeId>,
    last_child: Option<HtmlNodeId>,
    next_sibling: Option<HtmlNodeId>,
    prev_sibling: Option<HtmlNodeId>,
}

/// Sibling-linked storage for an HTML tree.
///
/// Top-level nodes hang off the document itself; there is no stored root
/// node. The accessor supplies a synthetic root handle above them.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    /// Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<Option<HtmlNodeData>>,
    first_top_level: Option<HtmlNodeId>,
    last_top_level: Option<HtmlNodeId>,
    url: Option<String>,
}

impl Default for HtmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![None],
            first_top_level: None,
            last_top_level: None,
            url: None,
        }
    }

    /// The document's URL, if known.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Sets the document's URL.
    pub fn set_url(&mut self, url: Option<&str>) {
        self.url = url.map(str::to_string);
    }

    /// Creates a detached element node. The tag name is lowercased.
    pub fn create_element(&mut self, name: &str) -> HtmlNodeId {
        self.push_node(HtmlNodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, content: &str) -> HtmlNodeId {
        self.push_node(HtmlNodeKind::Text(content.to_string()))
    }

    /// Creates a detached comment node.
    pub fn create_comment(&mut self, content: &str) -> HtmlNodeId {
        self.push_node(HtmlNodeKind::Comment(content.to_string()))
    }

    /// Adds or replaces an attribute on an element. The attribute name is
    /// lowercased. Does nothing on non-element nodes.
    pub fn set_attribute(&mut self, id: HtmlNodeId, name: &str, value: &str) {
        let lower = name.to_ascii_lowercase();
        if let HtmlNodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind {
            if let Some(slot) = attributes.iter_mut().find(|(n, _)| *n == lower) {
                slot.1 = value.to_string();
            } else {
                attributes.push((lower, value.to_string()));
            }
        }
    }

    /// Appends a detached node as the last top-level node.
    pub fn append_top_level(&mut self, child: HtmlNodeId) {
        self.node_mut(child).prev_sibling = self.last_top_level;
        if let Some(last) = self.last_top_level {
            self.node_mut(last).next_sibling = Some(child);
        } else {
            self.first_top_level = Some(child);
        }
        self.last_top_level = Some(child);
    }

    /// Appends a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: HtmlNodeId, child: HtmlNodeId) {
        let prev_last = self.node(parent).last_child;
        {
            let child_data = self.node_mut(child);
            child_data.parent = Some(parent);
            child_data.prev_sibling = prev_last;
        }
        if let Some(last) = prev_last {
            self.node_mut(last).next_sibling = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// The node's kind and payload.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node in this document.
    #[must_use]
    pub fn kind(&self, id: HtmlNodeId) -> &HtmlNodeKind {
        &self.node(id).kind
    }

    fn push_node(&mut self, kind: HtmlNodeKind) -> HtmlNodeId {
        let id = HtmlNodeId::from_index(self.nodes.len());
        self.nodes.push(Some(HtmlNodeData {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }));
        id
    }

    fn node(&self, id: HtmlNodeId) -> &HtmlNodeData {
        self.nodes[id.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("invalid html node id {id:?}"))
    }

    fn node_mut(&mut self, id: HtmlNodeId) -> &mut HtmlNodeData {
        self.nodes[id.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("invalid html node id {id:?}"))
    }
}

/// Accessor node handle for HTML trees: the synthetic root, or a stored
/// node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HtmlNode {
    /// The synthetic root container above the top-level nodes.
    Root,
    /// A node stored in the document.
    Node(HtmlNodeId),
}

/// [`TreeAccessor`] backend over an [`HtmlDocument`].
///
/// Namespace scopes are not stored in the document, so
/// [`namespaces_in_scope`](TreeAccessor::namespaces_in_scope) replays the
/// `xmlns` attributes on the queried node's ancestor chain, root first,
/// through the regular declaration machinery. The result is cached for the
/// last node queried; bindings are interned in the shared [`NsRegistry`] so
/// repeated queries across accessors reuse one allocation per binding.
pub struct HtmlTreeAccessor<'a> {
    document: &'a HtmlDocument,
    registry: &'a NsRegistry,
    scope_cache: RefCell<Option<(HtmlNode, Vec<NsIndex>)>>,
}

impl<'a> HtmlTreeAccessor<'a> {
    /// Creates an accessor over `document`, interning namespace bindings
    /// into `registry`.
    #[must_use]
    pub fn new(document: &'a HtmlDocument, registry: &'a NsRegistry) -> Self {
        Self {
            document,
            registry,
            scope_cache: RefCell::new(None),
        }
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &'a HtmlDocument {
        self.document
    }

    fn scope_indices(&self, node: HtmlNode) -> Vec<NsIndex> {
        if let Some((cached_node, indices)) = self.scope_cache.borrow().as_ref() {
            if *cached_node == node {
                return indices.clone();
            }
        }

        let mut chain: NsChain = None;
        let mut level = 0;
        for id in self.element_path(node) {
            level += 1;
            if let HtmlNodeKind::Element { attributes, .. } = self.document.kind(id) {
                for (name, value) in attributes {
                    let name = ExpandedName::from_qname(name);
                    // Malformed declarations in HTML are ignored, not fatal.
                    let before = chain.clone();
                    chain = NsDeclaration::process_attribute(chain.take(), &name, value, level)
                        .unwrap_or(before);
                }
            }
        }

        let indices: Vec<NsIndex> = ns::in_scope_bindings(&chain)
            .into_iter()
            .map(|(prefix, uri)| self.registry.intern(prefix.as_deref(), &uri))
            .collect();
        *self.scope_cache.borrow_mut() = Some((node, indices.clone()));
        indices
    }

    /// The element ancestors of `node` (including `node` itself when it is
    /// an element), ordered root first.
    fn element_path(&self, node: HtmlNode) -> Vec<HtmlNodeId> {
        let HtmlNode::Node(id) = node else {
            return Vec::new();
        };
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            if matches!(self.document.kind(id), HtmlNodeKind::Element { .. }) {
                path.push(id);
            }
            current = self.document.node(id).parent;
        }
        path.reverse();
        path
    }
}

impl TreeAccessor for HtmlTreeAccessor<'_> {
    type Node = HtmlNode;

    fn root(&self) -> HtmlNode {
        HtmlNode::Root
    }

    fn node_type(&self, node: HtmlNode) -> AccessorNodeType {
        match node {
            HtmlNode::Root => AccessorNodeType::Root,
            HtmlNode::Node(id) => match self.document.kind(id) {
                HtmlNodeKind::Element { .. } => AccessorNodeType::Element,
                HtmlNodeKind::Text(_) => AccessorNodeType::Text,
                HtmlNodeKind::Comment(_) => AccessorNodeType::Comment,
            },
        }
    }

    fn parent(&self, node: HtmlNode) -> Option<HtmlNode> {
        match node {
            HtmlNode::Root => None,
            HtmlNode::Node(id) => Some(
                self.document
                    .node(id)
                    .parent
                    .map_or(HtmlNode::Root, HtmlNode::Node),
            ),
        }
    }

    fn first_child(&self, node: HtmlNode) -> Option<HtmlNode> {
        match node {
            HtmlNode::Root => self.document.first_top_level.map(HtmlNode::Node),
            HtmlNode::Node(id) => self.document.node(id).first_child.map(HtmlNode::Node),
        }
    }

    fn last_child(&self, node: HtmlNode) -> Option<HtmlNode> {
        match node {
            HtmlNode::Root => self.document.last_top_level.map(HtmlNode::Node),
            HtmlNode::Node(id) => self.document.node(id).last_child.map(HtmlNode::Node),
        }
    }

    fn next_sibling(&self, node: HtmlNode) -> Option<HtmlNode> {
        match node {
            HtmlNode::Root => None,
            HtmlNode::Node(id) => self.document.node(id).next_sibling.map(HtmlNode::Node),
        }
    }

    fn prev_sibling(&self, node: HtmlNode) -> Option<HtmlNode> {
        match node {
            HtmlNode::Root => None,
            HtmlNode::Node(id) => self.document.node(id).prev_sibling.map(HtmlNode::Node),
        }
    }

    fn name(&self, node: HtmlNode) -> Option<ExpandedName> {
        let HtmlNode::Node(id) = node else {
            return None;
        };
        let HtmlNodeKind::Element { name, .. } = self.document.kind(id) else {
            return None;
        };
        let mut expanded = ExpandedName::from_qname(name);
        let bindings = self.namespaces_in_scope(node);
        let uri = match expanded.prefix() {
            Some(prefix) => bindings
                .iter()
                .find(|(p, _)| p.as_deref() == Some(prefix))
                .map(|(_, u)| u.clone()),
            None => bindings
                .iter()
                .find(|(p, _)| p.is_none())
                .map(|(_, u)| u.clone()),
        };
        expanded.set_uri(uri.as_deref());
        Some(expanded)
    }

    fn attribute_count(&self, node: HtmlNode) -> usize {
        let HtmlNode::Node(id) = node else { return 0 };
        match self.document.kind(id) {
            HtmlNodeKind::Element { attributes, .. } => attributes.len(),
            _ => 0,
        }
    }

    fn attribute(&self, node: HtmlNode, index: usize) -> Option<(ExpandedName, String, bool)> {
        let HtmlNode::Node(id) = node else { return None };
        let HtmlNodeKind::Element { attributes, .. } = self.document.kind(id) else {
            return None;
        };
        attributes.get(index).map(|(name, value)| {
            // HTML attributes carry no namespace; "id" is the id attribute.
            let is_id = name == "id";
            (ExpandedName::from_qname(name), value.clone(), is_id)
        })
    }

    fn data(&self, node: HtmlNode) -> Option<String> {
        let HtmlNode::Node(id) = node else { return None };
        match self.document.kind(id) {
            HtmlNodeKind::Text(content) | HtmlNodeKind::Comment(content) => {
                Some(content.clone())
            }
            HtmlNodeKind::Element { .. } => None,
        }
    }

    fn document_url(&self) -> Option<String> {
        self.document.url().map(str::to_string)
    }

    fn document_information(&self) -> DocumentInformation {
        DocumentInformation::default()
    }

    fn namespaces_in_scope(&self, node: HtmlNode) -> Vec<(Option<String>, String)> {
        self.scope_indices(node)
            .into_iter()
            .filter_map(|index| self.registry.get(index))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::accessor::FallbackTreeAccessor;
    use pretty_assertions::assert_eq;

    /// `<html><body id="b">hi<!--c--><div class="x"/></body></html>`
    fn sample() -> (HtmlDocument, HtmlNodeId, HtmlNodeId) {
        let mut doc = HtmlDocument::new();
        let html = doc.create_element("HTML");
        doc.append_top_level(html);
        let body = doc.create_element("Body");
        doc.set_attribute(body, "ID", "b");
        doc.append_child(html, body);
        let text = doc.create_text("hi");
        doc.append_child(body, text);
        let comment = doc.create_comment("c");
        doc.append_child(body, comment);
        let div = doc.create_element("div");
        doc.set_attribute(div, "class", "x");
        doc.append_child(body, div);
        (doc, html, body)
    }

    #[test]
    fn test_names_are_lowercased() {
        let (doc, html, body) = sample();
        let registry = NsRegistry::default();
        let accessor = HtmlTreeAccessor::new(&doc, &registry);

        assert_eq!(
            accessor.name(HtmlNode::Node(html)).unwrap().local(),
            "html"
        );
        assert_eq!(
            accessor.attribute_value(HtmlNode::Node(body), "id"),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_structure_through_accessor() {
        let (doc, html, body) = sample();
        let registry = NsRegistry::default();
        let accessor = HtmlTreeAccessor::new(&doc, &registry);

        let root = accessor.root();
        assert_eq!(accessor.node_type(root), AccessorNodeType::Root);
        assert_eq!(accessor.first_child(root), Some(HtmlNode::Node(html)));
        assert_eq!(accessor.parent(HtmlNode::Node(html)), Some(HtmlNode::Root));
        assert_eq!(
            accessor.parent(HtmlNode::Node(body)),
            Some(HtmlNode::Node(html))
        );

        let text = accessor.first_child(HtmlNode::Node(body)).unwrap();
        assert_eq!(accessor.node_type(text), AccessorNodeType::Text);
        assert_eq!(accessor.data(text), Some("hi".to_string()));
        let comment = accessor.next_sibling(text).unwrap();
        assert_eq!(accessor.node_type(comment), AccessorNodeType::Comment);
        assert_eq!(accessor.prev_sibling(comment), Some(text));
    }

    #[test]
    fn test_id_lookup_through_fallback() {
        let (doc, _, body) = sample();
        let registry = NsRegistry::default();
        let mut walker = FallbackTreeAccessor::new(HtmlTreeAccessor::new(&doc, &registry));

        assert_eq!(walker.element_by_id("b"), Some(HtmlNode::Node(body)));
        assert_eq!(walker.element_by_id("missing"), None);
    }

    #[test]
    fn test_namespaces_replayed_from_xmlns_attributes() {
        let mut doc = HtmlDocument::new();
        let svg = doc.create_element("svg");
        doc.set_attribute(svg, "xmlns", "http://www.w3.org/2000/svg");
        doc.set_attribute(svg, "xmlns:xlink", "http://www.w3.org/1999/xlink");
        doc.append_top_level(svg);
        let rect = doc.create_element("rect");
        doc.append_child(svg, rect);

        let registry = NsRegistry::default();
        let accessor = HtmlTreeAccessor::new(&doc, &registry);

        let bindings = accessor.namespaces_in_scope(HtmlNode::Node(rect));
        assert!(bindings
            .iter()
            .any(|(p, u)| p.is_none() && u == "http://www.w3.org/2000/svg"));
        assert!(bindings
            .iter()
            .any(|(p, u)| p.as_deref() == Some("xlink")
                && u == "http://www.w3.org/1999/xlink"));

        // Element names resolve against the replayed default namespace.
        let name = accessor.name(HtmlNode::Node(rect)).unwrap();
        assert_eq!(name.uri(), Some("http://www.w3.org/2000/svg"));
    }

    #[test]
    fn test_scope_cache_and_registry_reuse() {
        let mut doc = HtmlDocument::new();
        let a = doc.create_element("a");
        doc.set_attribute(a, "xmlns:p", "urn:p");
        doc.append_top_level(a);
        let b = doc.create_element("b");
        doc.append_child(a, b);

        let registry = NsRegistry::default();
        let accessor = HtmlTreeAccessor::new(&doc, &registry);

        let first = accessor.namespaces_in_scope(HtmlNode::Node(b));
        let count_after_first = registry.len();
        // Same node again hits the cache; a different node with the same
        // scope reuses the interned bindings.
        let again = accessor.namespaces_in_scope(HtmlNode::Node(b));
        let other = accessor.namespaces_in_scope(HtmlNode::Node(a));
        assert_eq!(first, again);
        assert_eq!(first, other);
        assert_eq!(registry.len(), count_after_first);
    }

    #[test]
    fn test_root_scope_is_xml_only() {
        let doc = HtmlDocument::new();
        let registry = NsRegistry::default();
        let accessor = HtmlTreeAccessor::new(&doc, &registry);

        let bindings = accessor.namespaces_in_scope(HtmlNode::Root);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].0.as_deref(), Some("xml"));
    }
}

//! Read-only tree traversal abstraction.
//!
//! [`TreeAccessor`] is the minimal handle interface a tree backend must
//! provide: typed node handles, structural links (parent, children,
//! siblings), names, attributes, and character data. Everything else —
//! document-order stepping, filtered traversal, document-order comparison,
//! id lookup — is derived on top of it by [`FallbackTreeAccessor`], so a
//! backend only implements the cheap primitives it actually has.
//!
//! Two backends ship with this crate: [`FragmentAccessor`] over an
//! [`XmlFragment`](crate::fragment::XmlFragment), and
//! [`HtmlTreeAccessor`](crate::html::HtmlTreeAccessor) over an HTML
//! document arena.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::fragment::DocumentInformation;
use crate::tree::ExpandedName;

pub mod fragment;

pub use fragment::FragmentAccessor;

/// The node classification exposed through the accessor interface.
///
/// `Root` is the synthetic container above the top-level nodes; it has no
/// name and no attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorNodeType {
    /// The synthetic root container.
    Root,
    /// An element node.
    Element,
    /// A text node.
    Text,
    /// A CDATA section.
    CData,
    /// A comment node.
    Comment,
    /// A processing instruction.
    ProcessingInstruction,
}

/// The handle interface a tree backend implements.
///
/// All methods take `&self`; backends that need interior caches (the HTML
/// accessor's namespace cache, for instance) use interior mutability.
pub trait TreeAccessor {
    /// The backend's node handle. Cheap to copy and compare.
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// The synthetic root container node.
    fn root(&self) -> Self::Node;

    /// Classifies a node.
    fn node_type(&self, node: Self::Node) -> AccessorNodeType;

    /// The parent node, or `None` for the root.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// The first child in document order.
    fn first_child(&self, node: Self::Node) -> Option<Self::Node>;

    /// The last child in document order.
    fn last_child(&self, node: Self::Node) -> Option<Self::Node>;

    /// The next sibling in document order.
    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// The previous sibling in document order.
    fn prev_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// The node's name: the expanded name for elements, the target for
    /// processing instructions, `None` for everything else.
    fn name(&self, node: Self::Node) -> Option<ExpandedName>;

    /// Number of attributes on the node (0 for non-elements).
    fn attribute_count(&self, node: Self::Node) -> usize;

    /// The attribute at `index` as `(name, value, is_id)`, in document
    /// order.
    fn attribute(&self, node: Self::Node, index: usize) -> Option<(ExpandedName, String, bool)>;

    /// The node's character data: text or CDATA content, comment text, or
    /// processing instruction data. `None` for elements and the root.
    fn data(&self, node: Self::Node) -> Option<String>;

    /// `true` for a text or CDATA node with empty content.
    fn is_empty_text(&self, node: Self::Node) -> bool {
        matches!(
            self.node_type(node),
            AccessorNodeType::Text | AccessorNodeType::CData
        ) && self.data(node).is_some_and(|d| d.is_empty())
    }

    /// `true` for a text or CDATA node containing only XML whitespace.
    fn is_whitespace_only(&self, node: Self::Node) -> bool {
        matches!(
            self.node_type(node),
            AccessorNodeType::Text | AccessorNodeType::CData
        ) && self
            .data(node)
            .is_some_and(|d| d.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')))
    }

    /// The URL of the document this tree came from, if known.
    fn document_url(&self) -> Option<String>;

    /// Version/encoding/standalone information from the XML declaration.
    fn document_information(&self) -> DocumentInformation;

    /// The namespace bindings in scope at `node`, as `(prefix, uri)` pairs
    /// with shadowed and undeclared prefixes removed. The implicit `xml`
    /// binding is always present.
    fn namespaces_in_scope(&self, node: Self::Node) -> Vec<(Option<String>, String)>;

    /// The value of the first attribute on `node` whose local name is
    /// `local`, ignoring any prefix.
    fn attribute_value(&self, node: Self::Node, local: &str) -> Option<String> {
        (0..self.attribute_count(node)).find_map(|i| {
            let (name, value, _) = self.attribute(node, i)?;
            (name.local() == local).then_some(value)
        })
    }

    /// The value of the node's id attribute, if it has one.
    fn id_attribute(&self, node: Self::Node) -> Option<String> {
        (0..self.attribute_count(node)).find_map(|i| {
            let (_, value, is_id) = self.attribute(node, i)?;
            is_id.then_some(value)
        })
    }
}

/// A candidate predicate for filtered traversal.
///
/// A filter only removes candidates from a traversal's result set; it never
/// adds nodes that plain traversal would not visit.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    node_type: Option<AccessorNodeType>,
    element_name: Option<ExpandedName>,
    attribute_name: Option<ExpandedName>,
    attribute_value: Option<String>,
}

impl NodeFilter {
    /// Creates a filter that accepts every node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts matches to one node type.
    #[must_use]
    pub fn node_type(mut self, node_type: AccessorNodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Restricts matches to elements with this name. URI and local part
    /// must agree; the prefix is ignored.
    #[must_use]
    pub fn element_name(mut self, name: ExpandedName) -> Self {
        self.element_name = Some(name);
        self
    }

    /// Restricts matches to elements carrying an attribute with this name.
    #[must_use]
    pub fn attribute(mut self, name: ExpandedName) -> Self {
        self.attribute_name = Some(name);
        self
    }

    /// Restricts matches to elements carrying an attribute with this name
    /// and exact value.
    #[must_use]
    pub fn attribute_value(mut self, name: ExpandedName, value: &str) -> Self {
        self.attribute_name = Some(name);
        self.attribute_value = Some(value.to_string());
        self
    }

    /// Whether `node` passes every condition of this filter.
    pub fn accepts<A: TreeAccessor>(&self, accessor: &A, node: A::Node) -> bool {
        let node_type = accessor.node_type(node);
        if let Some(wanted) = self.node_type {
            if node_type != wanted {
                return false;
            }
        }
        if self.element_name.is_some() || self.attribute_name.is_some() {
            if node_type != AccessorNodeType::Element {
                return false;
            }
        }
        if let Some(wanted) = &self.element_name {
            match accessor.name(node) {
                Some(name) if name.matches(wanted) => {}
                _ => return false,
            }
        }
        if let Some(attr_name) = &self.attribute_name {
            let found = (0..accessor.attribute_count(node)).find_map(|i| {
                let (name, value, _) = accessor.attribute(node, i)?;
                name.matches(attr_name).then_some(value)
            });
            match (found, &self.attribute_value) {
                (Some(value), Some(wanted)) => {
                    if value != *wanted {
                        return false;
                    }
                }
                (Some(_), None) => {}
                (None, _) => return false,
            }
        }
        true
    }
}

/// Derived traversal over any [`TreeAccessor`] backend.
///
/// Wraps a backend and provides document-order stepping, filtered
/// traversal, ancestor walks, document-order comparison, id lookup, and
/// character-data assembly, all in terms of the backend's primitives. An
/// optional `stop_at` node bounds forward traversal to that node's subtree.
#[derive(Debug)]
pub struct FallbackTreeAccessor<A: TreeAccessor> {
    inner: A,
    stop_at: Option<A::Node>,
    /// Lazily built on the first `element_by_id` call, in one full walk.
    id_index: Option<HashMap<String, A::Node>>,
}

impl<A: TreeAccessor> FallbackTreeAccessor<A> {
    /// Wraps a backend with unbounded traversal.
    #[must_use]
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            stop_at: None,
            id_index: None,
        }
    }

    /// Wraps a backend, bounding forward traversal to the subtree rooted
    /// at `stop_at`: [`get_next`](Self::get_next) never climbs past it.
    #[must_use]
    pub fn with_stop_at(inner: A, stop_at: A::Node) -> Self {
        Self {
            inner,
            stop_at: Some(stop_at),
            id_index: None,
        }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// The ancestor `levels` steps above `node` (0 returns the node
    /// itself), or `None` past the root.
    pub fn get_ancestor(&self, node: A::Node, levels: usize) -> Option<A::Node> {
        let mut current = node;
        for _ in 0..levels {
            current = self.inner.parent(current)?;
        }
        Some(current)
    }

    /// The next node in document (pre-order) order.
    pub fn get_next(&self, node: A::Node) -> Option<A::Node> {
        if let Some(child) = self.inner.first_child(node) {
            return Some(child);
        }
        self.get_next_non_descendant(node)
    }

    /// The next node in document order that is not a descendant of `node`:
    /// its next sibling, or the nearest ancestor's next sibling. Stops at
    /// the traversal boundary.
    pub fn get_next_non_descendant(&self, node: A::Node) -> Option<A::Node> {
        let mut current = node;
        loop {
            if self.stop_at == Some(current) {
                return None;
            }
            if let Some(sibling) = self.inner.next_sibling(current) {
                return Some(sibling);
            }
            current = self.inner.parent(current)?;
        }
    }

    /// The previous node in document order: the deepest last descendant of
    /// the previous sibling, or the parent.
    pub fn get_previous(&self, node: A::Node) -> Option<A::Node> {
        if self.stop_at == Some(node) {
            return None;
        }
        match self.inner.prev_sibling(node) {
            Some(mut current) => {
                while let Some(last) = self.inner.last_child(current) {
                    current = last;
                }
                Some(current)
            }
            None => self.inner.parent(node),
        }
    }

    /// The next node in document order accepted by `filter`.
    pub fn get_next_filtered(&self, node: A::Node, filter: &NodeFilter) -> Option<A::Node> {
        let mut current = self.get_next(node)?;
        loop {
            if filter.accepts(&self.inner, current) {
                return Some(current);
            }
            current = self.get_next(current)?;
        }
    }

    /// The previous node in document order accepted by `filter`.
    pub fn get_previous_filtered(&self, node: A::Node, filter: &NodeFilter) -> Option<A::Node> {
        let mut current = self.get_previous(node)?;
        loop {
            if filter.accepts(&self.inner, current) {
                return Some(current);
            }
            current = self.get_previous(current)?;
        }
    }

    /// Whether `first` comes strictly before `second` in document order.
    /// An ancestor precedes its descendants. Costs one parent walk per
    /// node plus one sibling scan, not a full-tree traversal.
    pub fn precedes(&self, first: A::Node, second: A::Node) -> bool {
        if first == second {
            return false;
        }
        let first_chain = self.ancestor_chain(first);
        let second_chain = self.ancestor_chain(second);

        let mut i = 0;
        while i < first_chain.len() && i < second_chain.len() && first_chain[i] == second_chain[i]
        {
            i += 1;
        }
        if i == first_chain.len() {
            // `first` is an ancestor of `second`.
            return true;
        }
        if i == second_chain.len() {
            return false;
        }

        // Both divergence points are children of the common ancestor.
        let mut current = first_chain[i];
        while let Some(sibling) = self.inner.next_sibling(current) {
            if sibling == second_chain[i] {
                return true;
            }
            current = sibling;
        }
        false
    }

    /// Looks up the element whose id attribute equals `id`.
    ///
    /// The first call walks the whole tree once and builds an index; later
    /// calls are hash lookups. When several elements share an id, the first
    /// in document order wins.
    pub fn element_by_id(&mut self, id: &str) -> Option<A::Node> {
        if self.id_index.is_none() {
            let mut index = HashMap::new();
            let mut current = Some(self.inner.root());
            while let Some(node) = current {
                if self.inner.node_type(node) == AccessorNodeType::Element {
                    if let Some(value) = self.inner.id_attribute(node) {
                        index.entry(value).or_insert(node);
                    }
                }
                current = self.get_next(node);
            }
            self.id_index = Some(index);
        }
        self.id_index.as_ref().and_then(|map| map.get(id).copied())
    }

    /// The content of the character-data run starting at `node`, when that
    /// run is a single node. Returns `None` when the run spans several
    /// sibling nodes and must be assembled with
    /// [`character_data_content_into`](Self::character_data_content_into),
    /// or when `node` is not a character data node.
    pub fn try_character_data_content(&self, node: A::Node) -> Option<String> {
        if !self.is_character_data(node) {
            return None;
        }
        match self.inner.next_sibling(node) {
            Some(sibling) if self.is_character_data(sibling) => None,
            _ => self.inner.data(node),
        }
    }

    /// Appends the full character-data run starting at `node` — the node
    /// and every directly following text or CDATA sibling — to `buf`.
    pub fn character_data_content_into(&self, node: A::Node, buf: &mut String) {
        let mut current = Some(node);
        while let Some(n) = current {
            if !self.is_character_data(n) {
                break;
            }
            if let Some(data) = self.inner.data(n) {
                buf.push_str(&data);
            }
            current = self.inner.next_sibling(n);
        }
    }

    fn is_character_data(&self, node: A::Node) -> bool {
        matches!(
            self.inner.node_type(node),
            AccessorNodeType::Text | AccessorNodeType::CData
        )
    }

    fn ancestor_chain(&self, node: A::Node) -> Vec<A::Node> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.inner.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }
}

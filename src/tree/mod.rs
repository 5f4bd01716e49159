//! Arena-based fragment node storage.
//!
//! All content nodes of a fragment live in a contiguous `Vec<NodeData>`
//! owned by the [`NodeArena`], referenced by [`NodeId`] — a newtype over
//! `NonZeroU32`. An element's children are held in its own
//! [`SlotList`](crate::util::slotlist::SlotList) of ids, in document order;
//! sibling navigation goes through the parent's child list rather than
//! per-node sibling links, which keeps nodes small and makes positional
//! insertion (shift-the-tail-right) natural.
//!
//! The parent link is a plain non-owning index: it never contributes to
//! ownership or destruction order. Dropping the arena frees every node at
//! once.

mod node;

pub use node::{NodeKind, WhitespaceMode};

use std::fmt;
use std::num::NonZeroU32;

use crate::ns::NsChain;
use crate::util::qname::split_qname;
use crate::util::slotlist::SlotList;

/// A typed index into a fragment's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, so `Option<NodeId>` is the same
/// size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// An expanded name: namespace URI + prefix + local part.
///
/// The URI is filled in by namespace resolution; names built directly from
/// source text start with `uri = None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    uri: Option<String>,
    prefix: Option<String>,
    local: String,
}

impl ExpandedName {
    /// Creates a name with no prefix and no namespace.
    #[must_use]
    pub fn unqualified(local: &str) -> Self {
        Self {
            uri: None,
            prefix: None,
            local: local.to_string(),
        }
    }

    /// Creates a name from a prefix and local part, namespace unresolved.
    #[must_use]
    pub fn qualified(prefix: Option<&str>, local: &str) -> Self {
        Self {
            uri: None,
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }
    }

    /// Creates a fully-resolved name.
    #[must_use]
    pub fn with_uri(uri: Option<&str>, prefix: Option<&str>, local: &str) -> Self {
        Self {
            uri: uri.map(str::to_string),
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }
    }

    /// Parses a `prefix:local` qualified name, namespace unresolved.
    #[must_use]
    pub fn from_qname(qname: &str) -> Self {
        let (prefix, local) = split_qname(qname);
        Self::qualified(prefix, local)
    }

    /// The namespace URI, if resolved and non-empty.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The namespace prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The local part.
    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Replaces the URI component (used by namespace resolution).
    pub fn set_uri(&mut self, uri: Option<&str>) {
        self.uri = uri.map(str::to_string);
    }

    /// Returns the qualified form, `prefix:local` or just `local`.
    #[must_use]
    pub fn qname(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }

    /// Compares URI + local part (the namespace-aware identity; the prefix
    /// is presentation only).
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.local == other.local && self.uri == other.uri
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name (URI + prefix + local part).
    pub name: ExpandedName,
    /// The attribute value, whitespace-normalized per the `xml:space` scope
    /// in effect when it was added.
    pub value: String,
    /// Whether this attribute is of type ID.
    pub is_id: bool,
}

/// Storage for a single node in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent element, if any. The fragment root has no parent.
    pub parent: Option<NodeId>,
}

/// The node arena backing a fragment.
#[derive(Debug, Clone)]
pub struct NodeArena {
    /// Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(16);
        nodes.push(NodeData {
            kind: NodeKind::Text {
                content: String::new(),
                preserved: false,
            },
            parent: None,
        });
        Self { nodes }
    }

    /// Allocates a new node and returns its id.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData { kind, parent: None });
        NodeId::from_index(index)
    }

    /// Creates a new element node with the given name and empty content.
    pub fn create_element(&mut self, name: ExpandedName) -> NodeId {
        self.create(NodeKind::Element {
            name,
            attributes: SlotList::new(),
            children: SlotList::new(),
            ns_scope: None,
            whitespace: WhitespaceMode::Default,
        })
    }

    /// Returns a reference to the node data.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a valid node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    /// Returns a mutable reference to the node data.
    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the children of a node (empty for non-elements).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Element { children, .. } => children.as_slice(),
            _ => &[],
        }
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Returns a node's index within its parent's child list.
    #[must_use]
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        if index == 0 {
            None
        } else {
            self.children(parent).get(index - 1).copied()
        }
    }

    /// Inserts `child` into `parent`'s child list at `index`, shifting
    /// subsequent children right by one.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not an element, if `index` is out of range, or
    /// if `child` already has a parent.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );
        self.node_mut(child).parent = Some(parent);
        match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => children.insert(index, child),
            _ => panic!("insert_child: parent is not an element"),
        }
    }

    /// Appends `child` at the end of `parent`'s child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child);
    }

    /// Removes the child at `index` from `parent`'s child list.
    ///
    /// The node stays allocated in the arena but becomes unreachable.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> NodeId {
        let removed = match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => children.remove(index),
            _ => panic!("remove_child: parent is not an element"),
        };
        self.node_mut(removed).parent = None;
        removed
    }

    /// Returns the element's name, or `None` for non-elements.
    #[must_use]
    pub fn element_name(&self, id: NodeId) -> Option<&ExpandedName> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the attributes of an element (empty for non-elements).
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes.as_slice(),
            _ => &[],
        }
    }

    /// Returns the value of the attribute with the given local name
    /// (namespace ignored), if present.
    #[must_use]
    pub fn attribute_value(&self, id: NodeId, local: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name.local() == local && a.name.prefix().is_none())
            .map(|a| a.value.as_str())
    }

    /// Adds or replaces an attribute on an element. Replacement matches on
    /// prefix + local part.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an element.
    pub fn set_attribute(&mut self, id: NodeId, attribute: Attribute) {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { attributes, .. } => {
                let existing = attributes.position(|a| {
                    a.name.local() == attribute.name.local()
                        && a.name.prefix() == attribute.name.prefix()
                });
                match existing {
                    Some(pos) => {
                        if let Some(slot) = attributes.get_mut(pos) {
                            *slot = attribute;
                        }
                    }
                    None => attributes.push(attribute),
                }
            }
            _ => panic!("set_attribute: node is not an element"),
        }
    }

    /// Returns the text content of a text/CDATA/comment node, or the data
    /// of a PI node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content, .. }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => Some(data),
            NodeKind::Element { .. } => None,
        }
    }

    /// Concatenates the text/CDATA content of a node and its descendants,
    /// in document order, into `buf`.
    pub fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content, .. } | NodeKind::CData { content } => {
                buf.push_str(content);
            }
            NodeKind::Element { children, .. } => {
                for &child in children {
                    self.collect_text(child, buf);
                }
            }
            _ => {}
        }
    }

    /// Captures the namespace scope snapshot on an element.
    pub fn set_ns_scope(&mut self, id: NodeId, scope: NsChain) {
        if let NodeKind::Element { ns_scope, .. } = &mut self.node_mut(id).kind {
            *ns_scope = scope;
        }
    }

    /// Returns the element's captured namespace scope.
    #[must_use]
    pub fn ns_scope(&self, id: NodeId) -> NsChain {
        match &self.node(id).kind {
            NodeKind::Element { ns_scope, .. } => ns_scope.clone(),
            _ => None,
        }
    }

    /// Returns the element's whitespace mode (Default for non-elements).
    #[must_use]
    pub fn whitespace_mode(&self, id: NodeId) -> WhitespaceMode {
        match &self.node(id).kind {
            NodeKind::Element { whitespace, .. } => *whitespace,
            _ => WhitespaceMode::Default,
        }
    }

    /// Sets the element's whitespace mode.
    pub fn set_whitespace_mode(&mut self, id: NodeId, mode: WhitespaceMode) {
        if let NodeKind::Element { whitespace, .. } = &mut self.node_mut(id).kind {
            *whitespace = mode;
        }
    }

    /// Deep-clones the subtree rooted at `id` into `target`, returning the
    /// clone's id. All strings are freshly owned; nothing is shared with the
    /// source except the (immutable) namespace chain links.
    pub fn clone_subtree_into(&self, id: NodeId, target: &mut NodeArena) -> NodeId {
        let kind = match &self.node(id).kind {
            NodeKind::Element {
                name,
                attributes,
                ns_scope,
                whitespace,
                ..
            } => NodeKind::Element {
                name: name.clone(),
                attributes: attributes.clone(),
                children: SlotList::new(),
                ns_scope: ns_scope.clone(),
                whitespace: *whitespace,
            },
            other => other.clone(),
        };
        let clone = target.create(kind);
        for &child in self.children(id) {
            let child_clone = self.clone_subtree_into(child, target);
            target.append_child(clone, child_clone);
        }
        clone
    }

    /// Returns the total number of nodes allocated (excluding the
    /// placeholder slot).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Returns `true` if no nodes have been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! [`TreeAccessor`] backend over an [`XmlFragment`].
//!
//! A thin view: every handle is a [`NodeId`] into the fragment's arena, and
//! every primitive maps directly onto an arena link. The fragment's
//! synthetic root container is the accessor's root node.

use crate::accessor::{AccessorNodeType, TreeAccessor};
use crate::fragment::{DocumentInformation, XmlFragment};
use crate::ns::{self, XML_NAMESPACE_URI};
use crate::tree::{ExpandedName, NodeId, NodeKind};

/// Read-only accessor view of an [`XmlFragment`].
#[derive(Debug, Clone, Copy)]
pub struct FragmentAccessor<'a> {
    fragment: &'a XmlFragment,
}

impl<'a> FragmentAccessor<'a> {
    /// Creates an accessor over `fragment`. The fragment's cursor position
    /// is neither consulted nor changed.
    #[must_use]
    pub fn new(fragment: &'a XmlFragment) -> Self {
        Self { fragment }
    }

    /// The underlying fragment.
    #[must_use]
    pub fn fragment(&self) -> &'a XmlFragment {
        self.fragment
    }

    fn kind(&self, node: NodeId) -> &'a NodeKind {
        &self.fragment.arena().node(node).kind
    }
}

impl TreeAccessor for FragmentAccessor<'_> {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.fragment.root()
    }

    fn node_type(&self, node: NodeId) -> AccessorNodeType {
        if node == self.fragment.root() {
            return AccessorNodeType::Root;
        }
        match self.kind(node) {
            NodeKind::Element { .. } => AccessorNodeType::Element,
            NodeKind::Text { .. } => AccessorNodeType::Text,
            NodeKind::CData { .. } => AccessorNodeType::CData,
            NodeKind::Comment { .. } => AccessorNodeType::Comment,
            NodeKind::ProcessingInstruction { .. } => AccessorNodeType::ProcessingInstruction,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.fragment.arena().parent(node)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.fragment.arena().first_child(node)
    }

    fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.fragment.arena().last_child(node)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.fragment.arena().next_sibling(node)
    }

    fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.fragment.arena().prev_sibling(node)
    }

    fn name(&self, node: NodeId) -> Option<ExpandedName> {
        if node == self.fragment.root() {
            return None;
        }
        match self.kind(node) {
            NodeKind::Element { name, .. } => Some(name.clone()),
            NodeKind::ProcessingInstruction { target, .. } => {
                Some(ExpandedName::unqualified(target))
            }
            _ => None,
        }
    }

    fn attribute_count(&self, node: NodeId) -> usize {
        if node == self.fragment.root() {
            return 0;
        }
        self.fragment.arena().attributes(node).len()
    }

    fn attribute(&self, node: NodeId, index: usize) -> Option<(ExpandedName, String, bool)> {
        if node == self.fragment.root() {
            return None;
        }
        self.fragment
            .arena()
            .attributes(node)
            .get(index)
            .map(|attr| (attr.name.clone(), attr.value.clone(), attr.is_id))
    }

    fn data(&self, node: NodeId) -> Option<String> {
        match self.kind(node) {
            NodeKind::Text { content, .. }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => Some(content.clone()),
            NodeKind::ProcessingInstruction { data, .. } => Some(data.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    fn document_url(&self) -> Option<String> {
        self.fragment.url().map(str::to_string)
    }

    fn document_information(&self) -> DocumentInformation {
        self.fragment.document_information().clone()
    }

    fn namespaces_in_scope(&self, node: NodeId) -> Vec<(Option<String>, String)> {
        // The nearest ancestor-or-self element carries the scope snapshot.
        let arena = self.fragment.arena();
        let mut current = Some(node);
        while let Some(n) = current {
            if arena.node(n).kind.is_element() {
                return ns::in_scope_bindings(&arena.ns_scope(n));
            }
            current = arena.parent(n);
        }
        vec![(Some("xml".to_string()), XML_NAMESPACE_URI.to_string())]
    }
}

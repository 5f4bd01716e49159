//! Node type definitions.
//!
//! [`NodeKind`] is the closed tagged variant for all content node types in a
//! fragment tree. Each variant carries its node-type-specific payload; the
//! parent back-reference lives in `NodeData`, not here.

use crate::ns::NsChain;
use crate::tree::{Attribute, ExpandedName, NodeId};
use crate::util::slotlist::SlotList;

/// Whitespace handling in effect for an element's character data.
///
/// Set when an `xml:space` attribute is seen on the element, otherwise
/// inherited from the nearest ancestor that has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceMode {
    /// Runs of XML whitespace collapse to a single space; leading and
    /// trailing runs are removed.
    #[default]
    Default,
    /// Character data is stored verbatim (`xml:space="preserve"`).
    Preserve,
}

/// The kind of a content node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An element node.
    Element {
        /// The element's expanded name (URI + prefix + local part).
        name: ExpandedName,
        /// Attributes on this element, in document order.
        attributes: SlotList<Attribute>,
        /// Child nodes, in document order.
        children: SlotList<NodeId>,
        /// The namespace declarations in scope at start-of-content.
        /// Immutable once captured; shared with the declaration chain.
        ns_scope: NsChain,
        /// Whitespace handling for character data under this element.
        whitespace: WhitespaceMode,
    },

    /// A text node containing character data.
    Text {
        /// The (possibly whitespace-normalized) text content.
        content: String,
        /// Whether this node was appended under `xml:space="preserve"`.
        /// Adjacent text is only coalesced when this flag agrees.
        preserved: bool,
    },

    /// A CDATA section. Content is stored verbatim, never normalized.
    CData {
        /// The CDATA content.
        content: String,
    },

    /// A comment node.
    Comment {
        /// The comment text (without the `<!--` and `-->` delimiters).
        content: String,
    },

    /// A processing instruction.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data.
        data: String,
    },
}

impl NodeKind {
    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Returns `true` for text and CDATA nodes.
    #[must_use]
    pub fn is_character_data(&self) -> bool {
        matches!(self, Self::Text { .. } | Self::CData { .. })
    }
}

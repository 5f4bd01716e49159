//! The XML fragment document.
//!
//! [`XmlFragment`] owns a tree of content nodes and a position-stack cursor
//! — one index per tree depth — that makes the same storage usable two ways:
//!
//! - **Streaming consumption**: [`enter_element`](XmlFragment::enter_element),
//!   [`skip_content`](XmlFragment::skip_content),
//!   [`leave_element`](XmlFragment::leave_element) walk the content forward,
//!   and [`restart_fragment`](XmlFragment::restart_fragment) rewinds the
//!   cursor so the parsed fragment can be re-walked any number of times
//!   without re-parsing.
//! - **Random mutation**: [`open_element`](XmlFragment::open_element),
//!   [`set_attribute`](XmlFragment::set_attribute),
//!   [`add_text`](XmlFragment::add_text),
//!   [`close_element`](XmlFragment::close_element) build or extend content
//!   at the cursor position, shifting later siblings right.
//!
//! A fragment's root is a synthetic container element, so a fragment may
//! hold any number of top-level nodes — which is what makes sub-fragment
//! extraction ([`make_sub_fragment`](XmlFragment::make_sub_fragment)) and
//! splicing ([`add_fragment`](XmlFragment::add_fragment)) natural.

pub mod builder;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::FragmentError;
use crate::parser::{self, ParseOptions};
use crate::tree::{Attribute, ExpandedName, NodeArena, NodeId, NodeKind, WhitespaceMode};
use crate::util::qname::collapse_whitespace_into;

/// Classification of the content at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// An element child is next.
    Element,
    /// A text or CDATA child is next.
    Text,
    /// A comment child is next.
    Comment,
    /// A processing-instruction child is next.
    ProcessingInstruction,
    /// The current element's content is exhausted; `leave_element` applies.
    EndOfElement,
    /// The whole fragment's content is exhausted.
    EndOfFragment,
}

/// Document-level information captured from the XML declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInformation {
    /// XML version (e.g., "1.0").
    pub version: Option<String>,
    /// Declared encoding (e.g., "UTF-8").
    pub encoding: Option<String>,
    /// Standalone flag.
    pub standalone: Option<bool>,
}

/// An XML fragment: a lightweight tree plus a streaming cursor.
#[derive(Debug, Clone)]
pub struct XmlFragment {
    arena: NodeArena,
    /// The synthetic container element holding the fragment's top-level
    /// content. Lives exactly as long as the fragment.
    root: NodeId,
    /// The element whose children the cursor is iterating.
    current: NodeId,
    /// One child index per depth level. `position[depth]` is how far into
    /// `current`'s children the cursor has advanced.
    position: Vec<usize>,
    /// Current nesting depth (index of the active `position` slot).
    depth: usize,
    /// Deepest nesting observed; used to right-size `position` after a
    /// parse completes.
    max_depth: usize,
    /// Whether the node just before the cursor is a text node still
    /// accumulating character data. Content is always stored normalized;
    /// this only controls whether the next `add_text` extends that node.
    pending_text: bool,
    /// Whether the accumulating text ended in a whitespace run that was
    /// trimmed; the next non-space character re-inserts a single space.
    pending_space: bool,
    url: Option<String>,
    info: DocumentInformation,
}

impl XmlFragment {
    /// Creates an empty fragment.
    #[must_use]
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        let root = arena.create_element(ExpandedName::unqualified(""));
        Self {
            arena,
            root,
            current: root,
            position: vec![0],
            depth: 0,
            max_depth: 0,
            pending_text: false,
            pending_space: false,
            url: None,
            info: DocumentInformation::default(),
        }
    }

    /// Parses an XML string into a fragment.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError`] if the input is not well-formed or violates
    /// namespace declaration policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlfrag::XmlFragment;
    ///
    /// let mut frag = XmlFragment::parse_str("<root><child/></root>").unwrap();
    /// assert!(frag.enter_element("root"));
    /// ```
    pub fn parse_str(input: &str) -> Result<Self, FragmentError> {
        Self::parse_str_with_options(input, &ParseOptions::default())
    }

    /// Parses an XML string with the given options.
    pub fn parse_str_with_options(
        input: &str,
        options: &ParseOptions,
    ) -> Result<Self, FragmentError> {
        let mut handler = builder::FragmentBuilder::new();
        parser::parse_events(input, options, &mut handler)?;
        Ok(handler.finish())
    }

    /// Parses XML from raw bytes, detecting the encoding automatically
    /// (BOM sniffing, then the declared encoding label, then UTF-8).
    pub fn parse_bytes(input: &[u8]) -> Result<Self, FragmentError> {
        let text = parser::decode_to_utf8(input)?;
        Self::parse_str(&text)
    }

    /// Parses XML from a file on disk.
    ///
    /// # Errors
    ///
    /// I/O failures are reported as [`FragmentError::MalformedData`] with
    /// the underlying message; parse failures as usual.
    pub fn parse_file(path: &std::path::Path) -> Result<Self, FragmentError> {
        let bytes = std::fs::read(path)
            .map_err(|e| FragmentError::MalformedData(format!("cannot read {}: {e}", path.display())))?;
        Self::parse_bytes(&bytes)
    }

    // === Document properties ===

    /// The URL this fragment was parsed from, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Sets the document URL.
    pub fn set_url(&mut self, url: Option<&str>) {
        self.url = url.map(str::to_string);
    }

    /// Document-level information from the XML declaration.
    #[must_use]
    pub fn document_information(&self) -> &DocumentInformation {
        &self.info
    }

    /// Replaces the document-level information.
    pub fn set_document_information(&mut self, info: DocumentInformation) {
        self.info = info;
    }

    // === Tree access (used by the accessor layer) ===

    /// The synthetic root container element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The underlying node arena.
    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    // === Streaming cursor ===

    /// Returns the node at the cursor, if any.
    fn cursor_node(&self) -> Option<NodeId> {
        self.arena
            .children(self.current)
            .get(self.position[self.depth])
            .copied()
    }

    /// Returns `true` if the current element has unconsumed content.
    #[must_use]
    pub fn has_more_content(&self) -> bool {
        self.cursor_node().is_some()
    }

    /// Classifies the content at the cursor, or reports end-of-element /
    /// end-of-fragment when the current level is exhausted.
    #[must_use]
    pub fn next_content_type(&self) -> ContentType {
        match self.cursor_node() {
            Some(id) => match &self.arena.node(id).kind {
                NodeKind::Element { .. } => ContentType::Element,
                NodeKind::Text { .. } | NodeKind::CData { .. } => ContentType::Text,
                NodeKind::Comment { .. } => ContentType::Comment,
                NodeKind::ProcessingInstruction { .. } => ContentType::ProcessingInstruction,
            },
            None if self.depth > 0 => ContentType::EndOfElement,
            None => ContentType::EndOfFragment,
        }
    }

    /// Advances the cursor past the next content node without descending
    /// into it. Returns `false` if there was nothing to skip.
    pub fn skip_content(&mut self) -> bool {
        self.flush_pending_text();
        if self.cursor_node().is_some() {
            self.position[self.depth] += 1;
            true
        } else {
            false
        }
    }

    /// Descends into the next element child if its qualified name matches.
    ///
    /// Non-element content before the next element child is skipped. If the
    /// next element child does not match, the cursor is left unchanged and
    /// `false` is returned.
    pub fn enter_element(&mut self, qname: &str) -> bool {
        let name = ExpandedName::from_qname(qname);
        self.enter_matching(|candidate| {
            candidate.local() == name.local() && candidate.prefix() == name.prefix()
        })
    }

    /// Descends into the next element child if its expanded name matches
    /// (URI + local part; the prefix is ignored).
    pub fn enter_element_name(&mut self, name: &ExpandedName) -> bool {
        self.enter_matching(|candidate| candidate.matches(name))
    }

    /// Descends into the next element child regardless of name.
    pub fn enter_any_element(&mut self) -> bool {
        self.enter_matching(|_| true)
    }

    fn enter_matching<F: Fn(&ExpandedName) -> bool>(&mut self, accept: F) -> bool {
        self.flush_pending_text();
        let children = self.arena.children(self.current);
        let start = self.position[self.depth];
        for (offset, &child) in children[start.min(children.len())..].iter().enumerate() {
            if let NodeKind::Element { name, .. } = &self.arena.node(child).kind {
                if accept(name) {
                    let index = start + offset;
                    self.descend(child, index);
                    return true;
                }
                return false;
            }
        }
        false
    }

    fn descend(&mut self, element: NodeId, index: usize) {
        self.position[self.depth] = index;
        self.depth += 1;
        if self.position.len() <= self.depth {
            self.position.push(0);
        } else {
            self.position[self.depth] = 0;
        }
        self.max_depth = self.max_depth.max(self.depth);
        self.current = element;
    }

    /// Pops back to the parent element, advancing past the element just
    /// left.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the fragment's top level — a
    /// `leave_element` with no matching `enter_element`/`open_element` is a
    /// caller bug, not a recoverable condition.
    #[allow(clippy::expect_used)]
    pub fn leave_element(&mut self) {
        assert!(self.depth > 0, "leave_element without matching enter_element");
        self.flush_pending_text();
        let parent = self
            .arena
            .parent(self.current)
            .expect("non-root cursor element must have a parent");
        self.depth -= 1;
        self.current = parent;
        self.position[self.depth] += 1;
    }

    /// Rewinds the cursor to the very beginning of the fragment.
    pub fn restart_fragment(&mut self) {
        self.flush_pending_text();
        self.current = self.root;
        self.depth = 0;
        for slot in &mut self.position {
            *slot = 0;
        }
    }

    /// Rewinds the cursor to the beginning of the current element's content.
    pub fn restart_current_element(&mut self) {
        self.flush_pending_text();
        self.position[self.depth] = 0;
    }

    // === Content reads at the cursor ===

    /// The name of the element at the cursor, if the next content is an
    /// element.
    #[must_use]
    pub fn next_element_name(&self) -> Option<&ExpandedName> {
        let id = self.cursor_node()?;
        self.arena.element_name(id)
    }

    /// The name of the element the cursor is currently inside.
    /// `None` at the fragment's top level.
    #[must_use]
    pub fn current_element_name(&self) -> Option<&ExpandedName> {
        if self.current == self.root {
            None
        } else {
            self.arena.element_name(self.current)
        }
    }

    /// The value of the named attribute on the current element.
    #[must_use]
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.arena.attribute_value(self.current, local)
    }

    /// The attributes of the current element, in document order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        self.arena.attributes(self.current)
    }

    /// The whitespace handling in effect for the current element.
    #[must_use]
    pub fn current_whitespace_mode(&self) -> WhitespaceMode {
        self.arena.whitespace_mode(self.current)
    }

    /// The `xml:lang` value in effect for the current element, from the
    /// nearest ancestor-or-self that declares one.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.inherited_xml_attribute("lang")
    }

    /// The `xml:base` value in effect for the current element, from the
    /// nearest ancestor-or-self that declares one.
    #[must_use]
    pub fn base_uri(&self) -> Option<&str> {
        self.inherited_xml_attribute("base")
    }

    fn inherited_xml_attribute(&self, local: &str) -> Option<&str> {
        let mut node = Some(self.current);
        while let Some(id) = node {
            let found = self
                .arena
                .attributes(id)
                .iter()
                .find(|a| a.name.prefix() == Some("xml") && a.name.local() == local);
            if let Some(attr) = found {
                return Some(&attr.value);
            }
            node = self.arena.parent(id);
        }
        None
    }

    /// Consumes the text node at the cursor, returning its content, or
    /// `None` if the next content is not text.
    pub fn take_text(&mut self) -> Option<String> {
        let id = self.cursor_node()?;
        if !self.arena.node(id).kind.is_character_data() {
            return None;
        }
        let text = self.arena.node_text(id).map(str::to_string);
        self.position[self.depth] += 1;
        text
    }

    /// Concatenated character data of the current element's whole subtree.
    #[must_use]
    pub fn all_text(&self) -> String {
        let mut buf = String::new();
        self.arena.collect_text(self.current, &mut buf);
        buf
    }

    // === Mutation ===

    /// Inserts a new element child at the cursor and descends into it.
    ///
    /// Later siblings shift right. Must be balanced by
    /// [`close_element`](Self::close_element).
    pub fn open_element(&mut self, name: ExpandedName) {
        self.flush_pending_text();
        let inherited = self.arena.whitespace_mode(self.current);
        let element = self.arena.create_element(name);
        self.arena.set_whitespace_mode(element, inherited);
        let index = self.position[self.depth].min(self.arena.children(self.current).len());
        self.arena.insert_child(self.current, index, element);
        self.descend(element, index);
    }

    /// Closes the element opened by the matching
    /// [`open_element`](Self::open_element), popping the cursor back to the
    /// parent and past the closed element.
    ///
    /// # Panics
    ///
    /// Panics on mismatched nesting — this is a contract violation by the
    /// caller, not a recoverable error.
    pub fn close_element(&mut self) {
        assert!(self.depth > 0, "close_element without matching open_element");
        self.leave_element();
    }

    /// Adds or replaces an attribute on the current (open) element.
    ///
    /// An `xml:space` attribute also switches the element's whitespace
    /// handling.
    ///
    /// # Panics
    ///
    /// Panics if no element is open.
    pub fn set_attribute(&mut self, name: ExpandedName, value: &str) {
        self.set_attribute_with_id(name, value, false);
    }

    /// Like [`set_attribute`](Self::set_attribute), with an explicit
    /// ID-attribute flag for callers that know the attribute's type.
    ///
    /// # Panics
    ///
    /// Panics if no element is open.
    pub fn set_attribute_with_id(&mut self, name: ExpandedName, value: &str, is_id: bool) {
        assert!(
            self.current != self.root,
            "set_attribute outside an open element"
        );
        if name.prefix() == Some("xml") && name.local() == "space" {
            let mode = if value == "preserve" {
                WhitespaceMode::Preserve
            } else {
                WhitespaceMode::Default
            };
            self.arena.set_whitespace_mode(self.current, mode);
        }
        self.arena.set_attribute(
            self.current,
            Attribute {
                name,
                value: value.to_string(),
                is_id,
            },
        );
    }

    /// Captures the namespace scope snapshot on the current (open) element.
    pub(crate) fn set_current_ns_scope(&mut self, scope: crate::ns::NsChain) {
        self.arena.set_ns_scope(self.current, scope);
    }

    /// Adds or replaces an attribute from format arguments.
    pub fn set_attribute_format(&mut self, name: ExpandedName, args: std::fmt::Arguments<'_>) {
        self.set_attribute(name, &args.to_string());
    }

    /// Appends character data at the cursor.
    ///
    /// Adjacent text accumulates into one node as long as the whitespace
    /// handling agrees. Outside `xml:space="preserve"` scope the content is
    /// normalized as it arrives — whitespace runs collapse to a single
    /// space, also across chunk boundaries, and edge whitespace is trimmed —
    /// so the tree never holds unnormalized text, and whitespace-only
    /// content never produces a node.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::MixedWhitespace`] when the adjacent text
    /// node was appended under the opposite whitespace handling.
    pub fn add_text(&mut self, text: &str) -> Result<(), FragmentError> {
        let preserve = self.arena.whitespace_mode(self.current) == WhitespaceMode::Preserve;

        if self.pending_text {
            let index = self.position[self.depth] - 1;
            let prev = self.arena.children(self.current)[index];
            if let NodeKind::Text { content, preserved } = &mut self.arena.node_mut(prev).kind {
                if *preserved != preserve {
                    return Err(FragmentError::MixedWhitespace);
                }
                if preserve {
                    content.push_str(text);
                } else {
                    self.pending_space =
                        collapse_whitespace_into(text, content, self.pending_space);
                }
                return Ok(());
            }
        }

        let mut content = String::new();
        if preserve {
            content.push_str(text);
        } else {
            self.pending_space = collapse_whitespace_into(text, &mut content, false);
        }
        if content.is_empty() {
            return Ok(());
        }

        let node = self.arena.create(NodeKind::Text {
            content,
            preserved: preserve,
        });
        let index = self.position[self.depth].min(self.arena.children(self.current).len());
        self.arena.insert_child(self.current, index, node);
        self.position[self.depth] = index + 1;
        self.pending_text = true;
        Ok(())
    }

    /// Appends a CDATA section at the cursor. Content is stored verbatim.
    pub fn add_cdata(&mut self, text: &str) {
        self.flush_pending_text();
        let node = self.arena.create(NodeKind::CData {
            content: text.to_string(),
        });
        self.insert_at_cursor(node);
    }

    /// Appends a comment at the cursor.
    pub fn add_comment(&mut self, text: &str) {
        self.flush_pending_text();
        let node = self.arena.create(NodeKind::Comment {
            content: text.to_string(),
        });
        self.insert_at_cursor(node);
    }

    /// Appends a processing instruction at the cursor.
    pub fn add_processing_instruction(&mut self, target: &str, data: &str) {
        self.flush_pending_text();
        let node = self.arena.create(NodeKind::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        });
        self.insert_at_cursor(node);
    }

    fn insert_at_cursor(&mut self, node: NodeId) {
        let index = self.position[self.depth].min(self.arena.children(self.current).len());
        self.arena.insert_child(self.current, index, node);
        self.position[self.depth] = index + 1;
    }

    /// Ends a text accumulation: the next [`add_text`](Self::add_text)
    /// starts a new node rather than extending the previous one. Content is
    /// normalized as it arrives, so nothing is rewritten here.
    fn flush_pending_text(&mut self) {
        self.pending_text = false;
        self.pending_space = false;
    }

    /// Splices another fragment's top-level content at the cursor.
    ///
    /// A text node at the splice boundary coalesces with an adjacent text
    /// node on either side (when whitespace handling agrees), so splicing
    /// never produces spurious adjacent text nodes.
    ///
    /// Note: the splice copies child by child; it is not atomic as a whole,
    /// but in the absence of allocation failure it always completes.
    pub fn add_fragment(&mut self, other: &XmlFragment) {
        self.flush_pending_text();

        for &top in other.arena.children(other.root) {
            let clone = other.arena.clone_subtree_into(top, &mut self.arena);
            if !self.try_coalesce_before_cursor(clone) {
                self.insert_at_cursor(clone);
            }
        }
        self.try_coalesce_after_cursor();
    }

    /// If `node` is a text node and the node just before the cursor is a
    /// text node with the same whitespace handling, merges `node`'s content
    /// into it. Returns `true` when merged.
    fn try_coalesce_before_cursor(&mut self, node: NodeId) -> bool {
        let index = self.position[self.depth];
        if index == 0 || index > self.arena.children(self.current).len() {
            return false;
        }
        let prev = self.arena.children(self.current)[index - 1];

        let (addition, preserve) = match &self.arena.node(node).kind {
            NodeKind::Text { content, preserved } => (content.clone(), *preserved),
            _ => return false,
        };
        match &mut self.arena.node_mut(prev).kind {
            NodeKind::Text { content, preserved } if *preserved == preserve => {
                content.push_str(&addition);
                true
            }
            _ => false,
        }
    }

    /// Coalesces the node just before the cursor with the node at the
    /// cursor when both are text with the same whitespace handling.
    fn try_coalesce_after_cursor(&mut self) {
        let index = self.position[self.depth];
        if index == 0 {
            return;
        }
        let children = self.arena.children(self.current);
        let (Some(&before), Some(&after)) = (children.get(index - 1), children.get(index)) else {
            return;
        };

        let (addition, preserve) = match &self.arena.node(after).kind {
            NodeKind::Text { content, preserved } => (content.clone(), *preserved),
            _ => return,
        };
        let merged = match &mut self.arena.node_mut(before).kind {
            NodeKind::Text { content, preserved } if *preserved == preserve => {
                content.push_str(&addition);
                true
            }
            _ => false,
        };
        if merged {
            self.arena.remove_child(self.current, index);
        }
    }

    /// Deep-clones the remaining content of the current element — from the
    /// cursor to the end — into a brand-new fragment. All strings are
    /// freshly owned; nothing is shared with this fragment.
    #[must_use]
    pub fn make_sub_fragment(&self) -> XmlFragment {
        let mut sub = XmlFragment::new();
        sub.url = self.url.clone();
        sub.info = self.info.clone();

        let children = self.arena.children(self.current);
        let start = self.position[self.depth].min(children.len());
        for &child in &children[start..] {
            let clone = self.arena.clone_subtree_into(child, &mut sub.arena);
            sub.arena.append_child(sub.root, clone);
        }
        sub
    }

    // === Binary payloads ===

    /// Adds a dedicated child element carrying `data` as base64 text.
    pub fn add_binary_data(&mut self, element_name: &str, data: &[u8]) {
        self.open_element(ExpandedName::from_qname(element_name));
        let encoded = BASE64.encode(data);
        if !encoded.is_empty() {
            // Base64 text contains no whitespace; normalization cannot
            // change it.
            let node = self.arena.create(NodeKind::Text {
                content: encoded,
                preserved: false,
            });
            self.insert_at_cursor(node);
        }
        self.close_element();
    }

    /// Reads back a binary payload written by
    /// [`add_binary_data`](Self::add_binary_data): decodes the base64 text
    /// content of the element at the cursor and advances past it.
    ///
    /// Returns `Ok(None)` when the next content is not an element (a normal
    /// not-found outcome, not an error).
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::MalformedData`] on a base64 alphabet
    /// violation; the cursor is left unchanged.
    pub fn get_binary_data(&mut self) -> Result<Option<Vec<u8>>, FragmentError> {
        let Some(id) = self.cursor_node() else {
            return Ok(None);
        };
        if !self.arena.node(id).kind.is_element() {
            return Ok(None);
        }
        let mut text = String::new();
        self.arena.collect_text(id, &mut text);
        let bytes = BASE64
            .decode(text.trim())
            .map_err(|e| FragmentError::MalformedData(format!("invalid base64 payload: {e}")))?;
        self.position[self.depth] += 1;
        Ok(Some(bytes))
    }

    // === Build finalization (two-phase position allocation) ===

    /// Finalizes a parse: allocates the final-sized position array from the
    /// observed maximum depth and rewinds the cursor to the root. Growing
    /// during the parse and right-sizing once afterwards avoids repeated
    /// reallocation during chunked input.
    pub(crate) fn finish_build(&mut self) {
        self.flush_pending_text();
        self.position = vec![0; self.max_depth + 1];
        self.current = self.root;
        self.depth = 0;
    }
}

impl Default for XmlFragment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build_simple() -> XmlFragment {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("root"));
        frag.set_attribute(ExpandedName::unqualified("id"), "r1");
        frag.open_element(ExpandedName::unqualified("child"));
        frag.add_text("hello").unwrap();
        frag.close_element();
        frag.add_comment("note");
        frag.close_element();
        frag.restart_fragment();
        frag
    }

    #[test]
    fn test_empty_fragment() {
        let frag = XmlFragment::new();
        assert!(!frag.has_more_content());
        assert_eq!(frag.next_content_type(), ContentType::EndOfFragment);
    }

    #[test]
    fn test_open_close_and_walk() {
        let mut frag = build_simple();

        assert_eq!(frag.next_content_type(), ContentType::Element);
        assert!(frag.enter_element("root"));
        assert_eq!(frag.attribute("id"), Some("r1"));

        assert!(frag.enter_element("child"));
        assert_eq!(frag.take_text(), Some("hello".to_string()));
        assert_eq!(frag.next_content_type(), ContentType::EndOfElement);
        frag.leave_element();

        assert_eq!(frag.next_content_type(), ContentType::Comment);
        assert!(frag.skip_content());
        assert_eq!(frag.next_content_type(), ContentType::EndOfElement);
        frag.leave_element();
        assert_eq!(frag.next_content_type(), ContentType::EndOfFragment);
    }

    #[test]
    fn test_enter_element_wrong_name_leaves_cursor() {
        let mut frag = build_simple();
        assert!(!frag.enter_element("other"));
        assert_eq!(frag.next_content_type(), ContentType::Element);
        assert!(frag.enter_element("root"));
    }

    #[test]
    fn test_enter_any_element() {
        let mut frag = build_simple();
        assert!(frag.enter_any_element());
        assert_eq!(
            frag.current_element_name().map(|n| n.local().to_string()),
            Some("root".to_string())
        );
    }

    #[test]
    fn test_restart_fragment_is_idempotent() {
        let mut frag = build_simple();

        let walk = |frag: &mut XmlFragment| {
            let mut names = Vec::new();
            assert!(frag.enter_element("root"));
            while frag.has_more_content() {
                if frag.enter_any_element() {
                    names.push(frag.current_element_name().unwrap().local().to_string());
                    frag.leave_element();
                } else {
                    frag.skip_content();
                }
            }
            frag.leave_element();
            names
        };

        let first = walk(&mut frag);
        frag.restart_fragment();
        let second = walk(&mut frag);
        frag.restart_fragment();
        let third = walk(&mut frag);
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_restart_current_element() {
        let mut frag = build_simple();
        assert!(frag.enter_element("root"));
        assert!(frag.enter_element("child"));
        assert_eq!(frag.take_text(), Some("hello".to_string()));
        assert!(!frag.has_more_content());
        frag.restart_current_element();
        assert_eq!(frag.take_text(), Some("hello".to_string()));
    }

    #[test]
    fn test_add_text_coalesces_chunks() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("p"));
        frag.add_text("hello ").unwrap();
        frag.add_text(" world").unwrap();
        frag.close_element();
        frag.restart_fragment();

        assert!(frag.enter_element("p"));
        // One node, inter-chunk whitespace collapsed to a single space.
        assert_eq!(frag.arena().children(frag.current).len(), 1);
        assert_eq!(frag.take_text(), Some("hello world".to_string()));
    }

    #[test]
    fn test_whitespace_only_text_is_dropped() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("p"));
        frag.add_text("   \n\t ").unwrap();
        frag.close_element();
        frag.restart_fragment();

        assert!(frag.enter_element("p"));
        assert!(!frag.has_more_content());
    }

    #[test]
    fn test_whitespace_only_text_never_creates_a_node() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("p"));
        frag.add_text("  \n ").unwrap();
        // Normalized away on arrival, not at the next navigation call.
        assert!(frag.arena().children(frag.current).is_empty());
    }

    #[test]
    fn test_all_text_during_accumulation_is_normalized() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("p"));
        frag.add_text(" one  ").unwrap();
        frag.add_text("  two ").unwrap();
        assert_eq!(frag.all_text(), "one two");
    }

    #[test]
    fn test_preserve_keeps_whitespace_verbatim() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("pre"));
        frag.set_attribute(ExpandedName::qualified(Some("xml"), "space"), "preserve");
        frag.add_text("  two  spaces  ").unwrap();
        frag.close_element();
        frag.restart_fragment();

        assert!(frag.enter_element("pre"));
        assert_eq!(frag.take_text(), Some("  two  spaces  ".to_string()));
    }

    #[test]
    fn test_mixed_whitespace_is_an_error() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("p"));
        frag.add_text("a").unwrap();
        frag.set_attribute(ExpandedName::qualified(Some("xml"), "space"), "preserve");
        let result = frag.add_text("b");
        assert!(matches!(result, Err(FragmentError::MixedWhitespace)));
    }

    #[test]
    #[should_panic(expected = "close_element without matching open_element")]
    fn test_mismatched_close_panics() {
        let mut frag = XmlFragment::new();
        frag.close_element();
    }

    #[test]
    fn test_make_sub_fragment_clones_remaining_content() {
        let mut frag = build_simple();
        assert!(frag.enter_element("root"));

        let sub = frag.make_sub_fragment();
        // The original cursor still walks normally.
        assert!(frag.enter_element("child"));
        frag.leave_element();

        let mut sub = sub;
        assert!(sub.enter_element("child"));
        assert_eq!(sub.all_text(), "hello");
        sub.leave_element();
        assert_eq!(sub.next_content_type(), ContentType::Comment);
    }

    #[test]
    fn test_make_sub_fragment_from_midpoint() {
        let mut frag = build_simple();
        assert!(frag.enter_element("root"));
        assert!(frag.enter_element("child"));
        frag.leave_element();
        // Cursor is now past <child>; only the comment remains.
        let mut sub = frag.make_sub_fragment();
        assert_eq!(sub.next_content_type(), ContentType::Comment);
        assert!(sub.skip_content());
        assert_eq!(sub.next_content_type(), ContentType::EndOfFragment);
    }

    #[test]
    fn test_add_fragment_merges_boundary_text() {
        let mut target = XmlFragment::new();
        target.open_element(ExpandedName::unqualified("p"));
        target.add_text("A").unwrap();
        // Complete the text node so the splice sees a finished sibling.
        target.add_comment("x");

        let mut source = XmlFragment::new();
        source.add_text("B").unwrap();
        source.open_element(ExpandedName::unqualified("i"));
        source.close_element();

        // Remove the comment so "A" is immediately before the cursor.
        let mut target2 = XmlFragment::new();
        target2.open_element(ExpandedName::unqualified("p"));
        target2.add_text("A").unwrap();

        target2.add_fragment(&source);
        target2.close_element();
        target2.restart_fragment();

        assert!(target2.enter_element("p"));
        let child_count = target2.arena().children(target2.current).len();
        assert_eq!(child_count, 2, "text nodes must have merged: [AB, <i>]");
        assert_eq!(target2.take_text(), Some("AB".to_string()));
        assert!(target2.enter_element("i"));
    }

    #[test]
    fn test_add_fragment_merges_following_text() {
        // Target: <p>[cursor]"Z"</p>; source ends in text "Y".
        let mut target = XmlFragment::new();
        target.open_element(ExpandedName::unqualified("p"));
        target.add_text("Z").unwrap();
        target.close_element();
        target.restart_fragment();
        assert!(target.enter_element("p"));
        // Cursor at start of <p>'s content, before "Z".

        let mut source = XmlFragment::new();
        source.add_text("Y").unwrap();

        target.add_fragment(&source);
        assert_eq!(target.arena().children(target.current).len(), 1);
        target.restart_current_element();
        assert_eq!(target.take_text(), Some("YZ".to_string()));
    }

    #[test]
    fn test_binary_round_trip() {
        for size in [0usize, 1, 3, 57, 4096] {
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

            let mut frag = XmlFragment::new();
            frag.open_element(ExpandedName::unqualified("msg"));
            frag.add_binary_data("blob", &data);
            frag.close_element();
            frag.restart_fragment();

            assert!(frag.enter_element("msg"));
            let decoded = frag.get_binary_data().unwrap().unwrap();
            assert_eq!(decoded, data, "size {size}");
            assert_eq!(frag.next_content_type(), ContentType::EndOfElement);
        }
    }

    #[test]
    fn test_get_binary_data_malformed() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("blob"));
        frag.set_attribute(ExpandedName::qualified(Some("xml"), "space"), "preserve");
        frag.add_text("!!! not base64 !!!").unwrap();
        frag.close_element();
        frag.restart_fragment();

        let result = frag.get_binary_data();
        assert!(matches!(result, Err(FragmentError::MalformedData(_))));
        // Cursor unchanged: the element is still there.
        assert_eq!(frag.next_content_type(), ContentType::Element);
    }

    #[test]
    fn test_get_binary_data_on_non_element() {
        let mut frag = XmlFragment::new();
        frag.add_text("plain").unwrap();
        frag.restart_fragment();
        assert_eq!(frag.get_binary_data().unwrap(), None);
    }

    #[test]
    fn test_set_attribute_format() {
        let mut frag = XmlFragment::new();
        frag.open_element(ExpandedName::unqualified("item"));
        frag.set_attribute_format(ExpandedName::unqualified("n"), format_args!("{:04}", 7));
        assert_eq!(frag.attribute("n"), Some("0007"));
    }

    #[test]
    fn test_take_text_on_element_returns_none() {
        let mut frag = build_simple();
        assert_eq!(frag.take_text(), None);
        assert_eq!(frag.next_content_type(), ContentType::Element);
    }
}

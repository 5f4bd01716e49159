//! Serialization of accessor trees back to XML text.
//!
//! The serializer is generic over [`TreeAccessor`], so any backend — a
//! fragment, an HTML document, anything else implementing the trait —
//! serializes through the same code path and produces the same text for
//! structurally equal trees.

use std::fmt::Write;

use crate::accessor::{AccessorNodeType, FragmentAccessor, TreeAccessor};
use crate::fragment::XmlFragment;

/// Output shaping options for [`serialize_tree`].
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    indent: Option<usize>,
    declaration: bool,
}

impl SerializeOptions {
    /// Compact output, no XML declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-prints with `width` spaces per nesting level. Elements whose
    /// children include character data keep their content on one line.
    #[must_use]
    pub fn indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }

    /// Emits an XML declaration built from the tree's document
    /// information. Skipped when no version is recorded.
    #[must_use]
    pub fn declaration(mut self, yes: bool) -> Self {
        self.declaration = yes;
        self
    }
}

/// Serializes the whole tree under the accessor's root.
#[must_use]
pub fn serialize_tree<A: TreeAccessor>(accessor: &A, options: &SerializeOptions) -> String {
    let mut out = String::new();
    if options.declaration {
        let info = accessor.document_information();
        if let Some(version) = &info.version {
            out.push_str("<?xml version=\"");
            out.push_str(version);
            out.push('"');
            if let Some(encoding) = &info.encoding {
                out.push_str(" encoding=\"");
                out.push_str(encoding);
                out.push('"');
            }
            if let Some(standalone) = info.standalone {
                out.push_str(" standalone=\"");
                out.push_str(if standalone { "yes" } else { "no" });
                out.push('"');
            }
            out.push_str("?>");
            if options.indent.is_some() {
                out.push('\n');
            }
        }
    }

    let root = accessor.root();
    let mut child = accessor.first_child(root);
    let mut first = true;
    while let Some(node) = child {
        if !first {
            if options.indent.is_some() {
                out.push('\n');
            }
        }
        write_node(accessor, node, options, 0, &mut out);
        first = false;
        child = accessor.next_sibling(node);
    }
    out
}

/// Serializes a fragment compactly. Convenience over
/// [`serialize_tree`] with a [`FragmentAccessor`].
#[must_use]
pub fn serialize_fragment(fragment: &XmlFragment) -> String {
    serialize_tree(&FragmentAccessor::new(fragment), &SerializeOptions::new())
}

fn write_node<A: TreeAccessor>(
    accessor: &A,
    node: A::Node,
    options: &SerializeOptions,
    depth: usize,
    out: &mut String,
) {
    match accessor.node_type(node) {
        AccessorNodeType::Root => {}
        AccessorNodeType::Element => write_element(accessor, node, options, depth, out),
        AccessorNodeType::Text => {
            if let Some(text) = accessor.data(node) {
                escape_text(&text, out);
            }
        }
        AccessorNodeType::CData => {
            if let Some(text) = accessor.data(node) {
                out.push_str("<![CDATA[");
                out.push_str(&text);
                out.push_str("]]>");
            }
        }
        AccessorNodeType::Comment => {
            if let Some(text) = accessor.data(node) {
                out.push_str("<!--");
                out.push_str(&text);
                out.push_str("-->");
            }
        }
        AccessorNodeType::ProcessingInstruction => {
            let target = accessor
                .name(node)
                .map(|n| n.local().to_string())
                .unwrap_or_default();
            let data = accessor.data(node).unwrap_or_default();
            out.push_str("<?");
            out.push_str(&target);
            if !data.is_empty() {
                out.push(' ');
                out.push_str(&data);
            }
            out.push_str("?>");
        }
    }
}

fn write_element<A: TreeAccessor>(
    accessor: &A,
    node: A::Node,
    options: &SerializeOptions,
    depth: usize,
    out: &mut String,
) {
    let name = accessor
        .name(node)
        .map(|n| n.qname())
        .unwrap_or_default();
    out.push('<');
    out.push_str(&name);
    for i in 0..accessor.attribute_count(node) {
        if let Some((attr_name, value, _)) = accessor.attribute(node, i) {
            out.push(' ');
            out.push_str(&attr_name.qname());
            out.push_str("=\"");
            escape_attribute(&value, out);
            out.push('"');
        }
    }

    let Some(first) = accessor.first_child(node) else {
        out.push_str("/>");
        return;
    };
    out.push('>');

    // Pretty-printing only restructures element-only content; anything
    // containing character data is kept verbatim on one line.
    let structural = options.indent.is_some() && element_only_children(accessor, node);
    let mut child = Some(first);
    while let Some(current) = child {
        if structural {
            out.push('\n');
            indent_to(options, depth + 1, out);
        }
        write_node(accessor, current, options, depth + 1, out);
        child = accessor.next_sibling(current);
    }
    if structural {
        out.push('\n');
        indent_to(options, depth, out);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn element_only_children<A: TreeAccessor>(accessor: &A, node: A::Node) -> bool {
    let mut child = accessor.first_child(node);
    while let Some(current) = child {
        if matches!(
            accessor.node_type(current),
            AccessorNodeType::Text | AccessorNodeType::CData
        ) {
            return false;
        }
        child = accessor.next_sibling(current);
    }
    true
}

fn indent_to(options: &SerializeOptions, depth: usize, out: &mut String) {
    if let Some(width) = options.indent {
        for _ in 0..depth * width {
            out.push(' ');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

/// Writes a fragment's serialized form into any [`Write`] sink.
///
/// # Errors
///
/// Propagates formatting errors from the sink.
pub fn write_fragment<W: Write>(fragment: &XmlFragment, sink: &mut W) -> std::fmt::Result {
    sink.write_str(&serialize_fragment(fragment))
}

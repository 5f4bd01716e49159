//! Parse-event to fragment-tree builder.
//!
//! [`FragmentBuilder`] implements [`ParseHandler`] and drives the
//! [`XmlFragment`] mutation API from the event stream: it maintains the
//! namespace declaration chain, resolves element and attribute names, and
//! snapshots the in-scope chain onto each element at start-of-content.

use crate::error::FragmentError;
use crate::fragment::{DocumentInformation, XmlFragment};
use crate::ns::{NsChain, NsDeclaration};
use crate::parser::{CharacterDataKind, ElementAction, ParseAction, ParseHandler};
use crate::tree::{ExpandedName, WhitespaceMode};
use crate::util::qname::collapse_whitespace;

/// Builds an [`XmlFragment`] from parse events.
#[derive(Debug, Default)]
pub struct FragmentBuilder {
    fragment: XmlFragment,
    chain: NsChain,
    /// Nesting level of the element currently open (0 at top level).
    level: u32,
    /// Element name buffered between `start_element` and `start_content`,
    /// when its namespace scope becomes known.
    pending_name: Option<ExpandedName>,
    pending_attrs: Vec<(ExpandedName, String, bool)>,
}

impl FragmentBuilder {
    /// Creates a builder with an empty fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes the build and returns the fragment, cursor rewound to the
    /// start.
    #[must_use]
    pub fn finish(mut self) -> XmlFragment {
        self.fragment.finish_build();
        self.fragment
    }

    fn resolve(&self, mut name: ExpandedName, use_default: bool) -> Result<ExpandedName, FragmentError> {
        if NsDeclaration::resolve_name(&self.chain, &mut name, use_default) {
            Ok(name)
        } else {
            Err(FragmentError::MalformedData(format!(
                "undeclared namespace prefix '{}'",
                name.prefix().unwrap_or("")
            )))
        }
    }
}

impl ParseHandler for FragmentBuilder {
    fn start_entity(&mut self, url: Option<&str>, info: &DocumentInformation, _is_reference: bool) {
        self.fragment.set_url(url);
        self.fragment.set_document_information(info.clone());
    }

    fn start_element(&mut self, name: ExpandedName) -> Result<ElementAction, FragmentError> {
        self.pending_name = Some(name);
        self.pending_attrs.clear();
        Ok(ElementAction::Enter)
    }

    fn add_attribute(
        &mut self,
        name: ExpandedName,
        value: String,
        is_id: bool,
    ) -> Result<(), FragmentError> {
        self.pending_attrs.push((name, value, is_id));
        Ok(())
    }

    fn start_content(&mut self) -> Result<(), FragmentError> {
        self.level += 1;

        // Namespace declarations take effect before any name on the element
        // resolves, including the element's own.
        for (name, value, _) in &self.pending_attrs {
            self.chain = NsDeclaration::process_attribute(
                self.chain.take(),
                name,
                value,
                self.level,
            )?;
        }

        let name = self
            .pending_name
            .take()
            .unwrap_or_else(|| ExpandedName::unqualified(""));
        let name = self.resolve(name, true)?;
        self.fragment.open_element(name);

        // The element's own xml:space applies to its other attribute values,
        // so it is installed first.
        let attrs = std::mem::take(&mut self.pending_attrs);
        for (name, value, _) in &attrs {
            if name.prefix() == Some("xml") && name.local() == "space" {
                let resolved = self.resolve(name.clone(), false)?;
                self.fragment.set_attribute(resolved, value);
            }
        }
        let preserve = self.fragment.current_whitespace_mode() == WhitespaceMode::Preserve;

        for (name, value, is_id) in attrs {
            let name = self.resolve(name, false)?;
            if name.prefix() == Some("xml") && name.local() == "space" {
                continue;
            }
            let is_id = is_id
                || (name.prefix() == Some("xml") && name.local() == "id")
                || (name.prefix().is_none() && name.local() == "id");
            let value = if preserve {
                value
            } else {
                collapse_whitespace(&value)
            };
            self.fragment.set_attribute_with_id(name, &value, is_id);
        }

        self.fragment.set_current_ns_scope(self.chain.clone());
        Ok(())
    }

    fn add_character_data(
        &mut self,
        kind: CharacterDataKind,
        text: &str,
    ) -> Result<(), FragmentError> {
        match kind {
            CharacterDataKind::Text => self.fragment.add_text(text),
            CharacterDataKind::CData => {
                self.fragment.add_cdata(text);
                Ok(())
            }
        }
    }

    fn comment(&mut self, text: &str) -> Result<(), FragmentError> {
        self.fragment.add_comment(text);
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), FragmentError> {
        self.fragment.add_processing_instruction(target, data);
        Ok(())
    }

    fn end_element(&mut self) -> Result<ParseAction, FragmentError> {
        self.fragment.close_element();
        self.chain = NsDeclaration::pop(self.chain.take(), self.level);
        self.level -= 1;
        Ok(ParseAction::Continue)
    }
}

//! Recursive descent grammar over fragment content.
//!
//! Fragment content is the content production of XML 1.0 §3.1 applied at the
//! top level: any sequence of elements, character data, CDATA sections,
//! comments, and processing instructions. Unlike a full document, a fragment
//! does not require a single root element.

use crate::error::{ErrorSeverity, FragmentError, ParseError};
use crate::fragment::DocumentInformation;
use crate::parser::input::{
    parse_cdata_content, parse_comment_content, parse_pi_content, parse_xml_decl, FragmentInput,
};
use crate::parser::{CharacterDataKind, ElementAction, ParseAction, ParseHandler, ParseOptions};
use crate::tree::ExpandedName;
use crate::util::qname::validate_qname;

pub(crate) struct EventParser<'a, 'h, H: ParseHandler> {
    /// Low-level input state (position, peek, advance, name parsing).
    input: FragmentInput<'a>,
    options: &'a ParseOptions,
    handler: &'h mut H,
    /// Cleared when the handler returns [`ParseAction::Finished`]; the rest
    /// of the input is then parsed for well-formedness only.
    delivering: bool,
}

impl<'a, 'h, H: ParseHandler> EventParser<'a, 'h, H> {
    pub fn new(input: &'a str, options: &'a ParseOptions, handler: &'h mut H) -> Self {
        Self {
            input: FragmentInput::new(input, options),
            options,
            handler,
            delivering: true,
        }
    }

    /// Main parse entry point. Parses the entire fragment.
    pub fn parse(&mut self) -> Result<(), FragmentError> {
        // Optional XML declaration — must be at the very start, with no
        // leading whitespace (XML 1.0 §2.8).
        let mut info = DocumentInformation::default();
        if self.input.looking_at(b"<?xml ")
            || self.input.looking_at(b"<?xml\t")
            || self.input.looking_at(b"<?xml\r")
            || self.input.looking_at(b"<?xml\n")
        {
            let decl = parse_xml_decl(&mut self.input)?;
            info.version = Some(decl.version);
            info.encoding = decl.encoding;
            info.standalone = decl.standalone;
            self.input.skip_whitespace();
        }
        self.handler.start_entity(None, &info, false);

        self.parse_content(true)?;

        if !self.input.at_end() {
            // The only way parse_content stops early at depth 0 is an
            // end tag with no matching start tag.
            return Err(self.input.fatal("unmatched end tag").into());
        }

        self.handler.end_entity();
        Ok(())
    }

    /// Parses element content (XML 1.0 §3.1 `[43]`). At nesting depth 0
    /// this is the fragment's top level, which ends at end of input.
    fn parse_content(&mut self, emit: bool) -> Result<(), FragmentError> {
        loop {
            if self.input.at_end() {
                if self.input.depth() == 0 || self.options.recover {
                    return Ok(());
                }
                return Err(self
                    .input
                    .fatal("unexpected end of input in element content")
                    .into());
            }

            if self.input.looking_at(b"</") {
                return Ok(());
            }

            if self.input.looking_at(b"<![CDATA[") {
                let content = parse_cdata_content(&mut self.input)?;
                self.check_text_length(content.len())?;
                if emit && self.delivering {
                    self.handler
                        .add_character_data(CharacterDataKind::CData, &content)?;
                }
            } else if self.input.looking_at(b"<!--") {
                let content = parse_comment_content(&mut self.input)?;
                if emit && self.delivering {
                    self.handler.comment(&content)?;
                }
            } else if self.input.looking_at(b"<!DOCTYPE") && self.input.depth() == 0 {
                self.skip_doctype()?;
            } else if self.input.looking_at(b"<?") {
                let (target, data) = parse_pi_content(&mut self.input)?;
                if emit && self.delivering {
                    self.handler.processing_instruction(&target, &data)?;
                }
            } else if self.input.peek() == Some(b'<') {
                self.parse_element(emit)?;
            } else {
                self.parse_char_data(emit)?;
            }
        }
    }

    /// Parses one element: start tag, attributes, content, end tag
    /// (XML 1.0 §3.1 `[40]`, `[41]`, `[42]`, `[44]`).
    fn parse_element(&mut self, emit_parent: bool) -> Result<(), FragmentError> {
        self.input.expect_byte(b'<')?;
        let name = self.input.parse_name()?;
        if let Some(msg) = validate_qname(&name) {
            return Err(self.input.fatal(msg).into());
        }
        self.input.increment_depth()?;

        let mut emit = emit_parent && self.delivering;
        if emit {
            let action = self.handler.start_element(ExpandedName::from_qname(&name))?;
            if action == ElementAction::Skip {
                emit = false;
            }
        }

        // Attributes
        let mut seen: Vec<String> = Vec::new();
        loop {
            let had_ws = self.input.skip_whitespace();
            match self.input.peek() {
                Some(b'>') | Some(b'/') => break,
                None => {
                    return Err(self.input.fatal("unexpected end of input in start tag").into())
                }
                _ => {}
            }
            if !had_ws {
                return Err(self.input.fatal("whitespace required before attribute").into());
            }

            let attr_name = self.input.parse_name()?;
            if let Some(msg) = validate_qname(&attr_name) {
                return Err(self.input.fatal(msg).into());
            }
            if seen.contains(&attr_name) {
                return Err(self
                    .input
                    .fatal(format!("duplicate attribute '{attr_name}'"))
                    .into());
            }
            if seen.len() as u32 >= self.options.max_attributes {
                return Err(self
                    .input
                    .fatal(format!(
                        "attribute count exceeds maximum ({})",
                        self.options.max_attributes
                    ))
                    .into());
            }
            seen.push(attr_name.clone());

            self.input.skip_whitespace();
            self.input.expect_byte(b'=')?;
            self.input.skip_whitespace();
            let value = self
                .input
                .parse_attribute_value(self.options.max_attribute_length)?;

            if emit {
                self.handler
                    .add_attribute(ExpandedName::from_qname(&attr_name), value, false)?;
            }
        }

        if self.input.looking_at(b"/>") {
            self.input.advance(2);
            if emit && self.delivering {
                self.handler.start_content()?;
                self.finish_element()?;
            }
            self.input.decrement_depth();
            return Ok(());
        }

        self.input.expect_byte(b'>')?;
        if emit && self.delivering {
            self.handler.start_content()?;
        }

        self.parse_content(emit)?;

        // End tag
        self.input.expect_str(b"</")?;
        let end_name = self.input.parse_name()?;
        if end_name != name {
            return Err(self
                .input
                .fatal(format!(
                    "mismatched end tag: expected </{name}>, found </{end_name}>"
                ))
                .into());
        }
        self.input.skip_whitespace();
        self.input.expect_byte(b'>')?;

        if emit && self.delivering {
            self.finish_element()?;
        }
        self.input.decrement_depth();
        Ok(())
    }

    fn finish_element(&mut self) -> Result<(), FragmentError> {
        if self.handler.end_element()? == ParseAction::Finished {
            self.delivering = false;
        }
        Ok(())
    }

    /// Parses character data up to the next markup (XML 1.0 §2.4 `[14]`),
    /// resolving references inline.
    fn parse_char_data(&mut self, emit: bool) -> Result<(), FragmentError> {
        let mut text = String::new();

        loop {
            match self.input.peek() {
                None | Some(b'<') => break,
                Some(b'&') => {
                    let resolved = self.input.parse_reference()?;
                    text.push_str(&resolved);
                }
                _ => {
                    // XML 1.0 §2.4: "]]>" is forbidden in character data.
                    if self.input.looking_at(b"]]>") {
                        if self.options.recover {
                            self.input.push_diagnostic(
                                ErrorSeverity::Error,
                                "']]>' not allowed in character data".to_string(),
                            );
                            text.push_str("]]>");
                            self.input.advance(3);
                            continue;
                        }
                        return Err(self
                            .input
                            .fatal("']]>' not allowed in character data")
                            .into());
                    }
                    let ch = self.input.next_char()?;
                    text.push(ch);
                }
            }
            self.check_text_length(text.len())?;
        }

        if emit && self.delivering && !text.is_empty() {
            self.handler
                .add_character_data(CharacterDataKind::Text, &text)?;
        }
        Ok(())
    }

    /// Consumes a DOCTYPE declaration without interpreting it. DTD content
    /// carries no fragment semantics here; a diagnostic records the skip.
    fn skip_doctype(&mut self) -> Result<(), ParseError> {
        self.input.expect_str(b"<!DOCTYPE")?;
        self.input
            .push_diagnostic(ErrorSeverity::Warning, "DOCTYPE declaration ignored".to_string());
        let mut brackets = 0u32;
        loop {
            match self.input.next_byte()? {
                b'[' => brackets += 1,
                b']' => brackets = brackets.saturating_sub(1),
                b'>' if brackets == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    fn check_text_length(&self, len: usize) -> Result<(), FragmentError> {
        if len > self.options.max_text_length {
            return Err(self
                .input
                .fatal(format!(
                    "text length exceeds maximum ({})",
                    self.options.max_text_length
                ))
                .into());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::parse_events;
    use pretty_assertions::assert_eq;

    /// Records every delivered event as a readable line.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        skip_elements: Vec<&'static str>,
        finish_after: Option<&'static str>,
    }

    impl ParseHandler for Recorder {
        fn start_entity(
            &mut self,
            _url: Option<&str>,
            info: &DocumentInformation,
            is_reference: bool,
        ) {
            self.events.push(format!(
                "entity version={:?} reference={is_reference}",
                info.version
            ));
        }

        fn start_element(&mut self, name: ExpandedName) -> Result<ElementAction, FragmentError> {
            let qname = name.qname();
            self.events.push(format!("start {qname}"));
            if self.skip_elements.contains(&qname.as_str()) {
                Ok(ElementAction::Skip)
            } else {
                Ok(ElementAction::Enter)
            }
        }

        fn add_attribute(
            &mut self,
            name: ExpandedName,
            value: String,
            _is_id: bool,
        ) -> Result<(), FragmentError> {
            self.events.push(format!("attr {}={value}", name.qname()));
            Ok(())
        }

        fn start_content(&mut self) -> Result<(), FragmentError> {
            self.events.push("content".to_string());
            Ok(())
        }

        fn add_character_data(
            &mut self,
            kind: CharacterDataKind,
            text: &str,
        ) -> Result<(), FragmentError> {
            let tag = match kind {
                CharacterDataKind::Text => "text",
                CharacterDataKind::CData => "cdata",
            };
            self.events.push(format!("{tag} {text}"));
            Ok(())
        }

        fn comment(&mut self, text: &str) -> Result<(), FragmentError> {
            self.events.push(format!("comment {text}"));
            Ok(())
        }

        fn processing_instruction(
            &mut self,
            target: &str,
            data: &str,
        ) -> Result<(), FragmentError> {
            self.events.push(format!("pi {target} {data}"));
            Ok(())
        }

        fn end_element(&mut self) -> Result<ParseAction, FragmentError> {
            self.events.push("end".to_string());
            if let Some(trigger) = self.finish_after {
                if self.events.iter().any(|e| e == &format!("start {trigger}")) {
                    return Ok(ParseAction::Finished);
                }
            }
            Ok(ParseAction::Continue)
        }

        fn end_entity(&mut self) {
            self.events.push("end-entity".to_string());
        }
    }

    fn record(input: &str) -> Vec<String> {
        record_with(input, Recorder::default())
    }

    fn record_with(input: &str, mut recorder: Recorder) -> Vec<String> {
        parse_events(input, &ParseOptions::default(), &mut recorder).unwrap();
        recorder.events
    }

    #[test]
    fn test_simple_element() {
        let events = record("<a x=\"1\">hi</a>");
        assert_eq!(
            events,
            vec![
                "entity version=None reference=false",
                "start a",
                "attr x=1",
                "content",
                "text hi",
                "end",
                "end-entity",
            ]
        );
    }

    #[test]
    fn test_self_closing_element_gets_content_event() {
        let events = record("<a/>");
        assert_eq!(
            events,
            vec!["entity version=None reference=false", "start a", "content", "end", "end-entity"]
        );
    }

    #[test]
    fn test_nested_elements() {
        let events = record("<a><b/></a>");
        assert_eq!(
            events,
            vec![
                "entity version=None reference=false",
                "start a",
                "content",
                "start b",
                "content",
                "end",
                "end",
                "end-entity",
            ]
        );
    }

    #[test]
    fn test_multiple_top_level_nodes() {
        let events = record("<a/>between<b/>");
        assert!(events.contains(&"text between".to_string()));
        assert_eq!(events.iter().filter(|e| e.starts_with("start")).count(), 2);
    }

    #[test]
    fn test_xml_declaration_info() {
        let events = record("<?xml version=\"1.0\"?><a/>");
        assert_eq!(events[0], "entity version=Some(\"1.0\") reference=false");
    }

    #[test]
    fn test_comment_cdata_pi() {
        let events = record("<a><!--c--><![CDATA[<x>]]><?t d?></a>");
        assert!(events.contains(&"comment c".to_string()));
        assert!(events.contains(&"cdata <x>".to_string()));
        assert!(events.contains(&"pi t d".to_string()));
    }

    #[test]
    fn test_entity_references_resolved_in_text() {
        let events = record("<a>a &amp; b &#x21;</a>");
        assert!(events.contains(&"text a & b !".to_string()));
    }

    #[test]
    fn test_skip_suppresses_subtree() {
        let recorder = Recorder {
            skip_elements: vec!["noise"],
            ..Recorder::default()
        };
        let events = record_with("<a><noise x=\"1\"><deep/></noise><b/></a>", recorder);
        assert!(events.contains(&"start noise".to_string()));
        assert!(!events.contains(&"attr x=1".to_string()));
        assert!(!events.contains(&"start deep".to_string()));
        assert!(events.contains(&"start b".to_string()));
    }

    #[test]
    fn test_finished_stops_delivery_but_not_checking() {
        let recorder = Recorder {
            finish_after: Some("first"),
            ..Recorder::default()
        };
        let events = record_with("<first/><second/>", recorder);
        assert!(!events.contains(&"start second".to_string()));

        // Malformed input after the finish point still fails.
        let mut recorder = Recorder {
            finish_after: Some("first"),
            ..Recorder::default()
        };
        let result = parse_events("<first/><bad", &ParseOptions::default(), &mut recorder);
        assert!(result.is_err());
    }

    #[test]
    fn test_mismatched_end_tag() {
        let mut recorder = Recorder::default();
        let result = parse_events("<a></b>", &ParseOptions::default(), &mut recorder);
        assert!(matches!(result, Err(FragmentError::Parse(_))));
    }

    #[test]
    fn test_unmatched_end_tag_at_top_level() {
        let mut recorder = Recorder::default();
        let result = parse_events("</a>", &ParseOptions::default(), &mut recorder);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_attribute() {
        let mut recorder = Recorder::default();
        let result = parse_events("<a x=\"1\" x=\"2\"/>", &ParseOptions::default(), &mut recorder);
        assert!(result.is_err());
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions::default().max_depth(3);
        let mut recorder = Recorder::default();
        let result = parse_events("<a><b><c><d/></c></b></a>", &options, &mut recorder);
        assert!(result.is_err());
    }

    #[test]
    fn test_cdata_end_in_text_is_fatal() {
        let mut recorder = Recorder::default();
        let result = parse_events("<a>bad ]]> text</a>", &ParseOptions::default(), &mut recorder);
        assert!(result.is_err());
    }

    #[test]
    fn test_doctype_is_skipped_with_diagnostic() {
        let events = record("<!DOCTYPE root [<!ENTITY x \"y\">]><a/>");
        assert!(events.contains(&"start a".to_string()));
    }

    #[test]
    fn test_invalid_qname_rejected() {
        let mut recorder = Recorder::default();
        let result = parse_events("<a:b:c/>", &ParseOptions::default(), &mut recorder);
        assert!(result.is_err());
    }
}

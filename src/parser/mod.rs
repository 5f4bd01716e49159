//! XML fragment parser.
//!
//! A hand-rolled recursive descent parser over fragment content: a sequence
//! of elements, character data, comments, and processing instructions, with
//! an optional XML declaration up front. The parser is event-driven — it
//! feeds a [`ParseHandler`] rather than building a tree itself, so the same
//! grammar serves tree building ([`crate::fragment::builder::FragmentBuilder`])
//! and any custom consumer.
//!
//! The parser is hand-rolled (not combinator-based) because error recovery
//! and the skip/finish handler protocol need fine-grained control over parse
//! state, and chunked input needs a cheap restart.

pub(crate) mod input;
mod events;
pub mod push;

pub use push::FragmentParser;

use crate::error::FragmentError;
use crate::fragment::DocumentInformation;
use crate::tree::ExpandedName;

use input::{
    DEFAULT_MAX_ATTRIBUTES, DEFAULT_MAX_ATTRIBUTE_LENGTH, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_ENTITY_EXPANSIONS, DEFAULT_MAX_NAME_LENGTH, DEFAULT_MAX_TEXT_LENGTH,
};

/// Parse options controlling parser behavior and security limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use xmlfrag::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .recover(true)
///     .max_depth(128);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// If true, attempt to recover from errors and deliver what was parsed.
    pub recover: bool,

    // -- Security limits --
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum number of attributes on a single element (default: 256).
    pub max_attributes: u32,
    /// Maximum length in bytes of a single attribute value (default: 10 MB).
    pub max_attribute_length: usize,
    /// Maximum length in bytes of a single text node (default: 10 MB).
    pub max_text_length: usize,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
    /// Maximum number of entity reference expansions per input (default: 10,000).
    pub max_entity_expansions: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            recover: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_attribute_length: DEFAULT_MAX_ATTRIBUTE_LENGTH,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_entity_expansions: DEFAULT_MAX_ENTITY_EXPANSIONS,
        }
    }
}

impl ParseOptions {
    /// Enables or disables error recovery mode.
    #[must_use]
    pub fn recover(mut self, yes: bool) -> Self {
        self.recover = yes;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of attributes per element.
    #[must_use]
    pub fn max_attributes(mut self, max: u32) -> Self {
        self.max_attributes = max;
        self
    }

    /// Sets the maximum attribute value length in bytes.
    #[must_use]
    pub fn max_attribute_length(mut self, max: usize) -> Self {
        self.max_attribute_length = max;
        self
    }

    /// Sets the maximum text node length in bytes.
    #[must_use]
    pub fn max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    /// Sets the maximum number of entity reference expansions.
    #[must_use]
    pub fn max_entity_expansions(mut self, max: u32) -> Self {
        self.max_entity_expansions = max;
        self
    }
}

/// What the handler wants done with an element it was just told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction {
    /// Deliver the element's attributes, content, and end event.
    Enter,
    /// Consume the element's whole subtree silently; the handler receives
    /// no further events for it, not even its end.
    Skip,
}

/// Whether to keep delivering events after an element ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAction {
    /// Keep going.
    Continue,
    /// The handler has what it needs; suppress all remaining events. The
    /// rest of the input is still checked for well-formedness.
    Finished,
}

/// Distinguishes plain character data from CDATA sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterDataKind {
    /// Ordinary character data, subject to whitespace handling.
    Text,
    /// A CDATA section, stored verbatim.
    CData,
}

/// Receiver of parse events.
///
/// Events for one element arrive in a fixed order: `start_element`, one
/// `add_attribute` per attribute, `start_content` once the start tag is
/// complete, the element's content events, then `end_element`.
pub trait ParseHandler {
    /// Called once before any content, with the source URL (if known) and
    /// the XML declaration data. `is_reference` distinguishes an entity
    /// parsed because another entity referenced it from the document entity
    /// itself; this parser reads no external entities, so it always reports
    /// `false`.
    fn start_entity(
        &mut self,
        _url: Option<&str>,
        _info: &DocumentInformation,
        _is_reference: bool,
    ) {
    }

    /// An element start tag has been seen. The name is not yet
    /// namespace-resolved; declarations can still arrive as attributes.
    ///
    /// # Errors
    ///
    /// A handler error aborts the parse.
    fn start_element(&mut self, name: ExpandedName) -> Result<ElementAction, FragmentError>;

    /// One attribute of the current start tag.
    ///
    /// # Errors
    ///
    /// A handler error aborts the parse.
    fn add_attribute(
        &mut self,
        name: ExpandedName,
        value: String,
        is_id: bool,
    ) -> Result<(), FragmentError>;

    /// The start tag is complete; content follows.
    ///
    /// # Errors
    ///
    /// A handler error aborts the parse.
    fn start_content(&mut self) -> Result<(), FragmentError>;

    /// Character data (text or CDATA) inside the current element.
    ///
    /// # Errors
    ///
    /// A handler error aborts the parse.
    fn add_character_data(
        &mut self,
        kind: CharacterDataKind,
        text: &str,
    ) -> Result<(), FragmentError>;

    /// A comment.
    ///
    /// # Errors
    ///
    /// A handler error aborts the parse.
    fn comment(&mut self, _text: &str) -> Result<(), FragmentError> {
        Ok(())
    }

    /// A processing instruction.
    ///
    /// # Errors
    ///
    /// A handler error aborts the parse.
    fn processing_instruction(&mut self, _target: &str, _data: &str) -> Result<(), FragmentError> {
        Ok(())
    }

    /// The current element's end tag has been seen.
    ///
    /// # Errors
    ///
    /// A handler error aborts the parse.
    fn end_element(&mut self) -> Result<ParseAction, FragmentError>;

    /// Called once when the input is exhausted.
    fn end_entity(&mut self) {}
}

/// Parses fragment content from a string, delivering events to `handler`.
///
/// # Errors
///
/// Returns [`FragmentError`] when the input is not well-formed (and recovery
/// is off) or when the handler reports an error.
pub fn parse_events(
    input: &str,
    options: &ParseOptions,
    handler: &mut impl ParseHandler,
) -> Result<(), FragmentError> {
    let mut parser = events::EventParser::new(input, options, handler);
    parser.parse()
}

// -------------------------------------------------------------------------
// Encoding detection (XML 1.0 §4.3.3, Appendix F)
// -------------------------------------------------------------------------

/// Decodes raw XML bytes into UTF-8, sniffing the encoding: a byte order
/// mark wins, then the declaration's `encoding=` label, then UTF-8.
///
/// # Errors
///
/// Returns [`FragmentError::MalformedData`] for unknown encoding labels or
/// byte sequences invalid in the chosen encoding.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, FragmentError> {
    let (bom_label, skip) = sniff_bom(bytes);
    let content = &bytes[skip..];

    if let Some(label) = bom_label {
        return transcode(content, label);
    }

    // No BOM. Try UTF-8 directly; fall back to the declared label, which is
    // readable as ASCII even when the body is not UTF-8.
    if let Ok(text) = std::str::from_utf8(content) {
        match declared_encoding(content) {
            Some(label) if !label.eq_ignore_ascii_case("utf-8") => transcode(content, &label),
            _ => Ok(text.to_string()),
        }
    } else if let Some(label) = declared_encoding(content) {
        transcode(content, &label)
    } else {
        Err(FragmentError::MalformedData(
            "input is not valid UTF-8 and declares no encoding".to_string(),
        ))
    }
}

fn sniff_bom(bytes: &[u8]) -> (Option<&'static str>, usize) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        (Some("UTF-8"), 3)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        (Some("UTF-16BE"), 2)
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        (Some("UTF-16LE"), 2)
    } else {
        (None, 0)
    }
}

fn transcode(bytes: &[u8], label: &str) -> Result<String, FragmentError> {
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        FragmentError::MalformedData(format!("unsupported encoding: {label}"))
    })?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FragmentError::MalformedData(format!(
            "malformed byte sequence for encoding {label}"
        )));
    }
    Ok(text.into_owned())
}

/// Scans the leading bytes for `<?xml ... encoding="..."?>`. The declaration
/// is ASCII-compatible in every supported encoding, so a byte scan suffices.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(256)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..end];

    let pos = decl.windows(8).position(|w| w == b"encoding")?;
    let mut rest = &decl[pos + 8..];
    rest = trim_ascii_start(rest);
    rest = rest.strip_prefix(b"=")?;
    rest = trim_ascii_start(rest);

    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[1..];
    let close = value.iter().position(|&b| b == quote)?;
    let label = &value[..close];
    label
        .iter()
        .all(u8::is_ascii)
        .then(|| String::from_utf8_lossy(label).into_owned())
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

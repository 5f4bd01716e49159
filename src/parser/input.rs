//! Low-level input handling for the fragment parser.
//!
//! [`FragmentInput`] encapsulates the raw byte stream, position tracking
//! (line, column, byte offset), and common parsing primitives: peeking,
//! advancing, name parsing, and entity reference resolution.
//!
//! # Security
//!
//! The input tracks nesting depth and entity expansion count to guard
//! against denial-of-service input:
//!
//! - **Depth limit**: prevents stack overflow from deeply nested elements.
//! - **Entity expansion limit**: only the five built-in XML entities are
//!   supported, so recursive expansion is impossible, but the limit still
//!   bounds documents with an unreasonable number of references.
//! - **Name length limit**: prevents memory exhaustion from huge names.
//!
//! No external entity loading is performed (immune to XXE).

use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};
use crate::util::qname::{is_name_char, is_name_start_char};

// -------------------------------------------------------------------------
// Security defaults
// -------------------------------------------------------------------------

/// Default maximum element nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

/// Default maximum number of attributes on a single element.
pub(crate) const DEFAULT_MAX_ATTRIBUTES: u32 = 256;

/// Default maximum length (in bytes) of an attribute value.
pub(crate) const DEFAULT_MAX_ATTRIBUTE_LENGTH: usize = 10 * 1024 * 1024; // 10 MB

/// Default maximum length (in bytes) of a text node.
pub(crate) const DEFAULT_MAX_TEXT_LENGTH: usize = 10 * 1024 * 1024; // 10 MB

/// Default maximum length (in bytes) of an element or attribute name.
pub(crate) const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// Default maximum number of entity expansions per input.
pub(crate) const DEFAULT_MAX_ENTITY_EXPANSIONS: u32 = 10_000;

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2 `[2]`.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Low-level input state for the fragment parser.
///
/// Tracks the byte stream, position (line/column/offset), nesting depth,
/// entity expansion count, and accumulated diagnostics.
pub(crate) struct FragmentInput<'a> {
    /// The input bytes (must be valid UTF-8).
    input: &'a [u8],

    /// Current byte offset in `input`.
    pos: usize,

    /// Current line number (1-based).
    line: u32,

    /// Current column number (1-based).
    column: u32,

    /// Current element nesting depth.
    depth: u32,

    /// Maximum allowed nesting depth.
    max_depth: u32,

    /// Maximum allowed name length in bytes.
    max_name_length: usize,

    /// Number of entity references expanded so far.
    entity_expansions: u32,

    /// Maximum allowed entity expansions.
    max_entity_expansions: u32,

    /// Whether the parser is in error-recovery mode.
    recover: bool,

    /// Accumulated diagnostics (warnings and recoverable errors).
    pub(crate) diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> FragmentInput<'a> {
    /// Creates a new input over a UTF-8 string with the given limits.
    pub fn new(input: &'a str, options: &super::ParseOptions) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            max_depth: options.max_depth,
            max_name_length: options.max_name_length,
            entity_expansions: 0,
            max_entity_expansions: options.max_entity_expansions,
            recover: options.recover,
            diagnostics: Vec::new(),
        }
    }

    /// Returns whether recovery mode is enabled.
    pub fn recover(&self) -> bool {
        self.recover
    }

    // -- Depth tracking --

    /// Increments the nesting depth. Returns an error if the limit is
    /// exceeded.
    pub fn increment_depth(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.fatal(format!(
                "maximum nesting depth exceeded ({})",
                self.max_depth
            )));
        }
        Ok(())
    }

    /// Decrements the nesting depth (saturating at 0).
    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Returns the current nesting depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    // -- Position queries --

    /// Returns the current source location.
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    /// Returns `true` if all input has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    // -- Peek operations --

    /// Returns the byte at the current position without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Returns the byte at `current_position + offset` without consuming.
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Returns the character at the current position without consuming it.
    pub fn peek_char(&self) -> Option<char> {
        if self.at_end() {
            return None;
        }
        std::str::from_utf8(&self.input[self.pos..])
            .ok()
            .and_then(|s| s.chars().next())
    }

    // -- Advance operations --

    /// Advances the position by `count` bytes, updating line/column.
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.pos < self.input.len() {
                if self.input[self.pos] == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                self.pos += 1;
            }
        }
    }

    /// Advances by one UTF-8 character, updating line/column.
    fn advance_char(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += ch.len_utf8();
    }

    /// Consumes and returns the next byte, or returns an error at EOF.
    pub fn next_byte(&mut self) -> Result<u8, ParseError> {
        if self.at_end() {
            return Err(self.fatal("unexpected end of input"));
        }
        let b = self.input[self.pos];
        self.advance(1);
        Ok(b)
    }

    /// Consumes and returns the next character with `\r\n` normalization
    /// (XML 1.0 §2.11) and character validation (XML 1.0 §2.2).
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        self.advance_char(ch);
        if ch == '\r' {
            if self.peek() == Some(b'\n') {
                self.advance(1);
            }
            return Ok('\n');
        }
        if !is_xml_char(ch) {
            if self.recover {
                self.push_diagnostic(
                    ErrorSeverity::Error,
                    format!("invalid XML character: U+{:04X}", ch as u32),
                );
            } else {
                return Err(self.fatal(format!("invalid XML character: U+{:04X}", ch as u32)));
            }
        }
        Ok(ch)
    }

    // -- Expect operations --

    /// Consumes the next byte and asserts it matches `expected`.
    pub fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        let b = self.next_byte()?;
        if b != expected {
            return Err(self.fatal(format!(
                "expected '{}', found '{}'",
                expected as char, b as char
            )));
        }
        Ok(())
    }

    /// Consumes bytes and asserts they match the `expected` sequence.
    pub fn expect_str(&mut self, expected: &[u8]) -> Result<(), ParseError> {
        for &b in expected {
            self.expect_byte(b)?;
        }
        Ok(())
    }

    // -- Lookahead --

    /// Returns `true` if the remaining input starts with `s`.
    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    // -- Whitespace --

    /// Skips whitespace characters. Returns `true` if any were consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\r' | b'\n') {
                self.advance(1);
            } else {
                break;
            }
        }
        self.pos > start
    }

    /// Skips whitespace, returning an error if none is found.
    pub fn skip_whitespace_required(&mut self) -> Result<(), ParseError> {
        if !self.skip_whitespace() {
            return Err(self.fatal("whitespace required"));
        }
        Ok(())
    }

    // -- Take while --

    /// Consumes bytes while `pred` returns `true` and returns the string.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if pred(b) {
                self.advance(1);
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).to_string()
    }

    // -- Name parsing (XML 1.0 §2.3) --

    /// Parses an XML `Name` per XML 1.0 §2.3 production `[5]`.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let first = self
            .peek_char()
            .ok_or_else(|| self.fatal("expected name, found end of input"))?;
        if !is_name_start_char(first) {
            return Err(self.fatal(format!("invalid name start character: '{first}'")));
        }
        self.advance_char(first);

        while let Some(ch) = self.peek_char() {
            if is_name_char(ch) {
                self.advance_char(ch);
            } else {
                break;
            }
        }

        let len = self.pos - start;
        if len > self.max_name_length {
            return Err(self.fatal(format!(
                "name length ({len}) exceeds maximum ({})",
                self.max_name_length
            )));
        }

        let name = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.fatal("invalid UTF-8 in name"))?;
        Ok(name.to_string())
    }

    // -- Reference parsing (XML 1.0 §4.1) --

    /// Parses an entity or character reference (`&...;`).
    ///
    /// Handles the five built-in XML entities (`amp`, `lt`, `gt`, `apos`,
    /// `quot`) and decimal/hexadecimal character references. Increments the
    /// expansion counter and errors if the limit is exceeded.
    pub fn parse_reference(&mut self) -> Result<String, ParseError> {
        self.entity_expansions += 1;
        if self.entity_expansions > self.max_entity_expansions {
            return Err(self.fatal(format!(
                "entity expansion limit exceeded ({})",
                self.max_entity_expansions
            )));
        }

        self.expect_byte(b'&')?;

        if self.peek() == Some(b'#') {
            self.advance(1);
            let value = if self.peek() == Some(b'x') {
                self.advance(1);
                let hex = self.take_while(|b| b.is_ascii_hexdigit());
                if hex.is_empty() {
                    return Err(self.fatal("empty hex character reference"));
                }
                u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.fatal("invalid hex character reference"))?
            } else {
                let dec = self.take_while(|b| b.is_ascii_digit());
                if dec.is_empty() {
                    return Err(self.fatal("empty decimal character reference"));
                }
                dec.parse::<u32>()
                    .map_err(|_| self.fatal("invalid decimal character reference"))?
            };
            self.expect_byte(b';')?;

            let ch = char::from_u32(value)
                .ok_or_else(|| self.fatal(format!("invalid character reference: U+{value:04X}")))?;
            if !is_xml_char(ch) {
                return Err(self.fatal(format!(
                    "character reference &#x{value:X}; does not refer to a valid XML character"
                )));
            }
            Ok(ch.to_string())
        } else {
            let name = self.parse_name()?;
            self.expect_byte(b';')?;

            match name.as_str() {
                "amp" => Ok("&".to_string()),
                "lt" => Ok("<".to_string()),
                "gt" => Ok(">".to_string()),
                "apos" => Ok("'".to_string()),
                "quot" => Ok("\"".to_string()),
                _ if self.recover => {
                    self.push_diagnostic(
                        ErrorSeverity::Warning,
                        format!("unknown entity reference: &{name};"),
                    );
                    Ok(String::new())
                }
                _ => Err(self.fatal(format!("unknown entity reference: &{name};"))),
            }
        }
    }

    // -- Attribute value parsing (XML 1.0 §3.3.3) --

    /// Parses a quoted attribute value with entity resolution and
    /// whitespace normalization (tab, CR, LF become spaces).
    pub fn parse_attribute_value(&mut self, max_length: usize) -> Result<String, ParseError> {
        let quote = self.next_byte()?;
        if quote != b'"' && quote != b'\'' {
            return Err(self.fatal("attribute value must be quoted"));
        }

        let mut value = String::new();
        loop {
            let b = self
                .peek()
                .ok_or_else(|| self.fatal("unexpected end of input in attribute value"))?;
            if b == quote {
                self.advance(1);
                break;
            }
            if b == b'&' {
                let resolved = self.parse_reference()?;
                value.push_str(&resolved);
            } else if b == b'<' {
                return Err(self.fatal("'<' not allowed in attribute values"));
            } else {
                let ch = self.next_char()?;
                if matches!(ch, '\t' | '\n' | '\r') {
                    value.push(' ');
                } else {
                    value.push(ch);
                }
            }
            if value.len() > max_length {
                return Err(self.fatal(format!(
                    "attribute value length exceeds maximum ({max_length})"
                )));
            }
        }

        Ok(value)
    }

    /// Parses a simple quoted value (single or double quotes, no entity
    /// resolution).
    pub fn parse_quoted_value(&mut self) -> Result<String, ParseError> {
        let quote = self.next_byte()?;
        if quote != b'"' && quote != b'\'' {
            return Err(self.fatal("expected quoted value"));
        }
        let start = self.pos;
        while !self.at_end() && self.peek() != Some(quote) {
            self.advance(1);
        }
        let value = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.fatal("invalid UTF-8 in quoted value"))?
            .to_string();
        self.expect_byte(quote)?;
        Ok(value)
    }

    // -- Error helpers --

    /// Creates a fatal `ParseError` at the current location.
    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Appends a diagnostic (warning or recoverable error) to the list.
    pub fn push_diagnostic(&mut self, severity: ErrorSeverity, message: String) {
        self.diagnostics.push(ParseDiagnostic {
            severity,
            message,
            location: self.location(),
        });
    }
}

// -------------------------------------------------------------------------
// Common XML parsing helpers
// -------------------------------------------------------------------------

/// Parses an XML comment (`<!-- ... -->`), returning the content text.
///
/// The opening `<!--` must not have been consumed yet.
pub(crate) fn parse_comment_content(input: &mut FragmentInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<!--")?;
    let mut content = String::new();

    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in comment"));
        }
        if input.looking_at(b"-->") {
            input.advance(3);
            break;
        }
        // XML 1.0 forbids -- inside comments
        if input.looking_at(b"--") {
            if input.recover() {
                input.push_diagnostic(
                    ErrorSeverity::Error,
                    "'--' not allowed inside comments".to_string(),
                );
                content.push_str("--");
                input.advance(2);
            } else {
                return Err(input.fatal("'--' not allowed inside comments"));
            }
        } else {
            let ch = input.next_char()?;
            content.push(ch);
        }
    }

    Ok(content)
}

/// Parses a CDATA section (`<![CDATA[ ... ]]>`), returning the content text.
///
/// The opening `<![CDATA[` must not have been consumed yet.
pub(crate) fn parse_cdata_content(input: &mut FragmentInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<![CDATA[")?;
    let mut content = String::new();

    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in CDATA section"));
        }
        if input.looking_at(b"]]>") {
            input.advance(3);
            break;
        }
        let ch = input.next_char()?;
        content.push(ch);
    }

    Ok(content)
}

/// Parses a processing instruction (`<?target data?>`), returning
/// `(target, data)`.
///
/// The opening `<?` must not have been consumed yet.
pub(crate) fn parse_pi_content(
    input: &mut FragmentInput<'_>,
) -> Result<(String, String), ParseError> {
    input.expect_str(b"<?")?;
    let target = input.parse_name()?;

    // "xml" (case-insensitive) is reserved for the XML declaration
    if target.eq_ignore_ascii_case("xml") {
        return Err(input.fatal("PI target 'xml' is reserved"));
    }
    // Namespaces in XML 1.0 §3: PI targets must be NCNames (no colons).
    if target.contains(':') {
        return Err(input.fatal("PI target must not contain a colon"));
    }

    let data = if input.skip_whitespace() {
        let mut data = String::new();
        loop {
            if input.at_end() {
                return Err(input.fatal("unexpected end of input in processing instruction"));
            }
            if input.looking_at(b"?>") {
                input.advance(2);
                break;
            }
            let ch = input.next_char()?;
            data.push(ch);
        }
        data
    } else {
        input.expect_str(b"?>")?;
        String::new()
    };

    Ok((target, data))
}

/// Parsed XML declaration data.
#[derive(Debug, Clone)]
pub(crate) struct XmlDeclaration {
    /// XML version (e.g. `"1.0"`).
    pub version: String,
    /// Optional encoding declaration.
    pub encoding: Option<String>,
    /// Optional standalone declaration.
    pub standalone: Option<bool>,
}

/// Parses an XML declaration (`<?xml version="1.0" ...?>`).
///
/// The opening `<?xml` must not have been consumed yet (but should be
/// verified by the caller via `looking_at`).
pub(crate) fn parse_xml_decl(input: &mut FragmentInput<'_>) -> Result<XmlDeclaration, ParseError> {
    input.expect_str(b"<?xml")?;
    input.skip_whitespace_required()?;

    // version is required
    input.expect_str(b"version")?;
    input.skip_whitespace();
    input.expect_byte(b'=')?;
    input.skip_whitespace();
    let version = input.parse_quoted_value()?;

    // XML 1.0 §2.8: VersionNum ::= '1.' [0-9]+
    if !is_valid_version_num(&version) {
        return Err(input.fatal(format!("invalid version number: '{version}'")));
    }

    let had_ws = input.skip_whitespace();
    let encoding = if input.looking_at(b"encoding") {
        if !had_ws {
            return Err(input.fatal("whitespace required before encoding"));
        }
        input.expect_str(b"encoding")?;
        input.skip_whitespace();
        input.expect_byte(b'=')?;
        input.skip_whitespace();
        let enc = input.parse_quoted_value()?;
        if !is_valid_encoding_name(&enc) {
            return Err(input.fatal(format!("invalid encoding name: '{enc}'")));
        }
        Some(enc)
    } else {
        None
    };

    let had_ws2 = input.skip_whitespace() || (encoding.is_none() && had_ws);
    let standalone = if input.looking_at(b"standalone") {
        if !had_ws2 {
            return Err(input.fatal("whitespace required before standalone"));
        }
        input.expect_str(b"standalone")?;
        input.skip_whitespace();
        input.expect_byte(b'=')?;
        input.skip_whitespace();
        let val = input.parse_quoted_value()?;
        match val.as_str() {
            "yes" => Some(true),
            "no" => Some(false),
            _ => return Err(input.fatal("standalone must be 'yes' or 'no'")),
        }
    } else {
        None
    };

    input.skip_whitespace();
    input.expect_str(b"?>")?;

    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}

/// Validates an XML version number: `VersionNum ::= '1.' [0-9]+`.
fn is_valid_version_num(s: &str) -> bool {
    s.strip_prefix("1.")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Validates an encoding name: `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`.
fn is_valid_encoding_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() => bytes[1..]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')),
        _ => false,
    }
}

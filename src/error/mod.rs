//! Error types and diagnostics.
//!
//! Two error families cover this crate:
//!
//! - [`ParseError`] — tokenizer-level failures with source location tracking.
//!   The tokenizer supports **error recovery mode**: it collects recoverable
//!   problems into a `Vec<ParseDiagnostic>` while still delivering events.
//! - [`FragmentError`] — failures at the fragment/tree level: malformed data
//!   (bad base64 payloads, namespace policy violations, invalid names) and
//!   inconsistent whitespace handling on sibling text.
//!
//! "Not found" outcomes (missing attribute, unknown id, no matching element)
//! are not errors; they are `Option`/`bool` results on the query APIs.

use std::fmt;

/// Severity level for a parse diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A non-fatal issue that doesn't prevent parsing.
    Warning,
    /// A recoverable error — the parser can continue but the document is malformed.
    Error,
    /// An unrecoverable error — parsing must stop.
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Source location within an XML input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single diagnostic emitted during parsing.
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable error message.
    pub message: String,
    /// Where in the source this error occurred.
    pub location: SourceLocation,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at {}", self.severity, self.message, self.location)
    }
}

/// The error type returned when tokenizing XML input fails.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the fatal error occurred.
    pub location: SourceLocation,
    /// All diagnostics collected before the fatal error.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

/// The error type for fragment tree operations.
#[derive(Debug, Clone)]
pub enum FragmentError {
    /// The data itself is bad: a base64 alphabet violation, an illegal
    /// namespace (re)declaration, or invalid QName syntax. Distinct from a
    /// parse failure so callers can tell payload problems from input
    /// well-formedness problems.
    MalformedData(String),
    /// Sibling text under one element mixed `xml:space="preserve"` and
    /// default whitespace handling without an intervening non-text node.
    MixedWhitespace,
    /// The underlying tokenizer rejected the input.
    Parse(ParseError),
}

impl fmt::Display for FragmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedData(msg) => write!(f, "malformed data: {msg}"),
            Self::MixedWhitespace => {
                write!(f, "inconsistent whitespace handling on sibling text")
            }
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FragmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for FragmentError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            line: 10,
            column: 5,
            byte_offset: 42,
        };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            message: "unexpected end of input".to_string(),
            location: SourceLocation {
                line: 1,
                column: 15,
                byte_offset: 14,
            },
            diagnostics: vec![],
        };
        assert_eq!(err.to_string(), "parse error at 1:15: unexpected end of input");
    }

    #[test]
    fn test_fragment_error_display() {
        let err = FragmentError::MalformedData("bad base64 payload".to_string());
        assert_eq!(err.to_string(), "malformed data: bad base64 payload");
        assert_eq!(
            FragmentError::MixedWhitespace.to_string(),
            "inconsistent whitespace handling on sibling text"
        );
    }

    #[test]
    fn test_fragment_error_from_parse_error() {
        let parse = ParseError {
            message: "boom".to_string(),
            location: SourceLocation::default(),
            diagnostics: vec![],
        };
        let err: FragmentError = parse.into();
        assert!(matches!(err, FragmentError::Parse(_)));
        let _: &dyn std::error::Error = &err;
    }
}

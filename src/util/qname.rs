//! Qualified-name handling.
//!
//! A `QName` is a name of the form `prefix:localname` or just `localname`.
//! This module provides splitting and validation utilities plus the XML name
//! character classes used by the tokenizer, as defined by XML 1.0 §2.3 and
//! Namespaces in XML 1.0 §4.
//!
//! See <https://www.w3.org/TR/xml-names/#NT-QName>

/// Splits a `QName` into its prefix and local name parts.
///
/// Returns `(Some(prefix), localname)` if the name contains a colon,
/// or `(None, localname)` if it does not.
///
/// # Examples
///
/// ```
/// use xmlfrag::util::qname::split_qname;
///
/// assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
/// assert_eq!(split_qname("div"), (None, "div"));
/// ```
#[must_use]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.find(':') {
        Some(pos) => (Some(&qname[..pos]), &qname[pos + 1..]),
        None => (None, qname),
    }
}

/// Validates that a name is a legal `QName` per Namespaces in XML 1.0 §4.
///
/// A `QName` has at most one colon, and neither prefix nor local part may be
/// empty. Returns an error message if invalid, or `None` if valid.
#[must_use]
pub fn validate_qname(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("QName is empty");
    }
    let colon_count = name.chars().filter(|&c| c == ':').count();
    if colon_count > 1 {
        return Some("QName contains multiple colons");
    }
    if colon_count == 1 && (name.starts_with(':') || name.ends_with(':')) {
        return Some("QName has empty prefix or local part");
    }
    None
}

/// Returns `true` if `c` is an XML whitespace character (§2.3 `[3]` S).
#[must_use]
pub fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
#[must_use]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 [4a].
#[must_use]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Collapses XML whitespace in `value`: runs of space characters become a
/// single `' '`, and leading/trailing runs are removed.
///
/// This is the normalization applied to character data and attribute values
/// outside an `xml:space="preserve"` scope.
#[must_use]
pub fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let _ = collapse_whitespace_into(value, &mut out, false);
    out
}

/// Appends `value` to `out` with XML whitespace collapsed, continuing a
/// normalization that may span several chunks. `pending_space` carries the
/// state between chunks: `true` means the text so far ended in a whitespace
/// run that was trimmed, so the next non-space character re-inserts a single
/// `' '` first. Returns the updated flag.
///
/// `collapse_whitespace_into(v, &mut out, false)` over consecutive chunks is
/// equivalent to one [`collapse_whitespace`] call on their concatenation.
pub fn collapse_whitespace_into(value: &str, out: &mut String, pending_space: bool) -> bool {
    let mut pending_space = pending_space;
    for c in value.chars() {
        if is_xml_space(c) {
            if !out.is_empty() {
                pending_space = true;
            }
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    pending_space
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_qname_with_prefix() {
        assert_eq!(split_qname("xml:lang"), (Some("xml"), "lang"));
    }

    #[test]
    fn test_split_qname_without_prefix() {
        assert_eq!(split_qname("div"), (None, "div"));
    }

    #[test]
    fn test_split_qname_multiple_colons() {
        // Only splits on first colon
        assert_eq!(split_qname("a:b:c"), (Some("a"), "b:c"));
    }

    #[test]
    fn test_validate_qname_valid() {
        assert_eq!(validate_qname("div"), None);
        assert_eq!(validate_qname("svg:rect"), None);
    }

    #[test]
    fn test_validate_qname_invalid() {
        assert!(validate_qname("").is_some());
        assert!(validate_qname(":x").is_some());
        assert!(validate_qname("x:").is_some());
        assert!(validate_qname("a:b:c").is_some());
    }

    #[test]
    fn test_collapse_whitespace_runs() {
        assert_eq!(collapse_whitespace("a  \t b\n\nc"), "a b c");
    }

    #[test]
    fn test_collapse_whitespace_edges() {
        assert_eq!(collapse_whitespace("  hello  "), "hello");
        assert_eq!(collapse_whitespace("   "), "");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_collapse_whitespace_into_spans_chunks() {
        let mut out = String::new();
        let mut pending = false;
        for chunk in ["  he", "llo ", " wor", "ld  "] {
            pending = collapse_whitespace_into(chunk, &mut out, pending);
        }
        assert_eq!(out, "hello world");
        assert!(pending);
    }

    #[test]
    fn test_is_name_chars() {
        assert!(is_name_start_char('a'));
        assert!(is_name_start_char('_'));
        assert!(!is_name_start_char('-'));
        assert!(is_name_char('-'));
        assert!(is_name_char('9'));
        assert!(!is_name_char(' '));
    }
}

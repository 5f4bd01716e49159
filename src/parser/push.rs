//! Push/incremental fragment parser.
//!
//! Provides a chunk-oriented parsing interface. Data can be fed in
//! arbitrarily sized chunks via [`FragmentParser::feed`] — chunks may split
//! tokens, tags, or even multi-byte characters at any boundary — and the
//! final fragment is obtained by calling [`FragmentParser::finish`].
//!
//! # Design
//!
//! The parser buffers all fed data internally and performs the full parse on
//! [`FragmentParser::finish`]. This gives correct chunk-boundary handling
//! with minimal complexity; the streaming interface of the resulting
//! [`XmlFragment`] then replays content as many times as needed without
//! re-parsing.
//!
//! # Examples
//!
//! ```
//! use xmlfrag::parser::FragmentParser;
//!
//! let mut parser = FragmentParser::new();
//! parser.feed(b"<root>");
//! parser.feed(b"<child>Hello</child>");
//! parser.feed(b"</root>");
//!
//! let mut frag = parser.finish().unwrap();
//! assert!(frag.enter_element("root"));
//! ```

use crate::error::FragmentError;
use crate::fragment::builder::FragmentBuilder;
use crate::fragment::XmlFragment;
use crate::parser::{decode_to_utf8, parse_events, ParseOptions};

/// A push-based (incremental) fragment parser.
///
/// Accepts XML bytes in arbitrarily sized chunks and builds an
/// [`XmlFragment`] when parsing is finalized.
pub struct FragmentParser {
    /// Accumulated raw bytes from all `feed()` calls.
    buffer: Vec<u8>,
    /// Parser options.
    options: ParseOptions,
    /// Whether `finish()` has already been called.
    finished: bool,
}

impl FragmentParser {
    /// Creates a new push parser with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    /// Creates a new push parser with the specified options.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlfrag::parser::{FragmentParser, ParseOptions};
    ///
    /// let parser = FragmentParser::with_options(
    ///     ParseOptions::default().recover(true).max_depth(64),
    /// );
    /// ```
    #[must_use]
    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            buffer: Vec::new(),
            options,
            finished: false,
        }
    }

    /// Feeds a chunk of raw XML bytes into the parser.
    ///
    /// Returns `true` while the parser expects more input. With the
    /// buffer-then-parse design nothing is analyzed before
    /// [`finish`](FragmentParser::finish), so this always reports `true`.
    ///
    /// # Panics
    ///
    /// Panics if called after [`finish`](FragmentParser::finish).
    pub fn feed(&mut self, data: &[u8]) -> bool {
        assert!(
            !self.finished,
            "feed() called after finish() — parser has already been consumed"
        );
        self.buffer.extend_from_slice(data);
        true
    }

    /// Finalizes parsing and returns the constructed [`XmlFragment`] with
    /// its cursor rewound to the start.
    ///
    /// All buffered data is decoded (with automatic encoding detection) and
    /// parsed in one pass.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError`] if the accumulated data is not well-formed
    /// fragment content.
    pub fn finish(mut self) -> Result<XmlFragment, FragmentError> {
        self.finished = true;
        let text = decode_to_utf8(&self.buffer)?;
        let mut builder = FragmentBuilder::new();
        parse_events(&text, &self.options, &mut builder)?;
        Ok(builder.finish())
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if no data has been fed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discards all buffered data so the parser can be reused for new input.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.finished = false;
    }
}

impl Default for FragmentParser {
    fn default() -> Self {
        Self::new()
    }
}

//! # xmlfrag
//!
//! A lightweight, append-friendly XML fragment tree. Fragments are built
//! from SAX-style parse events (or direct mutation calls) and support two
//! consumption styles over the same node storage:
//!
//! 1. **Streaming cursor** — forward-only `enter_element` / `skip_content` /
//!    `leave_element` walking, restartable any number of times without
//!    re-parsing.
//! 2. **Tree accessor** — a uniform navigation/attribute/namespace contract
//!    ([`accessor::TreeAccessor`]) implemented both by the fragment tree and
//!    by a foreign HTML-element tree, so XPath/XSLT-style consumers and the
//!    generic serializer can drive either backend identically.
//!
//! ## Quick Start
//!
//! ```
//! use xmlfrag::XmlFragment;
//!
//! let mut frag = XmlFragment::parse_str("<root><child>Hello</child></root>").unwrap();
//! assert!(frag.enter_element("root"));
//! assert!(frag.enter_element("child"));
//! assert_eq!(frag.all_text(), "Hello");
//! ```

pub mod accessor;
pub mod error;
pub mod fragment;
pub mod html;
pub mod ns;
pub mod parser;
pub mod serial;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use fragment::{ContentType, XmlFragment};
pub use tree::{Attribute, ExpandedName, NodeId};

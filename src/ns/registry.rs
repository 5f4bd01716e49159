//! Namespace registry service.
//!
//! Maps prefix/URI pairs to small stable indices for cheap name comparison.
//! This is a process-lifetime service that callers *inject* into consumers
//! such as [`crate::html::HtmlTreeAccessor`] — it is looked up, never owned,
//! and never global.

use std::cell::RefCell;

/// A small stable index identifying one registered prefix/URI pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NsIndex(u32);

impl NsIndex {
    /// Returns the raw index value.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// An interning table of namespace prefix/URI pairs.
///
/// Interning the same pair twice returns the same [`NsIndex`]. The table
/// uses interior mutability so shared consumers can intern through a `&`
/// reference; it is single-threaded like the rest of this crate.
#[derive(Debug, Default)]
pub struct NsRegistry {
    entries: RefCell<Vec<(Option<String>, String)>>,
}

impl NsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for the given prefix/URI pair, registering it on
    /// first use.
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&self, prefix: Option<&str>, uri: &str) -> NsIndex {
        let mut entries = self.entries.borrow_mut();
        if let Some(pos) = entries
            .iter()
            .position(|(p, u)| p.as_deref() == prefix && u == uri)
        {
            return NsIndex(pos as u32);
        }
        entries.push((prefix.map(str::to_string), uri.to_string()));
        NsIndex((entries.len() - 1) as u32)
    }

    /// Looks up a registered pair by index.
    #[must_use]
    pub fn get(&self, index: NsIndex) -> Option<(Option<String>, String)> {
        self.entries.borrow().get(index.0 as usize).cloned()
    }

    /// Returns the number of registered pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

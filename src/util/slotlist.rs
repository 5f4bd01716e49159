//! Growable slot list.
//!
//! `SlotList` is the sequence container used for both attribute lists and
//! child-node lists. It keeps an explicit length (there is no sentinel
//! terminator; iteration visits exactly the populated slots, in order) and
//! reserves capacity in power-of-two steps starting at a small constant, so
//! that the common case — many small element/attribute lists — stays cheap
//! while repeated appends amortize.

/// Initial slot capacity reserved on the first insertion.
const INITIAL_CAPACITY: usize = 8;

/// A growable, explicitly-sized list of slots.
///
/// Semantically a thin wrapper over `Vec<T>` that pins down the growth
/// policy: capacity doubles from [`INITIAL_CAPACITY`] rather than being left
/// to the allocator's discretion. Insertion at an explicit index shifts the
/// tail right by one; order is always insertion/document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotList<T> {
    items: Vec<T>,
}

impl<T> SlotList<T> {
    /// Creates an empty list. No capacity is reserved until the first push.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Returns the number of populated slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at `index`, or `None` if out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Returns a mutable reference to the item at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Appends an item at the first free slot.
    pub fn push(&mut self, item: T) {
        self.grow_if_full();
        self.items.push(item);
    }

    /// Inserts an item at `index`, shifting subsequent items right by one.
    ///
    /// `index == len` is equivalent to [`push`](Self::push).
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, item: T) {
        assert!(index <= self.items.len(), "SlotList insert index out of range");
        self.grow_if_full();
        self.items.insert(index, item);
    }

    /// Removes and returns the item at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(index < self.items.len(), "SlotList remove index out of range");
        self.items.remove(index)
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns an iterator over the populated slots, in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Returns the populated slots as a contiguous slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Returns the current slot capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Finds the index of the first item matching the predicate.
    pub fn position<F: FnMut(&T) -> bool>(&self, pred: F) -> Option<usize> {
        self.items.iter().position(pred)
    }

    /// Doubles the reserved capacity when the list is full, starting at
    /// [`INITIAL_CAPACITY`].
    fn grow_if_full(&mut self) {
        let cap = self.items.capacity();
        if self.items.len() == cap {
            let target = if cap == 0 { INITIAL_CAPACITY } else { cap * 2 };
            self.items.reserve_exact(target - self.items.len());
        }
    }
}

impl<T> Default for SlotList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<usize> for SlotList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a SlotList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> FromIterator<T> for SlotList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Vec::from_iter(iter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_list_is_empty() {
        let list: SlotList<u32> = SlotList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), 0);
    }

    #[test]
    fn test_push_reserves_initial_capacity() {
        let mut list = SlotList::new();
        list.push(1);
        assert_eq!(list.capacity(), INITIAL_CAPACITY);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_capacity_doubles_when_full() {
        let mut list = SlotList::new();
        for i in 0..INITIAL_CAPACITY {
            list.push(i);
        }
        assert_eq!(list.capacity(), INITIAL_CAPACITY);
        list.push(99);
        assert_eq!(list.capacity(), INITIAL_CAPACITY * 2);
    }

    #[test]
    fn test_insert_shifts_tail_right() {
        let mut list = SlotList::new();
        list.push("a");
        list.push("c");
        list.insert(1, "b");
        assert_eq!(list.as_slice(), &["a", "b", "c"]);
    }

    #[test]
    fn test_insert_at_len_appends() {
        let mut list = SlotList::new();
        list.push(1);
        list.insert(1, 2);
        assert_eq!(list.as_slice(), &[1, 2]);
    }

    #[test]
    #[should_panic(expected = "insert index out of range")]
    fn test_insert_past_end_panics() {
        let mut list: SlotList<u32> = SlotList::new();
        list.insert(1, 5);
    }

    #[test]
    fn test_remove_shifts_tail_left() {
        let mut list = SlotList::new();
        list.push(1);
        list.push(2);
        list.push(3);
        assert_eq!(list.remove(1), 2);
        assert_eq!(list.as_slice(), &[1, 3]);
    }

    #[test]
    fn test_contiguity_after_mixed_operations() {
        // After any sequence of valid insert/remove operations, iteration
        // must encounter exactly the populated entries, in order, no gaps.
        let mut list = SlotList::new();
        for i in 0..20 {
            list.push(i);
        }
        list.remove(0);
        list.remove(9);
        list.insert(0, 100);
        list.insert(5, 200);

        let collected: Vec<i32> = list.iter().copied().collect();
        assert_eq!(collected.len(), list.len());
        assert_eq!(collected.first(), Some(&100));
        assert_eq!(collected[5], 200);
    }

    #[test]
    fn test_clear() {
        let mut list = SlotList::new();
        list.push(1);
        list.push(2);
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn test_position() {
        let mut list = SlotList::new();
        list.push("x");
        list.push("y");
        assert_eq!(list.position(|s| *s == "y"), Some(1));
        assert_eq!(list.position(|s| *s == "z"), None);
    }

    #[test]
    fn test_from_iterator() {
        let list: SlotList<u32> = (0..3).collect();
        assert_eq!(list.as_slice(), &[0, 1, 2]);
    }
}

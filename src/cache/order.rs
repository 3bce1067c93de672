//! Insertion Order Module
//!
//! Explicit write-order index used as the count-eviction order.

use std::collections::VecDeque;

// == Insertion Index ==
/// Tracks keys in the order they were last written.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest write
/// - Back = Newest write
///
/// Reads never reorder keys. Rewriting a key moves it to the back.
#[derive(Debug, Default, Clone)]
pub struct InsertionIndex {
    order: VecDeque<String>,
}

impl InsertionIndex {
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Record ==
    /// Marks a key as the newest write.
    pub fn record(&mut self, key: &str) {
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the index.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Oldest ==
    /// Returns the oldest key without removing it.
    pub fn oldest(&self) -> Option<&String> {
        self.order.front()
    }

    // == Keys ==
    /// Returns all keys, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

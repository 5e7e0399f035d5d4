use std::collections::VecDeque;

/// Bounded FIFO of run identifiers.
///
/// Holds at most `capacity` entries; pushing past capacity drops the oldest.
/// Retained entries always stay in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer {
    items: VecDeque<String>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an identifier, evicting the oldest entry when full
    pub fn push(&mut self, id: impl Into<String>) {
        self.items.push_back(id.into());
        if self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// Current contents, oldest first
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Most recently pushed identifier
    pub fn last(&self) -> Option<&str> {
        self.items.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Join the retained identifiers with `sep`
    pub fn join(&self, sep: &str) -> String {
        self.items().collect::<Vec<_>>().join(sep)
    }
}

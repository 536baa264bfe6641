//! Rolling label history for sequence matching
//!
//! Keeps the last N accepted state labels in chronological order. Pushing
//! onto a full history drops the oldest label.

use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub struct LabelHistory {
    labels: VecDeque<String>,
    capacity: usize,
}

impl LabelHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            labels: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.labels.back().map(String::as_str)
    }

    /// Append unless equal to the newest label. Returns whether it was appended.
    pub fn push(&mut self, label: &str) -> bool {
        if self.last() == Some(label) {
            return false;
        }
        if self.labels.len() == self.capacity {
            self.labels.pop_front();
        }
        self.labels.push_back(label.to_string());
        true
    }

    /// Whether the newest `pattern.len()` labels equal `pattern`
    pub fn ends_with(&self, pattern: &[String]) -> bool {
        if pattern.is_empty() || pattern.len() > self.labels.len() {
            return false;
        }
        let skip = self.labels.len() - pattern.len();
        self.labels.iter().skip(skip).zip(pattern).all(|(a, b)| a == b)
    }

    /// Drop everything except the newest label
    pub fn collapse_to_last(&mut self) {
        while self.labels.len() > 1 {
            self.labels.pop_front();
        }
    }

    /// Chronological copy (oldest first)
    pub fn to_vec(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

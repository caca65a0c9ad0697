use std::{collections::VecDeque, fmt::Display};

use crate::number::Number;

pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub expression: String,
    pub result: Number,
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.expression, self.result)
    }
}

/// Most recent evaluations, owned by the caller. Holds at most `capacity`
/// entries and drops the oldest first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Entry>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, expression: impl Into<String>, result: Number) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry {
            expression: expression.into(),
            result,
        });
    }

    /// Newest entry first.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn evicts_oldest_first() {
        let mut history = History::default();
        for i in 0..7 {
            history.push(format!("{i} + 0"), Number::from(i));
        }
        assert_eq!(history.len(), 5);
        let shown: Vec<String> = history.iter().map(ToString::to_string).collect();
        assert_eq!(
            shown,
            vec!["6 + 0 = 6", "5 + 0 = 5", "4 + 0 = 4", "3 + 0 = 3", "2 + 0 = 2"]
        );
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = History::new(0);
        history.push("1", Number::from(1));
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 0);
    }
}

// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bounded FIFO of recent diagnostic log lines.

use std::collections::VecDeque;

/// Keeps at most `capacity` lines on insert and `trim_to` after
/// [`cleanup`](LogRing::cleanup). The oldest lines are evicted first.
#[derive(Debug, Clone)]
pub struct LogRing {
    lines: VecDeque<String>,
    capacity: usize,
    trim_to: usize,
    pushed: u64,
}

impl LogRing {
    pub fn new(capacity: usize, trim_to: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            trim_to: trim_to.min(capacity),
            pushed: 0,
        }
    }

    /// Appends a line, evicting the oldest when full.
    pub fn push(&mut self, line: impl Into<String>) {
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
        self.pushed += 1;
    }

    /// Shrinks the ring to the cleanup size. Returns how many lines were dropped.
    pub fn cleanup(&mut self) -> usize {
        let excess = self.lines.len().saturating_sub(self.trim_to);
        self.lines.drain(..excess);
        excess
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// The newest `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).cloned().collect()
    }

    /// Lines pushed after `cursor` that are still retained, oldest first,
    /// and the cursor to pass next time. Start from `0`.
    pub fn since(&self, cursor: u64) -> (Vec<String>, u64) {
        let fresh = self.pushed.saturating_sub(cursor);
        let n = usize::try_from(fresh).unwrap_or(usize::MAX);
        (self.tail(n), self.pushed)
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(100, 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_bound_and_fifo() {
        let mut ring = LogRing::default();
        for i in 0..250 {
            ring.push(format!("line {i}"));
            assert!(ring.len() <= 100);
        }
        let lines = ring.to_vec();
        assert_eq!(lines.len(), 100);
        assert_eq!(lines.first().map(String::as_str), Some("line 150"));
        assert_eq!(lines.last().map(String::as_str), Some("line 249"));
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let mut ring = LogRing::default();
        for i in 0..80 {
            ring.push(format!("{i}"));
        }
        assert_eq!(ring.cleanup(), 30);
        assert_eq!(ring.len(), 50);
        assert_eq!(ring.to_vec()[0], "30");
        assert_eq!(ring.cleanup(), 0);
    }

    #[test]
    fn test_cleanup_below_trim_is_noop() {
        let mut ring = LogRing::new(10, 5);
        ring.push("a");
        ring.push("b");
        assert_eq!(ring.cleanup(), 0);
        assert_eq!(ring.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_tail() {
        let mut ring = LogRing::new(10, 5);
        for s in ["a", "b", "c"] {
            ring.push(s);
        }
        assert_eq!(ring.tail(2), vec!["b", "c"]);
        assert_eq!(ring.tail(10).len(), 3);
    }

    #[test]
    fn test_since_cursor_survives_eviction() {
        let mut ring = LogRing::new(3, 1);
        ring.push("a");
        let (lines, cursor) = ring.since(0);
        assert_eq!(lines, vec!["a"]);
        for s in ["b", "c", "d", "e"] {
            ring.push(s);
        }
        let (lines, cursor) = ring.since(cursor);
        assert_eq!(lines, vec!["c", "d", "e"]);
        assert_eq!(ring.since(cursor).0.len(), 0);
    }

    #[test]
    fn test_trim_clamped_to_capacity() {
        let mut ring = LogRing::new(4, 9);
        for i in 0..4 {
            ring.push(format!("{i}"));
        }
        assert_eq!(ring.cleanup(), 0);
        assert_eq!(ring.capacity(), 4);
    }
}

//! [`ContextHistory`] – oscillation detector over recent context labels.
//!
//! Keeps a bounded ring of the last *K* observed context labels. After each
//! [`ContextHistory::record`] call it checks whether the window forms a
//! strict alternating pattern of exactly two labels (A,B,A,B,…). If it
//! does, `record` returns `true` and the window is cleared, so one pattern
//! occurrence fires exactly once; the next detection requires a fresh full
//! window.
//!
//! # Example
//!
//! ```rust
//! use visnav_runtime::history::ContextHistory;
//! use visnav_types::ContextLabel;
//!
//! let mut history = ContextHistory::new(4);
//! assert!(!history.record(ContextLabel::MainMenu));
//! assert!(!history.record(ContextLabel::OptionsMenu));
//! assert!(!history.record(ContextLabel::MainMenu));
//! assert!(history.record(ContextLabel::OptionsMenu)); // A,B,A,B → loop!
//! ```

use std::collections::VecDeque;

use visnav_types::ContextLabel;

/// Bounded ring of recent context labels with strict-alternation detection.
pub struct ContextHistory {
    capacity: usize,
    window: VecDeque<ContextLabel>,
}

impl ContextHistory {
    /// Create a history over a window of `capacity` labels. Windows smaller
    /// than 2 cannot alternate and are bumped up to 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            window: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an observed label, evicting the oldest when full.
    ///
    /// Returns `true` when the full window is a strict alternation of
    /// exactly two labels; the window is cleared in that case.
    pub fn record(&mut self, label: ContextLabel) -> bool {
        self.window.push_back(label);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        if self.is_oscillating() {
            self.window.clear();
            return true;
        }
        false
    }

    /// `true` when the window is full, holds exactly two distinct labels,
    /// and no label repeats consecutively.
    fn is_oscillating(&self) -> bool {
        if self.window.len() < self.capacity {
            return false;
        }
        let mut distinct: Vec<ContextLabel> = Vec::with_capacity(2);
        for label in &self.window {
            if !distinct.contains(label) {
                distinct.push(*label);
            }
        }
        if distinct.len() != 2 {
            return false;
        }
        self.window
            .iter()
            .zip(self.window.iter().skip(1))
            .all(|(a, b)| a != b)
    }

    /// Number of labels currently held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// The configured window size K.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Drop all recorded labels.
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

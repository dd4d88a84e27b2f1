//! Bounded history of recent translations, used to prime backend requests so
//! consecutive lines stay coherent. FIFO: oldest pair evicted first.
//! Never persisted.

use std::collections::VecDeque;

/// One (original, translated) pair in the context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub original: String,
    pub translated: String,
}

/// Ordered window of the most recent translation pairs, newest last.
pub struct ContextWindow {
    entries: VecDeque<ContextEntry>,
    capacity: usize,
}

impl ContextWindow {
    /// Capacity 0 disables context entirely: `push` becomes a no-op.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a pair, evicting from the front when over capacity.
    pub fn push(&mut self, original: String, translated: String) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(ContextEntry { original, translated });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Current window, oldest first, newest last.
    pub fn recent(&self) -> Vec<ContextEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(o: &str, t: &str) -> ContextEntry {
        ContextEntry {
            original: o.to_string(),
            translated: t.to_string(),
        }
    }

    #[test]
    fn bounded_fifo_eviction() {
        let cap = 3;
        let mut win = ContextWindow::new(cap);
        for i in 0..cap + 5 {
            win.push(format!("src{i}"), format!("dst{i}"));
        }
        assert_eq!(win.len(), cap);
        // The 5 oldest are gone; the rest keep newest-last order.
        let recent = win.recent();
        assert_eq!(recent[0], entry("src5", "dst5"));
        assert_eq!(recent[cap - 1], entry("src7", "dst7"));
    }

    #[test]
    fn window_of_two_keeps_last_two() {
        let mut win = ContextWindow::new(2);
        win.push("A".into(), "a".into());
        win.push("B".into(), "b".into());
        win.push("C".into(), "c".into());
        assert_eq!(win.recent(), vec![entry("B", "b"), entry("C", "c")]);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut win = ContextWindow::new(0);
        win.push("A".into(), "a".into());
        assert!(win.is_empty());
        assert!(win.recent().is_empty());
    }

    #[test]
    fn clear_empties_window() {
        let mut win = ContextWindow::new(4);
        win.push("A".into(), "a".into());
        win.clear();
        assert!(win.is_empty());
    }
}

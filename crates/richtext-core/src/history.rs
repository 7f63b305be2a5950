use serde::{Deserialize, Serialize};

const DEFAULT_CAPACITY: usize = 100;

/// Editor snapshot used for undo/redo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub html: String,
    pub selection_start: usize,
    pub selection_end: usize,
}

impl HistoryEntry {
    pub fn new(html: impl Into<String>, selection_start: usize, selection_end: usize) -> Self {
        Self {
            html: html.into(),
            selection_start,
            selection_end,
        }
    }
}

/// Bounded undo/redo stack of [`HistoryEntry`] values.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryEntry::default())
    }
}

impl History {
    pub fn new(initial: HistoryEntry) -> Self {
        Self::with_capacity(initial, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial: HistoryEntry, capacity: usize) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Records a new snapshot. Returns false when the content did not change.
    pub fn record(&mut self, entry: HistoryEntry) -> bool {
        if self.current().html == entry.html {
            return false;
        }

        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index += 1;

        if self.entries.len() > self.capacity {
            self.entries.remove(0);
            self.index -= 1;
        }
        true
    }

    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(&self.entries[self.index])
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(&self.entries[self.index])
    }

    /// Drops every snapshot and starts over from `entry`.
    pub fn reset(&mut self, entry: HistoryEntry) {
        self.entries = vec![entry];
        self.index = 0;
    }
}

//! Snapshot-based undo/redo.
//!
//! Each entry is a full structural clone of the store taken *before* a
//! mutation. History is linear: recording a new entry clears the redo stack.
//! Consecutive text edits to the same node share one entry, recognised by
//! their `text:<id>` label.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::store::{NodeId, Store};

const TEXT_LABEL_PREFIX: &str = "text:";

/// Label used for text edits on `id`; repeated labels squash.
#[must_use]
pub fn text_label(id: NodeId) -> String {
    format!("{TEXT_LABEL_PREFIX}{id}")
}

/// One undo/redo unit.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub store: Store,
    pub label: String,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(store: Store, label: impl Into<String>) -> Self {
        Self { store, label: label.into() }
    }
}

/// Undo and redo stacks with a depth cap.
#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    limit: usize,
    /// Label of the last recorded entry while a squash run is open.
    last_label: Option<String>,
}

impl History {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { undo: Vec::new(), redo: Vec::new(), limit: limit.max(1), last_label: None }
    }

    /// Snapshot `store` under `label` before a mutation.
    ///
    /// Returns `false` when the edit was squashed into the previous entry.
    pub fn record(&mut self, store: &Store, label: &str) -> bool {
        self.redo.clear();
        let squash = label.starts_with(TEXT_LABEL_PREFIX) && self.last_label.as_deref() == Some(label);
        if squash {
            return false;
        }
        self.push_undo(HistoryEntry::new(store.clone(), label));
        self.last_label = Some(label.to_string());
        true
    }

    /// Commit a snapshot taken earlier (gesture start).
    pub fn commit(&mut self, entry: HistoryEntry) {
        self.redo.clear();
        self.push_undo(entry);
        self.last_label = None;
    }

    /// Close the current squash run so the next text edit gets its own entry.
    pub fn break_squash(&mut self) {
        self.last_label = None;
    }

    /// Pop the newest undo entry, parking a copy of `current` on the redo
    /// stack. Returns the store to restore.
    pub fn undo(&mut self, current: &Store) -> Option<Store> {
        let entry = self.undo.pop()?;
        self.redo.push(HistoryEntry::new(current.clone(), entry.label));
        self.last_label = None;
        tracing::info!(undo = self.undo.len(), redo = self.redo.len(), "undo");
        Some(entry.store)
    }

    /// Pop the newest redo entry, parking a copy of `current` on the undo
    /// stack. Returns the store to restore.
    pub fn redo(&mut self, current: &Store) -> Option<Store> {
        let entry = self.redo.pop()?;
        self.push_undo(HistoryEntry::new(current.clone(), entry.label));
        self.last_label = None;
        tracing::info!(undo = self.undo.len(), redo = self.redo.len(), "redo");
        Some(entry.store)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.last_label = None;
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Label of the entry `undo` would restore.
    #[must_use]
    pub fn peek_undo_label(&self) -> Option<&str> {
        self.undo.last().map(|e| e.label.as_str())
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(crate::consts::HISTORY_LIMIT)
    }
}

//! Append-only snapshot history with a movable cursor.
//!
//! Linear single-branch undo/redo: the history owns a vector of full
//! [`PageConfig`] snapshots plus a cursor. Undo and redo only move the cursor;
//! snapshots are never mutated once pushed. Pushing while the cursor is not at
//! the tail discards everything after it — a new edit invalidates redo.
//!
//! Every user-visible mutation goes through exactly one [`History::push`], so
//! one undo always reverts exactly one logical user action.

use linkloom_types::PageConfig;
use tracing::trace;

/// Cap on retained snapshots. When exceeded, the oldest snapshot is dropped
/// and the cursor shifted down — undo depth is bounded, not unbounded.
pub const MAX_HISTORY: usize = 100;

/// Snapshot sequence + cursor. The cursor is always a valid index.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<PageConfig>,
    cursor: usize,
}

impl History {
    /// Start a history from the initial document state.
    pub fn new(initial: PageConfig) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
        }
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> &PageConfig {
        // Invariant: cursor < snapshots.len(), maintained by every mutation.
        &self.snapshots[self.cursor]
    }

    /// Append a new snapshot, discarding any redo tail, and move the cursor to it.
    pub fn push(&mut self, snapshot: PageConfig) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);
        self.cursor += 1;

        if self.snapshots.len() > MAX_HISTORY {
            let excess = self.snapshots.len() - MAX_HISTORY;
            self.snapshots.drain(..excess);
            self.cursor -= excess;
        }
        trace!(len = self.snapshots.len(), cursor = self.cursor, "history push");
    }

    /// Move the cursor back one snapshot. Returns false at the beginning.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Move the cursor forward one snapshot. Returns false at the tail.
    pub fn redo(&mut self) -> bool {
        if self.cursor + 1 >= self.snapshots.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        false // always holds at least the initial snapshot
    }
}

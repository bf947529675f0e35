//! Unsaved-change tracking
//!
//! Dirty means the live tree differs from the last saved snapshot under
//! deep equality. The answer is computed on first query and cached until
//! the next mutation invalidates it.

use std::cell::Cell;

use crate::core::value::PreferenceTree;

#[derive(Debug, Default)]
pub struct DirtyTracker {
    cached: Cell<Option<bool>>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cached answer. Call after any change to live or saved.
    pub fn invalidate(&self) {
        self.cached.set(None);
    }

    /// Records that live and saved are known to be equal.
    pub fn mark_clean(&self) {
        self.cached.set(Some(false));
    }

    pub fn is_dirty(&self, live: &PreferenceTree, saved: &PreferenceTree) -> bool {
        if let Some(dirty) = self.cached.get() {
            return dirty;
        }
        let dirty = live != saved;
        self.cached.set(Some(dirty));
        dirty
    }
}

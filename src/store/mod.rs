// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Preference store with merge-on-load, dirty tracking and safe saves.
//!
//! The store exclusively owns three trees:
//!
//! - **defaults**: built once from the schema, never mutated
//! - **live**: what the user edits
//! - **saved**: the last tree confirmed written (defaults until the first
//!   load or save)
//!
//! Callers hold the store itself (or a `host::Controller` around it); no
//! other component can reach the trees mutably.
//!
//! # Example
//!
//! ```
//! use trade_prefs::store::{MemoryAdapter, PreferenceStore};
//! use trade_prefs::core::Value;
//!
//! let mut store = PreferenceStore::trading();
//! let mut adapter = MemoryAdapter::new();
//!
//! store.load_from(&adapter)?;
//! store.set("orderEntry.defaultQuantity", 25)?;
//! assert!(store.is_dirty());
//!
//! store.save(&mut adapter)?;
//! assert!(!store.is_dirty());
//!
//! store.reset()?;
//! assert_eq!(store.get("orderEntry.defaultQuantity")?, &Value::Number(10.0));
//! assert!(store.is_dirty());
//! # Ok::<(), trade_prefs::PrefsError>(())
//! ```

pub mod diff;
pub mod dirty;
pub mod merge;
pub mod persistence;
pub mod transaction;

pub use diff::{diff_trees, FieldChange};
pub use dirty::DirtyTracker;
pub use merge::{merge_blob, merge_over_defaults, LoadReport, LoadSource, RevertedField};
pub use persistence::{FileAdapter, MemoryAdapter, PersistenceAdapter, DEFAULT_BACKUPS_KEPT};
pub use transaction::PendingSave;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::core::{
    trading_schema, BindingSink, CollisionPolicy, Conflict, ConflictDetector, FieldType,
    HotkeyAction, KeyCombo, PrefPath, PreferenceTree, Schema, Value,
};
use crate::error::PrefsError;

/// Tunables for a store.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreOptions {
    pub collision_policy: CollisionPolicy,
}

/// Holds the default, live and saved preference trees.
#[derive(Debug)]
pub struct PreferenceStore {
    schema: Schema,
    options: StoreOptions,
    defaults: PreferenceTree,
    live: PreferenceTree,
    saved: PreferenceTree,
    dirty: DirtyTracker,
    load_report: LoadReport,
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl PreferenceStore {
    pub fn new(schema: Schema) -> Self {
        Self::with_options(schema, StoreOptions::default())
    }

    /// Creates a store whose live and saved trees both equal the defaults.
    pub fn with_options(schema: Schema, options: StoreOptions) -> Self {
        for violation in schema.default_violations() {
            warn!(%violation, "schema default fails its own constraint");
        }

        let defaults = schema.defaults();
        Self {
            live: defaults.clone(),
            saved: defaults.clone(),
            defaults,
            schema,
            options,
            dirty: DirtyTracker::new(),
            load_report: LoadReport::default(),
            in_flight: None,
            next_ticket: 1,
        }
    }

    /// Store over the trading interface schema.
    pub fn trading() -> Self {
        Self::new(trading_schema())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn set_collision_policy(&mut self, policy: CollisionPolicy) {
        self.options.collision_policy = policy;
    }

    pub fn defaults(&self) -> &PreferenceTree {
        &self.defaults
    }

    pub fn live(&self) -> &PreferenceTree {
        &self.live
    }

    pub fn saved_snapshot(&self) -> &PreferenceTree {
        &self.saved
    }

    /// Corrections made by the last load.
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Replaces live and saved with `blob` merged over the defaults.
    ///
    /// `None`, malformed JSON and non-record blobs all yield the defaults.
    /// Unknown keys are dropped and ill-typed fields fall back to their
    /// default; see `load_report()` for what was corrected.
    ///
    /// # Errors
    ///
    /// Only `SaveInFlight`.
    pub fn load(&mut self, blob: Option<&str>) -> Result<&PreferenceTree, PrefsError> {
        self.ensure_no_save_in_flight()?;

        let (tree, report) = match blob {
            None => (self.schema.defaults(), LoadReport::default()),
            Some(text) => merge_blob(&self.schema, text),
        };
        self.install_loaded(tree, report);
        Ok(&self.live)
    }

    /// Reads the blob from `adapter` and loads it. A failing read is
    /// treated like a missing blob.
    pub fn load_from<A: PersistenceAdapter + ?Sized>(
        &mut self,
        adapter: &A,
    ) -> Result<&PreferenceTree, PrefsError> {
        self.ensure_no_save_in_flight()?;

        match adapter.read() {
            Ok(blob) => self.load(blob.as_deref()),
            Err(e) => {
                self.install_loaded(self.schema.defaults(), LoadReport::unreadable(e.to_string()));
                Ok(&self.live)
            }
        }
    }

    /// Merges `blob` over the defaults without touching the store.
    pub fn merge(&self, blob: &str) -> (PreferenceTree, LoadReport) {
        merge_blob(&self.schema, blob)
    }

    /// Value at `path` in the live tree (leaf or whole record).
    pub fn get(&self, path: impl Into<PrefPath>) -> Result<&Value, PrefsError> {
        let path = path.into();
        if self.schema.node(&path).is_none() {
            return Err(PrefsError::NotFound(path.to_string()));
        }
        self.live
            .get(&path)
            .ok_or_else(|| PrefsError::NotFound(path.to_string()))
    }

    /// Writes `value` at `path` after checking it against the schema.
    ///
    /// Hotkey fields are stored canonically and go through the collision
    /// policy. Record paths accept a record of exactly the schema's shape;
    /// record writes are not subject to the collision policy.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the path is not in the schema
    /// - `TypeMismatch`, `InvalidValue`, `InvalidHotkey` if the value is refused
    /// - `BindingConflict` under `CollisionPolicy::Reject`
    /// - `SaveInFlight` while a save awaits its outcome
    ///
    /// Live is unchanged whenever an error is returned.
    pub fn set(
        &mut self,
        path: impl Into<PrefPath>,
        value: impl Into<Value>,
    ) -> Result<(), PrefsError> {
        self.ensure_no_save_in_flight()?;

        let path = path.into();
        let key = path.to_string();
        let node = self
            .schema
            .node(&path)
            .ok_or_else(|| PrefsError::NotFound(key.clone()))?;
        let is_hotkey = node.field_type() == FieldType::Hotkey;
        let value = node.check(&key, value.into())?;

        if self.live.get(&path) == Some(&value) {
            debug!(path = %key, "preference unchanged");
            return Ok(());
        }

        let swap_with = if is_hotkey {
            self.resolve_collisions(&path, &value)?
        } else {
            Vec::new()
        };

        let slot = self
            .live
            .get_mut(&path)
            .ok_or_else(|| PrefsError::NotFound(key.clone()))?;
        let previous = std::mem::replace(slot, value);

        for holder in swap_with {
            if let Some(other) = self.live.get_mut(&holder) {
                debug!(path = %holder, value = %previous, "hotkey swapped");
                *other = previous.clone();
            }
        }

        self.dirty.invalidate();
        debug!(path = %key, "preference updated");
        Ok(())
    }

    /// Restores live to the defaults. The store is dirty afterwards exactly
    /// when the saved snapshot differs from the defaults.
    pub fn reset(&mut self) -> Result<(), PrefsError> {
        self.ensure_no_save_in_flight()?;

        self.live = self.defaults.clone();
        self.dirty.invalidate();
        info!("preferences reset to defaults");
        Ok(())
    }

    /// True when live differs from the saved snapshot.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty(&self.live, &self.saved)
    }

    /// Leaves where live differs from the defaults.
    pub fn diff_from_defaults(&self) -> Vec<FieldChange> {
        diff_trees(&self.defaults, &self.live)
    }

    /// Leaves where live differs from the saved snapshot.
    pub fn unsaved_changes(&self) -> Vec<FieldChange> {
        diff_trees(&self.saved, &self.live)
    }

    /// Current combination for every action with a valid binding.
    pub fn current_bindings(&self) -> BTreeMap<HotkeyAction, KeyCombo> {
        HotkeyAction::ALL
            .into_iter()
            .filter_map(|action| Some((action, self.binding_of(&action.path())?)))
            .collect()
    }

    /// Action bound to `combo`. With duplicates, the first action in
    /// declaration order wins.
    pub fn action_for(&self, combo: &KeyCombo) -> Option<HotkeyAction> {
        HotkeyAction::ALL
            .into_iter()
            .find(|action| self.binding_of(&action.path()).as_ref() == Some(combo))
    }

    /// Combinations held by more than one hotkey field.
    pub fn binding_conflicts(&self) -> Vec<Conflict> {
        self.binding_index().find_conflicts()
    }

    fn binding_of(&self, path: &PrefPath) -> Option<KeyCombo> {
        self.live.get(path)?.as_text()?.parse().ok()
    }

    fn binding_index(&self) -> ConflictDetector {
        let mut detector = ConflictDetector::new();
        for path in self.schema.paths_of_type(FieldType::Hotkey) {
            if let Some(combo) = self.binding_of(&path) {
                detector.add_binding(path, combo);
            }
        }
        detector
    }

    /// Applies the collision policy to a hotkey write. Returns the fields
    /// that must receive the target's previous combination.
    fn resolve_collisions(
        &self,
        path: &PrefPath,
        value: &Value,
    ) -> Result<Vec<PrefPath>, PrefsError> {
        let Some(combo) = value.as_text().and_then(|s| s.parse::<KeyCombo>().ok()) else {
            return Ok(Vec::new());
        };

        let index = self.binding_index();
        let holders: Vec<PrefPath> = index
            .holders(&combo)
            .iter()
            .filter(|holder| *holder != path)
            .cloned()
            .collect();

        if holders.is_empty() {
            return Ok(holders);
        }

        match self.options.collision_policy {
            CollisionPolicy::Allow => {
                warn!(%combo, path = %path, held_by = %holders[0], "duplicate hotkey accepted");
                Ok(Vec::new())
            }
            CollisionPolicy::Reject => Err(PrefsError::BindingConflict {
                combo: combo.to_string(),
                held_by: holders[0].to_string(),
            }),
            CollisionPolicy::Swap => Ok(holders),
        }
    }

    fn install_loaded(&mut self, tree: PreferenceTree, report: LoadReport) {
        match &report.source {
            LoadSource::Defaults => info!("no saved preferences, using defaults"),
            LoadSource::Persisted => info!(
                discarded = report.discarded.len(),
                reverted = report.reverted.len(),
                "preferences loaded"
            ),
            LoadSource::Unreadable(reason) => {
                warn!(%reason, "saved preferences unreadable, using defaults")
            }
        }
        for path in &report.discarded {
            warn!(%path, "unknown preference discarded");
        }
        for field in &report.reverted {
            warn!(path = %field.path, reason = %field.reason, "preference reverted to default");
        }

        self.live = tree;
        self.saved = self.live.clone();
        self.dirty.mark_clean();
        self.load_report = report;
    }

    fn ensure_no_save_in_flight(&self) -> Result<(), PrefsError> {
        if self.in_flight.is_some() {
            return Err(PrefsError::SaveInFlight);
        }
        Ok(())
    }
}

impl BindingSink for PreferenceStore {
    fn bind(&mut self, action: HotkeyAction, combo: &KeyCombo) -> Result<(), PrefsError> {
        self.set(action.path(), combo)
    }
}

#[cfg(test)]
mod tests;

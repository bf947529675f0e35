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

//! Save transactions
//!
//! A save is all-or-nothing: the saved snapshot moves only when the
//! adapter confirms the write. Hosts whose storage is asynchronous use
//! the two phases directly:
//!
//! 1. `begin_save()` - serialises the live tree and locks the store
//! 2. host writes `pending.blob()` wherever it likes
//! 3. `finish_save(pending, outcome)` - applies or discards, then unlocks
//!
//! While a save is in flight, every mutation fails with `SaveInFlight`.
//! Reads stay available. A host that loses its `PendingSave` unlocks the
//! store with `abandon_save(ticket)`; `in_flight_ticket()` names the ticket.
//!
//! # Example
//!
//! ```
//! use trade_prefs::store::{MemoryAdapter, PersistenceAdapter, PreferenceStore};
//!
//! let mut store = PreferenceStore::trading();
//! let mut adapter = MemoryAdapter::new();
//!
//! store.set("orderEntry.defaultQuantity", 25)?;
//! let pending = store.begin_save()?;
//! let outcome = adapter.write(pending.blob());
//! store.finish_save(pending, outcome)?;
//!
//! assert!(!store.is_dirty());
//! # Ok::<(), trade_prefs::PrefsError>(())
//! ```

use tracing::{info, warn};

use crate::core::value::PreferenceTree;
use crate::error::PrefsError;
use crate::store::persistence::PersistenceAdapter;
use crate::store::PreferenceStore;

/// A save waiting for its outcome.
///
/// Holds the serialised blob and the exact tree it encodes, so a
/// successful save snapshots what was written, not what is live later.
/// The store stays locked until this is passed to `finish_save` or its
/// ticket to `abandon_save`.
#[derive(Debug)]
#[must_use = "the store stays locked until the save is finished or abandoned"]
pub struct PendingSave {
    ticket: u64,
    blob: String,
    tree: PreferenceTree,
}

impl PendingSave {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn blob(&self) -> &str {
        &self.blob
    }
}

impl PreferenceStore {
    /// Serialises the live tree and marks a save in flight.
    ///
    /// # Errors
    ///
    /// - `SaveInFlight` if another save has not finished
    /// - `Persistence` if the tree cannot be serialised
    #[must_use = "the store stays locked until the save is finished or abandoned"]
    pub fn begin_save(&mut self) -> Result<PendingSave, PrefsError> {
        self.ensure_no_save_in_flight()?;

        let blob = self
            .live
            .to_blob()
            .map_err(|e| PrefsError::Persistence(format!("Failed to serialise preferences: {}", e)))?;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);

        Ok(PendingSave {
            ticket,
            blob,
            tree: self.live.clone(),
        })
    }

    /// Completes a save with the adapter's outcome.
    ///
    /// On success the saved snapshot becomes the written tree and the
    /// store is clean. On failure nothing changes and the adapter's error
    /// is returned. Either way the store unlocks.
    ///
    /// # Errors
    ///
    /// - `StaleSave` if `pending` is not the save in flight (state untouched)
    /// - the adapter's error, passed through unchanged
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        outcome: Result<(), PrefsError>,
    ) -> Result<(), PrefsError> {
        if self.in_flight != Some(pending.ticket) {
            return Err(PrefsError::StaleSave(pending.ticket));
        }
        self.in_flight = None;

        match outcome {
            Ok(()) => {
                self.saved = pending.tree;
                self.dirty.invalidate();
                info!(ticket = pending.ticket, "preferences saved");
                Ok(())
            }
            Err(e) => {
                warn!(ticket = pending.ticket, error = %e, "saving preferences failed");
                Err(e)
            }
        }
    }

    /// Ticket of the save in flight, if any.
    pub fn in_flight_ticket(&self) -> Option<u64> {
        self.in_flight
    }

    /// Unlocks the store without applying the save.
    ///
    /// For a host whose `PendingSave` was dropped or whose write never
    /// reported back. The saved snapshot is untouched, so the store stays
    /// dirty. A later `finish_save` for the same ticket is `StaleSave`.
    ///
    /// # Errors
    ///
    /// - `StaleSave` if `ticket` is not the save in flight (state untouched)
    pub fn abandon_save(&mut self, ticket: u64) -> Result<(), PrefsError> {
        if self.in_flight != Some(ticket) {
            return Err(PrefsError::StaleSave(ticket));
        }
        self.in_flight = None;
        warn!(ticket, "save abandoned");
        Ok(())
    }

    /// Saves the live tree through `adapter` in one step.
    pub fn save<A: PersistenceAdapter + ?Sized>(&mut self, adapter: &mut A) -> Result<(), PrefsError> {
        let pending = self.begin_save()?;
        let outcome = adapter.write(pending.blob());
        self.finish_save(pending, outcome)
    }
}

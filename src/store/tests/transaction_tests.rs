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

use super::super::*;

use crate::core::Value;
use crate::error::PrefsError;

fn edited_store() -> PreferenceStore {
    let mut store = PreferenceStore::trading();
    store.load(None).unwrap();
    store.set("orderEntry.defaultQuantity", 25).unwrap();
    store
}

// ============================================================================
// Two-phase Save Tests
// ============================================================================

#[test]
fn test_two_phase_save_success() {
    let mut store = edited_store();
    let mut adapter = MemoryAdapter::new();

    let pending = store.begin_save().unwrap();
    assert!(store.is_save_in_flight());

    let outcome = adapter.write(pending.blob());
    store.finish_save(pending, outcome).unwrap();

    assert!(!store.is_save_in_flight());
    assert!(!store.is_dirty());
    assert_eq!(store.saved_snapshot(), store.live());
}

#[test]
fn test_blob_encodes_live_tree() {
    let mut store = edited_store();
    let pending = store.begin_save().unwrap();

    let decoded: serde_json::Value = serde_json::from_str(pending.blob()).unwrap();
    assert_eq!(decoded["orderEntry"]["defaultQuantity"], serde_json::json!(25.0));
    assert_eq!(decoded["hotkeys"]["quickBuy"], serde_json::json!("Alt+B"));

    store.finish_save(pending, Ok(())).unwrap();
}

#[test]
fn test_mutations_blocked_while_in_flight() {
    let mut store = edited_store();
    let pending = store.begin_save().unwrap();

    assert_eq!(store.set("display.compactMode", true), Err(PrefsError::SaveInFlight));
    assert_eq!(store.reset(), Err(PrefsError::SaveInFlight));
    assert!(matches!(store.load(None), Err(PrefsError::SaveInFlight)));
    assert!(matches!(store.begin_save(), Err(PrefsError::SaveInFlight)));

    // Reads stay available
    assert_eq!(store.get("orderEntry.defaultQuantity").unwrap(), &Value::Number(25.0));
    assert!(store.is_dirty());

    store.finish_save(pending, Ok(())).unwrap();
    store.set("display.compactMode", true).unwrap();
}

#[test]
fn test_failed_outcome_unlocks_and_keeps_dirty() {
    let mut store = edited_store();
    let pending = store.begin_save().unwrap();

    let failure = Err(PrefsError::Persistence("disk full".to_string()));
    let result = store.finish_save(pending, failure);

    assert_eq!(result, Err(PrefsError::Persistence("disk full".to_string())));
    assert!(!store.is_save_in_flight());
    assert!(store.is_dirty());
    assert_eq!(store.saved_snapshot(), store.defaults());
}

#[test]
fn test_foreign_ticket_is_stale() {
    let mut other = edited_store();
    other.save(&mut MemoryAdapter::new()).unwrap();
    let foreign = other.begin_save().unwrap();
    assert_eq!(foreign.ticket(), 2);

    let mut store = edited_store();
    let own = store.begin_save().unwrap();

    assert_eq!(store.finish_save(foreign, Ok(())), Err(PrefsError::StaleSave(2)));
    assert!(store.is_save_in_flight(), "Stale outcome must not unlock");
    assert!(store.is_dirty());

    store.finish_save(own, Ok(())).unwrap();
    assert!(!store.is_dirty());
}

#[test]
fn test_finish_without_begin_is_stale() {
    let mut other = edited_store();
    let pending = other.begin_save().unwrap();

    let mut store = edited_store();
    assert_eq!(store.finish_save(pending, Ok(())), Err(PrefsError::StaleSave(1)));
    assert!(store.is_dirty());
}

#[test]
fn test_tickets_increase() {
    let mut store = edited_store();
    let mut adapter = MemoryAdapter::new();

    let first = store.begin_save().unwrap();
    let first_ticket = first.ticket();
    store.finish_save(first, Ok(())).unwrap();

    store.set("orderEntry.defaultQuantity", 30).unwrap();
    let second = store.begin_save().unwrap();
    assert!(second.ticket() > first_ticket);

    let outcome = adapter.write(second.blob());
    store.finish_save(second, outcome).unwrap();
    assert_eq!(adapter.write_count(), 1);
}

// ============================================================================
// Abandoned Save Tests
// ============================================================================

#[test]
fn test_dropped_pending_save_keeps_store_locked() {
    let mut store = edited_store();
    let ticket = store.begin_save().unwrap().ticket();

    assert_eq!(store.in_flight_ticket(), Some(ticket));
    assert_eq!(store.set("display.compactMode", true), Err(PrefsError::SaveInFlight));
}

#[test]
fn test_abandon_save_unlocks_every_mutation() {
    let mut store = edited_store();
    drop(store.begin_save().unwrap());

    let ticket = store.in_flight_ticket().unwrap();
    store.abandon_save(ticket).unwrap();

    assert!(!store.is_save_in_flight());
    assert_eq!(store.in_flight_ticket(), None);
    store.set("display.compactMode", true).unwrap();
    store.reset().unwrap();
    store.load(None).unwrap();

    let next = store.begin_save().unwrap();
    assert!(next.ticket() > ticket);
    store.finish_save(next, Ok(())).unwrap();
}

#[test]
fn test_abandon_keeps_snapshot_and_dirty_state() {
    let mut store = edited_store();
    let pending = store.begin_save().unwrap();

    store.abandon_save(pending.ticket()).unwrap();

    assert!(store.is_dirty());
    assert_eq!(store.saved_snapshot(), store.defaults());
    assert_eq!(store.get("orderEntry.defaultQuantity").unwrap(), &Value::Number(25.0));

    // The abandoned save can no longer land
    let ticket = pending.ticket();
    assert_eq!(store.finish_save(pending, Ok(())), Err(PrefsError::StaleSave(ticket)));
    assert!(store.is_dirty());
}

#[test]
fn test_abandon_with_wrong_ticket_is_stale() {
    let mut store = edited_store();
    let pending = store.begin_save().unwrap();
    let wrong = pending.ticket() + 1;

    assert_eq!(store.abandon_save(wrong), Err(PrefsError::StaleSave(wrong)));
    assert!(store.is_save_in_flight(), "Wrong ticket must not unlock");

    store.finish_save(pending, Ok(())).unwrap();
    assert_eq!(store.abandon_save(1), Err(PrefsError::StaleSave(1)));
}

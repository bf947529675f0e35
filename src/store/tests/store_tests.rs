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
use std::collections::BTreeMap;

use crate::core::{
    CaptureOutcome, CaptureState, CollisionPolicy, FieldType, HotkeyAction, HotkeyCaptureMachine,
    KeyCombo, KeyEvent, PrefPath, Value,
};
use crate::error::PrefsError;

/// Helper: store that has loaded nothing
fn fresh_store() -> PreferenceStore {
    let mut store = PreferenceStore::trading();
    store.load(None).unwrap();
    store
}

fn store_with_policy(policy: CollisionPolicy) -> PreferenceStore {
    let mut store = fresh_store();
    store.set_collision_policy(policy);
    store
}

fn combo(s: &str) -> KeyCombo {
    s.parse().unwrap()
}

// ============================================================================
// Load Tests
// ============================================================================

#[test]
fn test_load_without_blob_yields_defaults() {
    let mut store = PreferenceStore::trading();
    let live = store.load(None).unwrap().clone();

    assert_eq!(&live, store.defaults());
    assert_eq!(store.saved_snapshot(), store.defaults());
    assert!(!store.is_dirty());
    assert_eq!(store.load_report().source, LoadSource::Defaults);
}

#[test]
fn test_load_subset_overrides_only_those_fields() {
    let mut store = PreferenceStore::trading();
    store
        .load(Some(r#"{"orderEntry": {"defaultQuantity": 25}, "display": {"theme": "light"}}"#))
        .unwrap();

    let changes = store.diff_from_defaults();
    let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["display.theme", "orderEntry.defaultQuantity"]);

    assert_eq!(store.get("orderEntry.defaultQuantity").unwrap(), &Value::Number(25.0));
    assert_eq!(store.get("orderEntry.defaultOrderType").unwrap(), &Value::from("market"));
    assert!(!store.is_dirty(), "Loaded state is the saved snapshot");
}

#[test]
fn test_load_discards_unknown_fields() {
    let mut store = PreferenceStore::trading();
    store
        .load(Some(
            r#"{"legacyWidget": {"x": 1}, "risk": {"enableStopLoss": false, "trailing": true}}"#,
        ))
        .unwrap();

    assert_eq!(store.get("risk.enableStopLoss").unwrap(), &Value::Bool(false));
    assert!(matches!(store.get("legacyWidget"), Err(PrefsError::NotFound(_))));
    assert!(store.live().get(&PrefPath::from("risk.trailing")).is_none());
    assert!(store.live().root().get("legacyWidget").is_none());

    let mut discarded = store.load_report().discarded.clone();
    discarded.sort();
    assert_eq!(discarded, vec!["legacyWidget", "risk.trailing"]);
}

#[test]
fn test_load_wrong_type_falls_back_to_default() {
    let mut store = PreferenceStore::trading();
    store
        .load(Some(
            r#"{"orderEntry": {"defaultQuantity": "lots", "confirmBeforeSubmit": false}}"#,
        ))
        .unwrap();

    assert_eq!(store.get("orderEntry.defaultQuantity").unwrap(), &Value::Number(10.0));
    assert_eq!(store.get("orderEntry.confirmBeforeSubmit").unwrap(), &Value::Bool(false));

    let reverted = &store.load_report().reverted;
    assert_eq!(reverted.len(), 1);
    assert_eq!(reverted[0].path, "orderEntry.defaultQuantity");
}

#[test]
fn test_load_malformed_blob_is_like_no_blob() {
    let mut store = PreferenceStore::trading();
    store.load(Some("{ not json")).unwrap();

    assert_eq!(store.live(), store.defaults());
    assert!(store.load_report().is_unreadable());
}

#[test]
fn test_load_huge_number_reverts_only_that_field() {
    let mut store = PreferenceStore::trading();
    store
        .load(Some(r#"{"display":{"theme":"light"},"risk":{"maxPositionSize":1e400}}"#))
        .unwrap();

    assert_eq!(store.get("display.theme").unwrap(), &Value::from("light"));
    assert_eq!(store.get("risk.maxPositionSize").unwrap(), &Value::Number(1_000.0));

    let report = store.load_report();
    assert_eq!(report.source, LoadSource::Persisted);
    assert_eq!(report.reverted.len(), 1);
    assert_eq!(report.reverted[0].path, "risk.maxPositionSize");
    assert!(!store.is_dirty());
}

#[test]
fn test_load_non_record_blob_is_like_no_blob() {
    let mut store = PreferenceStore::trading();
    store.load(Some("[1, 2, 3]")).unwrap();

    assert_eq!(store.live(), store.defaults());
    assert!(matches!(store.load_report().source, LoadSource::Unreadable(_)));
}

#[test]
fn test_load_from_failing_adapter_uses_defaults() {
    let mut adapter = MemoryAdapter::with_blob(r#"{"display": {"theme": "light"}}"#);
    adapter.set_fail_reads(true);

    let mut store = PreferenceStore::trading();
    store.load_from(&adapter).unwrap();

    assert_eq!(store.live(), store.defaults());
    assert!(store.load_report().is_unreadable());
}

#[test]
fn test_load_replaces_previous_edits() {
    let mut store = fresh_store();
    store.set("display.compactMode", true).unwrap();
    assert!(store.is_dirty());

    store.load(None).unwrap();
    assert_eq!(store.get("display.compactMode").unwrap(), &Value::Bool(false));
    assert!(!store.is_dirty());
}

#[test]
fn test_merge_previews_without_touching_store() {
    let store = fresh_store();
    let (tree, report) = store.merge(r#"{"display": {"theme": "light", "font": "mono"}}"#);

    assert_eq!(tree.get(&PrefPath::from("display.theme")), Some(&Value::from("light")));
    assert_eq!(report.discarded, vec!["display.font"]);
    assert_eq!(store.live(), store.defaults());
    assert!(!store.is_dirty());
}

// ============================================================================
// Get / Set Tests
// ============================================================================

#[test]
fn test_get_unknown_path_is_not_found() {
    let store = fresh_store();

    assert_eq!(
        store.get("orderEntry.leverage"),
        Err(PrefsError::NotFound("orderEntry.leverage".to_string()))
    );
    assert!(matches!(store.get(""), Err(PrefsError::NotFound(_))));
    assert!(matches!(
        store.get("orderEntry.defaultQuantity.inner"),
        Err(PrefsError::NotFound(_))
    ));
}

#[test]
fn test_get_record_returns_whole_section() {
    let store = fresh_store();
    let chart = store.get("display.chart").unwrap();

    let record = chart.as_record().unwrap();
    assert_eq!(record.get("interval"), Some(&Value::from("1m")));
    assert_eq!(record.get("showVolume"), Some(&Value::Bool(true)));
}

#[test]
fn test_set_type_mismatch_leaves_live_unchanged() {
    let mut store = fresh_store();
    let before = store.live().clone();

    let result = store.set("orderEntry.defaultQuantity", "twenty");

    assert_eq!(
        result,
        Err(PrefsError::TypeMismatch {
            path: "orderEntry.defaultQuantity".to_string(),
            expected: FieldType::Number,
            found: FieldType::Text,
        })
    );
    assert_eq!(store.live(), &before);
    assert!(!store.is_dirty());
}

#[test]
fn test_set_unknown_path_is_not_found() {
    let mut store = fresh_store();
    assert!(matches!(
        store.set("orderEntry.leverage", 3),
        Err(PrefsError::NotFound(_))
    ));
}

#[test]
fn test_set_out_of_range_is_rejected() {
    let mut store = fresh_store();

    assert!(matches!(
        store.set("orderEntry.defaultQuantity", 0),
        Err(PrefsError::InvalidValue { .. })
    ));
    assert!(matches!(
        store.set("risk.stopLossPercent", 150.0),
        Err(PrefsError::InvalidValue { .. })
    ));
    assert!(matches!(
        store.set("risk.maxPositionSize", f64::NAN),
        Err(PrefsError::InvalidValue { .. })
    ));
    assert_eq!(store.live(), store.defaults());
}

#[test]
fn test_set_text_outside_options_is_rejected() {
    let mut store = fresh_store();

    assert!(matches!(
        store.set("display.theme", "neon"),
        Err(PrefsError::InvalidValue { .. })
    ));
    store.set("display.theme", "light").unwrap();
    assert_eq!(store.get("display.theme").unwrap(), &Value::from("light"));
}

#[test]
fn test_set_hotkey_stores_canonical_form() {
    let mut store = fresh_store();
    store.set("hotkeys.quickBuy", "shift + ctrl + b").unwrap();

    assert_eq!(store.get("hotkeys.quickBuy").unwrap(), &Value::from("Ctrl+Shift+B"));
}

#[test]
fn test_set_modifier_only_hotkey_is_rejected() {
    let mut store = fresh_store();

    let result = store.set("hotkeys.quickBuy", "Ctrl+Shift");
    assert!(matches!(result, Err(PrefsError::InvalidHotkey { .. })));
    assert_eq!(store.get("hotkeys.quickBuy").unwrap(), &Value::from("Alt+B"));
}

#[test]
fn test_set_whole_record() {
    let mut store = fresh_store();
    let chart = BTreeMap::from([
        ("interval".to_string(), Value::from("5m")),
        ("showVolume".to_string(), Value::Bool(false)),
    ]);

    store.set("display.chart", Value::Record(chart)).unwrap();

    assert_eq!(store.get("display.chart.interval").unwrap(), &Value::from("5m"));
    assert_eq!(store.get("display.chart.showVolume").unwrap(), &Value::Bool(false));
}

#[test]
fn test_set_record_with_missing_field_is_rejected() {
    let mut store = fresh_store();
    let chart = BTreeMap::from([("interval".to_string(), Value::from("5m"))]);

    let result = store.set("display.chart", Value::Record(chart));

    assert!(matches!(result, Err(PrefsError::InvalidValue { ref path, .. }) if path == "display.chart.showVolume"));
    assert_eq!(store.live(), store.defaults());
}

#[test]
fn test_set_same_value_stays_clean() {
    let mut store = fresh_store();
    store.set("orderEntry.defaultQuantity", 10).unwrap();
    assert!(!store.is_dirty());
}

#[test]
fn test_setting_back_to_saved_value_clears_dirty() {
    let mut store = fresh_store();

    store.set("notifications.sound", true).unwrap();
    assert!(store.is_dirty());

    store.set("notifications.sound", false).unwrap();
    assert!(!store.is_dirty(), "Dirty is deep equality, not an edit counter");
}

// ============================================================================
// Reset / Dirty Tests
// ============================================================================

#[test]
fn test_end_to_end_quantity_scenario() {
    let mut store = fresh_store();
    let mut adapter = MemoryAdapter::new();
    assert_eq!(store.get("orderEntry.defaultQuantity").unwrap(), &Value::Number(10.0));

    store.set("orderEntry.defaultQuantity", 25).unwrap();
    assert!(store.is_dirty());

    store.save(&mut adapter).unwrap();
    assert!(!store.is_dirty());

    store.reset().unwrap();
    assert_eq!(store.get("orderEntry.defaultQuantity").unwrap(), &Value::Number(10.0));
    assert!(store.is_dirty(), "Saved snapshot still holds 25");
}

#[test]
fn test_reset_when_saved_equals_defaults_is_clean() {
    let mut store = fresh_store();
    store.set("autoTrade.enabled", true).unwrap();
    store.set("hotkeys.cancelAll", "F9").unwrap();
    assert!(store.is_dirty());

    store.reset().unwrap();

    assert_eq!(store.live(), store.defaults());
    assert!(!store.is_dirty());
}

#[test]
fn test_reset_dirtiness_matches_snapshot_rule() {
    let mut store = PreferenceStore::trading();
    store.load(Some(r#"{"display": {"compactMode": true}}"#)).unwrap();

    store.reset().unwrap();

    assert_eq!(store.live(), store.defaults());
    assert_eq!(store.is_dirty(), store.defaults() != store.saved_snapshot());
    assert!(store.is_dirty());
}

#[test]
fn test_diff_from_defaults_and_unsaved_changes() {
    let mut store = PreferenceStore::trading();
    store.load(Some(r#"{"risk": {"stopLossPercent": 2.5}}"#)).unwrap();
    store.set("autoTrade.maxTradesPerDay", 5).unwrap();

    let from_defaults: Vec<String> = store
        .diff_from_defaults()
        .into_iter()
        .map(|c| c.path)
        .collect();
    assert_eq!(from_defaults, vec!["autoTrade.maxTradesPerDay", "risk.stopLossPercent"]);

    let unsaved = store.unsaved_changes();
    assert_eq!(unsaved.len(), 1);
    assert_eq!(unsaved[0].path, "autoTrade.maxTradesPerDay");
    assert_eq!(unsaved[0].before, Value::Number(20.0));
    assert_eq!(unsaved[0].after, Value::Number(5.0));
}

// ============================================================================
// Save / Round-trip Tests
// ============================================================================

#[test]
fn test_save_then_load_round_trips() {
    let mut store = fresh_store();
    let mut adapter = MemoryAdapter::new();

    store.set("orderEntry.slippageTolerancePercent", 0.1 + 0.2).unwrap();
    store.set("display.theme", "light").unwrap();
    store.set("display.chart.interval", "4h").unwrap();
    store.set("hotkeys.autoTradeToggle", "Ctrl+Alt+Space").unwrap();
    store.set("hotkeys.enabled", false).unwrap();
    store.save(&mut adapter).unwrap();

    let mut reloaded = PreferenceStore::trading();
    reloaded.load_from(&adapter).unwrap();

    assert_eq!(reloaded.live(), store.live());
    assert!(reloaded.load_report().is_clean());
    assert_eq!(adapter.write_count(), 1);
}

#[test]
fn test_failed_save_changes_nothing() {
    let mut store = fresh_store();
    let mut adapter = MemoryAdapter::new();
    adapter.set_fail_writes(true);

    store.set("orderEntry.defaultQuantity", 25).unwrap();
    let result = store.save(&mut adapter);

    assert!(matches!(result, Err(PrefsError::Persistence(_))));
    assert!(store.is_dirty());
    assert_eq!(store.saved_snapshot(), store.defaults());
    assert_eq!(store.get("orderEntry.defaultQuantity").unwrap(), &Value::Number(25.0));
    assert!(!store.is_save_in_flight());
    assert_eq!(adapter.blob(), None);
}

// ============================================================================
// Binding Tests
// ============================================================================

#[test]
fn test_current_bindings_defaults() {
    let store = fresh_store();
    let bindings = store.current_bindings();

    assert_eq!(bindings.len(), 4);
    assert_eq!(bindings[&HotkeyAction::QuickBuy], combo("Alt+B"));
    assert_eq!(bindings[&HotkeyAction::QuickSell], combo("Alt+S"));
    assert_eq!(bindings[&HotkeyAction::CancelAll], combo("Alt+C"));
    assert_eq!(bindings[&HotkeyAction::AutoTradeToggle], combo("Alt+T"));
    assert!(store.binding_conflicts().is_empty());
}

#[test]
fn test_action_for_looks_up_binding() {
    let store = fresh_store();

    assert_eq!(store.action_for(&combo("alt+s")), Some(HotkeyAction::QuickSell));
    assert_eq!(store.action_for(&combo("Ctrl+S")), None);
}

#[test]
fn test_allow_policy_keeps_duplicates() {
    let mut store = store_with_policy(CollisionPolicy::Allow);

    store.set("hotkeys.cancelAll", "Alt+B").unwrap();

    let conflicts = store.binding_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].key_combo, combo("Alt+B"));
    assert_eq!(
        conflicts[0].paths,
        vec![PrefPath::from("hotkeys.cancelAll"), PrefPath::from("hotkeys.quickBuy")]
    );
    assert_eq!(
        store.action_for(&combo("Alt+B")),
        Some(HotkeyAction::QuickBuy),
        "First action in declaration order wins"
    );
}

#[test]
fn test_reject_policy_refuses_taken_combo() {
    let mut store = store_with_policy(CollisionPolicy::Reject);

    let result = store.set("hotkeys.quickBuy", "alt+s");

    assert_eq!(
        result,
        Err(PrefsError::BindingConflict {
            combo: "Alt+S".to_string(),
            held_by: "hotkeys.quickSell".to_string(),
        })
    );
    assert_eq!(store.get("hotkeys.quickBuy").unwrap(), &Value::from("Alt+B"));
    assert!(!store.is_dirty());
}

#[test]
fn test_reject_policy_allows_rebinding_to_own_combo() {
    let mut store = store_with_policy(CollisionPolicy::Reject);
    store.set("hotkeys.quickBuy", "Alt+B").unwrap();
    store.set("hotkeys.quickBuy", "Ctrl+B").unwrap();
    assert_eq!(store.get("hotkeys.quickBuy").unwrap(), &Value::from("Ctrl+B"));
}

#[test]
fn test_swap_policy_exchanges_bindings() {
    let mut store = store_with_policy(CollisionPolicy::Swap);

    store.set("hotkeys.quickBuy", "Alt+S").unwrap();

    assert_eq!(store.get("hotkeys.quickBuy").unwrap(), &Value::from("Alt+S"));
    assert_eq!(store.get("hotkeys.quickSell").unwrap(), &Value::from("Alt+B"));
    assert!(store.binding_conflicts().is_empty());
}

// ============================================================================
// Capture Integration Tests
// ============================================================================

#[test]
fn test_capture_writes_through_store() {
    let mut store = fresh_store();
    let mut machine = HotkeyCaptureMachine::new();

    machine.start_capture(HotkeyAction::QuickBuy);
    let outcome = machine
        .handle_key(&mut store, &KeyEvent::new("b").with_ctrl())
        .unwrap();

    assert_eq!(
        outcome,
        CaptureOutcome::Bound {
            action: HotkeyAction::QuickBuy,
            combo: combo("Ctrl+B"),
        }
    );
    assert_eq!(store.get("hotkeys.quickBuy").unwrap(), &Value::from("Ctrl+B"));
    assert_eq!(machine.state(), CaptureState::Idle);
    assert!(store.is_dirty());
}

#[test]
fn test_second_capture_leaves_first_binding_alone() {
    let mut store = fresh_store();
    let mut machine = HotkeyCaptureMachine::new();

    machine.start_capture(HotkeyAction::QuickBuy);
    let dropped = machine.start_capture(HotkeyAction::QuickSell);
    assert_eq!(dropped, Some(HotkeyAction::QuickBuy));

    machine
        .handle_key(&mut store, &KeyEvent::new("F2"))
        .unwrap();

    assert_eq!(store.get("hotkeys.quickBuy").unwrap(), &Value::from("Alt+B"));
    assert_eq!(store.get("hotkeys.quickSell").unwrap(), &Value::from("F2"));
}

#[test]
fn test_rejected_capture_stays_open() {
    let mut store = store_with_policy(CollisionPolicy::Reject);
    let mut machine = HotkeyCaptureMachine::new();

    machine.start_capture(HotkeyAction::CancelAll);
    let result = machine.handle_key(&mut store, &KeyEvent::new("t").with_alt());

    assert!(matches!(result, Err(PrefsError::BindingConflict { .. })));
    assert_eq!(machine.state(), CaptureState::Capturing(HotkeyAction::CancelAll));

    machine
        .handle_key(&mut store, &KeyEvent::new("x").with_alt())
        .unwrap();
    assert_eq!(store.get("hotkeys.cancelAll").unwrap(), &Value::from("Alt+X"));
}

#[test]
fn test_options_deserialize_from_camel_case() {
    let options: StoreOptions = serde_json::from_str(r#"{"collisionPolicy": "swap"}"#).unwrap();
    assert_eq!(options.collision_policy, CollisionPolicy::Swap);

    let empty: StoreOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, StoreOptions::default());
}

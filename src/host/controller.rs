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

//! Controller - Coordinates store, capture and persistence
//!
//! The controller owns everything a settings screen talks to:
//! - The `PreferenceStore` (defaults, live and saved trees)
//! - The `HotkeyCaptureMachine` for rebinding shortcuts
//! - The `PersistenceAdapter` the store loads from and saves to
//!
//! Key events go through `handle_key` in every state: while capturing
//! they rebind the action being captured, otherwise they are looked up
//! against the current bindings so the host knows which action to fire.

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::{
    hotkey::HOTKEY_SECTION, CaptureOutcome, CaptureState, CollisionPolicy, HotkeyAction,
    HotkeyCaptureMachine, KeyCombo, KeyEvent, PrefPath, Schema, Value,
};
use crate::error::PrefsError;
use crate::store::{LoadReport, PersistenceAdapter, PreferenceStore, StoreOptions};

/// What a key event amounted to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyOutcome {
    /// Capture finished: `action` is now bound to `combo`
    Bound {
        action: HotkeyAction,
        combo: KeyCombo,
    },
    /// Capture still open, waiting for a non-modifier key
    AwaitingKey(HotkeyAction),
    /// Event matches a binding; the host should run `action`
    Triggered(HotkeyAction),
    /// Not a bound combination, or hotkeys are disabled
    Unhandled,
}

/// Single owner of the preference state for one host.
#[derive(Debug)]
pub struct Controller<A: PersistenceAdapter> {
    store: PreferenceStore,
    capture: HotkeyCaptureMachine,
    adapter: A,
}

impl<A: PersistenceAdapter> Controller<A> {
    pub fn new(schema: Schema, options: StoreOptions, adapter: A) -> Self {
        Self {
            store: PreferenceStore::with_options(schema, options),
            capture: HotkeyCaptureMachine::new(),
            adapter,
        }
    }

    /// Controller over the trading schema with default options.
    pub fn trading(adapter: A) -> Self {
        Self::new(crate::core::trading_schema(), StoreOptions::default(), adapter)
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn set_collision_policy(&mut self, policy: CollisionPolicy) {
        self.store.set_collision_policy(policy);
    }

    /// Loads from the adapter. Any open capture is dropped first, since
    /// the bindings it was editing are about to be replaced.
    pub fn load(&mut self) -> Result<&LoadReport, PrefsError> {
        self.capture.cancel();
        self.store.load_from(&self.adapter)?;
        Ok(self.store.load_report())
    }

    pub fn get(&self, path: impl Into<PrefPath>) -> Result<&Value, PrefsError> {
        self.store.get(path)
    }

    pub fn set(
        &mut self,
        path: impl Into<PrefPath>,
        value: impl Into<Value>,
    ) -> Result<(), PrefsError> {
        self.store.set(path, value)
    }

    /// Restores the defaults and drops any open capture.
    pub fn reset(&mut self) -> Result<(), PrefsError> {
        self.store.reset()?;
        self.capture.cancel();
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), PrefsError> {
        self.store.save(&mut self.adapter)
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Starts rebinding `action`. Returns the action whose capture was
    /// replaced, if one was open.
    pub fn start_capture(&mut self, action: HotkeyAction) -> Option<HotkeyAction> {
        self.capture.start_capture(action)
    }

    pub fn cancel_capture(&mut self) -> Option<HotkeyAction> {
        self.capture.cancel()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn current_bindings(&self) -> BTreeMap<HotkeyAction, KeyCombo> {
        self.store.current_bindings()
    }

    /// Routes a key event.
    ///
    /// # Errors
    ///
    /// Only while capturing: the binding was refused (`BindingConflict`,
    /// `InvalidHotkey`, `SaveInFlight`). The capture stays open.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Result<KeyOutcome, PrefsError> {
        match self.capture.handle_key(&mut self.store, event)? {
            CaptureOutcome::Bound { action, combo } => Ok(KeyOutcome::Bound { action, combo }),
            CaptureOutcome::AwaitingKey(action) => Ok(KeyOutcome::AwaitingKey(action)),
            CaptureOutcome::NotCapturing => Ok(self.dispatch(event)),
        }
    }

    fn dispatch(&self, event: &KeyEvent) -> KeyOutcome {
        if !self.hotkeys_enabled() || event.is_bare_modifier() {
            return KeyOutcome::Unhandled;
        }

        let Ok(combo) = KeyCombo::from_event(event) else {
            return KeyOutcome::Unhandled;
        };

        match self.store.action_for(&combo) {
            Some(action) => {
                debug!(%action, %combo, "hotkey triggered");
                KeyOutcome::Triggered(action)
            }
            None => KeyOutcome::Unhandled,
        }
    }

    fn hotkeys_enabled(&self) -> bool {
        let path = PrefPath::from_segments(&[HOTKEY_SECTION, "enabled"]);
        self.store
            .get(path)
            .ok()
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

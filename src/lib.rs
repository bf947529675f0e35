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

//! Trading Preferences
//!
//! Preference state for a trading interface: a fixed schema, factory
//! defaults, the live tree the user edits and the snapshot last saved.
//!
//! # Features
//!
//! - **Schema-scoped merge:** Persisted blobs are merged over the defaults;
//!   unknown keys are dropped, ill-typed values fall back
//! - **Dirty tracking:** Deep comparison against the last saved snapshot
//! - **Hotkey capture:** Two-state machine that binds one key combination
//! - **Collision policy:** Allow, reject or swap duplicate hotkeys
//! - **Atomic saves:** All-or-nothing, with timestamped file backups
//!
//! # Architecture
//!
//! - **`core`:** Data model and pure algorithms (schema, values, hotkeys, capture)
//! - **`store`:** `PreferenceStore`, merge, dirty tracking, persistence
//! - **`host`:** `Controller` tying store, capture and adapter together
//!
//! # Examples
//!
//! ## Editing and saving
//!
//! ```
//! use trade_prefs::store::{MemoryAdapter, PreferenceStore};
//!
//! let mut adapter = MemoryAdapter::new();
//! let mut store = PreferenceStore::trading();
//! store.load_from(&adapter)?;
//!
//! store.set("display.theme", "light")?;
//! store.save(&mut adapter)?;
//! assert!(!store.is_dirty());
//! # Ok::<(), trade_prefs::PrefsError>(())
//! ```
//!
//! ## Rebinding a hotkey
//!
//! ```
//! use trade_prefs::core::{HotkeyAction, KeyEvent};
//! use trade_prefs::host::{Controller, KeyOutcome};
//! use trade_prefs::store::MemoryAdapter;
//!
//! let mut controller = Controller::trading(MemoryAdapter::new());
//! controller.load()?;
//!
//! controller.start_capture(HotkeyAction::QuickBuy);
//! controller.handle_key(&KeyEvent::new("b").with_ctrl())?;
//!
//! let fired = controller.handle_key(&KeyEvent::new("b").with_ctrl())?;
//! assert_eq!(fired, KeyOutcome::Triggered(HotkeyAction::QuickBuy));
//! # Ok::<(), trade_prefs::PrefsError>(())
//! ```

pub mod core;
pub mod error;
pub mod host;
pub mod store;

// Re-export commonly used types for convenience
pub use core::{HotkeyAction, KeyCombo, PrefPath, Schema, Value};
pub use error::PrefsError;
pub use host::Controller;
pub use store::{PreferenceStore, StoreOptions};

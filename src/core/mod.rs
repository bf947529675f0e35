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

//! src/core/mod.rs
//!
//! Core business logic module
//!
//! This module contains the data model and the pure algorithms:
//! - Values, paths and the preference schema
//! - The factory schema for the trading interface
//! - Key combinations and their canonical form
//! - Hotkey collision detection
//! - The hotkey capture state machine
//!
//! Nothing here performs I/O; persistence lives in `store`.

pub mod capture;
pub mod conflict;
pub mod hotkey;
pub mod path;
pub mod schema;
pub mod trading;
pub mod value;

pub use capture::{BindingSink, CaptureOutcome, CaptureState, HotkeyCaptureMachine};
pub use conflict::{CollisionPolicy, Conflict, ConflictDetector};
pub use hotkey::{HotkeyAction, HotkeyError, KeyCombo, KeyEvent, Modifier};
pub use path::PrefPath;
pub use schema::{FieldKind, FieldSpec, Schema, SchemaBuilder, SchemaNode};
pub use trading::trading_schema;
pub use value::{FieldType, PreferenceTree, Value};

#[cfg(test)]
mod tests;

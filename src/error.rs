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

use thiserror::Error;

use crate::core::hotkey::HotkeyError;
use crate::core::value::FieldType;

/// Errors that can occur while reading or editing preferences.
#[derive(Debug, Error, PartialEq)]
pub enum PrefsError {
    /// Path does not exist in the schema.
    #[error("Preference not found: {0}")]
    NotFound(String),
    /// Value has the wrong type for the field at this path.
    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: FieldType,
        found: FieldType,
    },
    /// Value of the right type that breaks a field constraint: number out
    /// of bounds, text outside its option set, record of the wrong shape.
    #[error("Value rejected at '{path}': {reason}")]
    InvalidValue { path: String, reason: String },
    /// Text that does not describe a bindable key combination.
    #[error("Invalid hotkey at '{path}': {source}")]
    InvalidHotkey {
        path: String,
        #[source]
        source: HotkeyError,
    },
    /// Combination already held by another hotkey field (reject policy).
    #[error("Hotkey {combo} is already bound to '{held_by}'")]
    BindingConflict { combo: String, held_by: String },
    /// Adapter read or write failed.
    #[error("Persistence failed: {0}")]
    Persistence(String),
    /// Persisted blob could not be decoded.
    #[error("Malformed preferences blob: {0}")]
    Parse(String),
    /// Mutation attempted while a save is waiting for its outcome.
    #[error("A save is already in flight")]
    SaveInFlight,
    /// Save outcome reported for a ticket that is not in flight.
    #[error("Save ticket {0} does not match the save in flight")]
    StaleSave(u64),
}

impl From<serde_json::Error> for PrefsError {
    fn from(err: serde_json::Error) -> Self {
        PrefsError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for PrefsError {
    fn from(err: std::io::Error) -> Self {
        PrefsError::Persistence(err.to_string())
    }
}

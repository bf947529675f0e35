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

//! src/core/value.rs
//!
//! Value model for preference trees
//!
//! - `Value`: a concrete preference value (scalar or nested record)
//! - `FieldType`: the declared type of a schema field
//! - `PreferenceTree`: one full instance of the schema
//!
//! Records are stored in a `BTreeMap`, so equality is independent of the
//! order fields were inserted or appeared in a persisted blob.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::hotkey::KeyCombo;
use crate::core::path::PrefPath;

/// Declared type of a schema field.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldType {
    Bool,
    Number,
    Text,
    /// Canonical key-combination string
    Hotkey,
    Record,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "boolean"),
            FieldType::Number => write!(f, "number"),
            FieldType::Text => write!(f, "string"),
            FieldType::Hotkey => write!(f, "hotkey"),
            FieldType::Record => write!(f, "record"),
        }
    }
}

/// A preference value.
///
/// Hotkeys have no variant of their own: they are `Text` holding the
/// canonical combination (e.g. `"Ctrl+Shift+B"`), which keeps the
/// serialised form a plain string.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Runtime type of this value. Text always reports `Text`; whether it
    /// is a valid hotkey is decided by the schema.
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Bool(_) => FieldType::Bool,
            Value::Number(_) => FieldType::Number,
            Value::Text(_) => FieldType::Text,
            Value::Record(_) => FieldType::Record,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Converts a decoded JSON value. `null` and arrays have no
    /// counterpart in the schema and yield `None`.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            serde_json::Value::Object(map) => {
                let mut record = BTreeMap::new();
                for (key, child) in map {
                    record.insert(key.clone(), Value::from_json(child)?);
                }
                Some(Value::Record(record))
            }
            serde_json::Value::Null | serde_json::Value::Array(_) => None,
        }
    }

    /// Short name of a JSON value's shape, for load reports.
    pub fn json_kind(json: &serde_json::Value) -> &'static str {
        match json {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "record",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Record(r) => {
                let fields = r
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{ {} }}", fields)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&KeyCombo> for Value {
    fn from(combo: &KeyCombo) -> Self {
        Value::Text(combo.to_string())
    }
}

/// A full preference tree: one instance of the schema.
///
/// Only the store builds these, from schema defaults or by merging a
/// persisted blob, so every tree it holds has the schema's exact shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PreferenceTree {
    root: BTreeMap<String, Value>,
}

impl PreferenceTree {
    pub(crate) fn from_root(root: BTreeMap<String, Value>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &BTreeMap<String, Value> {
        &self.root
    }

    /// Looks up the value at `path`, leaf or record.
    pub fn get(&self, path: &PrefPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get(first)?;
        for segment in rest {
            current = match current {
                Value::Record(children) => children.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub(crate) fn get_mut(&mut self, path: &PrefPath) -> Option<&mut Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get_mut(first)?;
        for segment in rest {
            current = match current {
                Value::Record(children) => children.get_mut(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Flattens the tree into `(dotted path, leaf value)` pairs in path order.
    pub fn leaves(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        collect_leaves(&self.root, "", &mut out);
        out
    }

    /// Serialises the tree as the persisted blob format.
    pub fn to_blob(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn collect_leaves<'a>(
    record: &'a BTreeMap<String, Value>,
    prefix: &str,
    out: &mut Vec<(String, &'a Value)>,
) {
    for (name, value) in record {
        let path = PrefPath::join(prefix, name);
        match value {
            Value::Record(children) => collect_leaves(children, &path, out),
            leaf => out.push((path, leaf)),
        }
    }
}

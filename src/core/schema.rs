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

//! src/core/schema.rs
//!
//! The fixed shape of the preference tree
//!
//! A `Schema` is a tree of named nodes. Leaves are `FieldSpec`s carrying a
//! `FieldKind` (type plus optional constraint) and a default value; inner
//! nodes are records. The default tree is derived from the schema, so the
//! two can never disagree about which fields exist.
//!
//! # Value checks
//! `FieldSpec::check` is the single gate every incoming value passes,
//! whether it comes from a user edit or a persisted blob:
//! 1. Type must match the declared kind
//! 2. Numbers must be finite and inside their bounds
//! 3. Text must be one of its options, when options are declared
//! 4. Hotkeys must parse; they are stored in canonical form

use std::collections::BTreeMap;

use crate::core::hotkey::parse_key_combo;
use crate::core::path::PrefPath;
use crate::core::value::{FieldType, PreferenceTree, Value};
use crate::error::PrefsError;

/// Declared kind of a leaf field, with its constraint.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Bool,
    /// Inclusive bounds; `None` means unbounded on that side
    Number { min: Option<f64>, max: Option<f64> },
    /// Closed set of accepted values, or any text when `None`
    Text { options: Option<Vec<String>> },
    Hotkey,
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Bool => FieldType::Bool,
            FieldKind::Number { .. } => FieldType::Number,
            FieldKind::Text { .. } => FieldType::Text,
            FieldKind::Hotkey => FieldType::Hotkey,
        }
    }
}

/// A leaf field: its kind and its factory default.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    kind: FieldKind,
    default: Value,
}

impl FieldSpec {
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Checks `value` against this field and returns its normalised form.
    ///
    /// # Errors
    ///
    /// - `TypeMismatch` if the value's type is not the declared one
    /// - `InvalidValue` for non-finite or out-of-bounds numbers and for
    ///   text outside the option set
    /// - `InvalidHotkey` for text that is not a bindable combination
    pub fn check(&self, path: &str, value: Value) -> Result<Value, PrefsError> {
        match (&self.kind, value) {
            (FieldKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),

            (FieldKind::Number { min, max }, Value::Number(n)) => {
                if !n.is_finite() {
                    return Err(invalid(path, format!("{} is not a finite number", n)));
                }
                if let Some(min) = min {
                    if n < *min {
                        return Err(invalid(path, format!("{} is below the minimum {}", n, min)));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(invalid(path, format!("{} is above the maximum {}", n, max)));
                    }
                }
                Ok(Value::Number(n))
            }

            (FieldKind::Text { options }, Value::Text(s)) => {
                if let Some(options) = options {
                    if !options.contains(&s) {
                        return Err(invalid(
                            path,
                            format!("'{}' is not one of: {}", s, options.join(", ")),
                        ));
                    }
                }
                Ok(Value::Text(s))
            }

            (FieldKind::Hotkey, Value::Text(s)) => parse_key_combo(&s)
                .map(|combo| Value::Text(combo.to_string()))
                .map_err(|source| PrefsError::InvalidHotkey {
                    path: path.to_string(),
                    source,
                }),

            (kind, other) => Err(PrefsError::TypeMismatch {
                path: path.to_string(),
                expected: kind.field_type(),
                found: other.field_type(),
            }),
        }
    }

    /// Parses user-typed text (e.g. a CLI argument) into a checked value.
    pub fn parse_input(&self, path: &str, raw: &str) -> Result<Value, PrefsError> {
        let mismatch = || PrefsError::TypeMismatch {
            path: path.to_string(),
            expected: self.field_type(),
            found: FieldType::Text,
        };

        let value = match self.kind {
            FieldKind::Bool => match raw.trim().to_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(mismatch()),
            },
            FieldKind::Number { .. } => {
                Value::Number(raw.trim().parse::<f64>().map_err(|_| mismatch())?)
            }
            FieldKind::Text { .. } | FieldKind::Hotkey => Value::Text(raw.to_string()),
        };

        self.check(path, value)
    }
}

fn invalid(path: &str, reason: String) -> PrefsError {
    PrefsError::InvalidValue {
        path: path.to_string(),
        reason,
    }
}

/// A node of the schema tree.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaNode {
    Field(FieldSpec),
    Record(BTreeMap<String, SchemaNode>),
}

impl SchemaNode {
    pub fn field_type(&self) -> FieldType {
        match self {
            SchemaNode::Field(spec) => spec.field_type(),
            SchemaNode::Record(_) => FieldType::Record,
        }
    }

    /// Default value of this node; records are built from their children.
    pub fn default_value(&self) -> Value {
        match self {
            SchemaNode::Field(spec) => spec.default.clone(),
            SchemaNode::Record(children) => Value::Record(default_record(children)),
        }
    }

    /// Checks a value for this node. A record value must carry exactly
    /// the node's fields, each of which must pass its own check.
    pub fn check(&self, path: &str, value: Value) -> Result<Value, PrefsError> {
        match self {
            SchemaNode::Field(spec) => spec.check(path, value),
            SchemaNode::Record(children) => {
                let mut supplied = match value {
                    Value::Record(record) => record,
                    other => {
                        return Err(PrefsError::TypeMismatch {
                            path: path.to_string(),
                            expected: FieldType::Record,
                            found: other.field_type(),
                        })
                    }
                };

                if let Some(unknown) = supplied.keys().find(|k| !children.contains_key(*k)) {
                    return Err(PrefsError::NotFound(PrefPath::join(path, unknown)));
                }

                let mut checked = BTreeMap::new();
                for (name, child) in children {
                    let child_path = PrefPath::join(path, name);
                    let child_value = supplied.remove(name).ok_or_else(|| {
                        invalid(&child_path, "field is missing from the record".to_string())
                    })?;
                    checked.insert(name.clone(), child.check(&child_path, child_value)?);
                }
                Ok(Value::Record(checked))
            }
        }
    }
}

fn default_record(children: &BTreeMap<String, SchemaNode>) -> BTreeMap<String, Value> {
    children
        .iter()
        .map(|(name, node)| (name.clone(), node.default_value()))
        .collect()
}

/// The fixed, versionless shape of the preference tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    root: BTreeMap<String, SchemaNode>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn root(&self) -> &BTreeMap<String, SchemaNode> {
        &self.root
    }

    /// Finds the node at `path`. The empty path has no node.
    pub fn node(&self, path: &PrefPath) -> Option<&SchemaNode> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get(first)?;
        for segment in rest {
            current = match current {
                SchemaNode::Record(children) => children.get(segment)?,
                SchemaNode::Field(_) => return None,
            };
        }
        Some(current)
    }

    /// Finds the leaf field at `path`.
    pub fn field(&self, path: &PrefPath) -> Option<&FieldSpec> {
        match self.node(path)? {
            SchemaNode::Field(spec) => Some(spec),
            SchemaNode::Record(_) => None,
        }
    }

    /// Builds a fresh copy of the factory default tree.
    pub fn defaults(&self) -> PreferenceTree {
        PreferenceTree::from_root(default_record(&self.root))
    }

    /// All leaf paths whose declared type is `ty`, in path order.
    pub fn paths_of_type(&self, ty: FieldType) -> Vec<PrefPath> {
        let mut out = Vec::new();
        collect_paths(&self.root, &PrefPath::from_segments::<&str>(&[]), ty, &mut out);
        out
    }

    /// Defaults that fail their own field's check. A well-formed schema
    /// has none; the store logs any it finds at construction.
    pub fn default_violations(&self) -> Vec<PrefsError> {
        let mut violations = Vec::new();
        collect_violations(&self.root, "", &mut violations);
        violations
    }
}

fn collect_paths(
    record: &BTreeMap<String, SchemaNode>,
    prefix: &PrefPath,
    ty: FieldType,
    out: &mut Vec<PrefPath>,
) {
    for (name, node) in record {
        let path = prefix.child(name);
        match node {
            SchemaNode::Record(children) => collect_paths(children, &path, ty, out),
            SchemaNode::Field(spec) if spec.field_type() == ty => out.push(path),
            SchemaNode::Field(_) => {}
        }
    }
}

fn collect_violations(
    record: &BTreeMap<String, SchemaNode>,
    prefix: &str,
    out: &mut Vec<PrefsError>,
) {
    for (name, node) in record {
        let path = PrefPath::join(prefix, name);
        match node {
            SchemaNode::Record(children) => collect_violations(children, &path, out),
            SchemaNode::Field(spec) => {
                if let Err(e) = spec.check(&path, spec.default.clone()) {
                    out.push(e);
                }
            }
        }
    }
}

/// Fluent builder for schemas.
///
/// # Example
///
/// ```
/// use trade_prefs::core::Schema;
///
/// let schema = Schema::builder()
///     .record("orderEntry", |r| r.bounded("defaultQuantity", 10.0, 1.0, 1_000.0))
///     .record("hotkeys", |r| r.hotkey("quickBuy", "alt+b"))
///     .build();
///
/// assert!(schema.default_violations().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, SchemaNode>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bool(self, name: &str, default: bool) -> Self {
        self.field(name, FieldKind::Bool, Value::Bool(default))
    }

    /// Unbounded number.
    pub fn number(self, name: &str, default: f64) -> Self {
        self.field(
            name,
            FieldKind::Number { min: None, max: None },
            Value::Number(default),
        )
    }

    /// Number within `[min, max]`.
    pub fn bounded(self, name: &str, default: f64, min: f64, max: f64) -> Self {
        self.field(
            name,
            FieldKind::Number {
                min: Some(min),
                max: Some(max),
            },
            Value::Number(default),
        )
    }

    /// Number no smaller than `min`.
    pub fn at_least(self, name: &str, default: f64, min: f64) -> Self {
        self.field(
            name,
            FieldKind::Number {
                min: Some(min),
                max: None,
            },
            Value::Number(default),
        )
    }

    pub fn text(self, name: &str, default: &str) -> Self {
        self.field(name, FieldKind::Text { options: None }, Value::from(default))
    }

    /// Text restricted to `options`.
    pub fn choice(self, name: &str, default: &str, options: &[&str]) -> Self {
        let options = options.iter().map(|o| o.to_string()).collect();
        self.field(
            name,
            FieldKind::Text {
                options: Some(options),
            },
            Value::from(default),
        )
    }

    /// Hotkey field; the default is stored in canonical form when it parses.
    pub fn hotkey(self, name: &str, default: &str) -> Self {
        let canonical = parse_key_combo(default)
            .map(|combo| combo.to_string())
            .unwrap_or_else(|_| default.to_string());
        self.field(name, FieldKind::Hotkey, Value::Text(canonical))
    }

    /// Nested record built by `build`.
    pub fn record(mut self, name: &str, build: impl FnOnce(SchemaBuilder) -> SchemaBuilder) -> Self {
        let nested = build(SchemaBuilder::new());
        self.fields
            .insert(name.to_string(), SchemaNode::Record(nested.fields));
        self
    }

    pub fn build(self) -> Schema {
        Schema { root: self.fields }
    }

    fn field(mut self, name: &str, kind: FieldKind, default: Value) -> Self {
        self.fields
            .insert(name.to_string(), SchemaNode::Field(FieldSpec { kind, default }));
        self
    }
}

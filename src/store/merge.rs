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

//! Schema-scoped merge of a persisted blob over the defaults
//!
//! The schema drives the walk, never the blob:
//! - Fields present in both: records recurse, leaves go through
//!   `FieldSpec::check` and fall back to the default if it fails
//! - Fields missing from the blob keep their default
//! - Blob keys unknown to the schema are dropped and reported
//!
//! The result is therefore always isomorphic to the default tree, however
//! stale or hostile the blob is. Nothing here fails: every problem ends up
//! in the `LoadReport` instead.
//!
//! A blob that is well-formed but holds a leaf `serde_json` cannot decode
//! (e.g. `1e400`) is walked a second time as raw records, so only that
//! leaf falls back.

use std::collections::BTreeMap;

use serde_json::value::RawValue;
use serde_json::Map;

use crate::core::path::PrefPath;
use crate::core::schema::{Schema, SchemaNode};
use crate::core::value::{PreferenceTree, Value};

type JsonMap = Map<String, serde_json::Value>;
type RawMap = BTreeMap<String, Box<RawValue>>;

/// Where the live tree came from on the last load.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LoadSource {
    /// No blob was persisted
    #[default]
    Defaults,
    /// Blob parsed and merged
    Persisted,
    /// Blob unreadable or malformed; defaults used instead
    Unreadable(String),
}

/// A field whose persisted value was refused.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevertedField {
    pub path: String,
    pub reason: String,
}

/// Everything the last load had to correct.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoadReport {
    pub source: LoadSource,
    /// Blob paths with no counterpart in the schema
    pub discarded: Vec<String>,
    /// Fields that fell back to their default
    pub reverted: Vec<RevertedField>,
}

impl LoadReport {
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            source: LoadSource::Unreadable(reason.into()),
            ..Self::default()
        }
    }

    /// True when a blob existed but could not be used at all.
    pub fn is_unreadable(&self) -> bool {
        matches!(self.source, LoadSource::Unreadable(_))
    }

    /// True when the blob (if any) was taken over without corrections.
    pub fn is_clean(&self) -> bool {
        !self.is_unreadable()
            && self.discarded.is_empty()
            && self.reverted.is_empty()
    }
}

/// Decodes `blob` and merges it over the schema defaults.
///
/// A blob that is not valid JSON, or whose top level is not a record, is
/// treated exactly like no blob at all. Leaves that are valid JSON but
/// cannot be decoded revert one by one.
pub fn merge_blob(schema: &Schema, blob: &str) -> (PreferenceTree, LoadReport) {
    let decoded: serde_json::Value = match serde_json::from_str(blob) {
        Ok(decoded) => decoded,
        Err(e) => {
            return match serde_json::from_str::<RawMap>(blob) {
                Ok(raw) => merge_raw_over_defaults(schema, &raw),
                Err(_) => (schema.defaults(), LoadReport::unreadable(e.to_string())),
            };
        }
    };

    match decoded {
        serde_json::Value::Object(map) => merge_over_defaults(schema, &map),
        other => (
            schema.defaults(),
            LoadReport::unreadable(format!(
                "top level is a {}, expected a record",
                Value::json_kind(&other)
            )),
        ),
    }
}

/// Merges an already decoded top-level record over the schema defaults.
pub fn merge_over_defaults(schema: &Schema, blob: &JsonMap) -> (PreferenceTree, LoadReport) {
    let mut report = LoadReport {
        source: LoadSource::Persisted,
        ..LoadReport::default()
    };
    let root = merge_record(schema.root(), blob, "", &mut report);
    (PreferenceTree::from_root(root), report)
}

fn merge_raw_over_defaults(schema: &Schema, blob: &RawMap) -> (PreferenceTree, LoadReport) {
    let mut report = LoadReport {
        source: LoadSource::Persisted,
        ..LoadReport::default()
    };
    let root = merge_raw_record(schema.root(), blob, "", &mut report);
    (PreferenceTree::from_root(root), report)
}

fn merge_record(
    nodes: &BTreeMap<String, SchemaNode>,
    blob: &JsonMap,
    prefix: &str,
    report: &mut LoadReport,
) -> BTreeMap<String, Value> {
    let mut merged = BTreeMap::new();

    for (name, node) in nodes {
        let path = PrefPath::join(prefix, name);
        let value = match blob.get(name) {
            None => node.default_value(),
            Some(json) => merge_node(node, json, &path, report),
        };
        merged.insert(name.clone(), value);
    }

    for key in blob.keys().filter(|k| !nodes.contains_key(*k)) {
        report.discarded.push(PrefPath::join(prefix, key));
    }

    merged
}

fn merge_node(
    node: &SchemaNode,
    json: &serde_json::Value,
    path: &str,
    report: &mut LoadReport,
) -> Value {
    match (node, json) {
        (SchemaNode::Record(children), serde_json::Value::Object(map)) => {
            Value::Record(merge_record(children, map, path, report))
        }

        (SchemaNode::Record(_), other) => {
            revert(report, path, format!("expected record, found {}", Value::json_kind(other)));
            node.default_value()
        }

        (SchemaNode::Field(spec), json) => {
            let Some(candidate) = Value::from_json(json) else {
                revert(
                    report,
                    path,
                    format!("expected {}, found {}", spec.field_type(), Value::json_kind(json)),
                );
                return node.default_value();
            };

            match spec.check(path, candidate) {
                Ok(value) => value,
                Err(e) => {
                    revert(report, path, e.to_string());
                    node.default_value()
                }
            }
        }
    }
}

fn merge_raw_record(
    nodes: &BTreeMap<String, SchemaNode>,
    blob: &RawMap,
    prefix: &str,
    report: &mut LoadReport,
) -> BTreeMap<String, Value> {
    let mut merged = BTreeMap::new();

    for (name, node) in nodes {
        let path = PrefPath::join(prefix, name);
        let value = match blob.get(name) {
            None => node.default_value(),
            Some(raw) => merge_raw_node(node, raw, &path, report),
        };
        merged.insert(name.clone(), value);
    }

    for key in blob.keys().filter(|k| !nodes.contains_key(*k)) {
        report.discarded.push(PrefPath::join(prefix, key));
    }

    merged
}

/// Decodes one raw subtree; records that still fail are split further.
fn merge_raw_node(node: &SchemaNode, raw: &RawValue, path: &str, report: &mut LoadReport) -> Value {
    let error = match serde_json::from_str::<serde_json::Value>(raw.get()) {
        Ok(json) => return merge_node(node, &json, path, report),
        Err(e) => e,
    };

    if let SchemaNode::Record(children) = node {
        if let Ok(map) = serde_json::from_str::<RawMap>(raw.get()) {
            return Value::Record(merge_raw_record(children, &map, path, report));
        }
    }

    revert(report, path, error.to_string());
    node.default_value()
}

fn revert(report: &mut LoadReport, path: &str, reason: String) {
    report.reverted.push(RevertedField {
        path: path.to_string(),
        reason,
    });
}

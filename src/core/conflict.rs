//! Hotkey collision detection
//!
//! Several hotkey fields can end up holding the same combination (a
//! persisted blob written under a permissive policy, or an explicit
//! `CollisionPolicy::Allow`). This module indexes bindings by combination
//! so shared combinations can be listed and looked up in O(1).
//!
//! # Performance
//! - Add binding: O(1) average case
//! - Holders of a combo: O(1) average case
//! - List all conflicts: O(n log n) (sorted for stable output)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::core::hotkey::KeyCombo;
use crate::core::path::PrefPath;

/// What `set` does when a hotkey field receives a combination that
/// another hotkey field already holds.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Accept the duplicate and log it
    #[default]
    Allow,
    /// Fail with `BindingConflict`; nothing changes
    Reject,
    /// Give the other holder(s) the target's previous combination
    Swap,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Allow => write!(f, "allow"),
            CollisionPolicy::Reject => write!(f, "reject"),
            CollisionPolicy::Swap => write!(f, "swap"),
        }
    }
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(CollisionPolicy::Allow),
            "reject" => Ok(CollisionPolicy::Reject),
            "swap" => Ok(CollisionPolicy::Swap),
            other => Err(format!(
                "unknown collision policy '{}' (expected allow, reject or swap)",
                other
            )),
        }
    }
}

/// Indexes hotkey fields by the combination they hold.
///
/// A conflict exists when a combination has more than one holder.
#[derive(Debug, Default)]
pub struct ConflictDetector {
    bindings: HashMap<KeyCombo, Vec<PrefPath>>,
}

/// A combination shared by two or more hotkey fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Conflict {
    pub key_combo: KeyCombo,

    /// Every field holding the combination (always 2 or more), in path order
    pub paths: Vec<PrefPath>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the field at `path` holds `combo`.
    pub fn add_binding(&mut self, path: PrefPath, combo: KeyCombo) {
        self.bindings.entry(combo).or_default().push(path);
    }

    /// Fields currently holding `combo`.
    pub fn holders(&self, combo: &KeyCombo) -> &[PrefPath] {
        self.bindings.get(combo).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Finds all combinations with two or more holders, sorted by their
    /// first holder's path.
    pub fn find_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = self
            .bindings
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(key_combo, paths)| {
                let mut paths = paths.clone();
                paths.sort();
                Conflict {
                    key_combo: key_combo.clone(),
                    paths,
                }
            })
            .collect();

        conflicts.sort_by(|a, b| a.paths.cmp(&b.paths));
        conflicts
    }

    pub fn has_conflict(&self, combo: &KeyCombo) -> bool {
        self.holders(combo).len() > 1
    }

    pub fn total_bindings(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }
}

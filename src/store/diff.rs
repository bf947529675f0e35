//! Leaf-level differences between two preference trees

use std::collections::BTreeMap;

use crate::core::value::{PreferenceTree, Value};

/// One leaf whose value differs between two trees.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldChange {
    pub path: String,
    pub before: Value,
    pub after: Value,
}

/// Lists every leaf of `after` whose value differs from `before`, in path order.
///
/// Both trees come from the same schema, so their leaf sets are identical.
pub fn diff_trees(before: &PreferenceTree, after: &PreferenceTree) -> Vec<FieldChange> {
    let old: BTreeMap<String, &Value> = before.leaves().into_iter().collect();

    after
        .leaves()
        .into_iter()
        .filter_map(|(path, new)| {
            let previous = old.get(&path)?;
            if *previous == new {
                return None;
            }
            Some(FieldChange {
                before: (*previous).clone(),
                after: new.clone(),
                path,
            })
        })
        .collect()
}

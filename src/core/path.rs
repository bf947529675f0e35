//! src/core/path.rs
//!
//! Named paths into the preference tree
//!
//! A path is a list of field names from the root, written with dots
//! (`orderEntry.defaultQuantity`) or given as explicit segments. Paths are
//! never validated on construction: a malformed path simply does not exist
//! in the schema and lookups report `NotFound`.

use std::fmt;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PrefPath {
    segments: Vec<String>,
}

impl PrefPath {
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        Self {
            segments: segments.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a new path with `name` appended.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Joins a dotted prefix and a field name.
    pub(crate) fn join(prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    }
}

impl From<&str> for PrefPath {
    fn from(dotted: &str) -> Self {
        Self {
            segments: dotted.split('.').map(str::to_string).collect(),
        }
    }
}

impl From<String> for PrefPath {
    fn from(dotted: String) -> Self {
        PrefPath::from(dotted.as_str())
    }
}

impl From<&String> for PrefPath {
    fn from(dotted: &String) -> Self {
        PrefPath::from(dotted.as_str())
    }
}

impl From<&[&str]> for PrefPath {
    fn from(segments: &[&str]) -> Self {
        PrefPath::from_segments(segments)
    }
}

impl From<&PrefPath> for PrefPath {
    fn from(path: &PrefPath) -> Self {
        path.clone()
    }
}

impl fmt::Display for PrefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

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

//! Whole-blob persistence for preference trees
//!
//! The store only needs a last-write-wins read/write contract over one
//! serialised blob. Two adapters ship with the crate:
//!
//! - **`MemoryAdapter`**: in-process blob with failure injection
//! - **`FileAdapter`**: JSON file with atomic writes and optional
//!   timestamped backups of the previous file, pruned to the newest few
//!
//! # Example
//!
//! ```no_run
//! use trade_prefs::store::{FileAdapter, PersistenceAdapter};
//!
//! let mut adapter = FileAdapter::new("/tmp/trade-prefs/preferences.json").with_backups_kept(5);
//! adapter.write("{}")?;
//! assert_eq!(adapter.read()?.as_deref(), Some("{}"));
//! # Ok::<(), trade_prefs::PrefsError>(())
//! ```

use atomic_write_file::AtomicWriteFile;
use chrono::Local;
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::PrefsError;

/// External key-value blob store consumed by `PreferenceStore`.
pub trait PersistenceAdapter {
    /// Returns the persisted blob, or `None` if nothing was ever saved.
    fn read(&self) -> Result<Option<String>, PrefsError>;

    /// Replaces the persisted blob.
    fn write(&mut self, blob: &str) -> Result<(), PrefsError>;
}

impl<A: PersistenceAdapter + ?Sized> PersistenceAdapter for Box<A> {
    fn read(&self) -> Result<Option<String>, PrefsError> {
        (**self).read()
    }

    fn write(&mut self, blob: &str) -> Result<(), PrefsError> {
        (**self).write(blob)
    }
}

/// Keeps the blob in memory.
///
/// Reads and writes can be made to fail on demand, which lets hosts and
/// tests exercise the store's error paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryAdapter {
    blob: Option<String>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
            ..Self::default()
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn read(&self) -> Result<Option<String>, PrefsError> {
        if self.fail_reads {
            return Err(PrefsError::Persistence("memory store is unavailable".to_string()));
        }
        Ok(self.blob.clone())
    }

    fn write(&mut self, blob: &str) -> Result<(), PrefsError> {
        if self.fail_writes {
            return Err(PrefsError::Persistence("memory store rejected the write".to_string()));
        }
        self.blob = Some(blob.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// Stores the blob in a file.
///
/// Writes go through a temp file and an atomic rename, so the file is
/// never half-written. With backups enabled, the previous file is first
/// copied into a sibling `backups/` directory as `<name>.<timestamp>`.
/// With a retention limit, older backups beyond it are deleted after each
/// write.
#[derive(Clone, Debug)]
pub struct FileAdapter {
    path: PathBuf,
    backup_dir: Option<PathBuf>,
    backups_kept: Option<usize>,
}

/// Backups kept by the CLI unless told otherwise.
pub const DEFAULT_BACKUPS_KEPT: usize = 10;

impl FileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_dir: None,
            backups_kept: None,
        }
    }

    /// Enables backups next to the file,
    /// e.g. `~/.config/trade-prefs/preferences.json` → `~/.config/trade-prefs/backups/`.
    pub fn with_backups(mut self) -> Self {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        self.backup_dir = Some(parent.join("backups"));
        self
    }

    /// Enables backups and keeps only the `keep` newest.
    pub fn with_backups_kept(mut self, keep: usize) -> Self {
        self.backups_kept = Some(keep);
        self.with_backups()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> Option<&Path> {
        self.backup_dir.as_deref()
    }

    pub fn backups_kept(&self) -> Option<usize> {
        self.backups_kept
    }

    /// Existing backups, oldest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, PrefsError> {
        let Some(dir) = &self.backup_dir else {
            return Ok(Vec::new());
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();

        // Timestamps and counters are zero-padded, so lexical order is chronological
        backups.sort();
        Ok(backups)
    }

    /// Deletes all but the `keep` newest backups.
    ///
    /// Returns how many were deleted.
    pub fn cleanup_old_backups(&self, keep: usize) -> Result<usize, PrefsError> {
        let backups = self.list_backups()?;
        let excess = backups.len().saturating_sub(keep);

        for old in &backups[..excess] {
            fs::remove_file(old).map_err(|e| {
                PrefsError::Persistence(format!(
                    "Failed to delete old backup {}: {}",
                    old.display(),
                    e
                ))
            })?;
        }

        if excess > 0 {
            debug!(deleted = excess, kept = keep, "old backups pruned");
        }
        Ok(excess)
    }

    fn create_timestamped_backup(&self, dir: &Path) -> Result<PathBuf, PrefsError> {
        let content = fs::read_to_string(&self.path)?;

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                PrefsError::Persistence(format!(
                    "Backup directory not writable: {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        // YYYY-MM-DD_HHMMSS.micros
        let timestamp = Local::now().format("%Y-%m-%d_%H%M%S%.6f").to_string();

        let original_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("preferences.json");

        // Two saves within the same tick get a counter instead of overwriting
        let mut backup_path = dir.join(format!("{}.{}", original_name, timestamp));
        let mut counter = 0u32;
        while backup_path.exists() {
            counter += 1;
            backup_path = dir.join(format!("{}.{}-{:03}", original_name, timestamp, counter));
        }
        fs::write(&backup_path, content)?;

        Ok(backup_path)
    }
}

impl PersistenceAdapter for FileAdapter {
    fn read(&self) -> Result<Option<String>, PrefsError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PrefsError::Persistence(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write(&mut self, blob: &str) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        if let Some(dir) = &self.backup_dir {
            if self.path.exists() {
                let backup = self.create_timestamped_backup(dir)?;
                debug!(backup = %backup.display(), "previous preferences backed up");

                if let Some(keep) = self.backups_kept {
                    self.cleanup_old_backups(keep)?;
                }
            }
        }

        // Open file for atomic writing
        let mut file = AtomicWriteFile::options().open(&self.path).map_err(|e| {
            PrefsError::Persistence(format!("Failed to open for atomic write: {}", e))
        })?;

        file.write_all(blob.as_bytes())
            .map_err(|e| PrefsError::Persistence(format!("Failed to write content: {}", e)))?;

        // Commit atomically
        file.commit().map_err(|e| {
            PrefsError::Persistence(format!("Failed to commit atomic write: {}", e))
        })?;

        Ok(())
    }
}

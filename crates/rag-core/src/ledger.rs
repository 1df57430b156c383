//! Local ledger of uploaded files, stored as JSON next to the working directory
//!
//! The file is one object keyed by absolute local path. It is written after
//! every change so a crash loses at most the file currently in flight.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, sanitize};

/// Last-known remote metadata for one local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Remote file resource name (`files/<id>`)
    pub file_id: String,
    /// Same value as `file_id`; kept so older ledgers stay readable
    #[serde(default)]
    pub file_name: String,
    /// Local filename at upload time
    #[serde(default)]
    pub original_file_name: String,
    /// Sanitized name derived from `original_file_name`
    #[serde(default)]
    pub safe_file_name: String,
    /// Blake3 hash of the content that was uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl LedgerEntry {
    /// Build an entry from an upload result.
    pub fn new(remote_name: &str, original_file_name: &str, safe_file_name: &str) -> Self {
        Self {
            file_id: remote_name.to_string(),
            file_name: remote_name.to_string(),
            original_file_name: original_file_name.to_string(),
            safe_file_name: safe_file_name.to_string(),
            content_hash: None,
        }
    }

    /// Attach the hash of the uploaded content.
    pub fn with_content_hash(mut self, hash: String) -> Self {
        self.content_hash = Some(hash);
        self
    }

    /// Whether the entry may be used as an import input.
    pub fn is_valid(&self) -> bool {
        sanitize::is_valid_file_id(&self.file_id)
    }
}

/// Mapping of absolute local path to [`LedgerEntry`], bound to its file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Empty ledger that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the ledger from disk. A missing file is an empty ledger; an
    /// unreadable or malformed one is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::empty(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let entries = serde_json::from_str(&content)?;
        Ok(Self { path, entries })
    }

    /// Load the ledger, treating any failure as an empty ledger.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(&path) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable ledger {}: {} (starting empty)",
                    path.display(),
                    e
                );
                Self::empty(path)
            }
        }
    }

    /// Write the ledger to disk via a temporary file and rename, so a failed
    /// write never leaves a truncated ledger behind.
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached entry for `key`, if it has a file id.
    pub fn lookup(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.get(key).filter(|e| !e.file_id.is_empty())
    }

    /// Record an entry and persist immediately.
    pub fn record(&mut self, key: String, entry: LedgerEntry) -> Result<()> {
        self.entries.insert(key, entry);
        self.save()
    }

    /// Insert without persisting.
    pub fn insert(&mut self, key: String, entry: LedgerEntry) {
        self.entries.insert(key, entry);
    }

    /// Remove every entry whose file id is missing or malformed, returning
    /// the removed keys. Nothing is written when nothing was removed.
    pub fn prune(&mut self) -> Result<Vec<String>> {
        let removed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_valid())
            .map(|(key, _)| key.clone())
            .collect();

        if removed.is_empty() {
            return Ok(removed);
        }

        for key in &removed {
            if let Some(entry) = self.entries.remove(key) {
                tracing::warn!("Removing invalid state entry: {} -> {:?}", key, entry.file_id);
            }
        }
        self.save()?;
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LedgerEntry)> {
        self.entries.iter()
    }
}

/// Ledger key for a local file: its absolute, symlink-resolved path.
pub fn ledger_key(path: &Path) -> Result<String> {
    Ok(path.canonicalize()?.to_string_lossy().to_string())
}

/// Blake3 hash of a file's content, used to spot local edits after upload.
pub fn content_hash(path: &Path) -> Result<String> {
    let content = std::fs::read(path)?;
    Ok(blake3::hash(&content).to_hex().to_string())
}

/// Remove the ledger file. Returns whether it existed.
pub fn delete_ledger_file(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

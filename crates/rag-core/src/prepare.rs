//! Batch driver: resolve the store, upload new files, import them

use std::path::{Path, PathBuf};

use crate::import::{ImportResult, Importer, PollPolicy};
use crate::ledger::{self, Ledger, LedgerEntry};
use crate::service::{FileSearchService, RemoteStore};
use crate::upload::{UploadOptions, Uploader};
use crate::{Config, Result, discover, store};

/// Progress events emitted while preparing.
#[derive(Debug, Clone)]
pub enum ProgressEvent<'a> {
    /// Files found in the docs folder.
    Found { total: usize },
    /// Uploading (or reusing) a file.
    Uploading {
        current: usize,
        total: usize,
        path: &'a Path,
    },
    /// Importing a file into the store.
    Importing {
        current: usize,
        total: usize,
        path: &'a Path,
    },
}

/// Type alias for progress callback.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent)>;

/// Stats from a prepare run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrepareStats {
    pub files_found: usize,
    pub files_uploaded: usize,
    pub files_reused: usize,
    pub files_imported: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub entries_pruned: usize,
}

/// Result of a prepare run.
#[derive(Debug)]
pub struct PrepareOutcome {
    pub store: RemoteStore,
    pub stats: PrepareStats,
}

/// The preparer syncs a docs folder into a file search store.
pub struct Preparer<'a> {
    service: &'a dyn FileSearchService,
    ledger: Ledger,
    docs_dir: PathBuf,
    store_name: String,
    options: UploadOptions,
    poll: PollPolicy,
    progress_callback: Option<ProgressCallback>,
}

impl<'a> Preparer<'a> {
    /// Create a preparer, loading the ledger named in `config`.
    /// An unreadable ledger starts out empty.
    pub fn new(service: &'a dyn FileSearchService, config: &Config) -> Self {
        let ledger = Ledger::load_or_default(&config.state_file);
        Self::with_ledger(service, config, ledger)
    }

    /// Create a preparer around an already-loaded ledger.
    pub fn with_ledger(service: &'a dyn FileSearchService, config: &Config, ledger: Ledger) -> Self {
        Self {
            service,
            ledger,
            docs_dir: config.docs_dir.clone(),
            store_name: config.store_name.clone(),
            options: config.upload_options(),
            poll: config.poll_policy(),
            progress_callback: None,
        }
    }

    /// Set a callback to receive progress updates.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress_callback = Some(callback);
    }

    fn emit_progress(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Drop ledger entries with missing or malformed ids.
    pub fn clean_state(&mut self) -> Result<Vec<String>> {
        self.ledger.prune()
    }

    /// Upload and import every file in the docs folder.
    ///
    /// Failures on one file are logged and counted; the batch always runs to
    /// the end. Only a missing docs folder or a store that cannot be
    /// resolved aborts the run.
    pub fn prepare(&mut self) -> Result<PrepareOutcome> {
        let files = discover::list_documents(&self.docs_dir)?;
        let store = store::resolve_or_create(self.service, &self.store_name, self.options)?;

        let mut stats = PrepareStats {
            files_found: files.len(),
            ..PrepareStats::default()
        };
        if files.is_empty() {
            tracing::warn!("No files found in {}", self.docs_dir.display());
            return Ok(PrepareOutcome { store, stats });
        }

        stats.entries_pruned = self.clean_state()?.len();
        self.emit_progress(ProgressEvent::Found { total: files.len() });

        let total = files.len();
        for (i, path) in files.iter().enumerate() {
            let current = i + 1;
            self.emit_progress(ProgressEvent::Uploading {
                current,
                total,
                path,
            });

            let entry = match self.upload(path) {
                Ok((entry, reused)) => {
                    if reused {
                        stats.files_reused += 1;
                    } else {
                        stats.files_uploaded += 1;
                    }
                    entry
                }
                Err(e) => {
                    tracing::warn!("Failed to upload {}: {}", path.display(), e);
                    stats.files_failed += 1;
                    continue;
                }
            };

            if entry.file_id.is_empty() {
                tracing::warn!("Skipping import for {}: no file id from upload", path.display());
                stats.files_skipped += 1;
                continue;
            }

            self.emit_progress(ProgressEvent::Importing {
                current,
                total,
                path,
            });
            match Importer::new(self.service, self.poll).import(&store, &entry.file_id) {
                ImportResult::Registered(_) => stats.files_imported += 1,
                ImportResult::Skipped(reason) => {
                    tracing::warn!("Import skipped for {}: {}", path.display(), reason);
                    stats.files_skipped += 1;
                }
                ImportResult::Failed(failure) => {
                    tracing::warn!("Failed importing {}: {}", path.display(), failure);
                    stats.files_failed += 1;
                }
            }
        }

        Ok(PrepareOutcome { store, stats })
    }

    /// Upload one file, reporting whether the ledger already had it.
    fn upload(&mut self, path: &Path) -> Result<(LedgerEntry, bool)> {
        let reused = ledger::ledger_key(path)
            .ok()
            .and_then(|key| self.ledger.lookup(&key).map(LedgerEntry::is_valid))
            .unwrap_or(false);
        let entry = Uploader::new(self.service, self.options).ensure_uploaded(&mut self.ledger, path)?;
        Ok((entry, reused))
    }
}

//! Compare the ledger against the files on disk

use std::path::Path;

use crate::ledger::{self, Ledger};

/// Summary of the ledger for `rag status`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedgerStatus {
    pub entries: usize,
    pub invalid: usize,
    /// Local content still matches what was uploaded
    pub unchanged: usize,
    /// Local content differs from what was uploaded
    pub changed: Vec<String>,
    /// Local file no longer exists
    pub missing: Vec<String>,
    /// Entry predates content hashing
    pub unknown: usize,
}

/// Check each ledger entry against its local file.
pub fn ledger_status(ledger: &Ledger) -> LedgerStatus {
    let mut status = LedgerStatus {
        entries: ledger.len(),
        ..LedgerStatus::default()
    };

    for (key, entry) in ledger.iter() {
        if !entry.is_valid() {
            status.invalid += 1;
        }
        let path = Path::new(key);
        if !path.is_file() {
            status.missing.push(key.clone());
            continue;
        }
        let Some(expected) = entry.content_hash.as_deref() else {
            status.unknown += 1;
            continue;
        };
        match ledger::content_hash(path) {
            Ok(actual) if actual == expected => status.unchanged += 1,
            Ok(_) => status.changed.push(key.clone()),
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", key, e);
                status.missing.push(key.clone());
            }
        }
    }

    status
}

//! Register uploaded files with a store and wait for indexing to finish

use std::fmt;
use std::time::Duration;

use crate::service::{FileSearchService, Operation, RemoteStore};
use crate::{
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS, RagError, Result, sanitize,
};

/// How long to wait on an import operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status checks
    pub interval: Duration,
    /// Status checks before giving up
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Why an import was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    InvalidId(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingId => write!(f, "missing identifier"),
            SkipReason::InvalidId(file_ref) => write!(f, "invalid id format: {file_ref}"),
        }
    }
}

/// Known classes of remote rejection, each with a remediation hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportHint {
    InvalidArgument,
    PermissionDenied,
}

impl ImportHint {
    /// Classify a remote error message.
    pub fn classify(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        if message.contains("INVALID_ARGUMENT") || lower.contains("invalid argument") {
            Some(Self::InvalidArgument)
        } else if message.contains("PERMISSION_DENIED") || lower.contains("permission_denied") {
            Some(Self::PermissionDenied)
        } else {
            None
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidArgument => {
                "The file id is likely invalid or stale. Run `rag prepare --clean-state-only` to remove stale ids."
            }
            Self::PermissionDenied => {
                "The file id may not exist or you do not have permission to access it. Check credentials and file ownership."
            }
        }
    }
}

/// An import that was attempted and did not complete.
#[derive(Debug)]
pub struct ImportFailure {
    pub file_ref: String,
    pub error: RagError,
    pub hint: Option<ImportHint>,
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_ref, self.error)?;
        if let Some(hint) = self.hint {
            write!(f, " (hint: {})", hint.message())?;
        }
        Ok(())
    }
}

/// Outcome of importing one file.
#[derive(Debug)]
pub enum ImportResult {
    Registered(Operation),
    Skipped(SkipReason),
    Failed(ImportFailure),
}

/// Imports uploaded files into a store.
pub struct Importer<'a> {
    service: &'a dyn FileSearchService,
    policy: PollPolicy,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a dyn FileSearchService, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    /// Import `raw_id` (`files/<id>` or bare `<id>`) into `store`.
    ///
    /// Malformed ids are skipped without a remote call. Remote errors are
    /// returned as [`ImportResult::Failed`], never raised.
    pub fn import(&self, store: &RemoteStore, raw_id: &str) -> ImportResult {
        if raw_id.is_empty() {
            tracing::warn!("Skipping import: missing file id for store {}", store.name);
            return ImportResult::Skipped(SkipReason::MissingId);
        }

        let file_ref = sanitize::normalize_file_ref(raw_id);
        if !sanitize::is_valid_file_ref(&file_ref) {
            tracing::warn!("Skipping import: invalid file id format: {}", file_ref);
            return ImportResult::Skipped(SkipReason::InvalidId(file_ref));
        }

        tracing::info!("Importing {} into {}", file_ref, store.name);
        let operation = match self.service.import_file(store, &file_ref) {
            Ok(op) => op,
            Err(error) => return self.failed(store, file_ref, error),
        };

        match self.wait(operation) {
            Ok(op) => ImportResult::Registered(op),
            Err(error) => self.failed(store, file_ref, error),
        }
    }

    fn failed(&self, store: &RemoteStore, file_ref: String, error: RagError) -> ImportResult {
        let hint = ImportHint::classify(&error.to_string());
        tracing::warn!("Failed to import {} into {}: {}", file_ref, store.name, error);
        if let Some(hint) = hint {
            tracing::warn!("Hint: {}", hint.message());
        }
        ImportResult::Failed(ImportFailure {
            file_ref,
            error,
            hint,
        })
    }

    /// Poll until the operation is done or the attempt budget runs out.
    pub fn wait(&self, mut operation: Operation) -> Result<Operation> {
        let mut attempts = 0;
        while !operation.done {
            if attempts >= self.policy.max_attempts {
                return Err(RagError::OperationTimeout {
                    name: operation.name,
                    attempts,
                });
            }
            std::thread::sleep(self.policy.interval);
            operation = self.service.get_operation(&operation)?;
            attempts += 1;
        }

        if let Some(error) = operation.error {
            return Err(RagError::OperationFailed {
                name: operation.name,
                message: error.message,
            });
        }
        Ok(operation)
    }
}

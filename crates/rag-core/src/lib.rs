//! rag-core: keep a local docs folder in sync with a hosted file search store
//!
//! This library uploads local files to a remote Files API, registers them with
//! a file search store, and asks questions grounded on that store. Uploaded
//! file ids are tracked in a small JSON ledger so unchanged work is skipped.

pub mod ask;
pub mod config;
pub mod consts;
pub mod delete;
pub mod discover;
pub mod gemini;
pub mod import;
pub mod ledger;
pub mod prepare;
pub mod sanitize;
pub mod service;
pub mod status;
pub mod store;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use consts::*;
pub use gemini::GeminiClient;
pub use import::{ImportResult, Importer, PollPolicy};
pub use ledger::{Ledger, LedgerEntry};
pub use prepare::Preparer;
pub use sanitize::{is_valid_file_ref, normalize_file_ref, sanitize};
pub use service::{FileSearchService, RemoteStore};
pub use upload::{UploadOptions, Uploader};

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("Docs dir not found: {0}")]
    DocsNotFound(std::path::PathBuf),

    #[error("No API key found (set {0})")]
    MissingApiKey(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("API error {code} {status}: {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },

    #[error("Unexpected API response: {0}")]
    Response(String),

    #[error("Operation {name} did not finish after {attempts} polls")]
    OperationTimeout { name: String, attempts: u32 },

    #[error("Operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

//! Configuration handling for .rag.json

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_API_BASE, DEFAULT_API_KEY_ENV, DEFAULT_DOCS_DIR, DEFAULT_MAX_POLL_ATTEMPTS,
    DEFAULT_MODEL, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STATE_FILE,
    DEFAULT_STORE_NAME, FALLBACK_API_KEY_ENV, PollPolicy, RagError, Result, UploadOptions,
};

/// Configuration stored in .rag.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Folder of documents to upload
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// Display name of the file search store
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Model used by `ask`
    #[serde(default = "default_model")]
    pub model: String,

    /// Ledger of uploaded files
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Try original (UTF-8) names before sanitized ones
    #[serde(default)]
    pub prefer_original_name: bool,

    /// API endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Seconds between import status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Polls before an import is given up on
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DOCS_DIR)
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            store_name: default_store_name(),
            model: default_model(),
            state_file: default_state_file(),
            prefer_original_name: false,
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)
                .map_err(|e| RagError::Config(format!("{}: {}", path.display(), e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Options for the uploader.
    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            prefer_original_name: self.prefer_original_name,
        }
    }

    /// Polling policy for import operations.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_poll_attempts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the API key from the environment.
    pub fn api_key(&self) -> Result<String> {
        [self.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
            .ok_or_else(|| RagError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Default local ledger file (relative to the working directory)
pub const DEFAULT_STATE_FILE: &str = ".file_index.json";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".rag.json";

/// Default folder of documents to prepare
pub const DEFAULT_DOCS_DIR: &str = "DOCSDocuments";

/// Default display name of the file search store
pub const DEFAULT_STORE_NAME: &str = "docs-file-search";

/// Default generation model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API endpoint
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Secondary API key variable, consulted when the primary one is unset
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Seconds between import operation polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Polls before an import is reported as timed out (5 minutes at 2s)
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 150;

/// Per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Prefix of uploaded file resource names
pub const FILES_PREFIX: &str = "files/";

/// Maximum length of a resource id (the part after `files/`)
pub const MAX_ID_LEN: usize = 40;

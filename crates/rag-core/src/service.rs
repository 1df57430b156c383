//! The remote file search service, as seen by the reconcilers

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A remote file search store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStore {
    /// Resource name (`fileSearchStores/<id>`)
    pub name: String,
    /// Human-chosen label; may be the original or the sanitized form
    #[serde(default)]
    pub display_name: String,
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name (`files/<id>`)
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A document inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A long-running remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
}

/// Error attached to a finished operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Operations the sync engine needs from the hosted service.
///
/// Calls are blocking and made one at a time.
pub trait FileSearchService {
    fn list_stores(&self) -> Result<Vec<RemoteStore>>;

    fn create_store(&self, display_name: &str) -> Result<RemoteStore>;

    fn delete_store(&self, store: &RemoteStore) -> Result<()>;

    /// Upload the file at `content_path` under the resource id `desired_name`.
    /// May fail when the name is not acceptable to the service.
    fn upload_file(&self, content_path: &Path, desired_name: &str, mime_type: &str)
    -> Result<RemoteFile>;

    /// Start importing an uploaded file (`files/<id>`) into `store`.
    fn import_file(&self, store: &RemoteStore, file_ref: &str) -> Result<Operation>;

    /// Fetch the current state of an operation.
    fn get_operation(&self, operation: &Operation) -> Result<Operation>;

    /// Generate an answer grounded on the given stores.
    fn generate_with_retrieval(
        &self,
        model: &str,
        prompt: &str,
        stores: &[RemoteStore],
    ) -> Result<String>;

    fn list_documents(&self, store: &RemoteStore) -> Result<Vec<RemoteDocument>>;

    fn delete_document(&self, document: &RemoteDocument, force: bool) -> Result<()>;
}

//! In-memory [`FileSearchService`] for tests

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use crate::service::{
    FileSearchService, Operation, OperationError, RemoteDocument, RemoteFile, RemoteStore,
};
use crate::{RagError, Result, sanitize};

/// One recorded upload call.
#[derive(Debug, Clone)]
pub(crate) struct UploadCall {
    pub content_path: PathBuf,
    pub content_existed: bool,
    pub desired_name: String,
    pub mime_type: String,
}

#[derive(Default)]
pub(crate) struct FakeService {
    pub stores: RefCell<Vec<RemoteStore>>,
    pub documents: RefCell<Vec<(String, RemoteDocument)>>,
    pub uploads: RefCell<Vec<UploadCall>>,
    pub imports: RefCell<Vec<(String, String)>>,
    pub polls: Cell<u32>,
    pub deleted_stores: RefCell<Vec<String>>,
    pub deleted_documents: RefCell<Vec<String>>,

    /// Reject uploads and store creation whose name is not a valid id.
    pub strict_names: Cell<bool>,
    /// Desired upload names that fail.
    pub failing_uploads: RefCell<Vec<String>>,
    /// Error message returned by every import call.
    pub import_error: RefCell<Option<String>>,
    /// Number of polls before an operation reports done.
    pub polls_until_done: Cell<u32>,
    /// Error attached to finished operations.
    pub operation_error: RefCell<Option<String>>,
    /// Documents whose deletion fails.
    pub failing_document_deletes: RefCell<Vec<String>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(self, name: &str, display_name: &str) -> Self {
        self.stores.borrow_mut().push(RemoteStore {
            name: name.to_string(),
            display_name: display_name.to_string(),
        });
        self
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.borrow().len()
    }

    pub fn import_count(&self) -> usize {
        self.imports.borrow().len()
    }

    fn api_error(status: &str, message: &str) -> RagError {
        RagError::Api {
            code: 400,
            status: status.to_string(),
            message: message.to_string(),
        }
    }
}

impl FileSearchService for FakeService {
    fn list_stores(&self) -> Result<Vec<RemoteStore>> {
        Ok(self.stores.borrow().clone())
    }

    fn create_store(&self, display_name: &str) -> Result<RemoteStore> {
        if self.strict_names.get() && !display_name.is_ascii() {
            return Err(Self::api_error("INVALID_ARGUMENT", "display name not ASCII"));
        }
        let store = RemoteStore {
            name: format!("fileSearchStores/store-{}", self.stores.borrow().len() + 1),
            display_name: display_name.to_string(),
        };
        self.stores.borrow_mut().push(store.clone());
        Ok(store)
    }

    fn delete_store(&self, store: &RemoteStore) -> Result<()> {
        self.stores.borrow_mut().retain(|s| s.name != store.name);
        self.deleted_stores.borrow_mut().push(store.name.clone());
        Ok(())
    }

    fn upload_file(
        &self,
        content_path: &Path,
        desired_name: &str,
        mime_type: &str,
    ) -> Result<RemoteFile> {
        self.uploads.borrow_mut().push(UploadCall {
            content_path: content_path.to_path_buf(),
            content_existed: content_path.is_file(),
            desired_name: desired_name.to_string(),
            mime_type: mime_type.to_string(),
        });

        if self
            .failing_uploads
            .borrow()
            .iter()
            .any(|n| n == desired_name)
        {
            return Err(Self::api_error("INTERNAL", "upload failed"));
        }
        let name = sanitize::normalize_file_ref(desired_name);
        if self.strict_names.get() && !sanitize::is_valid_file_ref(&name) {
            return Err(Self::api_error("INVALID_ARGUMENT", "invalid file name"));
        }
        Ok(RemoteFile {
            name,
            display_name: None,
            mime_type: Some(mime_type.to_string()),
        })
    }

    fn import_file(&self, store: &RemoteStore, file_ref: &str) -> Result<Operation> {
        self.imports
            .borrow_mut()
            .push((store.name.clone(), file_ref.to_string()));
        if let Some(message) = self.import_error.borrow().as_ref() {
            return Err(Self::api_error("FAILED_PRECONDITION", message));
        }
        Ok(Operation {
            name: format!("{}/operations/op-{}", store.name, self.import_count()),
            done: self.polls_until_done.get() == 0,
            error: None,
        })
    }

    fn get_operation(&self, operation: &Operation) -> Result<Operation> {
        self.polls.set(self.polls.get() + 1);
        let done = self.polls.get() >= self.polls_until_done.get();
        let error = if done {
            self.operation_error
                .borrow()
                .as_ref()
                .map(|message| OperationError {
                    code: 13,
                    message: message.clone(),
                })
        } else {
            None
        };
        Ok(Operation {
            name: operation.name.clone(),
            done,
            error,
        })
    }

    fn generate_with_retrieval(
        &self,
        model: &str,
        prompt: &str,
        stores: &[RemoteStore],
    ) -> Result<String> {
        let names: Vec<&str> = stores.iter().map(|s| s.name.as_str()).collect();
        Ok(format!("[{model}] {prompt} @ {}", names.join(",")))
    }

    fn list_documents(&self, store: &RemoteStore) -> Result<Vec<RemoteDocument>> {
        Ok(self
            .documents
            .borrow()
            .iter()
            .filter(|(s, _)| *s == store.name)
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn delete_document(&self, document: &RemoteDocument, _force: bool) -> Result<()> {
        if self
            .failing_document_deletes
            .borrow()
            .contains(&document.name)
        {
            return Err(Self::api_error("FAILED_PRECONDITION", "document busy"));
        }
        self.documents
            .borrow_mut()
            .retain(|(_, d)| d.name != document.name);
        self.deleted_documents
            .borrow_mut()
            .push(document.name.clone());
        Ok(())
    }
}

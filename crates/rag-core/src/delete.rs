//! Delete a store, optionally emptying it first

use crate::service::{FileSearchService, RemoteStore};
use crate::Result;

/// What a forced delete did to the store's documents.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub documents_deleted: usize,
    pub documents_failed: usize,
}

/// Delete `store`. With `force`, every document is deleted first; failures
/// on single documents are logged and do not stop the store deletion.
pub fn delete_store(
    service: &dyn FileSearchService,
    store: &RemoteStore,
    force: bool,
) -> Result<DeleteReport> {
    let mut report = DeleteReport::default();

    if force {
        tracing::info!("Listing documents to delete in {} ({})", store.display_name, store.name);
        match service.list_documents(store) {
            Ok(documents) => {
                for document in &documents {
                    match service.delete_document(document, true) {
                        Ok(()) => report.documents_deleted += 1,
                        Err(e) => {
                            tracing::warn!("Failed deleting document {}: {}", document.name, e);
                            report.documents_failed += 1;
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to list documents in {}: {}", store.name, e),
        }
    }

    service.delete_store(store)?;
    tracing::info!("Deleted store {} ({})", store.display_name, store.name);
    Ok(report)
}

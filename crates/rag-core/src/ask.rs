//! Ask questions grounded on a file search store

use crate::service::FileSearchService;
use crate::{RagError, Result, store};

/// Ask `prompt` against the store with display name `store_name`.
pub fn ask(
    service: &dyn FileSearchService,
    store_name: &str,
    prompt: &str,
    model: &str,
) -> Result<String> {
    let store = store::find_store(service, store_name)?
        .ok_or_else(|| RagError::StoreNotFound(store_name.to_string()))?;

    tracing::info!("Sending prompt to {} with store {}", model, store.name);
    service.generate_with_retrieval(model, prompt, std::slice::from_ref(&store))
}

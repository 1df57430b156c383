//! Find or create the file search store by display name

use crate::service::{FileSearchService, RemoteStore};
use crate::{Result, UploadOptions, sanitize};

/// Find a store whose display name is either `display_name` or its sanitized
/// form. Creation may have fallen back to the sanitized name earlier, so both
/// count as the same store.
pub fn find_store(
    service: &dyn FileSearchService,
    display_name: &str,
) -> Result<Option<RemoteStore>> {
    let safe_display = sanitize::sanitize(display_name);
    let stores = service.list_stores()?;
    Ok(stores
        .into_iter()
        .find(|s| s.display_name == display_name || s.display_name == safe_display))
}

/// Return the store named `display_name`, creating it when missing.
pub fn resolve_or_create(
    service: &dyn FileSearchService,
    display_name: &str,
    options: UploadOptions,
) -> Result<RemoteStore> {
    if let Some(store) = find_store(service, display_name)? {
        tracing::debug!("Using existing store {} ({})", store.name, store.display_name);
        return Ok(store);
    }

    let safe_display = sanitize::sanitize(display_name);
    let store = if options.prefer_original_name {
        match service.create_store(display_name) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(
                    "Falling back to ASCII-safe store display name {}: {}",
                    safe_display,
                    e
                );
                service.create_store(&safe_display)?
            }
        }
    } else {
        service.create_store(&safe_display)?
    };

    tracing::info!("Created store {} ({})", store.name, store.display_name);
    Ok(store)
}

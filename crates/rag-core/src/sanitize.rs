//! Resource-name sanitizing and file id validation
//!
//! The remote API only accepts ids made of lowercase ASCII letters, digits
//! and dashes, at most 40 characters long. Local filenames and display names
//! are mapped onto that alphabet here.

use unicode_normalization::UnicodeNormalization;

use crate::{FILES_PREFIX, MAX_ID_LEN};

/// Convert a filename or display name into an id-safe slug.
///
/// Accents are decomposed and dropped, everything is lowercased, and runs of
/// other characters collapse to a single dash. The extension is dropped since
/// ids may not contain dots. Names with no usable characters get a random
/// `file-<uuid>` token, so that case is not reproducible across calls.
pub fn sanitize(name: &str) -> String {
    let base = strip_extension(name);

    let ascii: String = base
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_ascii_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let mut slug = slug.trim_matches('-').to_string();
    if slug.len() > MAX_ID_LEN {
        slug.truncate(MAX_ID_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }

    if slug.is_empty() {
        return fallback_token();
    }
    slug
}

/// Random id used when a name sanitizes to nothing.
fn fallback_token() -> String {
    format!("file-{}", uuid::Uuid::new_v4().simple())
}

/// Drop the extension; a leading dot (`.bashrc`) is part of the name.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => &name[..idx],
        _ => name,
    }
}

/// Bring a raw file id into canonical `files/<id>` form.
pub fn normalize_file_ref(raw: &str) -> String {
    if raw.starts_with(FILES_PREFIX) {
        raw.to_string()
    } else {
        format!("{FILES_PREFIX}{raw}")
    }
}

/// Check that `file_ref` is `files/<id>` with `<id>` matching `^[a-z0-9-]{1,40}$`.
pub fn is_valid_file_ref(file_ref: &str) -> bool {
    let Some(id) = file_ref.strip_prefix(FILES_PREFIX) else {
        return false;
    };
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Validity of an id as stored in the ledger: it is normalized first, so
/// both `abc` and `files/abc` are accepted.
pub fn is_valid_file_id(raw: &str) -> bool {
    !raw.is_empty() && is_valid_file_ref(&normalize_file_ref(raw))
}

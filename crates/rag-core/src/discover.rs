//! Discovery module: list the documents to upload

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::{RagError, Result};

/// Recursively list every file under `docs_dir`, sorted by path.
///
/// Hidden and git-ignored files are included; the folder is uploaded as-is.
pub fn list_documents(docs_dir: &Path) -> Result<Vec<PathBuf>> {
    if !docs_dir.is_dir() {
        return Err(RagError::DocsNotFound(docs_dir.to_path_buf()));
    }

    let walker = WalkBuilder::new(docs_dir)
        .standard_filters(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_some_and(|t| t.is_file()) || entry.path().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lists_files_recursively() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a").join("b")).unwrap();
        fs::write(root.join("z.txt"), "z").unwrap();
        fs::write(root.join("a").join("one.md"), "1").unwrap();
        fs::write(root.join("a").join("b").join("two.pdf"), "2").unwrap();
        fs::write(root.join(".hidden"), "h").unwrap();
        fs::write(root.join(".gitignore"), "z.txt\n").unwrap();

        let files = list_documents(root).unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(rel, vec![".gitignore", ".hidden", "a/b/two.pdf", "a/one.md", "z.txt"]);
    }

    #[test]
    fn test_missing_dir() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope");
        let result = list_documents(&missing);
        assert!(matches!(result, Err(RagError::DocsNotFound(p)) if p == missing));
    }
}

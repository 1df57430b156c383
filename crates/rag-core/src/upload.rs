//! Upload local files once, remembering the remote id in the ledger

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::ledger::{self, Ledger, LedgerEntry};
use crate::service::{FileSearchService, RemoteFile};
use crate::{Result, sanitize};

/// Extension to MIME type, for the formats a docs folder usually holds
const MIME_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("rst", "text/x-rst"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("pdf", "application/pdf"),
    ("rtf", "application/rtf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("epub", "application/epub+zip"),
    ("py", "text/x-python"),
    ("js", "text/javascript"),
    ("ts", "application/typescript"),
    ("rs", "text/x-rust"),
    ("java", "text/x-java"),
    ("c", "text/x-c"),
    ("cpp", "text/x-c++"),
    ("go", "text/x-go"),
    ("sql", "application/sql"),
    ("tex", "application/x-tex"),
];

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Guess the MIME type from the file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// How upload names are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Try the original filename first and fall back to the sanitized one.
    pub prefer_original_name: bool,
}

/// Uploads files that the ledger does not know yet.
pub struct Uploader<'a> {
    service: &'a dyn FileSearchService,
    options: UploadOptions,
}

impl<'a> Uploader<'a> {
    pub fn new(service: &'a dyn FileSearchService, options: UploadOptions) -> Self {
        Self { service, options }
    }

    /// Make sure `path` has been uploaded, returning its ledger entry.
    ///
    /// A valid cached entry is returned as-is without contacting the service.
    /// Otherwise the file is uploaded and the ledger is saved before returning.
    pub fn ensure_uploaded(&self, ledger: &mut Ledger, path: &Path) -> Result<LedgerEntry> {
        let key = ledger::ledger_key(path)?;
        if let Some(entry) = ledger.lookup(&key).filter(|e| e.is_valid()) {
            tracing::debug!("Already uploaded: {} -> {}", key, entry.file_id);
            return Ok(entry.clone());
        }

        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let safe_name = sanitize::sanitize(&original_name);
        let mime_type = guess_mime_type(path);
        let hash = ledger::content_hash(path)?;

        tracing::info!("Uploading {}", original_name);
        let file = if self.options.prefer_original_name {
            match self.upload_as(path, &original_name, &safe_name, mime_type) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(
                        "Falling back to ASCII-safe filename {} for {}: {}",
                        safe_name,
                        original_name,
                        e
                    );
                    self.upload_as(path, &safe_name, &safe_name, mime_type)?
                }
            }
        } else {
            self.upload_as(path, &safe_name, &safe_name, mime_type)?
        };

        let entry =
            LedgerEntry::new(&file.name, &original_name, &safe_name).with_content_hash(hash);
        ledger.record(key, entry.clone())?;
        Ok(entry)
    }

    /// One upload attempt under `desired_name`.
    fn upload_as(
        &self,
        path: &Path,
        desired_name: &str,
        safe_name: &str,
        mime_type: &str,
    ) -> Result<RemoteFile> {
        let staged = StagedCopy::for_upload(path, safe_name)?;
        let content_path = staged.as_ref().map_or(path, |s| s.path());
        self.service.upload_file(content_path, desired_name, mime_type)
    }
}

/// ASCII-named copy of a file whose own name is not ASCII.
/// The copy and its directory are removed on drop.
struct StagedCopy {
    _dir: TempDir,
    path: PathBuf,
}

impl StagedCopy {
    /// Stage `path` under `safe_name` when its filename has non-ASCII characters.
    fn for_upload(path: &Path, safe_name: &str) -> Result<Option<Self>> {
        let needs_staging = path
            .file_name()
            .is_some_and(|name| !name.to_string_lossy().is_ascii());
        if !needs_staging {
            return Ok(None);
        }

        let dir = tempfile::Builder::new().prefix("rag-upload-").tempdir()?;
        let file_name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.is_ascii() && !ext.is_empty() => format!("{safe_name}.{ext}"),
            _ => safe_name.to_string(),
        };
        let staged = dir.path().join(file_name);
        std::fs::copy(path, &staged)?;
        tracing::debug!("Staged {} as {}", path.display(), staged.display());

        Ok(Some(Self {
            _dir: dir,
            path: staged,
        }))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeService;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(guess_mime_type(Path::new("a/b.PDF")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("notes.md")), "text/markdown");
        assert_eq!(guess_mime_type(Path::new("blob")), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type(Path::new("x.weird")), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_upload_records_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "Meeting Notes.md", "hello");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        let service = FakeService::new();

        let entry = Uploader::new(&service, UploadOptions::default())
            .ensure_uploaded(&mut ledger, &file)
            .unwrap();

        assert_eq!(entry.file_id, "files/meeting-notes");
        assert_eq!(entry.file_name, entry.file_id);
        assert_eq!(entry.original_file_name, "Meeting Notes.md");
        assert_eq!(entry.safe_file_name, "meeting-notes");
        assert_eq!(entry.content_hash, Some(ledger::content_hash(&file).unwrap()));

        let uploads = service.uploads.borrow();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].desired_name, "meeting-notes");
        assert_eq!(uploads[0].mime_type, "text/markdown");
        assert_eq!(uploads[0].content_path, file);

        // persisted immediately
        let reloaded = Ledger::load(dir.path().join("state.json")).unwrap();
        let key = ledger::ledger_key(&file).unwrap();
        assert_eq!(reloaded.lookup(&key), Some(&entry));
    }

    #[test]
    fn test_second_call_skips_remote() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.txt", "a");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        ledger.insert(
            ledger::ledger_key(&file).unwrap(),
            LedgerEntry::new("files/seeded", "a.txt", "a"),
        );
        let service = FakeService::new();
        let uploader = Uploader::new(&service, UploadOptions::default());

        let first = uploader.ensure_uploaded(&mut ledger, &file).unwrap();
        let second = uploader.ensure_uploaded(&mut ledger, &file).unwrap();

        assert_eq!(first.file_id, "files/seeded");
        assert_eq!(first, second);
        assert_eq!(service.upload_count(), 0);
    }

    #[test]
    fn test_invalid_cached_entry_is_reuploaded() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.txt", "a");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        ledger.insert(
            ledger::ledger_key(&file).unwrap(),
            LedgerEntry::new("files/NOT_VALID", "a.txt", "a"),
        );
        let service = FakeService::new();

        let entry = Uploader::new(&service, UploadOptions::default())
            .ensure_uploaded(&mut ledger, &file)
            .unwrap();
        assert_eq!(entry.file_id, "files/a");
        assert_eq!(service.upload_count(), 1);
    }

    #[test]
    fn test_prefer_original_falls_back_to_safe_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "Café Ñandú.txt", "hola");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        let service = FakeService::new();
        service.strict_names.set(true);

        let options = UploadOptions {
            prefer_original_name: true,
        };
        let entry = Uploader::new(&service, options)
            .ensure_uploaded(&mut ledger, &file)
            .unwrap();

        assert_eq!(entry.file_id, "files/cafe-nandu");
        let uploads = service.uploads.borrow();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].desired_name, "Café Ñandú.txt");
        assert_eq!(uploads[1].desired_name, "cafe-nandu");
    }

    #[test]
    fn test_prefer_original_succeeds_first_try() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "plain", "x");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        let service = FakeService::new();
        service.strict_names.set(true);

        let options = UploadOptions {
            prefer_original_name: true,
        };
        Uploader::new(&service, options)
            .ensure_uploaded(&mut ledger, &file)
            .unwrap();
        assert_eq!(service.upload_count(), 1);
    }

    #[test]
    fn test_fallback_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "Über.txt", "x");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        let service = FakeService::new();
        service.strict_names.set(true);
        service.failing_uploads.borrow_mut().push("uber".into());

        let options = UploadOptions {
            prefer_original_name: true,
        };
        let result = Uploader::new(&service, options).ensure_uploaded(&mut ledger, &file);
        assert!(result.is_err());
        assert_eq!(service.upload_count(), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_default_mode_single_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "b.txt", "b");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        let service = FakeService::new();
        service.failing_uploads.borrow_mut().push("b".into());

        let result =
            Uploader::new(&service, UploadOptions::default()).ensure_uploaded(&mut ledger, &file);
        assert!(result.is_err());
        assert_eq!(service.upload_count(), 1);
    }

    #[test]
    fn test_non_ascii_name_is_staged_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "résumé.pdf", "cv");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        let service = FakeService::new();

        Uploader::new(&service, UploadOptions::default())
            .ensure_uploaded(&mut ledger, &file)
            .unwrap();

        let uploads = service.uploads.borrow();
        let call = &uploads[0];
        assert!(call.content_existed);
        assert_ne!(call.content_path, file);
        assert_eq!(
            call.content_path.file_name().unwrap().to_string_lossy(),
            "resume.pdf"
        );
        assert!(!call.content_path.exists());
        assert!(file.exists());
    }

    #[test]
    fn test_staged_copy_removed_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "naïve.txt", "x");
        let mut ledger = Ledger::empty(dir.path().join("state.json"));
        let service = FakeService::new();
        service.failing_uploads.borrow_mut().push("naive".into());

        let result =
            Uploader::new(&service, UploadOptions::default()).ensure_uploaded(&mut ledger, &file);
        assert!(result.is_err());

        let uploads = service.uploads.borrow();
        assert!(uploads[0].content_existed);
        assert!(!uploads[0].content_path.exists());
    }
}

//! [`FileSearchService`] over the Gemini REST API (`v1beta`)
//!
//! Uploads use the resumable protocol: a `start` request carrying the file
//! metadata returns an upload URL, and a single `upload, finalize` request
//! sends the bytes. Long-running imports come back as operations that are
//! polled by name.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::service::{
    FileSearchService, Operation, RemoteDocument, RemoteFile, RemoteStore,
};
use crate::{Config, RagError, Result, sanitize};

const API_VERSION: &str = "v1beta";

/// Listing page size (the API caps it at 20)
const PAGE_SIZE: &str = "20";

/// Blocking client for the Gemini file search endpoints.
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorePage {
    #[serde(default)]
    file_search_stores: Vec<RemoteStore>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentPage {
    #[serde(default)]
    documents: Vec<RemoteDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base, config.api_key()?, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.api_base, API_VERSION, path)
    }

    /// Send an authenticated request, mapping non-2xx replies to [`RagError::Api`].
    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.header("x-goog-api-key", &self.api_key).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(parse_api_error(status.as_u16(), &body))
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send(request)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl FileSearchService for GeminiClient {
    fn list_stores(&self) -> Result<Vec<RemoteStore>> {
        let mut stores = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(self.url("fileSearchStores"))
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: StorePage = self.send_json(request)?;
            stores.extend(page.file_search_stores);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(stores)
    }

    fn create_store(&self, display_name: &str) -> Result<RemoteStore> {
        tracing::debug!("POST fileSearchStores displayName={}", display_name);
        let request = self
            .client
            .post(self.url("fileSearchStores"))
            .json(&json!({ "displayName": display_name }));
        self.send_json(request)
    }

    fn delete_store(&self, store: &RemoteStore) -> Result<()> {
        tracing::debug!("DELETE {}", store.name);
        self.send(self.client.delete(self.url(&store.name)))?;
        Ok(())
    }

    fn upload_file(
        &self,
        content_path: &Path,
        desired_name: &str,
        mime_type: &str,
    ) -> Result<RemoteFile> {
        let bytes = std::fs::read(content_path)?;
        let display_name = content_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = sanitize::normalize_file_ref(desired_name);
        tracing::debug!("Uploading {} bytes as {}", bytes.len(), name);

        let start = self
            .client
            .post(format!("{}/upload/{}/files", self.api_base, API_VERSION))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({
                "file": {
                    "name": name,
                    "displayName": display_name,
                    "mimeType": mime_type,
                }
            }));
        let response = self.send(start)?;
        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RagError::Response("upload start returned no upload URL".into()))?
            .to_string();

        let finish = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes);
        let uploaded: UploadResponse = self.send_json(finish)?;
        Ok(uploaded.file)
    }

    fn import_file(&self, store: &RemoteStore, file_ref: &str) -> Result<Operation> {
        let request = self
            .client
            .post(self.url(&format!("{}:importFile", store.name)))
            .json(&json!({ "fileName": file_ref }));
        self.send_json(request)
    }

    fn get_operation(&self, operation: &Operation) -> Result<Operation> {
        self.send_json(self.client.get(self.url(&operation.name)))
    }

    fn generate_with_retrieval(
        &self,
        model: &str,
        prompt: &str,
        stores: &[RemoteStore],
    ) -> Result<String> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let store_names: Vec<&str> = stores.iter().map(|s| s.name.as_str()).collect();
        let request = self
            .client
            .post(self.url(&format!("models/{model}:generateContent")))
            .json(&json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                "tools": [{ "fileSearch": { "fileSearchStoreNames": store_names } }],
            }));
        let response: Value = self.send_json(request)?;
        render_generation(&response)
    }

    fn list_documents(&self, store: &RemoteStore) -> Result<Vec<RemoteDocument>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(self.url(&format!("{}/documents", store.name)))
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: DocumentPage = self.send_json(request)?;
            documents.extend(page.documents);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(documents)
    }

    fn delete_document(&self, document: &RemoteDocument, force: bool) -> Result<()> {
        tracing::debug!("DELETE {} force={}", document.name, force);
        let request = self
            .client
            .delete(self.url(&document.name))
            .query(&[("force", force)]);
        self.send(request)?;
        Ok(())
    }
}

/// Decode a `{"error": {...}}` reply, falling back to the raw body.
fn parse_api_error(code: u16, body: &str) -> RagError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => RagError::Api {
            code: if envelope.error.code == 0 {
                code
            } else {
                envelope.error.code
            },
            status: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => RagError::Api {
            code,
            status: String::new(),
            message: body.trim().to_string(),
        },
    }
}

/// Concatenate the candidate text parts; responses without text are shown
/// as pretty JSON.
fn render_generation(response: &Value) -> Result<String> {
    let text: String = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|c| c.pointer("/content/parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Ok(serde_json::to_string_pretty(response)?);
    }
    Ok(text)
}

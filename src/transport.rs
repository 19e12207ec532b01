use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TransportError;

pub const CHAT_PATH: &str = "/chat";
pub const UPLOAD_PATH: &str = "/upload-csv";

/// Size of the slices fed to the multipart body; one progress tick per slice.
const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    message: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct TransportClient {
    client: Client,
    base_url: String,
}

impl TransportClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let url = self.endpoint(CHAT_PATH);
        debug!(%url, "sending chat request");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let chat_response: ChatResponse = parse_success(status, &body)?;
        Ok(chat_response.response)
    }

    /// Sends `bytes` as the `file` field of a multipart form.
    ///
    /// `on_progress(loaded, total)` is called as the body is handed to the
    /// connection, with `loaded` increasing on every call.
    pub async fn upload<F>(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        on_progress: F,
    ) -> Result<String, TransportError>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let url = self.endpoint(UPLOAD_PATH);
        let total = bytes.len() as u64;
        debug!(%url, file_name, total, "starting upload");

        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut loaded = 0u64;
        let stream = futures_util::stream::iter(chunks).map(move |chunk| {
            loaded += chunk.len() as u64;
            on_progress(loaded, total);
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let upload_response: UploadResponse = parse_success(status, &body)?;
        Ok(upload_response.message)
    }
}

fn parse_success<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, TransportError> {
    if !status.is_success() {
        let detail = extract_detail(body);
        warn!(%status, ?detail, "request rejected");
        return Err(TransportError::Status { status, detail });
    }
    Ok(serde_json::from_str(body)?)
}

/// Pulls `detail` out of an error body. Validation errors carry a structured
/// detail, which is shown as compact JSON.
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

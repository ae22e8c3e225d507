//! HTTP client for the Ollama chat API.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use lloms_types::{ApiError, ChatBackend, ChatRequest, ChatResponse, ChunkStream};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::stream::ChatStream;

/// Connect timeout applied to every request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total timeout for non-streaming requests. Streaming requests only
/// get the connect timeout so long generations are not cut off.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for an Ollama-compatible chat endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the given base URL (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Override the total timeout for non-streaming requests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Send a non-streaming chat request and decode the single response body.
    pub async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        debug_assert!(!request.stream);
        let response = self
            .post_chat(request)?
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ApiError::StreamParse(e.to_string()))
    }

    /// Send a streaming chat request and return the chunk stream.
    pub async fn send_chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, ApiError> {
        debug_assert!(request.stream);
        let response = self
            .post_chat(request)?
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        Ok(ChatStream::new(response.bytes_stream()))
    }

    fn post_chat(&self, request: &ChatRequest) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!("POST {url} (model: {}, stream: {})", request.model, request.stream);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = serde_json::to_string(request)
            .map_err(|e| ApiError::Network(format!("Failed to serialize request: {e}")))?;

        Ok(self.http.post(&url).headers(headers).body(body))
    }
}

impl ChatBackend for OllamaClient {
    fn chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, ApiError>> + Send + 'a>> {
        Box::pin(self.send_chat(request))
    }

    fn chat_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkStream, ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let stream = self.send_chat_stream(request).await?;
            Ok(Box::pin(stream) as ChunkStream)
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

fn map_send_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Classify an HTTP error response. Ollama reports failures as
/// `{"error": "..."}`; fall back to the raw body text.
fn classify_error(status: u16, body: &str) -> ApiError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| body.to_string());

    ApiError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_error_parses_ollama_body() {
        let err = classify_error(404, r#"{"error":"model 'x' not found"}"#);
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model 'x' not found");
            }
            other => panic!("Expected Status, got {other:?}"),
        }
    }

    #[test]
    fn classify_error_falls_back_to_raw_body() {
        let err = classify_error(500, "internal failure");
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal failure");
            }
            other => panic!("Expected Status, got {other:?}"),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = OllamaClient::new("http://localhost:11434/").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn backend_name_is_ollama() {
        let client = OllamaClient::new("http://localhost:11434").unwrap();
        assert_eq!(client.name(), "ollama");
    }
}

//! HTTP-backed remote store.
//!
//! The actual HTTP client is abstracted via a trait so that any library
//! (reqwest, ureq, hyper, ...) or a loopback test double can be plugged in.

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::record::{PatchRequest, PatchResponse, QueryPage};
use crate::store::RemoteStore;
use serde_json::{json, Value};

/// HTTP methods used by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// POST (database queries).
    Post,
    /// PATCH (record updates).
    Patch,
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Vec<u8>,
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err`
/// means no response was received.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// Remote store speaking the Notion-style JSON API over an [`HttpClient`].
pub struct HttpStore<C: HttpClient> {
    config: RemoteConfig,
    client: C,
}

impl<C: HttpClient> HttpStore<C> {
    /// Creates a new HTTP store.
    pub fn new(config: RemoteConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Authorization".into(), self.config.credential.bearer()),
            ("Content-Type".into(), "application/json".into()),
            ("Notion-Version".into(), self.config.api_version.clone()),
        ]
    }

    fn send_json(&self, method: HttpMethod, url: String, body: &Value) -> RemoteResult<HttpResponse> {
        let body = serde_json::to_vec(body)
            .map_err(|e| RemoteError::Protocol(format!("failed to encode request: {e}")))?;
        let request = HttpRequest {
            method,
            url,
            headers: self.headers(),
            body,
        };
        self.client
            .send(request)
            .map_err(RemoteError::transport_retryable)
    }
}

/// Extracts the `message` field of an error body, falling back to raw text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

impl<C: HttpClient> RemoteStore for HttpStore<C> {
    fn query(&self, database_id: &str, cursor: Option<&str>) -> RemoteResult<QueryPage> {
        let url = format!("{}/databases/{}/query", self.config.base_url, database_id);
        let mut body = json!({ "page_size": self.config.page_size });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }

        let response = self.send_json(HttpMethod::Post, url, &body)?;
        if !(200..300).contains(&response.status) {
            return Err(RemoteError::Status {
                status: response.status,
                message: error_message(&response.body),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| RemoteError::Protocol(format!("failed to decode query page: {e}")))
    }

    fn patch(&self, request: &PatchRequest) -> RemoteResult<PatchResponse> {
        let url = format!("{}/pages/{}", self.config.base_url, request.record_id);
        let response = self.send_json(HttpMethod::Patch, url, &request.body())?;

        if (200..300).contains(&response.status) {
            Ok(PatchResponse::with_status(response.status))
        } else {
            Ok(PatchResponse::error(
                response.status,
                error_message(&response.body),
            ))
        }
    }
}

mod reqwest_executor;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use volley_core::types::{is_success_status, HttpMethod};

pub use reqwest_executor::ReqwestHttpExecutor;

/// A fully resolved request, ready to put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    pub method: HttpMethod,
    pub url: url::Url,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_json: Option<JsonValue>,
    /// Wall-clock time from send to full body, in milliseconds.
    pub elapsed_ms: u64,
    /// Body size in bytes.
    pub size: usize,
}

impl HttpResponse {
    pub fn new(
        status: u16,
        headers: BTreeMap<String, String>,
        body: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        let body = body.into();
        let body_json = serde_json::from_str(&body).ok();
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            headers,
            size: body.len(),
            body,
            body_json,
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("http error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTarget<'a> {
    Request(&'a str),
    All,
}

/// The transport collaborator. Implementations own connection handling and TLS.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Send `request`. `request_id` identifies the exchange for [`HttpExecutor::cancel_request`]
    /// and must be unique among requests in flight.
    async fn execute(&self, request_id: &str, request: BuiltRequest)
        -> Result<HttpResponse, HttpError>;

    /// Best-effort abort of in-flight requests. Callers must still tolerate late results.
    fn cancel_request(&self, _target: CancelTarget<'_>) {}
}

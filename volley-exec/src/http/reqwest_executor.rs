use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{BuiltRequest, CancelTarget, HttpError, HttpExecutor, HttpResponse};

pub struct ReqwestHttpExecutor {
    client: reqwest::Client,
    default_timeout: Duration,
    inflight: Mutex<HashMap<String, CancellationToken>>,
}

impl ReqwestHttpExecutor {
    pub fn new(default_timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("volley/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Other(format!("failed to create http client: {e}")))?;
        Ok(Self {
            client,
            default_timeout,
            inflight: Mutex::new(HashMap::new()),
        })
    }

    fn register(&self, request_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(request_id.to_string(), token.clone());
        token
    }

    fn unregister(&self, request_id: &str) {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(request_id);
    }

    async fn send(&self, req: BuiltRequest) -> Result<HttpResponse, HttpError> {
        let method: reqwest::Method = req
            .method
            .as_str()
            .parse()
            .map_err(|e: <reqwest::Method as std::str::FromStr>::Err| HttpError::Other(e.to_string()))?;
        let mut rb = self
            .client
            .request(method, req.url)
            .timeout(req.timeout.unwrap_or(self.default_timeout));
        for (k, v) in req.headers {
            rb = rb.header(k, v);
        }
        if !req.body.is_empty() {
            rb = rb.body(req.body);
        }

        let started = Instant::now();
        let resp = rb.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();

        let mut headers = BTreeMap::new();
        for (k, v) in resp.headers().iter() {
            if let Ok(s) = v.to_str() {
                headers.insert(k.to_string(), s.to_string());
            }
        }

        let body = resp.bytes().await.map_err(map_reqwest_error)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let body = String::from_utf8_lossy(&body).into_owned();
        Ok(HttpResponse::new(status, headers, body, elapsed_ms))
    }
}

#[async_trait]
impl HttpExecutor for ReqwestHttpExecutor {
    async fn execute(
        &self,
        request_id: &str,
        request: BuiltRequest,
    ) -> Result<HttpResponse, HttpError> {
        let token = self.register(request_id);
        let result = tokio::select! {
            r = self.send(request) => r,
            _ = token.cancelled() => {
                debug!(request_id, "request aborted");
                Err(HttpError::Cancelled)
            }
        };
        self.unregister(request_id);
        result
    }

    fn cancel_request(&self, target: CancelTarget<'_>) {
        let inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        match target {
            CancelTarget::Request(id) => {
                if let Some(t) = inflight.get(id) {
                    t.cancel();
                }
            }
            CancelTarget::All => inflight.values().for_each(|t| t.cancel()),
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        return HttpError::Timeout;
    }
    if e.is_connect() || e.is_request() {
        return HttpError::Network(e.to_string());
    }
    HttpError::Other(e.to_string())
}

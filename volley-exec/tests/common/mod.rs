#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use volley_core::types::WorkspaceDocument;
use volley_core::{parse_workspace_str, DocumentFormat};
use volley_exec::events::ChannelEventSink;
use volley_exec::{BuiltRequest, EngineDeps, Event, HttpError, HttpExecutor, HttpResponse};

type Handler = dyn Fn(&BuiltRequest) -> Result<HttpResponse, HttpError> + Send + Sync;

/// Answers every request through `handler` after an optional simulated latency.
pub struct MockHttpExecutor {
    handler: Box<Handler>,
    delay: Duration,
    calls: Mutex<Vec<BuiltRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockHttpExecutor {
    pub fn new(
        handler: impl Fn(&BuiltRequest) -> Result<HttpResponse, HttpError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// 200 with `{}` for everything.
    pub fn ok() -> Self {
        Self::new(|_| Ok(json(200, "{}")))
    }

    /// Status chosen by URL path; unknown paths get 200.
    pub fn by_path(routes: &[(&str, u16)]) -> Self {
        let routes: BTreeMap<String, u16> =
            routes.iter().map(|(p, s)| (p.to_string(), *s)).collect();
        Self::new(move |req| {
            let status = routes.get(req.url.path()).copied().unwrap_or(200);
            Ok(json(status, "{}"))
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<BuiltRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.url.path().to_string())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpExecutor for MockHttpExecutor {
    async fn execute(
        &self,
        _request_id: &str,
        request: BuiltRequest,
    ) -> Result<HttpResponse, HttpError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = (self.handler)(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn json(status: u16, body: &str) -> HttpResponse {
    let headers = BTreeMap::from([("content-type".to_string(), "application/json".to_string())]);
    HttpResponse::new(status, headers, body, 10)
}

pub fn workspace(yaml: &str) -> WorkspaceDocument {
    parse_workspace_str(yaml, DocumentFormat::Yaml)
        .expect("test workspace parses")
        .document
}

pub fn deps(doc: &WorkspaceDocument, http: Arc<MockHttpExecutor>) -> EngineDeps {
    EngineDeps::from_workspace(doc, http)
}

/// Deps whose events land in the returned receiver.
pub fn deps_with_events(
    doc: &WorkspaceDocument,
    http: Arc<MockHttpExecutor>,
) -> (EngineDeps, UnboundedReceiver<Event>) {
    let (tx, rx) = unbounded_channel();
    let deps = EngineDeps::from_workspace(doc, http)
        .with_event_sink(Arc::new(ChannelEventSink::new(tx)));
    (deps, rx)
}

pub fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

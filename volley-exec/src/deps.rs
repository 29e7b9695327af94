use std::sync::Arc;

use volley_core::types::WorkspaceDocument;

use crate::events::{EventSink, NoOpEventSink};
use crate::http::HttpExecutor;
use crate::lookup::{CollectionLookup, EnvironmentLookup, FlowLookup, WorkspaceIndex};
use crate::request::{RequestBuilder, StandardRequestBuilder};

/// Collaborators shared by every runner.
#[derive(Clone)]
pub struct EngineDeps {
    pub http: Arc<dyn HttpExecutor>,
    pub builder: Arc<dyn RequestBuilder>,
    pub collections: Arc<dyn CollectionLookup>,
    pub flows: Arc<dyn FlowLookup>,
    pub environments: Arc<dyn EnvironmentLookup>,
    pub event_sink: Arc<dyn EventSink>,
}

impl EngineDeps {
    /// Wire a workspace document to `http` with the standard request builder.
    pub fn from_workspace(doc: &WorkspaceDocument, http: Arc<dyn HttpExecutor>) -> Self {
        let index = Arc::new(WorkspaceIndex::new(doc));
        let builder = StandardRequestBuilder::new(Arc::new(index.auth_resolver()));
        Self {
            http,
            builder: Arc::new(builder),
            collections: index.clone(),
            flows: index.clone(),
            environments: index,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }
}

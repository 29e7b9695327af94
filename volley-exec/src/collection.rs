//! Batch runs of plain collection requests, classified by HTTP status alone.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use volley_core::types::{
    is_success_status, Environment, ExecutionConfig, ExecutionStatus, Request,
    StatusClassification, SuiteProgress, SuiteRunStatus,
};

use crate::batch::{BatchError, BatchExecutor, BatchItem, CancelHandle};
use crate::deps::EngineDeps;
use crate::events::{Event, RunKind};
use crate::http::HttpResponse;
use crate::request::{execute_request, BuildContext};
use crate::suite::{average_time, Timed};

impl BatchItem for Request {
    fn item_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRunResult {
    pub request_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<u64>,
}

impl RequestRunResult {
    fn classification(&self) -> StatusClassification {
        StatusClassification::of(self.status)
    }
}

impl Timed for RequestRunResult {
    fn elapsed_time(&self) -> Option<u64> {
        self.elapsed_time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRunResult {
    pub run_id: Uuid,
    pub status: SuiteRunStatus,
    pub results: BTreeMap<String, RequestRunResult>,
    pub progress: SuiteProgress,
    pub average_time: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionRunOptions {
    pub environment: Option<Environment>,
    pub auth_id: Option<String>,
}

pub struct CollectionRunner {
    deps: EngineDeps,
    executor: BatchExecutor,
    run_id: Uuid,
}

impl CollectionRunner {
    pub fn new(deps: EngineDeps, config: ExecutionConfig) -> Result<Self, BatchError> {
        Ok(Self {
            deps,
            executor: BatchExecutor::new(config)?,
            run_id: Uuid::new_v4(),
        })
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.executor.cancel_handle()
    }

    /// Send every request once. Duplicate request ids are the only error.
    pub async fn run(
        self,
        requests: &[Request],
        options: &CollectionRunOptions,
    ) -> Result<CollectionRunResult, BatchError> {
        let Self {
            deps,
            executor,
            run_id,
        } = self;
        let cancel = executor.cancel_handle();
        let started_at = Utc::now();
        info!(%run_id, requests = requests.len(), "collection run started");
        deps.event_sink
            .emit(Event::RunStarted {
                run_id,
                kind: RunKind::Collection,
                target_id: requests
                    .first()
                    .and_then(|r| deps.collections.collection_of(&r.id))
                    .map(|c| c.id.clone())
                    .unwrap_or_default(),
                total: requests.len(),
            })
            .await;

        let observer = crate::suite::ProgressTracker::new(
            run_id,
            requests.len(),
            deps.event_sink.as_ref(),
        );
        let (deps_ref, cancel_ref) = (&deps, &cancel);
        let outcome = executor
            .execute(
                requests,
                |request| async move {
                    send_one(deps_ref, run_id, request, options, cancel_ref).await
                },
                RequestRunResult::classification,
                &observer,
            )
            .await?;

        let mut results = BTreeMap::new();
        for (id, record) in outcome.results {
            let mut r = record.result;
            r.status = record.classification.status;
            results.insert(id, r);
        }
        for id in outcome.skipped_ids {
            results.insert(id.clone(), not_run(id, ExecutionStatus::Skipped));
        }
        for id in outcome.not_started_ids {
            results.insert(id.clone(), not_run(id, ExecutionStatus::Cancelled));
        }

        let progress =
            SuiteProgress::from_statuses(requests.len(), results.values().map(|r| r.status));
        let status = if outcome.cancelled {
            SuiteRunStatus::Cancelled
        } else if progress.failed > 0 {
            SuiteRunStatus::Failed
        } else {
            SuiteRunStatus::Success
        };
        info!(%run_id, status = status.as_str(), "collection run finished");
        deps.event_sink
            .emit(Event::SuiteFinished { run_id, status })
            .await;

        Ok(CollectionRunResult {
            run_id,
            status,
            average_time: average_time(results.values().map(|r| r.elapsed_time)),
            results,
            progress,
            started_at,
            completed_at: Utc::now(),
        })
    }
}

async fn send_one(
    deps: &EngineDeps,
    run_id: Uuid,
    request: &Request,
    options: &CollectionRunOptions,
    cancel: &CancelHandle,
) -> RequestRunResult {
    let collection = deps.collections.collection_of(&request.id);
    let ctx = BuildContext {
        collection: collection.as_deref(),
        environment: options.environment.as_ref(),
        default_auth_id: options.auth_id.as_deref(),
        ..Default::default()
    };
    let exchange_id = format!("{run_id}:{}", request.id);
    let (status, response, error) =
        match execute_request(deps, &exchange_id, request, &ctx, cancel).await {
            Ok(resp) if is_success_status(resp.status) => (ExecutionStatus::Success, Some(resp), None),
            Ok(resp) => {
                let error = format!("HTTP {}", resp.status);
                (ExecutionStatus::Failed, Some(resp), Some(error))
            }
            Err(e) => (ExecutionStatus::Failed, None, Some(e)),
        };
    RequestRunResult {
        request_id: request.id.clone(),
        status,
        elapsed_time: response.as_ref().map(|r| r.elapsed_ms),
        response,
        error,
    }
}

fn not_run(request_id: String, status: ExecutionStatus) -> RequestRunResult {
    RequestRunResult {
        request_id,
        status,
        response: None,
        error: None,
        elapsed_time: None,
    }
}

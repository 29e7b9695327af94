//! Bounded-concurrency batch scheduling.
//!
//! Items are split into consecutive batches of `concurrent_calls`. A batch is fully settled
//! before the next one starts, with an optional cancellable pause in between.

mod cancel;

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use async_trait::async_trait;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};
use volley_core::types::{ExecutionConfig, ExecutionStatus, StatusClassification};

pub use cancel::CancelHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("concurrentCalls must be at least 1")]
    InvalidConcurrency,
    #[error("duplicate item id '{0}'")]
    DuplicateItemId(String),
}

/// Anything the batch executor can schedule.
pub trait BatchItem {
    fn item_id(&self) -> &str;
}

/// Lifecycle callbacks. `on_item_complete` fires in completion order, not input order.
#[async_trait]
pub trait BatchObserver<R: Sync>: Send + Sync {
    async fn on_item_start(&self, _item_id: &str) {}

    async fn on_item_complete(
        &self,
        _item_id: &str,
        _result: &R,
        _classification: StatusClassification,
    ) {
    }
}

pub struct NoOpObserver;

impl<R: Sync> BatchObserver<R> for NoOpObserver {}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord<R> {
    pub result: R,
    pub classification: StatusClassification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome<R> {
    pub results: BTreeMap<String, ItemRecord<R>>,
    /// Items never started because an earlier batch failed under `stop_on_failure`.
    pub skipped_ids: Vec<String>,
    /// Items never started because the run was cancelled.
    pub not_started_ids: Vec<String>,
    pub cancelled: bool,
    pub stopped_on_failure: bool,
    pub batches: usize,
}

pub struct BatchExecutor {
    config: ExecutionConfig,
    handle: CancelHandle,
}

impl BatchExecutor {
    pub fn new(config: ExecutionConfig) -> Result<Self, BatchError> {
        Self::with_handle(config, CancelHandle::new())
    }

    /// Build an executor that shares an existing cancel handle.
    pub fn with_handle(config: ExecutionConfig, handle: CancelHandle) -> Result<Self, BatchError> {
        if config.concurrent_calls == 0 {
            return Err(BatchError::InvalidConcurrency);
        }
        Ok(Self { config, handle })
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Run `op` over `items` and classify each result with `classify`.
    ///
    /// Consumes the executor: a run's cancel flag is never reset.
    pub async fn execute<'a, I, R, Op, Fut, C>(
        self,
        items: &'a [I],
        op: Op,
        classify: C,
        observer: &dyn BatchObserver<R>,
    ) -> Result<RunOutcome<R>, BatchError>
    where
        I: BatchItem,
        R: Sync,
        Op: Fn(&'a I) -> Fut,
        Fut: Future<Output = R>,
        C: Fn(&R) -> StatusClassification,
    {
        let mut seen = BTreeSet::new();
        for item in items {
            if !seen.insert(item.item_id()) {
                return Err(BatchError::DuplicateItemId(item.item_id().to_string()));
            }
        }

        let size = self.config.concurrent_calls;
        let delay = self.config.delay();
        let mut outcome = RunOutcome {
            results: BTreeMap::new(),
            skipped_ids: Vec::new(),
            not_started_ids: Vec::new(),
            cancelled: false,
            stopped_on_failure: false,
            batches: 0,
        };

        let op = &op;
        let mut next = 0;
        while next < items.len() {
            if self.handle.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let end = (next + size).min(items.len());
            outcome.batches += 1;
            debug!(batch = outcome.batches, from = next, to = end, "dispatching batch");

            let mut in_flight = FuturesUnordered::new();
            for item in &items[next..end] {
                observer.on_item_start(item.item_id()).await;
                in_flight.push(async move { (item, op(item).await) });
            }
            next = end;

            let mut batch_failed = false;
            while let Some((item, result)) = in_flight.next().await {
                let mut classification = classify(&result);
                if self.handle.is_cancelled() {
                    classification.status = ExecutionStatus::Cancelled;
                }
                if classification.status == ExecutionStatus::Failed {
                    batch_failed = true;
                }
                observer
                    .on_item_complete(item.item_id(), &result, classification)
                    .await;
                outcome.results.insert(
                    item.item_id().to_string(),
                    ItemRecord {
                        result,
                        classification,
                    },
                );
            }

            if self.handle.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            if batch_failed && self.config.stop_on_failure {
                info!(batch = outcome.batches, "batch failed, stopping run");
                outcome.stopped_on_failure = true;
                break;
            }
            if next < items.len() && !delay.is_zero() {
                self.handle.pause(delay).await;
            }
        }

        let rest = items[next..].iter().map(|i| i.item_id().to_string());
        if outcome.stopped_on_failure {
            outcome.skipped_ids.extend(rest);
        } else if outcome.cancelled || self.handle.is_cancelled() {
            outcome.cancelled = true;
            outcome.not_started_ids.extend(rest);
        }
        Ok(outcome)
    }
}

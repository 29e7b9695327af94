//! Data-driven test suites on top of the batch executor.
//!
//! Enabled items run in `order`, `concurrentCalls` at a time. Request items run their enabled
//! test cases sequentially (or the bare request once when there are none); flow items run
//! through the [`FlowEngine`](crate::flow::FlowEngine).

mod item;
mod result;

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use volley_core::types::{
    ExecutionStatus, StatusClassification, SuiteProgress, SuiteRunStatus, TestItem, TestSuite,
    ValidationStatus,
};

use crate::batch::{BatchError, BatchExecutor, BatchItem, BatchObserver, CancelHandle};
use crate::deps::EngineDeps;
use crate::events::{Event, EventSink, RunKind};

use item::ItemRunner;
pub use result::{average_time, TestCaseResult, TestItemResult, TestSuiteRunResult};
pub(crate) use result::Timed;

impl BatchItem for TestItem {
    fn item_id(&self) -> &str {
        self.id()
    }
}

/// A single-use suite run. Construct, hand out [`SuiteRunner::cancel_handle`], then `run`.
pub struct SuiteRunner {
    deps: EngineDeps,
    suite: TestSuite,
    executor: BatchExecutor,
    run_id: Uuid,
}

impl SuiteRunner {
    pub fn new(deps: EngineDeps, suite: TestSuite) -> Result<Self, BatchError> {
        let executor = BatchExecutor::new(suite.settings)?;
        Ok(Self {
            deps,
            suite,
            executor,
            run_id: Uuid::new_v4(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.executor.cancel_handle()
    }

    pub async fn run(self) -> TestSuiteRunResult {
        let Self {
            deps,
            suite,
            executor,
            run_id,
        } = self;
        let cancel = executor.cancel_handle();

        let mut items: Vec<TestItem> = suite.items.iter().filter(|i| i.enabled()).cloned().collect();
        items.sort_by_key(|i| i.order());
        let total = items.len();

        let mut result = TestSuiteRunResult {
            run_id,
            suite_id: suite.id.clone(),
            status: SuiteRunStatus::Running,
            item_results: BTreeMap::new(),
            progress: SuiteProgress::new(total),
            average_time: 0.0,
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        };

        info!(%run_id, suite_id = %suite.id, items = total, "suite started");
        deps.event_sink
            .emit(Event::RunStarted {
                run_id,
                kind: RunKind::Suite,
                target_id: suite.id.clone(),
                total,
            })
            .await;

        let environment = match suite.default_env_id.as_deref() {
            None => Ok(None),
            Some(id) => deps
                .environments
                .find_environment(id)
                .map(Some)
                .ok_or_else(|| format!("environment '{id}' not found")),
        };
        let runner = ItemRunner {
            deps: &deps,
            suite: &suite,
            run_id,
            cancel: &cancel,
            environment,
        };
        let tracker = ProgressTracker::new(run_id, total, deps.event_sink.as_ref());

        let outcome = executor
            .execute(
                &items,
                |item| runner.run(item),
                TestItemResult::classification,
                &tracker,
            )
            .await;

        let outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                warn!(%run_id, error = %e, "suite rejected");
                result.errors.push(e.to_string());
                result.status = SuiteRunStatus::Failed;
                result.completed_at = Some(Utc::now());
                return result;
            }
        };

        let mut records = outcome.results;
        for item in &items {
            let id = item.id();
            let item_result = if let Some(record) = records.remove(id) {
                let mut r = record.result;
                if record.classification.status == ExecutionStatus::Cancelled {
                    r.status = ExecutionStatus::Cancelled;
                    r.validation_status = ValidationStatus::Idle;
                }
                r
            } else if outcome.skipped_ids.iter().any(|s| s == id) {
                TestItemResult::pending(item).with_status(
                    ExecutionStatus::Skipped,
                    Some("not run: an earlier batch failed".to_string()),
                )
            } else if outcome.not_started_ids.iter().any(|s| s == id) {
                TestItemResult::pending(item).with_status(ExecutionStatus::Cancelled, None)
            } else {
                continue;
            };
            result.item_results.insert(id.to_string(), item_result);
        }

        result.progress = SuiteProgress::from_statuses(
            total,
            result.item_results.values().map(|r| r.status),
        );
        result.average_time = average_time(result.item_results.values().map(|r| r.elapsed_time));
        result.status = if outcome.cancelled {
            SuiteRunStatus::Cancelled
        } else if result
            .item_results
            .values()
            .any(|r| r.status == ExecutionStatus::Failed)
        {
            SuiteRunStatus::Failed
        } else {
            SuiteRunStatus::Success
        };
        result.completed_at = Some(Utc::now());

        info!(
            %run_id,
            status = result.status.as_str(),
            passed = result.progress.passed,
            failed = result.progress.failed,
            skipped = result.progress.skipped,
            "suite finished"
        );
        deps.event_sink
            .emit(Event::Progress {
                run_id,
                progress: result.progress,
                average_time: result.average_time,
            })
            .await;
        deps.event_sink
            .emit(Event::SuiteFinished {
                run_id,
                status: result.status,
            })
            .await;
        result
    }
}

/// Keeps live progress and average time as items settle and reports them through the
/// event sink.
pub(crate) struct ProgressTracker<'a> {
    run_id: Uuid,
    total: usize,
    sink: &'a dyn EventSink,
    settled: Mutex<BTreeMap<String, (ExecutionStatus, Option<u64>)>>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(run_id: Uuid, total: usize, sink: &'a dyn EventSink) -> Self {
        Self {
            run_id,
            total,
            sink,
            settled: Mutex::new(BTreeMap::new()),
        }
    }

    fn settle(
        &self,
        item_id: &str,
        status: ExecutionStatus,
        elapsed: Option<u64>,
    ) -> (SuiteProgress, f64) {
        let mut settled = self.settled.lock().unwrap_or_else(|e| e.into_inner());
        settled.insert(item_id.to_string(), (status, elapsed));
        let progress = SuiteProgress::from_statuses(self.total, settled.values().map(|(s, _)| *s));
        (progress, average_time(settled.values().map(|(_, t)| *t)))
    }
}

#[async_trait]
impl<'a, R: Timed + Sync> BatchObserver<R> for ProgressTracker<'a> {
    async fn on_item_start(&self, item_id: &str) {
        self.sink
            .emit(Event::ItemStarted {
                run_id: self.run_id,
                item_id: item_id.to_string(),
            })
            .await;
    }

    async fn on_item_complete(
        &self,
        item_id: &str,
        result: &R,
        classification: StatusClassification,
    ) {
        let (progress, average_time) =
            self.settle(item_id, classification.status, result.elapsed_time());
        self.sink
            .emit(Event::ItemCompleted {
                run_id: self.run_id,
                item_id: item_id.to_string(),
                status: classification.status,
                validation_status: classification.validation_status,
            })
            .await;
        self.sink
            .emit(Event::Progress {
                run_id: self.run_id,
                progress,
                average_time,
            })
            .await;
    }
}

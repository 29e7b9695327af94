use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use volley_core::types::{
    ExecutionStatus, StatusClassification, SuiteProgress, SuiteRunStatus, TestCase, TestItem,
    TestItemKind, ValidationStatus,
};

use crate::flow::FlowRunResult;
use crate::http::HttpResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub case_id: String,
    pub name: String,
    pub status: ExecutionStatus,
    pub validation_status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_failures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TestCaseResult {
    /// A case that never ran because the run was cancelled first.
    pub fn skipped(case: &TestCase) -> Self {
        Self {
            case_id: case.id.clone(),
            name: case.name.clone(),
            status: ExecutionStatus::Skipped,
            validation_status: ValidationStatus::Idle,
            response: None,
            error: None,
            validation_failures: Vec::new(),
            elapsed_time: None,
            started_at: None,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestItemResult {
    pub item_id: String,
    pub item_type: TestItemKind,
    pub reference_id: String,
    pub status: ExecutionStatus,
    pub validation_status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_failures: Vec<String>,
    /// Milliseconds spent on the wire: summed over test cases, or the flow's wall time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_case_results: Vec<TestCaseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_result: Option<FlowRunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Results that report how long they took, for live average time.
pub(crate) trait Timed {
    fn elapsed_time(&self) -> Option<u64>;
}

impl Timed for TestItemResult {
    fn elapsed_time(&self) -> Option<u64> {
        self.elapsed_time
    }
}

impl TestItemResult {
    pub fn pending(item: &TestItem) -> Self {
        Self {
            item_id: item.id().to_string(),
            item_type: item.kind(),
            reference_id: item.reference_id().to_string(),
            status: ExecutionStatus::Pending,
            validation_status: ValidationStatus::Idle,
            response: None,
            error: None,
            validation_failures: Vec::new(),
            elapsed_time: None,
            test_case_results: Vec::new(),
            flow_result: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_status(mut self, status: ExecutionStatus, error: Option<String>) -> Self {
        self.status = status;
        self.error = error;
        self
    }

    pub(crate) fn fail(mut self, error: String) -> Self {
        self.status = ExecutionStatus::Failed;
        self.validation_status = ValidationStatus::Fail;
        self.error = Some(error);
        self
    }

    pub fn classification(&self) -> StatusClassification {
        StatusClassification::new(self.status, self.validation_status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteRunResult {
    pub run_id: Uuid,
    pub suite_id: String,
    pub status: SuiteRunStatus,
    pub item_results: BTreeMap<String, TestItemResult>,
    pub progress: SuiteProgress,
    /// Mean `elapsedTime` over items that report one; 0 when none do.
    pub average_time: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Mean of the known timings, 0 for none.
pub fn average_time<I>(timings: I) -> f64
where
    I: IntoIterator<Item = Option<u64>>,
{
    let (sum, n) = timings
        .into_iter()
        .flatten()
        .fold((0u64, 0u64), |(s, n), t| (s + t, n + 1));
    if n == 0 {
        0.0
    } else {
        sum as f64 / n as f64
    }
}

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{default_true, KeyValue, RequestBody, RequestValidation};

/// Scheduling knobs for one batch run. Read-only for the life of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    #[serde(default = "default_concurrent_calls")]
    pub concurrent_calls: usize,
    /// Milliseconds to wait between batches.
    #[serde(default)]
    pub delay_between_calls: u64,
    #[serde(default)]
    pub stop_on_failure: bool,
}

fn default_concurrent_calls() -> usize {
    1
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            concurrent_calls: default_concurrent_calls(),
            delay_between_calls: 0,
            stop_on_failure: false,
        }
    }
}

impl ExecutionConfig {
    pub fn new(concurrent_calls: usize, delay_between_calls: u64, stop_on_failure: bool) -> Self {
        Self {
            concurrent_calls,
            delay_between_calls,
            stop_on_failure,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_calls)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub items: Vec<TestItem>,

    #[serde(default)]
    pub settings: ExecutionConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_env_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_auth_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestItemKind {
    Request,
    Flow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TestItem {
    Request(RequestTestItem),
    Flow(FlowTestItem),
}

impl TestItem {
    pub fn id(&self) -> &str {
        match self {
            TestItem::Request(r) => &r.id,
            TestItem::Flow(f) => &f.id,
        }
    }

    pub fn reference_id(&self) -> &str {
        match self {
            TestItem::Request(r) => &r.reference_id,
            TestItem::Flow(f) => &f.reference_id,
        }
    }

    pub fn order(&self) -> i64 {
        match self {
            TestItem::Request(r) => r.order,
            TestItem::Flow(f) => f.order,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            TestItem::Request(r) => r.enabled,
            TestItem::Flow(f) => f.enabled,
        }
    }

    pub fn kind(&self) -> TestItemKind {
        match self {
            TestItem::Request(_) => TestItemKind::Request,
            TestItem::Flow(_) => TestItemKind::Flow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTestItem {
    pub id: String,
    /// Id of the collection request this item exercises.
    pub reference_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<RequestValidation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTestItem {
    pub id: String,
    /// Id of the flow this item runs.
    pub reference_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One data-driven variant of a request item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub overrides: TestCaseOverrides,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<RequestValidation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseOverrides {
    /// Merged by key (case-insensitive) on top of the request's headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<KeyValue>>,
    /// Merged by key on top of the request's query parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<KeyValue>>,
    /// Replaces the request body outright.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<String>,
}

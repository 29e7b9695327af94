use chrono::Utc;
use tracing::debug;
use uuid::Uuid;
use volley_core::types::{
    Environment, ExecutionStatus, FlowRunStatus, FlowTestItem, Request, RequestTestItem,
    RequestValidation, TestCaseOverrides, TestItem, TestSuite, ValidationStatus,
};

use crate::batch::CancelHandle;
use crate::deps::EngineDeps;
use crate::events::Event;
use crate::flow::{FlowEngine, FlowRunOptions};
use crate::http::HttpResponse;
use crate::request::{execute_request, BuildContext};
use crate::validation::{default_expectation, validate_response};

use super::result::{TestCaseResult, TestItemResult};

/// Executes single suite items. Shared by every in-flight item of one run.
pub(crate) struct ItemRunner<'a> {
    pub deps: &'a EngineDeps,
    pub suite: &'a TestSuite,
    pub run_id: Uuid,
    pub cancel: &'a CancelHandle,
    /// The suite's default environment, resolved once per run.
    pub environment: Result<Option<Environment>, String>,
}

/// One request sent and judged.
struct Attempt {
    status: ExecutionStatus,
    validation_status: ValidationStatus,
    response: Option<HttpResponse>,
    error: Option<String>,
    failures: Vec<String>,
}

impl Attempt {
    /// A response that lands after cancellation is not part of the run.
    fn unless_cancelled(self, cancel: &CancelHandle) -> Self {
        if !cancel.is_cancelled() {
            return self;
        }
        Self {
            status: ExecutionStatus::Cancelled,
            validation_status: ValidationStatus::Idle,
            response: None,
            error: Some("cancelled".to_string()),
            failures: Vec::new(),
        }
    }
}

impl ItemRunner<'_> {
    pub async fn run(&self, item: &TestItem) -> TestItemResult {
        let started_at = Utc::now();
        let mut result = match item {
            TestItem::Request(r) => self.run_request_item(item, r).await,
            TestItem::Flow(f) => self.run_flow_item(item, f).await,
        };
        result.started_at = Some(started_at);
        result.completed_at = Some(Utc::now());
        result
    }

    async fn run_request_item(&self, item: &TestItem, ri: &RequestTestItem) -> TestItemResult {
        let result = TestItemResult::pending(item);
        let environment = match &self.environment {
            Ok(env) => env.as_ref(),
            Err(e) => return result.fail(e.clone()),
        };
        let Some(request) = self.deps.collections.find_request_by_id(&ri.reference_id) else {
            return result.fail(format!("request '{}' not found", ri.reference_id));
        };

        let mut cases: Vec<_> = ri.test_cases.iter().filter(|c| c.enabled).collect();
        if cases.is_empty() {
            let exchange_id = format!("{}:{}", self.run_id, ri.id);
            let attempt = self
                .attempt(&request, environment, None, ri.validation.as_ref(), &exchange_id)
                .await
                .unless_cancelled(self.cancel);
            let mut result = result;
            result.status = attempt.status;
            result.validation_status = attempt.validation_status;
            result.elapsed_time = attempt.response.as_ref().map(|r| r.elapsed_ms);
            result.response = attempt.response;
            result.error = attempt.error;
            result.validation_failures = attempt.failures;
            return result;
        }

        cases.sort_by_key(|c| c.order);
        let mut case_results = Vec::with_capacity(cases.len());
        for case in cases {
            if self.cancel.is_cancelled() {
                case_results.push(TestCaseResult::skipped(case));
                continue;
            }
            let started_at = Utc::now();
            let exchange_id = format!("{}:{}:{}", self.run_id, ri.id, case.id);
            let validation = case.validation.as_ref().or(ri.validation.as_ref());
            let attempt = self
                .attempt(
                    &request,
                    environment,
                    Some(&case.overrides),
                    validation,
                    &exchange_id,
                )
                .await
                .unless_cancelled(self.cancel);
            debug!(run_id = %self.run_id, item_id = %ri.id, case_id = %case.id, status = attempt.status.as_str(), "test case finished");
            self.deps
                .event_sink
                .emit(Event::CaseFinished {
                    run_id: self.run_id,
                    item_id: ri.id.clone(),
                    case_id: case.id.clone(),
                    status: attempt.status,
                })
                .await;
            case_results.push(TestCaseResult {
                case_id: case.id.clone(),
                name: case.name.clone(),
                status: attempt.status,
                validation_status: attempt.validation_status,
                elapsed_time: attempt.response.as_ref().map(|r| r.elapsed_ms),
                response: attempt.response,
                error: attempt.error,
                validation_failures: attempt.failures,
                started_at: Some(started_at),
                completed_at: Some(Utc::now()),
            });
        }

        aggregate_cases(result, case_results)
    }

    async fn attempt(
        &self,
        request: &Request,
        environment: Option<&Environment>,
        overrides: Option<&TestCaseOverrides>,
        validation: Option<&RequestValidation>,
        exchange_id: &str,
    ) -> Attempt {
        let collection = self.deps.collections.collection_of(&request.id);
        let ctx = BuildContext {
            collection: collection.as_deref(),
            environment,
            default_auth_id: self.suite.default_auth_id.as_deref(),
            overrides,
            flow: None,
            variables: None,
        };
        match execute_request(self.deps, exchange_id, request, &ctx, self.cancel).await {
            Err(error) => Attempt {
                status: ExecutionStatus::Failed,
                validation_status: ValidationStatus::Fail,
                response: None,
                error: Some(error),
                failures: Vec::new(),
            },
            Ok(response) => {
                let report = match validation {
                    Some(v) => validate_response(v, &response),
                    None => default_expectation(&response),
                };
                let (status, validation_status) = if report.passed {
                    (ExecutionStatus::Success, ValidationStatus::Pass)
                } else {
                    (ExecutionStatus::Failed, ValidationStatus::Fail)
                };
                Attempt {
                    status,
                    validation_status,
                    error: report.summary(),
                    failures: report.failures,
                    response: Some(response),
                }
            }
        }
    }

    async fn run_flow_item(&self, item: &TestItem, fi: &FlowTestItem) -> TestItemResult {
        let mut result = TestItemResult::pending(item);
        let Some(flow) = self.deps.flows.find_flow_by_id(&fi.reference_id) else {
            return result.fail(format!("flow '{}' not found", fi.reference_id));
        };

        // The flow's own defaults are more specific than the suite's.
        let options = FlowRunOptions {
            run_id: None,
            env_id: flow
                .default_env_id
                .clone()
                .or_else(|| self.suite.default_env_id.clone()),
            auth_id: flow
                .default_auth_id
                .clone()
                .or_else(|| self.suite.default_auth_id.clone()),
            variables: Default::default(),
        };
        let flow_result = FlowEngine::new(self.deps.clone())
            .run(&flow, &options, self.cancel)
            .await;

        let (status, validation_status) = match flow_result.status {
            FlowRunStatus::Success => (ExecutionStatus::Success, ValidationStatus::Pass),
            FlowRunStatus::Failed | FlowRunStatus::Running => {
                (ExecutionStatus::Failed, ValidationStatus::Fail)
            }
            FlowRunStatus::Cancelled => (ExecutionStatus::Skipped, ValidationStatus::Idle),
        };
        result.status = status;
        result.validation_status = validation_status;
        result.elapsed_time = flow_result.elapsed_ms();
        if status == ExecutionStatus::Failed {
            result.error = flow_result.first_error();
        }
        result.flow_result = Some(flow_result);
        result
    }
}

/// Fold per-case outcomes into the item: any failure fails the item, cases cut off by
/// cancellation make it cancelled (with no validation verdict), otherwise it succeeds.
fn aggregate_cases(mut result: TestItemResult, cases: Vec<TestCaseResult>) -> TestItemResult {
    let any = |s: ExecutionStatus| cases.iter().any(|c| c.status == s);
    result.status = if any(ExecutionStatus::Failed) {
        ExecutionStatus::Failed
    } else if any(ExecutionStatus::Skipped) || any(ExecutionStatus::Cancelled) {
        ExecutionStatus::Cancelled
    } else {
        ExecutionStatus::Success
    };

    let any_validation = |s: ValidationStatus| cases.iter().any(|c| c.validation_status == s);
    result.validation_status = if result.status == ExecutionStatus::Cancelled {
        ValidationStatus::Idle
    } else if any_validation(ValidationStatus::Fail) {
        ValidationStatus::Fail
    } else if any_validation(ValidationStatus::Pass) {
        ValidationStatus::Pass
    } else {
        ValidationStatus::Idle
    };

    let timings: Vec<u64> = cases.iter().filter_map(|c| c.elapsed_time).collect();
    result.elapsed_time = (!timings.is_empty()).then(|| timings.iter().sum());
    result.error = cases
        .iter()
        .find(|c| c.status == ExecutionStatus::Failed)
        .and_then(|c| {
            c.error
                .as_ref()
                .map(|e| format!("case '{}': {e}", display_name(c)))
        });
    result.test_case_results = cases;
    result
}

fn display_name(c: &TestCaseResult) -> &str {
    if c.name.is_empty() {
        &c.case_id
    } else {
        &c.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, status: ExecutionStatus, validation: ValidationStatus) -> TestCaseResult {
        TestCaseResult {
            case_id: id.to_string(),
            name: String::new(),
            status,
            validation_status: validation,
            response: None,
            error: (status == ExecutionStatus::Failed).then(|| "HTTP 500".to_string()),
            validation_failures: Vec::new(),
            elapsed_time: Some(10),
            started_at: None,
            completed_at: None,
        }
    }

    fn item() -> TestItemResult {
        TestItemResult::pending(&TestItem::Request(RequestTestItem {
            id: "i".into(),
            reference_id: "r".into(),
            order: 0,
            enabled: true,
            test_cases: Vec::new(),
            validation: None,
        }))
    }

    #[test]
    fn one_failing_case_fails_the_item() {
        let r = aggregate_cases(
            item(),
            vec![
                case("c1", ExecutionStatus::Success, ValidationStatus::Pass),
                case("c2", ExecutionStatus::Failed, ValidationStatus::Fail),
            ],
        );
        assert_eq!(r.status, ExecutionStatus::Failed);
        assert_eq!(r.validation_status, ValidationStatus::Fail);
        assert_eq!(r.elapsed_time, Some(20));
        assert_eq!(r.error.as_deref(), Some("case 'c2': HTTP 500"));
        assert_eq!(r.test_case_results[0].validation_status, ValidationStatus::Pass);
    }

    #[test]
    fn unrun_cases_mark_the_item_cancelled() {
        let mut skipped = case("c2", ExecutionStatus::Skipped, ValidationStatus::Idle);
        skipped.elapsed_time = None;
        let r = aggregate_cases(
            item(),
            vec![case("c1", ExecutionStatus::Success, ValidationStatus::Pass), skipped],
        );
        assert_eq!(r.status, ExecutionStatus::Cancelled);
        assert_eq!(r.validation_status, ValidationStatus::Idle);
        assert_eq!(r.elapsed_time, Some(10));
    }

    #[test]
    fn a_case_cut_off_by_cancel_counts_like_an_unrun_one() {
        let mut cut = case("c1", ExecutionStatus::Cancelled, ValidationStatus::Idle);
        cut.elapsed_time = None;
        let mut skipped = case("c2", ExecutionStatus::Skipped, ValidationStatus::Idle);
        skipped.elapsed_time = None;
        let r = aggregate_cases(item(), vec![cut, skipped]);
        assert_eq!(r.status, ExecutionStatus::Cancelled);
        assert_eq!(r.validation_status, ValidationStatus::Idle);
        assert_eq!(r.elapsed_time, None);
        assert_eq!(r.error, None);
    }
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{deps, deps_with_events, drain, json, workspace, MockHttpExecutor};
use volley_core::types::{ExecutionStatus, SuiteRunStatus, TestSuite, ValidationStatus};
use volley_exec::events::Event;
use volley_exec::SuiteRunner;

const WORKSPACE: &str = r#"
environments:
  - id: dev
    variables:
      baseUrl: http://dev.test
collections:
  - id: api
    requests:
      - id: list-users
        url: "{{baseUrl}}/users"
        params:
          - { key: page, value: "1" }
      - { id: create-user, method: POST, url: "{{baseUrl}}/users/create" }
      - { id: health, url: "{{baseUrl}}/health" }
      - { id: crash, url: "{{baseUrl}}/crash" }
flows:
  - id: signup
    nodes:
      - { id: n1, alias: create, requestId: create-user }
      - { id: n2, alias: check, requestId: health }
    connectors:
      - { id: c1, sourceNodeId: n1, targetNodeId: n2 }
"#;

fn suite(yaml: &str) -> TestSuite {
    serde_yaml::from_str(yaml).unwrap()
}

/// `/crash` answers 500, `page=2` answers 404, everything else 200.
fn mock() -> MockHttpExecutor {
    MockHttpExecutor::new(|req| {
        if req.url.path() == "/crash" {
            return Ok(json(500, "{}"));
        }
        if req.url.query_pairs().any(|(k, v)| k == "page" && v == "2") {
            return Ok(json(404, "{}"));
        }
        Ok(json(200, r#"{"ok":true}"#))
    })
}

#[tokio::test]
async fn one_failing_test_case_fails_the_item_but_keeps_the_passing_case() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: users
defaultEnvId: dev
items:
  - type: request
    id: item-1
    referenceId: list-users
    testCases:
      - { id: first-page, order: 1 }
      - id: second-page
        order: 2
        overrides:
          params: [{ key: page, value: "2" }]
"#,
    );

    let result = SuiteRunner::new(deps(&doc, http.clone()), suite)
        .unwrap()
        .run()
        .await;

    let item = &result.item_results["item-1"];
    assert_eq!(item.status, ExecutionStatus::Failed);
    assert_eq!(item.validation_status, ValidationStatus::Fail);
    assert_eq!(item.test_case_results.len(), 2);
    assert_eq!(item.test_case_results[0].validation_status, ValidationStatus::Pass);
    assert_eq!(item.test_case_results[1].status, ExecutionStatus::Failed);
    assert_eq!(item.elapsed_time, Some(20));

    assert_eq!(result.status, SuiteRunStatus::Failed);
    assert_eq!(result.progress.total, 1);
    assert_eq!(result.progress.completed, 1);
    assert_eq!(result.progress.failed, 1);

    let urls: Vec<String> = http.calls().iter().map(|c| c.url.to_string()).collect();
    assert_eq!(
        urls,
        vec!["http://dev.test/users?page=1", "http://dev.test/users?page=2"]
    );
}

#[tokio::test]
async fn disabled_items_are_excluded_and_order_is_respected() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: ordered
defaultEnvId: dev
items:
  - { type: request, id: late, referenceId: health, order: 5 }
  - { type: request, id: off, referenceId: crash, order: 1, enabled: false }
  - { type: request, id: early, referenceId: create-user, order: 2 }
"#,
    );

    let result = SuiteRunner::new(deps(&doc, http.clone()), suite)
        .unwrap()
        .run()
        .await;

    assert_eq!(http.paths(), vec!["/users/create", "/health"]);
    assert_eq!(result.progress.total, 2);
    assert_eq!(result.progress.passed, 2);
    assert!(!result.item_results.contains_key("off"));
    assert_eq!(result.status, SuiteRunStatus::Success);
    assert_eq!(result.average_time, 10.0);
}

#[tokio::test]
async fn stop_on_failure_marks_remaining_items_skipped() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: fragile
defaultEnvId: dev
settings: { concurrentCalls: 1, stopOnFailure: true }
items:
  - { type: request, id: boom, referenceId: crash, order: 1 }
  - { type: request, id: after-1, referenceId: health, order: 2 }
  - { type: request, id: after-2, referenceId: health, order: 3 }
"#,
    );

    let result = SuiteRunner::new(deps(&doc, http.clone()), suite)
        .unwrap()
        .run()
        .await;

    assert_eq!(http.paths(), vec!["/crash"]);
    assert_eq!(result.status, SuiteRunStatus::Failed);
    assert_eq!(result.item_results["after-1"].status, ExecutionStatus::Skipped);
    assert_eq!(result.item_results["after-2"].status, ExecutionStatus::Skipped);
    assert_eq!(result.progress.completed, 3);
    assert_eq!(result.progress.failed, 1);
    assert_eq!(result.progress.skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_run_still_returns_a_complete_result() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: slow
defaultEnvId: dev
settings: { concurrentCalls: 1, delayBetweenCalls: 5000 }
items:
  - { type: request, id: one, referenceId: health, order: 1 }
  - { type: request, id: two, referenceId: health, order: 2 }
  - { type: request, id: three, referenceId: health, order: 3 }
"#,
    );

    let runner = SuiteRunner::new(deps(&doc, http.clone()), suite).unwrap();
    let handle = runner.cancel_handle();
    let (result, _) = tokio::join!(runner.run(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    assert_eq!(result.status, SuiteRunStatus::Cancelled);
    assert_eq!(http.calls().len(), 1);
    assert_eq!(result.item_results["one"].status, ExecutionStatus::Success);
    assert_eq!(result.item_results["two"].status, ExecutionStatus::Cancelled);
    assert_eq!(result.item_results["three"].status, ExecutionStatus::Cancelled);
    assert!(result.progress.is_consistent());
    assert_eq!(result.progress.completed, 3);
}

#[tokio::test]
async fn flow_items_carry_the_flow_result() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: flows
defaultEnvId: dev
items:
  - { type: flow, id: signup-flow, referenceId: signup }
  - { type: flow, id: ghost, referenceId: nope, order: 1 }
"#,
    );

    let result = SuiteRunner::new(deps(&doc, http.clone()), suite)
        .unwrap()
        .run()
        .await;

    let signup = &result.item_results["signup-flow"];
    assert_eq!(signup.status, ExecutionStatus::Success);
    assert_eq!(signup.validation_status, ValidationStatus::Pass);
    let flow = signup.flow_result.as_ref().unwrap();
    assert_eq!(flow.execution_order, vec!["create", "check"]);

    let ghost = &result.item_results["ghost"];
    assert_eq!(ghost.status, ExecutionStatus::Failed);
    assert_eq!(ghost.error.as_deref(), Some("flow 'nope' not found"));
}

#[tokio::test]
async fn explicit_validation_overrides_the_default_status_check() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: checks
defaultEnvId: dev
items:
  - type: request
    id: expects-created
    referenceId: create-user
    validation: { status: 201 }
  - type: request
    id: expects-error
    referenceId: crash
    validation: { status: [500, 503] }
"#,
    );

    let result = SuiteRunner::new(deps(&doc, http), suite)
        .unwrap()
        .run()
        .await;

    let created = &result.item_results["expects-created"];
    assert_eq!(created.status, ExecutionStatus::Failed);
    assert_eq!(
        created.validation_failures,
        vec!["status 200 does not match 201"]
    );
    let errored = &result.item_results["expects-error"];
    assert_eq!(errored.status, ExecutionStatus::Success);
    assert_eq!(errored.validation_status, ValidationStatus::Pass);
}

#[tokio::test]
async fn progress_events_stay_consistent() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: events
defaultEnvId: dev
settings: { concurrentCalls: 2 }
items:
  - { type: request, id: a, referenceId: health }
  - { type: request, id: b, referenceId: crash }
  - { type: request, id: c, referenceId: health }
"#,
    );
    let (deps, mut rx) = deps_with_events(&doc, http);

    let result = SuiteRunner::new(deps, suite).unwrap().run().await;

    let progress: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            Event::Progress { progress, .. } => Some(progress),
            _ => None,
        })
        .collect();
    assert!(progress.iter().all(|p| p.is_consistent()));
    assert!(progress.windows(2).all(|w| w[0].completed <= w[1].completed));
    assert_eq!(progress.last().copied(), Some(result.progress));
    assert_eq!(result.progress.passed, 2);
    assert_eq!(result.progress.failed, 1);
}

#[tokio::test]
async fn missing_environment_fails_request_items() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: no-env
defaultEnvId: prod
items:
  - { type: request, id: a, referenceId: health }
"#,
    );

    let result = SuiteRunner::new(deps(&doc, http.clone()), suite)
        .unwrap()
        .run()
        .await;

    assert_eq!(
        result.item_results["a"].error.as_deref(),
        Some("environment 'prod' not found")
    );
    assert!(http.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_a_test_case_discards_its_late_response() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(MockHttpExecutor::ok().with_delay(Duration::from_millis(1000)));
    let suite = suite(
        r#"
id: cut-short
defaultEnvId: dev
items:
  - type: request
    id: cases
    referenceId: health
    testCases:
      - { id: c1, order: 1 }
      - { id: c2, order: 2 }
"#,
    );

    let runner = SuiteRunner::new(deps(&doc, http.clone()), suite).unwrap();
    let handle = runner.cancel_handle();
    let (result, _) = tokio::join!(runner.run(), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.cancel();
    });

    assert_eq!(result.status, SuiteRunStatus::Cancelled);
    assert_eq!(http.calls().len(), 1);

    let item = &result.item_results["cases"];
    assert_eq!(item.status, ExecutionStatus::Cancelled);
    assert_eq!(item.validation_status, ValidationStatus::Idle);
    assert_eq!(item.test_case_results.len(), 2);

    let first = &item.test_case_results[0];
    assert_eq!(first.case_id, "c1");
    assert_eq!(first.status, ExecutionStatus::Cancelled);
    assert_eq!(first.validation_status, ValidationStatus::Idle);
    assert!(first.response.is_none());
    assert_eq!(first.elapsed_time, None);

    let second = &item.test_case_results[1];
    assert_eq!(second.case_id, "c2");
    assert_eq!(second.status, ExecutionStatus::Skipped);
    assert_eq!(second.validation_status, ValidationStatus::Idle);

    assert_eq!(result.progress.skipped, 1);
    assert_eq!(result.progress.passed, 0);
    assert!(result.progress.is_consistent());
}

#[tokio::test]
async fn progress_events_carry_a_running_average_of_timed_items() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(mock());
    let suite = suite(
        r#"
id: timing
defaultEnvId: dev
settings: { concurrentCalls: 1 }
items:
  - { type: request, id: ghost, referenceId: missing, order: 1 }
  - { type: request, id: fast, referenceId: health, order: 2 }
  - { type: request, id: also-fast, referenceId: create-user, order: 3 }
"#,
    );
    let (deps, mut rx) = deps_with_events(&doc, http);

    let result = SuiteRunner::new(deps, suite).unwrap().run().await;

    let averages: Vec<f64> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            Event::Progress { average_time, .. } => Some(average_time),
            _ => None,
        })
        .collect();
    // One update per settled item, then the final one.
    assert_eq!(averages, vec![0.0, 10.0, 10.0, 10.0]);
    assert_eq!(result.item_results["ghost"].elapsed_time, None);
    assert_eq!(result.average_time, 10.0);
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{deps, workspace, MockHttpExecutor};
use volley_core::types::{ExecutionConfig, ExecutionStatus, SuiteRunStatus};
use volley_exec::{CollectionRunOptions, CollectionRunner};

const WORKSPACE: &str = r#"
collections:
  - id: shop
    requests:
      - { id: products, url: "http://shop.test/products" }
      - { id: cart, url: "http://shop.test/cart" }
      - { id: orders, url: "http://shop.test/orders" }
"#;

#[tokio::test(start_paused = true)]
async fn three_requests_at_concurrency_two() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(MockHttpExecutor::ok().with_delay(Duration::from_millis(50)));
    let requests = doc.collections[0].requests.clone();

    let runner =
        CollectionRunner::new(deps(&doc, http.clone()), ExecutionConfig::new(2, 0, false)).unwrap();
    let result = runner
        .run(&requests, &CollectionRunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.status, SuiteRunStatus::Success);
    assert_eq!(result.progress.total, 3);
    assert_eq!(result.progress.completed, 3);
    assert_eq!(result.progress.passed, 3);
    assert_eq!(result.progress.failed, 0);
    assert_eq!(http.max_in_flight(), 2);
    assert_eq!(result.average_time, 10.0);
}

#[tokio::test]
async fn error_statuses_fail_their_request_only() {
    let doc = workspace(WORKSPACE);
    let http = Arc::new(MockHttpExecutor::by_path(&[("/cart", 404)]));
    let requests = doc.collections[0].requests.clone();

    let runner = CollectionRunner::new(deps(&doc, http), ExecutionConfig::default()).unwrap();
    let result = runner
        .run(&requests, &CollectionRunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.status, SuiteRunStatus::Failed);
    assert_eq!(result.results["cart"].status, ExecutionStatus::Failed);
    assert_eq!(result.results["cart"].error.as_deref(), Some("HTTP 404"));
    assert_eq!(result.results["orders"].status, ExecutionStatus::Success);
    assert_eq!(result.progress.failed, 1);
}

mod auth;
mod collection;
mod flow;
mod request;
mod status;
mod suite;
mod validation;
mod workspace;

pub use auth::{ApiKeyLocation, AuthProfile, AuthScheme, SecretValue};
pub use collection::{Collection, Environment};
pub use flow::{is_success_status, ConnectorCondition, Flow, FlowConnector, FlowNode};
pub use request::{HttpMethod, KeyValue, Request, RequestBody};
pub use status::{
    ExecutionStatus, FlowProgress, FlowRunStatus, NodeStatus, StatusClassification,
    SuiteProgress, SuiteRunStatus, ValidationStatus,
};
pub use suite::{
    ExecutionConfig, FlowTestItem, RequestTestItem, TestCase, TestCaseOverrides, TestItem,
    TestItemKind, TestSuite,
};
pub use validation::{JsonPathAssertion, RequestValidation, StatusExpectation};
pub use workspace::WorkspaceDocument;

pub(crate) fn default_true() -> bool {
    true
}

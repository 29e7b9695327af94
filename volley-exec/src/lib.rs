#![forbid(unsafe_code)]

//! Execution engine for volley: a bounded-concurrency batch executor, a conditional flow
//! engine and the data-driven test suite runner built on both.

pub mod batch;
pub mod collection;
pub mod events;
pub mod flow;
pub mod http;
pub mod lookup;
pub mod request;
pub mod suite;
pub mod validation;

mod deps;

pub use crate::batch::{BatchError, BatchExecutor, BatchItem, BatchObserver, CancelHandle, RunOutcome};
pub use crate::collection::{
    CollectionRunOptions, CollectionRunResult, CollectionRunner, RequestRunResult,
};
pub use crate::deps::EngineDeps;
pub use crate::events::{Event, EventSink};
pub use crate::flow::{FlowContext, FlowEngine, FlowNodeResult, FlowRunOptions, FlowRunResult};
pub use crate::http::{BuiltRequest, CancelTarget, HttpError, HttpExecutor, HttpResponse, ReqwestHttpExecutor};
pub use crate::suite::{SuiteRunner, TestCaseResult, TestItemResult, TestSuiteRunResult};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use volley_core::types::{
    ExecutionStatus, FlowRunStatus, NodeStatus, SuiteProgress, SuiteRunStatus, ValidationStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Suite,
    Flow,
    Collection,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Suite => "suite",
            RunKind::Flow => "flow",
            RunKind::Collection => "collection",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        kind: RunKind,
        target_id: String,
        total: usize,
    },
    SuiteFinished {
        run_id: Uuid,
        status: SuiteRunStatus,
    },
    FlowFinished {
        run_id: Uuid,
        flow_id: String,
        status: FlowRunStatus,
    },
    ItemStarted {
        run_id: Uuid,
        item_id: String,
    },
    ItemCompleted {
        run_id: Uuid,
        item_id: String,
        status: ExecutionStatus,
        validation_status: ValidationStatus,
    },
    CaseFinished {
        run_id: Uuid,
        item_id: String,
        case_id: String,
        status: ExecutionStatus,
    },
    NodeStarted {
        run_id: Uuid,
        flow_id: String,
        node_id: String,
    },
    NodeFinished {
        run_id: Uuid,
        flow_id: String,
        node_id: String,
        status: NodeStatus,
    },
    Progress {
        run_id: Uuid,
        progress: SuiteProgress,
        /// Mean elapsed time of the settled items that report one.
        average_time: f64,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "run.started",
            Event::SuiteFinished { .. } => "run.finished",
            Event::FlowFinished { .. } => "flow.finished",
            Event::ItemStarted { .. } => "item.started",
            Event::ItemCompleted { .. } => "item.completed",
            Event::CaseFinished { .. } => "case.finished",
            Event::NodeStarted { .. } => "node.started",
            Event::NodeFinished { .. } => "node.finished",
            Event::Progress { .. } => "progress",
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let ty = self.kind();
        match self {
            Event::RunStarted {
                run_id,
                kind,
                target_id,
                total,
            } => json!({
                "type": ty, "run_id": run_id.to_string(), "kind": kind.as_str(),
                "target_id": target_id, "total": total
            }),
            Event::SuiteFinished { run_id, status } => {
                json!({ "type": ty, "run_id": run_id.to_string(), "status": status })
            }
            Event::FlowFinished {
                run_id,
                flow_id,
                status,
            } => json!({
                "type": ty, "run_id": run_id.to_string(), "flow_id": flow_id, "status": status
            }),
            Event::ItemStarted { run_id, item_id } => {
                json!({ "type": ty, "run_id": run_id.to_string(), "item_id": item_id })
            }
            Event::ItemCompleted {
                run_id,
                item_id,
                status,
                validation_status,
            } => json!({
                "type": ty, "run_id": run_id.to_string(), "item_id": item_id,
                "status": status.as_str(), "validation_status": validation_status
            }),
            Event::CaseFinished {
                run_id,
                item_id,
                case_id,
                status,
            } => json!({
                "type": ty, "run_id": run_id.to_string(), "item_id": item_id,
                "case_id": case_id, "status": status.as_str()
            }),
            Event::NodeStarted {
                run_id,
                flow_id,
                node_id,
            } => json!({
                "type": ty, "run_id": run_id.to_string(), "flow_id": flow_id, "node_id": node_id
            }),
            Event::NodeFinished {
                run_id,
                flow_id,
                node_id,
                status,
            } => json!({
                "type": ty, "run_id": run_id.to_string(), "flow_id": flow_id,
                "node_id": node_id, "status": status
            }),
            Event::Progress {
                run_id,
                progress,
                average_time,
            } => json!({
                "type": ty, "run_id": run_id.to_string(), "progress": progress,
                "average_time": average_time
            }),
        }
    }
}

/// Receives live execution events. Sinks must not block the engine for long.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}

/// Writes one JSON object per event to stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

/// Forwards events to an unbounded channel; a closed receiver is ignored.
pub struct ChannelEventSink {
    tx: UnboundedSender<Event>,
}

impl ChannelEventSink {
    pub fn new(tx: UnboundedSender<Event>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

#[derive(Default)]
pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_completed_serializes_lowercase_statuses() {
        let ev = Event::ItemCompleted {
            run_id: Uuid::nil(),
            item_id: "i1".into(),
            status: ExecutionStatus::Failed,
            validation_status: ValidationStatus::Fail,
        };
        let v = ev.to_json();
        assert_eq!(v["type"], "item.completed");
        assert_eq!(v["status"], "failed");
        assert_eq!(v["validation_status"], "fail");
    }

    #[tokio::test]
    async fn composite_fans_out_to_every_sink() {
        let (tx1, mut rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        let mut sink = CompositeEventSink::new();
        sink.add(Box::new(ChannelEventSink::new(tx1)));
        sink.add(Box::new(ChannelEventSink::new(tx2)));
        sink.emit(Event::ItemStarted {
            run_id: Uuid::nil(),
            item_id: "x".into(),
        })
        .await;
        assert_eq!(rx1.try_recv().map(|e| e.kind()), Ok("item.started"));
        assert_eq!(rx2.try_recv().map(|e| e.kind()), Ok("item.started"));
    }
}

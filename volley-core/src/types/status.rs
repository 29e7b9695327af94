use serde::{Deserialize, Serialize};

/// Scheduler-facing status of one unit of work (item, test case, request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Skipped => "skipped",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success
                | ExecutionStatus::Failed
                | ExecutionStatus::Skipped
                | ExecutionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Idle,
    Pending,
    Pass,
    Fail,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Idle => "idle",
            ValidationStatus::Pending => "pending",
            ValidationStatus::Pass => "pass",
            ValidationStatus::Fail => "fail",
        }
    }
}

/// What the batch scheduler needs to know about a domain result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusClassification {
    pub status: ExecutionStatus,
    pub validation_status: ValidationStatus,
}

impl StatusClassification {
    pub fn new(status: ExecutionStatus, validation_status: ValidationStatus) -> Self {
        Self {
            status,
            validation_status,
        }
    }

    pub fn of(status: ExecutionStatus) -> Self {
        Self::new(status, ValidationStatus::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Failed,
    Skipped,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Idle => "idle",
            NodeStatus::Running => "running",
            NodeStatus::Success => "success",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Success | NodeStatus::Failed | NodeStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowRunStatus {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl FlowRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowRunStatus::Running => "running",
            FlowRunStatus::Success => "success",
            FlowRunStatus::Failed => "failed",
            FlowRunStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteRunStatus {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl SuiteRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteRunStatus::Running => "running",
            SuiteRunStatus::Success => "success",
            SuiteRunStatus::Failed => "failed",
            SuiteRunStatus::Cancelled => "cancelled",
        }
    }
}

/// Suite-level counters. `completed == passed + failed + skipped` and `completed <= total` always hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteProgress {
    pub total: usize,
    pub completed: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SuiteProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Recompute counters from the terminal statuses seen so far.
    pub fn from_statuses<I>(total: usize, statuses: I) -> Self
    where
        I: IntoIterator<Item = ExecutionStatus>,
    {
        let mut progress = Self::new(total);
        for status in statuses {
            progress.record(status);
        }
        progress
    }

    /// Count one terminal status. Non-terminal statuses and overflow past `total` are ignored.
    pub fn record(&mut self, status: ExecutionStatus) {
        if self.completed >= self.total {
            return;
        }
        match status {
            ExecutionStatus::Success => self.passed += 1,
            ExecutionStatus::Failed => self.failed += 1,
            ExecutionStatus::Skipped | ExecutionStatus::Cancelled => self.skipped += 1,
            ExecutionStatus::Pending | ExecutionStatus::Running => return,
        }
        self.completed = self.passed + self.failed + self.skipped;
    }

    pub fn is_consistent(&self) -> bool {
        self.completed == self.passed + self.failed + self.skipped && self.completed <= self.total
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowProgress {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl FlowProgress {
    pub fn from_nodes<I>(total: usize, statuses: I) -> Self
    where
        I: IntoIterator<Item = NodeStatus>,
    {
        let mut p = Self {
            total,
            ..Default::default()
        };
        for s in statuses {
            match s {
                NodeStatus::Success => p.succeeded += 1,
                NodeStatus::Failed => p.failed += 1,
                NodeStatus::Skipped => p.skipped += 1,
                NodeStatus::Idle | NodeStatus::Running => {}
            }
        }
        p.completed = p.succeeded + p.failed + p.skipped;
        p
    }
}

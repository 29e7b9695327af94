use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;

use async_trait::async_trait;
use volley_core::types::NodeStatus;
use volley_exec::events::RunKind;
use volley_exec::{Event, EventSink};

/// Single-line progress on stderr.
///
/// Follows the first run it sees. Suites and collections report items; a flow run reports
/// nodes. Flows nested inside a suite only count as the suite item that owns them.
pub struct ProgressEventSink {
    kind: OnceLock<RunKind>,
    total: AtomicUsize,
    passed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    running: AtomicUsize,
    line_closed: AtomicBool,
}

impl ProgressEventSink {
    pub fn new() -> Self {
        Self {
            kind: OnceLock::new(),
            total: AtomicUsize::new(0),
            passed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            line_closed: AtomicBool::new(false),
        }
    }

    fn following(&self, kind: RunKind) -> bool {
        self.kind.get() == Some(&kind)
    }

    fn finish_one(&self) {
        self.running
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)))
            .ok();
    }

    fn update_progress(&self) {
        let passed = self.passed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let running = self.running.load(Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        let done = passed + failed + skipped;
        let percent = if total > 0 { (done * 100) / total } else { 0 };
        eprint!(
            "\rProgress: [{}/{}] {}% (✓{} ✗{} –{} →{})",
            done, total, percent, passed, failed, skipped, running
        );
        if done == total {
            self.close_line();
        }
    }

    /// Halted and cancelled runs never reach `total`; end the line when the run ends.
    fn close_line(&self) {
        if !self.line_closed.swap(true, Ordering::Relaxed) {
            eprintln!();
        }
    }
}

#[async_trait]
impl EventSink for ProgressEventSink {
    async fn emit(&self, event: Event) {
        match event {
            Event::RunStarted { kind, total, .. } => {
                if self.kind.set(kind).is_ok() {
                    self.total.store(total, Ordering::Relaxed);
                }
            }
            Event::ItemStarted { .. } if !self.following(RunKind::Flow) => {
                self.running.fetch_add(1, Ordering::Relaxed);
                self.update_progress();
            }
            Event::Progress { progress, .. } if !self.following(RunKind::Flow) => {
                self.passed.store(progress.passed, Ordering::Relaxed);
                self.failed.store(progress.failed, Ordering::Relaxed);
                self.skipped.store(progress.skipped, Ordering::Relaxed);
                self.finish_one();
                self.update_progress();
            }
            Event::NodeStarted { .. } if self.following(RunKind::Flow) => {
                self.running.fetch_add(1, Ordering::Relaxed);
                self.update_progress();
            }
            Event::NodeFinished { status, .. } if self.following(RunKind::Flow) => {
                let counter = match status {
                    NodeStatus::Success => &self.passed,
                    NodeStatus::Failed => &self.failed,
                    _ => &self.skipped,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                if status != NodeStatus::Skipped {
                    self.finish_one();
                }
                self.update_progress();
            }
            Event::FlowFinished { .. } if self.following(RunKind::Flow) => self.close_line(),
            Event::SuiteFinished { .. } if !self.following(RunKind::Flow) => self.close_line(),
            _ => {}
        }
    }
}

impl Default for ProgressEventSink {
    fn default() -> Self {
        Self::new()
    }
}

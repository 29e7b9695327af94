use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Cancellation controls for one run.
///
/// Cloning shares state. `cancel` is permanent for the run; `cancel_delay` only cuts the
/// current inter-batch pause short.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    run: CancellationToken,
    delay: Arc<Mutex<Option<CancellationToken>>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.run.cancel();
        self.cancel_delay();
    }

    pub fn cancel_delay(&self) {
        if let Some(token) = self.delay_slot().take() {
            token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.run.cancelled().await
    }

    /// Sleep for `delay` unless the run or the pause itself is cancelled first.
    pub(crate) async fn pause(&self, delay: Duration) {
        let token = CancellationToken::new();
        *self.delay_slot() = Some(token.clone());
        if !self.is_cancelled() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => {}
                _ = self.run.cancelled() => {}
            }
        }
        self.delay_slot().take();
    }

    fn delay_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.delay.lock().unwrap_or_else(|e| e.into_inner())
    }
}

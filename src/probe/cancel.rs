//! Cooperative cancellation of probe executions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const CANCELLED_MESSAGE: &str = "Probe execution cancelled";

/// Shared flag checked between lifecycle steps
///
/// Clones share the same flag, so a scheduler can hand one clone to each
/// execution and cancel them all at once.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    requested: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        // Release pairs with the Acquire load in is_cancelled
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Cancel when Ctrl-C arrives
    pub fn cancel_on_ctrl_c(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received; cancelling running probes");
                signal.cancel();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let signal = CancelSignal::new();
        let other = signal.clone();
        assert!(!other.is_cancelled());
        signal.cancel();
        assert!(other.is_cancelled());
    }
}

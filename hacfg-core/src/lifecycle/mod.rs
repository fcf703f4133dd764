//! Process-wide shutdown coordination.
//!
//! Every provisioned workspace owes the process one cleanup. The
//! [`ShutdownCoordinator`] counts those obligations and broadcasts a single
//! stop condition to the tasks that hold them:
//!
//! ```text
//! register() ──► obligation held ──► stop token cancelled ──► cleanup ──► released
//!                                                  ▲
//!                                   begin_shutdown()
//! ```
//!
//! The coordinator is an explicit context object rather than a global so
//! tests and embedders can run independent instances side by side.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tracing::{info, warn};

// ============================================================================
// Coordinator
// ============================================================================

/// Counts outstanding cleanup obligations and broadcasts the stop condition.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    /// Broadcast "stop requested" condition.
    stop: CancellationToken,
    /// Counts obligations; closed once shutdown begins so `wait` can finish.
    obligations: TaskTracker,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with no outstanding obligations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one cleanup obligation.
    ///
    /// The obligation is released when the returned value is dropped, so it
    /// is counted exactly once whichever path gives it up.
    #[must_use]
    pub fn register(&self) -> CleanupObligation {
        CleanupObligation {
            _token: self.obligations.token(),
        }
    }

    /// Spawn `task` on the current runtime while holding `obligation`.
    ///
    /// The obligation is released once `task` completes (or panics).
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like [`tokio::spawn`].
    pub fn spawn_with<F>(&self, obligation: CleanupObligation, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let _obligation = obligation;
            task.await;
        });
    }

    /// A handle on the broadcast stop condition.
    #[must_use]
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Whether [`begin_shutdown`](Self::begin_shutdown) has been called.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Number of obligations not yet released.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.obligations.len()
    }

    /// Signal stop to every registered task.
    ///
    /// Idempotent.
    pub fn begin_shutdown(&self) {
        if self.stop.is_cancelled() {
            return;
        }
        self.stop.cancel();
        self.obligations.close();
        info!(
            outstanding = self.obligations.len(),
            "Shutdown initiated, waiting for workspace cleanup"
        );
    }

    /// Wait until every obligation has been released.
    ///
    /// Only returns after [`begin_shutdown`](Self::begin_shutdown).
    pub async fn wait(&self) {
        self.obligations.wait().await;
    }

    /// Wait for every obligation, giving up after `timeout`.
    pub async fn wait_timeout(&self, timeout: Duration) -> DrainResult {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(()) => DrainResult::Complete,
            Err(_) => {
                let remaining = self.outstanding();
                warn!(
                    remaining,
                    timeout_ms = timeout.as_millis(),
                    "Cleanup did not finish before the shutdown timeout"
                );
                DrainResult::Timeout { remaining }
            }
        }
    }
}

// ============================================================================
// Obligation
// ============================================================================

/// One outstanding cleanup, released on drop.
pub struct CleanupObligation {
    _token: TaskTrackerToken,
}

impl std::fmt::Debug for CleanupObligation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupObligation").finish_non_exhaustive()
    }
}

// ============================================================================
// Drain Result
// ============================================================================

/// Outcome of waiting for cleanup obligations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainResult {
    /// Every obligation was released.
    Complete,
    /// Timeout reached with obligations still held.
    Timeout {
        /// Number of obligations still held
        remaining: usize,
    },
}

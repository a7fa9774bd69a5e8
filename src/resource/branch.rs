//! Per-branch cancellation state machine.
//!
//! Every resource scope, and each side of a parallel zip, runs on a
//! [`Branch`]. A branch tracks which phase it is in:
//!
//! | State | Interruptible |
//! |-------|---------------|
//! | `Acquiring` | no (inside an acquire step) |
//! | `Running` | yes (between steps, `eval` steps, the body) |
//! | `Releasing` | no |
//! | `Done` | no |
//!
//! A cancel request is always recorded, but the interrupt signal only fires
//! while the branch is `Running`. Leaving an uninterruptible section with a
//! request pending fires it at that point.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Phase of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BranchState {
    Acquiring,
    Running,
    Releasing,
    Done,
}

#[derive(Debug)]
struct Gate {
    state: BranchState,
    cancel_requested: bool,
}

#[derive(Debug)]
struct Inner {
    gate: Mutex<Gate>,
    interrupt: watch::Sender<bool>,
}

/// Handle to a branch's state machine. Clones share the same branch.
#[derive(Debug, Clone)]
pub(crate) struct Branch {
    inner: Arc<Inner>,
}

impl Branch {
    pub(crate) fn new() -> Self {
        let (interrupt, _) = watch::channel(false);
        Branch {
            inner: Arc::new(Inner {
                gate: Mutex::new(Gate {
                    state: BranchState::Running,
                    cancel_requested: false,
                }),
                interrupt,
            }),
        }
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!("interrupt forwarded to branch");
        self.inner.interrupt.send_replace(true);
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> BranchState {
        self.gate().state
    }

    /// Move to `state`, firing a pending interrupt if it becomes deliverable.
    /// Returns the previous state.
    pub(crate) fn enter(&self, state: BranchState) -> BranchState {
        let mut gate = self.gate();
        let previous = std::mem::replace(&mut gate.state, state);
        if state == BranchState::Running && gate.cancel_requested && !self.is_interrupted() {
            self.fire();
        }
        previous
    }

    /// Record a cancel request; deliver it now if the branch is interruptible.
    pub(crate) fn request_cancel(&self) {
        let mut gate = self.gate();
        if gate.cancel_requested {
            return;
        }
        gate.cancel_requested = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(state = ?gate.state, "cancel requested");

        if gate.state == BranchState::Running {
            self.fire();
        }
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.gate().cancel_requested
    }

    /// Whether the interrupt signal has been delivered.
    pub(crate) fn is_interrupted(&self) -> bool {
        *self.inner.interrupt.borrow()
    }

    /// Resolves once the interrupt signal has been delivered.
    pub(crate) async fn interrupted(&self) {
        let mut rx = self.inner.interrupt.subscribe();
        // The sender lives as long as `self`, so this only returns once fired.
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Run `fut` as an uninterruptible section. Cancel requests that arrive
    /// meanwhile stay pending until it completes.
    pub(crate) async fn critical<F: Future>(&self, fut: F) -> F::Output {
        let previous = self.enter(BranchState::Acquiring);
        let output = fut.await;
        self.enter(previous);
        output
    }

    /// Run `fut` unless the branch is interrupted first. Returns `None` if
    /// the interrupt won; `fut` is dropped in that case.
    pub(crate) async fn interruptible<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.interrupted() => None,
            output = fut => Some(output),
        }
    }
}

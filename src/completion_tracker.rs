//! Fan-out/fan-in bookkeeping for asynchronous playlist work.
//!
//! A [`CompletionTracker`] counts calls as they are dispatched and as they
//! complete, and runs a single finalizer once both counts meet. Work can be
//! discovered while earlier calls are already completing, so the code that
//! discovers work registers itself as a call too and only finishes once it
//! has dispatched everything.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;

pub type Finalizer = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("{label}: released before convergence ({finished} of {started} calls finished)")]
    NotConverged {
        label: String,
        started: usize,
        finished: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub started: usize,
    pub finished: usize,
}

enum TrackerState {
    Open {
        started: usize,
        finished: usize,
        finalizer: Option<Finalizer>,
    },
    /// The finalizer has been claimed and is running.
    Finalizing { calls: usize },
    Done { calls: usize },
}

/// Registration on a notification source, cancelled when dropped.
#[derive(Debug)]
pub struct Subscription {
    handle: AbortHandle,
}

impl Subscription {
    pub fn new(handle: AbortHandle) -> Self {
        Self { handle }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct CompletionTracker {
    label: String,
    state: Mutex<TrackerState>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        f.debug_struct("CompletionTracker")
            .field("label", &self.label)
            .field("started", &counts.started)
            .field("finished", &counts.finished)
            .field("done", &self.is_done())
            .finish()
    }
}

impl CompletionTracker {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            state: Mutex::new(TrackerState::Open {
                started: 0,
                finished: 0,
                finalizer: None,
            }),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Register one more outstanding call. Returns `self` so the call can be
    /// started inline where the tracker is handed to an async API.
    pub fn start_call(&self) -> &Self {
        let mut state = self.lock_state();
        match &mut *state {
            TrackerState::Open { started, .. } => {
                *started += 1;
                tracing::debug!("{}: started call {}", self.label, started);
            }
            TrackerState::Finalizing { .. } | TrackerState::Done { .. } => {
                tracing::warn!(
                    "{}: call started after the finalizer ran, it will not be waited for",
                    self.label
                );
            }
        }
        self
    }

    /// Start a call and return a guard that finishes it when consumed or dropped.
    pub fn track(self: &Arc<Self>) -> TrackedCall {
        self.start_call();
        TrackedCall {
            tracker: Some(Arc::clone(self)),
        }
    }

    /// Record one completed call, running the finalizer if this was the last one.
    pub fn finish_call(&self) {
        let mut state = self.lock_state();
        let TrackerState::Open {
            started,
            finished,
            finalizer,
        } = &mut *state
        else {
            tracing::warn!("{}: call finished after the finalizer ran", self.label);
            return;
        };

        if *finished >= *started {
            tracing::warn!(
                "{}: finish without a matching start ({} of {} calls finished)",
                self.label,
                finished,
                started
            );
            return;
        }

        *finished += 1;
        let calls = *started;
        tracing::info!("{}: {} of {} calls finished.", self.label, finished, calls);
        if *finished != calls {
            return;
        }

        let Some(finalizer) = finalizer.take() else {
            tracing::debug!("{}: converged, no finalizer attached yet", self.label);
            return;
        };
        *state = TrackerState::Finalizing { calls };
        drop(state);

        self.run_finalizer(finalizer, calls);
    }

    /// Attach the action to run once all calls have finished. Runs it right
    /// away when the tracker has already converged.
    pub fn attach_finalizer(&self, finalizer: impl FnOnce() + Send + 'static) {
        let mut state = self.lock_state();
        let TrackerState::Open {
            started,
            finished,
            finalizer: slot,
        } = &mut *state
        else {
            tracing::warn!("{}: finalizer already ran, ignoring new one", self.label);
            return;
        };

        if *started == *finished {
            let calls = *started;
            tracing::info!("{}: Already finished all {} calls.", self.label, calls);
            *state = TrackerState::Finalizing { calls };
            drop(state);
            self.run_finalizer(Box::new(finalizer), calls);
        } else {
            if slot.is_some() {
                tracing::warn!("{}: replacing previously attached finalizer", self.label);
            }
            *slot = Some(Box::new(finalizer));
        }
    }

    /// Keep `subscription` alive until the tracker is released.
    pub fn bind(&self, subscription: Subscription) {
        self.lock_subscriptions().push(subscription);
    }

    /// Drop every subscription the tracker holds.
    pub fn release(&self) -> Result<(), TrackerError> {
        let counts = self.counts();
        if counts.started != counts.finished {
            return Err(TrackerError::NotConverged {
                label: self.label.clone(),
                started: counts.started,
                finished: counts.finished,
            });
        }

        let subscriptions = std::mem::take(&mut *self.lock_subscriptions());
        tracing::debug!(
            "{}: released {} subscription(s)",
            self.label,
            subscriptions.len()
        );
        Ok(())
    }

    pub fn counts(&self) -> CallCounts {
        match &*self.lock_state() {
            TrackerState::Open {
                started, finished, ..
            } => CallCounts {
                started: *started,
                finished: *finished,
            },
            TrackerState::Finalizing { calls } | TrackerState::Done { calls } => CallCounts {
                started: *calls,
                finished: *calls,
            },
        }
    }

    /// True once the finalizer has been claimed.
    pub fn is_done(&self) -> bool {
        !matches!(&*self.lock_state(), TrackerState::Open { .. })
    }

    fn run_finalizer(&self, finalizer: Finalizer, calls: usize) {
        tracing::debug!("{}: running finalizer after {} calls", self.label, calls);
        finalizer();
        *self.lock_state() = TrackerState::Done { calls };
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One started call on a [`CompletionTracker`].
///
/// Finishing is tied to ownership: the call finishes exactly once, either via
/// [`TrackedCall::finish`] or when the guard is dropped on an error path.
#[derive(Debug)]
pub struct TrackedCall {
    tracker: Option<Arc<CompletionTracker>>,
}

impl TrackedCall {
    pub fn finish(mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.finish_call();
        }
    }
}

impl Drop for TrackedCall {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.finish_call();
        }
    }
}

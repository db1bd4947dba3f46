//! Caller-supplied deadlines for blocking I/O.
//!
//! The work runs on a dedicated thread while the caller waits on a channel
//! with `recv_timeout`. Work with a visible side effect (renaming a finished
//! file into place) performs it through [`CommitGate::commit`], so a caller
//! that has already given up never observes a late artifact.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use tracing::warn;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Open,
    Committed,
    Cancelled,
}

/// Arbitrates between a worker committing its result and the caller
/// abandoning it on timeout. Exactly one of the two wins.
#[derive(Debug, Clone)]
pub struct CommitGate {
    state: Arc<Mutex<GateState>>,
}

impl CommitGate {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::Open)),
        }
    }

    /// Run `f` unless the caller has already timed out.
    pub fn commit<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state == GateState::Cancelled {
            return None;
        }
        let out = f();
        *state = GateState::Committed;
        Some(out)
    }

    /// Returns false if the worker committed first.
    fn cancel(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state == GateState::Committed {
            return false;
        }
        *state = GateState::Cancelled;
        true
    }
}

/// Run `work` with an optional deadline.
///
/// Without a deadline the work runs inline. With one, it runs on a worker
/// thread; on expiry the caller gets [`Error::IoTimeout`] and any later
/// commit attempt by the worker is refused. Nothing is retried.
pub fn with_timeout<T, E, F>(
    operation: &'static str,
    timeout: Option<Duration>,
    work: F,
) -> std::result::Result<T, E>
where
    T: Send + 'static,
    E: From<Error> + Send + 'static,
    F: FnOnce(&CommitGate) -> std::result::Result<T, E> + Send + 'static,
{
    let gate = CommitGate::new();
    let Some(timeout) = timeout else {
        return work(&gate);
    };

    let (tx, rx) = crossbeam_channel::bounded(1);
    let worker_gate = gate.clone();
    std::thread::Builder::new()
        .name(format!("vegscan-{}", operation))
        .spawn(move || {
            let _ = tx.send(work(&worker_gate));
        })
        .map_err(|e| E::from(Error::Io(e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            if gate.cancel() {
                warn!(operation, ?timeout, "operation timed out");
                return Err(E::from(Error::IoTimeout { operation, timeout }));
            }
            // Worker committed right at the deadline; its result is in flight.
            rx.recv().unwrap_or_else(|_| {
                Err(E::from(Error::Other(format!("{} worker terminated", operation))))
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(E::from(Error::Other(format!(
            "{} worker terminated unexpectedly",
            operation
        )))),
    }
}

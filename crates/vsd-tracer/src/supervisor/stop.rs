use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::debugger::RootStopper;

/// Handle requesting the supervised run to stop, from any thread.
///
/// Stopping first asks the windows of the root process to close, and
/// waits for the process to exit. The process is forcibly terminated if
/// no window accepted the request, or if it did not exit in time.
///
/// When the backend cannot provide a stopper, requests are left for the
/// supervisor to pick up, which then terminates the root process itself.
#[derive(Clone)]
pub struct StopHandle {
    state: Arc<Mutex<StopState>>,
    timeout: Duration,
}

enum StopState {
    /// No root process yet.
    Idle { requested: bool },

    /// The root process is running.
    Armed(Arc<dyn RootStopper>),

    /// The root process is running, requests are polled by the supervisor.
    Polled { requested: bool },

    /// The run has completed.
    Finished,
}

impl StopHandle {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(StopState::Idle { requested: false })),
            timeout,
        }
    }

    /// Stops the root process.
    ///
    /// This function blocks until the root process has exited or has been
    /// terminated. If the root process is not launched yet, it is terminated
    /// right after its launch. Once the run has completed, this is a no-op.
    pub fn stop(&self) {
        let stopper = {
            let mut state = self.state.lock();

            match &mut *state {
                StopState::Idle { requested } => {
                    tracing::debug!("stop requested before launch");
                    *requested = true;
                    return;
                }
                StopState::Polled { requested } => {
                    tracing::debug!("stop requested, left to the supervisor");
                    *requested = true;
                    return;
                }
                StopState::Armed(stopper) => stopper.clone(),
                StopState::Finished => return,
            }
        };

        shutdown(stopper.as_ref(), self.timeout);
    }

    /// Attaches the root process.
    ///
    /// Returns whether a stop was requested before.
    pub(crate) fn arm(&self, stopper: impl RootStopper) -> bool {
        let mut state = self.state.lock();

        let requested = matches!(*state, StopState::Idle { requested: true });
        *state = StopState::Armed(Arc::new(stopper));

        requested
    }

    /// Leaves stop requests to the supervisor, keeping an earlier one.
    pub(crate) fn arm_polled(&self) {
        let mut state = self.state.lock();

        let requested = matches!(*state, StopState::Idle { requested: true });
        *state = StopState::Polled { requested };
    }

    /// Returns whether a stop was requested since the last call, when
    /// requests are polled.
    pub(crate) fn take_request(&self) -> bool {
        match &mut *self.state.lock() {
            StopState::Polled { requested } => std::mem::take(requested),
            _ => false,
        }
    }

    /// Detaches the root process, turning later stops into no-ops.
    pub(crate) fn disarm(&self) {
        *self.state.lock() = StopState::Finished;
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.lock() {
            StopState::Idle { .. } => "idle",
            StopState::Armed(_) => "armed",
            StopState::Polled { .. } => "polled",
            StopState::Finished => "finished",
        };

        f.debug_struct("StopHandle")
            .field("state", &state)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn shutdown(stopper: &dyn RootStopper, timeout: Duration) {
    if stopper.close_windows() {
        tracing::info!(?timeout, "close requested, waiting for root process");

        if stopper.wait_for_exit(timeout) {
            return;
        }

        tracing::warn!("root process did not exit in time");
    } else {
        tracing::info!("root process owns no window");
    }

    if let Err(e) = stopper.terminate() {
        tracing::warn!(error = %e, "terminate root process");
    }
}

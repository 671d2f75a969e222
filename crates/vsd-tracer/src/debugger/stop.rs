use std::time::Duration;

/// Trait implemented by a handle able to stop the root process.
///
/// Unlike the rest of the session, the stopper is used from other threads
/// (e.g., a signal handler), while the supervisor waits for debug events.
pub trait RootStopper: Send + Sync + 'static {
    /// Asks the windows owned by the root process to close.
    ///
    /// Returns whether at least one window accepted the request.
    fn close_windows(&self) -> bool;

    /// Waits up to `timeout` for the root process to exit.
    ///
    /// Returns whether the process has exited.
    fn wait_for_exit(&self, timeout: Duration) -> bool;

    /// Forcibly terminates the root process.
    fn terminate(&self) -> std::io::Result<()>;
}

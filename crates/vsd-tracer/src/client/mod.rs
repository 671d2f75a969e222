use std::future::{self, Future};
use std::path::Path;

use crate::debugger::DebugSession;
use crate::supervisor::ChildProcess;

/// Traced process, as seen by a [Client] of the given session type.
pub type Child<S> = ChildProcess<<S as DebugSession>::Process>;

/// Trait for implementing the consumer of supervision events.
///
/// Every text handed to the client is owned by the supervisor for the
/// duration of the call only.
pub trait Client {
    /// Debugger session of this client.
    type Session: DebugSession;

    /// Error returned by this client.
    type Error: std::error::Error;

    /// Function called with output captured from the standard output.
    ///
    /// When channels are merged, the standard error is captured here too.
    fn write_stdout(&mut self, _text: &str) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called with output captured from the standard error, and
    /// with messages about fatal run failures (e.g., program not found).
    fn write_stderr(&mut self, _text: &str) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called when a traced process writes a debug string.
    fn write_debug(
        &mut self,
        _child: &Child<Self::Session>,
        _text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called when a module is loaded or unloaded by a traced
    /// process.
    ///
    /// Only called when module tracing is enabled, see
    /// [Builder::trace_modules](crate::supervisor::Builder::trace_modules).
    fn write_dll_load(
        &mut self,
        _child: &Child<Self::Session>,
        _path: &Path,
        _loading: bool,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called when a traced process has started.
    fn process_started(
        &mut self,
        _child: &Child<Self::Session>,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called when a traced process has stopped.
    ///
    /// If the process died, the cause is available through
    /// [ChildProcess::error].
    fn process_stopped(
        &mut self,
        _child: &Child<Self::Session>,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }
}

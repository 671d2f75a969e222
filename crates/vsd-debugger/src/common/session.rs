use std::time::Duration;

use vsd_tracer::debugger::{ContinueStatus, DebugEvent, DebugSession};

use crate::sys;

/// Debugging session created by [Debugger](crate::Debugger).
///
/// Debug events can only be received by the thread that launched the
/// process, so the session must stay on that thread.
pub struct Session {
    inner: sys::Session,
}

impl Session {
    pub(super) fn new(inner: sys::Session) -> Self {
        Self { inner }
    }
}

impl DebugSession for Session {
    type Process = sys::Process;
    type ImageFile = sys::ImageFile;
    type Stopper = sys::Stopper;
    type Error = crate::Error;

    fn root_process_id(&self) -> u32 {
        self.inner.root_process_id()
    }

    async fn wait_event(&mut self, timeout: Duration) -> crate::Result<Option<DebugEvent<Self>>> {
        Ok(self.inner.next_event(timeout)?)
    }

    fn continue_event(
        &mut self,
        process_id: u32,
        thread_id: u32,
        status: ContinueStatus,
    ) -> crate::Result<()> {
        tracing::trace!(process_id, thread_id, ?status, "continue");
        Ok(self.inner.resume(process_id, thread_id, status)?)
    }

    fn stopper(&self) -> crate::Result<Self::Stopper> {
        Ok(self.inner.root_stopper()?)
    }
}

use std::os::windows::io::OwnedHandle;
use std::time::Duration;

use vsd_tracer::debugger::{ContinueStatus, DebugEvent};
use windows::Win32::Foundation::{ERROR_SEM_TIMEOUT, NTSTATUS};
use windows::Win32::System::Diagnostics::Debug::{
    ContinueDebugEvent, DEBUG_EVENT, WaitForDebugEvent,
};

use super::error::{OsContext, Result};
use super::event;
use super::handle::raw;
use super::process::Stopper;

const DBG_CONTINUE: NTSTATUS = NTSTATUS(0x0001_0002);
const DBG_EXCEPTION_NOT_HANDLED: NTSTATUS = NTSTATUS(0x8001_0001_u32 as i32);

/// Debug event channel of the thread that launched the root process.
pub struct Session {
    root_pid: u32,
    root_process: OwnedHandle,
    _root_thread: OwnedHandle,
}

impl Session {
    pub(super) fn new(root_pid: u32, root_process: OwnedHandle, root_thread: OwnedHandle) -> Self {
        Self {
            root_pid,
            root_process,
            _root_thread: root_thread,
        }
    }

    pub fn root_process_id(&self) -> u32 {
        self.root_pid
    }

    /// Waits up to `timeout` for the next debug event.
    pub fn next_event(&mut self, timeout: Duration) -> Result<Option<DebugEvent<crate::Session>>> {
        // `INFINITE` is excluded
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX - 1);
        let mut raw_event = DEBUG_EVENT::default();

        // SAFETY: `raw_event` outlives the call.
        match unsafe { WaitForDebugEvent(&mut raw_event, millis) } {
            Ok(()) => Ok(Some(event::convert(&raw_event))),
            Err(e) if e.code() == ERROR_SEM_TIMEOUT.to_hresult() => Ok(None),
            Err(e) => Err(e).os_context("WaitForDebugEvent"),
        }
    }

    /// Resumes the thread that reported the last debug event.
    pub fn resume(&mut self, pid: u32, tid: u32, status: ContinueStatus) -> Result<()> {
        let status = match status {
            ContinueStatus::Continue => DBG_CONTINUE,
            ContinueStatus::ExceptionNotHandled => DBG_EXCEPTION_NOT_HANDLED,
        };

        // SAFETY: no pointer is involved.
        unsafe { ContinueDebugEvent(pid, tid, status) }.os_context("ContinueDebugEvent")
    }

    pub fn root_stopper(&self) -> Result<Stopper> {
        Stopper::new(self.root_pid, raw(&self.root_process))
    }
}

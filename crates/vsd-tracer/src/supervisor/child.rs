use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use super::exception::is_initial_breakpoint;
use super::module::{Module, ModuleTable};
use crate::debugger::{ModuleInfo, ProcessHandle};

/// Exit code given to processes terminated by the supervisor.
pub const TERMINATED_EXIT_CODE: u32 = u32::MAX;

/// Exit code of a process which is still running.
pub const STILL_ACTIVE: u32 = 259;

/// Exit status of a traced process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// The process is still running.
    StillActive,

    /// The process has exited with the given code.
    Exited(u32),

    /// The process has died, for the given reason.
    Died {
        /// Exit code of the process.
        code: u32,

        /// What killed the process.
        reason: String,
    },
}

impl ExitStatus {
    /// Returns the exit code, if the process has terminated.
    pub const fn code(&self) -> Option<u32> {
        match self {
            Self::StillActive => None,
            Self::Exited(code) | Self::Died { code, .. } => Some(*code),
        }
    }
}

/// Traced process (root or descendant).
pub struct ChildProcess<P: ProcessHandle> {
    /// Owned handle over the process.
    handle: P,

    /// ID of the process.
    id: u32,

    /// Path of the process' executable.
    path: PathBuf,

    /// File name of the process' executable.
    name: String,

    /// Wall-clock time at which the process was registered.
    started_at: SystemTime,

    /// Monotonic time at which the process was registered.
    started: Instant,

    /// Run time of the process, set once terminated.
    duration: Option<Duration>,

    /// Exit status of the process.
    status: ExitStatus,

    /// Cause of death recorded before the exit code is known.
    pending_error: Option<String>,

    /// Modules loaded by the process.
    modules: ModuleTable,

    /// Initial breakpoints already acknowledged (one bit per kind).
    initial_breakpoints: u8,
}

impl<P: ProcessHandle> ChildProcess<P> {
    /// Creates a new traced process, with its executable path already
    /// resolved.
    pub fn new(id: u32, handle: P, path: PathBuf) -> Self {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        Self {
            handle,
            id,
            path,
            name,
            started_at: SystemTime::now(),
            started: Instant::now(),
            duration: None,
            status: ExitStatus::StillActive,
            pending_error: None,
            modules: ModuleTable::new(id),
            initial_breakpoints: 0,
        }
    }

    /// Returns the process ID.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns the path of the process' executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name of the process' executable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the time at which the process started.
    pub const fn start_time(&self) -> SystemTime {
        self.started_at
    }

    /// Returns the run time of the process.
    ///
    /// Once the process has terminated, this is its total run time.
    pub fn elapsed(&self) -> Duration {
        self.duration.unwrap_or_else(|| self.started.elapsed())
    }

    /// Returns the total run time of the process, if it has terminated.
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Returns the exit status of the process.
    pub const fn status(&self) -> &ExitStatus {
        &self.status
    }

    /// Returns the exit code of the process, if it has terminated.
    pub const fn exit_code(&self) -> Option<u32> {
        self.status.code()
    }

    /// Returns whether the process is still running.
    pub const fn is_active(&self) -> bool {
        matches!(self.status, ExitStatus::StillActive)
    }

    /// Returns the diagnostic text explaining why the process died, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ExitStatus::Died { reason, .. } => Some(reason),
            _ => self.pending_error.as_deref(),
        }
    }

    /// Returns the owned handle over the process.
    pub const fn handle(&self) -> &P {
        &self.handle
    }

    /// Returns the modules loaded by the process.
    pub const fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    /// Returns the modules loaded by the process.
    pub const fn modules_mut(&mut self) -> &mut ModuleTable {
        &mut self.modules
    }

    /// Returns the memory information of the module loaded at `base_addr`.
    ///
    /// The information is queried once, and cached. A failed query is
    /// cached as well, as its error message.
    pub fn module_info(&mut self, base_addr: u64) -> Option<Result<ModuleInfo, &str>> {
        let module = self.modules.get_mut(base_addr)?;
        Some(module.info_or_query(&self.handle))
    }

    /// Returns the module whose mapped image contains `addr`.
    ///
    /// Modules loaded below `addr` get their memory information queried
    /// (and cached) if needed. Modules whose query failed are skipped.
    pub fn module_containing(&mut self, addr: u64) -> Option<&Module> {
        let handle = &self.handle;

        let base_addr = self
            .modules
            .iter_mut()
            .filter(|module| module.base_addr() <= addr)
            .find_map(|module| {
                let info = module.info_or_query(handle).ok()?;
                let base_addr = module.base_addr();

                (addr - base_addr < info.image_size).then_some(base_addr)
            })?;

        self.modules.get(base_addr)
    }

    /// Records that the process has exited with the given code.
    ///
    /// Only the first terminal transition is recorded, later calls leave
    /// the exit code and the run time untouched. Returns whether the
    /// transition took place.
    pub fn process_stopped(&mut self, exit_code: u32) -> bool {
        if !self.is_active() {
            return false;
        }

        self.duration = Some(self.started.elapsed());

        self.status = match self.pending_error.take() {
            Some(reason) => ExitStatus::Died {
                code: exit_code,
                reason,
            },
            None => ExitStatus::Exited(exit_code),
        };

        true
    }

    /// Records that the process has died, for the given reason.
    ///
    /// Without an exit code, only the cause is recorded and the process
    /// stays active until [process_stopped](Self::process_stopped) supplies
    /// the code. The first recorded cause wins.
    pub fn process_died(&mut self, exit_code: Option<u32>, reason: impl Into<String>) -> bool {
        if !self.is_active() {
            return false;
        }

        if self.pending_error.is_none() {
            self.pending_error = Some(reason.into());
        }

        match exit_code {
            Some(code) => self.process_stopped(code),
            None => false,
        }
    }

    /// Forcibly terminates the process, if it is still running.
    ///
    /// The process stays registered until its exit is reported.
    pub fn stop(&self) {
        if !self.is_active() {
            return;
        }

        tracing::info!(pid = self.id, path = %self.path.display(), "terminating process");

        if let Err(e) = self.handle.terminate(TERMINATED_EXIT_CODE) {
            tracing::warn!(pid = self.id, error = %e, "terminate process");
        }
    }

    /// Returns whether the exception with the given code is the initial
    /// breakpoint of the process, marking it as seen.
    pub(crate) fn take_initial_breakpoint(&mut self, code: u32) -> bool {
        let Some(bit) = is_initial_breakpoint(code) else {
            return false;
        };

        let seen = self.initial_breakpoints & bit != 0;
        self.initial_breakpoints |= bit;

        !seen
    }
}

impl<P: ProcessHandle> Drop for ChildProcess<P> {
    fn drop(&mut self) {
        if self.is_active() {
            self.stop();
        }
    }
}

impl<P: ProcessHandle> std::fmt::Debug for ChildProcess<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("status", &self.status)
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}

mod pipe;
mod process;
mod stop;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

pub use self::pipe::PipeReader;
pub use self::process::{ImageFile, ModuleInfo, ProcessHandle};
pub use self::stop::RootStopper;
use crate::Command;

/// Trait implementing the launching logic of a debugger.
pub trait Debugger {
    /// Debugging session returned by this debugger.
    type Session: DebugSession<Error: Into<Self::Error>>;

    /// Read end of an output pipe.
    type PipeReader: PipeReader<Error: Into<Self::Error>>;

    /// Write end of an output pipe, handed to the debuggee.
    type PipeWriter;

    /// Error returned by this trait.
    type Error: std::error::Error;

    /// Returns the multi-byte encoding assumed for narrow text produced by
    /// debuggees (e.g., the ANSI codepage on Windows).
    fn narrow_encoding(&self) -> &'static encoding_rs::Encoding {
        encoding_rs::UTF_8
    }

    /// Creates an output pipe.
    ///
    /// Only the write end is inheritable by the debuggee.
    fn create_pipe(&mut self) -> Result<(Self::PipeReader, Self::PipeWriter), Self::Error>;

    /// Launches `program` under debug supervision.
    ///
    /// `program` is the already resolved path of [Command::program].
    fn launch(
        &mut self,
        program: &Path,
        command: &Command,
        stdio: LaunchStdio<'_, Self::PipeWriter>,
        scope: DebugScope,
    ) -> impl Future<Output = Result<Self::Session, Self::Error>>;
}

/// Trait implementing the event channel of a debugging session.
pub trait DebugSession {
    /// Owned handle over a traced process.
    type Process: ProcessHandle<Error: Into<Self::Error>>;

    /// Transient handle over an image file (executable or module).
    type ImageFile: ImageFile<Error: Into<Self::Error>>;

    /// Handle able to stop the root process from another thread.
    type Stopper: RootStopper;

    /// Error returned by this trait.
    type Error: std::error::Error;

    /// Returns the ID of the root process.
    fn root_process_id(&self) -> u32;

    /// Waits up to `timeout` for the next debug event.
    ///
    /// `None` is returned when no event arrived in time.
    fn wait_event(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<DebugEvent<Self>>, Self::Error>>;

    /// Acknowledges the last debug event of the given process and thread,
    /// resuming it.
    fn continue_event(
        &mut self,
        process_id: u32,
        thread_id: u32,
        status: ContinueStatus,
    ) -> Result<(), Self::Error>;

    /// Creates a handle able to stop the root process.
    fn stopper(&self) -> Result<Self::Stopper, Self::Error>;
}

/// Which processes are debugged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DebugScope {
    /// Only the root process is debugged, its sub-processes run untraced.
    #[default]
    RootOnly,

    /// The root process and every process it (transitively) spawns are
    /// debugged.
    Tree,
}

/// Write ends of the output pipes handed to the debuggee.
pub struct LaunchStdio<'a, W> {
    /// Write end attached to the standard output.
    pub stdout: &'a W,

    /// Write end attached to the standard error.
    ///
    /// Same pipe as `stdout` when channels are merged.
    pub stderr: &'a W,
}

/// How a debug event is acknowledged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContinueStatus {
    /// The debuggee resumes normally.
    Continue,

    /// The exception is passed back to the debuggee's own handlers.
    ExceptionNotHandled,
}

/// Event describing something that happened in a debugged process.
pub struct DebugEvent<S: DebugSession + ?Sized> {
    /// ID of the process the event originates from.
    pub process_id: u32,

    /// ID of the thread the event originates from.
    pub thread_id: u32,

    /// What happened.
    pub kind: DebugEventKind<S>,
}

/// Kind of a debug event.
pub enum DebugEventKind<S: DebugSession + ?Sized> {
    /// A process was created.
    ProcessCreated {
        /// Owned handle over the new process.
        process: S::Process,

        /// Handle over the executable image, if the OS provided one.
        image: Option<S::ImageFile>,
    },

    /// A process has exited.
    ProcessExited {
        /// Exit code of the process.
        exit_code: u32,
    },

    /// A thread was created or has exited.
    ThreadChanged,

    /// A module was loaded.
    ModuleLoaded {
        /// Base address of the module.
        base_addr: u64,

        /// Handle over the module image, if the OS provided one.
        image: Option<S::ImageFile>,
    },

    /// A module was unloaded.
    ModuleUnloaded {
        /// Base address of the module.
        base_addr: u64,
    },

    /// The process wrote a debug string.
    DebugString(DebugStringRef),

    /// An exception occurred.
    Exception {
        /// Exception code.
        code: u32,

        /// Address where the exception occurred.
        addr: u64,

        /// Whether the process may still handle the exception itself.
        first_chance: bool,
    },

    /// The debugging subsystem reported an error about the process.
    Rip {
        /// OS error code.
        error: u32,

        /// Formatted OS error.
        message: String,

        /// Exit code of the process, if it has already exited.
        exit_code: Option<u32>,
    },
}

/// Location of a debug string in the memory of the process writing it.
#[derive(Clone, Copy, Debug)]
pub struct DebugStringRef {
    /// Address of the string.
    pub addr: u64,

    /// Length of the string, terminator included, as reported by the OS.
    pub len: u32,

    /// Whether the string is made of wide characters.
    pub is_wide: bool,
}

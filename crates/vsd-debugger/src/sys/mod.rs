use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use self::win32::*;

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use self::unsupported::*;

/// Parameters of a process launch.
pub struct LaunchOptions<'a> {
    /// Resolved path of the executable.
    pub program: &'a Path,

    /// Full command line, program included.
    pub command_line: String,

    /// Environment of the process, inherited if `None`.
    pub env: Option<BTreeMap<OsString, OsString>>,

    /// Working directory of the process, inherited if `None`.
    pub current_dir: Option<&'a Path>,

    /// Write end attached to the standard output.
    pub stdout: &'a PipeWriter,

    /// Write end attached to the standard error.
    pub stderr: &'a PipeWriter,

    /// Whether the processes spawned by the root are debugged too.
    pub debug_tree: bool,
}

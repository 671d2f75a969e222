use std::path::PathBuf;

/// Exit code returned when the run failed before any process existed.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

/// Debugger error.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct DebuggerError<E>(pub E);

/// Client error.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct ClientError<E>(pub E);

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error<E1, E2> {
    /// A debugger error occurred while supervising.
    #[error(transparent)]
    Debugger(#[from] DebuggerError<E1>),

    /// A client error occurred.
    #[error(transparent)]
    Client(#[from] ClientError<E2>),

    /// The program to run was not found.
    #[error("Couldn't find {}", .0.display())]
    ProgramNotFound(PathBuf),

    /// An output pipe could not be created.
    #[error("Failed to setup pipe for {stream}: {source}")]
    PipeSetup {
        /// Stream the pipe was created for.
        stream: &'static str,

        /// Underlying debugger error.
        source: E1,
    },

    /// The OS rejected the creation of the process.
    #[error("Failed to start {} {args}: {source}", .program.display())]
    Launch {
        /// Resolved program.
        program: PathBuf,

        /// Program arguments.
        args: String,

        /// Underlying debugger error.
        source: E1,
    },
}

impl<E1, E2> Error<E1, E2> {
    /// Returns whether the error occurred before any process existed.
    pub const fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::ProgramNotFound(_) | Self::PipeSetup { .. } | Self::Launch { .. }
        )
    }

    /// Returns the exit code to report for this error, if it is a launch
    /// failure.
    pub const fn exit_code(&self) -> Option<i32> {
        if self.is_launch_failure() {
            Some(LAUNCH_FAILURE_EXIT_CODE)
        } else {
            None
        }
    }
}

/// Result type of this crate.
pub type Result<T, E1, E2> = core::result::Result<T, Error<E1, E2>>;

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Internal debugger error.
    #[error(transparent)]
    DebuggerInternal(#[from] crate::sys::Error),
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

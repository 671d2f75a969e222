/// Error of the Win32 backend.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0} failed: {1}")]
    Os(&'static str, windows::core::Error),

    #[error("{0:?} contains a NUL character")]
    InteriorNul(String),

    #[error("invalid environment variable name {0:?}")]
    InvalidEnvKey(String),

    #[error("no handle over process {0}")]
    NoProcessHandle(u32),

    #[error("read {read} bytes out of {expected}")]
    PartialRead { read: usize, expected: usize },
}

pub type Result<T> = core::result::Result<T, Error>;

/// Attaches the name of the failed Win32 call to an OS error.
pub(super) trait OsContext<T> {
    fn os_context(self, call: &'static str) -> Result<T>;
}

impl<T> OsContext<T> for windows::core::Result<T> {
    fn os_context(self, call: &'static str) -> Result<T> {
        self.map_err(|e| Error::Os(call, e))
    }
}

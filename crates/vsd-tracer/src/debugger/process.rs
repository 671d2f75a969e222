use std::path::PathBuf;

/// Trait implemented by the owned handle over a traced process.
///
/// The underlying OS handle is closed when the value is dropped.
pub trait ProcessHandle {
    /// Error returned by this trait.
    type Error: std::error::Error;

    /// Returns the process ID.
    fn id(&self) -> u32;

    /// Reads data from the process' address space.
    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Forcibly terminates the process.
    fn terminate(&self, exit_code: u32) -> Result<(), Self::Error>;

    /// Queries the path of the process' executable image.
    fn image_path(&self) -> Result<PathBuf, Self::Error>;

    /// Queries memory information about the module loaded at `base_addr`.
    fn module_info(&self, base_addr: u64) -> Result<ModuleInfo, Self::Error>;
}

/// Trait implemented by a transient handle over an image file.
pub trait ImageFile {
    /// Error returned by this trait.
    type Error: std::error::Error;

    /// Resolves the canonical path of the image.
    ///
    /// The handle is consumed, and closed once resolved.
    fn resolve_path(self) -> Result<PathBuf, Self::Error>;
}

/// Memory information of a loaded module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Size of the mapped image.
    pub image_size: u64,

    /// Entry point of the module.
    pub entry_point: u64,
}

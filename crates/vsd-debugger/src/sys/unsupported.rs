use std::path::PathBuf;
use std::time::Duration;

use vsd_tracer::debugger::{ContinueStatus, DebugEvent, ModuleInfo};

use super::LaunchOptions;

/// UTF-8 codepage identifier.
const CP_UTF8: u32 = 65001;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no debugger implementation is available for this platform")]
    Unsupported,
}

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
enum Void {}

pub fn ansi_codepage() -> u32 {
    CP_UTF8
}

pub fn create_pipe() -> Result<(PipeReader, PipeWriter)> {
    Err(Error::Unsupported)
}

pub fn launch(_options: &LaunchOptions<'_>) -> Result<Session> {
    Err(Error::Unsupported)
}

/// Read end of an output pipe.
#[derive(Debug)]
pub struct PipeReader(Void);

impl PipeReader {
    pub fn read_available(&mut self, _buf: &mut Vec<u8>) -> Result<usize> {
        match self.0 {}
    }
}

/// Write end of an output pipe.
#[derive(Debug)]
pub struct PipeWriter(Void);

pub struct Session(Void);

impl Session {
    pub fn root_process_id(&self) -> u32 {
        match self.0 {}
    }

    pub fn next_event(&mut self, _timeout: Duration) -> Result<Option<DebugEvent<crate::Session>>> {
        match self.0 {}
    }

    pub fn resume(&mut self, _pid: u32, _tid: u32, _status: ContinueStatus) -> Result<()> {
        match self.0 {}
    }

    pub fn root_stopper(&self) -> Result<Stopper> {
        match self.0 {}
    }
}

/// Owned handle over a debugged process.
#[derive(Debug)]
pub struct Process(Void);

impl Process {
    pub fn id(&self) -> u32 {
        match self.0 {}
    }

    pub fn read_memory(&self, _addr: u64, _buf: &mut [u8]) -> Result<()> {
        match self.0 {}
    }

    pub fn terminate(&self, _exit_code: u32) -> Result<()> {
        match self.0 {}
    }

    pub fn image_path(&self) -> Result<PathBuf> {
        match self.0 {}
    }

    pub fn module_info(&self, _base_addr: u64) -> Result<ModuleInfo> {
        match self.0 {}
    }
}

/// Handle over an image file, reported by a debug event.
#[derive(Debug)]
pub struct ImageFile(Void);

impl ImageFile {
    pub fn resolve_path(self) -> Result<PathBuf> {
        match self.0 {}
    }
}

/// Handle able to stop the root process.
#[derive(Debug)]
pub struct Stopper(Void);

impl Stopper {
    pub fn close_windows(&self) -> usize {
        match self.0 {}
    }

    pub fn wait_for_exit(&self, _timeout: Duration) -> bool {
        match self.0 {}
    }

    pub fn terminate(&self) -> std::io::Result<()> {
        match self.0 {}
    }
}

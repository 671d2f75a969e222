use std::path::PathBuf;
use std::time::Duration;

use vsd_tracer::debugger::{ImageFile, ModuleInfo, PipeReader, ProcessHandle, RootStopper};

use crate::sys;

impl ProcessHandle for sys::Process {
    type Error = crate::Error;

    fn id(&self) -> u32 {
        sys::Process::id(self)
    }

    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> crate::Result<()> {
        Ok(sys::Process::read_memory(self, addr, buf)?)
    }

    fn terminate(&self, exit_code: u32) -> crate::Result<()> {
        Ok(sys::Process::terminate(self, exit_code)?)
    }

    fn image_path(&self) -> crate::Result<PathBuf> {
        Ok(sys::Process::image_path(self)?)
    }

    fn module_info(&self, base_addr: u64) -> crate::Result<ModuleInfo> {
        Ok(sys::Process::module_info(self, base_addr)?)
    }
}

impl ImageFile for sys::ImageFile {
    type Error = crate::Error;

    fn resolve_path(self) -> crate::Result<PathBuf> {
        Ok(sys::ImageFile::resolve_path(self)?)
    }
}

impl PipeReader for sys::PipeReader {
    type Error = crate::Error;

    fn read_available(&mut self, buf: &mut Vec<u8>) -> crate::Result<usize> {
        Ok(sys::PipeReader::read_available(self, buf)?)
    }
}

impl RootStopper for sys::Stopper {
    fn close_windows(&self) -> bool {
        let posted = sys::Stopper::close_windows(self);
        tracing::debug!(posted, "asked root windows to close");
        posted > 0
    }

    fn wait_for_exit(&self, timeout: Duration) -> bool {
        sys::Stopper::wait_for_exit(self, timeout)
    }

    fn terminate(&self) -> std::io::Result<()> {
        sys::Stopper::terminate(self)
    }
}

use std::ffi::{OsString, c_void};
use std::os::windows::ffi::OsStringExt;
use std::os::windows::io::OwnedHandle;
use std::path::PathBuf;
use std::time::Duration;

use vsd_tracer::debugger::ModuleInfo;
use vsd_tracer::supervisor::TERMINATED_EXIT_CODE;
use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, HANDLE, HMODULE, WAIT_OBJECT_0};
use windows::Win32::Storage::FileSystem::{FILE_NAME_NORMALIZED, GetFinalPathNameByHandleW};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
use windows::Win32::System::Threading::{
    PROCESS_NAME_WIN32, QueryFullProcessImageNameW, TerminateProcess, WaitForSingleObject,
};
use windows::core::PWSTR;

use super::error::{Error, OsContext, Result};
use super::handle::{duplicate, raw, take};
use super::window;

const MAX_PATH: usize = 260;

/// Owned handle over a debugged process.
///
/// Without handle, every query fails but the process can still be tracked.
#[derive(Debug)]
pub struct Process {
    pid: u32,
    handle: Option<OwnedHandle>,
}

impl Process {
    pub(super) fn new(pid: u32, handle: Option<OwnedHandle>) -> Self {
        Self { pid, handle }
    }

    fn raw_handle(&self) -> Result<HANDLE> {
        self.handle
            .as_ref()
            .map(raw)
            .ok_or(Error::NoProcessHandle(self.pid))
    }

    pub fn id(&self) -> u32 {
        self.pid
    }

    pub fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let handle = self.raw_handle()?;
        let mut read = 0;

        // SAFETY: `buf` and `read` outlive the call, and the remote address
        //         is only dereferenced by the OS.
        unsafe {
            ReadProcessMemory(
                handle,
                addr as usize as *const c_void,
                buf.as_mut_ptr().cast(),
                buf.len(),
                Some(std::ptr::from_mut(&mut read)),
            )
        }
        .os_context("ReadProcessMemory")?;

        if read != buf.len() {
            return Err(Error::PartialRead {
                read,
                expected: buf.len(),
            });
        }
        Ok(())
    }

    pub fn terminate(&self, exit_code: u32) -> Result<()> {
        let handle = self.raw_handle()?;

        // SAFETY: the handle is valid.
        unsafe { TerminateProcess(handle, exit_code) }.os_context("TerminateProcess")
    }

    pub fn image_path(&self) -> Result<PathBuf> {
        let handle = self.raw_handle()?;
        let mut buf = vec![0u16; MAX_PATH];

        loop {
            let mut len = buf.len() as u32;

            // SAFETY: `buf` holds `len` characters, and outlives the call.
            let queried = unsafe {
                QueryFullProcessImageNameW(
                    handle,
                    PROCESS_NAME_WIN32,
                    PWSTR(buf.as_mut_ptr()),
                    &mut len,
                )
            };

            match queried {
                Ok(()) => {
                    buf.truncate(len as usize);
                    return Ok(PathBuf::from(OsString::from_wide(&buf)));
                }
                Err(e)
                    if e.code() == ERROR_INSUFFICIENT_BUFFER.to_hresult()
                        && buf.len() < u16::MAX as usize =>
                {
                    buf.resize(buf.len() * 2, 0);
                }
                Err(e) => return Err(e).os_context("QueryFullProcessImageNameW"),
            }
        }
    }

    pub fn module_info(&self, base_addr: u64) -> Result<ModuleInfo> {
        let handle = self.raw_handle()?;
        let mut info = MODULEINFO::default();

        // SAFETY: `info` outlives the call.
        unsafe {
            GetModuleInformation(
                handle,
                HMODULE(base_addr as isize),
                &mut info,
                size_of::<MODULEINFO>() as u32,
            )
        }
        .os_context("GetModuleInformation")?;

        Ok(ModuleInfo {
            image_size: u64::from(info.SizeOfImage),
            entry_point: info.EntryPoint as u64,
        })
    }
}

/// Handle over an image file, reported by a debug event.
#[derive(Debug)]
pub struct ImageFile(OwnedHandle);

impl ImageFile {
    /// # Safety
    ///
    /// `handle` must be a file handle handed over to the debugger.
    pub(super) unsafe fn from_raw(handle: HANDLE) -> Option<Self> {
        // SAFETY: upheld by the caller.
        unsafe { take(handle) }.map(Self)
    }

    /// Resolves the normalized path of the image, closing the handle.
    pub fn resolve_path(self) -> Result<PathBuf> {
        let mut buf = vec![0u16; MAX_PATH];

        loop {
            // SAFETY: the handle is valid.
            let len =
                unsafe { GetFinalPathNameByHandleW(raw(&self.0), &mut buf, FILE_NAME_NORMALIZED) }
                    as usize;

            if len == 0 {
                return Err(windows::core::Error::from_win32())
                    .os_context("GetFinalPathNameByHandleW");
            }
            if len < buf.len() {
                buf.truncate(len);
                break;
            }
            // the required size is returned, terminator included
            buf.resize(len, 0);
        }

        let path = OsString::from_wide(&buf);
        Ok(strip_verbatim_prefix(&path.to_string_lossy()).into())
    }
}

/// Turns `\\?\C:\dir` into `C:\dir`, and `\\?\UNC\host\share` into
/// `\\host\share`.
fn strip_verbatim_prefix(path: &str) -> String {
    if let Some(rest) = path.strip_prefix(r"\\?\UNC\") {
        format!(r"\\{rest}")
    } else if let Some(rest) = path.strip_prefix(r"\\?\") {
        rest.to_owned()
    } else {
        path.to_owned()
    }
}

/// Handle able to stop the root process from any thread.
#[derive(Debug)]
pub struct Stopper {
    pid: u32,
    process: OwnedHandle,
}

impl Stopper {
    pub(super) fn new(pid: u32, process: HANDLE) -> Result<Self> {
        Ok(Self {
            pid,
            process: duplicate(process)?,
        })
    }

    /// Posts `WM_CLOSE` to the top-level windows of the process.
    ///
    /// Returns how many windows were asked to close.
    pub fn close_windows(&self) -> usize {
        window::close_windows(self.pid)
    }

    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX - 1);

        // SAFETY: the handle is valid.
        unsafe { WaitForSingleObject(raw(&self.process), millis) == WAIT_OBJECT_0 }
    }

    pub fn terminate(&self) -> std::io::Result<()> {
        // SAFETY: the handle is valid.
        unsafe { TerminateProcess(raw(&self.process), TERMINATED_EXIT_CODE) }
            .map_err(std::io::Error::other)
    }
}

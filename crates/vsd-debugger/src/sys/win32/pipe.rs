use std::fs::File;
use std::io::Read;
use std::os::windows::io::{FromRawHandle, OwnedHandle};

use windows::Win32::Foundation::{
    ERROR_BROKEN_PIPE, HANDLE, HANDLE_FLAG_INHERIT, HANDLE_FLAGS, SetHandleInformation,
};
use windows::Win32::Security::SECURITY_ATTRIBUTES;
use windows::Win32::System::Pipes::{CreatePipe, PeekNamedPipe};

use super::error::{OsContext, Result};
use super::handle::raw;

/// Read end of an anonymous output pipe.
#[derive(Debug)]
pub struct PipeReader(File);

/// Inheritable write end of an anonymous output pipe.
#[derive(Debug)]
pub struct PipeWriter(OwnedHandle);

/// Creates an anonymous pipe whose write end only is inheritable.
pub fn create_pipe() -> Result<(PipeReader, PipeWriter)> {
    let attrs = SECURITY_ATTRIBUTES {
        nLength: size_of::<SECURITY_ATTRIBUTES>() as u32,
        lpSecurityDescriptor: std::ptr::null_mut(),
        bInheritHandle: true.into(),
    };

    let mut read = HANDLE::default();
    let mut write = HANDLE::default();

    // SAFETY: every pointer outlives the call.
    unsafe { CreatePipe(&mut read, &mut write, Some(std::ptr::from_ref(&attrs)), 0) }
        .os_context("CreatePipe")?;

    // SAFETY: both ends were just created, and are owned by nobody else.
    let (read, write) = unsafe {
        (
            OwnedHandle::from_raw_handle(read.0 as _),
            OwnedHandle::from_raw_handle(write.0 as _),
        )
    };

    // SAFETY: the handle is valid.
    unsafe { SetHandleInformation(raw(&read), HANDLE_FLAG_INHERIT.0, HANDLE_FLAGS(0)) }
        .os_context("SetHandleInformation")?;

    Ok((PipeReader(File::from(read)), PipeWriter(write)))
}

impl PipeWriter {
    pub(super) fn handle(&self) -> HANDLE {
        raw(&self.0)
    }
}

impl PipeReader {
    /// Appends the currently available bytes to `buf`, without blocking.
    pub fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let available = self.available()?;
        if available == 0 {
            return Ok(0);
        }

        let start = buf.len();
        buf.resize(start + available, 0);

        let read = match self.0.read(&mut buf[start..]) {
            Ok(read) => read,
            Err(e) => {
                buf.truncate(start);
                return Err(e.into());
            }
        };
        buf.truncate(start + read);

        Ok(read)
    }

    fn available(&self) -> Result<usize> {
        let mut available = 0u32;

        // SAFETY: the handle is valid, and `available` outlives the call.
        let peeked = unsafe {
            PeekNamedPipe(
                raw(&self.0),
                None,
                0,
                None,
                Some(std::ptr::from_mut(&mut available)),
                None,
            )
        };

        match peeked {
            Ok(()) => Ok(available as usize),
            // every write end is closed
            Err(e) if e.code() == ERROR_BROKEN_PIPE.to_hresult() => Ok(0),
            Err(e) => Err(e).os_context("PeekNamedPipe"),
        }
    }
}

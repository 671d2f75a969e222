use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString, c_void};
use std::os::windows::ffi::OsStrExt;
use std::os::windows::io::{FromRawHandle, OwnedHandle};

use windows::Win32::System::Threading::{
    CREATE_UNICODE_ENVIRONMENT, CreateProcessW, DEBUG_ONLY_THIS_PROCESS, DEBUG_PROCESS,
    PROCESS_INFORMATION, STARTF_USESTDHANDLES, STARTUPINFOW,
};
use windows::core::{PCWSTR, PWSTR};

use super::error::{Error, OsContext, Result};
use super::session::Session;
use crate::sys::LaunchOptions;

/// Spawns a process attached to the calling thread as its debugger.
///
/// The calling thread must be the one waiting for the debug events of the
/// returned session.
pub fn launch(options: &LaunchOptions<'_>) -> Result<Session> {
    let application = wide_nul(options.program.as_os_str())?;
    let mut command_line = wide_nul(OsStr::new(&options.command_line))?;
    let environment = options.env.as_ref().map(environment_block).transpose()?;
    let current_dir = options
        .current_dir
        .map(|dir| wide_nul(dir.as_os_str()))
        .transpose()?;

    let mut flags = if options.debug_tree {
        DEBUG_PROCESS
    } else {
        DEBUG_ONLY_THIS_PROCESS
    };
    if environment.is_some() {
        flags |= CREATE_UNICODE_ENVIRONMENT;
    }

    let startup_info = STARTUPINFOW {
        cb: size_of::<STARTUPINFOW>() as u32,
        dwFlags: STARTF_USESTDHANDLES,
        hStdOutput: options.stdout.handle(),
        hStdError: options.stderr.handle(),
        ..Default::default()
    };
    let mut info = PROCESS_INFORMATION::default();

    // SAFETY: every buffer is NUL-terminated and outlives the call, and the
    //         command line buffer is mutable as required.
    unsafe {
        CreateProcessW(
            PCWSTR(application.as_ptr()),
            PWSTR(command_line.as_mut_ptr()),
            None,
            None,
            true,
            flags,
            environment
                .as_ref()
                .map(|block| block.as_ptr().cast::<c_void>()),
            current_dir
                .as_ref()
                .map_or(PCWSTR::null(), |dir| PCWSTR(dir.as_ptr())),
            &startup_info,
            &mut info,
        )
    }
    .os_context("CreateProcessW")?;

    // SAFETY: the process and thread handles are returned to us.
    let (process, thread) = unsafe {
        (
            OwnedHandle::from_raw_handle(info.hProcess.0 as _),
            OwnedHandle::from_raw_handle(info.hThread.0 as _),
        )
    };

    tracing::debug!(pid = info.dwProcessId, "process created under debugger");

    Ok(Session::new(info.dwProcessId, process, thread))
}

fn wide_nul(s: &OsStr) -> Result<Vec<u16>> {
    let mut wide: Vec<u16> = s.encode_wide().collect();
    if wide.contains(&0) {
        return Err(Error::InteriorNul(s.to_string_lossy().into_owned()));
    }
    wide.push(0);
    Ok(wide)
}

/// Builds a `KEY=VALUE\0...\0\0` block of wide characters.
fn environment_block(env: &BTreeMap<OsString, OsString>) -> Result<Vec<u16>> {
    let mut block = Vec::new();

    for (key, value) in env {
        let key_wide: Vec<u16> = key.encode_wide().collect();

        // a leading `=` is legal (e.g., `=C:`)
        if key_wide.is_empty() || key_wide.iter().skip(1).any(|&c| c == u16::from(b'=')) {
            return Err(Error::InvalidEnvKey(key.to_string_lossy().into_owned()));
        }

        let start = block.len();
        block.extend(key_wide);
        block.push(u16::from(b'='));
        block.extend(value.encode_wide());

        if block[start..].contains(&0) {
            let entry = String::from_utf16_lossy(&block[start..]);
            return Err(Error::InteriorNul(entry));
        }
        block.push(0);
    }

    if block.is_empty() {
        block.push(0);
    }
    block.push(0);

    Ok(block)
}

use vsd_tracer::debugger::{DebugEvent, DebugEventKind, DebugStringRef};
use windows::Win32::System::Diagnostics::Debug::{
    CREATE_PROCESS_DEBUG_EVENT, CREATE_THREAD_DEBUG_EVENT, DEBUG_EVENT, EXCEPTION_DEBUG_EVENT,
    EXIT_PROCESS_DEBUG_EVENT, EXIT_THREAD_DEBUG_EVENT, LOAD_DLL_DEBUG_EVENT,
    OUTPUT_DEBUG_STRING_EVENT, RIP_EVENT, UNLOAD_DLL_DEBUG_EVENT,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
};

use super::handle::{duplicate, raw, take};
use super::process::{ImageFile, Process};

/// Converts a raw debug event, taking ownership of the handles it carries.
pub(super) fn convert(event: &DEBUG_EVENT) -> DebugEvent<crate::Session> {
    let process_id = event.dwProcessId;

    // SAFETY: each union field is read according to the event code.
    let kind = unsafe {
        match event.dwDebugEventCode {
            CREATE_PROCESS_DEBUG_EVENT => {
                let info = event.u.CreateProcessInfo;
                let image = ImageFile::from_raw(info.hFile);

                // the process handle is closed by the system
                let handle = duplicate(info.hProcess)
                    .inspect_err(|e| {
                        tracing::warn!(pid = process_id, error = %e, "duplicate process handle");
                    })
                    .ok();

                DebugEventKind::ProcessCreated {
                    process: Process::new(process_id, handle),
                    image,
                }
            }
            EXIT_PROCESS_DEBUG_EVENT => DebugEventKind::ProcessExited {
                exit_code: event.u.ExitProcess.dwExitCode,
            },
            CREATE_THREAD_DEBUG_EVENT | EXIT_THREAD_DEBUG_EVENT => DebugEventKind::ThreadChanged,
            LOAD_DLL_DEBUG_EVENT => {
                let info = event.u.LoadDll;
                DebugEventKind::ModuleLoaded {
                    base_addr: info.lpBaseOfDll as u64,
                    image: ImageFile::from_raw(info.hFile),
                }
            }
            UNLOAD_DLL_DEBUG_EVENT => DebugEventKind::ModuleUnloaded {
                base_addr: event.u.UnloadDll.lpBaseOfDll as u64,
            },
            OUTPUT_DEBUG_STRING_EVENT => {
                let info = event.u.DebugString;
                DebugEventKind::DebugString(DebugStringRef {
                    addr: info.lpDebugStringData.0 as u64,
                    len: u32::from(info.nDebugStringLength),
                    is_wide: info.fUnicode != 0,
                })
            }
            EXCEPTION_DEBUG_EVENT => {
                let info = event.u.Exception;
                DebugEventKind::Exception {
                    code: info.ExceptionRecord.ExceptionCode.0 as u32,
                    addr: info.ExceptionRecord.ExceptionAddress as u64,
                    first_chance: info.dwFirstChance != 0,
                }
            }
            RIP_EVENT => {
                let error = event.u.RipInfo.dwError;
                DebugEventKind::Rip {
                    error,
                    message: std::io::Error::from_raw_os_error(error as i32).to_string(),
                    exit_code: exit_code_of(process_id),
                }
            }
            other => {
                tracing::debug!(code = other.0, "ignoring unknown debug event");
                DebugEventKind::ThreadChanged
            }
        }
    };

    DebugEvent {
        process_id,
        thread_id: event.dwThreadId,
        kind,
    }
}

/// Queries the exit code of a process that may have already exited.
fn exit_code_of(process_id: u32) -> Option<u32> {
    // SAFETY: no pointer is involved.
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id) }.ok()?;
    // SAFETY: the handle was just opened.
    let handle = unsafe { take(handle) }?;

    let mut exit_code = 0;
    // SAFETY: the handle is valid, and `exit_code` outlives the call.
    unsafe { GetExitCodeProcess(raw(&handle), &mut exit_code) }.ok()?;

    Some(exit_code)
}

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, TRUE, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowThreadProcessId, PostMessageW, WM_CLOSE,
};

struct CloseRequest {
    pid: u32,
    posted: usize,
}

/// Posts `WM_CLOSE` to every top-level window owned by the given process.
pub(super) fn close_windows(pid: u32) -> usize {
    let mut request = CloseRequest { pid, posted: 0 };

    // SAFETY: `request` outlives the enumeration, which is synchronous.
    let enumerated = unsafe {
        EnumWindows(
            Some(post_close),
            LPARAM(std::ptr::from_mut(&mut request) as isize),
        )
    };
    if let Err(e) = enumerated {
        tracing::debug!(pid, error = %e, "failed to enumerate windows");
    }

    request.posted
}

unsafe extern "system" fn post_close(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: `lparam` points to the request of `close_windows`.
    let request = unsafe { &mut *(lparam.0 as *mut CloseRequest) };

    let mut owner = 0;
    // SAFETY: `owner` outlives the call.
    unsafe { GetWindowThreadProcessId(hwnd, Some(std::ptr::from_mut(&mut owner))) };

    if owner == request.pid {
        // SAFETY: no pointer is involved.
        match unsafe { PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)) } {
            Ok(()) => request.posted += 1,
            Err(e) => tracing::debug!(pid = owner, error = %e, "failed to post WM_CLOSE"),
        }
    }

    TRUE
}

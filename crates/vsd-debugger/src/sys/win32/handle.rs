use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle};

use windows::Win32::Foundation::{DUPLICATE_SAME_ACCESS, DuplicateHandle, HANDLE};
use windows::Win32::System::Threading::GetCurrentProcess;

use super::error::{OsContext, Result};

/// Returns the raw Win32 handle behind an owned handle.
pub(super) fn raw(handle: &impl AsRawHandle) -> HANDLE {
    HANDLE(handle.as_raw_handle() as isize)
}

/// Takes ownership of a raw handle, unless it is null or invalid.
///
/// # Safety
///
/// `handle` must be open and not owned by anything else.
pub(super) unsafe fn take(handle: HANDLE) -> Option<OwnedHandle> {
    if handle.is_invalid() {
        return None;
    }
    // SAFETY: upheld by the caller.
    Some(unsafe { OwnedHandle::from_raw_handle(handle.0 as _) })
}

/// Duplicates a handle owned by the system (e.g., reported by a debug event)
/// into one owned by us.
pub(super) fn duplicate(handle: HANDLE) -> Result<OwnedHandle> {
    let mut copy = HANDLE::default();

    // SAFETY: both process handles are pseudo or valid handles, and `copy`
    //         outlives the call.
    unsafe {
        let current = GetCurrentProcess();
        DuplicateHandle(
            current,
            handle,
            current,
            &mut copy,
            0,
            false,
            DUPLICATE_SAME_ACCESS,
        )
    }
    .os_context("DuplicateHandle")?;

    // SAFETY: the duplicated handle is only owned by us.
    Ok(unsafe { OwnedHandle::from_raw_handle(copy.0 as _) })
}

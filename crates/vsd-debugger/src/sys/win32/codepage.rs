use windows::Win32::Globalization::GetACP;

pub fn ansi_codepage() -> u32 {
    // SAFETY: no preconditions.
    unsafe { GetACP() }
}

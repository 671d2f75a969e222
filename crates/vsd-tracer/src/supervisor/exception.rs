/// Breakpoint exception, raised by the loader once a process is ready.
pub const EXCEPTION_BREAKPOINT: u32 = 0x8000_0003;

/// Breakpoint exception of a 32-bit process running under WOW64.
pub const STATUS_WX86_BREAKPOINT: u32 = 0x4000_001F;

/// Access violation.
pub const EXCEPTION_ACCESS_VIOLATION: u32 = 0xC000_0005;

static EXCEPTION_NAMES: &[(u32, &str)] = &[
    (EXCEPTION_ACCESS_VIOLATION, "EXCEPTION_ACCESS_VIOLATION"),
    (0xC000_008C, "EXCEPTION_ARRAY_BOUNDS_EXCEEDED"),
    (EXCEPTION_BREAKPOINT, "EXCEPTION_BREAKPOINT"),
    (0x8000_0002, "EXCEPTION_DATATYPE_MISALIGNMENT"),
    (0xC000_008D, "EXCEPTION_FLT_DENORMAL_OPERAND"),
    (0xC000_008E, "EXCEPTION_FLT_DIVIDE_BY_ZERO"),
    (0xC000_008F, "EXCEPTION_FLT_INEXACT_RESULT"),
    (0xC000_0090, "EXCEPTION_FLT_INVALID_OPERATION"),
    (0xC000_0091, "EXCEPTION_FLT_OVERFLOW"),
    (0xC000_0092, "EXCEPTION_FLT_STACK_CHECK"),
    (0xC000_0093, "EXCEPTION_FLT_UNDERFLOW"),
    (0xC000_001D, "EXCEPTION_ILLEGAL_INSTRUCTION"),
    (0xC000_0006, "EXCEPTION_IN_PAGE_ERROR"),
    (0xC000_0094, "EXCEPTION_INT_DIVIDE_BY_ZERO"),
    (0xC000_0095, "EXCEPTION_INT_OVERFLOW"),
    (0xC000_0026, "EXCEPTION_INVALID_DISPOSITION"),
    (0xC000_0008, "EXCEPTION_INVALID_HANDLE"),
    (0xC000_0025, "EXCEPTION_NONCONTINUABLE_EXCEPTION"),
    (0xC000_0096, "EXCEPTION_PRIV_INSTRUCTION"),
    (0x8000_0004, "EXCEPTION_SINGLE_STEP"),
    (0xC000_00FD, "EXCEPTION_STACK_OVERFLOW"),
    (0x8000_0001, "EXCEPTION_GUARD_PAGE"),
    (0x4001_0005, "DBG_CONTROL_C"),
    (STATUS_WX86_BREAKPOINT, "STATUS_WX86_BREAKPOINT"),
    (0xC000_0374, "STATUS_HEAP_CORRUPTION"),
    (0xC000_0409, "STATUS_STACK_BUFFER_OVERRUN"),
    (0xC000_0417, "STATUS_INVALID_CRUNTIME_PARAMETER"),
    (0xC000_0420, "STATUS_ASSERTION_FAILURE"),
    (0xE06D_7363, "MSVC_CPP_EXCEPTION"),
];

/// Returns the symbolic name of an exception code, if known.
pub fn exception_name(code: u32) -> Option<&'static str> {
    EXCEPTION_NAMES
        .iter()
        .find_map(|&(c, name)| (c == code).then_some(name))
}

/// Returns the symbolic name of an exception code, or its hexadecimal
/// rendering if unknown.
pub fn describe_exception(code: u32) -> String {
    exception_name(code).map_or_else(|| format!("{code:#010X}"), str::to_owned)
}

/// Returns the diagnostic text recorded for a last-chance exception.
pub fn unhandled_exception_reason(code: u32) -> String {
    format!("Unhandled Exception: {}", describe_exception(code))
}

/// Returns the bit identifying an initial breakpoint exception, if `code`
/// is one.
pub(super) const fn is_initial_breakpoint(code: u32) -> Option<u8> {
    match code {
        EXCEPTION_BREAKPOINT => Some(0b01),
        STATUS_WX86_BREAKPOINT => Some(0b10),
        _ => None,
    }
}

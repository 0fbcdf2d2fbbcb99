//! Error number definitions.
//!
//! Linux values for the errno codes the adapter can return.

/// Operation not permitted.
pub const EPERM: i32 = 1;
/// Cannot allocate memory.
pub const ENOMEM: i32 = 12;
/// Device or resource busy.
pub const EBUSY: i32 = 16;
/// Invalid argument.
pub const EINVAL: i32 = 22;

/// Symbolic name of an errno value the adapter produces, `"0"` for success.
#[must_use]
pub const fn errno_name(errno: i32) -> &'static str {
    match errno {
        0 => "0",
        EPERM => "EPERM",
        ENOMEM => "ENOMEM",
        EBUSY => "EBUSY",
        EINVAL => "EINVAL",
        _ => "UNKNOWN",
    }
}

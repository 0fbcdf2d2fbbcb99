//! Translation from internal result codes to errno values.
//!
//! Every forwarding entry point in the ABI crate routes its single runtime
//! call through [`errno_from_result`] and returns the value unchanged.

use enclave_pthread_runtime::EnclaveResult;

use crate::errno;

/// Map an internal result to the conventional errno (0 on success).
///
/// Codes with no conventional counterpart degrade to `EINVAL`.
#[must_use]
pub const fn errno_from_result(result: EnclaveResult) -> i32 {
    match result {
        EnclaveResult::Ok => 0,
        EnclaveResult::InvalidParameter => errno::EINVAL,
        EnclaveResult::Busy => errno::EBUSY,
        EnclaveResult::NotOwner => errno::EPERM,
        EnclaveResult::OutOfMemory => errno::ENOMEM,
        EnclaveResult::Failure | EnclaveResult::Unexpected | EnclaveResult::Unsupported => {
            errno::EINVAL
        }
    }
}

/// Map a raw result code that may lie outside the defined enumeration.
#[must_use]
pub const fn errno_from_raw(raw: u32) -> i32 {
    match EnclaveResult::from_raw(raw) {
        Some(result) => errno_from_result(result),
        None => errno::EINVAL,
    }
}

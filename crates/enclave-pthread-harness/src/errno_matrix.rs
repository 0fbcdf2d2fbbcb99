//! Table of internal result codes and the errno each one becomes.

use enclave_pthread_core::errno::errno_name;
use enclave_pthread_core::pthread::{errno_from_raw, errno_from_result};
use enclave_pthread_runtime::EnclaveResult;
use serde::Serialize;

/// Raw code used to exercise the out-of-range path.
pub const OUT_OF_RANGE_RAW: u32 = 0xdead;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrnoRow {
    /// Result name, or `"unknown"` for a raw code outside the enumeration.
    pub result: &'static str,
    pub raw: u32,
    pub errno: i32,
    pub errno_name: &'static str,
}

/// One row per defined result code, then one out-of-range row.
#[must_use]
pub fn errno_matrix() -> Vec<ErrnoRow> {
    let mut rows: Vec<ErrnoRow> = EnclaveResult::ALL
        .into_iter()
        .map(|result| {
            let errno = errno_from_result(result);
            ErrnoRow {
                result: result.name(),
                raw: result.as_raw(),
                errno,
                errno_name: errno_name(errno),
            }
        })
        .collect();
    let errno = errno_from_raw(OUT_OF_RANGE_RAW);
    rows.push(ErrnoRow {
        result: "unknown",
        raw: OUT_OF_RANGE_RAW,
        errno,
        errno_name: errno_name(errno),
    });
    rows
}

pub fn render_json(rows: &[ErrnoRow]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rows)
}

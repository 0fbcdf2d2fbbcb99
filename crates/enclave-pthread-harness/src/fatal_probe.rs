//! Isolated-process verification of the unsupported entry points.
//!
//! The harness binary re-executes itself with `probe-fatal --entry <name>`.
//! The child calls the entry point; the parent requires that the child was
//! killed by a signal rather than exiting, and captures its diagnostic line.

use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, Stdio};

use enclave_pthread_abi::unsupported_abi::invoke_unsupported;
use enclave_pthread_core::pthread::UnsupportedEntry;
use serde::Serialize;

use crate::error::HarnessError;

/// Exit code of a probe whose entry point returned instead of aborting.
pub const PROBE_RETURNED_EXIT: i32 = 3;

/// Child-side half: call the entry point. Reaching the return is a failure.
#[must_use]
pub fn run_probe(entry: UnsupportedEntry) -> i32 {
    let rc = invoke_unsupported(entry);
    eprintln!("{} returned {rc}", entry.symbol());
    PROBE_RETURNED_EXIT
}

/// How one probe child ended.
#[derive(Debug, Clone, Serialize)]
pub struct FatalVerdict {
    pub symbol: &'static str,
    pub signal: Option<i32>,
    pub exit_code: Option<i32>,
    pub diagnostic: Option<String>,
}

impl FatalVerdict {
    /// Terminated abnormally: by a signal, not by exiting.
    #[must_use]
    pub fn abnormal(&self) -> bool {
        self.signal.is_some() && self.exit_code.is_none()
    }

    #[must_use]
    pub fn aborted(&self) -> bool {
        self.signal == Some(libc::SIGABRT)
    }
}

/// Parent-side half: run `exe probe-fatal --entry <entry>` and classify it.
pub fn verify_entry(exe: &Path, entry: UnsupportedEntry) -> Result<FatalVerdict, HarnessError> {
    let output = Command::new(exe)
        .args(["probe-fatal", "--entry", entry.short_name()])
        .env_remove("ENCLAVE_PTHREAD_FATAL_DIAG")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| HarnessError::Spawn {
            symbol: entry.symbol(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let diagnostic = stderr
        .lines()
        .find(|line| line.contains(entry.symbol()))
        .map(str::to_owned);

    Ok(FatalVerdict {
        symbol: entry.symbol(),
        signal: output.status.signal(),
        exit_code: output.status.code(),
        diagnostic,
    })
}

/// Verify every unsupported entry point in its own child.
pub fn verify_all(exe: &Path) -> Result<Vec<FatalVerdict>, HarnessError> {
    UnsupportedEntry::ALL
        .into_iter()
        .map(|entry| verify_entry(exe, entry))
        .collect()
}

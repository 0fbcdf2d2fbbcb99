//! Conformance harness for the enclave pthread adapter.
//!
//! This crate provides:
//! - Errno matrix: every internal result code and the errno it becomes
//! - Smoke scenarios: init/acquire/release/destroy through the C surface for
//!   each primitive kind, plus identity and thread-local storage checks
//! - Fatal verification: each unsupported entry point run in an isolated
//!   child process, which must die abnormally
//! - Structured JSONL logging with a SHA-256 artifact index

#![deny(unsafe_code)]

pub mod errno_matrix;
pub mod error;
#[cfg(target_os = "linux")]
pub mod fatal_probe;
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub mod scenarios;
pub mod structured_log;

pub use error::HarnessError;
pub use structured_log::{ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome};

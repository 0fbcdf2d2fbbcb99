// All extern "C" entry points accept raw pointers from C callers and hand them
// to the layout contract, so per-function safety docs would repeat one rule.
#![allow(clippy::missing_safety_doc)]
//! # enclave-pthread-abi
//!
//! `extern "C"` `<pthread.h>` surface for code running inside the enclave.
//!
//! # Architecture
//!
//! ```text
//! C caller -> ABI entry (this crate) -> layout reinterpretation -> runtime primitive
//!          <- errno translation (core) <-
//! ```
//!
//! Each forwarding entry performs exactly one runtime call; there is no
//! adapter-level locking, caching or retry. Lifecycle entry points the
//! enclave cannot honor abort the process (see [`unsupported_abi`]).
//!
//! Symbols are exported unmangled only with the `export-symbols` feature.

mod macros;

#[cfg(target_os = "linux")]
pub mod layout;
#[cfg(target_os = "linux")]
pub mod pthread_abi;
#[cfg(target_os = "linux")]
pub mod unsupported_abi;

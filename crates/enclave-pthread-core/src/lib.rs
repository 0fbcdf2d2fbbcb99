//! # enclave-pthread-core
//!
//! Safe logic shared by the pthread adapter: errno constants, translation of
//! internal result codes, the accepted-but-ignored mutex attribute contract and
//! the catalogue of lifecycle entry points the enclave cannot support.
//!
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod errno;
pub mod pthread;

//! Enclave runtime primitives for enclave-pthread.
//!
//! This crate is the narrow, enclave-safe primitive set that the POSIX adapter
//! forwards to. Every operation reports through the closed [`EnclaveResult`]
//! enumeration; nothing here knows about errno.
//!
//! # Architecture
//!
//! - **Result codes** (`result`): the closed internal result enumeration
//! - **Thread identity** (`thread`): opaque per-thread handles and equality
//! - **One-time init** (`once`): run-exactly-once flag
//! - **Spinlock** (`spinlock`): busy-wait lock, waiting strategy from config
//! - **Mutex** (`mutex`): owner-tracked recursive blocking lock
//! - **Reader-writer lock** (`rwlock`): shared/exclusive lock, single unlock
//! - **Condition variable** (`cond`): wait/signal/broadcast over a [`EnclaveMutex`]
//! - **Thread-local keys** (`tls`): keyed per-thread slots with exit destructors
//! - **Configuration** (`config`): spin policy and fatal diagnostics
//! - **Metrics** (`metrics`): atomic contention counters
//!
//! Init functions accept `MaybeUninit` storage and never read it. All other
//! operations take `Option<&T>`; `None` stands for a null pointer and yields
//! [`EnclaveResult::InvalidParameter`]. The all-zero byte pattern is a valid
//! fresh instance of every primitive, so zero-filled static initializers work.

#![deny(unsafe_code)]

pub mod cond;
pub mod config;
pub mod metrics;
pub mod mutex;
#[allow(unsafe_code)]
pub mod once;
pub mod result;
pub mod rwlock;
pub mod spinlock;
pub mod thread;
#[allow(unsafe_code)]
pub mod tls;

pub use cond::EnclaveCond;
pub use config::{FatalDiagnostics, SpinPolicy};
pub use metrics::{MetricsSnapshot, RuntimeMetrics, global_metrics};
pub use mutex::EnclaveMutex;
pub use once::{EnclaveOnce, OnceFn};
pub use result::EnclaveResult;
pub use rwlock::EnclaveRwLock;
pub use spinlock::EnclaveSpinlock;
pub use thread::EnclaveThread;
pub use tls::{KeyDestructor, ThreadKey};

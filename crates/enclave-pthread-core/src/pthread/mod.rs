//! POSIX threads over the enclave runtime.
//!
//! Translation, attribute and lifecycle rules for the `<pthread.h>` surface.
//! The forwarding itself lives in the ABI crate.

pub mod lifecycle;
pub mod mutex;
pub mod result;

pub use lifecycle::UnsupportedEntry;
pub use mutex::{
    AttrDisposition, MutexBehavior, PTHREAD_MUTEX_DEFAULT, PTHREAD_MUTEX_ERRORCHECK,
    PTHREAD_MUTEX_NORMAL, PTHREAD_MUTEX_RECURSIVE,
};
pub use result::{errno_from_raw, errno_from_result};

//! Mutex attribute contract.
//!
//! The enclave runtime offers exactly one mutex behavior (see
//! [`MutexBehavior`]). Attribute objects exist for source compatibility only:
//! initializing, typing or destroying them is accepted and has no effect on
//! any mutex. Callers that rely on error-checking or non-recursive semantics
//! do not get them.

use crate::errno;

// ---------------------------------------------------------------------------
// Mutex type constants
// ---------------------------------------------------------------------------

/// Normal mutex.
pub const PTHREAD_MUTEX_NORMAL: i32 = 0;
/// Recursive mutex.
pub const PTHREAD_MUTEX_RECURSIVE: i32 = 1;
/// Error-checking mutex.
pub const PTHREAD_MUTEX_ERRORCHECK: i32 = 2;
/// Default mutex type (alias for NORMAL on Linux).
pub const PTHREAD_MUTEX_DEFAULT: i32 = PTHREAD_MUTEX_NORMAL;

/// Whether `kind` names one of the standard mutex types.
#[must_use]
pub const fn valid_mutex_type(kind: i32) -> bool {
    matches!(
        kind,
        PTHREAD_MUTEX_NORMAL | PTHREAD_MUTEX_RECURSIVE | PTHREAD_MUTEX_ERRORCHECK
    )
}

// ---------------------------------------------------------------------------
// Fixed behavior
// ---------------------------------------------------------------------------

/// The behavior every mutex has, whatever attributes were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexBehavior {
    /// Owner-tracked: the owner may relock (nesting), other threads block,
    /// unlock by a non-owner fails with `EPERM`.
    OwnerRecursive,
}

/// Outcome of an attribute operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDisposition {
    /// The call succeeds and changes nothing.
    AcceptedIgnored,
}

impl AttrDisposition {
    /// Return value the ABI reports for this disposition.
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::AcceptedIgnored => 0,
        }
    }
}

#[must_use]
pub const fn mutexattr_init() -> AttrDisposition {
    AttrDisposition::AcceptedIgnored
}

/// Any `kind`, recognized or not, is accepted and ignored.
#[must_use]
pub const fn mutexattr_settype(_kind: i32) -> AttrDisposition {
    AttrDisposition::AcceptedIgnored
}

#[must_use]
pub const fn mutexattr_destroy() -> AttrDisposition {
    AttrDisposition::AcceptedIgnored
}

/// Behavior a mutex gets when initialized after requesting `kind`.
#[must_use]
pub const fn effective_behavior(_kind: i32) -> MutexBehavior {
    MutexBehavior::OwnerRecursive
}

/// Errno an unsupported-type request would get on a strict implementation.
/// Logged by the harness smoke run; the adapter itself never returns it.
#[must_use]
pub const fn strict_settype_errno(kind: i32) -> i32 {
    if valid_mutex_type(kind) {
        0
    } else {
        errno::EINVAL
    }
}

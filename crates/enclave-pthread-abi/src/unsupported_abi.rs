//! Entry points the enclave cannot support.
//!
//! Thread creation, join, detach and timed condition waits have no runtime
//! counterpart. Each of these symbols writes one diagnostic line (unless
//! `ENCLAVE_PTHREAD_FATAL_DIAG=silent`) and aborts the process. None of them
//! returns an error code.

use std::ffi::{c_int, c_void};
use std::io::Write;

use enclave_pthread_core::pthread::UnsupportedEntry;
use enclave_pthread_runtime::FatalDiagnostics;
use enclave_pthread_runtime::config::fatal_diagnostics;

use crate::macros::abi_fn;

/// Start routine type of `pthread_create`.
pub type StartRoutine = extern "C" fn(*mut c_void) -> *mut c_void;

/// Report `entry` and abort. Never returns.
#[cold]
#[inline(never)]
pub fn abort_unsupported(entry: UnsupportedEntry) -> ! {
    if fatal_diagnostics() == FatalDiagnostics::Stderr {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{entry}");
        let _ = err.flush();
    }
    std::process::abort()
}

abi_fn! {
    /// POSIX `pthread_create`. Aborts: the enclave thread pool is fixed.
    fn pthread_create(
        _thread: *mut libc::pthread_t,
        _attr: *const libc::pthread_attr_t,
        _start_routine: Option<StartRoutine>,
        _arg: *mut c_void,
    ) -> c_int {
        abort_unsupported(UnsupportedEntry::Create)
    }
}

abi_fn! {
    /// POSIX `pthread_join`. Aborts: the enclave thread pool is fixed.
    fn pthread_join(_thread: libc::pthread_t, _retval: *mut *mut c_void) -> c_int {
        abort_unsupported(UnsupportedEntry::Join)
    }
}

abi_fn! {
    /// POSIX `pthread_detach`. Aborts: the enclave thread pool is fixed.
    fn pthread_detach(_thread: libc::pthread_t) -> c_int {
        abort_unsupported(UnsupportedEntry::Detach)
    }
}

abi_fn! {
    /// POSIX `pthread_cond_timedwait`. Aborts: the runtime has no bounded wait.
    fn pthread_cond_timedwait(
        _cond: *mut libc::pthread_cond_t,
        _mutex: *mut libc::pthread_mutex_t,
        _abstime: *const libc::timespec,
    ) -> c_int {
        abort_unsupported(UnsupportedEntry::CondTimedWait)
    }
}

/// Invoke the entry point for `entry` with inert arguments.
///
/// Used by isolated-process verification. Returning at all is a defect; the
/// value is whatever the entry point returned.
pub fn invoke_unsupported(entry: UnsupportedEntry) -> c_int {
    let mut handle: libc::pthread_t = 0;
    // SAFETY: every branch aborts before touching its arguments.
    unsafe {
        match entry {
            UnsupportedEntry::Create => {
                pthread_create(&raw mut handle, std::ptr::null(), None, std::ptr::null_mut())
            }
            UnsupportedEntry::Join => pthread_join(handle, std::ptr::null_mut()),
            UnsupportedEntry::Detach => pthread_detach(handle),
            UnsupportedEntry::CondTimedWait => pthread_cond_timedwait(
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null(),
            ),
        }
    }
}

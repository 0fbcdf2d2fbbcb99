//! POSIX pthread forwarding entry points.
//!
//! Each function reinterprets its argument storage through [`crate::layout`],
//! makes one runtime call and returns the translated result. Null storage is
//! passed through as `None`; the runtime reports it as an invalid parameter.

use std::ffi::{c_int, c_void};

use enclave_pthread_core::pthread::{errno_from_result, mutex as mutex_attr};
use enclave_pthread_runtime::{
    EnclaveThread, KeyDestructor, OnceFn, ThreadKey, cond, mutex, once, rwlock, spinlock,
    thread, tls,
};

use crate::layout::{internal_ref, internal_uninit};
use crate::macros::abi_fn;

// ---------------------------------------------------------------------------
// Thread identity
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_self`.
    fn pthread_self() -> libc::pthread_t {
        thread::current().into_raw() as libc::pthread_t
    }
}

abi_fn! {
    /// POSIX `pthread_equal`. Nonzero when both handles name the same thread.
    fn pthread_equal(a: libc::pthread_t, b: libc::pthread_t) -> c_int {
        c_int::from(thread::equal(
            EnclaveThread::from_raw(a as u64),
            EnclaveThread::from_raw(b as u64),
        ))
    }
}

// ---------------------------------------------------------------------------
// One-time initialization
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_once`.
    fn pthread_once(once_control: *mut libc::pthread_once_t, init_routine: Option<OnceFn>) -> c_int {
        // SAFETY: caller passes a live `pthread_once_t` or null.
        let flag = unsafe { internal_ref(once_control) };
        errno_from_result(once::once(flag, init_routine))
    }
}

// ---------------------------------------------------------------------------
// Spinlock
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_spin_init`. `pshared` is ignored.
    fn pthread_spin_init(lock: *mut libc::pthread_spinlock_t, _pshared: c_int) -> c_int {
        // SAFETY: caller passes writable `pthread_spinlock_t` storage or null.
        let slot = unsafe { internal_uninit(lock) };
        errno_from_result(spinlock::init(slot))
    }
}

abi_fn! {
    /// POSIX `pthread_spin_lock`.
    fn pthread_spin_lock(lock: *mut libc::pthread_spinlock_t) -> c_int {
        // SAFETY: caller passes an initialized spinlock or null.
        let lock = unsafe { internal_ref(lock) };
        errno_from_result(spinlock::lock(lock))
    }
}

abi_fn! {
    /// POSIX `pthread_spin_unlock`.
    fn pthread_spin_unlock(lock: *mut libc::pthread_spinlock_t) -> c_int {
        // SAFETY: caller passes an initialized spinlock or null.
        let lock = unsafe { internal_ref(lock) };
        errno_from_result(spinlock::unlock(lock))
    }
}

abi_fn! {
    /// POSIX `pthread_spin_destroy`.
    fn pthread_spin_destroy(lock: *mut libc::pthread_spinlock_t) -> c_int {
        // SAFETY: caller passes an initialized spinlock or null.
        let lock = unsafe { internal_ref(lock) };
        errno_from_result(spinlock::destroy(lock))
    }
}

// ---------------------------------------------------------------------------
// Mutex attributes (accepted, no effect)
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_mutexattr_init`. Accepted and ignored.
    fn pthread_mutexattr_init(_attr: *mut libc::pthread_mutexattr_t) -> c_int {
        mutex_attr::mutexattr_init().errno()
    }
}

abi_fn! {
    /// POSIX `pthread_mutexattr_settype`. Any type is accepted and ignored.
    fn pthread_mutexattr_settype(_attr: *mut libc::pthread_mutexattr_t, kind: c_int) -> c_int {
        mutex_attr::mutexattr_settype(kind).errno()
    }
}

abi_fn! {
    /// POSIX `pthread_mutexattr_destroy`. Accepted and ignored.
    fn pthread_mutexattr_destroy(_attr: *mut libc::pthread_mutexattr_t) -> c_int {
        mutex_attr::mutexattr_destroy().errno()
    }
}

// ---------------------------------------------------------------------------
// Mutex
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_mutex_init`. The attribute pointer is ignored.
    fn pthread_mutex_init(
        mutex: *mut libc::pthread_mutex_t,
        _attr: *const libc::pthread_mutexattr_t,
    ) -> c_int {
        // SAFETY: caller passes writable `pthread_mutex_t` storage or null.
        let slot = unsafe { internal_uninit(mutex) };
        errno_from_result(mutex::init(slot))
    }
}

abi_fn! {
    /// POSIX `pthread_mutex_lock`.
    fn pthread_mutex_lock(mutex: *mut libc::pthread_mutex_t) -> c_int {
        // SAFETY: caller passes an initialized mutex or null.
        let m = unsafe { internal_ref(mutex) };
        errno_from_result(mutex::lock(m))
    }
}

abi_fn! {
    /// POSIX `pthread_mutex_trylock`. `EBUSY` when another thread owns it.
    fn pthread_mutex_trylock(mutex: *mut libc::pthread_mutex_t) -> c_int {
        // SAFETY: caller passes an initialized mutex or null.
        let m = unsafe { internal_ref(mutex) };
        errno_from_result(mutex::try_lock(m))
    }
}

abi_fn! {
    /// POSIX `pthread_mutex_unlock`. `EPERM` when the caller is not the owner.
    fn pthread_mutex_unlock(mutex: *mut libc::pthread_mutex_t) -> c_int {
        // SAFETY: caller passes an initialized mutex or null.
        let m = unsafe { internal_ref(mutex) };
        errno_from_result(mutex::unlock(m))
    }
}

abi_fn! {
    /// POSIX `pthread_mutex_destroy`.
    fn pthread_mutex_destroy(mutex: *mut libc::pthread_mutex_t) -> c_int {
        // SAFETY: caller passes an initialized mutex or null.
        let m = unsafe { internal_ref(mutex) };
        errno_from_result(mutex::destroy(m))
    }
}

// ---------------------------------------------------------------------------
// Reader-writer lock
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_rwlock_init`. The attribute pointer is ignored.
    fn pthread_rwlock_init(
        rwlock: *mut libc::pthread_rwlock_t,
        _attr: *const libc::pthread_rwlockattr_t,
    ) -> c_int {
        // SAFETY: caller passes writable `pthread_rwlock_t` storage or null.
        let slot = unsafe { internal_uninit(rwlock) };
        errno_from_result(rwlock::init(slot))
    }
}

abi_fn! {
    /// POSIX `pthread_rwlock_rdlock`.
    fn pthread_rwlock_rdlock(rwlock: *mut libc::pthread_rwlock_t) -> c_int {
        // SAFETY: caller passes an initialized rwlock or null.
        let rw = unsafe { internal_ref(rwlock) };
        errno_from_result(rwlock::read_lock(rw))
    }
}

abi_fn! {
    /// POSIX `pthread_rwlock_wrlock`.
    fn pthread_rwlock_wrlock(rwlock: *mut libc::pthread_rwlock_t) -> c_int {
        // SAFETY: caller passes an initialized rwlock or null.
        let rw = unsafe { internal_ref(rwlock) };
        errno_from_result(rwlock::write_lock(rw))
    }
}

abi_fn! {
    /// POSIX `pthread_rwlock_unlock`. Releases whichever hold the caller has.
    fn pthread_rwlock_unlock(rwlock: *mut libc::pthread_rwlock_t) -> c_int {
        // SAFETY: caller passes an initialized rwlock or null.
        let rw = unsafe { internal_ref(rwlock) };
        errno_from_result(rwlock::unlock(rw))
    }
}

abi_fn! {
    /// POSIX `pthread_rwlock_destroy`.
    fn pthread_rwlock_destroy(rwlock: *mut libc::pthread_rwlock_t) -> c_int {
        // SAFETY: caller passes an initialized rwlock or null.
        let rw = unsafe { internal_ref(rwlock) };
        errno_from_result(rwlock::destroy(rw))
    }
}

// ---------------------------------------------------------------------------
// Condition variable
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_cond_init`. The attribute pointer is ignored.
    fn pthread_cond_init(
        cond: *mut libc::pthread_cond_t,
        _attr: *const libc::pthread_condattr_t,
    ) -> c_int {
        // SAFETY: caller passes writable `pthread_cond_t` storage or null.
        let slot = unsafe { internal_uninit(cond) };
        errno_from_result(cond::init(slot))
    }
}

abi_fn! {
    /// POSIX `pthread_cond_wait`. The caller must own `mutex`.
    fn pthread_cond_wait(cond: *mut libc::pthread_cond_t, mutex: *mut libc::pthread_mutex_t) -> c_int {
        // SAFETY: caller passes an initialized condvar and mutex, or nulls.
        let (c, m) = unsafe { (internal_ref(cond), internal_ref(mutex)) };
        errno_from_result(cond::wait(c, m))
    }
}

abi_fn! {
    /// POSIX `pthread_cond_signal`.
    fn pthread_cond_signal(cond: *mut libc::pthread_cond_t) -> c_int {
        // SAFETY: caller passes an initialized condvar or null.
        let c = unsafe { internal_ref(cond) };
        errno_from_result(cond::signal(c))
    }
}

abi_fn! {
    /// POSIX `pthread_cond_broadcast`.
    fn pthread_cond_broadcast(cond: *mut libc::pthread_cond_t) -> c_int {
        // SAFETY: caller passes an initialized condvar or null.
        let c = unsafe { internal_ref(cond) };
        errno_from_result(cond::broadcast(c))
    }
}

abi_fn! {
    /// POSIX `pthread_cond_destroy`.
    fn pthread_cond_destroy(cond: *mut libc::pthread_cond_t) -> c_int {
        // SAFETY: caller passes an initialized condvar or null.
        let c = unsafe { internal_ref(cond) };
        errno_from_result(cond::destroy(c))
    }
}

// ---------------------------------------------------------------------------
// Thread-local storage
// ---------------------------------------------------------------------------

abi_fn! {
    /// POSIX `pthread_key_create`. The destructor is handed to the runtime.
    fn pthread_key_create(key: *mut libc::pthread_key_t, destructor: Option<KeyDestructor>) -> c_int {
        // SAFETY: caller passes writable `pthread_key_t` storage or null.
        let slot = unsafe { internal_uninit(key) };
        errno_from_result(tls::key_create(slot, destructor))
    }
}

abi_fn! {
    /// POSIX `pthread_key_delete`.
    fn pthread_key_delete(key: libc::pthread_key_t) -> c_int {
        errno_from_result(tls::key_delete(ThreadKey::from_raw(key)))
    }
}

abi_fn! {
    /// POSIX `pthread_setspecific`.
    fn pthread_setspecific(key: libc::pthread_key_t, value: *const c_void) -> c_int {
        errno_from_result(tls::set_specific(ThreadKey::from_raw(key), value))
    }
}

abi_fn! {
    /// POSIX `pthread_getspecific`. Null when unset or the key is unknown.
    fn pthread_getspecific(key: libc::pthread_key_t) -> *mut c_void {
        tls::get_specific(ThreadKey::from_raw(key))
    }
}

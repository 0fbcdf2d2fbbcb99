//! Thread-local storage keys.
//!
//! ## Design
//!
//! - **Key generations**: one atomic sequence word per key. Creating a key
//!   moves it to an odd value, deleting it to the next even value, so "is
//!   this key live" is a single load and values written under an older
//!   generation are never returned through a reused key.
//!
//! - **Destructor table**: a fixed array guarded by a mutex, touched only on
//!   create/delete and during thread-exit teardown.
//!
//! - **Per-thread values**: a const-initialized thread-local array of
//!   `(generation, value)` pairs. It has no destructor of its own, so it stays
//!   readable while other thread-locals are being torn down.
//!
//! - **Exit teardown**: the first non-null store on a thread arms an exit
//!   guard. When the thread ends the guard runs destructors for live keys with
//!   non-null values, repeating up to [`DESTRUCTOR_ITERATIONS`] passes while
//!   destructors keep storing new values.

use std::cell::Cell;
use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::result::EnclaveResult;

/// Number of keys the facility can hold at once.
pub const THREAD_KEY_MAX: usize = 256;

/// Destructor passes run at thread exit.
pub const DESTRUCTOR_ITERATIONS: usize = 4;

/// Callback run at thread exit with the thread's non-null value for a key.
pub type KeyDestructor = unsafe extern "C" fn(*mut c_void);

/// Names one per-thread slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ThreadKey(u32);

impl ThreadKey {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> Option<usize> {
        let idx = self.0 as usize;
        (idx < THREAD_KEY_MAX).then_some(idx)
    }
}

// ---------------------------------------------------------------------------
// Global key registry
// ---------------------------------------------------------------------------

static KEY_SEQS: [AtomicU32; THREAD_KEY_MAX] = [const { AtomicU32::new(0) }; THREAD_KEY_MAX];

static DESTRUCTORS: Mutex<[Option<KeyDestructor>; THREAD_KEY_MAX]> =
    parking_lot::const_mutex([None; THREAD_KEY_MAX]);

const fn is_live(seq: u32) -> bool {
    seq & 1 == 1
}

/// Current generation of a live key, or `None`.
fn live_seq(idx: usize) -> Option<u32> {
    let seq = KEY_SEQS[idx].load(Ordering::Acquire);
    is_live(seq).then_some(seq)
}

// ---------------------------------------------------------------------------
// Per-thread values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Slot {
    seq: u32,
    value: usize,
}

const EMPTY_SLOT: Slot = Slot { seq: 0, value: 0 };

struct ExitGuard;

impl Drop for ExitGuard {
    fn drop(&mut self) {
        run_exit_destructors();
    }
}

thread_local! {
    static VALUES: [Cell<Slot>; THREAD_KEY_MAX] =
        const { [const { Cell::new(EMPTY_SLOT) }; THREAD_KEY_MAX] };
    static EXIT_GUARD: ExitGuard = const { ExitGuard };
}

fn arm_exit_guard() {
    // Fails only once this thread's teardown has begun; the running guard
    // picks up the new value on its next pass.
    let _ = EXIT_GUARD.try_with(|_| ());
}

fn run_exit_destructors() {
    for _pass in 0..DESTRUCTOR_ITERATIONS {
        let destructors = *DESTRUCTORS.lock();
        let mut ran = 0u64;
        for (idx, dtor) in destructors.iter().enumerate() {
            let slot = VALUES.with(|values| values[idx].replace(EMPTY_SLOT));
            if slot.value == 0 || live_seq(idx) != Some(slot.seq) {
                continue;
            }
            if let Some(dtor) = dtor {
                // SAFETY: the destructor was registered for this key and receives
                // the value this thread stored under the key's live generation.
                unsafe { dtor(slot.value as *mut c_void) };
                ran += 1;
            }
        }
        if ran == 0 {
            break;
        }
        RuntimeMetrics::add(&global_metrics().destructors_run, ran);
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Reserve a fresh key and register `destructor` for it.
///
/// [`EnclaveResult::OutOfMemory`] when every key is in use.
pub fn key_create(
    key: Option<&mut MaybeUninit<ThreadKey>>,
    destructor: Option<KeyDestructor>,
) -> EnclaveResult {
    let Some(out) = key else {
        return EnclaveResult::InvalidParameter;
    };
    let mut destructors = DESTRUCTORS.lock();
    for (idx, seq) in KEY_SEQS.iter().enumerate() {
        let current = seq.load(Ordering::Acquire);
        if is_live(current) {
            continue;
        }
        destructors[idx] = destructor;
        seq.store(current.wrapping_add(1), Ordering::Release);
        out.write(ThreadKey(idx as u32));
        RuntimeMetrics::inc(&global_metrics().keys_created);
        return EnclaveResult::Ok;
    }
    EnclaveResult::OutOfMemory
}

/// Release a key. Values other threads still hold are dropped silently;
/// their destructors do not run.
pub fn key_delete(key: ThreadKey) -> EnclaveResult {
    let Some(idx) = key.index() else {
        return EnclaveResult::InvalidParameter;
    };
    let mut destructors = DESTRUCTORS.lock();
    let current = KEY_SEQS[idx].load(Ordering::Acquire);
    if !is_live(current) {
        return EnclaveResult::InvalidParameter;
    }
    destructors[idx] = None;
    KEY_SEQS[idx].store(current.wrapping_add(1), Ordering::Release);
    RuntimeMetrics::inc(&global_metrics().keys_deleted);
    EnclaveResult::Ok
}

/// Store `value` for the calling thread under `key`.
pub fn set_specific(key: ThreadKey, value: *const c_void) -> EnclaveResult {
    let Some(idx) = key.index() else {
        return EnclaveResult::InvalidParameter;
    };
    let Some(seq) = live_seq(idx) else {
        return EnclaveResult::InvalidParameter;
    };
    VALUES.with(|values| {
        values[idx].set(Slot {
            seq,
            value: value as usize,
        });
    });
    if !value.is_null() {
        arm_exit_guard();
    }
    EnclaveResult::Ok
}

/// The calling thread's value under `key`; null if unset, stale or unknown.
#[must_use]
pub fn get_specific(key: ThreadKey) -> *mut c_void {
    let Some(idx) = key.index() else {
        return std::ptr::null_mut();
    };
    let Some(seq) = live_seq(idx) else {
        return std::ptr::null_mut();
    };
    let slot = VALUES.with(|values| values[idx].get());
    if slot.seq == seq {
        slot.value as *mut c_void
    } else {
        std::ptr::null_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    // Tests share the global key table; exhaustion in particular must not
    // overlap with other key users.
    static TEST_LOCK: Mutex<()> = parking_lot::const_mutex(());

    fn create(dtor: Option<KeyDestructor>) -> ThreadKey {
        let mut key = MaybeUninit::uninit();
        assert_eq!(key_create(Some(&mut key), dtor), EnclaveResult::Ok);
        // SAFETY: `key_create` returned Ok, so it wrote the key.
        unsafe { key.assume_init() }
    }

    fn as_value(v: usize) -> *const c_void {
        v as *const c_void
    }

    #[test]
    fn set_then_get_on_same_thread() {
        let _guard = TEST_LOCK.lock();
        let key = create(None);
        assert!(get_specific(key).is_null());
        assert_eq!(set_specific(key, as_value(0x1234)), EnclaveResult::Ok);
        assert_eq!(get_specific(key) as usize, 0x1234);
        assert_eq!(key_delete(key), EnclaveResult::Ok);
    }

    #[test]
    fn threads_see_independent_values() {
        let _guard = TEST_LOCK.lock();
        let key = create(None);
        assert_eq!(set_specific(key, as_value(1)), EnclaveResult::Ok);
        let seen = std::thread::spawn(move || {
            let before = get_specific(key) as usize;
            assert_eq!(set_specific(key, as_value(2)), EnclaveResult::Ok);
            (before, get_specific(key) as usize)
        })
        .join()
        .unwrap();
        assert_eq!(seen, (0, 2));
        assert_eq!(get_specific(key) as usize, 1);
        assert_eq!(key_delete(key), EnclaveResult::Ok);
    }

    #[test]
    fn deleted_key_is_rejected_and_reuse_hides_old_value() {
        let _guard = TEST_LOCK.lock();
        let key = create(None);
        assert_eq!(set_specific(key, as_value(7)), EnclaveResult::Ok);
        assert_eq!(key_delete(key), EnclaveResult::Ok);
        assert_eq!(key_delete(key), EnclaveResult::InvalidParameter);
        assert_eq!(set_specific(key, as_value(8)), EnclaveResult::InvalidParameter);
        assert!(get_specific(key).is_null());

        let reused = create(None);
        assert_eq!(reused, key, "lowest free slot is reused");
        assert!(get_specific(reused).is_null());
        assert_eq!(key_delete(reused), EnclaveResult::Ok);
    }

    #[test]
    fn out_of_range_keys_are_invalid() {
        let bogus = ThreadKey::from_raw(THREAD_KEY_MAX as u32);
        assert_eq!(key_delete(bogus), EnclaveResult::InvalidParameter);
        assert_eq!(set_specific(bogus, as_value(1)), EnclaveResult::InvalidParameter);
        assert!(get_specific(bogus).is_null());
        assert_eq!(key_create(None, None), EnclaveResult::InvalidParameter);
    }

    #[test]
    fn exhaustion_reports_out_of_memory() {
        let _guard = TEST_LOCK.lock();
        let mut keys = Vec::new();
        loop {
            let mut key = MaybeUninit::uninit();
            match key_create(Some(&mut key), None) {
                // SAFETY: Ok means the key was written.
                EnclaveResult::Ok => keys.push(unsafe { key.assume_init() }),
                EnclaveResult::OutOfMemory => break,
                other => panic!("unexpected {other}"),
            }
        }
        assert!(!keys.is_empty());
        for key in keys {
            assert_eq!(key_delete(key), EnclaveResult::Ok);
        }
    }

    static DROPPED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_drop(value: *mut c_void) {
        DROPPED.fetch_add(value as usize, Ordering::SeqCst);
    }

    #[test]
    fn destructor_runs_at_thread_exit() {
        let _guard = TEST_LOCK.lock();
        let key = create(Some(count_drop));
        let before = DROPPED.load(Ordering::SeqCst);
        std::thread::spawn(move || {
            assert_eq!(set_specific(key, as_value(5)), EnclaveResult::Ok);
        })
        .join()
        .unwrap();
        assert_eq!(DROPPED.load(Ordering::SeqCst), before + 5);
        assert_eq!(key_delete(key), EnclaveResult::Ok);
    }

    static RESTORES: AtomicUsize = AtomicUsize::new(0);
    static RESTORE_KEY: AtomicU32 = AtomicU32::new(0);

    unsafe extern "C" fn restore_forever(value: *mut c_void) {
        RESTORES.fetch_add(1, Ordering::SeqCst);
        let key = ThreadKey::from_raw(RESTORE_KEY.load(Ordering::SeqCst));
        let _ = set_specific(key, value);
    }

    #[test]
    fn destructor_passes_are_bounded() {
        let _guard = TEST_LOCK.lock();
        let key = create(Some(restore_forever));
        RESTORE_KEY.store(key.into_raw(), Ordering::SeqCst);
        RESTORES.store(0, Ordering::SeqCst);
        std::thread::spawn(move || {
            assert_eq!(set_specific(key, as_value(9)), EnclaveResult::Ok);
        })
        .join()
        .unwrap();
        assert_eq!(RESTORES.load(Ordering::SeqCst), DESTRUCTOR_ITERATIONS);
        assert_eq!(key_delete(key), EnclaveResult::Ok);
    }
}

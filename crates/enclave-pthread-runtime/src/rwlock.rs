//! Reader-writer lock with a single unlock entry point.
//!
//! Readers wait only while a writer holds the lock, so a steady stream of
//! readers can starve a writer. Reader identities are not tracked: `unlock`
//! from a thread that is not the writer releases one read hold.

use std::mem::MaybeUninit;

use parking_lot::{Condvar, Mutex};

use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::result::EnclaveResult;
use crate::thread;

#[derive(Debug, Default)]
struct RwState {
    readers: u32,
    /// Raw thread id of the writer, 0 when none.
    writer: u64,
    /// Threads parked in `read_lock` or `write_lock`.
    waiters: u32,
}

#[derive(Debug)]
pub struct EnclaveRwLock {
    state: Mutex<RwState>,
    wake: Condvar,
}

impl EnclaveRwLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: parking_lot::const_mutex(RwState {
                readers: 0,
                writer: 0,
                waiters: 0,
            }),
            wake: Condvar::new(),
        }
    }
}

impl Default for EnclaveRwLock {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init(rwlock: Option<&mut MaybeUninit<EnclaveRwLock>>) -> EnclaveResult {
    let Some(slot) = rwlock else {
        return EnclaveResult::InvalidParameter;
    };
    slot.write(EnclaveRwLock::new());
    EnclaveResult::Ok
}

/// Take a shared hold. [`EnclaveResult::Busy`] if the caller is the writer.
pub fn read_lock(rwlock: Option<&EnclaveRwLock>) -> EnclaveResult {
    let Some(rw) = rwlock else {
        return EnclaveResult::InvalidParameter;
    };
    let me = thread::current_id();
    let mut st = rw.state.lock();
    if st.writer == me {
        return EnclaveResult::Busy;
    }
    while st.writer != 0 {
        RuntimeMetrics::inc(&global_metrics().rwlock_waits);
        st.waiters += 1;
        rw.wake.wait(&mut st);
        st.waiters -= 1;
    }
    st.readers += 1;
    EnclaveResult::Ok
}

/// Take the exclusive hold. [`EnclaveResult::Busy`] if the caller already has it.
pub fn write_lock(rwlock: Option<&EnclaveRwLock>) -> EnclaveResult {
    let Some(rw) = rwlock else {
        return EnclaveResult::InvalidParameter;
    };
    let me = thread::current_id();
    let mut st = rw.state.lock();
    if st.writer == me {
        return EnclaveResult::Busy;
    }
    while st.writer != 0 || st.readers > 0 {
        RuntimeMetrics::inc(&global_metrics().rwlock_waits);
        st.waiters += 1;
        rw.wake.wait(&mut st);
        st.waiters -= 1;
    }
    st.writer = me;
    EnclaveResult::Ok
}

/// Release whichever hold the caller has: the write hold if it is the
/// writer, otherwise one read hold.
pub fn unlock(rwlock: Option<&EnclaveRwLock>) -> EnclaveResult {
    let Some(rw) = rwlock else {
        return EnclaveResult::InvalidParameter;
    };
    let me = thread::current_id();
    let mut st = rw.state.lock();
    if st.writer == me {
        st.writer = 0;
    } else if st.writer == 0 && st.readers > 0 {
        st.readers -= 1;
        if st.readers > 0 {
            return EnclaveResult::Ok;
        }
    } else {
        return EnclaveResult::NotOwner;
    }
    if st.waiters > 0 {
        rw.wake.notify_all();
    }
    EnclaveResult::Ok
}

/// Finalize. [`EnclaveResult::Busy`] while held or waited on.
pub fn destroy(rwlock: Option<&EnclaveRwLock>) -> EnclaveResult {
    let Some(rw) = rwlock else {
        return EnclaveResult::InvalidParameter;
    };
    let st = rw.state.lock();
    if st.readers > 0 || st.writer != 0 || st.waiters > 0 {
        return EnclaveResult::Busy;
    }
    EnclaveResult::Ok
}

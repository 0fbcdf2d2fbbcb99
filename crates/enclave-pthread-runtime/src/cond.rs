//! Condition variable over [`EnclaveMutex`].
//!
//! Waiters take a ticket on entry. `signal` releases the oldest unreleased
//! ticket and `broadcast` releases every ticket issued so far, so a thread
//! that starts waiting after a wakeup was granted can never consume it. A
//! waiter takes its ticket while still owning the mutex and only then
//! releases it, so a signal from a thread that acquires the mutex afterwards
//! cannot be lost.

use std::mem::MaybeUninit;

use parking_lot::{Condvar, Mutex};

use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::mutex::EnclaveMutex;
use crate::result::EnclaveResult;

#[derive(Debug, Default)]
struct CondState {
    /// Threads inside `wait`, released or not.
    waiters: u32,
    /// Next ticket to hand out.
    issued: u64,
    /// Tickets below this value are released. Never exceeds `issued`.
    released: u64,
}

#[derive(Debug)]
pub struct EnclaveCond {
    state: Mutex<CondState>,
    wake: Condvar,
}

impl EnclaveCond {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: parking_lot::const_mutex(CondState {
                waiters: 0,
                issued: 0,
                released: 0,
            }),
            wake: Condvar::new(),
        }
    }
}

impl Default for EnclaveCond {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init(cond: Option<&mut MaybeUninit<EnclaveCond>>) -> EnclaveResult {
    let Some(slot) = cond else {
        return EnclaveResult::InvalidParameter;
    };
    slot.write(EnclaveCond::new());
    EnclaveResult::Ok
}

/// Release `mutex`, sleep until signalled, then reacquire `mutex`.
///
/// The caller must own `mutex`; otherwise [`EnclaveResult::NotOwner`] and
/// nothing is released. Recursion depth is restored on return.
pub fn wait(cond: Option<&EnclaveCond>, mutex: Option<&EnclaveMutex>) -> EnclaveResult {
    let (Some(c), Some(m)) = (cond, mutex) else {
        return EnclaveResult::InvalidParameter;
    };

    let mut st = c.state.lock();
    let depth = match m.release_all() {
        Ok(depth) => depth,
        Err(rc) => return rc,
    };
    RuntimeMetrics::inc(&global_metrics().cond_waits);
    let ticket = st.issued;
    st.issued += 1;
    st.waiters += 1;
    while ticket >= st.released {
        c.wake.wait(&mut st);
    }
    st.waiters -= 1;
    drop(st);

    m.reacquire(depth);
    EnclaveResult::Ok
}

/// Wake the longest-waiting thread blocked at the time of the call, if any.
pub fn signal(cond: Option<&EnclaveCond>) -> EnclaveResult {
    let Some(c) = cond else {
        return EnclaveResult::InvalidParameter;
    };
    let mut st = c.state.lock();
    if st.released < st.issued {
        st.released += 1;
        RuntimeMetrics::inc(&global_metrics().cond_wakes);
        // The parking layer cannot target one ticket; others re-check and sleep.
        c.wake.notify_all();
    }
    EnclaveResult::Ok
}

/// Wake every thread currently waiting.
pub fn broadcast(cond: Option<&EnclaveCond>) -> EnclaveResult {
    let Some(c) = cond else {
        return EnclaveResult::InvalidParameter;
    };
    let mut st = c.state.lock();
    let pending = st.issued - st.released;
    if pending > 0 {
        st.released = st.issued;
        RuntimeMetrics::add(&global_metrics().cond_wakes, pending);
        c.wake.notify_all();
    }
    EnclaveResult::Ok
}

/// Finalize. [`EnclaveResult::Busy`] while threads wait on it.
pub fn destroy(cond: Option<&EnclaveCond>) -> EnclaveResult {
    let Some(c) = cond else {
        return EnclaveResult::InvalidParameter;
    };
    if c.state.lock().waiters > 0 {
        return EnclaveResult::Busy;
    }
    EnclaveResult::Ok
}

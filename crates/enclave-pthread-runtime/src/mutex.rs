//! Owner-tracked recursive mutex.
//!
//! This is the runtime's only mutex behavior: the owner may relock (depth is
//! counted), non-owners block, and only the owner may unlock. Sleepers park on
//! an internal condvar; wake order is whatever the parking layer chooses, not
//! strict FIFO.

use std::mem::MaybeUninit;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::result::EnclaveResult;
use crate::thread;

#[derive(Debug, Default)]
struct MutexState {
    /// Raw thread id of the owner, 0 when free.
    owner: u64,
    /// Recursion depth held by `owner`.
    depth: u32,
    /// Threads parked in `lock`.
    waiters: u32,
}

#[derive(Debug)]
pub struct EnclaveMutex {
    state: Mutex<MutexState>,
    wake: Condvar,
}

impl EnclaveMutex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: parking_lot::const_mutex(MutexState {
                owner: 0,
                depth: 0,
                waiters: 0,
            }),
            wake: Condvar::new(),
        }
    }

    /// Whether the calling thread currently owns this mutex.
    #[must_use]
    pub fn held_by_current(&self) -> bool {
        self.state.lock().owner == thread::current_id()
    }

    fn acquire_locked(&self, st: &mut MutexGuard<'_, MutexState>, me: u64) {
        loop {
            if st.owner == 0 {
                st.owner = me;
                st.depth = 1;
                return;
            }
            if st.owner == me {
                st.depth += 1;
                return;
            }
            RuntimeMetrics::inc(&global_metrics().mutex_waits);
            st.waiters += 1;
            self.wake.wait(st);
            st.waiters -= 1;
        }
    }

    /// Drop ownership entirely and return the depth that was held.
    /// Used by condition waits, which must release every level.
    pub(crate) fn release_all(&self) -> Result<u32, EnclaveResult> {
        let me = thread::current_id();
        let mut st = self.state.lock();
        if st.owner != me {
            return Err(EnclaveResult::NotOwner);
        }
        let depth = st.depth;
        st.owner = 0;
        st.depth = 0;
        if st.waiters > 0 {
            RuntimeMetrics::inc(&global_metrics().mutex_wakes);
            self.wake.notify_one();
        }
        Ok(depth)
    }

    /// Reacquire after [`Self::release_all`], restoring `depth`.
    pub(crate) fn reacquire(&self, depth: u32) {
        let me = thread::current_id();
        let mut st = self.state.lock();
        self.acquire_locked(&mut st, me);
        st.depth = depth.max(1);
    }
}

impl Default for EnclaveMutex {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init(mutex: Option<&mut MaybeUninit<EnclaveMutex>>) -> EnclaveResult {
    let Some(slot) = mutex else {
        return EnclaveResult::InvalidParameter;
    };
    slot.write(EnclaveMutex::new());
    EnclaveResult::Ok
}

/// Block until the caller owns the mutex. Relocking by the owner nests.
pub fn lock(mutex: Option<&EnclaveMutex>) -> EnclaveResult {
    let Some(m) = mutex else {
        return EnclaveResult::InvalidParameter;
    };
    let me = thread::current_id();
    let mut st = m.state.lock();
    m.acquire_locked(&mut st, me);
    EnclaveResult::Ok
}

/// Acquire without blocking; [`EnclaveResult::Busy`] when another thread owns it.
pub fn try_lock(mutex: Option<&EnclaveMutex>) -> EnclaveResult {
    let Some(m) = mutex else {
        return EnclaveResult::InvalidParameter;
    };
    let me = thread::current_id();
    let mut st = m.state.lock();
    if st.owner == 0 {
        st.owner = me;
        st.depth = 1;
        EnclaveResult::Ok
    } else if st.owner == me {
        st.depth += 1;
        EnclaveResult::Ok
    } else {
        EnclaveResult::Busy
    }
}

pub fn unlock(mutex: Option<&EnclaveMutex>) -> EnclaveResult {
    let Some(m) = mutex else {
        return EnclaveResult::InvalidParameter;
    };
    let me = thread::current_id();
    let mut st = m.state.lock();
    if st.owner != me {
        return EnclaveResult::NotOwner;
    }
    st.depth -= 1;
    if st.depth == 0 {
        st.owner = 0;
        if st.waiters > 0 {
            RuntimeMetrics::inc(&global_metrics().mutex_wakes);
            m.wake.notify_one();
        }
    }
    EnclaveResult::Ok
}

/// Finalize. [`EnclaveResult::Busy`] while owned or while threads wait on it.
pub fn destroy(mutex: Option<&EnclaveMutex>) -> EnclaveResult {
    let Some(m) = mutex else {
        return EnclaveResult::InvalidParameter;
    };
    let st = m.state.lock();
    if st.owner != 0 || st.waiters > 0 {
        return EnclaveResult::Busy;
    }
    EnclaveResult::Ok
}

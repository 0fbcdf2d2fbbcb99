//! Busy-wait lock.
//!
//! A single atomic word: 0 = free, 1 = held. Unlock does not check ownership.

use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::spin_policy;
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::result::EnclaveResult;

const FREE: u32 = 0;
const HELD: u32 = 1;

#[derive(Debug)]
#[repr(transparent)]
pub struct EnclaveSpinlock {
    word: AtomicU32,
}

impl EnclaveSpinlock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(FREE),
        }
    }
}

impl Default for EnclaveSpinlock {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init(spinlock: Option<&mut MaybeUninit<EnclaveSpinlock>>) -> EnclaveResult {
    let Some(slot) = spinlock else {
        return EnclaveResult::InvalidParameter;
    };
    slot.write(EnclaveSpinlock::new());
    EnclaveResult::Ok
}

/// Acquire, waiting according to the configured [`crate::SpinPolicy`].
pub fn lock(spinlock: Option<&EnclaveSpinlock>) -> EnclaveResult {
    let Some(lock) = spinlock else {
        return EnclaveResult::InvalidParameter;
    };
    if lock
        .word
        .compare_exchange(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
    {
        return EnclaveResult::Ok;
    }

    RuntimeMetrics::inc(&global_metrics().spin_contended);
    let policy = spin_policy();
    let mut round = 0u32;
    loop {
        // Test before test-and-set so waiters only read the shared line.
        while lock.word.load(Ordering::Relaxed) != FREE {
            policy.relax(round);
            round = round.saturating_add(1);
        }
        if lock
            .word
            .compare_exchange_weak(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return EnclaveResult::Ok;
        }
    }
}

pub fn unlock(spinlock: Option<&EnclaveSpinlock>) -> EnclaveResult {
    let Some(lock) = spinlock else {
        return EnclaveResult::InvalidParameter;
    };
    lock.word.store(FREE, Ordering::Release);
    EnclaveResult::Ok
}

pub fn destroy(spinlock: Option<&EnclaveSpinlock>) -> EnclaveResult {
    if spinlock.is_none() {
        return EnclaveResult::InvalidParameter;
    }
    EnclaveResult::Ok
}

//! Run-exactly-once flag.
//!
//! One atomic word: 0 = not run, 1 = running, 2 = done. The caller that moves
//! the word from 0 to 1 runs the procedure; everyone else waits (per the
//! configured spin policy) until it reads 2. Later callers return immediately.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::spin_policy;
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::result::EnclaveResult;

/// Procedure registered with a once flag.
pub type OnceFn = unsafe extern "C" fn();

const NEW: u32 = 0;
const RUNNING: u32 = 1;
const DONE: u32 = 2;

#[derive(Debug)]
#[repr(transparent)]
pub struct EnclaveOnce {
    state: AtomicU32,
}

impl EnclaveOnce {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(NEW),
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }
}

impl Default for EnclaveOnce {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `func` unless some caller sharing `once` already has.
///
/// Returns only after the procedure has completed, whoever ran it.
pub fn once(once: Option<&EnclaveOnce>, func: Option<OnceFn>) -> EnclaveResult {
    let (Some(flag), Some(func)) = (once, func) else {
        return EnclaveResult::InvalidParameter;
    };

    match flag
        .state
        .compare_exchange(NEW, RUNNING, Ordering::Acquire, Ordering::Acquire)
    {
        Ok(_) => {
            // SAFETY: the caller registered `func` as a callable procedure.
            unsafe { func() };
            RuntimeMetrics::inc(&global_metrics().once_runs);
            flag.state.store(DONE, Ordering::Release);
            EnclaveResult::Ok
        }
        Err(DONE) => EnclaveResult::Ok,
        Err(_) => {
            RuntimeMetrics::inc(&global_metrics().once_waits);
            let policy = spin_policy();
            let mut round = 0u32;
            while flag.state.load(Ordering::Acquire) != DONE {
                policy.relax(round);
                round = round.saturating_add(1);
            }
            EnclaveResult::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn bump() {
        RUNS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn runs_exactly_once_under_race() {
        const RACERS: usize = 8;
        let flag = Arc::new(EnclaveOnce::new());
        let barrier = Arc::new(Barrier::new(RACERS));
        let before = RUNS.load(Ordering::SeqCst);

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let flag = Arc::clone(&flag);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    assert_eq!(once(Some(&flag), Some(bump)), EnclaveResult::Ok);
                    assert!(flag.is_completed());
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(RUNS.load(Ordering::SeqCst), before + 1);
        assert_eq!(once(Some(&flag), Some(bump)), EnclaveResult::Ok);
        assert_eq!(RUNS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn missing_flag_or_procedure_is_invalid() {
        let flag = EnclaveOnce::new();
        assert_eq!(once(None, Some(bump)), EnclaveResult::InvalidParameter);
        assert_eq!(once(Some(&flag), None), EnclaveResult::InvalidParameter);
        assert!(!flag.is_completed());
    }
}

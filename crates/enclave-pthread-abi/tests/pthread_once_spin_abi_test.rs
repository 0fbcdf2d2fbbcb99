#![cfg(target_os = "linux")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use enclave_pthread_abi::pthread_abi::{
    pthread_once, pthread_spin_destroy, pthread_spin_init, pthread_spin_lock, pthread_spin_unlock,
};

static INIT_RUNS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn init_routine() {
    INIT_RUNS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn once_runs_exactly_once_across_racing_threads() {
    const RACERS: usize = 8;
    static ONCE: AtomicUsize = AtomicUsize::new(0);
    let once_storage: &'static mut libc::pthread_once_t =
        Box::leak(Box::new(libc::PTHREAD_ONCE_INIT));
    let addr = once_storage as *mut libc::pthread_once_t as usize;
    let barrier = Arc::new(Barrier::new(RACERS));

    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                // SAFETY: the once flag is leaked and lives for the process.
                let rc = unsafe { pthread_once(addr as *mut libc::pthread_once_t, Some(init_routine)) };
                assert_eq!(rc, 0);
                // The effect is visible to every caller once pthread_once returns.
                assert_eq!(INIT_RUNS.load(Ordering::SeqCst), 1);
                ONCE.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(ONCE.load(Ordering::SeqCst), RACERS);
    assert_eq!(INIT_RUNS.load(Ordering::SeqCst), 1);

    // SAFETY: as above.
    let rc = unsafe { pthread_once(addr as *mut libc::pthread_once_t, Some(init_routine)) };
    assert_eq!(rc, 0);
    assert_eq!(INIT_RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn once_with_null_routine_is_einval() {
    let mut flag: libc::pthread_once_t = libc::PTHREAD_ONCE_INIT;
    assert_eq!(unsafe { pthread_once(&mut flag, None) }, libc::EINVAL);
}

#[test]
fn spinlock_roundtrip() {
    let mut lock: libc::pthread_spinlock_t = 0;
    unsafe {
        assert_eq!(pthread_spin_init(&mut lock, libc::PTHREAD_PROCESS_PRIVATE), 0);
        assert_eq!(pthread_spin_lock(&mut lock), 0);
        assert_eq!(pthread_spin_unlock(&mut lock), 0);
        assert_eq!(pthread_spin_destroy(&mut lock), 0);
    }
}

#[test]
fn spinlock_ignores_pshared_and_excludes_threads() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 1_000;
    let lock: &'static mut libc::pthread_spinlock_t = Box::leak(Box::new(-1));
    let addr = lock as *mut libc::pthread_spinlock_t as usize;
    unsafe {
        assert_eq!(
            pthread_spin_init(addr as *mut libc::pthread_spinlock_t, libc::PTHREAD_PROCESS_SHARED),
            0
        );
    }

    let counter = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                let lock = addr as *mut libc::pthread_spinlock_t;
                for _ in 0..ROUNDS {
                    // SAFETY: the lock is leaked and lives for the process.
                    unsafe { assert_eq!(pthread_spin_lock(lock), 0) };
                    // Non-atomic read-modify-write under the lock.
                    let v = counter.load(Ordering::Relaxed);
                    counter.store(v + 1, Ordering::Relaxed);
                    // SAFETY: as above.
                    unsafe { assert_eq!(pthread_spin_unlock(lock), 0) };
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), THREADS * ROUNDS);
}

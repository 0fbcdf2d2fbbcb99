//! Cross-module concurrency checks for the runtime primitives.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use enclave_pthread_runtime::{
    EnclaveCond, EnclaveMutex, EnclaveResult, EnclaveRwLock, EnclaveThread, cond,
    global_metrics, mutex, rwlock, thread, tls,
};

#[test]
fn mutex_excludes_concurrent_increments() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 2_000;
    let shared = Arc::new((EnclaveMutex::new(), AtomicUsize::new(0)));
    let before = global_metrics().snapshot();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                let (m, counter) = &*shared;
                for _ in 0..ROUNDS {
                    assert_eq!(mutex::lock(Some(m)), EnclaveResult::Ok);
                    let v = counter.load(Ordering::Relaxed);
                    counter.store(v + 1, Ordering::Relaxed);
                    assert_eq!(mutex::unlock(Some(m)), EnclaveResult::Ok);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(shared.1.load(Ordering::SeqCst), THREADS * ROUNDS);
    assert_eq!(mutex::destroy(Some(&shared.0)), EnclaveResult::Ok);
    let after = global_metrics().snapshot();
    assert!(after.mutex_wakes >= before.mutex_wakes);
}

#[test]
fn rwlock_never_admits_writer_alongside_readers() {
    const READERS: usize = 4;
    const WRITERS: usize = 2;
    const ROUNDS: usize = 500;
    let shared = Arc::new((EnclaveRwLock::new(), AtomicUsize::new(0), AtomicUsize::new(0)));
    let start = Arc::new(Barrier::new(READERS + WRITERS));

    let mut handles = Vec::new();
    for _ in 0..READERS {
        let shared = Arc::clone(&shared);
        let start = Arc::clone(&start);
        handles.push(std::thread::spawn(move || {
            let (rw, readers, writers) = &*shared;
            start.wait();
            for _ in 0..ROUNDS {
                assert_eq!(rwlock::read_lock(Some(rw)), EnclaveResult::Ok);
                readers.fetch_add(1, Ordering::SeqCst);
                assert_eq!(writers.load(Ordering::SeqCst), 0);
                readers.fetch_sub(1, Ordering::SeqCst);
                assert_eq!(rwlock::unlock(Some(rw)), EnclaveResult::Ok);
            }
        }));
    }
    for _ in 0..WRITERS {
        let shared = Arc::clone(&shared);
        let start = Arc::clone(&start);
        handles.push(std::thread::spawn(move || {
            let (rw, readers, writers) = &*shared;
            start.wait();
            for _ in 0..ROUNDS {
                assert_eq!(rwlock::write_lock(Some(rw)), EnclaveResult::Ok);
                assert_eq!(writers.fetch_add(1, Ordering::SeqCst), 0);
                assert_eq!(readers.load(Ordering::SeqCst), 0);
                writers.fetch_sub(1, Ordering::SeqCst);
                assert_eq!(rwlock::unlock(Some(rw)), EnclaveResult::Ok);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(rwlock::destroy(Some(&shared.0)), EnclaveResult::Ok);
}

#[test]
fn cond_wait_restores_recursive_depth() {
    let shared = Arc::new((EnclaveCond::new(), EnclaveMutex::new(), AtomicUsize::new(0)));
    let waiter = {
        let shared = Arc::clone(&shared);
        std::thread::spawn(move || {
            let (c, m, stage) = &*shared;
            assert_eq!(mutex::lock(Some(m)), EnclaveResult::Ok);
            assert_eq!(mutex::lock(Some(m)), EnclaveResult::Ok);
            stage.store(1, Ordering::SeqCst);
            while stage.load(Ordering::SeqCst) != 2 {
                assert_eq!(cond::wait(Some(c), Some(m)), EnclaveResult::Ok);
            }
            // Two levels held again: the first unlock keeps ownership.
            assert_eq!(mutex::unlock(Some(m)), EnclaveResult::Ok);
            assert!(m.held_by_current());
            assert_eq!(mutex::unlock(Some(m)), EnclaveResult::Ok);
        })
    };

    let (c, m, stage) = &*shared;
    while stage.load(Ordering::SeqCst) != 1 {
        std::thread::yield_now();
    }
    // Acquiring proves the waiter released every level.
    assert_eq!(mutex::lock(Some(m)), EnclaveResult::Ok);
    stage.store(2, Ordering::SeqCst);
    assert_eq!(cond::broadcast(Some(c)), EnclaveResult::Ok);
    assert_eq!(mutex::unlock(Some(m)), EnclaveResult::Ok);
    waiter.join().unwrap();
}

#[test]
fn thread_handles_differ_across_live_threads() {
    let barrier = Arc::new(Barrier::new(2));
    let other = {
        let barrier = Arc::clone(&barrier);
        std::thread::spawn(move || {
            let me = thread::current();
            barrier.wait();
            me.into_raw()
        })
    };
    let mine = thread::current();
    barrier.wait();
    let theirs = EnclaveThread::from_raw(other.join().unwrap());
    assert!(!thread::equal(mine, theirs));
    assert!(thread::equal(mine, thread::current()));
}

static DESTROYED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn tally(value: *mut c_void) {
    DESTROYED.fetch_add(value as usize, Ordering::SeqCst);
}

#[test]
fn tls_destructors_run_once_per_exiting_thread() {
    const THREADS: usize = 6;
    let mut key = MaybeUninit::uninit();
    assert_eq!(tls::key_create(Some(&mut key), Some(tally)), EnclaveResult::Ok);
    // SAFETY: key_create returned Ok.
    let key = unsafe { key.assume_init() };

    let handles: Vec<_> = (1..=THREADS)
        .map(|i| {
            std::thread::spawn(move || {
                assert_eq!(tls::set_specific(key, i as *const c_void), EnclaveResult::Ok);
                assert_eq!(tls::get_specific(key) as usize, i);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(DESTROYED.load(Ordering::SeqCst), (1..=THREADS).sum::<usize>());
    assert_eq!(tls::key_delete(key), EnclaveResult::Ok);
}

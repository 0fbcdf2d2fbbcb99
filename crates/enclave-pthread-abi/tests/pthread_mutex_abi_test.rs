#![cfg(target_os = "linux")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use enclave_pthread_abi::pthread_abi::{
    pthread_mutex_destroy, pthread_mutex_init, pthread_mutex_lock, pthread_mutex_trylock,
    pthread_mutex_unlock, pthread_mutexattr_destroy, pthread_mutexattr_init,
    pthread_mutexattr_settype,
};

static TEST_GUARD: Mutex<()> = Mutex::new(());

fn alloc_mutex_ptr() -> *mut libc::pthread_mutex_t {
    let boxed: Box<libc::pthread_mutex_t> = Box::new(unsafe { std::mem::zeroed() });
    Box::into_raw(boxed)
}

unsafe fn free_mutex_ptr(ptr: *mut libc::pthread_mutex_t) {
    // SAFETY: pointer was allocated with Box::into_raw in alloc_mutex_ptr.
    unsafe { drop(Box::from_raw(ptr)) };
}

#[test]
fn mutex_roundtrip_uncontended() {
    let _guard = TEST_GUARD.lock().unwrap();
    let mutex = alloc_mutex_ptr();
    unsafe {
        assert_eq!(pthread_mutex_init(mutex, std::ptr::null()), 0);
        assert_eq!(pthread_mutex_lock(mutex), 0);
        assert_eq!(pthread_mutex_unlock(mutex), 0);
        assert_eq!(pthread_mutex_trylock(mutex), 0);
        assert_eq!(pthread_mutex_unlock(mutex), 0);
        assert_eq!(pthread_mutex_destroy(mutex), 0);
        free_mutex_ptr(mutex);
    }
}

#[test]
fn trylock_held_by_other_thread_is_ebusy_without_blocking() {
    let _guard = TEST_GUARD.lock().unwrap();
    let mutex = alloc_mutex_ptr();
    unsafe {
        assert_eq!(pthread_mutex_init(mutex, std::ptr::null()), 0);
        assert_eq!(pthread_mutex_lock(mutex), 0);
    }

    let addr = mutex as usize;
    let (rc, unlock_rc) = std::thread::spawn(move || {
        let m = addr as *mut libc::pthread_mutex_t;
        // SAFETY: pointer identity is stable for test lifetime.
        unsafe { (pthread_mutex_trylock(m), pthread_mutex_unlock(m)) }
    })
    .join()
    .unwrap();
    assert_eq!(rc, libc::EBUSY);
    assert_eq!(unlock_rc, libc::EPERM);

    unsafe {
        assert_eq!(pthread_mutex_destroy(mutex), libc::EBUSY);
        assert_eq!(pthread_mutex_unlock(mutex), 0);
        assert_eq!(pthread_mutex_destroy(mutex), 0);
        free_mutex_ptr(mutex);
    }
}

#[test]
fn lock_blocks_until_owner_releases() {
    let _guard = TEST_GUARD.lock().unwrap();
    let mutex = alloc_mutex_ptr();
    unsafe {
        assert_eq!(pthread_mutex_init(mutex, std::ptr::null()), 0);
        assert_eq!(pthread_mutex_lock(mutex), 0);
    }

    let acquired = Arc::new(AtomicBool::new(false));
    let acquired_clone = Arc::clone(&acquired);
    let addr = mutex as usize;
    let handle = std::thread::spawn(move || {
        let m = addr as *mut libc::pthread_mutex_t;
        // SAFETY: pointer identity is stable for test lifetime.
        unsafe {
            assert_eq!(pthread_mutex_lock(m), 0);
            acquired_clone.store(true, Ordering::Release);
            assert_eq!(pthread_mutex_unlock(m), 0);
        }
    });

    std::thread::sleep(Duration::from_millis(20));
    assert!(!acquired.load(Ordering::Acquire), "lock acquired while held");
    unsafe {
        assert_eq!(pthread_mutex_unlock(mutex), 0);
    }
    handle.join().unwrap();
    assert!(acquired.load(Ordering::Acquire));

    unsafe {
        assert_eq!(pthread_mutex_destroy(mutex), 0);
        free_mutex_ptr(mutex);
    }
}

#[test]
fn unlock_of_unowned_mutex_is_eperm() {
    let _guard = TEST_GUARD.lock().unwrap();
    let mutex = alloc_mutex_ptr();
    unsafe {
        assert_eq!(pthread_mutex_init(mutex, std::ptr::null()), 0);
        assert_eq!(pthread_mutex_unlock(mutex), libc::EPERM);
        assert_eq!(pthread_mutex_destroy(mutex), 0);
        free_mutex_ptr(mutex);
    }
}

#[test]
fn attribute_type_has_no_effect_on_behavior() {
    let _guard = TEST_GUARD.lock().unwrap();
    let mut attr: libc::pthread_mutexattr_t = unsafe { std::mem::zeroed() };
    let mutex = alloc_mutex_ptr();
    unsafe {
        assert_eq!(pthread_mutexattr_init(&mut attr), 0);
        assert_eq!(pthread_mutexattr_settype(&mut attr, libc::PTHREAD_MUTEX_ERRORCHECK), 0);
        assert_eq!(pthread_mutexattr_settype(&mut attr, 0x7fff), 0);
        assert_eq!(pthread_mutex_init(mutex, &attr), 0);

        // The single fixed behavior nests for the owner, whatever was requested.
        assert_eq!(pthread_mutex_lock(mutex), 0);
        assert_eq!(pthread_mutex_lock(mutex), 0);
        assert_eq!(pthread_mutex_unlock(mutex), 0);
        assert_eq!(pthread_mutex_unlock(mutex), 0);
        assert_eq!(pthread_mutex_unlock(mutex), libc::EPERM);

        assert_eq!(pthread_mutex_destroy(mutex), 0);
        assert_eq!(pthread_mutexattr_destroy(&mut attr), 0);
        free_mutex_ptr(mutex);
    }
}

#[test]
fn init_accepts_garbage_storage() {
    let _guard = TEST_GUARD.lock().unwrap();
    let mutex = alloc_mutex_ptr();
    unsafe {
        std::ptr::write_bytes(mutex.cast::<u8>(), 0xA5, std::mem::size_of::<libc::pthread_mutex_t>());
        assert_eq!(pthread_mutex_init(mutex, std::ptr::null()), 0);
        assert_eq!(pthread_mutex_lock(mutex), 0);
        assert_eq!(pthread_mutex_unlock(mutex), 0);
        assert_eq!(pthread_mutex_destroy(mutex), 0);
        free_mutex_ptr(mutex);
    }
}

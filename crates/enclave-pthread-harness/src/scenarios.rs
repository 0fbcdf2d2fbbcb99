//! Smoke scenarios run through the C surface.
//!
//! Every scenario drives one primitive kind through init, acquire, release and
//! destroy via the `extern "C"` entry points and records each return value
//! against the one the contract requires.

use std::collections::BTreeMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use enclave_pthread_abi::layout::LAYOUT_REPORTS;
use enclave_pthread_abi::pthread_abi::*;
use enclave_pthread_core::pthread::mutex::{effective_behavior, strict_settype_errno};
use serde::Serialize;
use serde_json::{Value, json};

/// One checked call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StepRecord {
    pub symbol: &'static str,
    pub got: i32,
    pub expected: i32,
}

impl StepRecord {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.got == self.expected
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub steps: Vec<StepRecord>,
    /// Observations that are logged but not checked.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<&'static str, Value>,
}

impl ScenarioReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.steps.iter().all(StepRecord::passed)
    }

    /// First step whose result differed from the expectation.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| !s.passed())
    }
}

struct Recorder {
    report: ScenarioReport,
}

impl Recorder {
    fn new(name: &'static str) -> Self {
        Self {
            report: ScenarioReport {
                name,
                steps: Vec::new(),
                details: BTreeMap::new(),
            },
        }
    }

    fn step(&mut self, symbol: &'static str, got: i32, expected: i32) {
        self.report.steps.push(StepRecord {
            symbol,
            got,
            expected,
        });
    }

    fn check(&mut self, what: &'static str, ok: bool) {
        self.step(what, i32::from(ok), 1);
    }

    fn note(&mut self, key: &'static str, value: Value) {
        self.report.details.insert(key, value);
    }

    fn finish(self) -> ScenarioReport {
        self.report
    }
}

/// Heap storage for a `<pthread.h>` object shared across scoped threads.
struct Shared<T>(*mut T);

// SAFETY: the pointee is only accessed through the thread-safe entry points.
unsafe impl<T> Send for Shared<T> {}
// SAFETY: as above.
unsafe impl<T> Sync for Shared<T> {}

impl<T> Shared<T> {
    /// Zero-filled storage. Only used with libc pthread types, which are
    /// plain byte arrays.
    fn zeroed() -> Self {
        // SAFETY: every `T` used here is a libc pthread type, valid when zeroed.
        Self(Box::into_raw(Box::new(unsafe { std::mem::zeroed::<T>() })))
    }

    fn ptr(&self) -> *mut T {
        self.0
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // SAFETY: allocated by Box::into_raw in `zeroed`.
        unsafe { drop(Box::from_raw(self.0)) };
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn spinlock() -> ScenarioReport {
    let mut r = Recorder::new("spinlock");
    let mut lock: libc::pthread_spinlock_t = 0;
    // SAFETY: `lock` outlives every call below.
    unsafe {
        r.step("pthread_spin_init", pthread_spin_init(&mut lock, 0), 0);
        r.step("pthread_spin_lock", pthread_spin_lock(&mut lock), 0);
        r.step("pthread_spin_unlock", pthread_spin_unlock(&mut lock), 0);
        r.step("pthread_spin_destroy", pthread_spin_destroy(&mut lock), 0);
    }
    r.finish()
}

fn mutex() -> ScenarioReport {
    let mut r = Recorder::new("mutex");
    let m = Shared::<libc::pthread_mutex_t>::zeroed();
    // SAFETY: `m` outlives every call, including the scoped thread.
    unsafe {
        r.step("pthread_mutex_init", pthread_mutex_init(m.ptr(), std::ptr::null()), 0);
        r.step("pthread_mutex_lock", pthread_mutex_lock(m.ptr()), 0);
        let (busy, not_owner) = std::thread::scope(|s| {
            s.spawn(|| (pthread_mutex_trylock(m.ptr()), pthread_mutex_unlock(m.ptr())))
                .join()
                .unwrap_or((-1, -1))
        });
        r.step("pthread_mutex_trylock", busy, libc::EBUSY);
        r.step("pthread_mutex_unlock", not_owner, libc::EPERM);
        r.step("pthread_mutex_destroy", pthread_mutex_destroy(m.ptr()), libc::EBUSY);
        r.step("pthread_mutex_unlock", pthread_mutex_unlock(m.ptr()), 0);
        r.step("pthread_mutex_trylock", pthread_mutex_trylock(m.ptr()), 0);
        r.step("pthread_mutex_unlock", pthread_mutex_unlock(m.ptr()), 0);
        r.step("pthread_mutex_destroy", pthread_mutex_destroy(m.ptr()), 0);
    }
    r.finish()
}

const REQUESTED_MUTEX_TYPES: [libc::c_int; 2] = [libc::PTHREAD_MUTEX_ERRORCHECK, -7];

fn mutex_attributes() -> ScenarioReport {
    let mut r = Recorder::new("mutex_attributes");
    let mut attr: libc::pthread_mutexattr_t = unsafe { std::mem::zeroed() };
    // SAFETY: `attr` outlives every call below.
    unsafe {
        r.step("pthread_mutexattr_init", pthread_mutexattr_init(&mut attr), 0);
        for kind in REQUESTED_MUTEX_TYPES {
            r.step("pthread_mutexattr_settype", pthread_mutexattr_settype(&mut attr, kind), 0);
        }
        r.step("pthread_mutexattr_destroy", pthread_mutexattr_destroy(&mut attr), 0);
    }
    // What a strict implementation would have said, next to what was granted.
    let requested: Vec<Value> = REQUESTED_MUTEX_TYPES
        .into_iter()
        .map(|kind| {
            json!({
                "kind": kind,
                "strict_errno": strict_settype_errno(kind),
                "behavior": format!("{:?}", effective_behavior(kind)),
            })
        })
        .collect();
    r.note("requested_types", Value::Array(requested));
    r.finish()
}

fn rwlock() -> ScenarioReport {
    let mut r = Recorder::new("rwlock");
    let rw = Shared::<libc::pthread_rwlock_t>::zeroed();
    // SAFETY: `rw` outlives every call below.
    unsafe {
        r.step("pthread_rwlock_init", pthread_rwlock_init(rw.ptr(), std::ptr::null()), 0);
        r.step("pthread_rwlock_rdlock", pthread_rwlock_rdlock(rw.ptr()), 0);
        r.step("pthread_rwlock_rdlock", pthread_rwlock_rdlock(rw.ptr()), 0);
        r.step("pthread_rwlock_unlock", pthread_rwlock_unlock(rw.ptr()), 0);
        r.step("pthread_rwlock_unlock", pthread_rwlock_unlock(rw.ptr()), 0);
        r.step("pthread_rwlock_wrlock", pthread_rwlock_wrlock(rw.ptr()), 0);
        r.step("pthread_rwlock_destroy", pthread_rwlock_destroy(rw.ptr()), libc::EBUSY);
        r.step("pthread_rwlock_unlock", pthread_rwlock_unlock(rw.ptr()), 0);
        r.step("pthread_rwlock_destroy", pthread_rwlock_destroy(rw.ptr()), 0);
    }
    r.finish()
}

fn cond() -> ScenarioReport {
    let mut r = Recorder::new("cond");
    let c = Shared::<libc::pthread_cond_t>::zeroed();
    let m = Shared::<libc::pthread_mutex_t>::zeroed();
    let ready = AtomicBool::new(false);
    // SAFETY: `c` and `m` outlive every call, including the scoped thread.
    unsafe {
        r.step("pthread_cond_init", pthread_cond_init(c.ptr(), std::ptr::null()), 0);
        r.step("pthread_mutex_init", pthread_mutex_init(m.ptr(), std::ptr::null()), 0);
        r.step("pthread_cond_wait", pthread_cond_wait(c.ptr(), m.ptr()), libc::EPERM);

        let waited = std::thread::scope(|s| {
            let waiter = s.spawn(|| {
                let mut rc = pthread_mutex_lock(m.ptr());
                while rc == 0 && !ready.load(Ordering::SeqCst) {
                    rc = pthread_cond_wait(c.ptr(), m.ptr());
                }
                let unlock = pthread_mutex_unlock(m.ptr());
                if rc == 0 { unlock } else { rc }
            });
            let lock = pthread_mutex_lock(m.ptr());
            ready.store(true, Ordering::SeqCst);
            let signal = pthread_cond_signal(c.ptr());
            let unlock = pthread_mutex_unlock(m.ptr());
            let waiter_rc = waiter.join().unwrap_or(-1);
            [lock, signal, unlock, waiter_rc]
        });
        r.step("pthread_mutex_lock", waited[0], 0);
        r.step("pthread_cond_signal", waited[1], 0);
        r.step("pthread_mutex_unlock", waited[2], 0);
        r.step("pthread_cond_wait", waited[3], 0);

        r.step("pthread_cond_broadcast", pthread_cond_broadcast(c.ptr()), 0);
        r.step("pthread_cond_destroy", pthread_cond_destroy(c.ptr()), 0);
        r.step("pthread_mutex_destroy", pthread_mutex_destroy(m.ptr()), 0);
    }
    r.finish()
}

static ONCE_RUNS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn count_once() {
    ONCE_RUNS.fetch_add(1, Ordering::SeqCst);
}

fn once() -> ScenarioReport {
    let mut r = Recorder::new("once");
    let flag = Shared::<libc::pthread_once_t>::zeroed();
    let before = ONCE_RUNS.load(Ordering::SeqCst);
    // SAFETY: `flag` outlives every call, including the scoped threads.
    let rcs: Vec<i32> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| unsafe { pthread_once(flag.ptr(), Some(count_once)) }))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap_or(-1)).collect()
    });
    for rc in rcs {
        r.step("pthread_once", rc, 0);
    }
    r.check(
        "procedure ran exactly once",
        ONCE_RUNS.load(Ordering::SeqCst) == before + 1,
    );
    r.finish()
}

fn identity() -> ScenarioReport {
    let mut r = Recorder::new("identity");
    // SAFETY: identity entry points take no pointers.
    unsafe {
        let me = pthread_self();
        r.check("pthread_equal(self, self)", pthread_equal(me, pthread_self()) != 0);
        let other = std::thread::scope(|s| {
            let h = s.spawn(|| pthread_self());
            h.join().unwrap_or(me)
        });
        r.check("pthread_equal(self, other)", pthread_equal(me, other) == 0);
    }
    r.finish()
}

fn thread_local_storage() -> ScenarioReport {
    let mut r = Recorder::new("thread_local_storage");
    let mut key: libc::pthread_key_t = 0;
    let value = 0x5eed_usize as *const c_void;
    // SAFETY: `key` outlives the create call; the rest take it by value.
    unsafe {
        r.step("pthread_key_create", pthread_key_create(&mut key, None), 0);
        r.step("pthread_setspecific", pthread_setspecific(key, value), 0);
        r.check(
            "pthread_getspecific returns stored value",
            pthread_getspecific(key) as usize == value as usize,
        );
        let other_saw_null = std::thread::scope(|s| {
            s.spawn(|| pthread_getspecific(key).is_null())
                .join()
                .unwrap_or(false)
        });
        r.check("other thread sees its own empty slot", other_saw_null);
        r.step("pthread_key_delete", pthread_key_delete(key), 0);
        r.step("pthread_key_delete", pthread_key_delete(key), libc::EINVAL);
    }
    r.finish()
}

fn layout() -> ScenarioReport {
    let mut r = Recorder::new("layout");
    for report in LAYOUT_REPORTS {
        r.check(report.standard, report.holds());
        r.note(
            report.standard,
            json!(format!(
                "{} {} {} ({} vs {} bytes)",
                report.standard,
                report.relation.symbol(),
                report.internal,
                report.standard_size,
                report.internal_size,
            )),
        );
    }
    r.finish()
}

/// Run every smoke scenario in order.
#[must_use]
pub fn run_smoke() -> Vec<ScenarioReport> {
    vec![
        layout(),
        spinlock(),
        mutex(),
        mutex_attributes(),
        rwlock(),
        cond(),
        once(),
        identity(),
        thread_local_storage(),
    ]
}

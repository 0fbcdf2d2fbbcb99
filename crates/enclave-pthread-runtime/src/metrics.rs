//! Atomic counters for runtime observability.
//!
//! All counters use relaxed ordering; they are diagnostic only,
//! not synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global runtime counters, bumped by the primitives themselves.
pub struct RuntimeMetrics {
    /// Mutex lock attempts that had to sleep.
    pub mutex_waits: AtomicU64,
    /// Mutex unlocks that woke a sleeper.
    pub mutex_wakes: AtomicU64,
    /// Spinlock acquisitions that found the lock held.
    pub spin_contended: AtomicU64,
    /// Read or write lock attempts that had to sleep.
    pub rwlock_waits: AtomicU64,
    /// Condition waits entered.
    pub cond_waits: AtomicU64,
    /// Waiters released by signal or broadcast.
    pub cond_wakes: AtomicU64,
    /// Once procedures executed.
    pub once_runs: AtomicU64,
    /// Once callers that waited for another caller's procedure.
    pub once_waits: AtomicU64,
    pub keys_created: AtomicU64,
    pub keys_deleted: AtomicU64,
    /// TLS destructors invoked at thread exit.
    pub destructors_run: AtomicU64,
}

impl RuntimeMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mutex_waits: AtomicU64::new(0),
            mutex_wakes: AtomicU64::new(0),
            spin_contended: AtomicU64::new(0),
            rwlock_waits: AtomicU64::new(0),
            cond_waits: AtomicU64::new(0),
            cond_wakes: AtomicU64::new(0),
            once_runs: AtomicU64::new(0),
            once_waits: AtomicU64::new(0),
            keys_created: AtomicU64::new(0),
            keys_deleted: AtomicU64::new(0),
            destructors_run: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mutex_waits: Self::get(&self.mutex_waits),
            mutex_wakes: Self::get(&self.mutex_wakes),
            spin_contended: Self::get(&self.spin_contended),
            rwlock_waits: Self::get(&self.rwlock_waits),
            cond_waits: Self::get(&self.cond_waits),
            cond_wakes: Self::get(&self.cond_wakes),
            once_runs: Self::get(&self.once_runs),
            once_waits: Self::get(&self.once_waits),
            keys_created: Self::get(&self.keys_created),
            keys_deleted: Self::get(&self.keys_deleted),
            destructors_run: Self::get(&self.destructors_run),
        }
    }
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all runtime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub mutex_waits: u64,
    pub mutex_wakes: u64,
    pub spin_contended: u64,
    pub rwlock_waits: u64,
    pub cond_waits: u64,
    pub cond_wakes: u64,
    pub once_runs: u64,
    pub once_waits: u64,
    pub keys_created: u64,
    pub keys_deleted: u64,
    pub destructors_run: u64,
}

/// Global metrics instance.
static GLOBAL_METRICS: RuntimeMetrics = RuntimeMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static RuntimeMetrics {
    &GLOBAL_METRICS
}

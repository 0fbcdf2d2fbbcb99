//! Thread identity.
//!
//! Each thread that asks for its identity receives a process-unique, non-zero
//! id on first use. Ids are never reused, so a handle stays unambiguous even
//! after its thread exits.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static SELF_ID: Cell<u64> = const { Cell::new(0) };
}

/// Opaque handle naming a thread of control.
///
/// Deliberately has no `PartialEq`: compare handles with [`equal`].
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct EnclaveThread(u64);

impl EnclaveThread {
    /// Rebuild a handle from its raw representation.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// Raw id of the calling thread, allocated lazily. Never zero.
pub(crate) fn current_id() -> u64 {
    SELF_ID.with(|slot| {
        let existing = slot.get();
        if existing != 0 {
            return existing;
        }
        let fresh = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        slot.set(fresh);
        fresh
    })
}

/// Handle of the calling thread.
#[must_use]
pub fn current() -> EnclaveThread {
    EnclaveThread(current_id())
}

/// Whether two handles name the same thread.
#[must_use]
pub fn equal(a: EnclaveThread, b: EnclaveThread) -> bool {
    a.0 == b.0
}

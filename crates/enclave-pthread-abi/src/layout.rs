//! Layout compatibility between `<pthread.h>` storage and runtime primitives.
//!
//! Caller-owned storage (stack, static or embedded in a larger struct) is
//! reinterpreted in place as the runtime primitive; nothing is allocated. For
//! each pairing this module asserts at compile time that
//!
//! - the standard type is at least as large as the internal one (exactly as
//!   large for the spinlock, once flag, thread handle and key),
//! - the standard type is at least as strictly aligned,
//! - the internal type needs no `Drop`, since the storage is never dropped
//!   in place.
//!
//! A pairing that does not hold on the target fails the build.

use std::mem::{MaybeUninit, align_of, needs_drop, size_of};

use enclave_pthread_runtime::{
    EnclaveCond, EnclaveMutex, EnclaveOnce, EnclaveRwLock, EnclaveSpinlock, EnclaveThread,
    ThreadKey,
};

/// How a standard type's size must relate to the internal type it aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRelation {
    /// Sizes are identical.
    Exact,
    /// Standard storage may be larger; trailing bytes are unused.
    AtLeast,
}

impl SizeRelation {
    #[must_use]
    pub const fn holds(self, standard: usize, internal: usize) -> bool {
        match self {
            Self::Exact => standard == internal,
            Self::AtLeast => standard >= internal,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Exact => "==",
            Self::AtLeast => ">=",
        }
    }
}

/// A standard-facing type whose storage can hold the runtime primitive `I`.
///
/// Generic over `I` because several standard types share one C
/// representation (`pthread_spinlock_t` and `pthread_once_t` are both `int`).
///
/// # Safety
///
/// Implementors must satisfy the size, alignment and no-drop relations
/// described in the module docs. `alias_storage!` checks them at compile
/// time.
pub unsafe trait PrimitiveStorage<I> {
    const RELATION: SizeRelation;
}

/// Whether `S` can host `I` on this target.
#[must_use]
pub const fn layout_holds<S: PrimitiveStorage<I>, I>() -> bool {
    S::RELATION.holds(size_of::<S>(), size_of::<I>())
        && align_of::<S>() >= align_of::<I>()
        && !needs_drop::<I>()
}

macro_rules! alias_storage {
    ($standard:ty => $internal:ty, $relation:ident) => {
        // SAFETY: the assertion below rejects any target where the layout
        // relations do not hold.
        unsafe impl PrimitiveStorage<$internal> for $standard {
            const RELATION: SizeRelation = SizeRelation::$relation;
        }

        const _: () = assert!(
            layout_holds::<$standard, $internal>(),
            concat!(
                stringify!($standard),
                " cannot host ",
                stringify!($internal)
            )
        );
    };
}

alias_storage!(libc::pthread_mutex_t => EnclaveMutex, AtLeast);
alias_storage!(libc::pthread_rwlock_t => EnclaveRwLock, AtLeast);
alias_storage!(libc::pthread_cond_t => EnclaveCond, AtLeast);
alias_storage!(libc::pthread_spinlock_t => EnclaveSpinlock, Exact);
alias_storage!(libc::pthread_once_t => EnclaveOnce, Exact);
alias_storage!(libc::pthread_t => EnclaveThread, Exact);
alias_storage!(libc::pthread_key_t => ThreadKey, Exact);

// ---------------------------------------------------------------------------
// Reinterpretation
// ---------------------------------------------------------------------------

/// View caller storage as the runtime primitive; `None` for a null pointer.
///
/// # Safety
///
/// A non-null `ptr` must point to live storage of type `S` that holds an
/// initialized internal value (or is zero-filled) for the whole of `'a`.
#[inline]
pub unsafe fn internal_ref<'a, S: PrimitiveStorage<I>, I>(ptr: *const S) -> Option<&'a I> {
    // SAFETY: caller contract; layout compatibility is asserted at compile time.
    unsafe { ptr.cast::<I>().as_ref() }
}

/// View caller storage as uninitialized room for the runtime primitive.
///
/// # Safety
///
/// A non-null `ptr` must point to live, writable storage of type `S` that no
/// other thread uses during `'a`.
#[inline]
pub unsafe fn internal_uninit<'a, S: PrimitiveStorage<I>, I>(
    ptr: *mut S,
) -> Option<&'a mut MaybeUninit<I>> {
    // SAFETY: caller contract; `MaybeUninit` makes no claim about the bytes.
    unsafe { ptr.cast::<MaybeUninit<I>>().as_mut() }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Sizes and alignments of one pairing, for the harness and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutReport {
    pub standard: &'static str,
    pub internal: &'static str,
    pub relation: SizeRelation,
    pub standard_size: usize,
    pub internal_size: usize,
    pub standard_align: usize,
    pub internal_align: usize,
}

impl LayoutReport {
    const fn of<S: PrimitiveStorage<I>, I>(standard: &'static str, internal: &'static str) -> Self {
        Self {
            standard,
            internal,
            relation: S::RELATION,
            standard_size: size_of::<S>(),
            internal_size: size_of::<I>(),
            standard_align: align_of::<S>(),
            internal_align: align_of::<I>(),
        }
    }

    #[must_use]
    pub const fn holds(&self) -> bool {
        self.relation.holds(self.standard_size, self.internal_size)
            && self.standard_align >= self.internal_align
    }
}

/// Every pairing the adapter relies on.
pub const LAYOUT_REPORTS: [LayoutReport; 7] = [
    LayoutReport::of::<libc::pthread_mutex_t, EnclaveMutex>("pthread_mutex_t", "EnclaveMutex"),
    LayoutReport::of::<libc::pthread_rwlock_t, EnclaveRwLock>("pthread_rwlock_t", "EnclaveRwLock"),
    LayoutReport::of::<libc::pthread_cond_t, EnclaveCond>("pthread_cond_t", "EnclaveCond"),
    LayoutReport::of::<libc::pthread_spinlock_t, EnclaveSpinlock>("pthread_spinlock_t", "EnclaveSpinlock"),
    LayoutReport::of::<libc::pthread_once_t, EnclaveOnce>("pthread_once_t", "EnclaveOnce"),
    LayoutReport::of::<libc::pthread_t, EnclaveThread>("pthread_t", "EnclaveThread"),
    LayoutReport::of::<libc::pthread_key_t, ThreadKey>("pthread_key_t", "ThreadKey"),
];

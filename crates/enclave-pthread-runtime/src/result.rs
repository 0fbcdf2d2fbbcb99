//! Closed result enumeration returned by every runtime primitive.

use std::fmt;

/// Outcome of an enclave runtime operation.
///
/// The discriminants are part of the runtime contract; raw codes outside this
/// set can still arrive from foreign callers and are handled by
/// [`EnclaveResult::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EnclaveResult {
    /// Operation completed.
    Ok = 0,
    /// Unspecified failure.
    Failure = 1,
    /// Null storage, unknown key, or missing callback.
    InvalidParameter = 2,
    /// The runtime could not reserve a resource (e.g. no free TLS key).
    OutOfMemory = 3,
    /// The primitive is held or has waiters.
    Busy = 4,
    /// The caller does not own the primitive it tried to release.
    NotOwner = 5,
    /// Internal state the runtime did not expect.
    Unexpected = 6,
    /// The runtime does not offer this capability.
    Unsupported = 7,
}

impl EnclaveResult {
    /// Every defined result code, in discriminant order.
    pub const ALL: [EnclaveResult; 8] = [
        Self::Ok,
        Self::Failure,
        Self::InvalidParameter,
        Self::OutOfMemory,
        Self::Busy,
        Self::NotOwner,
        Self::Unexpected,
        Self::Unsupported,
    ];

    /// Decode a raw result code. Returns `None` for codes outside the set.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Ok),
            1 => Some(Self::Failure),
            2 => Some(Self::InvalidParameter),
            3 => Some(Self::OutOfMemory),
            4 => Some(Self::Busy),
            5 => Some(Self::NotOwner),
            6 => Some(Self::Unexpected),
            7 => Some(Self::Unsupported),
            _ => None,
        }
    }

    /// Raw discriminant.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Stable lowercase name, used in logs and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failure => "failure",
            Self::InvalidParameter => "invalid-parameter",
            Self::OutOfMemory => "out-of-memory",
            Self::Busy => "busy",
            Self::NotOwner => "not-owner",
            Self::Unexpected => "unexpected",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for EnclaveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

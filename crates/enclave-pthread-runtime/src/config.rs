//! Runtime configuration.
//!
//! Two settings are read from the environment on first use and cached for the
//! life of the process:
//! - `ENCLAVE_PTHREAD_SPIN`: how spinlock and once waiters burn time while the
//!   primitive is held (`spin`, `adaptive` (default), `yield`).
//! - `ENCLAVE_PTHREAD_FATAL_DIAG`: whether unsupported entry points print a
//!   diagnostic line before aborting (`stderr` (default), `silent`).

use std::sync::atomic::{AtomicU8, Ordering};

/// Waiting strategy for busy-wait primitives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinPolicy {
    /// Pure pause-loop. Lowest latency, burns the core.
    Spin,
    /// Pause-loop for [`ADAPTIVE_SPIN_LIMIT`] iterations, then yield each round.
    #[default]
    Adaptive,
    /// Yield to the scheduler on every failed attempt.
    Yield,
}

/// Pause iterations before [`SpinPolicy::Adaptive`] starts yielding.
pub const ADAPTIVE_SPIN_LIMIT: u32 = 64;

impl SpinPolicy {
    /// Parse from string (case-insensitive). Unknown values give the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "spin" | "busy" | "pause" => Self::Spin,
            "yield" | "cooperative" => Self::Yield,
            _ => Self::Adaptive,
        }
    }

    /// Burn one waiting round. `round` counts failed attempts so far.
    pub fn relax(self, round: u32) {
        match self {
            Self::Spin => std::hint::spin_loop(),
            Self::Adaptive if round < ADAPTIVE_SPIN_LIMIT => std::hint::spin_loop(),
            Self::Adaptive | Self::Yield => std::thread::yield_now(),
        }
    }
}

/// What an unsupported entry point reports before aborting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalDiagnostics {
    /// One line on stderr naming the entry point.
    #[default]
    Stderr,
    /// Abort without output.
    Silent,
}

impl FatalDiagnostics {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" | "none" | "quiet" => Self::Silent,
            _ => Self::Stderr,
        }
    }
}

// Cache states: 0=unresolved, 255=resolving, anything else is a resolved value + 1.
// A non-blocking state machine instead of OnceLock so a reentrant call during
// resolution gets the default rather than waiting on itself.
const UNRESOLVED: u8 = 0;
const RESOLVING: u8 = 255;

struct CachedSetting {
    state: AtomicU8,
    var: &'static str,
}

impl CachedSetting {
    const fn new(var: &'static str) -> Self {
        Self {
            state: AtomicU8::new(UNRESOLVED),
            var,
        }
    }

    /// Resolve to an encoded value in `1..RESOLVING`, or `None` while another
    /// caller holds the resolution slot.
    fn get(&self, encode: impl FnOnce(Option<String>) -> u8) -> Option<u8> {
        let cached = self.state.load(Ordering::Acquire);
        if cached != UNRESOLVED && cached != RESOLVING {
            return Some(cached);
        }
        if cached == RESOLVING {
            return None;
        }
        if self
            .state
            .compare_exchange(UNRESOLVED, RESOLVING, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            let v = self.state.load(Ordering::Acquire);
            return (v != UNRESOLVED && v != RESOLVING).then_some(v);
        }
        let encoded = encode(std::env::var(self.var).ok());
        self.state.store(encoded, Ordering::Release);
        Some(encoded)
    }

    #[cfg(test)]
    fn force(&self, encoded: u8) -> u8 {
        self.state.swap(encoded, Ordering::SeqCst)
    }
}

static SPIN_POLICY: CachedSetting = CachedSetting::new("ENCLAVE_PTHREAD_SPIN");
static FATAL_DIAGNOSTICS: CachedSetting = CachedSetting::new("ENCLAVE_PTHREAD_FATAL_DIAG");

fn encode_spin(policy: SpinPolicy) -> u8 {
    match policy {
        SpinPolicy::Spin => 1,
        SpinPolicy::Adaptive => 2,
        SpinPolicy::Yield => 3,
    }
}

fn decode_spin(v: u8) -> SpinPolicy {
    match v {
        1 => SpinPolicy::Spin,
        3 => SpinPolicy::Yield,
        _ => SpinPolicy::Adaptive,
    }
}

fn encode_fatal(diag: FatalDiagnostics) -> u8 {
    match diag {
        FatalDiagnostics::Stderr => 1,
        FatalDiagnostics::Silent => 2,
    }
}

fn decode_fatal(v: u8) -> FatalDiagnostics {
    match v {
        2 => FatalDiagnostics::Silent,
        _ => FatalDiagnostics::Stderr,
    }
}

/// Configured spin policy (reads the environment on first call).
#[must_use]
pub fn spin_policy() -> SpinPolicy {
    SPIN_POLICY
        .get(|raw| {
            encode_spin(
                raw.as_deref()
                    .map(SpinPolicy::from_str_loose)
                    .unwrap_or_default(),
            )
        })
        .map(decode_spin)
        .unwrap_or_default()
}

/// Configured fatal diagnostics (reads the environment on first call).
#[must_use]
pub fn fatal_diagnostics() -> FatalDiagnostics {
    FATAL_DIAGNOSTICS
        .get(|raw| {
            encode_fatal(
                raw.as_deref()
                    .map(FatalDiagnostics::from_str_loose)
                    .unwrap_or_default(),
            )
        })
        .map(decode_fatal)
        .unwrap_or_default()
}

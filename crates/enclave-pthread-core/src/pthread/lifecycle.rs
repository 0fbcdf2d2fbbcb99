//! Lifecycle entry points the enclave cannot support.
//!
//! The enclave's thread pool is fixed when it is loaded, and no runtime
//! primitive offers a bounded wait. Each entry here is exported for source
//! compatibility and terminates the process when called.

use std::fmt;

/// An entry point that always aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedEntry {
    Create,
    Join,
    Detach,
    CondTimedWait,
}

impl UnsupportedEntry {
    pub const ALL: [UnsupportedEntry; 4] =
        [Self::Create, Self::Join, Self::Detach, Self::CondTimedWait];

    /// Exported C symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Create => "pthread_create",
            Self::Join => "pthread_join",
            Self::Detach => "pthread_detach",
            Self::CondTimedWait => "pthread_cond_timedwait",
        }
    }

    /// Short name used on the harness command line.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Join => "join",
            Self::Detach => "detach",
            Self::CondTimedWait => "timedwait",
        }
    }

    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Create | Self::Join | Self::Detach => {
                "the enclave thread pool is fixed at load time"
            }
            Self::CondTimedWait => "the enclave runtime has no bounded wait",
        }
    }

    /// Parse a short name or symbol, case-insensitively.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|entry| {
            s.eq_ignore_ascii_case(entry.short_name()) || s.eq_ignore_ascii_case(entry.symbol())
        })
    }
}

/// The one-line diagnostic written before aborting.
impl fmt::Display for UnsupportedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "enclave-pthread: {} is not supported ({}); aborting",
            self.symbol(),
            self.reason()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_distinct_pthread_names() {
        let mut seen = std::collections::HashSet::new();
        for entry in UnsupportedEntry::ALL {
            assert!(entry.symbol().starts_with("pthread_"));
            assert!(seen.insert(entry.symbol()));
        }
    }

    #[test]
    fn loose_parsing_accepts_short_names_and_symbols() {
        assert_eq!(
            UnsupportedEntry::from_str_loose("create"),
            Some(UnsupportedEntry::Create)
        );
        assert_eq!(
            UnsupportedEntry::from_str_loose(" PTHREAD_JOIN "),
            Some(UnsupportedEntry::Join)
        );
        assert_eq!(
            UnsupportedEntry::from_str_loose("timedwait"),
            Some(UnsupportedEntry::CondTimedWait)
        );
        assert_eq!(UnsupportedEntry::from_str_loose("cancel"), None);
    }

    #[test]
    fn diagnostic_names_symbol_and_reason() {
        let line = UnsupportedEntry::Detach.to_string();
        assert!(line.contains("pthread_detach"));
        assert!(line.contains("fixed at load time"));
        assert!(!line.contains('\n'));
    }
}

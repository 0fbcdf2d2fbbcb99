//! Harness error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown entry point '{0}' (expected create, join, detach or timedwait)")]
    UnknownEntry(String),
    #[error("failed to spawn probe for {symbol}: {source}")]
    Spawn {
        symbol: &'static str,
        #[source]
        source: std::io::Error,
    },
}

//! CLI entrypoint for the enclave pthread conformance harness.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use enclave_pthread_harness::errno_matrix::{errno_matrix, render_json};
use enclave_pthread_harness::{ArtifactIndex, HarnessError, LogEmitter, LogLevel, Outcome};

/// Conformance tooling for the enclave pthread adapter.
#[derive(Debug, Parser)]
#[command(name = "enclave-pthread-harness")]
#[command(about = "Conformance harness for the enclave pthread adapter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every internal result code with the errno it translates to.
    ErrnoMatrix {
        /// Output JSON path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drive each primitive kind through its lifecycle via the C surface.
    Smoke {
        /// Structured JSONL log path (if omitted, logs to stdout).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Call one unsupported entry point in this process. Never succeeds.
    ProbeFatal {
        /// Entry point: create, join, detach or timedwait.
        #[arg(long)]
        entry: String,
    },
    /// Run every unsupported entry point in an isolated child process.
    VerifyFatal {
        /// Structured JSONL log path (if omitted, logs to stdout).
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

fn run_id() -> String {
    format!("{}-{}", std::process::id(), now_secs())
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn open_log(path: Option<&Path>, run_id: &str) -> Result<LogEmitter, HarnessError> {
    match path {
        Some(path) => LogEmitter::to_file(path, run_id).map_err(|source| HarnessError::Output {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(LogEmitter::to_stdout(run_id)),
    }
}

/// Write `<log>.artifacts.json` next to a file log.
fn index_log(path: Option<&Path>, run_id: &str) -> Result<(), HarnessError> {
    let Some(path) = path else {
        return Ok(());
    };
    let mut index = ArtifactIndex::new(run_id);
    index.add_file(path, "jsonl_log")?;
    let mut index_path = path.as_os_str().to_owned();
    index_path.push(".artifacts.json");
    let index_path = PathBuf::from(index_path);
    std::fs::write(&index_path, index.to_json()?).map_err(|source| HarnessError::Output {
        path: index_path.clone(),
        source,
    })?;
    eprintln!("Artifact index written to {}", index_path.display());
    Ok(())
}

fn errno_matrix_cmd(output: Option<PathBuf>) -> Result<ExitCode, HarnessError> {
    let json = render_json(&errno_matrix())?;
    match output {
        Some(path) => {
            std::fs::write(&path, json).map_err(|source| HarnessError::Output {
                path: path.clone(),
                source,
            })?;
            eprintln!("Errno matrix written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(target_os = "linux")]
fn smoke_cmd(log: Option<PathBuf>) -> Result<ExitCode, HarnessError> {
    use enclave_pthread_harness::scenarios::run_smoke;
    use enclave_pthread_runtime::global_metrics;

    let run_id = run_id();
    let mut emitter = open_log(log.as_deref(), &run_id)?;
    let mut failed = 0usize;

    for report in run_smoke() {
        let passed = report.passed();
        if !passed {
            failed += 1;
        }
        let level = if passed { LogLevel::Info } else { LogLevel::Error };
        let mut entry = emitter
            .entry(level, "smoke_scenario")
            .with_outcome(Outcome::from_pass(passed))
            .with_details(serde_json::to_value(&report)?);
        if let Some(step) = report.first_failure() {
            entry = entry.with_symbol(step.symbol).with_errno(step.got);
        }
        emitter.emit_entry(entry)?;
    }

    let m = global_metrics().snapshot();
    let summary = emitter
        .entry(LogLevel::Info, "smoke_summary")
        .with_outcome(Outcome::from_pass(failed == 0))
        .with_details(serde_json::json!({
            "failed_scenarios": failed,
            "metrics": {
                "mutex_waits": m.mutex_waits,
                "mutex_wakes": m.mutex_wakes,
                "spin_contended": m.spin_contended,
                "rwlock_waits": m.rwlock_waits,
                "cond_waits": m.cond_waits,
                "cond_wakes": m.cond_wakes,
                "once_runs": m.once_runs,
                "once_waits": m.once_waits,
                "keys_created": m.keys_created,
                "keys_deleted": m.keys_deleted,
                "destructors_run": m.destructors_run,
            },
        }));
    emitter.emit_entry(summary)?;
    emitter.flush()?;
    drop(emitter);
    index_log(log.as_deref(), &run_id)?;

    if failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{failed} smoke scenario(s) failed");
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(target_os = "linux")]
fn probe_fatal_cmd(entry: &str) -> Result<ExitCode, HarnessError> {
    use enclave_pthread_core::pthread::UnsupportedEntry;
    use enclave_pthread_harness::fatal_probe::run_probe;

    let entry = UnsupportedEntry::from_str_loose(entry)
        .ok_or_else(|| HarnessError::UnknownEntry(entry.to_string()))?;
    let code = run_probe(entry);
    Ok(ExitCode::from(code as u8))
}

#[cfg(target_os = "linux")]
fn verify_fatal_cmd(log: Option<PathBuf>) -> Result<ExitCode, HarnessError> {
    use enclave_pthread_harness::fatal_probe::verify_all;

    let run_id = run_id();
    let exe = std::env::current_exe()?;
    let mut emitter = open_log(log.as_deref(), &run_id)?;
    let mut failed = 0usize;

    for verdict in verify_all(&exe)? {
        let passed = verdict.abnormal();
        if !passed {
            failed += 1;
        }
        let level = if passed { LogLevel::Info } else { LogLevel::Error };
        let mut entry = emitter
            .entry(level, "fatal_entry")
            .with_symbol(verdict.symbol)
            .with_outcome(Outcome::from_pass(passed))
            .with_details(serde_json::to_value(&verdict)?);
        if let Some(signal) = verdict.signal {
            entry = entry.with_signal(signal);
        }
        if let Some(code) = verdict.exit_code {
            entry = entry.with_exit_code(code);
        }
        emitter.emit_entry(entry)?;
    }
    emitter.flush()?;
    drop(emitter);
    index_log(log.as_deref(), &run_id)?;

    if failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{failed} unsupported entry point(s) did not terminate abnormally");
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported_host() -> Result<ExitCode, HarnessError> {
    eprintln!("this subcommand requires a Linux host");
    Ok(ExitCode::from(2))
}

fn main() -> Result<ExitCode, HarnessError> {
    let cli = Cli::parse();

    match cli.command {
        Command::ErrnoMatrix { output } => errno_matrix_cmd(output),
        #[cfg(target_os = "linux")]
        Command::Smoke { log } => smoke_cmd(log),
        #[cfg(target_os = "linux")]
        Command::ProbeFatal { entry } => probe_fatal_cmd(&entry),
        #[cfg(target_os = "linux")]
        Command::VerifyFatal { log } => verify_fatal_cmd(log),
        #[cfg(not(target_os = "linux"))]
        Command::Smoke { .. } | Command::ProbeFatal { .. } | Command::VerifyFatal { .. } => {
            unsupported_host()
        }
    }
}

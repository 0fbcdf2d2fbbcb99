#![cfg(target_os = "linux")]

use std::os::unix::process::ExitStatusExt;
use std::process::Command;

use enclave_pthread_core::pthread::UnsupportedEntry;
use enclave_pthread_harness::fatal_probe::{PROBE_RETURNED_EXIT, verify_entry};

fn harness() -> Command {
    Command::new(env!("CARGO_BIN_EXE_harness"))
}

#[test]
fn each_unsupported_entry_kills_its_process() {
    for entry in UnsupportedEntry::ALL {
        let output = harness()
            .args(["probe-fatal", "--entry", entry.short_name()])
            .env_remove("ENCLAVE_PTHREAD_FATAL_DIAG")
            .output()
            .unwrap();
        assert!(!output.status.success(), "{} returned normally", entry.symbol());
        assert_ne!(output.status.code(), Some(PROBE_RETURNED_EXIT), "{}", entry.symbol());
        assert_eq!(output.status.signal(), Some(libc::SIGABRT), "{}", entry.symbol());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains(entry.symbol()),
            "missing diagnostic for {}: {stderr}",
            entry.symbol()
        );
    }
}

#[test]
fn silent_diagnostics_still_abort() {
    let output = harness()
        .args(["probe-fatal", "--entry", "join"])
        .env("ENCLAVE_PTHREAD_FATAL_DIAG", "silent")
        .output()
        .unwrap();
    assert_eq!(output.status.signal(), Some(libc::SIGABRT));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("pthread_join"));
}

#[test]
fn verify_entry_classifies_abort_as_abnormal() {
    let exe = std::path::Path::new(env!("CARGO_BIN_EXE_harness"));
    let verdict = verify_entry(exe, UnsupportedEntry::CondTimedWait).unwrap();
    assert!(verdict.abnormal());
    assert!(verdict.aborted());
    assert!(
        verdict
            .diagnostic
            .as_deref()
            .is_some_and(|line| line.contains("pthread_cond_timedwait"))
    );
}

#[test]
fn verify_fatal_subcommand_succeeds() {
    let status = harness().arg("verify-fatal").output().unwrap().status;
    assert!(status.success());
}

#[test]
fn unknown_probe_entry_is_an_error_not_an_abort() {
    let output = harness()
        .args(["probe-fatal", "--entry", "cancel"])
        .output()
        .unwrap();
    assert_eq!(output.status.signal(), None);
    assert!(!output.status.success());
}

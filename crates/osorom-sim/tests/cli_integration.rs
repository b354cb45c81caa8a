//! Integration tests for the osorom-sim CLI.
#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs
)]

use osorom_core as _;
use osorom_sim as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_osorom-sim"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run osorom-sim")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn create_rom(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn builtin_programs_pass() {
    let output = run(&[]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("OSOROM simulator starting"));
    assert!(text.contains("Running test program #0: rotated-constants"));
    assert!(text.contains("PASS rotated-constants: halted after 2 packets (pc 0x8)"));
    assert!(text.contains("r = { 1, 40000000, 400, 200,"));
    assert!(text.contains("PASS infinite-loop: packet limit reached"));
    assert!(text.contains("Summary: 3 passed, 0 failed (total: 3)"));
    assert!(text.trim_end().ends_with("OSOROM simulator terminating"));
}

#[test]
fn literal_is_disassembled() {
    let output = run(&["0xD1183C00"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("Disassembling single instruction d1183c00 (3508026368):"));
    assert!(text.contains("(P3) BREAK 0x1f"));
}

#[test]
fn random_mode_is_bounded_and_seeded() {
    let first = run(&["random", "--count", "3", "--seed", "1"]);
    assert!(first.status.success());
    let text = stdout(&first);
    assert_eq!(text.matches("Disassembling single instruction").count(), 3);

    let second = run(&["random", "--count", "3", "--seed", "1"]);
    assert_eq!(text, stdout(&second));
}

#[test]
fn rom_file_runs_to_halt() {
    let temp_dir = tempfile::tempdir().unwrap();
    let rom = create_rom(
        temp_dir.path(),
        "halt.rom",
        "# R0 = 1, then halt\nC0040000\nD1183C00\n",
    );

    let output = run(&["--rom", rom.to_str().unwrap()]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("halted after 1 packets"));
    assert!(text.contains("r = { 1, 0,"));
}

#[test]
fn faulting_rom_exits_with_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    let rom = create_rom(temp_dir.path(), "runaway.rom", "E0000000\n");

    let output = run(&["--rom", rom.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("FAIL"));
}

#[test]
fn missing_rom_reports_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("missing.rom");

    let output = run(&["--rom", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

#[test]
fn usage_errors_exit_with_failure() {
    for args in [&["0xZZ"][..], &["--bogus"], &["--seed", "3"]] {
        let output = run(args);
        assert_eq!(output.status.code(), Some(1), "{args:?}");
        assert!(String::from_utf8_lossy(&output.stderr).contains("Usage:"));
    }
}

#[test]
fn help_exits_successfully() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage: osorom-sim"));
}

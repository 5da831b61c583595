//! Integration tests for the `blackout-gate` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the check and list
//! subcommands through the actual binary, including stdin input, config files,
//! exit codes, and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to the freeze.ics fixture.
fn freeze_ics_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/freeze.ics")
}

/// Helper: path to the calendar.json fixture.
fn calendar_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/calendar.json")
}

fn gate() -> Command {
    let mut cmd = Command::cargo_bin("blackout-gate").unwrap();
    cmd.env_remove("BLACKOUT_GATE_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// Helper: run `check` and parse the JSON report from stdout.
fn check_report(args: &[&str]) -> (Option<i32>, serde_json::Value) {
    let output = gate().arg("check").args(args).output().unwrap();
    let report = serde_json::from_slice(&output.stdout).expect("stdout must be a JSON report");
    (output.status.code(), report)
}

// ─────────────────────────────────────────────────────────────────────────────
// check subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_clear_exits_zero() {
    // Lookahead 08:00-09:00 touches nothing (the todo ending at 08:00 is not an event).
    let (code, report) = check_report(&["-i", freeze_ics_path(), "--now", "2026-03-01T08:00:00Z"]);

    assert_eq!(code, Some(0));
    assert_eq!(report["blocked"], false);
    assert_eq!(report["margin_seconds"], 3600);
    assert_eq!(report["buffered_now"], "2026-03-01T09:00:00Z");
    assert!(report.get("uid").is_none());
}

#[test]
fn check_blocked_exits_two() {
    let (code, report) = check_report(&["-i", freeze_ics_path(), "--now", "2026-03-01T09:30:00Z"]);

    assert_eq!(code, Some(2));
    assert_eq!(report["blocked"], true);
    assert_eq!(report["uid"], "release-freeze@ops");
    assert_eq!(report["event"]["summary"], "Release freeze");
}

#[test]
fn check_zero_margin_before_window_is_clear() {
    gate()
        .args([
            "check",
            "-i",
            freeze_ics_path(),
            "--now",
            "2026-03-01T09:30:00Z",
            "--margin",
            "0",
        ])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"blocked\": false"));
}

#[test]
fn check_resolves_tzid_windows() {
    // Quarter close is 11:30-13:00 Berlin = 10:30-12:00 UTC.
    let (code, report) = check_report(&[
        "-i",
        freeze_ics_path(),
        "--now",
        "2026-03-01T11:30:00Z",
        "--margin",
        "0",
    ]);

    assert_eq!(code, Some(2));
    assert_eq!(report["uid"], "quarter-close@ops");
}

#[test]
fn check_all_lists_every_conflict() {
    let (code, report) = check_report(&[
        "-i",
        freeze_ics_path(),
        "--now",
        "2026-03-01T10:45:00Z",
        "--all",
    ]);

    assert_eq!(code, Some(2));
    let uids: Vec<&str> = report["conflicts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["uid"].as_str().unwrap())
        .collect();
    assert_eq!(uids, vec!["release-freeze@ops", "quarter-close@ops"]);
}

#[test]
fn check_first_found_selection() {
    let (_, report) = check_report(&[
        "-i",
        freeze_ics_path(),
        "--now",
        "2026-03-01T10:45:00Z",
        "--selection",
        "first-found",
    ]);

    assert_eq!(report["uid"], "release-freeze@ops");
}

#[test]
fn check_reads_stdin() {
    let ics = std::fs::read_to_string(freeze_ics_path()).unwrap();

    gate()
        .args(["check", "--now", "2026-03-01T10:15:00Z"])
        .write_stdin(ics)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("release-freeze@ops"));
}

#[test]
fn check_reads_concatenated_calendars_from_stdin() {
    let extra = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//blackout-gate//tests//EN\r\n\
                 BEGIN:VEVENT\r\nUID:late-freeze@ops\r\nSUMMARY:Late freeze\r\n\
                 DTSTART:20260301T200000Z\r\nDTEND:20260301T210000Z\r\nEND:VEVENT\r\n\
                 END:VCALENDAR\r\n";
    let mut stream = std::fs::read_to_string(freeze_ics_path()).unwrap();
    stream.push_str(extra);

    gate()
        .args(["check", "--now", "2026-03-01T20:30:00Z", "--margin", "0"])
        .write_stdin(stream)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("late-freeze@ops"));
}

#[test]
fn check_report_carries_searched_lookahead() {
    let (code, report) = check_report(&[
        "-i",
        freeze_ics_path(),
        "--now",
        "2026-03-01T09:00:00Z",
        "--margin",
        "1800",
    ]);

    assert_eq!(code, Some(0));
    assert_eq!(report["now"], "2026-03-01T09:00:00Z");
    assert_eq!(report["buffered_now"], "2026-03-01T09:30:00Z");
    assert_eq!(report["margin_seconds"], 1800);
}

#[test]
fn check_reads_json_calendar() {
    let (code, report) = check_report(&[
        "-i",
        calendar_json_path(),
        "--format",
        "json",
        "--now",
        "2026-03-01T12:00:00Z",
    ]);

    assert_eq!(code, Some(2));
    assert_eq!(report["uid"], "holiday");

    // The todo on 2026-03-03 is not an event.
    let (code, _) = check_report(&[
        "-i",
        calendar_json_path(),
        "--format",
        "json",
        "--now",
        "2026-03-03T07:00:00Z",
    ]);
    assert_eq!(code, Some(0));
}

#[test]
fn check_negative_margin_fails() {
    gate()
        .args([
            "check",
            "-i",
            freeze_ics_path(),
            "--now",
            "2026-03-01T09:30:00Z",
            "--margin",
            "-1",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("non-negative"));
}

#[test]
fn check_invalid_now_fails() {
    gate()
        .args(["check", "-i", freeze_ics_path(), "--now", "next tuesday"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid --now"));
}

#[test]
fn check_invalid_calendar_fails() {
    gate()
        .args(["check", "--now", "2026-03-01T09:30:00Z"])
        .write_stdin("this is not a calendar")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse calendar"));
}

#[test]
fn check_missing_file_fails() {
    gate()
        .args(["check", "-i", "/nonexistent/blackout-gate/freeze.ics"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config file
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn config_supplies_calendar_and_margin() {
    let config_path = "/tmp/blackout-gate-test-config.toml";
    std::fs::write(
        config_path,
        format!(
            "calendar = \"{}\"\nmargin_seconds = 7200\n",
            freeze_ics_path()
        ),
    )
    .unwrap();

    // 08:00 + 2h reaches the 10:00 window start.
    let (code, report) = check_report(&["--config", config_path, "--now", "2026-03-01T08:00:00Z"]);
    assert_eq!(code, Some(2));
    assert_eq!(report["margin_seconds"], 7200);

    // Flags override the file.
    let (code, report) = check_report(&[
        "--config",
        config_path,
        "--now",
        "2026-03-01T08:00:00Z",
        "--margin",
        "60",
    ]);
    assert_eq!(code, Some(0));
    assert_eq!(report["margin_seconds"], 60);

    let _ = std::fs::remove_file(config_path);
}

#[test]
fn config_from_environment() {
    let config_path = "/tmp/blackout-gate-test-env-config.toml";
    std::fs::write(
        config_path,
        format!("calendar = \"{}\"\nmargin_seconds = 0\n", freeze_ics_path()),
    )
    .unwrap();

    Command::cargo_bin("blackout-gate")
        .unwrap()
        .env("BLACKOUT_GATE_CONFIG", config_path)
        .args(["check", "--now", "2026-03-01T09:30:00Z"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"margin_seconds\": 0"));

    let _ = std::fs::remove_file(config_path);
}

#[test]
fn config_with_unknown_field_fails() {
    let config_path = "/tmp/blackout-gate-test-bad-config.toml";
    std::fs::write(config_path, "margin = 60\n").unwrap();

    gate()
        .args(["check", "--config", config_path, "-i", freeze_ics_path()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid config file"));

    let _ = std::fs::remove_file(config_path);
}

// ─────────────────────────────────────────────────────────────────────────────
// list subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn list_shows_events_only_by_default() {
    gate()
        .args(["list", "-i", freeze_ics_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("release-freeze@ops"))
        .stdout(predicate::str::contains("quarter-close@ops"))
        .stdout(predicate::str::contains("rotate-keys@ops").not());
}

#[test]
fn list_all_kinds_includes_todos() {
    let output = gate()
        .args(["list", "-i", freeze_ics_path(), "--all-kinds"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed["rotate-keys@ops"]["kind"], "vtodo");
    assert_eq!(listed["quarter-close@ops"]["start"], "2026-03-01T10:30:00Z");
}

// ─────────────────────────────────────────────────────────────────────────────
// Help
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn no_subcommand_shows_usage() {
    gate()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

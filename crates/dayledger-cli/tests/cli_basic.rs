//! Basic CLI E2E tests.
//!
//! Each test drives the built binary against its own data directory and a
//! pinned `--now`, then checks the JSON it prints.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_dayledger-cli"))
        .env("DAYLEDGER_HOME", home)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(home: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stdout} {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

/// Run a command expected to fail and return its error code.
fn run_error(home: &Path, args: &[&str]) -> String {
    let (stdout, _, code) = run_cli(home, args);
    assert_ne!(code, 0, "{args:?} unexpectedly succeeded: {stdout}");
    let body: Value = serde_json::from_str(&stdout).expect("Failed to parse error JSON");
    body["error"].as_str().unwrap().to_string()
}

fn add_block(home: &Path, now: &str) -> String {
    let block = run_json(
        home,
        &["--now", now, "block", "add", "Deep work", "--start", "09:00", "--end", "10:30"],
    );
    block["id"].as_str().unwrap().to_string()
}

#[test]
fn test_today_on_empty_ledger() {
    let home = TempDir::new().unwrap();
    let view = run_json(home.path(), &["--now", "2026-03-04T08:00:00", "day", "today"]);
    assert_eq!(view["summary"]["day"], "2026-03-04");
    assert_eq!(view["summary"]["status"]["is_complete"], false);
    assert_eq!(view["debts"].as_array().unwrap().len(), 0);
    assert_eq!(view["daily_win_config"]["type"], "output");
}

#[test]
fn test_block_and_output_complete_the_day() {
    let home = TempDir::new().unwrap();
    let now = "2026-03-04T11:00:00";
    let block = add_block(home.path(), now);

    let toggle = run_json(home.path(), &["--now", now, "block", "toggle", &block]);
    assert_eq!(toggle["completed"], true);
    assert_eq!(toggle["status"]["is_complete"], false);

    let status = run_json(
        home.path(),
        &["--now", now, "output", "save", "TEXT", "Wrote the migration guide"],
    );
    assert_eq!(status["is_complete"], true);

    let streak = run_json(home.path(), &["--now", now, "stats", "streak"]);
    assert_eq!(streak["current"], 1);

    let summary = run_json(home.path(), &["--now", now, "day", "summary"]);
    assert_eq!(summary["outcome"], "complete");
}

#[test]
fn test_missed_day_opens_debt_until_resolved() {
    let home = TempDir::new().unwrap();
    add_block(home.path(), "2026-03-01T07:00:00");

    let view = run_json(home.path(), &["--now", "2026-03-03T08:00:00", "day", "today"]);
    let debts = view["debts"].as_array().unwrap();
    assert_eq!(debts.len(), 1);
    assert_eq!(debts[0]["missed_day"], "2026-03-02");
    assert_eq!(view["summary"]["status"]["has_debt"], true);

    let id = debts[0]["id"].as_str().unwrap();
    let resolved = run_json(
        home.path(),
        &[
            "--now", "2026-03-03T20:00:00", "debt", "resolve", id,
            "--type", "extra_time", "--note", "Two extra hours on the parser",
        ],
    );
    assert_eq!(resolved["debt"]["resolution_type"], "extra_time");
    assert_eq!(resolved["today"]["has_debt"], false);

    let open = run_json(home.path(), &["--now", "2026-03-03T20:05:00", "debt", "list"]);
    assert!(open.as_array().unwrap().is_empty());
}

#[test]
fn test_quiet_week_cooldown() {
    let home = TempDir::new().unwrap();
    let week = run_json(home.path(), &["--now", "2026-03-02T09:00:00", "quiet", "enable"]);
    assert_eq!(week["week_start"], "2026-03-01");

    assert_eq!(
        run_error(home.path(), &["--now", "2026-03-09T09:00:00", "quiet", "enable"]),
        "CooldownActive"
    );
    let status = run_json(home.path(), &["--now", "2026-03-09T09:00:00", "quiet", "status"]);
    assert_eq!(status["can_enable"], false);

    run_json(home.path(), &["--now", "2026-03-16T09:00:00", "quiet", "enable"]);
}

#[test]
fn test_failure_days_are_capped() {
    let home = TempDir::new().unwrap();
    let now = "2026-03-10T22:00:00";
    for day in ["2026-03-02", "2026-03-05"] {
        run_json(home.path(), &["--now", now, "failure", "log", "--day", day, "--note", "Sick"]);
    }
    assert_eq!(
        run_error(
            home.path(),
            &["--now", now, "failure", "log", "--day", "2026-03-09", "--note", "Travel"]
        ),
        "LimitReached"
    );
    let allowance = run_json(home.path(), &["--now", now, "failure", "allowance"]);
    assert_eq!(allowance["used"], 2);
}

#[test]
fn test_weekly_review_locks() {
    let home = TempDir::new().unwrap();
    let args = ["--now", "2026-03-06T18:00:00", "review", "submit", "--q1", "Shipped the importer"];
    let review = run_json(home.path(), &args);
    assert_eq!(review["q1"], "Shipped the importer");
    assert_eq!(run_error(home.path(), &args), "AlreadyExists");
}

#[test]
fn test_config_roundtrip() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "rules.failure_day_cap", "3"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "rules.failure_day_cap"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3");

    assert_eq!(run_error(home.path(), &["config", "get", "rules.nope"]), "ConfigError");
}

#[test]
fn test_bad_input_is_a_validation_error() {
    let home = TempDir::new().unwrap();
    assert_eq!(
        run_error(home.path(), &["--now", "yesterday", "day", "today"]),
        "ValidationError"
    );
    assert_eq!(
        run_error(
            home.path(),
            &["--now", "2026-03-04T08:00:00", "output", "save", "TEXT", "todo"]
        ),
        "ValidationError"
    );
    assert_eq!(
        run_error(home.path(), &["--now", "2026-03-04T08:00:00", "debt", "resolve", "missing", "--type", "extra_time", "--note", "x"]),
        "NotFound"
    );
}

#[test]
fn test_unbounded_day_counts_are_rejected() {
    let home = TempDir::new().unwrap();
    let now = "2026-03-04T08:00:00";
    assert_eq!(
        run_error(home.path(), &["--now", now, "plan", "create", "Forever", "--days", "4294967295"]),
        "ValidationError"
    );
    assert_eq!(
        run_error(home.path(), &["config", "set", "rules.default_cycle_days", "4294967295"]),
        "ConfigError"
    );

    // The rejected values never reached the ledger or the config file
    let view = run_json(home.path(), &["--now", now, "day", "today"]);
    assert_eq!(view["summary"]["day"], "2026-03-04");
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "rules.default_cycle_days"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "30");
    let allowance = run_json(home.path(), &["--now", now, "failure", "allowance"]);
    assert_eq!(allowance["used"], 0);
}

#[test]
fn test_history_analytics() {
    let home = TempDir::new().unwrap();
    let now = "2026-03-04T18:00:00";
    let block = add_block(home.path(), now);
    run_json(home.path(), &["--now", now, "block", "toggle", &block]);
    run_json(home.path(), &["--now", now, "output", "goal", "book"]);
    run_json(
        home.path(),
        &["--now", now, "output", "artifact", "TEXT", "Drafted the chapter on lexing"],
    );
    run_json(home.path(), &["--now", now, "output", "save", "TEXT", "Wrote the migration guide"]);

    let daily = run_json(home.path(), &["--now", now, "stats", "daily", "--days", "3"]);
    let daily = daily.as_array().unwrap();
    assert_eq!(daily.len(), 3);
    assert_eq!(daily[2]["day"], "2026-03-04");
    assert_eq!(daily[2]["status"], "complete");
    assert_eq!(daily[2]["output_summary"], "Drafted the chapter on lexing");

    let consistency = run_json(home.path(), &["--now", now, "stats", "consistency"]);
    assert_eq!(consistency["days"].as_array().unwrap().len(), 14);
    assert_eq!(consistency["days"][13]["by_category"]["CoreWork"], 1.0);

    let quality = run_json(home.path(), &["--now", now, "stats", "quality", "--weeks", "2"]);
    assert_eq!(quality["weeks"][1]["week_start"], "2026-03-01");
    assert_eq!(quality["weeks"][1]["shallow"], 1);
    assert_eq!(quality["timeline"][0]["depth"], "shallow");

    run_json(home.path(), &["--now", now, "review", "submit", "--q2", "Mornings work best"]);
    let summaries = run_json(home.path(), &["--now", now, "stats", "summaries"]);
    assert_eq!(summaries[0]["week_start"], "2026-03-01");
    assert_eq!(summaries[0]["completion_rate"], 14);
    assert_eq!(summaries[0]["quote"], "Mornings work best");
}

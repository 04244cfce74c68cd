//! E2E CLI tests covering:
//! - Filtering stdin lines into prune/keep sets (`--invert`)
//! - Timestamp extraction and parsing (`--extract`, `--only`, `--parse`)
//! - Diagnostics on stderr (`--why`, `--summarize`, warnings, `--quiet`)
//! - JSON report, config file defaults, fatal errors and exit codes
//!
//! Each test runs the `snapkeep` binary as a subprocess with an isolated
//! config directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// A temp dir holding an (initially empty) config file.
struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let env = Self {
            dir: TempDir::new().expect("temp dir"),
        };
        env.write_config("");
        env
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn write_config(&self, content: &str) {
        std::fs::write(self.config_path(), content).expect("write config");
    }

    /// Build a Command targeting the snapkeep binary.
    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("snapkeep"));
        cmd.env("SNAPKEEP_CONFIG", self.config_path());
        cmd.env("SNAPKEEP_LOG", "error");
        cmd.env_remove("DEBUG");
        cmd
    }
}

/// Unix timestamps, one per hour from 2020-01-01T00:00:00Z.
fn hourly(hours: i64) -> String {
    let start = 1_577_836_800;
    (0..hours).map(|h| format!("{}\n", start + h * 3600)).collect()
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[test]
fn prints_snapshots_to_prune() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["1@last", "daily"])
        .write_stdin(hourly(48))
        .output()
        .expect("run");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    // newest of each day survives
    assert_eq!(lines.len(), 46);
    assert!(!lines.contains(&"1577919600".to_string()));
    assert!(!lines.contains(&(1_577_836_800 + 47 * 3600).to_string()));
}

#[test]
fn invert_prints_snapshots_to_keep() {
    let env = Env::new();
    env.cmd()
        .args(["-v", "1@last", "daily"])
        .write_stdin(hourly(48))
        .assert()
        .success()
        .stdout("1577919600\n1578006000\n");
}

#[test]
fn output_preserves_input_order() {
    let env = Env::new();
    env.cmd()
        .args(["--invert", "2@last"])
        .write_stdin("300\n100\n200\n")
        .assert()
        .success()
        .stdout("300\n200\n");
}

#[test]
fn empty_input_is_fine() {
    let env = Env::new();
    env.cmd()
        .args(["daily"])
        .write_stdin("")
        .assert()
        .success()
        .stdout("");
}

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

#[test]
fn invalid_lines_warn_and_pass_through_only_when_inverted() {
    let env = Env::new();
    env.cmd()
        .args(["1@last"])
        .write_stdin("100\nnot a time\n200\n")
        .assert()
        .success()
        .stdout("100\n")
        .stderr(predicate::str::contains(
            "snapkeep: warning: failed to parse unix timestamp \"not a time\"",
        ));

    env.cmd()
        .args(["-q", "-v", "1@last"])
        .write_stdin("100\nnot a time\n200\n")
        .assert()
        .success()
        .stdout("not a time\n200\n")
        .stderr("");
}

#[test]
fn extract_and_only() {
    let env = Env::new();
    let input = "/srv/backup-100.tar\n/srv/backup-200.tar\n/srv/notes.txt\n";
    env.cmd()
        .args(["-q", "-e", r"backup-(\d+)\.tar$", "1@last"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout("/srv/backup-100.tar\n");

    env.cmd()
        .args(["-q", "-o", "-e", r"backup-(\d+)\.tar$", "1@last"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout("backup-100.tar\n");
}

#[test]
fn non_utf8_lines_are_echoed_byte_for_byte() {
    let env = Env::new();
    env.cmd()
        .args(["-e", r"snap-(\d+)", "1@last"])
        .write_stdin(&b"snap-100\nsnap-200-caf\xe9\nsnap-300\n"[..])
        .assert()
        .success()
        .stdout(&b"snap-100\nsnap-200-caf\xe9\n"[..])
        .stderr("");

    env.cmd()
        .args(["-v", "-e", r"snap-(\d+)", "1@last"])
        .write_stdin(&b"snap-100\r\n\xff\xfe\r\nsnap-300\r\n"[..])
        .assert()
        .success()
        .stdout(&b"\xff\xfe\nsnap-300\n"[..])
        .stderr(predicate::str::contains("no --extract match"));
}

#[test]
fn parse_format_with_dates() {
    let env = Env::new();
    env.cmd()
        .args(["-p", "%Y-%m-%d", "2@monthly"])
        .write_stdin("2024-01-15\n2024-01-31\n2024-02-10\n2024-02-20\n")
        .assert()
        .success()
        .stdout("2024-01-15\n2024-02-10\n");
}

#[test]
fn offsets_in_input_are_respected() {
    let env = Env::new();
    // different UTC days, but both are 2024-03-01 in their own zone
    env.cmd()
        .args(["-v", "-p", "%Y-%m-%dT%H:%M:%S%:z", "daily"])
        .write_stdin("2024-03-01T01:00:00+09:00\n2024-03-01T23:00:00-05:00\n")
        .assert()
        .success()
        .stdout("2024-03-01T23:00:00-05:00\n");

    // one UTC day, but different days in their own zone
    env.cmd()
        .args(["-v", "-p", "%Y-%m-%dT%H:%M:%S%:z", "daily"])
        .write_stdin("2024-03-01T23:30:00+01:00\n2024-03-02T00:30:00+01:00\n")
        .assert()
        .success()
        .stdout("2024-03-01T23:30:00+01:00\n2024-03-02T00:30:00+01:00\n");
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn why_explains_kept_snapshots() {
    let env = Env::new();
    // 2006-01-02 15:04:05 UTC and one hour later
    env.cmd()
        .args(["--why", "1@last", "daily"])
        .write_stdin("1136214245\n1136217845\n")
        .assert()
        .success()
        .stdout("1136214245\n")
        .stderr("snapkeep: why: keep [2/2] Mon 2006 Jan  2 16:04:05 :: last, every day\n");
}

#[test]
fn summarize_reports_need() {
    let env = Env::new();
    env.cmd()
        .args(["--summarize", "3@last", "12@daily", "yearly"])
        .write_stdin(hourly(48))
        .assert()
        .success()
        .stderr(
            "snapkeep: summary: ( 3) last\n\
             snapkeep: summary: (12) every day (missing 10)\n\
             snapkeep: summary: (**) every year\n\
             snapkeep: summary: pruning 44/48 snapshots\n",
        );
}

#[test]
fn json_report() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["--json", "-q", "2@last", "yearly"])
        .write_stdin("100\nbad\n200\n300\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["policy"], "2@last yearly");
    assert_eq!(json["total"], 3);
    assert_eq!(json["pruned"], 1);
    let snapshots = json["snapshots"].as_array().expect("snapshots array");
    assert_eq!(snapshots.len(), 4);
    assert_eq!(snapshots[1]["line"], "bad");
    assert!(snapshots[1]["timestamp"].is_null());
    assert_eq!(snapshots[0]["keep"].as_array().map(Vec::len), Some(0));
    assert_eq!(snapshots[3]["keep"][1], "every year");
    assert_eq!(json["need"][0]["rule"], "2@last");
    assert_eq!(json["need"][0]["missing"], 0);
    assert!(json["need"][1]["wanted"].is_null());
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_supplies_policy_and_extract() {
    let env = Env::new();
    env.write_config("policy = \"1@last\"\nextract = 'snap-(\\d+)'\nquiet = true\n");
    env.cmd()
        .write_stdin("snap-1\nsnap-2\njunk\n")
        .assert()
        .success()
        .stdout("snap-1\n")
        .stderr("");
}

#[test]
fn command_line_policy_wins_over_config() {
    let env = Env::new();
    env.write_config("policy = \"1@last\"\n");
    env.cmd()
        .args(["2@last"])
        .write_stdin("1\n2\n3\n")
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn explicit_config_flag() {
    let env = Env::new();
    let other = env.dir.path().join("other.toml");
    std::fs::write(&other, "policy = \"2@last\"\n").expect("write");
    env.cmd()
        .arg("--config")
        .arg(&other)
        .write_stdin("1\n2\n3\n")
        .assert()
        .success()
        .stdout("1\n");
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn missing_policy_is_fatal() {
    let env = Env::new();
    env.cmd()
        .write_stdin("1\n")
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::starts_with("snapkeep: fatal: no retention policy"));
}

#[test]
fn invalid_policy_is_fatal() {
    let env = Env::new();
    env.cmd()
        .args(["daily", "daily"])
        .write_stdin("1\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "snapkeep: fatal: invalid policy: rule \"daily\": duplicate daily:1",
        ))
        .stderr(predicate::str::contains("snapkeep: hint:"));
}

#[test]
fn extract_with_two_groups_is_fatal() {
    let env = Env::new();
    env.cmd()
        .args(["-e", r"(\d+)-(\d+)", "daily"])
        .write_stdin("1-2\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "snapkeep: fatal: --extract regexp is invalid",
        ));
}

#[test]
fn broken_config_is_fatal() {
    let env = Env::new();
    env.write_config("policy = [\n");
    env.cmd()
        .args(["daily"])
        .write_stdin("1\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("snapkeep: fatal: invalid config"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let env = Env::new();
    env.cmd().args(["--bogus", "daily"]).assert().code(2);
}

#[test]
fn completions_print_a_script() {
    let env = Env::new();
    env.cmd()
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("snapkeep"));
}

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use tracing::info;

const CORPUS: &str = "a = 5 + 3\nb = a - 1\n\nq = 1 / 0\n\nx = [1, 2]\nx.append(len(x) * 4)";

/// A temp dir holding the corpus and an empty config, so the user's
/// `~/.etp.toml` never leaks into a test
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("corpus.txt"), CORPUS).unwrap();
    fs::write(dir.path().join("etp.toml"), "").unwrap();
    dir
}

fn etp(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.current_dir(dir.path()).arg("--config").arg(dir.path().join("etp.toml"));
    cmd
}

#[test]
fn test_help_command() {
    etp_common::logging::ensure_test_logging(None);
    info!("Testing CLI help command");

    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.arg("--help").assert().success().stdout(predicate::str::contains("Execution Trace Prediction"));
}

#[test]
fn test_version_command() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.arg("--version").assert().success().stdout(predicate::str::contains("etp"));
}

#[test]
fn test_missing_subcommand() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_line_count_pipeline() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = workspace();
    etp(&dir)
        .args(["line-count", "-i", "corpus.txt", "-o", "out.txt", "--log", "log.txt", "--summary", "summary.json"])
        .assert()
        .success();

    let output = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(
        output,
        "a = 5 + 3\nb = a - 1\n# count?2\n\nx = [1, 2]\nx.append(len(x) * 4)\n# count?2"
    );
    let log = fs::read_to_string(dir.path().join("log.txt")).unwrap();
    assert_eq!(log, "0 1\n1 0\n2 1");

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["pipeline"], "line-count");
    assert_eq!(summary["snippets"], 3);
    assert_eq!(summary["accepted"], 2);
    assert_eq!(summary["errors"]["ZeroDivisionError"], 1);
}

#[test]
fn test_output_pipeline_sequential() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = workspace();
    etp(&dir).args(["-j", "1", "output", "-i", "corpus.txt", "-o", "out.txt"]).assert().success();
    let output = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(
        output,
        "a = 5 + 3\nb = a - 1\n# a?8;b?7\n\nx = [1, 2]\nx.append(len(x) * 4)\n# x?[1, 2, 8]"
    );
}

#[test]
fn test_operator_pipeline_extended() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = workspace();
    etp(&dir).args(["operator", "-i", "corpus.txt", "-o", "out.txt"]).assert().success();
    let default = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert!(default.contains("a = 5 ? 3\nb = a - 1\n# a?8;b?7;operator?+"));
    assert!(!default.contains("operator?*"));

    etp(&dir).args(["operator", "--extended", "-i", "corpus.txt", "-o", "out.txt"]).assert().success();
    let extended = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert!(extended.contains("x.append(len(x) ? 4)\n# x?[1, 2, 8];operator?*"));
}

#[test]
fn test_seeded_stepped_runs_match() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = workspace();
    for out in ["first.txt", "second.txt"] {
        etp(&dir)
            .args(["--seed", "3", "stepped-operator", "--step-limit", "1", "-i", "corpus.txt", "-o", out])
            .assert()
            .success();
    }
    let first = fs::read_to_string(dir.path().join("first.txt")).unwrap();
    let second = fs::read_to_string(dir.path().join("second.txt")).unwrap();
    assert_eq!(first, second);

    etp(&dir)
        .args(["stepped-input", "--step-limit", "0", "--literal-limit", "0", "-i", "corpus.txt", "-o", "input.txt"])
        .assert()
        .success();
    let input = fs::read_to_string(dir.path().join("input.txt")).unwrap();
    assert!(input.contains("a = ? + 3\n@b = a - 1$a?~\n# input?5"));
}

#[test]
fn test_missing_input_fails() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = workspace();
    etp(&dir)
        .args(["line-count", "-i", "missing.txt", "-o", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read corpus"));
}

#[test]
fn test_config_commands() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("etp.toml");

    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.arg("--config").arg(&path).args(["config", "init"]).assert().success();
    assert!(path.exists());

    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.arg("--config").arg(&path).args(["config", "init"]).assert().failure();

    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[stepped_input]").and(predicate::str::contains("max_call_depth = 200")));

    fs::write(&path, "[replacements.overrides]\n\"+\" = [\"--\"]\n").unwrap();
    fs::write(dir.path().join("corpus.txt"), CORPUS).unwrap();
    let mut cmd = Command::cargo_bin("etp").unwrap();
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["operator", "-i", "corpus.txt", "-o", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid pipeline configuration"));
}

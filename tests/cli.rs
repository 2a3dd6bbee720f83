mod common;

use assert_cmd::Command;
use chrono::DateTime;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;

use common::{TestRepo, test_repo};

fn git_commit_times(repo: &TestRepo) -> Command {
    let mut cmd = Command::cargo_bin("git-commit-times").expect("binary is built");
    // Keep a developer's own settings file out of the run.
    cmd.env("HOME", repo.path()).env_remove("RUST_LOG");
    cmd.arg("-C").arg(repo.path());
    cmd
}

fn two_commit_history(repo: &TestRepo) {
    let tip = repo.linear(&[
        (&[("a.txt", "1"), ("b.txt", "1")], 1_000_000),
        (&[("a.txt", "2"), ("b.txt", "1")], 2_000_000),
    ]);
    repo.finish(tip);
}

#[rstest]
#[case::log(&[][..])]
#[case::libgit(&["--libgit-walk"][..])]
fn json_report_lists_resolved_times(test_repo: TestRepo, #[case] extra: &[&str]) {
    two_commit_history(&test_repo);

    let output = git_commit_times(&test_repo)
        .args(extra)
        .arg("--json")
        .arg("-j1")
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let a = report["resolved"]["a.txt"].as_str().expect("a.txt resolved");
    assert_eq!(DateTime::parse_from_rfc3339(a).unwrap().timestamp(), 2_000_000);
    assert_eq!(report["apply"]["written"], 2);
    assert_eq!(test_repo.mtime("b.txt"), 1_000_000);
}

#[rstest]
fn strict_mode_fails_on_unmatched_files(test_repo: TestRepo) {
    two_commit_history(&test_repo);

    git_commit_times(&test_repo)
        .args(["--since", "1970-01-20T00:00:00Z", "--strict"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Warning: the final commit for 1 file(s) was not found.",
        ))
        .stderr(predicate::str::contains("b.txt"));
}

#[rstest]
fn unmatched_files_only_warn_by_default(test_repo: TestRepo) {
    two_commit_history(&test_repo);

    git_commit_times(&test_repo)
        .args(["--after", "1970-01-20T00:00:00Z"])
        .assert()
        .success()
        .stderr(predicate::str::contains("was not found"));
}

#[rstest]
fn explicit_paths_are_checked_against_head(test_repo: TestRepo) {
    two_commit_history(&test_repo);

    git_commit_times(&test_repo)
        .arg("missing.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.txt"));
}

#[rstest]
fn settings_file_is_honoured(test_repo: TestRepo) {
    two_commit_history(&test_repo);
    let config = test_repo.path().join("settings.toml");
    fs::write(&config, "until = \"1970-01-20T00:00:00Z\"\njobs = 0\n").unwrap();

    git_commit_times(&test_repo)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    // Only the first commit is inside the window.
    assert_eq!(test_repo.mtime("a.txt"), 1_000_000);
}

#[rstest]
fn broken_settings_file_is_an_error(test_repo: TestRepo) {
    two_commit_history(&test_repo);
    let config = test_repo.path().join("settings.toml");
    fs::write(&config, "strategy = 42\n").unwrap();

    git_commit_times(&test_repo)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load settings"));
}

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_sync_subcommand() {
    Command::cargo_bin("piper-rt")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn sync_help_documents_the_config_flag() {
    Command::cargo_bin("piper-rt")
        .unwrap()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("piper-rt")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn sync_with_unreadable_config_fails() {
    Command::cargo_bin("piper-rt")
        .unwrap()
        .args(["sync", "--config", "/nonexistent/piper-rt.yaml"])
        .assert()
        .failure();
}

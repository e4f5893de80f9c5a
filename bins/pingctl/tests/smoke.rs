use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_job_subcommands() {
    Command::cargo_bin("pingctl").unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list").and(predicate::str::contains("add")));
}

#[test]
fn rejects_an_unknown_subcommand() {
    Command::cargo_bin("pingctl").unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

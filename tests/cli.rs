use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn build_without_configuration_fails_with_diagnostic() {
    // Run from an empty directory so no .env can satisfy the config, and
    // scrub the variables inherited from the test environment.
    let tmp = tempdir().expect("temp dir");
    let mut cmd = Command::cargo_bin("move-dataset").expect("Binary exists");

    cmd.arg("build")
        .current_dir(tmp.path())
        .env_remove("PROJECT_ID")
        .env_remove("ANTHROPIC_API_KEY");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("PROJECT_ID"));
}

#[test]
fn help_lists_the_build_subcommand() {
    let mut cmd = Command::cargo_bin("move-dataset").expect("Binary exists");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("build"));
}

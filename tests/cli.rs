//! CLI surface tests - argument handling only, no network

use assert_cmd::Command;
use predicates::prelude::*;

fn relight() -> Command {
    let mut cmd = Command::cargo_bin("relight").unwrap();
    // Keep the tests hermetic: no credentials, no .env surprises.
    cmd.env_remove("STABILITY_API_KEY")
        .env_remove("STABLE_DIFFUSION_API_KEY");
    cmd
}

#[test]
fn help_lists_subcommands() {
    relight()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("poll"))
        .stdout(predicate::str::contains("remove-background"));
}

#[test]
fn poll_without_job_id_is_a_usage_error() {
    relight()
        .arg("poll")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn poll_rejects_non_numeric_attempt_override() {
    relight()
        .args(["poll", "abc123", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn submit_with_missing_image_fails_before_any_network() {
    relight()
        .args(["submit", "definitely-not-here.png", "-b", "white studio"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn submit_rejects_out_of_range_weight_locally() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("subject.png");
    std::fs::write(&image, b"\x89PNG\r\n\x1a\nfake").unwrap();

    relight()
        .args([
            "submit",
            image.to_str().unwrap(),
            "-b",
            "white studio",
            "--preserve-original-subject",
            "1.5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be in [0,1]"));
}

#[test]
fn submit_without_background_prompt_is_rejected_locally() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("subject.png");
    std::fs::write(&image, b"\x89PNG\r\n\x1a\nfake").unwrap();

    relight()
        .args(["submit", image.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("background prompt"));
}

#[test]
fn missing_api_key_is_reported_for_poll() {
    relight()
        .args(["poll", "abc123", "1", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("STABILITY_API_KEY"));
}

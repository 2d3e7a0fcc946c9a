use assert_cmd::prelude::*;
use std::process::Command;

/// A verify run with no usable snapshot must fail before any browser is
/// launched, with the generic hard-error exit code.
#[test]
fn verify_without_a_snapshot_fails_fast() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.json");

    let bin = assert_cmd::cargo::cargo_bin!("formproof");
    let mut cmd = Command::new(bin);
    cmd.args(["verify", "--session", missing.to_str().unwrap()])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn verify_rejects_a_corrupt_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{ not json").expect("write snapshot");

    let bin = assert_cmd::cargo::cargo_bin!("formproof");
    let mut cmd = Command::new(bin);
    cmd.args(["verify", "--session", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(1);
}

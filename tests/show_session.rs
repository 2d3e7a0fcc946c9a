use assert_cmd::prelude::*;
use std::path::Path;
use std::process::Command;

#[test]
fn show_session_redacts_cookie_values() {
    let input = Path::new("tests/fixtures/portal_session.json");
    assert!(input.exists(), "fixture missing");

    let bin = assert_cmd::cargo::cargo_bin!("formproof");
    let mut cmd = Command::new(bin);
    let assert = cmd
        .args(["show-session", "--session", input.to_str().unwrap()])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");

    assert!(stdout.contains("3 cookie(s)"), "stdout: {stdout}");
    assert!(stdout.contains("SMSESSION = Yz***Jn"), "stdout: {stdout}");
    assert!(
        !stdout.contains("Yz9qkE2d7hTWc4Vv0bTr5mXqLpOau3Jn"),
        "raw cookie value leaked into the listing"
    );
}

#[test]
fn filtered_listing_drops_unknown_cookies() {
    let input = Path::new("tests/fixtures/portal_session.json");
    assert!(input.exists(), "fixture missing");

    let bin = assert_cmd::cargo::cargo_bin!("formproof");
    let mut cmd = Command::new(bin);
    let assert = cmd
        .args([
            "show-session",
            "--session",
            input.to_str().unwrap(),
            "--filtered",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");

    assert!(stdout.contains("2 cookie(s) after filtering"), "stdout: {stdout}");
    assert!(stdout.contains("SMSESSION"));
    assert!(stdout.contains("lsid"));
    assert!(!stdout.contains("_ga_tracker"), "tracker cookie survived the filter");
}

use assert_cmd::Command;
use predicates::prelude::*;

fn tlds() -> Command {
    Command::cargo_bin("tlds").unwrap()
}

#[test]
fn missing_domain_prints_usage_and_does_nothing() {
    tlds()
        .args(["-F", "tlds.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn missing_tld_source_prints_usage() {
    tlds()
        .args(["-d", "example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tld-file"));
}

#[test]
fn unreadable_tld_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("status.txt");

    tlds()
        .args(["-d", "example", "-F", "/no/such/tlds.txt", "-o"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read TLD file"));

    // Nothing ran, so the output file was never created.
    assert!(!out.exists());
}

#[test]
fn unwritable_output_file_is_fatal() {
    tlds()
        .args(["-d", "example", "--tlds", "com", "-o", "/no/such/dir/status.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to create"));
}

#[test]
fn prints_default_config() {
    tlds()
        .arg("--print-default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[probe]").and(predicate::str::contains("[tlds]")));
}

#[test]
fn unreachable_candidates_are_reported_in_verbose_mode() {
    // "127.0.0.1:1.<tld>" is not a valid URL, so every probe fails locally.
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("status.txt");

    tlds()
        .args(["-d", "127.0.0.1:1", "--tlds", "com,net,org", "-v", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("127.0.0.1:1.com [Not Active]")
                .and(predicate::str::contains("127.0.0.1:1.net [Not Active]"))
                .and(predicate::str::contains("127.0.0.1:1.org [Not Active]")),
        )
        .stderr(predicate::str::contains("3 probed, 0 active, 3 inactive"));

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn ndjson_emits_one_object_per_candidate() {
    let output = tlds()
        .args(["-d", "127.0.0.1:1", "--tlds", "com,net", "-j"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|v| v["active"] == false));
}

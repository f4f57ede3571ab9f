//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the pinscout-cli binary (finds it in target/debug when run via cargo test).
fn pinscout_cli() -> Command {
    cargo_bin_cmd!("pinscout-cli")
}

/// Path to pinscout library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("pinscout")
        .join("tests")
        .join("fixtures")
}

fn document(name: &str) -> PathBuf {
    fixtures_dir().join("documents").join(name)
}

fn pins(name: &str) -> PathBuf {
    fixtures_dir().join("pins").join(name)
}

#[test]
fn test_cli_help() {
    let mut cmd = pinscout_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pinout"));
}

#[test]
fn test_cli_version() {
    let mut cmd = pinscout_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_detect() {
    let mut cmd = pinscout_cli();

    cmd.arg("detect").arg(document("ne555.json")).arg("--no-ai");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ne555.pdf (5 pages)"))
        .stdout(predicate::str::contains("accepted"))
        .stdout(predicate::str::contains("table-shape"));
}

#[test]
fn test_cli_detect_json_output() {
    let mut cmd = pinscout_cli();

    cmd.arg("detect")
        .arg(document("ne555.json"))
        .arg("--format")
        .arg("json")
        .arg("--no-ai");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["page_count"], 5);
    assert_eq!(json["pages"][1]["decision"], "accepted");
    assert_eq!(json["pages"][2]["decision"], "rejected");
}

#[test]
fn test_cli_bundle_carries_split_table() {
    let mut cmd = pinscout_cli();

    cmd.arg("bundle").arg(document("split_table.json")).arg("--no-ai");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Relevant pages: 2, 3, 4"))
        .stdout(predicate::str::contains("Table from page 3 (continued):"));
}

#[test]
fn test_cli_extract_offline() {
    let mut cmd = pinscout_cli();

    cmd.arg("extract").arg(document("ne555.json")).arg("--no-ai");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Pinout pages: [2]"))
        .stdout(predicate::str::contains("pin extraction skipped"));
}

#[test]
fn test_cli_extract_json_report() {
    let mut cmd = pinscout_cli();

    cmd.arg("--format")
        .arg("json")
        .arg("extract")
        .arg(document("split_table.json"))
        .arg("--no-ai");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["run_id"].is_string());
    assert_eq!(json["bundle"]["entries"].as_array().unwrap().len(), 3);
    assert!(json["pin_data"].is_null());
}

#[test]
fn test_cli_layout_dip() {
    let mut cmd = pinscout_cli();

    cmd.arg("layout").arg(pins("ne555.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("NE555 (DIP, 8 pins)"))
        .stdout(predicate::str::contains("8:VCC 7:DISCH 6:THRES 5:CONT"));
}

#[test]
fn test_cli_layout_family_flag() {
    let mut cmd = pinscout_cli();

    cmd.arg("layout")
        .arg(pins("ne555.json"))
        .arg("--family")
        .arg("qfn")
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["layout"]["placements"]["3"]["side"], "bottom");
    assert_eq!(json["layout"]["source"]["name"], "QFN");
}

#[test]
fn test_cli_layout_esp32_module() {
    let mut cmd = pinscout_cli();

    cmd.arg("layout").arg(pins("esp32_wroom.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ESP32-WROOM-32"))
        .stdout(predicate::str::contains("bottom"));
}

#[test]
fn test_cli_layout_mismatch_fails() {
    let mut cmd = pinscout_cli();

    cmd.arg("layout").arg(pins("mismatch.json"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("7 pins"));
}

#[test]
fn test_cli_overrides_command() {
    let mut cmd = pinscout_cli();

    cmd.arg("overrides")
        .arg("--all")
        .arg("--override-dir")
        .arg(fixtures_dir().join("overrides"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ESP32-WROOM-32"))
        .stdout(predicate::str::contains("HDC-DFN9"))
        .stdout(predicate::str::contains("HDC1080"));
}

#[test]
fn test_cli_overrides_with_global_verbosity() {
    let mut cmd = pinscout_cli();
    cmd.arg("overrides");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ESP32-WROOM-32"))
        .stdout(predicate::str::contains("Aliases").not());

    let mut cmd = pinscout_cli();
    cmd.arg("-v")
        .arg("overrides")
        .arg("-a")
        .arg("--override-dir")
        .arg(fixtures_dir().join("overrides"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Aliases: HDC1080"));

    let mut cmd = pinscout_cli();
    cmd.arg("overrides").arg("-vv");
    cmd.assert().success();
}

#[test]
fn test_cli_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let good = dir.path().join("pinscout.json");
    std::fs::write(&good, r#"{ "offline_mode": true, "max_table_rows": 2 }"#).unwrap();

    let mut cmd = pinscout_cli();
    cmd.arg("--config").arg(&good).arg("bundle").arg(document("ne555.json"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("(6 more rows not shown)"));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{ "offline": true }"#).unwrap();

    let mut cmd = pinscout_cli();
    cmd.arg("--config").arg(&bad).arg("bundle").arg(document("ne555.json"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_nonexistent_file() {
    let mut cmd = pinscout_cli();

    cmd.arg("detect").arg("does_not_exist.json").arg("--no-ai");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_output_formats_are_different() {
    let path = document("ne555.json");

    let mut cmd_human = pinscout_cli();
    cmd_human.arg("detect").arg(&path).arg("--no-ai");
    let human_output = cmd_human.output().unwrap();

    let mut cmd_json = pinscout_cli();
    cmd_json
        .arg("detect")
        .arg(&path)
        .arg("--format")
        .arg("json")
        .arg("--no-ai");
    let json_output = cmd_json.output().unwrap();

    assert_ne!(
        human_output.stdout,
        json_output.stdout,
        "Different formats should produce different output"
    );
}

use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[profile]
builtin = "smd291ax"

[control]
sample_rate_hz = 4

[safety]
max_consecutive_faults = 2
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_cmd(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(cfg);
    cmd
}

fn only_line(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 1, "expected one JSON line, stdout was: {text}");
    serde_json::from_str(lines[0]).unwrap()
}

/// Validate the JSON schema for a successful simulated run.
#[rstest]
fn json_success_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = json_cmd(&cfg)
        .arg("run")
        .arg("--fast")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = only_line(&out);

    assert_eq!(v["profile"], "SMD291AX");
    assert_eq!(v["backend"], "sim");
    assert_eq!(v["policy"], "lookahead");
    let elapsed = v["elapsed_ms"].as_u64().unwrap();
    assert!((280_000..281_000).contains(&elapsed), "elapsed {elapsed}");
    let peak = v["peak_c"].as_f64().unwrap();
    assert!(peak >= 235.0 && peak < 260.0, "peak {peak}");
    assert!(v["final_c"].is_number());
    assert!(v["ticks"].as_u64().unwrap() > 1_000);
}

/// Aborts print a structured error object with the configured limit.
#[rstest]
fn json_abort_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = json_cmd(&cfg)
        .env("REFLOW_SIM_FAIL_AFTER", "3")
        .arg("run")
        .arg("--fast")
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let v = only_line(&out);

    assert_eq!(v["reason"], "SensorFault");
    assert_eq!(v["details"]["max_consecutive_faults"], 2);
    assert!(v["message"].as_str().unwrap().starts_with("What happened:"));
}

#[rstest]
fn json_self_check_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = json_cmd(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = only_line(&out);

    assert_eq!(v["status"], "ok");
    assert_eq!(v["backend"], "sim");
    assert_eq!(v["checkpoints"], 8);
}

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML config for the simulator backend
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# pins are unused by the simulator but must parse
thermo_spi_bus = 0
thermo_cs = 0
relay = 8
start_btn = 4

[profile]
builtin = "smd291ax"

[control]
policy = "lookahead"
switch_delay_ms = 1000
sample_rate_hz = 4

[safety]
max_consecutive_faults = 3
max_temp_c = 260
max_overrun_ms = 120000

[timeouts]
sensor_ms = 50
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--fast", "--quiet"], 0, "Reflow complete: SMD291AX", "stdout")]
#[case(&["run", "--fast", "--quiet", "--policy", "hysteresis"], 0, "Reflow complete", "stdout")]
#[case(&["run", "--policy", "pid"], 2, "invalid value", "stderr")]
#[case(&["run", "--fast", "--quiet", "--max-temp-c", "150"], 4, "exceeded the maximum temperature", "stderr")]
#[case(&["plot"], 0, "SMD291AX  280 s  peak 235 C", "stdout")]
#[case(&["self-check"], 0, "OK: sim thermocouple reads 25.00 C", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();

    // Always include a valid config to avoid relying on the default path
    cmd.arg("--config").arg(&cfg).arg("--log-level").arg("error");
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert();

    // Check exit status in a chained manner to keep ownership
    let assert = if exit_code >= 0 {
        assert.code(exit_code)
    } else {
        assert.failure()
    };

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn sensor_failure_aborts_with_code_3() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.env("REFLOW_SIM_FAIL_AFTER", "5")
        .arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("run")
        .arg("--fast")
        .arg("--quiet");

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("thermocouple kept failing"));
}

#[rstest]
fn unreachable_stage_aborts_with_max_runtime() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        r#"
[profile]
checkpoints = [[0, 25], [5, 240], [10, 240], [15, 25]]

[safety]
max_overrun_ms = 1000
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("run")
        .arg("--fast")
        .arg("--quiet");

    cmd.assert()
        .code(5)
        .stderr(predicate::str::contains("ran past its end time"));
}

#[rstest]
fn cli_reports_bad_profile_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    // Write a bad-header CSV
    let bad_csv = dir.path().join("profile.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "t,c").unwrap();
    writeln!(f, "0,25").unwrap();
    writeln!(f, "30,100").unwrap();

    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--profile-csv")
        .arg(&bad_csv)
        .arg("self-check");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn profile_csv_overrides_config_profile() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("gentle.csv");
    fs::write(&csv, "time_s,temp_c\n0,25\n20,60\n40,60\n60,40\n").unwrap();

    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("--profile-csv")
        .arg(&csv)
        .arg("run")
        .arg("--fast")
        .arg("--quiet");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Reflow complete: gentle in 60"));
}

#[rstest]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[control]\nsample_rate_hz = 0\n").unwrap();

    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.arg("--config").arg(&cfg).arg("plot");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("sample_rate_hz must be > 0"));
}

#[rstest]
fn missing_explicit_config_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("plot");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[rstest]
fn status_lines_are_printed_while_running() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("reflow_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("run")
        .arg("--fast");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Stage 1"))
        .stdout(predicate::str::contains("Done."));
}

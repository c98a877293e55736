use reflow_config::{Finish, Policy, ProfileSource, load_toml};
use rstest::rstest;

const FULL: &str = r#"
[pins]
thermo_spi_bus = 0
thermo_cs = 0
relay = 8
start_btn = 4

[profile]
name = "lead-free test"
checkpoints = [[0, 25], [30, 100], [120, 150], [150, 183], [210, 235], [240, 183], [280, 25]]

[control]
policy = "hysteresis"
switch_delay_ms = 1000
sample_rate_hz = 4
finish = "last_stage"

[lookahead]
horizon_s = 100
step_s = 5
calibrate_temp_c = 10
calibrate_seconds = 100

[preheat]
target_c = 90

[safety]
max_consecutive_faults = 3
min_plausible_c = -20
max_plausible_c = 1024
max_temp_c = 260
max_overrun_ms = 60000

[timeouts]
sensor_ms = 250
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.control.policy, Policy::Hysteresis);
    assert_eq!(cfg.control.finish, Finish::LastStage);
    match cfg.profile.source().unwrap() {
        ProfileSource::Inline(points) => assert_eq!(points.len(), 7),
        other => panic!("unexpected source: {other:?}"),
    }
}

#[test]
fn timeouts_accept_sample_ms_alias() {
    let cfg = load_toml("[timeouts]\nsample_ms = 40\n").expect("parse TOML");
    assert_eq!(cfg.timeouts.sensor_ms, 40);
}

#[test]
fn unknown_policy_fails_to_parse() {
    let err = load_toml("[control]\npolicy = \"pid\"\n").expect_err("unknown variant");
    assert!(format!("{err}").contains("unknown variant"));
}

#[rstest]
#[case("[control]\nsample_rate_hz = 0\n", "sample_rate_hz must be > 0")]
#[case("[lookahead]\nstep_s = 0\n", "lookahead.step_s must be > 0")]
#[case("[lookahead]\ncalibrate_seconds = 0\n", "calibrate_seconds must be > 0")]
#[case("[safety]\nmax_consecutive_faults = 0\n", "max_consecutive_faults must be >= 1")]
#[case(
    "[safety]\nmin_plausible_c = 100\nmax_plausible_c = 50\n",
    "min_plausible_c must be <"
)]
#[case("[preheat]\ntarget_c = 300\n", "preheat.target_c must be below")]
#[case("[timeouts]\nsensor_ms = 0\n", "sensor_ms must be >= 1")]
#[case("[profile]\ncheckpoints = [[0, 25]]\n", "at least two checkpoints")]
#[case(
    "[profile]\ncheckpoints = [[0, 25], [60, 100], [40, 150]]\n",
    "strictly increasing"
)]
#[case(
    "[profile]\ncheckpoints = [[0, 25], [60, 300]]\n",
    "reaches safety.max_temp_c"
)]
#[case("[profile]\nbuiltin = \" \"\n", "must not be empty")]
#[case("[display]\nheight = 20\n", "no room for the chart")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "unexpected error: {msg}");
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/reflow_config.toml")).expect("parse TOML");
    cfg.validate().expect("sample config should pass");
    assert_eq!(cfg.profile.source().unwrap(), ProfileSource::Builtin("smd291ax"));
    assert_eq!(cfg.display.text_height, 24);
}

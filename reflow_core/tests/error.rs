use std::error::Error;
use std::time::Duration;

use reflow_core::error::ReflowError;
use reflow_core::mocks::RecordingRelay;
use reflow_core::{ControlCfg, Oven, Profile, ReflowStatus, RelayPolicy, SafetyCfg};
use reflow_traits::{Relay, Thermocouple};

/// A thermocouple that returns OK once, then errors with a timeout message.
struct FlakyThermocouple {
    ok_sent: bool,
}
impl Thermocouple for FlakyThermocouple {
    fn read(&mut self, _timeout: Duration) -> Result<f32, Box<dyn Error + Send + Sync>> {
        if self.ok_sent {
            Err("sensor timeout".into())
        } else {
            self.ok_sent = true;
            Ok(25.0)
        }
    }
}

struct StuckRelay;
impl Relay for StuckRelay {
    fn set(&mut self, on: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
        if on {
            Err("relay coil open".into())
        } else {
            Ok(())
        }
    }
}

#[test]
fn read_errors_are_faults_not_step_errors() {
    let mut oven = Oven::builder()
        .with_thermocouple(FlakyThermocouple { ok_sent: false })
        .with_relay(RecordingRelay::new())
        .with_profile(Profile::builtin("smd291ax").unwrap())
        .with_safety(SafetyCfg {
            max_consecutive_faults: 1,
            ..SafetyCfg::default()
        })
        .with_clock(Box::new(reflow_traits::ManualClock::new()))
        .build()
        .unwrap();
    oven.begin_run();
    assert_eq!(oven.step().unwrap(), ReflowStatus::Running);
    assert!(matches!(
        oven.step().unwrap(),
        ReflowStatus::Aborted(ReflowError::Abort(_))
    ));
}

#[test]
fn relay_write_error_bubbles_as_hardware_error() {
    let mut oven = Oven::builder()
        .with_thermocouple(reflow_core::mocks::NoopThermocouple)
        .with_relay(StuckRelay)
        .with_profile(Profile::builtin("smd291ax").unwrap())
        .with_control(ControlCfg {
            policy: RelayPolicy::Hysteresis,
            ..ControlCfg::default()
        })
        .with_clock(Box::new(reflow_traits::ManualClock::new()))
        .build()
        .unwrap();
    oven.begin_run();
    let err = oven.step_from_reading(25.0).expect_err("relay failure");
    assert_eq!(
        err.downcast_ref::<ReflowError>(),
        Some(&ReflowError::Hardware("relay coil open".into()))
    );
    assert!(!oven.relay_on());
    // The failure is latched until the next run.
    assert!(matches!(
        oven.step_from_reading(25.0).unwrap(),
        ReflowStatus::Aborted(ReflowError::Hardware(_))
    ));
}

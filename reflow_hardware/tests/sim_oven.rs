use std::sync::Arc;
use std::time::Duration;

use reflow_hardware::error::HwError;
use reflow_hardware::{Relay, SimOven, SimParams, Thermocouple};
use reflow_traits::ManualClock;
use rstest::rstest;

fn oven(params: SimParams) -> (SimOven, ManualClock) {
    let clock = ManualClock::new();
    (SimOven::new(params, Arc::new(clock.clone())), clock)
}

#[rstest]
fn starts_at_ambient_and_stays_there_unpowered() {
    let (sim, clock) = oven(SimParams::default());
    let mut tc = sim.thermocouple();
    assert_eq!(tc.read(Duration::ZERO).unwrap(), 25.0);
    clock.advance(Duration::from_secs(600));
    assert!((tc.read(Duration::ZERO).unwrap() - 25.0).abs() < 1e-3);
}

#[rstest]
fn heats_while_relay_on_and_cools_after() {
    let (sim, clock) = oven(SimParams::default());
    let mut tc = sim.thermocouple();
    let mut relay = sim.relay();

    relay.set(true).unwrap();
    clock.advance(Duration::from_secs(30));
    let hot = tc.read(Duration::ZERO).unwrap();
    // Roughly 3 C/s minus small losses.
    assert!(hot > 100.0 && hot < 115.0, "hot = {hot}");

    relay.set(false).unwrap();
    clock.advance(Duration::from_secs(30));
    let cooler = tc.read(Duration::ZERO).unwrap();
    assert!(cooler < hot && cooler > 25.0, "cooler = {cooler}");
    assert_eq!(sim.switches(), 2);
    assert!(!sim.heating());
}

#[rstest]
fn trajectory_does_not_depend_on_sampling_rate() {
    let (a, clock_a) = oven(SimParams::default());
    let (b, clock_b) = oven(SimParams::default());
    a.relay().set(true).unwrap();
    b.relay().set(true).unwrap();

    let mut tc_a = a.thermocouple();
    for _ in 0..400 {
        clock_a.advance(Duration::from_millis(250));
        tc_a.read(Duration::ZERO).unwrap();
    }
    clock_b.advance(Duration::from_secs(100));
    let ta = a.temperature();
    let tb = b.temperature();
    assert!((ta - tb).abs() < 0.01, "{ta} vs {tb}");
}

#[rstest]
fn injected_fault_reports_open_thermocouple() {
    let (sim, _clock) = oven(SimParams {
        fail_after_reads: Some(2),
        ..SimParams::default()
    });
    let mut tc = sim.thermocouple();
    assert!(tc.read(Duration::ZERO).is_ok());
    assert!(tc.read(Duration::ZERO).is_ok());
    let err = tc.read(Duration::ZERO).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::OpenThermocouple)
    ));
}

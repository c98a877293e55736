//! The oven control loop (`OvenCore`).
//!
//! Contains the phase machine that drives each tick: sample validation and
//! fault counting, over-temperature and overrun watchdogs, the stage tracker,
//! the relay policy behind its dwell guard, and telemetry publication.

use std::time::Duration;

use reflow_traits::{Display, Frame, OvenPhase};

use crate::config::{ControlCfg, PreheatCfg, SafetyCfg, Timeouts};
use crate::error::{AbortReason, ReflowError, Result};
use crate::hw_error::map_hw_error;
use crate::profile::Profile;
use crate::relay::{DwellGuard, hysteresis};
use crate::run_clock::RunClock;
use crate::stage::StageTracker;
use crate::status::ReflowStatus;

/// Per-run state, created by `begin_run()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunState {
    /// Controller time at which the run began.
    pub start_ms: u64,
    pub tracker: StageTracker,
    /// Elapsed time when the run finished, if it did.
    pub finished_at_ms: Option<u64>,
}

/// Unified core for both dynamic (boxed) and generic (static dispatch) variants.
pub struct OvenCore<S: reflow_traits::Thermocouple, R: reflow_traits::Relay> {
    pub(crate) sensor: S,
    pub(crate) relay: R,
    pub(crate) profile: Profile,
    pub(crate) control: ControlCfg,
    pub(crate) preheat: PreheatCfg,
    pub(crate) safety: SafetyCfg,
    pub(crate) timeouts: Timeouts,
    pub(crate) clock: RunClock,
    pub(crate) period_ms: u64,

    pub(crate) phase: OvenPhase,
    pub(crate) run: Option<RunState>,
    pub(crate) guard: DwellGuard,
    /// True only while the last relay write that reached the hardware was "off".
    pub(crate) off_confirmed: bool,
    pub(crate) consecutive_faults: u8,
    pub(crate) last_sample_faulty: bool,
    pub(crate) last_temp_c: Option<f32>,
    pub(crate) peak_c: Option<f32>,
    pub(crate) fault: Option<ReflowError>,
    pub(crate) ticks: u64,
    pub(crate) frame: Frame,

    pub(crate) start_check: Option<Box<dyn Fn() -> bool>>,
    pub(crate) preheat_check: Option<Box<dyn Fn() -> bool>>,
    pub(crate) display: Option<Box<dyn Display>>,
}

impl<S: reflow_traits::Thermocouple, R: reflow_traits::Relay> core::fmt::Debug for OvenCore<S, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OvenCore")
            .field("profile", &self.profile.name())
            .field("phase", &self.phase)
            .field("stage", &self.stage())
            .field("last_temp_c", &self.last_temp_c)
            .field("relay_on", &self.guard.is_on())
            .finish()
    }
}

impl<S: reflow_traits::Thermocouple, R: reflow_traits::Relay> OvenCore<S, R> {
    pub fn phase(&self) -> OvenPhase {
        self.phase
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn control_cfg(&self) -> &ControlCfg {
        &self.control
    }

    /// Active stage index while a run exists.
    pub fn stage(&self) -> Option<usize> {
        self.run.map(|r| r.tracker.stage())
    }

    pub fn run_state(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    /// Setpoint the relay is currently steering toward.
    pub fn target_c(&self) -> Option<f32> {
        match self.phase {
            OvenPhase::Running => self.run.map(|r| r.tracker.target_c(&self.profile)),
            OvenPhase::Preheating => Some(self.preheat.target_c),
            _ => None,
        }
    }

    /// Last trusted chamber temperature.
    pub fn last_temperature(&self) -> Option<f32> {
        self.last_temp_c
    }

    /// Highest trusted temperature seen during the current run.
    pub fn peak_temperature(&self) -> Option<f32> {
        self.peak_c
    }

    pub fn relay_on(&self) -> bool {
        self.guard.is_on()
    }

    /// Milliseconds since `begin_run()`; frozen once finished, 0 without a run.
    pub fn elapsed_ms(&self) -> u64 {
        match self.run {
            Some(RunState {
                finished_at_ms: Some(done),
                ..
            }) => done,
            Some(r) => self.clock.since_ms(r.start_ms),
            None => 0,
        }
    }

    /// Telemetry from the most recent tick.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Ticks processed since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Control loop period in milliseconds.
    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Latched error that stopped the controller, if any.
    pub fn fault(&self) -> Option<&ReflowError> {
        self.fault.as_ref()
    }

    /// Start a reflow run now. Clears any latched fault and per-run state.
    pub fn begin_run(&mut self) {
        let now = self.clock.now_ms();
        self.run = Some(RunState {
            start_ms: now,
            tracker: StageTracker::new(self.control.finish),
            finished_at_ms: None,
        });
        self.phase = OvenPhase::Running;
        self.fault = None;
        self.consecutive_faults = 0;
        self.peak_c = self.last_temp_c;
        tracing::info!(
            profile = self.profile.name().unwrap_or("custom"),
            duration_ms = self.profile.duration_ms(),
            policy = self.control.policy.name(),
            "reflow run started"
        );
    }

    /// Enter the preheat hold from `Idle`. Ignored in any other phase.
    pub fn begin_preheat(&mut self) {
        if self.phase == OvenPhase::Idle {
            self.phase = OvenPhase::Preheating;
            tracing::info!(target_c = self.preheat.target_c, "preheat started");
        }
    }

    /// One iteration of the control loop (reads the thermocouple internally,
    /// then sleeps one period unless the outcome is terminal).
    pub fn step(&mut self) -> Result<ReflowStatus> {
        let timeout = Duration::from_millis(self.timeouts.sensor_ms);
        let sample = self.sensor.read(timeout).map_err(|e| map_hw_error(&*e));
        let status = self.process(sample)?;
        if !status.is_terminal() {
            self.clock.sleep(Duration::from_millis(self.period_ms));
        }
        Ok(status)
    }

    /// Process an externally sampled reading. Does not sleep.
    pub fn step_from_reading(&mut self, celsius: f32) -> Result<ReflowStatus> {
        self.process(Ok(celsius))
    }

    /// Force the relay off immediately, ignoring the dwell.
    ///
    /// The guard is cleared only once the write succeeds; on failure the relay
    /// counts as possibly energised and latched ticks keep retrying.
    pub fn relay_off(&mut self) -> Result<()> {
        if let Err(e) = self.relay.set(false) {
            self.off_confirmed = false;
            return Err(eyre::Report::new(map_hw_error(&*e)));
        }
        self.off_confirmed = true;
        let now = self.clock.now_ms();
        self.guard.force_off(now);
        Ok(())
    }

    /// Stop with the relay off and latch `reason` until the next `begin_run()`.
    pub fn abort(&mut self, reason: AbortReason) -> ReflowStatus {
        if let Err(e) = self.relay_off() {
            tracing::warn!(error = %e, "relay off failed during abort");
        }
        let err = ReflowError::Abort(reason);
        tracing::error!(error = %err, elapsed_ms = self.elapsed_ms(), "reflow aborted");
        self.phase = OvenPhase::Fault;
        self.fault = Some(err.clone());
        self.publish();
        ReflowStatus::Aborted(err)
    }

    fn process(&mut self, sample: core::result::Result<f32, ReflowError>) -> Result<ReflowStatus> {
        self.ticks = self.ticks.saturating_add(1);

        match self.phase {
            OvenPhase::Finished => return self.hold_off(ReflowStatus::Finished),
            OvenPhase::Fault => {
                let err = self
                    .fault
                    .clone()
                    .unwrap_or_else(|| ReflowError::State("fault without cause".into()));
                return self.hold_off(ReflowStatus::Aborted(err));
            }
            _ => {}
        }

        let now = self.clock.now_ms();
        let celsius = match self.validate(sample) {
            Some(c) => c,
            None => {
                if self.consecutive_faults >= self.safety.max_consecutive_faults {
                    return Ok(self.abort(AbortReason::SensorFault));
                }
                self.publish();
                return Ok(self.live_status());
            }
        };

        if celsius > self.safety.max_temp_c {
            tracing::error!(celsius, max_temp_c = self.safety.max_temp_c, "over-temperature");
            return Ok(self.abort(AbortReason::OverTemperature));
        }

        let status = match self.phase {
            OvenPhase::Idle => {
                self.apply(Some(false), now)?;
                if self.start_pressed() {
                    self.begin_run();
                } else if self.preheat_pressed() {
                    self.begin_preheat();
                }
                self.live_status()
            }
            OvenPhase::Preheating => {
                self.apply(hysteresis(self.preheat.target_c, celsius), now)?;
                if self.start_pressed() {
                    self.begin_run();
                }
                self.live_status()
            }
            OvenPhase::Running => self.run_tick(celsius, now)?,
            OvenPhase::Finished | OvenPhase::Fault => self.live_status(),
        };

        if !status.is_terminal() {
            self.publish();
        }
        Ok(status)
    }

    /// Count faults and return the trusted reading, if any.
    fn validate(&mut self, sample: core::result::Result<f32, ReflowError>) -> Option<f32> {
        let checked = sample.and_then(|c| {
            if c.is_finite() && c >= self.safety.min_plausible_c && c <= self.safety.max_plausible_c {
                Ok(c)
            } else {
                Err(ReflowError::Implausible(c))
            }
        });
        match checked {
            Ok(c) => {
                self.consecutive_faults = 0;
                self.last_sample_faulty = false;
                self.last_temp_c = Some(c);
                if self.phase == OvenPhase::Running {
                    self.peak_c = Some(self.peak_c.map_or(c, |p| p.max(c)));
                }
                Some(c)
            }
            Err(e) => {
                self.consecutive_faults = self.consecutive_faults.saturating_add(1);
                self.last_sample_faulty = true;
                tracing::warn!(
                    error = %e,
                    consecutive = self.consecutive_faults,
                    limit = self.safety.max_consecutive_faults,
                    "thermocouple sample rejected"
                );
                None
            }
        }
    }

    fn run_tick(&mut self, celsius: f32, now: u64) -> Result<ReflowStatus> {
        let Some(mut run) = self.run else {
            return Err(eyre::Report::new(ReflowError::State(
                "running without a run state".into(),
            )));
        };
        let elapsed = now.saturating_sub(run.start_ms);
        let update = run.tracker.update(&self.profile, elapsed, celsius);
        if update.advanced > 0 {
            tracing::info!(
                stage = run.tracker.stage(),
                target_c = run.tracker.target_c(&self.profile),
                elapsed_ms = elapsed,
                "stage advanced"
            );
        }

        if update.finished {
            run.finished_at_ms = Some(elapsed);
            self.run = Some(run);
            self.relay_off()?;
            self.phase = OvenPhase::Finished;
            tracing::info!(
                elapsed_ms = elapsed,
                peak_c = self.peak_c.unwrap_or(celsius),
                "reflow finished"
            );
            self.publish();
            return Ok(ReflowStatus::Finished);
        }
        self.run = Some(run);

        let limit = self
            .profile
            .duration_ms()
            .saturating_add(self.safety.max_overrun_ms);
        if elapsed > limit {
            return Ok(self.abort(AbortReason::MaxRuntime));
        }

        let tracker = run.tracker;
        let profile = &self.profile;
        let desired = self.control.policy.decide(
            celsius,
            tracker.target_c(profile),
            |offset_ms| tracker.target_at(profile, elapsed.saturating_add(offset_ms)),
        );
        self.apply(desired, now)?;
        Ok(ReflowStatus::Running)
    }

    /// Pass a desired state through the dwell guard and write transitions.
    fn apply(&mut self, desired: Option<bool>, now: u64) -> Result<()> {
        if let Some(on) = self.guard.request(desired, now) {
            if let Err(e) = self.relay.set(on) {
                self.off_confirmed = false;
                let err = map_hw_error(&*e);
                tracing::error!(error = %err, on, "relay write failed");
                if let Err(e2) = self.relay_off() {
                    tracing::warn!(error = %e2, "relay off failed after write error");
                }
                self.phase = OvenPhase::Fault;
                self.fault = Some(err.clone());
                return Err(eyre::Report::new(err));
            }
            self.off_confirmed = !on;
            tracing::debug!(on, now_ms = now, "relay switched");
        }
        Ok(())
    }

    /// Terminal phases: keep the relay off whatever the sensor says.
    fn hold_off(&mut self, status: ReflowStatus) -> Result<ReflowStatus> {
        if !self.off_confirmed {
            tracing::warn!("retrying relay off in latched phase");
            self.relay_off()?;
        }
        self.publish();
        Ok(status)
    }

    fn live_status(&self) -> ReflowStatus {
        match self.phase {
            OvenPhase::Idle => ReflowStatus::Idle,
            OvenPhase::Preheating => ReflowStatus::Preheating,
            OvenPhase::Running => ReflowStatus::Running,
            OvenPhase::Finished => ReflowStatus::Finished,
            OvenPhase::Fault => ReflowStatus::Aborted(
                self.fault
                    .clone()
                    .unwrap_or_else(|| ReflowError::State("fault without cause".into())),
            ),
        }
    }

    fn start_pressed(&self) -> bool {
        self.start_check.as_ref().is_some_and(|f| f())
    }

    fn preheat_pressed(&self) -> bool {
        self.preheat_check.as_ref().is_some_and(|f| f())
    }

    /// Snapshot this tick and hand it to the display sink.
    fn publish(&mut self) {
        self.frame = Frame {
            phase: self.phase,
            elapsed_ms: self.elapsed_ms(),
            measured_c: self.last_temp_c,
            target_c: self.target_c(),
            relay_on: self.guard.is_on(),
            stage: self.stage(),
            sensor_fault: self.last_sample_faulty,
        };
        if let Some(display) = self.display.as_mut()
            && let Err(e) = display.render(&self.frame)
        {
            tracing::warn!(error = %e, "display render failed");
        }
    }
}

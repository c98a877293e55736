//! Type-state builder for `Oven` and generic `build_oven` constructor.
//!
//! The builder enforces at compile time that the thermocouple, relay and
//! profile are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use eyre::WrapErr;
use reflow_traits::clock::{Clock, MonotonicClock};
use reflow_traits::{Display, Frame, OvenPhase};

use crate::config::*;
use crate::core::{OvenCore, RunState};
use crate::error::{AbortReason, BuildError, ReflowError, Result};
use crate::hw_error::map_hw_error;
use crate::profile::Profile;
use crate::relay::DwellGuard;
use crate::run_clock::RunClock;
use crate::status::ReflowStatus;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Oven controller with boxed hardware, as assembled by [`OvenBuilder`].
pub struct Oven {
    pub(crate) inner: OvenCore<Box<dyn reflow_traits::Thermocouple>, Box<dyn reflow_traits::Relay>>,
}

impl core::fmt::Debug for Oven {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Oven")
            .field("profile", &self.inner.profile().name())
            .field("phase", &self.inner.phase())
            .field("stage", &self.inner.stage())
            .field("relay_on", &self.inner.relay_on())
            .finish()
    }
}

impl Oven {
    /// Start building an Oven.
    pub fn builder() -> OvenBuilder<Missing, Missing, Missing> {
        OvenBuilder::default()
    }

    /// Start a reflow run now.
    pub fn begin_run(&mut self) {
        self.inner.begin_run();
    }

    /// Enter the preheat hold (only from `Idle`).
    pub fn begin_preheat(&mut self) {
        self.inner.begin_preheat();
    }

    /// One iteration of the control loop.
    pub fn step(&mut self) -> Result<ReflowStatus> {
        self.inner.step()
    }

    /// Process a pre-sampled temperature (for external sampling).
    pub fn step_from_reading(&mut self, celsius: f32) -> Result<ReflowStatus> {
        self.inner.step_from_reading(celsius)
    }

    /// Force the relay off (best-effort).
    pub fn relay_off(&mut self) -> Result<()> {
        self.inner.relay_off()
    }

    /// Stop with the relay off and latch `reason`.
    pub fn abort(&mut self, reason: AbortReason) -> ReflowStatus {
        self.inner.abort(reason)
    }

    pub fn phase(&self) -> OvenPhase {
        self.inner.phase()
    }

    pub fn profile(&self) -> &Profile {
        self.inner.profile()
    }

    pub fn stage(&self) -> Option<usize> {
        self.inner.stage()
    }

    pub fn run_state(&self) -> Option<&RunState> {
        self.inner.run_state()
    }

    pub fn target_c(&self) -> Option<f32> {
        self.inner.target_c()
    }

    pub fn last_temperature(&self) -> Option<f32> {
        self.inner.last_temperature()
    }

    pub fn peak_temperature(&self) -> Option<f32> {
        self.inner.peak_temperature()
    }

    pub fn relay_on(&self) -> bool {
        self.inner.relay_on()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.inner.elapsed_ms()
    }

    pub fn frame(&self) -> Frame {
        self.inner.frame()
    }

    pub fn ticks(&self) -> u64 {
        self.inner.ticks()
    }

    pub fn period_ms(&self) -> u64 {
        self.inner.period_ms()
    }

    pub fn fault(&self) -> Option<&ReflowError> {
        self.inner.fault()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Oven`. All fields are validated on `build()`.
pub struct OvenBuilder<S, R, P> {
    sensor: Option<Box<dyn reflow_traits::Thermocouple>>,
    relay: Option<Box<dyn reflow_traits::Relay>>,
    profile: Option<Profile>,
    control: Option<ControlCfg>,
    preheat: Option<PreheatCfg>,
    safety: Option<SafetyCfg>,
    timeouts: Option<Timeouts>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    display: Option<Box<dyn Display>>,
    start_check: Option<Box<dyn Fn() -> bool>>,
    preheat_check: Option<Box<dyn Fn() -> bool>>,
    _s: PhantomData<S>,
    _r: PhantomData<R>,
    _p: PhantomData<P>,
}

impl Default for OvenBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            relay: None,
            profile: None,
            control: None,
            preheat: None,
            safety: None,
            timeouts: None,
            clock: None,
            display: None,
            start_check: None,
            preheat_check: None,
            _s: PhantomData,
            _r: PhantomData,
            _p: PhantomData,
        }
    }
}

/// Optional collaborators that are not validated.
#[derive(Default)]
pub struct Extras {
    pub clock: Option<Box<dyn Clock + Send + Sync>>,
    pub display: Option<Box<dyn Display>>,
    pub start_check: Option<Box<dyn Fn() -> bool>>,
    pub preheat_check: Option<Box<dyn Fn() -> bool>>,
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Shared validation and construction for both dynamic and generic ovens.
///
/// Drives the relay off once so the heater starts in a known state.
#[allow(clippy::too_many_arguments)]
pub(crate) fn validate_and_build<S, R>(
    sensor: S,
    mut relay: R,
    profile: Profile,
    control: ControlCfg,
    preheat: PreheatCfg,
    safety: SafetyCfg,
    timeouts: Timeouts,
    extras: Extras,
) -> Result<OvenCore<S, R>>
where
    S: reflow_traits::Thermocouple,
    R: reflow_traits::Relay,
{
    // ── Validate ─────────────────────────────────────────────────────────────
    if control.sample_rate_hz == 0 {
        return Err(invalid("sample_rate_hz must be > 0"));
    }
    if control.sample_rate_hz > 1000 {
        return Err(invalid("sample_rate_hz must be <= 1000"));
    }
    if let RelayPolicy::Lookahead(la) = control.policy {
        if !la.slope_c_per_s.is_finite() {
            return Err(invalid("lookahead slope must be finite"));
        }
        if la.step_ms == 0 {
            return Err(invalid("lookahead step must be > 0"));
        }
    }
    if safety.max_consecutive_faults == 0 {
        return Err(invalid("max_consecutive_faults must be >= 1"));
    }
    if !(safety.min_plausible_c.is_finite()
        && safety.max_plausible_c.is_finite()
        && safety.min_plausible_c < safety.max_plausible_c)
    {
        return Err(invalid("plausible range must be finite and ordered"));
    }
    if !(safety.max_temp_c.is_finite() && safety.max_temp_c > 0.0) {
        return Err(invalid("max_temp_c must be > 0"));
    }
    if !(preheat.target_c.is_finite() && preheat.target_c < safety.max_temp_c) {
        return Err(invalid("preheat target must be below max_temp_c"));
    }
    if timeouts.sensor_ms == 0 {
        return Err(invalid("sensor timeout must be >= 1 ms"));
    }

    // ── Precompute ───────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match extras.clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let period_ms = crate::util::period_ms(control.sample_rate_hz);

    relay
        .set(false)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("initialising relay")?;

    Ok(OvenCore {
        sensor,
        relay,
        profile,
        control,
        preheat,
        safety,
        timeouts,
        clock: RunClock::new(clock),
        period_ms,
        phase: OvenPhase::Idle,
        run: None,
        guard: DwellGuard::new(control.switch_delay_ms),
        off_confirmed: true,
        consecutive_faults: 0,
        last_sample_faulty: false,
        last_temp_c: None,
        peak_c: None,
        fault: None,
        ticks: 0,
        frame: Frame::default(),
        start_check: extras.start_check,
        preheat_check: extras.preheat_check,
        display: extras.display,
    })
}

impl<S, R, P> OvenBuilder<S, R, P> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Oven> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let relay = self
            .relay
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRelay))?;
        let profile = self
            .profile
            .ok_or_else(|| eyre::Report::new(BuildError::MissingProfile))?;

        let inner = validate_and_build(
            sensor,
            relay,
            profile,
            self.control.unwrap_or_default(),
            self.preheat.unwrap_or_default(),
            self.safety.unwrap_or_default(),
            self.timeouts.unwrap_or_default(),
            Extras {
                clock: self.clock,
                display: self.display,
                start_check: self.start_check,
                preheat_check: self.preheat_check,
            },
        )?;

        Ok(Oven { inner })
    }

    fn retype<S2, R2, P2>(self) -> OvenBuilder<S2, R2, P2> {
        OvenBuilder {
            sensor: self.sensor,
            relay: self.relay,
            profile: self.profile,
            control: self.control,
            preheat: self.preheat,
            safety: self.safety,
            timeouts: self.timeouts,
            clock: self.clock,
            display: self.display,
            start_check: self.start_check,
            preheat_check: self.preheat_check,
            _s: PhantomData,
            _r: PhantomData,
            _p: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<S, R, P> OvenBuilder<S, R, P> {
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_preheat(mut self, preheat: PreheatCfg) -> Self {
        self.preheat = Some(preheat);
        self
    }
    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.safety = Some(safety);
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
    /// Override only the relay policy, keeping other control settings.
    pub fn with_policy(mut self, policy: RelayPolicy) -> Self {
        let mut c = self.control.unwrap_or_default();
        c.policy = policy;
        self.control = Some(c);
        self
    }
    pub fn with_start_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.start_check = Some(Box::new(f));
        self
    }
    pub fn with_preheat_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.preheat_check = Some(Box::new(f));
        self
    }
    /// Telemetry sink rendered every tick.
    pub fn with_display(mut self, display: impl Display + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<R, P> OvenBuilder<Missing, R, P> {
    pub fn with_thermocouple(
        mut self,
        sensor: impl reflow_traits::Thermocouple + 'static,
    ) -> OvenBuilder<Set, R, P> {
        self.sensor = Some(Box::new(sensor));
        self.retype()
    }
}

impl<S, P> OvenBuilder<S, Missing, P> {
    pub fn with_relay(mut self, relay: impl reflow_traits::Relay + 'static) -> OvenBuilder<S, Set, P> {
        self.relay = Some(Box::new(relay));
        self.retype()
    }
}

impl<S, R> OvenBuilder<S, R, Missing> {
    pub fn with_profile(mut self, profile: Profile) -> OvenBuilder<S, R, Set> {
        self.profile = Some(profile);
        self.retype()
    }
}

impl OvenBuilder<Set, Set, Set> {
    /// Validate and build the Oven. Only available when sensor, relay and profile are set.
    pub fn build(self) -> Result<Oven> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the unified core.
pub type OvenG<S, R> = OvenCore<S, R>;

/// Build a generic, statically-dispatched `OvenG` from concrete hardware.
///
/// Delegates to the shared `validate_and_build`.
#[allow(clippy::too_many_arguments)]
pub fn build_oven<S, R>(
    sensor: S,
    relay: R,
    profile: Profile,
    control: ControlCfg,
    preheat: PreheatCfg,
    safety: SafetyCfg,
    timeouts: Timeouts,
    extras: Extras,
) -> Result<OvenG<S, R>>
where
    S: reflow_traits::Thermocouple,
    R: reflow_traits::Relay,
{
    validate_and_build(sensor, relay, profile, control, preheat, safety, timeouts, extras)
}

//! Heater relay decisions.
//!
//! Policies answer "should the heater be on?" as `Option<bool>`, where `None`
//! means "leave it as it is". The [`DwellGuard`] then decides whether the
//! physical relay may actually change.

/// Relay policy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelayPolicy {
    Hysteresis,
    Lookahead(Lookahead),
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self::Lookahead(Lookahead::default())
    }
}

impl RelayPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hysteresis => "hysteresis",
            Self::Lookahead(_) => "lookahead",
        }
    }

    /// Desired relay state given the current reading.
    ///
    /// `forecast(offset_ms)` returns the setpoint expected `offset_ms` from now.
    pub fn decide(
        &self,
        measured_c: f32,
        target_now_c: f32,
        forecast: impl Fn(u64) -> f32,
    ) -> Option<bool> {
        match self {
            Self::Hysteresis => hysteresis(target_now_c, measured_c),
            Self::Lookahead(la) => la.decide(measured_c, target_now_c, forecast),
        }
    }
}

/// Heat when below target, stop when above, hold when equal.
#[inline]
pub fn hysteresis(target_c: f32, measured_c: f32) -> Option<bool> {
    if target_c > measured_c {
        Some(true)
    } else if target_c < measured_c {
        Some(false)
    } else {
        None
    }
}

/// Predictive policy: heat now if a steady climb would fall behind the
/// setpoint anywhere within the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookahead {
    pub horizon_ms: u64,
    pub step_ms: u64,
    /// Expected heating rate while the element is on.
    pub slope_c_per_s: f32,
}

impl Default for Lookahead {
    fn default() -> Self {
        Self::from_calibration(100.0, 5.0, 10.0, 100.0)
    }
}

impl Lookahead {
    /// Build from the calibration pair "the oven gains `temp_c` in `seconds`".
    pub fn from_calibration(horizon_s: f32, step_s: f32, temp_c: f32, seconds: f32) -> Self {
        let slope_c_per_s = if seconds > 0.0 { temp_c / seconds } else { 0.0 };
        Self {
            horizon_ms: crate::profile::secs_to_ms(horizon_s),
            step_ms: crate::profile::secs_to_ms(step_s).max(1),
            slope_c_per_s,
        }
    }

    /// Predicted chamber temperature `offset_ms` from now.
    #[inline]
    pub fn predict(&self, measured_c: f32, offset_ms: u64) -> f32 {
        measured_c + self.slope_c_per_s * (offset_ms as f32 / 1000.0)
    }

    pub fn decide(
        &self,
        measured_c: f32,
        target_now_c: f32,
        forecast: impl Fn(u64) -> f32,
    ) -> Option<bool> {
        let step = self.step_ms.max(1);
        let mut offset = 0u64;
        while offset <= self.horizon_ms {
            let target = if offset == 0 {
                target_now_c
            } else {
                forecast(offset)
            };
            if self.predict(measured_c, offset) < target {
                return Some(true);
            }
            offset = match offset.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
        if measured_c == target_now_c {
            None
        } else {
            Some(false)
        }
    }
}

/// Minimum time between relay transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellGuard {
    switch_delay_ms: u64,
    on: bool,
    last_switch_ms: Option<u64>,
}

impl DwellGuard {
    pub fn new(switch_delay_ms: u64) -> Self {
        Self {
            switch_delay_ms,
            on: false,
            last_switch_ms: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn last_switch_ms(&self) -> Option<u64> {
        self.last_switch_ms
    }

    pub fn switch_delay_ms(&self) -> u64 {
        self.switch_delay_ms
    }

    /// True while a transition requested at `now_ms` would be refused.
    pub fn is_dwelling(&self, now_ms: u64) -> bool {
        self.last_switch_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.switch_delay_ms)
    }

    /// Ask for `desired`. Returns the new state when a transition is committed.
    pub fn request(&mut self, desired: Option<bool>, now_ms: u64) -> Option<bool> {
        let want = desired?;
        if want == self.on || self.is_dwelling(now_ms) {
            return None;
        }
        self.on = want;
        self.last_switch_ms = Some(now_ms);
        Some(want)
    }

    /// Turn off immediately, ignoring the dwell. Returns true if the state changed.
    pub fn force_off(&mut self, now_ms: u64) -> bool {
        if !self.on {
            return false;
        }
        self.on = false;
        self.last_switch_ms = Some(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_cases() {
        assert_eq!(hysteresis(200.0, 150.0), Some(true));
        assert_eq!(hysteresis(150.0, 200.0), Some(false));
        assert_eq!(hysteresis(183.0, 183.0), None);
    }

    #[test]
    fn default_lookahead_matches_calibration() {
        let la = Lookahead::default();
        assert_eq!(la.horizon_ms, 100_000);
        assert_eq!(la.step_ms, 5_000);
        assert!((la.slope_c_per_s - 0.1).abs() < 1e-6);
        assert!((la.predict(180.0, 100_000) - 190.0).abs() < 1e-3);
    }

    #[test]
    fn lookahead_heats_for_upcoming_step() {
        let la = Lookahead::default();
        // 180 now, 183 until 30 s from now, then 235.
        let forecast = |off: u64| if off > 30_000 { 235.0 } else { 183.0 };
        assert_eq!(la.decide(180.0, 183.0, forecast), Some(true));
    }

    #[test]
    fn lookahead_heats_where_hysteresis_would_not() {
        let la = Lookahead::default();
        let forecast = |off: u64| if off > 30_000 { 235.0 } else { 183.0 };
        assert_eq!(hysteresis(183.0, 185.0), Some(false));
        assert_eq!(la.decide(185.0, 183.0, forecast), Some(true));
    }

    #[test]
    fn lookahead_stops_when_ahead_of_whole_horizon() {
        let la = Lookahead::default();
        assert_eq!(la.decide(200.0, 183.0, |_| 183.0), Some(false));
    }

    #[test]
    fn lookahead_holds_when_exactly_on_flat_target() {
        let la = Lookahead::default();
        assert_eq!(la.decide(183.0, 183.0, |_| 183.0), None);
    }

    #[test]
    fn policy_dispatch() {
        let forecast = |_| 300.0;
        assert_eq!(RelayPolicy::Hysteresis.decide(190.0, 183.0, forecast), Some(false));
        assert_eq!(RelayPolicy::default().decide(190.0, 183.0, forecast), Some(true));
        assert_eq!(RelayPolicy::default().name(), "lookahead");
    }

    #[test]
    fn first_transition_is_always_allowed() {
        let mut g = DwellGuard::new(1_000);
        assert_eq!(g.request(Some(true), 0), Some(true));
        assert!(g.is_on());
    }

    #[test]
    fn dwell_blocks_fast_toggle() {
        let mut g = DwellGuard::new(1_000);
        g.request(Some(true), 0);
        assert_eq!(g.request(Some(false), 999), None);
        assert!(g.is_on());
        assert_eq!(g.request(Some(false), 1_000), Some(false));
        assert_eq!(g.last_switch_ms(), Some(1_000));
    }

    #[test]
    fn hold_and_same_state_do_not_switch() {
        let mut g = DwellGuard::new(0);
        assert_eq!(g.request(None, 10), None);
        assert_eq!(g.request(Some(false), 10), None);
        assert_eq!(g.last_switch_ms(), None);
    }

    #[test]
    fn force_off_bypasses_dwell() {
        let mut g = DwellGuard::new(10_000);
        g.request(Some(true), 0);
        assert!(g.force_off(1));
        assert!(!g.is_on());
        assert!(!g.force_off(2));
    }
}

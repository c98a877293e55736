//! Runtime configuration for the oven controller.
//!
//! These are the structs `OvenCore` consumes. They are separate from the
//! TOML-deserialized config in `reflow_config`; see `conversions`.

pub use crate::relay::{Lookahead, RelayPolicy};
pub use crate::stage::FinishRule;

/// Control loop and relay behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCfg {
    pub policy: RelayPolicy,
    /// Minimum time between relay transitions.
    pub switch_delay_ms: u64,
    /// Loop rate; one sensor read per tick.
    pub sample_rate_hz: u32,
    pub finish: FinishRule,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            policy: RelayPolicy::default(),
            switch_delay_ms: 1_000,
            sample_rate_hz: 4,
            finish: FinishRule::EndOfProfile,
        }
    }
}

/// Holding temperature while waiting for the start input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreheatCfg {
    pub target_c: f32,
}

impl Default for PreheatCfg {
    fn default() -> Self {
        Self { target_c: 80.0 }
    }
}

/// Safety limits. Any breach forces the relay off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyCfg {
    /// Consecutive rejected samples before aborting.
    pub max_consecutive_faults: u8,
    /// Readings outside this range count as sensor faults.
    pub min_plausible_c: f32,
    pub max_plausible_c: f32,
    /// Trusted readings above this abort the run.
    pub max_temp_c: f32,
    /// Grace period after the profile end before aborting an unfinished run.
    pub max_overrun_ms: u64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            max_consecutive_faults: 3,
            min_plausible_c: -20.0,
            max_plausible_c: 1024.0,
            max_temp_c: 260.0,
            max_overrun_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 250 }
    }
}

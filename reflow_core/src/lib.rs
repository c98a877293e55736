#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core reflow control logic (hardware-agnostic).
//!
//! All hardware interactions go through the `reflow_traits::Thermocouple`,
//! `reflow_traits::Relay` and `reflow_traits::Display` traits, and all time
//! through `reflow_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Profile**: validated checkpoint list and built-in profiles (`profile`)
//! - **Curve**: constrained spline for display only (`curve`)
//! - **Stage tracking**: goal-and-time stage advancement (`stage`)
//! - **Relay decision**: hysteresis or lookahead behind a dwell guard (`relay`)
//! - **Controller**: phase machine, safety watchdogs, telemetry (`OvenCore`)
//! - **Runner**: start-to-finish loop with a shutdown flag (`runner`)
//!
//! The heater is driven only by checkpoint temperatures; the interpolated
//! curve never feeds back into control.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod core;
pub mod curve;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod profile;
pub mod relay;
pub mod run_clock;
pub mod runner;
pub mod stage;
pub mod status;
pub mod util;

pub use builder::{Extras, Missing, Oven, OvenBuilder, OvenG, Set, build_oven};
pub use config::{ControlCfg, FinishRule, Lookahead, PreheatCfg, RelayPolicy, SafetyCfg, Timeouts};
pub use conversions::{profile_from_config, profile_from_csv};
pub use crate::core::{OvenCore, RunState};
pub use curve::CurveEvaluator;
pub use error::{AbortReason, BuildError, ProfileError, ReflowError, Report, Result};
pub use hw_error::map_hw_error;
pub use profile::{BUILTIN_PROFILES, Bounds, Checkpoint, Profile};
pub use relay::{DwellGuard, hysteresis};
pub use run_clock::RunClock;
pub use runner::{RunParams, RunReport, run};
pub use stage::{StageTracker, StageUpdate};
pub use status::ReflowStatus;

pub use reflow_traits::{Frame, OvenPhase};

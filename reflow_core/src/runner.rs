//! Drive an oven from start to a terminal status.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reflow_traits::Display;
use reflow_traits::clock::Clock;

use crate::builder::{Extras, build_oven};
use crate::config::{ControlCfg, PreheatCfg, SafetyCfg, Timeouts};
use crate::error::{AbortReason, Result as CoreResult};
use crate::profile::Profile;
use crate::status::ReflowStatus;

/// Everything `run` needs besides the hardware.
pub struct RunParams {
    pub profile: Profile,
    pub control: ControlCfg,
    pub preheat: PreheatCfg,
    pub safety: SafetyCfg,
    pub timeouts: Timeouts,
    /// When false the run starts immediately instead of waiting for the start input.
    pub wait_for_start: bool,
    pub start_check: Option<Box<dyn Fn() -> bool + Send + Sync>>,
    pub preheat_check: Option<Box<dyn Fn() -> bool + Send + Sync>>,
    /// Polled every tick; when set the relay is forced off and the run aborts.
    pub shutdown: Option<Arc<AtomicBool>>,
    pub clock: Option<Box<dyn Clock + Send + Sync>>,
    pub display: Option<Box<dyn Display>>,
}

impl RunParams {
    /// Defaults for everything except the profile; starts without waiting.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            control: ControlCfg::default(),
            preheat: PreheatCfg::default(),
            safety: SafetyCfg::default(),
            timeouts: Timeouts::default(),
            wait_for_start: false,
            start_check: None,
            preheat_check: None,
            shutdown: None,
            clock: None,
            display: None,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub profile: Option<String>,
    /// Run time from start to finish.
    pub elapsed_ms: u64,
    /// Highest trusted temperature during the run.
    pub peak_c: Option<f32>,
    /// Last trusted temperature.
    pub final_c: Option<f32>,
    /// Control ticks processed, including any wait for start.
    pub ticks: u64,
}

fn into_core_check(
    f: Option<Box<dyn Fn() -> bool + Send + Sync>>,
) -> Option<Box<dyn Fn() -> bool>> {
    f.map(|f| -> Box<dyn Fn() -> bool> { Box::new(f) })
}

/// Run the controller until the profile finishes or the run aborts.
///
/// Aborts surface as `Err` carrying the typed `ReflowError`; the relay is
/// off on every exit path.
pub fn run<S, R>(sensor: S, relay: R, params: RunParams) -> CoreResult<RunReport>
where
    S: reflow_traits::Thermocouple + 'static,
    R: reflow_traits::Relay + 'static,
{
    let RunParams {
        profile,
        control,
        preheat,
        safety,
        timeouts,
        wait_for_start,
        start_check,
        preheat_check,
        shutdown,
        clock,
        display,
    } = params;

    let mut oven = build_oven(
        sensor,
        relay,
        profile,
        control,
        preheat,
        safety,
        timeouts,
        Extras {
            clock,
            display,
            start_check: into_core_check(start_check),
            preheat_check: into_core_check(preheat_check),
        },
    )?;

    if wait_for_start {
        tracing::info!("waiting for start input");
    } else {
        oven.begin_run();
    }

    loop {
        if shutdown.as_ref().is_some_and(|f| f.load(Ordering::Relaxed)) {
            if let ReflowStatus::Aborted(e) = oven.abort(AbortReason::Shutdown) {
                return Err(crate::error::Report::new(e));
            }
        }

        let status = match oven.step() {
            Ok(s) => s,
            Err(e) => {
                let _ = oven.relay_off();
                return Err(e);
            }
        };

        match status {
            ReflowStatus::Idle | ReflowStatus::Preheating | ReflowStatus::Running => continue,
            ReflowStatus::Finished => {
                let report = RunReport {
                    profile: oven.profile().name().map(str::to_string),
                    elapsed_ms: oven.elapsed_ms(),
                    peak_c: oven.peak_temperature(),
                    final_c: oven.last_temperature(),
                    ticks: oven.ticks(),
                };
                tracing::info!(
                    elapsed_ms = report.elapsed_ms,
                    peak_c = ?report.peak_c,
                    "reflow complete"
                );
                return Ok(report);
            }
            ReflowStatus::Aborted(e) => {
                let _ = oven.relay_off();
                return Err(crate::error::Report::new(e));
            }
        }
    }
}

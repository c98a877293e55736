//! Reflow run: config mapping, backend assembly, and run execution.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use reflow_core::error::Result as CoreResult;
use reflow_core::runner::{RunParams, RunReport};
use reflow_core::{ControlCfg, PreheatCfg, Profile, RelayPolicy, SafetyCfg, Timeouts};

use crate::cli::{CliSafety, LAST_SAFETY, PolicyArg};

/// Env var: make the simulated thermocouple fail after this many reads.
pub const SIM_FAIL_AFTER_ENV: &str = "REFLOW_SIM_FAIL_AFTER";

pub fn abort_reason_name(r: &reflow_core::AbortReason) -> &'static str {
    use reflow_core::AbortReason::*;
    match r {
        SensorFault => "SensorFault",
        OverTemperature => "OverTemperature",
        MaxRuntime => "MaxRuntime",
        Shutdown => "Shutdown",
    }
}

/// Flags of the `run` subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub no_wait: bool,
    pub policy: Option<PolicyArg>,
    pub switch_delay_ms: Option<u64>,
    pub max_temp_c: Option<f32>,
    pub fast: bool,
    pub quiet: bool,
    pub json: bool,
}

/// Completed run plus how it was driven.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: RunReport,
    pub policy: &'static str,
    pub backend: &'static str,
}

/// Resolve the profile: `--profile-csv` wins over the `[profile]` section.
pub fn resolve_profile(
    cfg: &reflow_config::Config,
    profile_csv: Option<&Path>,
    base_dir: Option<&Path>,
) -> eyre::Result<Profile> {
    match profile_csv {
        Some(path) => reflow_core::profile_from_csv(path),
        None => reflow_core::profile_from_config(&cfg.profile, base_dir),
    }
}

fn control_with_overrides(cfg: &reflow_config::Config, opts: &RunOptions) -> ControlCfg {
    let mut control: ControlCfg = cfg.into();
    match opts.policy {
        Some(PolicyArg::Hysteresis) => control.policy = RelayPolicy::Hysteresis,
        Some(PolicyArg::Lookahead) => {
            control.policy = RelayPolicy::Lookahead((&cfg.lookahead).into());
        }
        None => {}
    }
    if let Some(ms) = opts.switch_delay_ms {
        control.switch_delay_ms = ms;
    }
    control
}

fn params_for(
    cfg: &reflow_config::Config,
    profile: Profile,
    opts: &RunOptions,
    shutdown: Arc<AtomicBool>,
) -> RunParams {
    let control = control_with_overrides(cfg, opts);
    let mut safety: SafetyCfg = (&cfg.safety).into();
    if let Some(c) = opts.max_temp_c {
        safety.max_temp_c = c;
    }
    let _ = LAST_SAFETY.set(CliSafety {
        max_temp_c: safety.max_temp_c,
        max_overrun_ms: safety.max_overrun_ms,
        max_consecutive_faults: safety.max_consecutive_faults,
        profile_end_ms: profile.duration_ms(),
    });

    let display: Option<Box<dyn reflow_traits::Display>> = if opts.quiet || opts.json {
        None
    } else {
        Some(Box::new(
            reflow_ui::TextDisplay::new(std::io::stdout())
                .with_frames_per_dot(u64::from(control.sample_rate_hz)),
        ))
    };

    let mut params = RunParams::new(profile);
    params.control = control;
    params.preheat = PreheatCfg::from(&cfg.preheat);
    params.safety = safety;
    params.timeouts = Timeouts::from(&cfg.timeouts);
    params.wait_for_start = !opts.no_wait;
    params.shutdown = Some(shutdown);
    params.display = display;
    params
}

fn finish(report: RunReport, policy: &'static str, backend: &'static str) -> Outcome {
    tracing::info!(
        backend,
        policy,
        elapsed_ms = report.elapsed_ms,
        ticks = report.ticks,
        "run finished"
    );
    Outcome {
        report,
        policy,
        backend,
    }
}

/// Run one reflow cycle on the backend selected at build time.
pub fn run_reflow(
    cfg: &reflow_config::Config,
    profile: Profile,
    opts: &RunOptions,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<Outcome> {
    let mut params = params_for(cfg, profile, opts, shutdown);
    let policy = params.control.policy.name();

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        if opts.fast {
            tracing::warn!("--fast only applies to the simulator; running in real time");
        }
        let pins = &cfg.pins;
        let sensor = reflow_hardware::Max6675::new(pins.thermo_spi_bus, pins.thermo_cs)?;
        let relay = reflow_hardware::GpioRelay::new(pins.relay)?;
        if params.wait_for_start {
            match pins.start_btn {
                Some(pin) => {
                    params.start_check = Some(reflow_hardware::make_button_checker(pin)?);
                    tracing::info!(pin, "start button enabled");
                }
                None => {
                    tracing::warn!("no start button configured; starting immediately");
                    params.wait_for_start = false;
                }
            }
            if let Some(pin) = pins.preheat_btn {
                match reflow_hardware::make_button_checker(pin) {
                    Ok(c) => {
                        params.preheat_check = Some(c);
                        tracing::info!(pin, "preheat button enabled");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to init preheat button; continuing without it");
                    }
                }
            }
        }
        let report = reflow_core::run(sensor, relay, params)?;
        Ok(finish(report, policy, "max6675"))
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        use reflow_traits::clock::{Clock, ManualClock, MonotonicClock};

        if params.wait_for_start {
            tracing::info!("simulator has no start input; starting immediately");
            params.wait_for_start = false;
        }
        let sim_clock: Arc<dyn Clock + Send + Sync> = if opts.fast {
            let manual = ManualClock::new();
            params.clock = Some(Box::new(manual.clone()));
            Arc::new(manual)
        } else {
            Arc::new(MonotonicClock::new())
        };
        let fail_after_reads = std::env::var(SIM_FAIL_AFTER_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok());
        let sim = reflow_hardware::SimOven::new(
            reflow_hardware::SimParams {
                fail_after_reads,
                ..reflow_hardware::SimParams::default()
            },
            sim_clock,
        );
        let report = reflow_core::run(sim.thermocouple(), sim.relay(), params)?;
        tracing::debug!(switches = sim.switches(), "simulator relay transitions");
        Ok(finish(report, policy, "sim"))
    }
}

/// Text-chart viewport of `width` x `height` cells with the status area and
/// divider scaled from the configured screen layout.
pub fn plot_viewport(
    profile: &Profile,
    display: &reflow_config::DisplayCfg,
    width: u32,
    height: u32,
) -> eyre::Result<reflow_ui::Viewport> {
    let scale = |px: u32| -> u32 {
        let rows = f64::from(px) * f64::from(height) / f64::from(display.height.max(1));
        (rows.round() as u32).max(1)
    };
    let text_height = scale(display.text_height);
    let divider = scale(display.divider);
    if width < 2 || text_height + divider + 2 >= height {
        eyre::bail!("plot area too small: {width}x{height} leaves no room for the chart");
    }
    Ok(reflow_ui::Viewport::for_profile(
        profile,
        width,
        height,
        text_height,
        divider,
    ))
}

/// Read the thermocouple once to prove the sensor path works.
pub fn probe_sensor(cfg: &reflow_config::Config) -> eyre::Result<(&'static str, f32)> {
    use reflow_traits::Thermocouple;

    let timeout = std::time::Duration::from_millis(cfg.timeouts.sensor_ms);

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let mut sensor =
            reflow_hardware::Max6675::new(cfg.pins.thermo_spi_bus, cfg.pins.thermo_cs)?;
        let c = sensor
            .read(timeout)
            .map_err(|e| eyre::Report::new(reflow_core::map_hw_error(e.as_ref())))?;
        Ok(("max6675", c))
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let sim = reflow_hardware::SimOven::new(
            reflow_hardware::SimParams::default(),
            Arc::new(reflow_traits::clock::MonotonicClock::new()),
        );
        let c = sim
            .thermocouple()
            .read(timeout)
            .map_err(|e| eyre::Report::new(reflow_core::map_hw_error(e.as_ref())))?;
        Ok(("sim", c))
    }
}

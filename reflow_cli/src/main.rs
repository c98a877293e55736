#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Reflow oven controller CLI.

mod cli;
mod error_fmt;
mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::run::RunOptions;

const DEFAULT_CONFIG_PATH: &str = "etc/reflow_config.toml";

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = real_main(cli) {
        let code = error_fmt::exit_code_for_error(&e);
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(code);
    }
}

/// Load the config. An explicit path must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<(reflow_config::Config, Option<PathBuf>)> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok((reflow_config::Config::default(), None));
            }
            default
        }
    };
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
    let cfg: reflow_config::Config = toml::from_str(&text)
        .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("Invalid config file {}", path.display()))?;
    let base_dir = path.parent().map(Path::to_path_buf);
    Ok((cfg, base_dir))
}

fn init_tracing(json: bool, level: &str, logging: &reflow_config::Logging) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid --log-level {level:?}"))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };
    layers.push(console);

    if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
            .wrap_err("invalid logging.level")?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("failed to install tracing subscriber: {e}"))
}

fn real_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let (cfg, base_dir) = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "config loaded");

    let profile = run::resolve_profile(&cfg, cli.profile_csv.as_deref(), base_dir.as_deref())?;

    match cli.cmd {
        Commands::Run {
            no_wait,
            policy,
            switch_delay_ms,
            max_temp_c,
            fast,
            quiet,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = shutdown.clone();
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .wrap_err("installing Ctrl-C handler")?;
            }
            let opts = RunOptions {
                no_wait,
                policy,
                switch_delay_ms,
                max_temp_c,
                fast,
                quiet,
                json: cli.json,
            };
            tracing::info!(
                profile = profile.name().unwrap_or("custom"),
                checkpoints = profile.len(),
                duration_ms = profile.duration_ms(),
                "reflow start"
            );
            let outcome = run::run_reflow(&cfg, profile, &opts, shutdown)?;
            let report = &outcome.report;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "profile": report.profile,
                        "backend": outcome.backend,
                        "policy": outcome.policy,
                        "elapsed_ms": report.elapsed_ms,
                        "peak_c": report.peak_c,
                        "final_c": report.final_c,
                        "ticks": report.ticks,
                    })
                );
            } else {
                println!(
                    "Reflow complete: {} in {:.1} s, peak {:.1} C",
                    report.profile.as_deref().unwrap_or("custom profile"),
                    report.elapsed_ms as f64 / 1000.0,
                    report.peak_c.unwrap_or(f32::NAN)
                );
            }
        }
        Commands::Plot { width, height } => {
            let viewport = run::plot_viewport(&profile, &cfg.display, width, height)?;
            let mut chart = reflow_ui::Chart::for_profile(&profile, viewport);
            chart.set_status(&format!(
                "{}  {:.0} s  peak {:.0} C",
                profile.name().unwrap_or("custom profile"),
                profile.end_time_s(),
                profile.peak_temp_c()
            ));
            print!("{}", chart.render());
        }
        Commands::SelfCheck => {
            let (backend, celsius) = run::probe_sensor(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "ok",
                        "backend": backend,
                        "celsius": celsius,
                        "profile": profile.name(),
                        "checkpoints": profile.len(),
                    })
                );
            } else {
                println!(
                    "OK: {backend} thermocouple reads {celsius:.2} C; profile {} with {} checkpoints",
                    profile.name().unwrap_or("custom"),
                    profile.len()
                );
            }
        }
    }
    Ok(())
}

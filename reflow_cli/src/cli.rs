//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective safety knobs used for the current run (for JSON details).
pub static LAST_SAFETY: OnceLock<CliSafety> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct CliSafety {
    pub max_temp_c: f32,
    pub max_overrun_ms: u64,
    pub max_consecutive_faults: u8,
    pub profile_end_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "reflow", version, about = "Reflow oven controller")]
pub struct Cli {
    /// Path to config TOML (typed). Without it `etc/reflow_config.toml` is
    /// used when present, otherwise built-in defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile CSV (strict header `time_s,temp_c`); overrides [profile]
    #[arg(long = "profile-csv", value_name = "FILE")]
    pub profile_csv: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Relay policy override.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PolicyArg {
    /// Compare against the current target only
    Hysteresis,
    /// Heat early when the forecast window would fall short
    Lookahead,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one reflow cycle
    Run {
        /// Start immediately instead of waiting for the start button
        #[arg(long, action = ArgAction::SetTrue)]
        no_wait: bool,
        /// Override control.policy
        #[arg(long, value_enum, value_name = "POLICY")]
        policy: Option<PolicyArg>,
        /// Override control.switch_delay_ms
        #[arg(long, value_name = "MS")]
        switch_delay_ms: Option<u64>,
        /// Override safety.max_temp_c
        #[arg(long, value_name = "CELSIUS")]
        max_temp_c: Option<f32>,
        /// Simulate on a manual clock: no real sleeping (simulator only)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Drive the simulated oven on a manual clock that advances only when the controller sleeps.\n\nA full profile completes in well under a second. Ignored with the hardware backend."
        )]
        fast: bool,
        /// Do not print the status line while running
        #[arg(long, action = ArgAction::SetTrue)]
        quiet: bool,
    },
    /// Draw the configured profile as a text chart
    Plot {
        /// Chart width in columns
        #[arg(long, default_value_t = 72)]
        width: u32,
        /// Chart height in rows, including the status line
        #[arg(long, default_value_t = 22)]
        height: u32,
    },
    /// Quick health check (config, profile, sensor presence)
    SelfCheck,
}

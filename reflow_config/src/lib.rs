#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and profile parsing for the reflow controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Profile CSV loader enforces headers and checks the checkpoint invariants
//!   (at least two rows, finite values, strictly increasing times).
use serde::Deserialize;
use serde::de::Deserializer;
use std::path::{Path, PathBuf};

/// Profile CSV schema.
///
/// Expected headers:
/// time_s,temp_c
///
/// Example:
/// time_s,temp_c
/// 0,25
/// 30,100
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ProfileRow {
    pub time_s: f32,
    pub temp_c: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// SPI bus of the MAX6675 thermocouple amplifier
    pub thermo_spi_bus: u8,
    /// SPI chip-select line of the MAX6675
    pub thermo_cs: u8,
    /// Heater relay output (BCM numbering)
    pub relay: u8,
    /// Start button input, active low with pull-up
    pub start_btn: Option<u8>,
    /// Optional preheat button input, active low with pull-up
    pub preheat_btn: Option<u8>,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            thermo_spi_bus: 0,
            thermo_cs: 0,
            relay: 8,
            start_btn: Some(4),
            preheat_btn: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ProfileCfg {
    /// Display name of the profile
    pub name: Option<String>,
    /// Name of a compiled-in profile ("smd291ax")
    pub builtin: Option<String>,
    /// Inline checkpoints. Accepts either:
    /// - array of tables: [{ time_s = 0, temp_c = 25 }, ...]
    /// - array of tuples: [[0, 25], [30, 100], ...]
    #[serde(deserialize_with = "de_checkpoints")]
    pub checkpoints: Vec<(f32, f32)>,
    /// CSV file with `time_s,temp_c` rows
    pub csv: Option<PathBuf>,
}

/// Selected profile source after precedence rules are applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileSource<'a> {
    Builtin(&'a str),
    Inline(&'a [(f32, f32)]),
    Csv(&'a Path),
}

/// Built-in profile used when the config does not name one.
pub const DEFAULT_BUILTIN_PROFILE: &str = "smd291ax";

impl ProfileCfg {
    /// Resolve which profile source applies. At most one may be configured;
    /// none selects the default built-in.
    pub fn source(&self) -> eyre::Result<ProfileSource<'_>> {
        let configured = usize::from(self.builtin.is_some())
            + usize::from(!self.checkpoints.is_empty())
            + usize::from(self.csv.is_some());
        if configured > 1 {
            eyre::bail!("profile: set only one of builtin, checkpoints or csv");
        }
        if let Some(b) = &self.builtin {
            return Ok(ProfileSource::Builtin(b));
        }
        if let Some(p) = &self.csv {
            return Ok(ProfileSource::Csv(p));
        }
        if !self.checkpoints.is_empty() {
            return Ok(ProfileSource::Inline(&self.checkpoints));
        }
        Ok(ProfileSource::Builtin(DEFAULT_BUILTIN_PROFILE))
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Compare against the current target only
    Hysteresis,
    /// Heat early when a forecast window would fall short
    #[default]
    Lookahead,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Finish {
    /// Finish as soon as the last checkpoint becomes the active stage
    LastStage,
    /// Finish at the profile end once the penultimate stage is active
    #[default]
    EndOfProfile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    pub policy: Policy,
    /// Minimum dwell between relay transitions
    pub switch_delay_ms: u64,
    /// Control loop rate
    pub sample_rate_hz: u32,
    pub finish: Finish,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            policy: Policy::Lookahead,
            switch_delay_ms: 1000,
            sample_rate_hz: 4,
            finish: Finish::EndOfProfile,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LookaheadCfg {
    /// Forecast window length
    pub horizon_s: f32,
    /// Spacing of forecast samples inside the window
    pub step_s: f32,
    /// Calibration: the oven gains `calibrate_temp_c` over `calibrate_seconds` while heating
    pub calibrate_temp_c: f32,
    pub calibrate_seconds: f32,
}

impl Default for LookaheadCfg {
    fn default() -> Self {
        Self {
            horizon_s: 100.0,
            step_s: 5.0,
            calibrate_temp_c: 10.0,
            calibrate_seconds: 100.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PreheatCfg {
    /// Temperature held while waiting for the start input
    pub target_c: f32,
}

impl Default for PreheatCfg {
    fn default() -> Self {
        Self { target_c: 80.0 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Abort with the relay off after this many consecutive bad samples
    pub max_consecutive_faults: u8,
    /// Samples outside [min_plausible_c, max_plausible_c] are treated as faults
    pub min_plausible_c: f32,
    pub max_plausible_c: f32,
    /// Abort if the chamber exceeds this temperature
    pub max_temp_c: f32,
    /// Abort if the run has not finished this long after the profile end
    pub max_overrun_ms: u64,
}

impl Default for Safety {
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Thermocouple read timeout (ms). Also accepts alias "sample_ms".
    #[serde(alias = "sample_ms")]
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 250 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayCfg {
    /// Canvas size in pixels (or character cells for text output)
    pub width: u32,
    pub height: u32,
    /// Height reserved for the status line at the bottom
    pub text_height: u32,
    /// Thickness of the divider between chart and status line
    pub divider: u32,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            text_height: 24,
            divider: 3,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub profile: ProfileCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub lookahead: LookaheadCfg,
    #[serde(default)]
    pub preheat: PreheatCfg,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub display: DisplayCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CheckpointToml {
    Tuple((f32, f32)),
    Table { time_s: f32, temp_c: f32 },
}

fn de_checkpoints<'de, D>(deserializer: D) -> Result<Vec<(f32, f32)>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<CheckpointToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for c in items {
            match c {
                CheckpointToml::Tuple((t, c)) => out.push((t, c)),
                CheckpointToml::Table { time_s, temp_c } => out.push((time_s, temp_c)),
            }
        }
    }
    Ok(out)
}

/// Check the profile invariants on raw `(time_s, temp_c)` pairs.
pub fn validate_checkpoints(points: &[(f32, f32)]) -> eyre::Result<()> {
    if points.len() < 2 {
        eyre::bail!(
            "profile requires at least two checkpoints, got {}",
            points.len()
        );
    }
    for (i, (t, c)) in points.iter().enumerate() {
        if !t.is_finite() || !c.is_finite() {
            eyre::bail!("profile checkpoint {i} is not finite");
        }
    }
    if points[0].0 < 0.0 {
        eyre::bail!("profile must start at time >= 0");
    }
    for i in 1..points.len() {
        if points[i].0 <= points[i - 1].0 {
            eyre::bail!(
                "profile times must be strictly increasing (checkpoint {} at {}s follows {}s)",
                i,
                points[i].0,
                points[i - 1].0
            );
        }
    }
    Ok(())
}

pub fn load_profile_csv(path: &Path) -> eyre::Result<Vec<ProfileRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open profile CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["time_s", "temp_c"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "profile CSV must have headers 'time_s,temp_c', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ProfileRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    let pairs: Vec<(f32, f32)> = rows.iter().map(|r| (r.time_s, r.temp_c)).collect();
    validate_checkpoints(&pairs)?;
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Profile
        match self.profile.source()? {
            ProfileSource::Builtin(name) => {
                if name.trim().is_empty() {
                    eyre::bail!("profile.builtin must not be empty");
                }
            }
            ProfileSource::Inline(points) => validate_checkpoints(points)?,
            // The file is checked when it is loaded
            ProfileSource::Csv(_) => {}
        }

        // Control
        if self.control.sample_rate_hz == 0 {
            eyre::bail!("control.sample_rate_hz must be > 0");
        }
        if self.control.sample_rate_hz > 1000 {
            eyre::bail!("control.sample_rate_hz must be <= 1000");
        }
        if self.control.switch_delay_ms > 60 * 1000 {
            eyre::bail!("control.switch_delay_ms is unreasonably large (>60s)");
        }

        // Lookahead
        let la = &self.lookahead;
        if !(la.step_s.is_finite() && la.step_s > 0.0) {
            eyre::bail!("lookahead.step_s must be > 0");
        }
        if !(la.horizon_s.is_finite() && la.horizon_s >= 0.0) {
            eyre::bail!("lookahead.horizon_s must be >= 0");
        }
        if la.horizon_s > 30.0 * 60.0 {
            eyre::bail!("lookahead.horizon_s is unreasonably large (>30min)");
        }
        if !(la.calibrate_seconds.is_finite() && la.calibrate_seconds > 0.0) {
            eyre::bail!("lookahead.calibrate_seconds must be > 0");
        }
        if !la.calibrate_temp_c.is_finite() {
            eyre::bail!("lookahead.calibrate_temp_c must be finite");
        }

        // Preheat
        if !self.preheat.target_c.is_finite() {
            eyre::bail!("preheat.target_c must be finite");
        }

        // Safety
        let s = &self.safety;
        if s.max_consecutive_faults == 0 {
            eyre::bail!("safety.max_consecutive_faults must be >= 1");
        }
        if !(s.min_plausible_c.is_finite() && s.max_plausible_c.is_finite()) {
            eyre::bail!("safety plausible range must be finite");
        }
        if s.min_plausible_c >= s.max_plausible_c {
            eyre::bail!("safety.min_plausible_c must be < safety.max_plausible_c");
        }
        if !(s.max_temp_c.is_finite() && s.max_temp_c > 0.0) {
            eyre::bail!("safety.max_temp_c must be > 0");
        }
        if self.preheat.target_c >= s.max_temp_c {
            eyre::bail!("preheat.target_c must be below safety.max_temp_c");
        }
        if let ProfileSource::Inline(points) = self.profile.source()?
            && let Some((t, c)) = points.iter().find(|(_, c)| *c >= s.max_temp_c)
        {
            eyre::bail!(
                "profile checkpoint at {t}s ({c} C) reaches safety.max_temp_c ({})",
                s.max_temp_c
            );
        }

        // Timeouts
        if self.timeouts.sensor_ms == 0 {
            eyre::bail!("timeouts.sensor_ms must be >= 1");
        }

        // Display
        let d = &self.display;
        if d.width < 2 || d.height < 2 {
            eyre::bail!("display.width and display.height must be >= 2");
        }
        if d.text_height + d.divider + 2 >= d.height {
            eyre::bail!("display.text_height and divider leave no room for the chart");
        }

        // Logging
        if let Some(r) = &self.logging.rotation
            && !matches!(r.as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = load_toml("").expect("parse");
        cfg.validate().expect("defaults are valid");
        assert_eq!(
            cfg.profile.source().unwrap(),
            ProfileSource::Builtin(DEFAULT_BUILTIN_PROFILE)
        );
        assert_eq!(cfg.control.policy, Policy::Lookahead);
        assert_eq!(cfg.control.switch_delay_ms, 1000);
    }

    #[test]
    fn checkpoints_accept_tuples_and_tables() {
        let cfg = load_toml(
            r#"
[profile]
checkpoints = [[0, 25], { time_s = 30, temp_c = 100 }]
"#,
        )
        .expect("parse");
        assert_eq!(cfg.profile.checkpoints, vec![(0.0, 25.0), (30.0, 100.0)]);
    }

    #[test]
    fn two_profile_sources_conflict() {
        let cfg = load_toml(
            r#"
[profile]
builtin = "smd291ax"
checkpoints = [[0, 25], [30, 100]]
"#,
        )
        .expect("parse");
        let err = cfg.validate().expect_err("conflict");
        assert!(format!("{err}").contains("only one of"));
    }

    #[test]
    fn validate_checkpoints_rejects_repeated_time() {
        let err = validate_checkpoints(&[(0.0, 25.0), (30.0, 100.0), (30.0, 120.0)])
            .expect_err("non-monotonic");
        assert!(format!("{err}").contains("strictly increasing"));
    }
}

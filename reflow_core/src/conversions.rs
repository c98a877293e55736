//! `From` implementations bridging `reflow_config` types to `reflow_core` types,
//! plus profile resolution from the `[profile]` section.

use std::path::Path;

use eyre::WrapErr;
use reflow_config::ProfileSource;

use crate::config::{ControlCfg, FinishRule, Lookahead, PreheatCfg, RelayPolicy, SafetyCfg, Timeouts};
use crate::profile::Profile;

// ── Lookahead ────────────────────────────────────────────────────────────────

impl From<&reflow_config::LookaheadCfg> for Lookahead {
    fn from(c: &reflow_config::LookaheadCfg) -> Self {
        Self::from_calibration(c.horizon_s, c.step_s, c.calibrate_temp_c, c.calibrate_seconds)
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<reflow_config::Finish> for FinishRule {
    fn from(f: reflow_config::Finish) -> Self {
        match f {
            reflow_config::Finish::LastStage => Self::LastStage,
            reflow_config::Finish::EndOfProfile => Self::EndOfProfile,
        }
    }
}

impl From<&reflow_config::Config> for ControlCfg {
    fn from(c: &reflow_config::Config) -> Self {
        let policy = match c.control.policy {
            reflow_config::Policy::Hysteresis => RelayPolicy::Hysteresis,
            reflow_config::Policy::Lookahead => RelayPolicy::Lookahead((&c.lookahead).into()),
        };
        Self {
            policy,
            switch_delay_ms: c.control.switch_delay_ms,
            sample_rate_hz: c.control.sample_rate_hz,
            finish: c.control.finish.into(),
        }
    }
}

// ── PreheatCfg ───────────────────────────────────────────────────────────────

impl From<&reflow_config::PreheatCfg> for PreheatCfg {
    fn from(c: &reflow_config::PreheatCfg) -> Self {
        Self {
            target_c: c.target_c,
        }
    }
}

// ── SafetyCfg ────────────────────────────────────────────────────────────────

impl From<&reflow_config::Safety> for SafetyCfg {
    fn from(c: &reflow_config::Safety) -> Self {
        Self {
            max_consecutive_faults: c.max_consecutive_faults,
            min_plausible_c: c.min_plausible_c,
            max_plausible_c: c.max_plausible_c,
            max_temp_c: c.max_temp_c,
            max_overrun_ms: c.max_overrun_ms,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&reflow_config::Timeouts> for Timeouts {
    fn from(c: &reflow_config::Timeouts) -> Self {
        Self {
            sensor_ms: c.sensor_ms,
        }
    }
}

// ── Profile ──────────────────────────────────────────────────────────────────

/// Resolve the configured profile source into a validated [`Profile`].
///
/// Relative CSV paths are resolved against `base_dir` (normally the config
/// file's directory) when given.
pub fn profile_from_config(
    cfg: &reflow_config::ProfileCfg,
    base_dir: Option<&Path>,
) -> eyre::Result<Profile> {
    let profile = match cfg.source()? {
        ProfileSource::Builtin(name) => Profile::builtin(name)?,
        ProfileSource::Inline(points) => Profile::from_pairs(points)?,
        ProfileSource::Csv(path) => {
            let path = match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.to_path_buf(),
            };
            profile_from_csv(&path)?
        }
    };
    Ok(match &cfg.name {
        Some(name) => profile.with_name(name.clone()),
        None => profile,
    })
}

/// Load a `time_s,temp_c` CSV into a [`Profile`] named after the file stem.
pub fn profile_from_csv(path: &Path) -> eyre::Result<Profile> {
    let rows = reflow_config::load_profile_csv(path)
        .wrap_err_with(|| format!("loading profile CSV {}", path.display()))?;
    let pairs: Vec<(f32, f32)> = rows.iter().map(|r| (r.time_s, r.temp_c)).collect();
    let profile = Profile::from_pairs(&pairs)?;
    Ok(match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => profile.with_name(stem),
        None => profile,
    })
}

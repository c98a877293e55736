//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_SAFETY;
use crate::run::abort_reason_name;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use reflow_core::error::{BuildError, ProfileError, ReflowError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No thermocouple was provided to the controller.\nLikely causes: The MAX6675 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_thermocouple(...).".to_string()
            }
            BuildError::MissingRelay => {
                "What happened: No heater relay was provided to the controller.\nLikely causes: The relay GPIO failed to initialize or was not wired into the builder.\nHow to fix: Ensure the relay is created successfully and passed via with_relay(...).".to_string()
            }
            BuildError::MissingProfile => {
                "What happened: No reflow profile was set.\nLikely causes: The [profile] section could not be resolved.\nHow to fix: Set profile.builtin, profile.checkpoints or profile.csv, or pass --profile-csv.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/reflow_config.toml for a sample."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<ProfileError>() {
        return format!(
            "What happened: The reflow profile is invalid ({pe}).\nLikely causes: Fewer than two checkpoints, times not strictly increasing, or non-numeric values.\nHow to fix: Fix the checkpoints in the config or the profile CSV."
        );
    }

    if let Some(re) = err.downcast_ref::<ReflowError>() {
        // Specific domain cases first
        if matches!(re, ReflowError::Timeout) {
            return "What happened: Thermocouple read timed out.\nLikely causes: MAX6675 not wired correctly, wrong SPI bus/chip select, or timeout too low.\nHow to fix: Verify [pins] thermo_spi_bus/thermo_cs and power, and consider increasing timeouts.sensor_ms in the config.".to_string();
        }
        if let ReflowError::Abort(reason) = re {
            use reflow_core::AbortReason::*;
            return match reason {
                SensorFault => "What happened: The thermocouple kept failing and the heater was switched off.\nLikely causes: Open or loose thermocouple, broken SPI wiring, or readings outside the plausible range.\nHow to fix: Check the probe and its connector; adjust safety.max_consecutive_faults or the plausible range if readings are valid.".to_string(),
                OverTemperature => "What happened: The chamber exceeded the maximum temperature and the heater was switched off.\nLikely causes: Relay stuck on, lookahead too aggressive, or a profile peak close to the limit.\nHow to fix: Let the oven cool; check the relay; lower the profile peak or raise safety.max_temp_c with care.".to_string(),
                MaxRuntime => "What happened: The profile ran past its end time plus the allowed overrun.\nLikely causes: The oven cannot reach a stage temperature (weak element, open door, wrong profile).\nHow to fix: Check the heater and insulation; lower the profile targets or increase safety.max_overrun_ms.".to_string(),
                Shutdown => "What happened: The run was interrupted and the heater was switched off.\nLikely causes: Ctrl-C or a termination signal.\nHow to fix: Start a new run when ready.".to_string(),
            };
        }
        // Fallback to generic for other domain errors
        return format!(
            "What happened: {re}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    let lower = msg.to_ascii_lowercase();

    // Profile CSV header special-case
    if lower.contains("profile csv must have headers") {
        return "Invalid headers in profile CSV. Expected 'time_s,temp_c'.".to_string();
    }

    if lower.contains("spi error") || lower.contains("gpio error") {
        return "What happened: Failed to initialize hardware.\nLikely causes: Incorrect pin or bus numbers, SPI not enabled, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; enable SPI and ensure the process may access /dev/spidev* and GPIO.".to_string();
    }

    if lower.contains("profile") || lower.contains("checkpoint") {
        return format!(
            "What happened: The reflow profile could not be loaded ({msg}).\nLikely causes: Missing file, bad rows, or checkpoints out of order.\nHow to fix: Fix the profile source and try again."
        );
    }

    if lower.contains("config") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values or a TOML syntax error.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.chain().nth(1) {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map AbortReason (if present) to stable exit codes; other errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use reflow_core::error::ReflowError;
    if let Some(ReflowError::Abort(reason)) = err.downcast_ref::<ReflowError>() {
        return match reason {
            reflow_core::AbortReason::SensorFault => 3,
            reflow_core::AbortReason::OverTemperature => 4,
            reflow_core::AbortReason::MaxRuntime => 5,
            reflow_core::AbortReason::Shutdown => 6,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use reflow_core::error::ReflowError;
    use serde_json::json;

    if let Some(ReflowError::Abort(reason)) = err.downcast_ref::<ReflowError>() {
        let msg = humanize(err);
        let details = LAST_SAFETY.get();
        let reason_name = abort_reason_name(reason);

        let detail_obj = match reason {
            reflow_core::AbortReason::OverTemperature => {
                details.map(|s| json!({ "max_temp_c": s.max_temp_c }))
            }
            reflow_core::AbortReason::MaxRuntime => details.map(|s| {
                json!({ "profile_end_ms": s.profile_end_ms, "max_overrun_ms": s.max_overrun_ms })
            }),
            reflow_core::AbortReason::SensorFault => {
                details.map(|s| json!({ "max_consecutive_faults": s.max_consecutive_faults }))
            }
            reflow_core::AbortReason::Shutdown => None,
        };

        let obj = if let Some(d) = detail_obj {
            json!({ "reason": reason_name, "details": d, "message": msg })
        } else {
            json!({ "reason": reason_name, "message": msg })
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflow_core::{AbortReason, ReflowError};
    use rstest::rstest;

    #[rstest]
    #[case(AbortReason::SensorFault, 3)]
    #[case(AbortReason::OverTemperature, 4)]
    #[case(AbortReason::MaxRuntime, 5)]
    #[case(AbortReason::Shutdown, 6)]
    fn abort_exit_codes_are_stable(#[case] reason: AbortReason, #[case] code: i32) {
        let err = eyre::Report::new(ReflowError::Abort(reason));
        assert_eq!(exit_code_for_error(&err), code);
    }

    #[test]
    fn other_errors_exit_one() {
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
        let err = eyre::Report::new(ReflowError::Timeout);
        assert_eq!(exit_code_for_error(&err), 1);
    }

    #[test]
    fn timeout_is_explained() {
        let err = eyre::Report::new(ReflowError::Timeout);
        assert!(humanize(&err).starts_with("What happened: Thermocouple read timed out"));
    }

    #[test]
    fn abort_json_names_reason() {
        let err = eyre::Report::new(ReflowError::Abort(AbortReason::Shutdown));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Shutdown");
        assert!(v["message"].as_str().unwrap().contains("interrupted"));
    }

    #[test]
    fn csv_header_error_is_explained() {
        let err = eyre::eyre!("profile CSV must have headers 'time_s,temp_c', got: t,c");
        assert_eq!(
            humanize(&err),
            "Invalid headers in profile CSV. Expected 'time_s,temp_c'."
        );
    }
}

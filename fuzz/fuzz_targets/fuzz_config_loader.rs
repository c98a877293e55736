#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = toml::from_str::<reflow_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // A config that validates must yield a usable profile.
    if let Ok(profile) = reflow_core::profile_from_config(&cfg.profile, None) {
        let _ = reflow_core::CurveEvaluator::new(&profile).sample(16);
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|points: Vec<(f32, f32)>| {
    let config_ok = reflow_config::validate_checkpoints(&points).is_ok();
    let core = reflow_core::Profile::from_pairs(&points);
    // Both layers agree on what a valid checkpoint list is.
    assert_eq!(config_ok, core.is_ok());
    if let Ok(profile) = core {
        let bounds = profile.bounds();
        for (_, c) in reflow_core::CurveEvaluator::new(&profile).sample(32) {
            assert!(c >= bounds.temp.0 && c <= bounds.temp.1);
        }
    }
});

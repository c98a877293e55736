use proptest::prelude::*;
use reflow_core::{CurveEvaluator, DwellGuard, FinishRule, Profile, StageTracker};

prop_compose! {
    // Strictly increasing times starting at 0 with arbitrary temperatures.
    fn profile_strategy()(
        steps in prop::collection::vec((1u32..120, 0u32..300), 1..10),
        start_c in 0u32..300,
    ) -> Profile {
        let mut pairs = vec![(0.0f32, start_c as f32)];
        let mut t = 0.0f32;
        for (dt, c) in steps {
            t += dt as f32;
            pairs.push((t, c as f32));
        }
        Profile::from_pairs(&pairs).unwrap()
    }
}

prop_compose! {
    // (time step in ms, reading) pairs for a tracker run.
    fn readings_strategy()(
        v in prop::collection::vec((0u64..20_000, 0u32..300), 1..200),
    ) -> Vec<(u64, f32)> {
        v.into_iter().map(|(dt, c)| (dt, c as f32)).collect()
    }
}

proptest! {
    #[test]
    fn stage_never_decreases_and_stays_in_range(
        profile in profile_strategy(),
        readings in readings_strategy(),
        last_stage in any::<bool>(),
    ) {
        let rule = if last_stage { FinishRule::LastStage } else { FinishRule::EndOfProfile };
        let mut tracker = StageTracker::new(rule);
        let mut elapsed = 0u64;
        let mut prev = tracker.stage();
        for (dt, c) in readings {
            elapsed += dt;
            tracker.update(&profile, elapsed, c);
            prop_assert!(tracker.stage() >= prev);
            prop_assert!(tracker.stage() >= 1 && tracker.stage() <= profile.last_index());
            prev = tracker.stage();
        }
    }

    #[test]
    fn single_advance_requires_goal_and_time(
        profile in profile_strategy(),
        readings in readings_strategy(),
    ) {
        let mut tracker = StageTracker::new(FinishRule::LastStage);
        let mut elapsed = 0u64;
        for (dt, c) in readings {
            elapsed += dt;
            let before = tracker;
            let update = tracker.update(&profile, elapsed, c);
            if update.advanced > 0 && !before.is_finished() {
                let cp = profile.checkpoint(before.stage());
                prop_assert!(before.goal_reached() || c >= cp.temp_c);
                prop_assert!(elapsed > cp.time_ms());
            }
        }
    }

    #[test]
    fn dwell_guard_never_switches_faster_than_delay(
        delay in 0u64..5_000,
        requests in prop::collection::vec((0u64..2_000, prop::option::of(any::<bool>())), 1..300),
    ) {
        let mut guard = DwellGuard::new(delay);
        let mut now = 0u64;
        let mut last_switch: Option<u64> = None;
        for (dt, desired) in requests {
            now += dt;
            if guard.request(desired, now).is_some() {
                if let Some(prev) = last_switch {
                    prop_assert!(now - prev >= delay);
                }
                last_switch = Some(now);
            }
        }
    }

    #[test]
    fn curve_stays_within_bounds_and_hits_checkpoints(
        profile in profile_strategy(),
        fractions in prop::collection::vec(0.0f32..=1.0, 1..50),
    ) {
        let curve = CurveEvaluator::new(&profile);
        let bounds = profile.bounds();
        for cp in profile.checkpoints() {
            prop_assert!((curve.evaluate(cp.time_s) - cp.temp_c).abs() < 1e-3);
        }
        for f in fractions {
            let t = bounds.time.0 + f * bounds.time_span();
            let y = curve.evaluate(t);
            prop_assert!(y >= bounds.temp.0 - 1e-3 && y <= bounds.temp.1 + 1e-3, "t={t} y={y}");
        }
    }
}

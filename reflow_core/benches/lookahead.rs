use criterion::{Criterion, black_box, criterion_group, criterion_main};
use reflow_core::{CurveEvaluator, FinishRule, Lookahead, Profile, StageTracker};

fn tune(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // Quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p reflow_core --bench lookahead
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(10));
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_lookahead(c: &mut Criterion) {
    let mut g = c.benchmark_group("lookahead");
    tune(&mut g);

    let profile = Profile::builtin("smd291ax").unwrap();
    let tracker = StageTracker::new(FinishRule::EndOfProfile);

    for &step_s in &[1.0f32, 5.0] {
        let la = Lookahead::from_calibration(100.0, step_s, 10.0, 100.0);
        g.bench_function(format!("decide_step_{step_s}s"), |b| {
            b.iter(|| {
                let d = la.decide(black_box(180.0), black_box(183.0), |off| {
                    tracker.target_at(&profile, 125_000 + off)
                });
                black_box(d);
            })
        });
    }
    g.finish();
}

pub fn bench_curve(c: &mut Criterion) {
    let mut g = c.benchmark_group("curve");
    tune(&mut g);

    let profile = Profile::builtin("smd291ax").unwrap();
    let curve = CurveEvaluator::new(&profile);
    g.bench_function("sample_320", |b| {
        b.iter(|| black_box(curve.sample(black_box(320))))
    });
    g.finish();
}

criterion_group!(benches, bench_lookahead, bench_curve);
criterion_main!(benches);

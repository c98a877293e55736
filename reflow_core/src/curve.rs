//! Constrained cubic spline through the profile checkpoints.
//!
//! Display only: the controller never reads this curve. Slopes follow the
//! constrained-spline construction: at interior points the harmonic mean of
//! the adjacent secants (zero when they change sign or either is flat), at
//! the ends `3/2 * secant - neighbour / 2`. Each segment is then a cubic
//! Hermite piece, which keeps it monotone between its two checkpoints.

use crate::profile::Profile;

#[derive(Debug, Clone)]
pub struct CurveEvaluator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
}

impl CurveEvaluator {
    pub fn new(profile: &Profile) -> Self {
        let xs: Vec<f64> = profile
            .checkpoints()
            .iter()
            .map(|c| f64::from(c.time_s))
            .collect();
        let ys: Vec<f64> = profile
            .checkpoints()
            .iter()
            .map(|c| f64::from(c.temp_c))
            .collect();
        let slopes = constrained_slopes(&xs, &ys);
        Self { xs, ys, slopes }
    }

    /// Interpolated temperature at `t_s` seconds. Times outside the profile
    /// are clamped to its first/last checkpoint.
    pub fn evaluate(&self, t_s: f32) -> f32 {
        let n = self.xs.len();
        let t = f64::from(t_s).clamp(self.xs[0], self.xs[n - 1]);
        // Segment i covers [xs[i], xs[i+1]); the end point belongs to the last one.
        let i = match self.xs.partition_point(|&x| x <= t) {
            0 => 0,
            p => (p - 1).min(n - 2),
        };
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let h = x1 - x0;
        let u = (t - x0) / h;
        let u2 = u * u;
        let u3 = u2 * u;
        let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
        let h10 = u3 - 2.0 * u2 + u;
        let h01 = -2.0 * u3 + 3.0 * u2;
        let h11 = u3 - u2;
        let y = h00 * y0 + h10 * h * self.slopes[i] + h01 * y1 + h11 * h * self.slopes[i + 1];
        // Rounding must not leak outside the segment's range.
        y.clamp(y0.min(y1), y0.max(y1)) as f32
    }

    /// `n` evenly spaced `(t_s, temp_c)` samples from first to last checkpoint.
    pub fn sample(&self, n: usize) -> Vec<(f32, f32)> {
        let n = n.max(2);
        let start = self.xs[0];
        let end = self.xs[self.xs.len() - 1];
        let step = (end - start) / (n - 1) as f64;
        (0..n)
            .map(|k| {
                let t = if k == n - 1 {
                    end
                } else {
                    start + step * k as f64
                } as f32;
                (t, self.evaluate(t))
            })
            .collect()
    }
}

fn constrained_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let secants: Vec<f64> = (0..n - 1)
        .map(|i| (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]))
        .collect();
    let mut m = vec![0.0; n];
    for i in 1..n - 1 {
        let (a, b) = (secants[i - 1], secants[i]);
        m[i] = if a * b > 0.0 {
            2.0 / (1.0 / a + 1.0 / b)
        } else {
            0.0
        };
    }
    if n == 2 {
        m[0] = secants[0];
        m[1] = secants[0];
    } else {
        m[0] = 1.5 * secants[0] - m[1] / 2.0;
        m[n - 1] = 1.5 * secants[n - 2] - m[n - 2] / 2.0;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_points_is_a_straight_line() {
        let p = Profile::from_pairs(&[(0.0, 20.0), (10.0, 120.0)]).unwrap();
        let c = CurveEvaluator::new(&p);
        assert!((c.evaluate(5.0) - 70.0).abs() < 1e-4);
        assert!((c.evaluate(2.5) - 45.0).abs() < 1e-4);
    }

    #[test]
    fn plateau_stays_flat() {
        let p = Profile::from_pairs(&[(0.0, 25.0), (10.0, 150.0), (20.0, 150.0), (30.0, 50.0)])
            .unwrap();
        let c = CurveEvaluator::new(&p);
        for k in 0..=20 {
            let t = 10.0 + k as f32 * 0.5;
            assert!((c.evaluate(t) - 150.0).abs() < 1e-4, "t={t}");
        }
    }

    #[test]
    fn clamps_outside_profile() {
        let p = Profile::builtin("smd291ax").unwrap();
        let c = CurveEvaluator::new(&p);
        assert_eq!(c.evaluate(-10.0), 25.0);
        assert_eq!(c.evaluate(1000.0), 117.0);
    }

    #[test]
    fn sample_hits_both_ends() {
        let p = Profile::builtin("smd291ax").unwrap();
        let pts = CurveEvaluator::new(&p).sample(57);
        assert_eq!(pts.len(), 57);
        assert_eq!(pts[0], (0.0, 25.0));
        assert_eq!(pts[56], (280.0, 117.0));
    }
}

//! Reflow profile: an ordered list of (time, temperature) checkpoints.
//!
//! A `Profile` is validated once at construction and is immutable for the
//! duration of a run. Control code takes it by reference.

use crate::error::ProfileError;

/// One control point of the thermal curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    /// Seconds since run start.
    pub time_s: f32,
    /// Degrees Celsius.
    pub temp_c: f32,
}

impl Checkpoint {
    pub const fn new(time_s: f32, temp_c: f32) -> Self {
        Self { time_s, temp_c }
    }

    /// Checkpoint time in whole milliseconds (rounded).
    #[inline]
    pub fn time_ms(&self) -> u64 {
        secs_to_ms(self.time_s)
    }
}

#[inline]
pub(crate) fn secs_to_ms(s: f32) -> u64 {
    if !s.is_finite() || s <= 0.0 {
        return 0;
    }
    (f64::from(s) * 1000.0).round() as u64
}

/// Display scaling ranges derived from the checkpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub time: (f32, f32),
    pub temp: (f32, f32),
}

impl Bounds {
    pub fn time_span(&self) -> f32 {
        self.time.1 - self.time.0
    }

    pub fn temp_span(&self) -> f32 {
        self.temp.1 - self.temp.0
    }
}

/// SMD291AX leaded paste profile.
const SMD291AX: [(f32, f32); 8] = [
    (0.0, 25.0),
    (30.0, 100.0),
    (120.0, 150.0),
    (150.0, 183.0),
    (210.0, 235.0),
    (240.0, 183.0),
    (260.0, 150.0),
    (280.0, 117.0),
];

/// Names accepted by [`Profile::builtin`].
pub const BUILTIN_PROFILES: &[&str] = &["smd291ax"];

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    name: Option<String>,
    checkpoints: Vec<Checkpoint>,
}

impl Profile {
    /// Validate and wrap a checkpoint list.
    pub fn new(checkpoints: Vec<Checkpoint>) -> Result<Self, ProfileError> {
        if checkpoints.len() < 2 {
            return Err(ProfileError::TooShort {
                len: checkpoints.len(),
            });
        }
        if let Some(index) = checkpoints
            .iter()
            .position(|c| !c.time_s.is_finite() || !c.temp_c.is_finite())
        {
            return Err(ProfileError::NonFinite { index });
        }
        if checkpoints[0].time_s < 0.0 {
            return Err(ProfileError::NegativeStart);
        }
        if let Some(w) = checkpoints
            .windows(2)
            .position(|w| w[1].time_s <= w[0].time_s)
        {
            return Err(ProfileError::NonMonotonic { index: w + 1 });
        }
        Ok(Self {
            name: None,
            checkpoints,
        })
    }

    /// Build from `(time_s, temp_c)` pairs.
    pub fn from_pairs(pairs: &[(f32, f32)]) -> Result<Self, ProfileError> {
        Self::new(
            pairs
                .iter()
                .map(|&(time_s, temp_c)| Checkpoint { time_s, temp_c })
                .collect(),
        )
    }

    /// Look up a compiled-in profile by name (case-insensitive).
    pub fn builtin(name: &str) -> Result<Self, ProfileError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "smd291ax" => Ok(Self::from_pairs(&SMD291AX)?.with_name("SMD291AX")),
            _ => Err(ProfileError::UnknownBuiltin(name.to_string())),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Number of checkpoints (always >= 2).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Checkpoint at `index`, clamped to the last one.
    pub fn checkpoint(&self, index: usize) -> Checkpoint {
        self.checkpoints[index.min(self.last_index())]
    }

    pub fn last_index(&self) -> usize {
        self.checkpoints.len() - 1
    }

    pub fn penultimate_index(&self) -> usize {
        self.checkpoints.len() - 2
    }

    /// Time of the final checkpoint in seconds.
    pub fn end_time_s(&self) -> f32 {
        self.checkpoints[self.last_index()].time_s
    }

    /// Total profile duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.checkpoints[self.last_index()].time_ms()
    }

    pub fn bounds(&self) -> Bounds {
        let first = self.checkpoints[0];
        let (lo, hi) = self
            .checkpoints
            .iter()
            .fold((first.temp_c, first.temp_c), |(lo, hi), c| {
                (lo.min(c.temp_c), hi.max(c.temp_c))
            });
        Bounds {
            time: (first.time_s, self.end_time_s()),
            temp: (lo, hi),
        }
    }

    pub fn peak_temp_c(&self) -> f32 {
        self.bounds().temp.1
    }
}

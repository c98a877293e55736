//! Stage tracker: which checkpoint the run is currently heading for.
//!
//! A stage advances only when the chamber has reached the stage goal AND the
//! stage's time boundary has passed. Reaching the goal early holds the
//! stage; falling behind in time never skips a stage whose goal was not met.

use crate::profile::Profile;

/// When a run counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishRule {
    /// As soon as the last checkpoint becomes the active stage.
    LastStage,
    /// Once the penultimate stage is active and the profile end time has passed.
    #[default]
    EndOfProfile,
}

/// Result of one tracker update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageUpdate {
    /// Stages advanced during this update.
    pub advanced: usize,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTracker {
    stage: usize,
    goal_reached: bool,
    finished: bool,
    rule: FinishRule,
}

impl StageTracker {
    pub fn new(rule: FinishRule) -> Self {
        Self {
            stage: 1,
            goal_reached: false,
            finished: false,
            rule,
        }
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn rule(&self) -> FinishRule {
        self.rule
    }

    /// Setpoint of the active stage.
    pub fn target_c(&self, profile: &Profile) -> f32 {
        profile.checkpoint(self.stage).temp_c
    }

    /// Setpoint that would be active at `at_ms` if every goal on the way is met.
    ///
    /// Pure: the tracker is not modified.
    pub fn target_at(&self, profile: &Profile, at_ms: u64) -> f32 {
        let last = profile.last_index();
        let mut stage = self.stage;
        while stage < last && at_ms > profile.checkpoint(stage).time_ms() {
            stage += 1;
        }
        profile.checkpoint(stage).temp_c
    }

    /// Feed one trusted reading taken `elapsed_ms` into the run.
    ///
    /// After an advance the new stage is re-checked against the same reading,
    /// so a long gap between samples catches up through every stage whose goal
    /// and time boundary are both satisfied.
    pub fn update(&mut self, profile: &Profile, elapsed_ms: u64, measured_c: f32) -> StageUpdate {
        if self.finished {
            return StageUpdate {
                advanced: 0,
                finished: true,
            };
        }

        let last = profile.last_index();
        let mut advanced = 0;
        loop {
            if measured_c >= self.target_c(profile) {
                self.goal_reached = true;
            }
            let boundary_ms = profile.checkpoint(self.stage).time_ms();
            if self.stage < last && self.goal_reached && elapsed_ms > boundary_ms {
                self.goal_reached = false;
                self.stage += 1;
                advanced += 1;
                continue;
            }
            break;
        }

        if advanced > 1 {
            tracing::warn!(
                advanced,
                stage = self.stage,
                elapsed_ms,
                "multiple stages advanced in one tick"
            );
        }

        self.finished = match self.rule {
            FinishRule::LastStage => self.stage == last,
            FinishRule::EndOfProfile => {
                self.stage >= profile.penultimate_index() && elapsed_ms >= profile.duration_ms()
            }
        };

        StageUpdate {
            advanced,
            finished: self.finished,
        }
    }
}

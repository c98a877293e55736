//! Oven status returned from each control loop iteration.

use crate::error::ReflowError;

/// Public status of a single tick of the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ReflowStatus {
    /// Waiting for the operator; relay off.
    Idle,
    /// Holding the preheat temperature until start is confirmed.
    Preheating,
    /// Tracking the profile.
    Running,
    /// Profile complete; relay forced off.
    Finished,
    /// Stopped with a typed error; relay has been forced off.
    Aborted(ReflowError),
}

impl ReflowStatus {
    /// True once no further ticks can change the outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReflowStatus::Finished | ReflowStatus::Aborted(_))
    }
}

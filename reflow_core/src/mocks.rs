//! Test and helper mocks for reflow_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reflow_traits::{BoxError, Display, Frame};

/// A thermocouple that always errors on read; useful when driving the control
/// loop with externally sampled readings via `step_from_reading`.
pub struct NoopThermocouple;

impl reflow_traits::Thermocouple for NoopThermocouple {
    fn read(&mut self, _timeout: Duration) -> Result<f32, BoxError> {
        Err(Box::new(std::io::Error::other("noop thermocouple")))
    }
}

/// Replays a fixed script of readings; `None` entries are read errors.
/// The final entry repeats once the script is exhausted.
pub struct ScriptedThermocouple {
    script: VecDeque<Option<f32>>,
    last: Option<f32>,
}

impl ScriptedThermocouple {
    pub fn new(script: impl IntoIterator<Item = Option<f32>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
        }
    }

    /// Script with no read errors.
    pub fn readings(values: impl IntoIterator<Item = f32>) -> Self {
        Self::new(values.into_iter().map(Some))
    }
}

impl reflow_traits::Thermocouple for ScriptedThermocouple {
    fn read(&mut self, _timeout: Duration) -> Result<f32, BoxError> {
        let next = match self.script.pop_front() {
            Some(v) => {
                self.last = v;
                v
            }
            None => self.last,
        };
        next.ok_or_else(|| Box::new(std::io::Error::other("scripted read error")) as BoxError)
    }
}

/// Relay that records every write; clones share the log.
#[derive(Clone, Default)]
pub struct RecordingRelay {
    writes: Arc<Mutex<Vec<bool>>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes so far, in order.
    pub fn writes(&self) -> Vec<bool> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Most recent write, if any.
    pub fn last(&self) -> Option<bool> {
        self.writes.lock().ok().and_then(|w| w.last().copied())
    }
}

impl reflow_traits::Relay for RecordingRelay {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        if let Ok(mut w) = self.writes.lock() {
            w.push(on);
        }
        Ok(())
    }
}

#[derive(Default)]
struct FlakyRelayState {
    energised: bool,
    attempts: Vec<bool>,
    fail_on: u32,
    fail_off: u32,
}

/// Relay whose next writes can be made to fail; clones share state.
///
/// A failed write leaves the contact where it was.
#[derive(Clone, Default)]
pub struct FlakyRelay {
    state: Arc<Mutex<FlakyRelayState>>,
}

impl FlakyRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` writes of `on`.
    pub fn fail_next(&self, on: bool, count: u32) {
        if let Ok(mut s) = self.state.lock() {
            if on {
                s.fail_on = count;
            } else {
                s.fail_off = count;
            }
        }
    }

    /// Physical contact state after the last successful write.
    pub fn energised(&self) -> bool {
        self.state.lock().map(|s| s.energised).unwrap_or(false)
    }

    /// Every write attempted, successful or not.
    pub fn attempts(&self) -> Vec<bool> {
        self.state
            .lock()
            .map(|s| s.attempts.clone())
            .unwrap_or_default()
    }
}

impl reflow_traits::Relay for FlakyRelay {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        let mut s = self
            .state
            .lock()
            .map_err(|_| -> BoxError { "relay state poisoned".into() })?;
        s.attempts.push(on);
        let pending = if on { &mut s.fail_on } else { &mut s.fail_off };
        if *pending > 0 {
            *pending -= 1;
            return Err("relay driver not responding".into());
        }
        s.energised = on;
        Ok(())
    }
}

/// Display sink that keeps every frame; clones share the buffer.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl Display for RecordingDisplay {
    fn render(&mut self, frame: &Frame) -> Result<(), BoxError> {
        if let Ok(mut f) = self.frames.lock() {
            f.push(*frame);
        }
        Ok(())
    }
}

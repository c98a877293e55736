pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Temperature source for the oven chamber.
pub trait Thermocouple {
    /// Read the chamber temperature in degrees Celsius.
    ///
    /// An `Err` means the sample must not be trusted (open probe, bus fault,
    /// timeout).
    fn read(&mut self, timeout: std::time::Duration) -> Result<f32, BoxError>;
}

/// Heater element switch.
pub trait Relay {
    fn set(&mut self, on: bool) -> Result<(), BoxError>;
}

/// Sink for per-tick telemetry. Rendering failures never affect control.
pub trait Display {
    fn render(&mut self, frame: &Frame) -> Result<(), BoxError>;
}

impl<T: Thermocouple + ?Sized> Thermocouple for Box<T> {
    fn read(&mut self, timeout: std::time::Duration) -> Result<f32, BoxError> {
        (**self).read(timeout)
    }
}

impl<T: Relay + ?Sized> Relay for Box<T> {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        (**self).set(on)
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn render(&mut self, frame: &Frame) -> Result<(), BoxError> {
        (**self).render(frame)
    }
}

/// Operating phase of the oven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OvenPhase {
    #[default]
    Idle,
    Preheating,
    Running,
    Finished,
    Fault,
}

impl OvenPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            OvenPhase::Idle => "idle",
            OvenPhase::Preheating => "preheating",
            OvenPhase::Running => "running",
            OvenPhase::Finished => "finished",
            OvenPhase::Fault => "fault",
        }
    }
}

impl std::fmt::Display for OvenPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one control tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    pub phase: OvenPhase,
    /// Milliseconds since the run started (0 outside a run).
    pub elapsed_ms: u64,
    /// Last trusted chamber temperature.
    pub measured_c: Option<f32>,
    /// Active setpoint, if any.
    pub target_c: Option<f32>,
    pub relay_on: bool,
    /// Stage index while running.
    pub stage: Option<usize>,
    /// The most recent sample was rejected.
    pub sensor_fault: bool,
}

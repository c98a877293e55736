use thiserror::Error;

/// Why a run was stopped before the profile finished.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("thermocouple fault limit reached")]
    SensorFault,
    #[error("over-temperature")]
    OverTemperature,
    #[error("profile overran its end time")]
    MaxRuntime,
    #[error("shutdown requested")]
    Shutdown,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReflowError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("implausible reading: {0} C")]
    Implausible(f32),
    #[error("invalid state: {0}")]
    State(String),
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

/// Malformed checkpoint list.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProfileError {
    #[error("profile requires at least two checkpoints, got {len}")]
    TooShort { len: usize },
    #[error("profile checkpoint {index} is not finite")]
    NonFinite { index: usize },
    #[error("profile must start at time >= 0")]
    NegativeStart,
    #[error("profile times must be strictly increasing at checkpoint {index}")]
    NonMonotonic { index: usize },
    #[error("unknown built-in profile: {0}")]
    UnknownBuiltin(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing thermocouple")]
    MissingSensor,
    #[error("missing relay")]
    MissingRelay,
    #[error("missing profile")]
    MissingProfile,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

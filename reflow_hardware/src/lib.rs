//! Hardware adapters for the reflow controller.
//!
//! Without the `hardware` feature only the simulator and the MAX6675 frame
//! decoder are built. With it (Linux only) the MAX6675 SPI driver, the GPIO
//! relay, and the button checkers are available via `rppal`.

pub mod error;
pub mod max6675;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioRelay, make_button_checker};
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use max6675::Max6675;
pub use reflow_traits::{Relay, Thermocouple};
pub use sim::{SimOven, SimParams, SimRelay, SimThermocouple};

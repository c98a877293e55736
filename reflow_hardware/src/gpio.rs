//! Heater relay output and operator buttons on Raspberry Pi GPIO.

use std::sync::Mutex;

use rppal::gpio::{Gpio, OutputPin};

use crate::error::{HwError, Result};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Active-high relay driver. The output is driven low on drop.
pub struct GpioRelay {
    pin: OutputPin,
}

impl GpioRelay {
    pub fn new(pin: u8) -> Result<Self> {
        let pin = Gpio::new()
            .map_err(gpio_err)?
            .get(pin)
            .map_err(gpio_err)?
            .into_output_low();
        Ok(Self { pin })
    }
}

impl reflow_traits::Relay for GpioRelay {
    fn set(&mut self, on: bool) -> std::result::Result<(), reflow_traits::BoxError> {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

impl Drop for GpioRelay {
    fn drop(&mut self) {
        self.pin.set_low();
    }
}

/// Build a checker for an active-low push button with the internal pull-up.
pub fn make_button_checker(pin: u8) -> Result<Box<dyn Fn() -> bool + Send + Sync>> {
    let input = Gpio::new()
        .map_err(gpio_err)?
        .get(pin)
        .map_err(gpio_err)?
        .into_input_pullup();
    let input = Mutex::new(input);
    Ok(Box::new(move || {
        input.lock().map(|p| p.is_low()).unwrap_or(false)
    }))
}

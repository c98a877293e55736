//! MAX6675 K-type thermocouple amplifier.
//!
//! The chip shifts out one 16-bit frame per read: bit 15 is a dummy zero,
//! bits 14..3 hold the temperature in 0.25 C steps, and bit 2 goes high when
//! the thermocouple input is open.

use crate::error::{HwError, Result};

/// Resolution of one count in degrees Celsius.
pub const DEGREES_PER_COUNT: f32 = 0.25;

const OPEN_INPUT_BIT: u16 = 1 << 2;

/// Decode a raw MAX6675 frame into degrees Celsius.
pub fn decode(raw: u16) -> Result<f32> {
    if raw & OPEN_INPUT_BIT != 0 {
        return Err(HwError::OpenThermocouple);
    }
    Ok(f32::from(raw >> 3) * DEGREES_PER_COUNT)
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use driver::Max6675;

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod driver {
    use std::time::{Duration, Instant};

    use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
    use tracing::trace;

    use super::decode;
    use crate::error::{HwError, Result};

    /// The chip needs this long to finish a conversion; faster reads return stale data.
    const CONVERSION_TIME: Duration = Duration::from_millis(220);
    const CLOCK_HZ: u32 = 1_000_000;

    pub struct Max6675 {
        spi: Spi,
        last_read: Option<(Instant, f32)>,
    }

    impl Max6675 {
        pub fn new(bus: u8, chip_select: u8) -> Result<Self> {
            let bus = match bus {
                0 => Bus::Spi0,
                1 => Bus::Spi1,
                2 => Bus::Spi2,
                other => return Err(HwError::Spi(format!("unsupported SPI bus {other}"))),
            };
            let ss = match chip_select {
                0 => SlaveSelect::Ss0,
                1 => SlaveSelect::Ss1,
                2 => SlaveSelect::Ss2,
                other => return Err(HwError::Spi(format!("unsupported chip select {other}"))),
            };
            let spi = Spi::new(bus, ss, CLOCK_HZ, Mode::Mode0)
                .map_err(|e| HwError::Spi(e.to_string()))?;
            Ok(Self {
                spi,
                last_read: None,
            })
        }

        pub fn read_celsius(&mut self) -> Result<f32> {
            if let Some((at, c)) = self.last_read
                && at.elapsed() < CONVERSION_TIME
            {
                return Ok(c);
            }
            let mut buf = [0u8; 2];
            let n = self
                .spi
                .read(&mut buf)
                .map_err(|e| HwError::Spi(e.to_string()))?;
            if n != buf.len() {
                return Err(HwError::Spi(format!("short read: {n} bytes")));
            }
            let raw = u16::from_be_bytes(buf);
            trace!(raw, "max6675 frame");
            let c = decode(raw)?;
            self.last_read = Some((Instant::now(), c));
            Ok(c)
        }
    }

    impl reflow_traits::Thermocouple for Max6675 {
        fn read(
            &mut self,
            _timeout: Duration,
        ) -> std::result::Result<f32, reflow_traits::BoxError> {
            self.read_celsius().map_err(Into::into)
        }
    }
}

//! Simulated oven for running the controller without hardware.
//!
//! Lumped thermal model: while the element is on the chamber gains
//! `heat_c_per_s`, and it always loses heat to ambient in proportion to the
//! temperature difference. The model is integrated exactly between reads, so
//! any sampling interval gives the same trajectory.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reflow_traits::clock::Clock;
use reflow_traits::BoxError;

use crate::error::HwError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub ambient_c: f32,
    /// Heating rate with the element on, before losses.
    pub heat_c_per_s: f32,
    /// Fraction of the chamber-to-ambient difference lost per second.
    pub loss_per_s: f32,
    /// Fail every read after this many successful ones (open thermocouple).
    pub fail_after_reads: Option<u64>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            heat_c_per_s: 3.0,
            loss_per_s: 0.005,
            fail_after_reads: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    temp_c: f64,
    heating: bool,
    at: Instant,
    reads: u64,
    switches: u64,
}

/// Shared simulated chamber. Hand out [`SimThermocouple`] and [`SimRelay`]
/// handles to the controller.
#[derive(Clone)]
pub struct SimOven {
    params: SimParams,
    clock: Arc<dyn Clock + Send + Sync>,
    state: Arc<Mutex<SimState>>,
}

impl core::fmt::Debug for SimOven {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimOven")
            .field("params", &self.params)
            .field("temp_c", &self.temperature())
            .field("heating", &self.heating())
            .finish()
    }
}

impl SimOven {
    pub fn new(params: SimParams, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let at = clock.now();
        Self {
            params,
            clock,
            state: Arc::new(Mutex::new(SimState {
                temp_c: f64::from(params.ambient_c),
                heating: false,
                at,
                reads: 0,
                switches: 0,
            })),
        }
    }

    pub fn thermocouple(&self) -> SimThermocouple {
        SimThermocouple { oven: self.clone() }
    }

    pub fn relay(&self) -> SimRelay {
        SimRelay { oven: self.clone() }
    }

    /// Chamber temperature now.
    pub fn temperature(&self) -> f32 {
        self.with_state(|st| st.temp_c as f32).unwrap_or(f32::NAN)
    }

    pub fn heating(&self) -> bool {
        self.with_state(|st| st.heating).unwrap_or(false)
    }

    /// Relay transitions seen so far.
    pub fn switches(&self) -> u64 {
        self.with_state(|st| st.switches).unwrap_or(0)
    }

    /// Bring the model up to the clock's current time, then run `f`.
    fn with_state<T>(&self, f: impl FnOnce(&mut SimState) -> T) -> Option<T> {
        let now = self.clock.now();
        let mut st = self.state.lock().ok()?;
        let dt = now.saturating_duration_since(st.at);
        self.integrate(&mut st, dt);
        st.at = now;
        Some(f(&mut st))
    }

    fn integrate(&self, st: &mut SimState, dt: Duration) {
        let p = &self.params;
        let k = f64::from(p.loss_per_s);
        let ambient = f64::from(p.ambient_c);
        let drive = if st.heating {
            f64::from(p.heat_c_per_s)
        } else {
            0.0
        };
        let secs = dt.as_secs_f64();
        if k > 0.0 {
            let equilibrium = ambient + drive / k;
            st.temp_c = equilibrium + (st.temp_c - equilibrium) * (-k * secs).exp();
        } else {
            st.temp_c += drive * secs;
        }
    }
}

pub struct SimThermocouple {
    oven: SimOven,
}

impl reflow_traits::Thermocouple for SimThermocouple {
    fn read(&mut self, _timeout: Duration) -> Result<f32, BoxError> {
        let fail_after = self.oven.params.fail_after_reads;
        let reading = self
            .oven
            .with_state(|st| {
                st.reads += 1;
                match fail_after {
                    Some(n) if st.reads > n => Err(HwError::OpenThermocouple),
                    _ => Ok(st.temp_c as f32),
                }
            })
            .ok_or_else(|| HwError::Io(std::io::Error::other("simulator state poisoned")))?;
        let c = reading?;
        tracing::trace!(celsius = c, "simulated thermocouple");
        Ok(c)
    }
}

pub struct SimRelay {
    oven: SimOven,
}

impl reflow_traits::Relay for SimRelay {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        self.oven
            .with_state(|st| {
                if st.heating != on {
                    st.switches += 1;
                }
                st.heating = on;
            })
            .ok_or_else(|| HwError::Io(std::io::Error::other("simulator state poisoned")))?;
        tracing::debug!(on, "simulated relay");
        Ok(())
    }
}

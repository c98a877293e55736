//! Maps `Box<dyn Error>` from trait boundaries to typed `ReflowError`.
//!
//! The traits in `reflow_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `reflow_hardware::HwError` downcasting.

use crate::error::ReflowError;

/// Map a trait-boundary error to a typed `ReflowError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ReflowError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<reflow_hardware::error::HwError>() {
            return match hw {
                reflow_hardware::error::HwError::Timeout => ReflowError::Timeout,
                other => ReflowError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ReflowError::Timeout
    } else {
        ReflowError::Hardware(s)
    }
}

//! Error types for channel modeling and equalizer synthesis.

use thiserror::Error;

/// Errors that can occur during DSP operations.
///
/// Every variant is a deterministic function of the input data, so callers
/// should not retry.
#[derive(Debug, Error)]
pub enum DspError {
    /// Input array length disagrees with the frequency/time axis.
    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Networks being cascaded are defined over different frequency axes.
    #[error("Frequency axis mismatch: {0}")]
    AxisMismatch(String),

    /// Network parameters are undefined at a bin (e.g. S21 = 0).
    #[error("Degenerate network at bin {index} ({frequency:.6e} Hz): {reason}")]
    DegenerateNetwork {
        index: usize,
        frequency: f64,
        reason: &'static str,
    },

    /// A sampling index falls outside the available samples.
    #[error("Sample index {index} out of range for {len} samples")]
    OutOfRange { index: isize, len: usize },

    /// Linear system is singular or too ill-conditioned to solve.
    #[error("Unsolvable system: {0}")]
    UnsolvableSystem(String),

    /// Frequency axis is not linearly spaced from DC.
    #[error("Non-uniform frequency axis: {0}")]
    NonUniformAxis(String),

    /// Insufficient data for operation.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DspError {
    /// Shape check helper: `Ok(())` when `actual == expected`.
    pub fn check_len(expected: usize, actual: usize) -> DspResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch { expected, actual })
        }
    }

    /// Reference impedances must be positive and finite.
    pub fn check_impedance(z0: f64) -> DspResult<()> {
        if z0.is_finite() && z0 > 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidConfig(format!(
                "reference impedance must be positive and finite, got {z0} ohm"
            )))
        }
    }
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;

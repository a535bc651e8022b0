//! Frequency-domain interpolation of measured transfer functions.
//!
//! Measured data rarely starts at DC or sits on the linear grid the
//! inverse transform needs. Values are interpolated in magnitude and
//! unwrapped phase between measured points; below the first measured
//! point they are blended toward the DC value `S21(0) = 1` of a passive
//! interconnect; above the last they hold the last measured value.

use crate::error::{DspError, DspResult};
use lib_types::network::FrequencyAxis;
use lib_types::units::Hertz;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Wrap a phase value to the range [-π, π].
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    let tau = 2.0 * PI;
    let phase = phase % tau;
    if phase > PI {
        phase - tau
    } else if phase < -PI {
        phase + tau
    } else {
        phase
    }
}

/// Transmission of a passive channel at DC: unity, zero phase.
fn dc_transmission() -> Complex64 {
    Complex64::new(1.0, 0.0)
}

/// Magnitude/phase interpolation between two complex values.
fn blend(v0: Complex64, v1: Complex64, frac: f64) -> Complex64 {
    let mag = v0.norm() + frac * (v1.norm() - v0.norm());
    let phase = v0.arg() + frac * wrap_phase(v1.arg() - v0.arg());
    Complex64::from_polar(mag, phase)
}

/// Interpolate a measured transfer function onto new frequencies.
///
/// `freqs` must be ascending.
pub fn interpolate_linear(
    freqs: &[Hertz],
    values: &[Complex64],
    target_freqs: &[Hertz],
) -> DspResult<Vec<Complex64>> {
    DspError::check_len(freqs.len(), values.len())?;
    if freqs.len() < 2 {
        return Err(DspError::InsufficientData {
            needed: 2,
            got: freqs.len(),
        });
    }
    if freqs.windows(2).any(|w| w[1].0 <= w[0].0) {
        return Err(DspError::NonUniformAxis(
            "measured frequencies are not strictly ascending".to_string(),
        ));
    }

    Ok(target_freqs
        .iter()
        .map(|target| interpolate_single(freqs, values, target.0))
        .collect())
}

fn interpolate_single(freqs: &[Hertz], values: &[Complex64], target: f64) -> Complex64 {
    let first = freqs[0].0;
    let last = freqs[freqs.len() - 1].0;

    if target < first {
        if target <= 0.0 {
            return dc_transmission();
        }
        return blend(dc_transmission(), values[0], target / first);
    }
    if target >= last {
        return values[values.len() - 1];
    }

    // Bracketing indices by bisection.
    let mut lower = 0;
    let mut upper = freqs.len() - 1;
    while upper - lower > 1 {
        let mid = (lower + upper) / 2;
        if freqs[mid].0 <= target {
            lower = mid;
        } else {
            upper = mid;
        }
    }

    let f0 = freqs[lower].0;
    let f1 = freqs[upper].0;
    blend(values[lower], values[upper], (target - f0) / (f1 - f0))
}

/// Resample a measured transfer function onto `num_points` bins from DC
/// to `f_max`, ready for [`crate::time_domain::freq_to_impulse`].
pub fn resample_to_uniform_grid(
    freqs: &[Hertz],
    values: &[Complex64],
    f_max: Hertz,
    num_points: usize,
) -> DspResult<(Vec<Complex64>, FrequencyAxis)> {
    if num_points < 2 {
        return Err(DspError::InsufficientData {
            needed: 2,
            got: num_points,
        });
    }
    if f_max.0 <= 0.0 {
        return Err(DspError::InvalidConfig(format!(
            "maximum frequency must be positive, got {} Hz",
            f_max.0
        )));
    }

    let axis = FrequencyAxis::linear_to(f_max, num_points);
    let resampled = interpolate_linear(freqs, values, &axis.points)?;

    if let Some(measured_max) = freqs.last() {
        if f_max.0 > measured_max.0 {
            tracing::warn!(
                f_max_ghz = f_max.as_ghz(),
                measured_max_ghz = measured_max.as_ghz(),
                "grid extends past measured data; holding last value"
            );
        }
    }
    tracing::debug!(
        measured = freqs.len(),
        resampled = num_points,
        "resampled onto uniform grid"
    );

    Ok((resampled, axis))
}

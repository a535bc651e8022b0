//! Frequency-to-time-domain transformation.
//!
//! A channel is characterized by its one-sided frequency response `H[k]` on
//! a linear grid `f[k] = k·Δf`. The real-valued impulse response is
//! recovered by reflecting the interior bins as complex conjugates
//! (Hermitian extension) and applying the inverse DFT:
//!
//! ```text
//! Hd = [H[0], H[1], ..., H[N-1], conj(H[N-2]), ..., conj(H[1])]     (2N - 2 bins)
//! h  = Re(IDFT(Hd))
//! t  = k / (Δf · (2N - 2)),  k = 0 .. 2N - 3                        (spans [0, 1/Δf))
//! ```
//!
//! The imaginary part left by floating-point roundoff is discarded.

use crate::error::{DspError, DspResult};
use crate::fft::FftEngine;
use lib_types::network::{FrequencyAxis, TwoPortNetwork};
use lib_types::units::{Hertz, Seconds};
use lib_types::waveform::Waveform;
use num_complex::Complex64;

/// Relative tolerance on bin spacing when checking that an axis is linear.
pub const AXIS_LINEARITY_TOLERANCE: f64 = 1e-6;

/// Largest one-sided spectrum `zero_pad_to_time_step` will build.
pub const MAX_PADDED_BINS: usize = 1 << 26;

/// Build the two-sided spectrum of a real signal from its one-sided half.
///
/// The DC bin and the last bin appear once; every bin in between is mirrored
/// as its conjugate in reverse order.
pub fn hermitian_extend(one_sided: &[Complex64]) -> Vec<Complex64> {
    let n = one_sided.len();
    let mut full = Vec::with_capacity((2 * n).saturating_sub(2).max(n));
    full.extend_from_slice(one_sided);
    if n > 2 {
        full.extend(one_sided[1..n - 1].iter().rev().map(|h| h.conj()));
    }
    full
}

/// Recover the real impulse response of a one-sided frequency response.
///
/// Fails when the response and axis lengths differ, when fewer than two
/// bins are given, or when the axis does not start at DC with linear
/// spacing (the reconstruction silently produces garbage otherwise).
pub fn freq_to_impulse(response: &[Complex64], frequencies: &FrequencyAxis) -> DspResult<Waveform> {
    DspError::check_len(frequencies.len(), response.len())?;
    if response.len() < 2 {
        return Err(DspError::InsufficientData {
            needed: 2,
            got: response.len(),
        });
    }
    validate_axis(frequencies)?;

    let df = frequencies.step().map(|h| h.0).unwrap_or_default();
    let spectrum = hermitian_extend(response);

    let mut engine = FftEngine::new();
    let impulse = engine.ifft(&spectrum)?;

    let residue = impulse.iter().map(|c| c.im.abs()).fold(0.0, f64::max);
    tracing::trace!(residue, "discarded imaginary residue of inverse transform");

    let samples: Vec<f64> = impulse.iter().map(|c| c.re).collect();
    let dt = Seconds(1.0 / (df * samples.len() as f64));

    tracing::debug!(
        bins = response.len(),
        samples = samples.len(),
        dt_ps = dt.as_ps(),
        "recovered impulse response"
    );

    Ok(Waveform::new(samples, dt, Seconds::ZERO))
}

/// Impulse response of a network driving a matched load `z0` from a matched source.
///
/// Fails with `DegenerateNetwork` at the first bin where the transfer
/// function `2 / (A + B/z0 + C·z0 + D)` is undefined.
pub fn network_impulse(network: &TwoPortNetwork, z0: f64) -> DspResult<Waveform> {
    DspError::check_len(network.frequencies.len(), network.len())?;
    DspError::check_impedance(z0)?;

    let response = network.transfer_function(z0);
    if let Some(i) = response.iter().position(|h| !h.is_finite()) {
        return Err(DspError::DegenerateNetwork {
            index: i,
            frequency: network.frequencies.points[i].0,
            reason: "transfer denominator A + B/Z0 + C*Z0 + D is zero or non-finite",
        });
    }
    freq_to_impulse(&response, &network.frequencies)
}

/// Extend a response with zero-valued bins until its impulse response is
/// sampled at least as finely as `time_step`.
///
/// The reconstructed step is `1 / (2·f_max)`, so the axis grows to
/// `f_max ≥ 1 / (2·time_step)`. Responses that already reach that far are
/// returned unchanged. Growing past [`MAX_PADDED_BINS`] is an error.
pub fn zero_pad_to_time_step(
    response: &[Complex64],
    frequencies: &FrequencyAxis,
    time_step: Seconds,
) -> DspResult<(Vec<Complex64>, FrequencyAxis)> {
    DspError::check_len(frequencies.len(), response.len())?;
    validate_axis(frequencies)?;
    if time_step.0 <= 0.0 {
        return Err(DspError::InvalidConfig(format!(
            "time step must be positive, got {} s",
            time_step.0
        )));
    }

    let df = frequencies.step().unwrap_or(Hertz::ZERO);
    // Shave roundoff so an exact ratio does not ceil up one extra bin.
    let ratio = 1.0 / (2.0 * time_step.0 * df.0);
    let needed = (ratio * (1.0 - 1e-9)).ceil();
    if !needed.is_finite() || (needed >= MAX_PADDED_BINS as f64 && needed >= response.len() as f64) {
        return Err(DspError::InvalidConfig(format!(
            "time step {:.3e} s needs more than {} bins at {:.3e} Hz spacing",
            time_step.0, MAX_PADDED_BINS, df.0
        )));
    }
    let needed = needed as usize + 1;

    if needed <= response.len() {
        return Ok((response.to_vec(), frequencies.clone()));
    }

    let mut padded = response.to_vec();
    padded.resize(needed, Complex64::new(0.0, 0.0));

    tracing::debug!(
        from = response.len(),
        to = needed,
        "zero-padded frequency response"
    );

    Ok((padded, FrequencyAxis::linear(df, needed)))
}

fn validate_axis(frequencies: &FrequencyAxis) -> DspResult<()> {
    if frequencies.is_uniform_from_dc(AXIS_LINEARITY_TOLERANCE) {
        return Ok(());
    }

    let first = frequencies.points.first().map(|f| f.0).unwrap_or_default();
    let reason = if first != 0.0 {
        format!("axis starts at {first:.6e} Hz instead of DC")
    } else {
        "bins are not linearly spaced".to_string()
    };
    Err(DspError::NonUniformAxis(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_flat_response_is_unit_impulse() {
        let n = 33;
        let axis = FrequencyAxis::linear(Hertz::from_mhz(100.0), n);
        let flat = vec![Complex64::new(1.0, 0.0); n];

        let h = freq_to_impulse(&flat, &axis).unwrap();

        assert_eq!(h.len(), 2 * n - 2);
        assert!((h.samples[0] - 1.0).abs() < 1e-12);
        for &v in &h.samples[1..] {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn test_time_axis_spans_one_period() {
        let n = 17;
        let df = Hertz::from_mhz(50.0);
        let axis = FrequencyAxis::linear(df, n);
        let h = freq_to_impulse(&vec![Complex64::new(1.0, 0.0); n], &axis).unwrap();

        let t = h.time_axis();
        assert_eq!(t.len(), h.len());
        assert_eq!(t[0], Seconds::ZERO);
        assert!((h.duration().0 - 1.0 / df.0).abs() < 1e-18);
        assert!(t[t.len() - 1].0 < 1.0 / df.0);
        assert!((h.dt.0 - 1.0 / (df.0 * 32.0)).abs() < 1e-20);
    }

    #[test]
    fn test_pure_delay_peaks_at_delay() {
        let n = 257;
        let df = Hertz::from_mhz(50.0);
        let axis = FrequencyAxis::linear(df, n);
        let dt = 1.0 / (df.0 * (2 * n - 2) as f64);
        let tau = 40.0 * dt;

        let response: Vec<Complex64> = axis
            .iter()
            .map(|f| Complex64::from_polar(1.0, -2.0 * PI * f.0 * tau))
            .collect();
        let h = freq_to_impulse(&response, &axis).unwrap();

        let (peak_idx, _) = h.peak().unwrap();
        assert_eq!(peak_idx, 40);
    }

    #[test]
    fn test_two_bin_response() {
        let axis = FrequencyAxis::linear(Hertz(1.0), 2);
        let response = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let h = freq_to_impulse(&response, &axis).unwrap();

        assert_eq!(h.samples, vec![0.5, 0.5]);
    }

    #[test]
    fn test_hermitian_extension_layout() {
        let h = [
            Complex64::new(1.0, 0.0),
            Complex64::new(2.0, 1.0),
            Complex64::new(3.0, -1.0),
            Complex64::new(4.0, 0.0),
        ];
        let full = hermitian_extend(&h);

        assert_eq!(full.len(), 6);
        assert_eq!(full[4], Complex64::new(3.0, 1.0));
        assert_eq!(full[5], Complex64::new(2.0, -1.0));
    }

    #[test]
    fn test_rejects_axis_not_at_dc() {
        let axis = FrequencyAxis::new(vec![Hertz(1e6), Hertz(2e6), Hertz(3e6)]);
        let response = vec![Complex64::new(1.0, 0.0); 3];

        assert!(matches!(
            freq_to_impulse(&response, &axis),
            Err(DspError::NonUniformAxis(_))
        ));
    }

    #[test]
    fn test_rejects_nonlinear_axis() {
        let axis = FrequencyAxis::new(vec![Hertz(0.0), Hertz(1e6), Hertz(3e6)]);
        let response = vec![Complex64::new(1.0, 0.0); 3];

        assert!(matches!(
            freq_to_impulse(&response, &axis),
            Err(DspError::NonUniformAxis(_))
        ));
    }

    #[test]
    fn test_shape_and_size_checks() {
        let axis = FrequencyAxis::linear(Hertz(1e6), 4);
        let short = vec![Complex64::new(1.0, 0.0); 3];
        assert!(matches!(
            freq_to_impulse(&short, &axis),
            Err(DspError::ShapeMismatch { expected: 4, actual: 3 })
        ));

        let single = FrequencyAxis::linear(Hertz(1e6), 1);
        assert!(matches!(
            freq_to_impulse(&[Complex64::new(1.0, 0.0)], &single),
            Err(DspError::InsufficientData { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn test_zero_pad_refines_time_step() {
        let df = Hertz::from_mhz(100.0);
        let axis = FrequencyAxis::linear(df, 101); // up to 10 GHz
        let response = vec![Complex64::new(1.0, 0.0); 101];
        let target = Seconds::from_ps(10.0); // needs f_max >= 50 GHz

        let (padded, padded_axis) = zero_pad_to_time_step(&response, &axis, target).unwrap();

        assert_eq!(padded.len(), 501);
        assert_eq!(padded_axis.len(), 501);
        assert!(padded[101..].iter().all(|h| h.norm() == 0.0));

        let h = freq_to_impulse(&padded, &padded_axis).unwrap();
        assert!(h.dt.0 <= target.0 * (1.0 + 1e-9));
    }

    #[test]
    fn test_zero_pad_noop_when_fine_enough() {
        let axis = FrequencyAxis::linear(Hertz::from_ghz(1.0), 65);
        let response = vec![Complex64::new(0.5, 0.0); 65];

        let (padded, _) = zero_pad_to_time_step(&response, &axis, Seconds::from_ps(100.0)).unwrap();
        assert_eq!(padded.len(), 65);
    }

    #[test]
    fn test_zero_pad_rejects_unreachable_time_step() {
        let axis = FrequencyAxis::linear(Hertz::from_ghz(1.0), 3);
        let response = vec![Complex64::new(1.0, 0.0); 3];

        assert!(matches!(
            zero_pad_to_time_step(&response, &axis, Seconds(1e-30)),
            Err(DspError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_network_impulse_rejects_bad_reference() {
        let axis = FrequencyAxis::linear(Hertz::from_mhz(100.0), 9);
        let thru = TwoPortNetwork::identity(axis.clone());

        for z0 in [0.0, -50.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(network_impulse(&thru, z0), Err(DspError::InvalidConfig(_))));
        }
        assert!(network_impulse(&thru, 50.0).is_ok());
    }

    #[test]
    fn test_network_impulse_zero_denominator() {
        let axis = FrequencyAxis::linear(Hertz::from_mhz(100.0), 5);
        let mut net = TwoPortNetwork::identity(axis);
        // A + D = 0 with B = C = 0
        net.matrices[3][[0, 0]] = Complex64::new(-1.0, 0.0);

        match network_impulse(&net, 50.0) {
            Err(DspError::DegenerateNetwork { index, frequency, .. }) => {
                assert_eq!(index, 3);
                assert!((frequency - 300e6).abs() < 1e-3);
            }
            other => panic!("expected degenerate network, got {other:?}"),
        }
    }
}

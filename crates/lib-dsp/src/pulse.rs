//! Pulse-response sampling.
//!
//! The pulse response is the channel's answer to one symbol: the impulse
//! response convolved with `steps_per_symbol` ones. Its peak is the main
//! cursor; the samples one symbol period before and after it are the
//! precursor and postcursor intersymbol interference.

use crate::convolution::convolve_same;
use crate::error::{DspError, DspResult};
use serde::{Deserialize, Serialize};

/// Symbol-spaced samples of a pulse response around its main cursor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelCoefficients {
    /// Precursor samples first, main cursor at `n_taps_pre`, postcursors last.
    pub coefficients: Vec<f64>,

    /// Sample index of the main cursor in the pulse response.
    pub cursor: usize,

    /// Number of precursor samples.
    pub n_taps_pre: usize,
}

impl ChannelCoefficients {
    #[inline]
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Number of postcursor samples.
    pub fn n_taps_post(&self) -> usize {
        self.coefficients.len().saturating_sub(self.n_taps_pre + 1)
    }

    /// Amplitude at the main cursor.
    pub fn main_cursor(&self) -> f64 {
        self.coefficients.get(self.n_taps_pre).copied().unwrap_or_default()
    }
}

/// Convolve an impulse response with a unit rectangular pulse `steps_per_symbol` wide.
///
/// The result has the length of the longer of the two inputs.
pub fn pulse_response(impulse: &[f64], steps_per_symbol: usize) -> DspResult<Vec<f64>> {
    if steps_per_symbol == 0 {
        return Err(DspError::InvalidConfig(
            "steps per symbol must be at least 1".to_string(),
        ));
    }
    if impulse.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }

    let symbol = vec![1.0; steps_per_symbol];
    let pulse = convolve_same(impulse, &symbol)?;

    tracing::debug!(
        impulse_len = impulse.len(),
        steps_per_symbol,
        pulse_len = pulse.len(),
        "computed pulse response"
    );

    Ok(pulse)
}

/// Sample a pulse response at the cursor and its symbol-spaced neighbors.
///
/// The cursor is the first sample holding the maximum value. Neighbors that
/// fall outside the pulse fail with [`DspError::OutOfRange`].
pub fn channel_coefficients(
    pulse: &[f64],
    steps_per_symbol: usize,
    n_taps_pre: usize,
    n_taps_post: usize,
) -> DspResult<ChannelCoefficients> {
    if steps_per_symbol == 0 {
        return Err(DspError::InvalidConfig(
            "steps per symbol must be at least 1".to_string(),
        ));
    }

    let cursor = pulse
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
        .ok_or(DspError::InsufficientData { needed: 1, got: 0 })?;

    let len = pulse.len();
    let sps = steps_per_symbol as isize;
    let n_taps = n_taps_pre + n_taps_post + 1;

    let coefficients = (0..n_taps)
        .map(|i| {
            let index = cursor as isize + sps * (i as isize - n_taps_pre as isize);
            if index < 0 || index >= len as isize {
                Err(DspError::OutOfRange { index, len })
            } else {
                Ok(pulse[index as usize])
            }
        })
        .collect::<DspResult<Vec<f64>>>()?;

    tracing::debug!(cursor, n_taps, main = coefficients[n_taps_pre], "sampled channel coefficients");

    Ok(ChannelCoefficients {
        coefficients,
        cursor,
        n_taps_pre,
    })
}

/// Pulse response followed by cursor sampling.
pub fn sample_channel(
    impulse: &[f64],
    steps_per_symbol: usize,
    n_taps_pre: usize,
    n_taps_post: usize,
) -> DspResult<(Vec<f64>, ChannelCoefficients)> {
    let pulse = pulse_response(impulse, steps_per_symbol)?;
    let coefficients = channel_coefficients(&pulse, steps_per_symbol, n_taps_pre, n_taps_post)?;
    Ok((pulse, coefficients))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_of_delta_is_rectangle() {
        let mut impulse = vec![0.0; 20];
        impulse[8] = 1.0;

        let pulse = pulse_response(&impulse, 4).unwrap();

        // full = ones at 8..12, same-mode offset (4 - 1) / 2 = 1
        assert_eq!(pulse.len(), 20);
        let ones: Vec<usize> = (0..20).filter(|&i| pulse[i] == 1.0).collect();
        assert_eq!(ones, vec![7, 8, 9, 10]);
        assert!((pulse.iter().sum::<f64>() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_pulse_area_scales_with_symbol_width() {
        let impulse: Vec<f64> = (0..64).map(|i| (-(i as f64) / 6.0).exp() * 0.1).collect();
        let pulse = pulse_response(&impulse, 8).unwrap();

        // Interior sample sums eight consecutive impulse samples.
        let k = 20;
        let offset = (8 - 1) / 2;
        let expected: f64 = impulse[k + offset - 7..=k + offset].iter().sum();
        assert!((pulse[k] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_coefficients_read_precursor_first() {
        let mut pulse = vec![0.0; 60];
        pulse[20] = 0.1;
        pulse[30] = 1.0;
        pulse[40] = 0.4;
        pulse[50] = 0.2;

        let coeffs = channel_coefficients(&pulse, 10, 1, 2).unwrap();

        assert_eq!(coeffs.cursor, 30);
        assert_eq!(coeffs.coefficients, vec![0.1, 1.0, 0.4, 0.2]);
        assert_eq!(coeffs.main_cursor(), 1.0);
        assert_eq!(coeffs.n_taps_post(), 2);
    }

    #[test]
    fn test_cursor_prefers_first_peak() {
        let pulse = [0.0, 0.5, 0.9, 0.9, 0.1, 0.0];
        let coeffs = channel_coefficients(&pulse, 1, 1, 1).unwrap();

        assert_eq!(coeffs.cursor, 2);
        assert_eq!(coeffs.coefficients, vec![0.5, 0.9, 0.9]);
    }

    #[test]
    fn test_precursor_window_out_of_range() {
        let mut pulse = vec![0.0; 100];
        pulse[5] = 1.0;

        let result = channel_coefficients(&pulse, 10, 2, 1);
        assert!(matches!(
            result,
            Err(DspError::OutOfRange { index: -15, len: 100 })
        ));
    }

    #[test]
    fn test_postcursor_window_out_of_range() {
        let mut pulse = vec![0.0; 50];
        pulse[30] = 1.0;

        let result = channel_coefficients(&pulse, 10, 0, 2);
        assert!(matches!(
            result,
            Err(DspError::OutOfRange { index: 50, len: 50 })
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            pulse_response(&[1.0], 0),
            Err(DspError::InvalidConfig(_))
        ));
        assert!(matches!(
            channel_coefficients(&[], 4, 0, 0),
            Err(DspError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_sample_channel_composes() {
        let mut impulse = vec![0.0; 40];
        impulse[10] = 1.0;
        impulse[14] = 0.5;

        let (pulse, coeffs) = sample_channel(&impulse, 4, 1, 1).unwrap();

        assert_eq!(pulse.len(), 40);
        assert!((coeffs.main_cursor() - 1.0).abs() < 1e-12);
        assert!((coeffs.coefficients[2] - 0.5).abs() < 1e-12);
        assert!(coeffs.coefficients[0].abs() < 1e-12);
    }
}

//! Linear convolution of sampled responses.
//!
//! Short kernels (a pulse of `sps` ones against an impulse response) are
//! convolved directly; long pairs go through a single zero-padded FFT.
//! [`convolve_same`] crops the full result to the length of the longer
//! input, centered the way a "same"-mode convolution is conventionally
//! defined:
//!
//! ```text
//! full[k]  = Σ_i a[i] · b[k - i],          k = 0 .. M + K - 2
//! same[k]  = full[k + (min(M, K) - 1) / 2], k = 0 .. max(M, K) - 1
//! ```

use crate::error::{DspError, DspResult};
use crate::fft::FftEngine;

/// Above this many multiply-adds the FFT path is used.
const DIRECT_WORK_LIMIT: usize = 1 << 16;

/// Direct convolution, O(n·m).
///
/// Returns an empty vector when either input is empty.
pub fn direct_convolve(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    let output_len = signal.len() + kernel.len() - 1;
    let mut output = vec![0.0; output_len];

    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            output[i + j] += s * k;
        }
    }

    output
}

/// Single-block FFT convolution.
pub fn fft_convolve(signal: &[f64], kernel: &[f64]) -> DspResult<Vec<f64>> {
    if signal.is_empty() || kernel.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }

    let output_len = signal.len() + kernel.len() - 1;
    let fft_size = output_len.next_power_of_two();

    let mut engine = FftEngine::new();

    let padded = |x: &[f64]| {
        let mut buf = x.to_vec();
        buf.resize(fft_size, 0.0);
        buf
    };
    let mut signal_fft = engine.fft_real(&padded(signal))?;
    let kernel_fft = engine.fft_real(&padded(kernel))?;

    for (s, k) in signal_fft.iter_mut().zip(kernel_fft.iter()) {
        *s *= *k;
    }

    engine.ifft_inplace(&mut signal_fft)?;

    Ok(signal_fft[..output_len].iter().map(|c| c.re).collect())
}

/// Full linear convolution, picking the direct or FFT path by size.
pub fn convolve(signal: &[f64], kernel: &[f64]) -> DspResult<Vec<f64>> {
    if signal.is_empty() || kernel.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }

    if signal.len().saturating_mul(kernel.len()) <= DIRECT_WORK_LIMIT {
        Ok(direct_convolve(signal, kernel))
    } else {
        fft_convolve(signal, kernel)
    }
}

/// Convolution cropped to `max(M, K)` samples, centered on the full result.
pub fn convolve_same(a: &[f64], b: &[f64]) -> DspResult<Vec<f64>> {
    let full = convolve(a, b)?;
    let (short, long) = if a.len() <= b.len() {
        (a.len(), b.len())
    } else {
        (b.len(), a.len())
    };

    let offset = (short - 1) / 2;
    Ok(full[offset..offset + long].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_convolve_impulse() {
        let signal = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let kernel = vec![1.0];

        let result = direct_convolve(&signal, &kernel);
        assert_eq!(result, signal);
    }

    #[test]
    fn test_direct_convolve_shift() {
        let signal = vec![1.0, 2.0, 3.0, 4.0];
        let kernel = vec![0.0, 1.0];

        let result = direct_convolve(&signal, &kernel);
        assert_eq!(result, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fft_convolve_matches_direct() {
        let signal: Vec<f64> = (0..700).map(|i| ((i as f64) * 0.37).sin()).collect();
        let kernel: Vec<f64> = (0..120).map(|i| (-(i as f64) / 30.0).exp()).collect();

        let direct = direct_convolve(&signal, &kernel);
        let fft = fft_convolve(&signal, &kernel).unwrap();
        let dispatched = convolve(&signal, &kernel).unwrap();

        assert_eq!(fft.len(), direct.len());
        for ((d, f), c) in direct.iter().zip(fft.iter()).zip(dispatched.iter()) {
            assert!((d - f).abs() < 1e-9);
            assert!((d - c).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_mode_odd_kernel() {
        let result = convolve_same(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5]).unwrap();
        assert_eq!(result, vec![1.0, 2.5, 4.0]);
    }

    #[test]
    fn test_same_mode_even_kernel() {
        // full = [1, 3, 5, 3], offset (2 - 1) / 2 = 0
        let result = convolve_same(&[1.0, 2.0, 3.0], &[1.0, 1.0]).unwrap();
        assert_eq!(result, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_same_mode_is_symmetric_in_length() {
        let long = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let short = [1.0, 1.0, 1.0, 1.0];

        let ab = convolve_same(&long, &short).unwrap();
        let ba = convolve_same(&short, &long).unwrap();

        assert_eq!(ab.len(), 6);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(direct_convolve(&[], &[1.0]).is_empty());
        assert!(matches!(
            convolve_same(&[1.0], &[]),
            Err(DspError::InsufficientData { .. })
        ));
    }
}

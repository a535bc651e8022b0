//! FFT/IFFT operations using rustfft.
//!
//! This module provides a thin wrapper around rustfft with:
//! - Planner caching for repeated transforms
//! - Normalized inverse transform (1/N), matching the usual IDFT definition
//! - Arbitrary transform lengths (Hermitian-extended spectra are `2N - 2`
//!   long, which is rarely a power of two)

use crate::error::{DspError, DspResult};
use num_complex::Complex64;
use rustfft::FftPlanner;

/// FFT engine with a cached planner.
pub struct FftEngine {
    planner: FftPlanner<f64>,
}

impl FftEngine {
    /// Create a new FFT engine.
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Perform forward FFT on complex data in-place.
    pub fn fft_inplace(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        if data.is_empty() {
            return Err(DspError::InsufficientData { needed: 1, got: 0 });
        }

        let fft = self.planner.plan_fft_forward(data.len());
        fft.process(data);
        Ok(())
    }

    /// Perform inverse FFT on complex data in-place.
    pub fn ifft_inplace(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        let len = data.len();
        if len == 0 {
            return Err(DspError::InsufficientData { needed: 1, got: 0 });
        }

        let fft = self.planner.plan_fft_inverse(len);
        fft.process(data);

        // Normalize
        let scale = 1.0 / len as f64;
        for x in data.iter_mut() {
            *x *= scale;
        }

        Ok(())
    }

    /// Perform forward FFT on complex data, returning new buffer.
    pub fn fft(&mut self, data: &[Complex64]) -> DspResult<Vec<Complex64>> {
        let mut result = data.to_vec();
        self.fft_inplace(&mut result)?;
        Ok(result)
    }

    /// Perform inverse FFT on complex data, returning new buffer.
    pub fn ifft(&mut self, data: &[Complex64]) -> DspResult<Vec<Complex64>> {
        let mut result = data.to_vec();
        self.ifft_inplace(&mut result)?;
        Ok(result)
    }

    /// Forward FFT of a real signal (full, two-sided output).
    pub fn fft_real(&mut self, data: &[f64]) -> DspResult<Vec<Complex64>> {
        let mut buf: Vec<Complex64> = data.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        self.fft_inplace(&mut buf)?;
        Ok(buf)
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_ifft_roundtrip() {
        let mut engine = FftEngine::new();

        // Non power-of-two length on purpose
        let n = 62;
        let signal: Vec<Complex64> = (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                Complex64::new((2.0 * PI * 4.0 * t).sin(), 0.0)
            })
            .collect();

        let spectrum = engine.fft(&signal).unwrap();
        let recovered = engine.ifft(&spectrum).unwrap();

        for (orig, rec) in signal.iter().zip(recovered.iter()) {
            assert!((orig.re - rec.re).abs() < 1e-10);
            assert!((orig.im - rec.im).abs() < 1e-10);
        }
    }

    #[test]
    fn test_fft_of_impulse_is_flat() {
        let mut engine = FftEngine::new();
        let mut impulse = vec![0.0; 10];
        impulse[0] = 1.0;

        let spectrum = engine.fft_real(&impulse).unwrap();
        for bin in spectrum {
            assert!((bin - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut engine = FftEngine::new();
        let result = engine.ifft(&[]);
        assert!(matches!(result, Err(DspError::InsufficientData { needed: 1, got: 0 })));
    }
}

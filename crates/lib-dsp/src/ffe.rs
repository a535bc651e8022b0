//! Zero-forcing feed-forward equalizer synthesis.
//!
//! With channel samples `h` (main cursor at `p = n_taps_pre`) and equalizer
//! taps `w`, the equalized response at the sampling instants is the
//! convolution
//!
//! ```text
//! y[r] = Σ_c h[p + r − c] · w[c]        (h outside [0, n) taken as 0)
//! ```
//!
//! Zero-forcing picks `w` so that `y = e_p`: unit response at the cursor and
//! no intersymbol interference at any other tap position. The weights are
//! then scaled so `Σ|w| = 1`, the peak-power constraint of a transmitter FIR.

use crate::error::{DspError, DspResult};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Smallest allowed ratio of the extreme LU pivots.
pub const MIN_PIVOT_RATIO: f64 = 1e-12;

/// Normalized equalizer tap weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TapWeights {
    /// Precursor taps first, main tap at `n_taps_pre`. `Σ|w| = 1`.
    pub weights: Vec<f64>,

    pub n_taps_pre: usize,
}

impl TapWeights {
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn n_taps_post(&self) -> usize {
        self.weights.len().saturating_sub(self.n_taps_pre + 1)
    }

    pub fn main_tap(&self) -> f64 {
        self.weights.get(self.n_taps_pre).copied().unwrap_or_default()
    }

    /// Equalized channel response at the tap positions.
    ///
    /// For the channel the taps were solved against this is
    /// `e_{n_taps_pre} / Σ|b|` up to roundoff.
    pub fn equalized(&self, coefficients: &[f64]) -> DspResult<Vec<f64>> {
        DspError::check_len(self.weights.len(), coefficients.len())?;
        let a = forcing_matrix(coefficients, self.n_taps_pre);
        let w = DVector::from_column_slice(&self.weights);
        Ok((a * w).iter().copied().collect())
    }
}

/// Convolution matrix `A[r][c] = h[p + r − c]` of the sampled channel.
fn forcing_matrix(coefficients: &[f64], n_taps_pre: usize) -> DMatrix<f64> {
    let n = coefficients.len();
    DMatrix::from_fn(n, n, |r, c| {
        let k = (n_taps_pre + r) as isize - c as isize;
        if k >= 0 && (k as usize) < n {
            coefficients[k as usize]
        } else {
            0.0
        }
    })
}

/// Solve for zero-forcing tap weights.
///
/// Fails with [`DspError::UnsolvableSystem`] when the convolution matrix is
/// singular or too ill-conditioned for the solution to mean anything. There
/// is no least-squares fallback.
pub fn zero_forcing_taps(coefficients: &[f64], n_taps_pre: usize) -> DspResult<TapWeights> {
    let n = coefficients.len();
    if n == 0 {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    if n_taps_pre >= n {
        return Err(DspError::InvalidConfig(format!(
            "{n_taps_pre} precursor taps do not fit in {n} channel coefficients"
        )));
    }

    let a = forcing_matrix(coefficients, n_taps_pre);
    let mut target = DVector::zeros(n);
    target[n_taps_pre] = 1.0;

    let lu = a.lu();

    let u = lu.u();
    let (mut min_d, mut max_d) = (f64::INFINITY, 0.0_f64);
    for k in 0..n {
        let d = u[(k, k)].abs();
        min_d = min_d.min(d);
        max_d = max_d.max(d);
    }
    let pivot_ratio = if max_d > 0.0 { min_d / max_d } else { 0.0 };
    if pivot_ratio < MIN_PIVOT_RATIO {
        return Err(DspError::UnsolvableSystem(format!(
            "channel matrix is singular (pivot ratio {pivot_ratio:.3e})"
        )));
    }
    if pivot_ratio < 1e-8 {
        tracing::warn!(pivot_ratio, "zero-forcing system is poorly conditioned");
    }

    let b = lu
        .solve(&target)
        .ok_or_else(|| DspError::UnsolvableSystem("LU solve failed".to_string()))?;

    if b.iter().any(|v| !v.is_finite()) {
        return Err(DspError::UnsolvableSystem(
            "solution has non-finite entries".to_string(),
        ));
    }

    let norm: f64 = b.iter().map(|v| v.abs()).sum();
    if norm == 0.0 {
        return Err(DspError::UnsolvableSystem("solution is all zeros".to_string()));
    }

    let weights: Vec<f64> = b.iter().map(|v| v / norm).collect();

    tracing::debug!(
        n_taps = n,
        n_taps_pre,
        scale = norm,
        "solved zero-forcing taps"
    );

    Ok(TapWeights {
        weights,
        n_taps_pre,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_channel_needs_no_equalization() {
        let taps = zero_forcing_taps(&[0.0, 1.0, 0.0], 1).unwrap();

        assert_eq!(taps.len(), 3);
        assert!(taps.weights[0].abs() < 1e-15);
        assert!((taps.weights[1] - 1.0).abs() < 1e-15);
        assert!(taps.weights[2].abs() < 1e-15);
    }

    #[test]
    fn test_postcursor_isi_is_cancelled() {
        let channel = [0.0, 1.0, 0.5];
        let taps = zero_forcing_taps(&channel, 1).unwrap();

        // b = [0, 1, -0.5], Σ|b| = 1.5
        let expected = [0.0, 2.0 / 3.0, -1.0 / 3.0];
        for (w, e) in taps.weights.iter().zip(expected.iter()) {
            assert!((w - e).abs() < 1e-12);
        }

        let y = taps.equalized(&channel).unwrap();
        assert!(y[0].abs() < 1e-12);
        assert!(y[2].abs() < 1e-12);
        assert!((y[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pre_and_postcursor_isi() {
        let channel = [0.15, 0.8, 0.3, 0.1, 0.05];
        let taps = zero_forcing_taps(&channel, 1).unwrap();

        let abs_sum: f64 = taps.weights.iter().map(|w| w.abs()).sum();
        assert!((abs_sum - 1.0).abs() < 1e-12);

        let y = taps.equalized(&channel).unwrap();
        for (i, v) in y.iter().enumerate() {
            if i == 1 {
                assert!(*v > 0.0);
            } else {
                assert!(v.abs() < 1e-12, "residual ISI {v} at tap {i}");
            }
        }
        assert_eq!(taps.n_taps_post(), 3);
        assert!(taps.main_tap() > 0.0);
    }

    #[test]
    fn test_deterministic() {
        let channel = [0.05, 0.2, 1.0, 0.4, 0.1];
        let a = zero_forcing_taps(&channel, 2).unwrap();
        let b = zero_forcing_taps(&channel, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_singular_channel() {
        // Rows 0 and 2 of the convolution matrix coincide.
        let result = zero_forcing_taps(&[1.0, 0.0, 1.0], 1);
        assert!(matches!(result, Err(DspError::UnsolvableSystem(_))));

        let result = zero_forcing_taps(&[0.0, 0.0, 0.0], 1);
        assert!(matches!(result, Err(DspError::UnsolvableSystem(_))));
    }

    #[test]
    fn test_invalid_tap_counts() {
        assert!(matches!(
            zero_forcing_taps(&[0.0, 1.0], 2),
            Err(DspError::InvalidConfig(_))
        ));
        assert!(matches!(
            zero_forcing_taps(&[], 0),
            Err(DspError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_forcing_matrix_bands() {
        let a = forcing_matrix(&[0.1, 1.0, 0.5], 1);

        assert_eq!(a[(0, 0)], 1.0);
        assert_eq!(a[(0, 1)], 0.1);
        assert_eq!(a[(1, 0)], 0.5);
        assert_eq!(a[(2, 0)], 0.0);
        assert_eq!(a[(0, 2)], 0.0);
    }
}

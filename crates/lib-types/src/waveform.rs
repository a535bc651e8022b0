//! Time-domain waveform representation.
//!
//! Impulse and pulse responses recovered from a frequency response are
//! stored as uniformly sampled waveforms. For a waveform with `N` samples
//! the sample times are
//!
//! ```text
//! t[i] = t_start + i * dt,  for i = 0, 1, ..., N-1
//! ```
//!
//! so `duration()` (`N * dt`) is the span from `t_start` to one sample past
//! the last. An impulse response reconstructed from a spectrum with bin
//! spacing `df` has `duration() == 1 / df`: one period of the inverse DFT.

use crate::units::Seconds;
use serde::{Deserialize, Serialize};

/// A uniformly-sampled time-domain waveform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    /// Sample values (normalized units).
    pub samples: Vec<f64>,

    /// Time step between consecutive samples.
    pub dt: Seconds,

    /// Time of the first sample.
    pub t_start: Seconds,
}

impl Waveform {
    /// Create a new waveform from samples.
    pub fn new(samples: Vec<f64>, dt: Seconds, t_start: Seconds) -> Self {
        Self { samples, dt, t_start }
    }

    /// Number of samples in the waveform.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the waveform is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total duration of the waveform.
    #[inline]
    pub fn duration(&self) -> Seconds {
        Seconds(self.samples.len() as f64 * self.dt.0)
    }

    /// Get the time value for a given sample index.
    #[inline]
    pub fn time_at(&self, index: usize) -> Seconds {
        Seconds(self.t_start.0 + index as f64 * self.dt.0)
    }

    /// Sample times, one per sample.
    pub fn time_axis(&self) -> Vec<Seconds> {
        (0..self.samples.len()).map(|i| self.time_at(i)).collect()
    }

    /// Index and value of the largest sample (first one on ties).
    pub fn peak(&self) -> Option<(usize, f64)> {
        self.samples
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
    }

    /// Sum of all samples (the DC gain of an impulse response).
    pub fn sum(&self) -> f64 {
        self.samples.iter().sum()
    }

    /// Replace the samples, keeping the time base.
    pub fn with_samples(&self, samples: Vec<f64>) -> Self {
        Self {
            samples,
            dt: self.dt,
            t_start: self.t_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_basics() {
        let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0];
        let wf = Waveform::new(samples, Seconds::from_ps(10.0), Seconds::ZERO);

        assert_eq!(wf.len(), 5);
        assert!((wf.duration().as_ps() - 50.0).abs() < 0.01);
        assert!((wf.sum() - 2.0).abs() < 1e-12);
        assert_eq!(wf.peak(), Some((2, 1.0)));
    }

    #[test]
    fn test_time_axis_excludes_period_end() {
        let wf = Waveform::new(vec![0.0; 4], Seconds(0.25), Seconds::ZERO);
        let t: Vec<f64> = wf.time_axis().iter().map(|s| s.0).collect();

        assert_eq!(t, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_peak_prefers_first_maximum() {
        let wf = Waveform::new(vec![0.2, 0.9, 0.9, -1.5], Seconds(1.0), Seconds::ZERO);
        assert_eq!(wf.peak(), Some((1, 0.9)));

        let empty = Waveform::new(Vec::new(), Seconds(1.0), Seconds::ZERO);
        assert_eq!(empty.peak(), None);
    }
}

//! Frequency axes and two-port (ABCD) network containers.
//!
//! A two-port network is stored as one dense 2x2 ABCD matrix per frequency
//! bin. ABCD matrices compose by plain matrix multiplication when networks
//! are connected in series, which is why they are the working representation
//! for channel synthesis.

use crate::units::Hertz;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// ABCD matrix at a single frequency: `[[A, B], [C, D]]`.
pub type AbcdMatrix = Array2<Complex64>;

/// Build an ABCD matrix from its four elements.
pub fn abcd(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> AbcdMatrix {
    let mut m = Array2::zeros((2, 2));
    m[[0, 0]] = a;
    m[[0, 1]] = b;
    m[[1, 0]] = c;
    m[[1, 1]] = d;
    m
}

/// Ordered, non-negative frequency points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyAxis {
    pub points: Vec<Hertz>,
}

impl FrequencyAxis {
    pub fn new(points: Vec<Hertz>) -> Self {
        Self { points }
    }

    /// Linearly spaced axis `0, df, 2*df, ...` with `num_points` entries.
    pub fn linear(df: Hertz, num_points: usize) -> Self {
        Self {
            points: (0..num_points).map(|i| Hertz(df.0 * i as f64)).collect(),
        }
    }

    /// Linearly spaced axis from DC up to and including `f_max`.
    pub fn linear_to(f_max: Hertz, num_points: usize) -> Self {
        if num_points < 2 {
            return Self::linear(Hertz::ZERO, num_points);
        }
        Self::linear(Hertz(f_max.0 / (num_points - 1) as f64), num_points)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Spacing between the first two bins, `f[1] - f[0]`.
    pub fn step(&self) -> Option<Hertz> {
        match self.points.as_slice() {
            [f0, f1, ..] => Some(*f1 - *f0),
            _ => None,
        }
    }

    pub fn last(&self) -> Option<Hertz> {
        self.points.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hertz> {
        self.points.iter()
    }

    /// Whether the axis starts at DC and every step matches `f[1] - f[0]`
    /// to within `rel_tol` of that step.
    pub fn is_uniform_from_dc(&self, rel_tol: f64) -> bool {
        let Some(df) = self.step() else {
            return false;
        };
        if df.0 <= 0.0 || self.points[0].0.abs() > rel_tol * df.0 {
            return false;
        }
        self.points
            .iter()
            .enumerate()
            .all(|(i, f)| (f.0 - i as f64 * df.0).abs() <= rel_tol * df.0 * (i as f64).max(1.0))
    }

    /// Element-wise comparison within a relative tolerance.
    pub fn matches(&self, other: &FrequencyAxis, rel_tol: f64) -> bool {
        self.len() == other.len()
            && self.points.iter().zip(other.points.iter()).all(|(a, b)| {
                let scale = a.0.abs().max(b.0.abs()).max(1.0);
                (a.0 - b.0).abs() <= rel_tol * scale
            })
    }
}

impl From<Vec<Hertz>> for FrequencyAxis {
    fn from(points: Vec<Hertz>) -> Self {
        Self { points }
    }
}

/// A quantity that is either fixed or specified per frequency bin.
///
/// Transmission-line primary constants and reference impedances are often
/// constant but may carry frequency dependence (skin effect, dielectric
/// dispersion).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrequencyDependent<T> {
    Constant(T),
    PerBin(Vec<T>),
}

impl<T: Copy> FrequencyDependent<T> {
    /// Value at bin `index`. Constants ignore the index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range for a `PerBin` value; callers are
    /// expected to check [`FrequencyDependent::bin_count`] first.
    #[inline]
    pub fn at(&self, index: usize) -> T {
        match self {
            Self::Constant(v) => *v,
            Self::PerBin(values) => values[index],
        }
    }

    /// Number of bins carried, or `None` for a constant.
    pub fn bin_count(&self) -> Option<usize> {
        match self {
            Self::Constant(_) => None,
            Self::PerBin(values) => Some(values.len()),
        }
    }
}

impl From<f64> for FrequencyDependent<f64> {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl<T> From<Vec<T>> for FrequencyDependent<T> {
    fn from(values: Vec<T>) -> Self {
        Self::PerBin(values)
    }
}

/// Two-port network in ABCD form over a frequency axis.
#[derive(Clone, Debug)]
pub struct TwoPortNetwork {
    /// Frequency points, one per matrix.
    pub frequencies: FrequencyAxis,

    /// ABCD matrices at each frequency.
    pub matrices: Vec<AbcdMatrix>,
}

impl TwoPortNetwork {
    /// Through connection `[[1, 0], [0, 1]]` at every bin.
    pub fn identity(frequencies: FrequencyAxis) -> Self {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let matrices = (0..frequencies.len())
            .map(|_| abcd(one, zero, zero, one))
            .collect();
        Self { frequencies, matrices }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn a(&self) -> Vec<Complex64> {
        self.element(0, 0)
    }

    pub fn b(&self) -> Vec<Complex64> {
        self.element(0, 1)
    }

    pub fn c(&self) -> Vec<Complex64> {
        self.element(1, 0)
    }

    pub fn d(&self) -> Vec<Complex64> {
        self.element(1, 1)
    }

    /// One ABCD element across all frequencies.
    pub fn element(&self, row: usize, col: usize) -> Vec<Complex64> {
        self.matrices.iter().map(|m| m[[row, col]]).collect()
    }

    /// Voltage transfer into a matched load `z0` (equal to S21 for a
    /// symmetric reference), `2 / (A + B/z0 + C*z0 + D)`.
    ///
    /// `z0` must be positive and finite. Bins whose denominator vanishes
    /// come out non-finite; `lib_dsp::network_impulse` rejects them.
    pub fn transfer_function(&self, z0: f64) -> Vec<Complex64> {
        self.matrices
            .iter()
            .map(|m| {
                let den = m[[0, 0]] + m[[0, 1]] / z0 + m[[1, 0]] * z0 + m[[1, 1]];
                Complex64::new(2.0, 0.0) / den
            })
            .collect()
    }

    /// Largest element-wise deviation from another network.
    pub fn max_deviation(&self, other: &TwoPortNetwork) -> f64 {
        self.matrices
            .iter()
            .zip(other.matrices.iter())
            .flat_map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (x - y).norm()))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_axis_is_uniform() {
        let axis = FrequencyAxis::linear(Hertz::from_mhz(10.0), 101);

        assert_eq!(axis.len(), 101);
        assert!(axis.is_uniform_from_dc(1e-9));
        assert!((axis.last().unwrap().as_ghz() - 1.0).abs() < 1e-12);
        assert!((axis.step().unwrap().as_mhz() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_axis_not_starting_at_dc() {
        let axis = FrequencyAxis::new(vec![Hertz(1e6), Hertz(2e6), Hertz(3e6)]);
        assert!(!axis.is_uniform_from_dc(1e-6));
    }

    #[test]
    fn test_axis_with_uneven_spacing() {
        let axis = FrequencyAxis::new(vec![Hertz(0.0), Hertz(1e6), Hertz(2.5e6)]);
        assert!(!axis.is_uniform_from_dc(1e-6));
    }

    #[test]
    fn test_frequency_dependent_lookup() {
        let constant: FrequencyDependent<f64> = 3.0.into();
        let swept: FrequencyDependent<f64> = vec![1.0, 2.0].into();

        assert_eq!(constant.at(7), 3.0);
        assert_eq!(constant.bin_count(), None);
        assert_eq!(swept.at(1), 2.0);
        assert_eq!(swept.bin_count(), Some(2));
    }

    #[test]
    fn test_identity_network() {
        let net = TwoPortNetwork::identity(FrequencyAxis::linear(Hertz(1e6), 4));

        assert_eq!(net.len(), 4);
        for a in net.a() {
            assert_eq!(a, Complex64::new(1.0, 0.0));
        }
        for b in net.b() {
            assert_eq!(b, Complex64::new(0.0, 0.0));
        }

        // A through line passes everything into a matched load
        for h in net.transfer_function(50.0) {
            assert!((h - Complex64::new(1.0, 0.0)).norm() < 1e-15);
        }
    }
}

//! S-parameter (scattering parameter) data structures.
//!
//! S-parameters describe the frequency-domain behavior of multi-port networks
//! relative to a reference impedance. Measured channels arrive in this form
//! and are converted to ABCD networks for cascading.

use crate::units::{Hertz, Ohms};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// S-parameter matrix at a single frequency.
pub type SMatrix = Array2<Complex64>;

/// Complete S-parameter dataset for a multi-port network.
#[derive(Clone, Debug)]
pub struct SParameters {
    /// Frequency points in Hz.
    pub frequencies: Vec<Hertz>,

    /// S-parameter matrices at each frequency.
    /// Length matches `frequencies`.
    pub matrices: Vec<SMatrix>,

    /// Reference impedance (typically 50 ohms).
    pub z0: Ohms,

    /// Number of ports.
    pub num_ports: usize,
}

impl SParameters {
    /// Create a new S-parameter dataset.
    pub fn new(num_ports: usize, z0: Ohms) -> Self {
        Self {
            frequencies: Vec::new(),
            matrices: Vec::new(),
            z0,
            num_ports,
        }
    }

    /// Add a frequency point with its S-matrix.
    ///
    /// # Panics
    ///
    /// Panics if the matrix dimensions don't match the number of ports.
    pub fn add_point(&mut self, freq: Hertz, matrix: SMatrix) {
        assert_eq!(
            matrix.dim(),
            (self.num_ports, self.num_ports),
            "Matrix shape {:?} doesn't match port count {}",
            matrix.dim(),
            self.num_ports
        );
        self.frequencies.push(freq);
        self.matrices.push(matrix);
    }

    /// Try to add a frequency point, returning an error if dimensions don't match.
    pub fn try_add_point(&mut self, freq: Hertz, matrix: SMatrix) -> Result<(), &'static str> {
        if matrix.nrows() != self.num_ports {
            return Err("Matrix row count doesn't match port count");
        }
        if matrix.ncols() != self.num_ports {
            return Err("Matrix column count doesn't match port count");
        }
        self.frequencies.push(freq);
        self.matrices.push(matrix);
        Ok(())
    }

    /// Number of frequency points.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency range.
    pub fn frequency_range(&self) -> Option<(Hertz, Hertz)> {
        match (self.frequencies.first(), self.frequencies.last()) {
            (Some(&lo), Some(&hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    /// Get S-parameter at specific port indices across all frequencies.
    pub fn get_parameter(&self, row: usize, col: usize) -> Vec<Complex64> {
        self.matrices.iter().map(|m| m[[row, col]]).collect()
    }

    /// Get S11 (input reflection) parameter.
    pub fn s11(&self) -> Vec<Complex64> {
        self.get_parameter(0, 0)
    }

    /// Get S12 (reverse transmission) parameter.
    pub fn s12(&self) -> Vec<Complex64> {
        self.get_parameter(0, 1)
    }

    /// Get S21 (through) parameter.
    pub fn s21(&self) -> Vec<Complex64> {
        self.get_parameter(1, 0)
    }

    /// Get S22 (output reflection) parameter.
    pub fn s22(&self) -> Vec<Complex64> {
        self.get_parameter(1, 1)
    }

    /// Convert to magnitude in dB.
    pub fn to_db(&self, row: usize, col: usize) -> Vec<f64> {
        self.get_parameter(row, col)
            .iter()
            .map(|c| 20.0 * c.norm().log10())
            .collect()
    }

    /// Check if the network is reciprocal (S_ij = S_ji).
    pub fn is_reciprocal(&self, tolerance: f64) -> bool {
        self.matrices.iter().all(|matrix| {
            (0..self.num_ports).all(|i| {
                (i + 1..self.num_ports).all(|j| (matrix[[i, j]] - matrix[[j, i]]).norm() <= tolerance)
            })
        })
    }

    /// Check if the network is passive (|S_ij| <= 1).
    pub fn is_passive(&self) -> bool {
        self.matrices
            .iter()
            .flat_map(|m| m.iter())
            .all(|val| val.norm() <= 1.0 + 1e-6)
    }
}

/// Port assignment of a differential channel inside a 4-port network.
///
/// Indices are 0-based. The standard (IEEE P370) layout is
/// `(1+, 3-) -> (2+, 4-)`, i.e. `input_p = 0, input_n = 2, output_p = 1, output_n = 3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialPorts {
    pub input_p: usize,
    pub input_n: usize,
    pub output_p: usize,
    pub output_n: usize,
}

impl Default for DifferentialPorts {
    fn default() -> Self {
        Self {
            input_p: 0,
            input_n: 2,
            output_p: 1,
            output_n: 3,
        }
    }
}

/// Differential S-parameters for 4-port networks.
///
/// Converts single-ended 4-port to mixed-mode (differential/common) representation.
#[derive(Clone, Debug)]
pub struct MixedModeSParameters {
    /// Differential-mode S-parameters (2x2 at each frequency).
    pub differential: SParameters,

    /// Common-mode S-parameters (2x2 at each frequency).
    pub common: SParameters,

    /// Differential response to common-mode stimulus (SDC).
    pub diff_to_common: SParameters,

    /// Common-mode response to differential stimulus (SCD).
    pub common_to_diff: SParameters,
}

impl MixedModeSParameters {
    /// Convert single-ended 4-port to mixed-mode using the given port pairs.
    ///
    /// Returns `None` unless `se` is a 4-port network and every port index
    /// is in range.
    ///
    /// Mixed-mode port 1 is the input pair, port 2 the output pair. With
    /// `p`/`n` the positive/negative single-ended ports of each pair:
    ///
    /// ```text
    /// SDD_ab = 0.5 * (S_apbp - S_apbn - S_anbp + S_anbn)
    /// SCC_ab = 0.5 * (S_apbp + S_apbn + S_anbp + S_anbn)
    /// SDC_ab = 0.5 * (S_apbp + S_apbn - S_anbp - S_anbn)
    /// SCD_ab = 0.5 * (S_apbp - S_apbn + S_anbp - S_anbn)
    /// ```
    pub fn from_single_ended(se: &SParameters, ports: DifferentialPorts) -> Option<Self> {
        if se.num_ports != 4 {
            return None;
        }
        let pairs = [(ports.input_p, ports.input_n), (ports.output_p, ports.output_n)];
        if pairs.iter().any(|&(p, n)| p >= 4 || n >= 4 || p == n) {
            return None;
        }

        let mut differential = SParameters::new(2, se.z0 * 2.0);
        let mut common = SParameters::new(2, se.z0 * 0.5);
        let mut diff_to_common = SParameters::new(2, se.z0);
        let mut common_to_diff = SParameters::new(2, se.z0);

        let half = Complex64::new(0.5, 0.0);

        for (freq, matrix) in se.frequencies.iter().zip(se.matrices.iter()) {
            let mut sdd = Array2::zeros((2, 2));
            let mut scc = Array2::zeros((2, 2));
            let mut sdc = Array2::zeros((2, 2));
            let mut scd = Array2::zeros((2, 2));

            for (a, &(ap, an)) in pairs.iter().enumerate() {
                for (b, &(bp, bn)) in pairs.iter().enumerate() {
                    let pp = matrix[[ap, bp]];
                    let pn = matrix[[ap, bn]];
                    let np = matrix[[an, bp]];
                    let nn = matrix[[an, bn]];

                    sdd[[a, b]] = half * (pp - pn - np + nn);
                    scc[[a, b]] = half * (pp + pn + np + nn);
                    sdc[[a, b]] = half * (pp + pn - np - nn);
                    scd[[a, b]] = half * (pp - pn + np - nn);
                }
            }

            differential.add_point(*freq, sdd);
            common.add_point(*freq, scc);
            diff_to_common.add_point(*freq, sdc);
            common_to_diff.add_point(*freq, scd);
        }

        Some(Self {
            differential,
            common,
            diff_to_common,
            common_to_diff,
        })
    }

    /// Get differential through (SDD21).
    pub fn sdd21(&self) -> Vec<Complex64> {
        self.differential.s21()
    }
}

/// Touchstone file format information.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchstoneVersion {
    V1, // .s1p, .s2p, etc.
    V2, // .ts format
}

/// Data format in Touchstone files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    /// Real/Imaginary
    RI,
    /// Magnitude/Angle (degrees)
    MA,
    /// dB/Angle (degrees)
    DB,
}

impl DataFormat {
    /// Convert a value pair to a complex number.
    pub fn to_complex(&self, val1: f64, val2: f64) -> Complex64 {
        match self {
            Self::RI => Complex64::new(val1, val2),
            Self::MA => Complex64::from_polar(val1, val2.to_radians()),
            Self::DB => {
                let magnitude = 10.0_f64.powf(val1 / 20.0);
                Complex64::from_polar(magnitude, val2.to_radians())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_format_conversion() {
        let ri = DataFormat::RI.to_complex(1.0, 0.0);
        assert!((ri.re - 1.0).abs() < 1e-10);
        assert!((ri.im - 0.0).abs() < 1e-10);

        let ma = DataFormat::MA.to_complex(1.0, 90.0);
        assert!(ma.re.abs() < 1e-10);
        assert!((ma.im - 1.0).abs() < 1e-10);

        let db = DataFormat::DB.to_complex(0.0, 0.0); // 0 dB = magnitude 1
        assert!((db.re - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_s_parameter_basics() {
        let mut sp = SParameters::new(2, Ohms::Z0_50);

        let mut m1 = Array2::zeros((2, 2));
        m1[[0, 0]] = Complex64::new(0.1, 0.0);
        m1[[0, 1]] = Complex64::new(0.0, 0.0);
        m1[[1, 0]] = Complex64::new(0.9, 0.0);
        m1[[1, 1]] = Complex64::new(0.1, 0.0);

        sp.add_point(Hertz::from_ghz(1.0), m1);

        assert_eq!(sp.len(), 1);
        assert!(sp.is_passive());
        assert!(!sp.is_reciprocal(1e-9));

        let s21 = sp.s21();
        assert!((s21[0].re - 0.9).abs() < 1e-10);
    }

    #[test]
    fn test_mixed_mode_of_ideal_differential_thru() {
        // Two uncoupled through lines: 1->2 (positive leg), 3->4 (negative leg)
        let mut se = SParameters::new(4, Ohms::Z0_50);
        let mut m = Array2::zeros((4, 4));
        m[[1, 0]] = Complex64::new(1.0, 0.0);
        m[[0, 1]] = Complex64::new(1.0, 0.0);
        m[[3, 2]] = Complex64::new(1.0, 0.0);
        m[[2, 3]] = Complex64::new(1.0, 0.0);
        se.add_point(Hertz::from_ghz(1.0), m);

        let mm = MixedModeSParameters::from_single_ended(&se, DifferentialPorts::default()).unwrap();

        assert!((mm.sdd21()[0] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        assert!((mm.common.s21()[0] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        assert!(mm.diff_to_common.s21()[0].norm() < 1e-12);
        assert!(mm.common_to_diff.s21()[0].norm() < 1e-12);
        assert!((mm.differential.z0.0 - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_mode_rejects_two_port() {
        let se = SParameters::new(2, Ohms::Z0_50);
        assert!(MixedModeSParameters::from_single_ended(&se, DifferentialPorts::default()).is_none());
    }
}

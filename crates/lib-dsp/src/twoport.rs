//! Two-port network synthesis and cascading.
//!
//! Every primitive produces one ABCD matrix per frequency bin:
//!
//! | Element            | A          | B             | C             | D          |
//! |--------------------|------------|---------------|---------------|------------|
//! | Transmission line  | cosh(γd)   | Z0·sinh(γd)   | sinh(γd)/Z0   | cosh(γd)   |
//! | Series impedance Z | 1          | Z             | 0             | 1          |
//! | Shunt admittance Y | 1          | 0             | Y             | 1          |
//!
//! Series-connected networks combine by per-bin matrix multiplication in
//! source-to-load order.

use crate::error::{DspError, DspResult};
use lib_types::network::{abcd, AbcdMatrix, FrequencyAxis, FrequencyDependent, TwoPortNetwork};
use num_complex::Complex64;

/// Relative tolerance used when comparing the frequency axes of cascaded networks.
pub const AXIS_MATCH_TOLERANCE: f64 = 1e-9;

/// Distributed transmission-line primary constants, per unit length.
///
/// Each constant may be a scalar or one value per frequency bin (for
/// skin-effect resistance or dispersive dielectrics).
#[derive(Clone, Debug, PartialEq)]
pub struct Rlgc {
    /// Series resistance per unit length [Ω/m].
    pub r: FrequencyDependent<f64>,
    /// Series inductance per unit length [H/m].
    pub l: FrequencyDependent<f64>,
    /// Shunt conductance per unit length [S/m].
    pub g: FrequencyDependent<f64>,
    /// Shunt capacitance per unit length [F/m].
    pub c: FrequencyDependent<f64>,
}

impl Rlgc {
    pub fn new(
        r: impl Into<FrequencyDependent<f64>>,
        l: impl Into<FrequencyDependent<f64>>,
        g: impl Into<FrequencyDependent<f64>>,
        c: impl Into<FrequencyDependent<f64>>,
    ) -> Self {
        Self {
            r: r.into(),
            l: l.into(),
            g: g.into(),
            c: c.into(),
        }
    }

    /// Lossless line (r = g = 0).
    pub fn lossless(l: f64, c: f64) -> Self {
        Self::new(0.0, l, 0.0, c)
    }

    fn check_shape(&self, bins: usize) -> DspResult<()> {
        for param in [&self.r, &self.l, &self.g, &self.c] {
            if let Some(len) = param.bin_count() {
                DspError::check_len(bins, len)?;
            }
        }
        Ok(())
    }
}

/// Build the ABCD network of a uniform transmission line of length `length`.
///
/// `γd = d·sqrt((r + jωl)(g + jωc))`, `Z0 = sqrt((r + jωl)/(g + jωc))`.
/// Where the series or shunt immittance vanishes (DC on a lossless line)
/// the ratio is undefined, and the exact limit `A = D = 1`,
/// `B = (r + jωl)·d`, `C = (g + jωc)·d` is used instead.
pub fn transmission_line(
    rlgc: &Rlgc,
    length: f64,
    frequencies: &FrequencyAxis,
) -> DspResult<TwoPortNetwork> {
    rlgc.check_shape(frequencies.len())?;

    let one = Complex64::new(1.0, 0.0);
    let matrices = frequencies
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let w = f.angular();
            let series = Complex64::new(rlgc.r.at(i), w * rlgc.l.at(i));
            let shunt = Complex64::new(rlgc.g.at(i), w * rlgc.c.at(i));

            if series.norm() == 0.0 || shunt.norm() == 0.0 {
                return abcd(one, series * length, shunt * length, one);
            }

            let gamma_d = (series * shunt).sqrt() * length;
            let z0 = (series / shunt).sqrt();
            let cosh = gamma_d.cosh();
            let sinh = gamma_d.sinh();
            abcd(cosh, z0 * sinh, sinh / z0, cosh)
        })
        .collect();

    tracing::debug!(
        bins = frequencies.len(),
        length,
        "built transmission line network"
    );

    Ok(TwoPortNetwork {
        frequencies: frequencies.clone(),
        matrices,
    })
}

/// Series (lumped) impedance `Z(f)`: `[[1, Z], [0, 1]]`.
pub fn series_impedance(z: &[Complex64], frequencies: &FrequencyAxis) -> DspResult<TwoPortNetwork> {
    DspError::check_len(frequencies.len(), z.len())?;

    let one = Complex64::new(1.0, 0.0);
    let zero = Complex64::new(0.0, 0.0);
    Ok(TwoPortNetwork {
        frequencies: frequencies.clone(),
        matrices: z.iter().map(|&z| abcd(one, z, zero, one)).collect(),
    })
}

/// Shunt admittance `Y(f)`: `[[1, 0], [Y, 1]]`.
pub fn shunt_admittance(y: &[Complex64], frequencies: &FrequencyAxis) -> DspResult<TwoPortNetwork> {
    DspError::check_len(frequencies.len(), y.len())?;

    let one = Complex64::new(1.0, 0.0);
    let zero = Complex64::new(0.0, 0.0);
    Ok(TwoPortNetwork {
        frequencies: frequencies.clone(),
        matrices: y.iter().map(|&y| abcd(one, zero, y, one)).collect(),
    })
}

/// Impedance of a resistor in series with an inductor, `R + jωL`, per bin.
pub fn rl_impedance(r: f64, l: f64, frequencies: &FrequencyAxis) -> Vec<Complex64> {
    frequencies
        .iter()
        .map(|f| Complex64::new(r, f.angular() * l))
        .collect()
}

/// Admittance of a conductance in parallel with a capacitor, `G + jωC`, per bin.
pub fn gc_admittance(g: f64, c: f64, frequencies: &FrequencyAxis) -> Vec<Complex64> {
    frequencies
        .iter()
        .map(|f| Complex64::new(g, f.angular() * c))
        .collect()
}

/// Series connection of two networks, `first` nearer the source.
pub fn cascade(first: &TwoPortNetwork, second: &TwoPortNetwork) -> DspResult<TwoPortNetwork> {
    check_axes(first, second)?;

    let matrices = first
        .matrices
        .iter()
        .zip(second.matrices.iter())
        .map(|(a, b)| a.dot(b))
        .collect();

    Ok(TwoPortNetwork {
        frequencies: first.frequencies.clone(),
        matrices,
    })
}

/// Series connection of an ordered list of networks (source first).
///
/// Matrix products are associative, so the result does not depend on how
/// the list is grouped, but it does depend on the order.
pub fn cascade_all(networks: &[TwoPortNetwork]) -> DspResult<TwoPortNetwork> {
    let (first, rest) = networks
        .split_first()
        .ok_or(DspError::InsufficientData { needed: 1, got: 0 })?;

    rest.iter().try_fold(first.clone(), |acc, next| cascade(&acc, next))
}

/// Per-bin matrix inverse: the network that undoes `network` when cascaded after it.
pub fn inverse(network: &TwoPortNetwork) -> DspResult<TwoPortNetwork> {
    let matrices = network
        .matrices
        .iter()
        .enumerate()
        .map(|(i, m)| {
            invert_2x2(m).ok_or_else(|| {
                DspError::UnsolvableSystem(format!(
                    "ABCD matrix is singular at bin {} ({:.6e} Hz)",
                    i, network.frequencies.points[i].0
                ))
            })
        })
        .collect::<DspResult<Vec<_>>>()?;

    Ok(TwoPortNetwork {
        frequencies: network.frequencies.clone(),
        matrices,
    })
}

fn invert_2x2(m: &AbcdMatrix) -> Option<AbcdMatrix> {
    let det = m[[0, 0]] * m[[1, 1]] - m[[0, 1]] * m[[1, 0]];
    if det.norm() == 0.0 || !det.is_finite() {
        return None;
    }
    Some(abcd(
        m[[1, 1]] / det,
        -m[[0, 1]] / det,
        -m[[1, 0]] / det,
        m[[0, 0]] / det,
    ))
}

fn check_axes(first: &TwoPortNetwork, second: &TwoPortNetwork) -> DspResult<()> {
    if first.len() != first.frequencies.len() {
        return Err(DspError::ShapeMismatch {
            expected: first.frequencies.len(),
            actual: first.len(),
        });
    }
    if second.len() != second.frequencies.len() {
        return Err(DspError::ShapeMismatch {
            expected: second.frequencies.len(),
            actual: second.len(),
        });
    }
    if !first.frequencies.matches(&second.frequencies, AXIS_MATCH_TOLERANCE) {
        return Err(DspError::AxisMismatch(format!(
            "{} bins up to {:?} vs {} bins up to {:?}",
            first.frequencies.len(),
            first.frequencies.last(),
            second.frequencies.len(),
            second.frequencies.last()
        )));
    }
    Ok(())
}

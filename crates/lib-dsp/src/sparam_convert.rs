//! Conversion between S-parameters and ABCD networks.
//!
//! S-parameters measured at reference impedance `Z0` map to ABCD form by
//!
//! ```text
//! Δ = s11·s22 − s12·s21
//! A = (1 + s11 − s22 − Δ) / (2·s21)
//! B = Z0·(1 + s11 + s22 + Δ) / (2·s21)
//! C = (1 − s11 − s22 + Δ) / (2·Z0·s21)
//! D = (1 − s11 + s22 − Δ) / (2·s21)
//! ```
//!
//! which is undefined wherever the forward transmission `s21` vanishes.

use crate::error::{DspError, DspResult};
use lib_types::network::{abcd, FrequencyAxis, FrequencyDependent, TwoPortNetwork};
use lib_types::sparams::SParameters;
use lib_types::units::Ohms;
use ndarray::Array2;
use num_complex::Complex64;

/// Convert four S-parameter sequences to an ABCD network.
///
/// `z0` is the measurement reference impedance, either one value or one
/// per bin.
pub fn sparams_to_abcd(
    s11: &[Complex64],
    s12: &[Complex64],
    s21: &[Complex64],
    s22: &[Complex64],
    z0: &FrequencyDependent<f64>,
    frequencies: &FrequencyAxis,
) -> DspResult<TwoPortNetwork> {
    let n = frequencies.len();
    for len in [s11.len(), s12.len(), s21.len(), s22.len()] {
        DspError::check_len(n, len)?;
    }
    if let Some(len) = z0.bin_count() {
        DspError::check_len(n, len)?;
    }

    let one = Complex64::new(1.0, 0.0);
    let mut matrices = Vec::with_capacity(n);

    for i in 0..n {
        let (s11, s12, s21, s22) = (s11[i], s12[i], s21[i], s22[i]);
        if s21.norm() == 0.0 {
            return Err(DspError::DegenerateNetwork {
                index: i,
                frequency: frequencies.points[i].0,
                reason: "forward transmission S21 is zero",
            });
        }

        let z0 = z0.at(i);
        DspError::check_impedance(z0)?;
        let delta = s11 * s22 - s12 * s21;
        let two_s21 = 2.0 * s21;

        matrices.push(abcd(
            (one + s11 - s22 - delta) / two_s21,
            z0 * (one + s11 + s22 + delta) / two_s21,
            (one - s11 - s22 + delta) / (z0 * two_s21),
            (one - s11 + s22 - delta) / two_s21,
        ));
    }

    Ok(TwoPortNetwork {
        frequencies: frequencies.clone(),
        matrices,
    })
}

/// Convert a 2-port S-parameter dataset to an ABCD network.
pub fn network_from_sparams(sparams: &SParameters) -> DspResult<TwoPortNetwork> {
    if sparams.num_ports != 2 {
        return Err(DspError::InvalidConfig(format!(
            "ABCD conversion needs a 2-port network, got {}-port",
            sparams.num_ports
        )));
    }

    let frequencies = FrequencyAxis::new(sparams.frequencies.clone());
    sparams_to_abcd(
        &sparams.s11(),
        &sparams.s12(),
        &sparams.s21(),
        &sparams.s22(),
        &FrequencyDependent::Constant(sparams.z0.0),
        &frequencies,
    )
}

/// Convert an ABCD network to S-parameters at a real reference impedance.
///
/// ```text
/// den = A + B/Z0 + C·Z0 + D
/// s11 = (A + B/Z0 − C·Z0 − D) / den      s12 = 2·(AD − BC) / den
/// s21 = 2 / den                          s22 = (−A + B/Z0 − C·Z0 + D) / den
/// ```
pub fn abcd_to_sparams(network: &TwoPortNetwork, z0: Ohms) -> DspResult<SParameters> {
    DspError::check_len(network.frequencies.len(), network.len())?;
    DspError::check_impedance(z0.0)?;

    let mut sparams = SParameters::new(2, z0);
    let z0 = z0.0;

    for (i, (freq, m)) in network
        .frequencies
        .iter()
        .zip(network.matrices.iter())
        .enumerate()
    {
        let (a, b, c, d) = (m[[0, 0]], m[[0, 1]], m[[1, 0]], m[[1, 1]]);
        let den = a + b / z0 + c * z0 + d;
        if den.norm() == 0.0 || !den.is_finite() {
            return Err(DspError::DegenerateNetwork {
                index: i,
                frequency: freq.0,
                reason: "S-parameter denominator A + B/Z0 + C*Z0 + D is zero or non-finite",
            });
        }

        let mut s = Array2::zeros((2, 2));
        s[[0, 0]] = (a + b / z0 - c * z0 - d) / den;
        s[[0, 1]] = 2.0 * (a * d - b * c) / den;
        s[[1, 0]] = 2.0 / den;
        s[[1, 1]] = (-a + b / z0 - c * z0 + d) / den;

        sparams.add_point(*freq, s);
    }

    Ok(sparams)
}

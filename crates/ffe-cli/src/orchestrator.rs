//! Pipeline orchestration: channel → impulse → pulse → FFE taps.

use crate::config::{ChannelConfig, ChannelMode, RlgcChannel, RunConfig, Termination};
use anyhow::{Context, Result};
use lib_dsp::interpolation::resample_to_uniform_grid;
use lib_dsp::twoport::{gc_admittance, rl_impedance, series_impedance, shunt_admittance};
use lib_dsp::{
    cascade, cascade_all, freq_to_impulse, sample_channel, transmission_line,
    zero_forcing_taps, zero_pad_to_time_step, ChannelCoefficients, Rlgc, TapWeights,
};
use lib_touchstone::parse_touchstone_file;
use lib_types::network::{FrequencyAxis, TwoPortNetwork};
use lib_types::sparams::{DifferentialPorts, MixedModeSParameters};
use lib_types::units::{Baud, Hertz, Seconds};
use lib_types::waveform::Waveform;
use num_complex::Complex64;
use serde::Serialize;
use std::path::Path;

/// Everything a run produces.
#[derive(Clone, Debug, Serialize)]
pub struct RunResults {
    pub name: String,

    /// Human-readable channel source, e.g. `thru.s4p SDD21`.
    pub channel: String,

    pub symbol_rate: Baud,
    pub samples_per_symbol: usize,

    /// One-sided transfer function bins fed to the transform.
    pub frequency_bins: usize,

    /// DC gain of the channel (`H(0)`, also the impulse response area).
    pub dc_gain: f64,

    /// Insertion loss at half the symbol rate [dB, positive].
    pub nyquist_loss_db: f64,

    pub impulse: Waveform,
    pub pulse: Waveform,
    pub coefficients: ChannelCoefficients,
    pub taps: TapWeights,

    /// Equalized response at the tap positions.
    pub equalized: Vec<f64>,
}

impl RunResults {
    /// Worst residual ISI after equalization, relative to the main cursor.
    pub fn residual_isi(&self) -> f64 {
        let main = self.equalized.get(self.taps.n_taps_pre).copied().unwrap_or_default();
        if main == 0.0 {
            return f64::INFINITY;
        }
        self.equalized
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != self.taps.n_taps_pre)
            .map(|(_, v)| (v / main).abs())
            .fold(0.0, f64::max)
    }
}

/// Run orchestrator.
pub struct Orchestrator {
    config: RunConfig,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline.
    pub fn run(&self) -> Result<RunResults> {
        let sampling = &self.config.sampling;
        let equalizer = &self.config.equalizer;
        tracing::info!("Starting run: {}", self.config.name);

        let (response, axis, channel) = self.load_channel()?;
        let nyquist_loss_db = loss_at(&response, &axis, sampling.symbol_rate().nyquist());
        tracing::info!("Channel loss at Nyquist: {:.2} dB", nyquist_loss_db);

        let impulse = freq_to_impulse(&response, &axis)
            .context("Failed to recover impulse response")?;

        let target = sampling.time_step();
        if ((impulse.dt.0 - target.0) / target.0).abs() > 1e-6 {
            tracing::warn!(
                "Recovered time step {:.4} ps differs from target {:.4} ps",
                impulse.dt.as_ps(),
                target.as_ps()
            );
        }

        let sps = sampling.samples_per_symbol;
        let (pulse, coefficients) =
            sample_channel(&impulse.samples, sps, equalizer.n_taps_pre, equalizer.n_taps_post)
                .context("Failed to sample pulse response")?;

        tracing::info!(
            "Main cursor at {:.2} ns, amplitude {:.4}",
            impulse.time_at(coefficients.cursor).as_ns(),
            coefficients.main_cursor()
        );

        tracing::debug!("Solving {}x{} zero-forcing system", equalizer.n_taps(), equalizer.n_taps());
        let taps = zero_forcing_taps(&coefficients.coefficients, equalizer.n_taps_pre)
            .context("Zero-forcing solve failed")?;
        let equalized = taps.equalized(&coefficients.coefficients)?;

        let pulse = impulse.with_samples(pulse);
        let results = RunResults {
            name: self.config.name.clone(),
            channel,
            symbol_rate: sampling.symbol_rate(),
            samples_per_symbol: sps,
            frequency_bins: axis.len(),
            dc_gain: response[0].re,
            nyquist_loss_db,
            impulse,
            pulse,
            coefficients,
            taps,
            equalized,
        };

        tracing::info!(
            "Run complete: {} taps, residual ISI {:.2e}",
            results.taps.len(),
            results.residual_isi()
        );
        Ok(results)
    }

    /// Transfer function on a DC-anchored uniform grid whose inverse
    /// transform lands exactly on the configured time step.
    fn load_channel(&self) -> Result<(Vec<Complex64>, FrequencyAxis, String)> {
        let sampling = &self.config.sampling;
        let t_d = sampling.time_step();
        let f_top = Hertz(1.0 / (2.0 * t_d.0));

        match &self.config.channel {
            ChannelConfig::Touchstone { path, mode } => {
                let (freqs, values, label) = measured_response(path, *mode)?;
                let (response, axis) = uniform_response(&freqs, &values, f_top, sampling.num_points, t_d)?;
                Ok((response, axis, label))
            }
            ChannelConfig::Rlgc(line) => {
                let axis = FrequencyAxis::linear_to(f_top, sampling.num_points);
                let network = synthesize_channel(line, &axis)?;
                let label = format!(
                    "RLGC line, {:.1} mm{}",
                    line.length_m * 1e3,
                    if line.termination.is_some() { ", terminated" } else { "" }
                );
                Ok((network.transfer_function(line.z0_ohm), axis, label))
            }
        }
    }
}

/// Insertion loss at the bin nearest `freq`.
fn loss_at(response: &[Complex64], axis: &FrequencyAxis, freq: Hertz) -> f64 {
    let bin = match axis.step() {
        Some(df) if df.0 > 0.0 => ((freq.0 / df.0).round() as usize).min(response.len() - 1),
        _ => 0,
    };
    -20.0 * response[bin].norm().max(1e-300).log10()
}

/// Extract the configured transfer function from a Touchstone file.
fn measured_response(path: &Path, mode: ChannelMode) -> Result<(Vec<Hertz>, Vec<Complex64>, String)> {
    tracing::info!("Loading channel from {:?}", path);

    let ts = parse_touchstone_file(path)
        .with_context(|| format!("Failed to parse Touchstone file {:?}", path))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sparams = ts.into_sparams();
    let num_ports = sparams.num_ports;

    match mode {
        ChannelMode::SingleEnded { input_port, output_port } => {
            if input_port > num_ports || output_port > num_ports {
                anyhow::bail!(
                    "Port S{}{} does not exist in a {}-port network",
                    output_port,
                    input_port,
                    num_ports
                );
            }
            tracing::info!("Single-ended mode: S{}{}", output_port, input_port);
            let values = sparams.get_parameter(output_port - 1, input_port - 1);
            Ok((
                sparams.frequencies,
                values,
                format!("{file_name} S{output_port}{input_port}"),
            ))
        }
        ChannelMode::Differential { input_p, input_n, output_p, output_n } => {
            if num_ports != 4 {
                anyhow::bail!(
                    "Differential mode requires 4-port S-parameters, got {}-port",
                    num_ports
                );
            }

            tracing::info!(
                "Differential mode: ports ({}+,{}-) -> ({}+,{}-)",
                input_p, input_n, output_p, output_n
            );

            let ports = DifferentialPorts {
                input_p: input_p - 1,
                input_n: input_n - 1,
                output_p: output_p - 1,
                output_n: output_n - 1,
            };
            if ports != DifferentialPorts::default() {
                tracing::warn!(
                    "Non-standard port mapping. Standard is (1+,3-) -> (2+,4-), got ({}+,{}-) -> ({}+,{}-)",
                    input_p, input_n, output_p, output_n
                );
            }
            let mixed = MixedModeSParameters::from_single_ended(&sparams, ports)
                .context("Port mapping is out of range for the 4-port network")?;

            let sdc21 = mixed.diff_to_common.s21();
            if let Some(mid) = sdc21.get(sdc21.len() / 2) {
                let sdc_db = 20.0 * mid.norm().max(1e-300).log10();
                tracing::info!("Mode conversion (mid-band): SDC21 = {:.2} dB", sdc_db);
                if sdc_db > -40.0 {
                    tracing::warn!("High mode conversion: SDC21 = {:.2} dB", sdc_db);
                }
            }

            Ok((
                sparams.frequencies,
                mixed.sdd21(),
                format!("{file_name} SDD21"),
            ))
        }
    }
}

/// Resample measured data onto `[0, f_top]` with `num_points` bins.
///
/// Bins past the last measured frequency are zero-filled rather than
/// extrapolated, so the recovered step is exactly `t_d`.
fn uniform_response(
    freqs: &[Hertz],
    values: &[Complex64],
    f_top: Hertz,
    num_points: usize,
    t_d: Seconds,
) -> Result<(Vec<Complex64>, FrequencyAxis)> {
    let measured_max = freqs
        .last()
        .map(|f| f.0)
        .context("Touchstone file has no frequency points")?;

    let df = f_top.0 / (num_points - 1) as f64;
    let covered = measured_max.min(f_top.0);
    let n_measured = ((covered / df).floor() as usize + 1).min(num_points);
    if n_measured < 2 {
        anyhow::bail!(
            "Measured data ends at {:.3} GHz, below one grid step of {:.3} MHz",
            measured_max * 1e-9,
            df * 1e-6
        );
    }

    let (resampled, axis) =
        resample_to_uniform_grid(freqs, values, Hertz(df * (n_measured - 1) as f64), n_measured)
            .context("Failed to resample measured response")?;

    if n_measured < num_points {
        tracing::info!(
            "Measured data ends at {:.2} GHz; zero-padding to {:.2} GHz",
            measured_max * 1e-9,
            f_top.as_ghz()
        );
    }

    let (padded, axis) = zero_pad_to_time_step(&resampled, &axis, t_d)?;
    Ok((padded, axis))
}

/// Line network, wrapped in mirrored terminations when configured.
fn synthesize_channel(line: &RlgcChannel, axis: &FrequencyAxis) -> Result<TwoPortNetwork> {
    let rlgc = Rlgc::new(line.r, line.l, line.g, line.c);
    let tline = transmission_line(&rlgc, line.length_m, axis)?;

    let Some(term) = &line.termination else {
        return Ok(tline);
    };

    let (series, shunt) = termination_networks(term, axis)?;
    let source_side = cascade(&series, &shunt)?;
    let load_side = cascade(&shunt, &series)?;
    Ok(cascade_all(&[source_side, tline, load_side])?)
}

fn termination_networks(
    term: &Termination,
    axis: &FrequencyAxis,
) -> Result<(TwoPortNetwork, TwoPortNetwork)> {
    let z = rl_impedance(term.series_r_ohm, term.series_l_nh * 1e-9, axis);
    let y = gc_admittance(term.shunt_g_s, term.shunt_c_pf * 1e-12, axis);
    Ok((series_impedance(&z, axis)?, shunt_admittance(&y, axis)?))
}

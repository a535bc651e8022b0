//! Run configuration loading and validation.

use anyhow::{Context, Result};
use lib_types::units::{Baud, Seconds};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Top-level run configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run name, used in reports and as the output subdirectory of a
    /// batch run. Must be a single plain path component.
    pub name: String,

    /// Channel source.
    pub channel: ChannelConfig,

    /// Symbol timing and frequency grid.
    #[serde(default)]
    pub sampling: SamplingParams,

    /// Equalizer shape.
    #[serde(default)]
    pub equalizer: EqualizerParams,
}

/// Where the channel response comes from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    /// Measured S-parameters.
    Touchstone {
        /// Path to the .sNp file, relative to the config file.
        path: PathBuf,

        /// Which transfer function to extract.
        #[serde(default)]
        mode: ChannelMode,
    },

    /// Synthesized transmission line with optional lumped terminations.
    Rlgc(RlgcChannel),
}

/// Transfer function extracted from a Touchstone network.
///
/// Ports are 1-based, as printed in data sheets.
///
/// Single-ended:
/// ```toml
/// mode = { type = "single_ended", input_port = 1, output_port = 2 }
/// ```
///
/// Differential (4-port, mixed-mode SDD21):
/// ```toml
/// mode = { type = "differential", input_p = 1, input_n = 3, output_p = 2, output_n = 4 }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMode {
    SingleEnded {
        #[serde(default = "default_input_port")]
        input_port: usize,
        #[serde(default = "default_output_port")]
        output_port: usize,
    },
    Differential {
        input_p: usize,
        input_n: usize,
        output_p: usize,
        output_n: usize,
    },
}

impl Default for ChannelMode {
    fn default() -> Self {
        Self::SingleEnded {
            input_port: default_input_port(),
            output_port: default_output_port(),
        }
    }
}

fn default_input_port() -> usize { 1 }
fn default_output_port() -> usize { 2 }

/// Uniform transmission line, per-meter constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RlgcChannel {
    /// Series resistance [Ω/m].
    #[serde(default)]
    pub r: f64,
    /// Series inductance [H/m].
    pub l: f64,
    /// Shunt conductance [S/m].
    #[serde(default)]
    pub g: f64,
    /// Shunt capacitance [F/m].
    pub c: f64,
    /// Line length [m].
    pub length_m: f64,

    /// Source and load reference impedance [Ω].
    #[serde(default = "default_z0")]
    pub z0_ohm: f64,

    /// Lumped elements at each end of the line (package, pads).
    #[serde(default)]
    pub termination: Option<Termination>,
}

fn default_z0() -> f64 { 50.0 }

/// Series R-L followed by shunt G-C, mirrored at both line ends.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Termination {
    #[serde(default)]
    pub series_r_ohm: f64,
    #[serde(default)]
    pub series_l_nh: f64,
    #[serde(default)]
    pub shunt_g_s: f64,
    #[serde(default)]
    pub shunt_c_pf: f64,
}

/// Symbol timing and transform grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Symbol rate [GBd].
    #[serde(default = "default_symbol_rate")]
    pub symbol_rate_gbaud: f64,

    /// Time steps per symbol in the recovered responses.
    #[serde(default = "default_samples_per_symbol")]
    pub samples_per_symbol: usize,

    /// Bins of the one-sided response, DC included.
    #[serde(default = "default_num_points")]
    pub num_points: usize,
}

fn default_symbol_rate() -> f64 { 26.56 }
fn default_samples_per_symbol() -> usize { 32 }
fn default_num_points() -> usize { 4096 }

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            symbol_rate_gbaud: default_symbol_rate(),
            samples_per_symbol: default_samples_per_symbol(),
            num_points: default_num_points(),
        }
    }
}

impl SamplingParams {
    pub fn symbol_rate(&self) -> Baud {
        Baud::from_gbaud(self.symbol_rate_gbaud)
    }

    /// Target time step of the recovered impulse response.
    pub fn time_step(&self) -> Seconds {
        Seconds(self.symbol_rate().ui().0 / self.samples_per_symbol as f64)
    }
}

/// Equalizer tap counts around the main cursor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EqualizerParams {
    #[serde(default = "default_taps_pre")]
    pub n_taps_pre: usize,
    #[serde(default = "default_taps_post")]
    pub n_taps_post: usize,
}

fn default_taps_pre() -> usize { 1 }
fn default_taps_post() -> usize { 2 }

impl Default for EqualizerParams {
    fn default() -> Self {
        Self {
            n_taps_pre: default_taps_pre(),
            n_taps_post: default_taps_post(),
        }
    }
}

impl EqualizerParams {
    pub fn n_taps(&self) -> usize {
        self.n_taps_pre + self.n_taps_post + 1
    }
}

/// Load configuration from a file.
///
/// `.json` files are read as JSON, anything else as TOML. Relative
/// Touchstone paths are resolved against the config file's directory.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: RunConfig = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?} as JSON", path))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?} as TOML", path))?
    };

    if let ChannelConfig::Touchstone { path: ts_path, .. } = &mut config.channel {
        if ts_path.is_relative() {
            if let Some(dir) = path.parent() {
                *ts_path = dir.join(&*ts_path);
            }
        }
    }

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &RunConfig) -> Result<()> {
    validate_name(&config.name)?;

    let sampling = &config.sampling;
    if !sampling.symbol_rate_gbaud.is_finite() || sampling.symbol_rate_gbaud <= 0.0 {
        anyhow::bail!("Symbol rate must be positive, got {} GBd", sampling.symbol_rate_gbaud);
    }
    if sampling.samples_per_symbol == 0 {
        anyhow::bail!("samples_per_symbol must be at least 1");
    }
    if sampling.num_points < 2 {
        anyhow::bail!("num_points must be at least 2, got {}", sampling.num_points);
    }

    match &config.channel {
        ChannelConfig::Touchstone { path, mode } => {
            if !path.exists() {
                anyhow::bail!("Touchstone file not found: {:?}", path);
            }
            validate_mode(mode)?;
        }
        ChannelConfig::Rlgc(line) => {
            for (name, value) in [("r", line.r), ("l", line.l), ("g", line.g), ("c", line.c)] {
                if !value.is_finite() || value < 0.0 {
                    anyhow::bail!("RLGC parameter {} must be non-negative, got {}", name, value);
                }
            }
            if !line.length_m.is_finite() || line.length_m < 0.0 {
                anyhow::bail!("Line length must be non-negative, got {} m", line.length_m);
            }
            if !line.z0_ohm.is_finite() || line.z0_ohm <= 0.0 {
                anyhow::bail!("Reference impedance must be positive, got {} ohm", line.z0_ohm);
            }
            if let Some(term) = &line.termination {
                for (name, value) in [
                    ("series_r_ohm", term.series_r_ohm),
                    ("series_l_nh", term.series_l_nh),
                    ("shunt_g_s", term.shunt_g_s),
                    ("shunt_c_pf", term.shunt_c_pf),
                ] {
                    if !value.is_finite() || value < 0.0 {
                        anyhow::bail!("Termination {} must be non-negative, got {}", name, value);
                    }
                }
            }
        }
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == name => Ok(()),
        _ => anyhow::bail!("Run name {:?} must be a single file name (no separators or '..')", name),
    }
}

/// Reject batches where two runs would share an output directory.
pub fn check_unique_names<'a>(
    configs: impl IntoIterator<Item = (&'a Path, &'a RunConfig)>,
) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for (path, config) in configs {
        if !seen.insert(config.name.as_str()) {
            anyhow::bail!("Duplicate run name {:?} in {:?}", config.name, path);
        }
    }
    Ok(())
}

fn validate_mode(mode: &ChannelMode) -> Result<()> {
    match *mode {
        ChannelMode::SingleEnded { input_port, output_port } => {
            if input_port == 0 || output_port == 0 {
                anyhow::bail!(
                    "Port numbers must be 1-based (got input={}, output={})",
                    input_port,
                    output_port
                );
            }
        }
        ChannelMode::Differential { input_p, input_n, output_p, output_n } => {
            let ports = [input_p, input_n, output_p, output_n];
            if ports.contains(&0) {
                anyhow::bail!(
                    "Port numbers must be 1-based (got input_p={}, input_n={}, output_p={}, output_n={})",
                    input_p, input_n, output_p, output_n
                );
            }
            for (i, p) in ports.iter().enumerate() {
                if ports[..i].contains(p) {
                    anyhow::bail!("Differential port {} is assigned twice", p);
                }
            }
        }
    }
    Ok(())
}

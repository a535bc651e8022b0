//! # lib-dsp
//!
//! Channel modeling and equalizer synthesis for high-speed serial links.
//!
//! The pipeline runs left to right, each stage a pure function over arrays:
//!
//! - **Two-port networks**: ABCD matrices for transmission lines, series
//!   impedances and shunt admittances, cascaded per frequency bin
//! - **S-parameter conversion**: measured S-parameters to ABCD and back
//! - **Frequency/time transform**: Hermitian extension + inverse FFT
//! - **Pulse sampling**: symbol pulse response and cursor-relative taps
//! - **Zero-forcing FFE**: tap weights that cancel sampled ISI

pub mod convolution;
pub mod error;
pub mod ffe;
pub mod fft;
pub mod interpolation;
pub mod pulse;
pub mod sparam_convert;
pub mod time_domain;
pub mod twoport;

pub use error::{DspError, DspResult};
pub use fft::FftEngine;
pub use ffe::{zero_forcing_taps, TapWeights};
pub use pulse::{channel_coefficients, pulse_response, sample_channel, ChannelCoefficients};
pub use sparam_convert::{abcd_to_sparams, network_from_sparams, sparams_to_abcd};
pub use time_domain::{freq_to_impulse, network_impulse, zero_pad_to_time_step};
pub use twoport::{cascade, cascade_all, inverse, transmission_line, Rlgc};

//! # lib-types
//!
//! Core type definitions for SerDes channel modeling.
//!
//! This crate provides foundational types used throughout the workspace:
//! - Physical units with compile-time safety
//! - Frequency axes and two-port (ABCD) networks
//! - S-parameter structures for measured frequency-domain data
//! - Waveform representation for recovered time-domain responses

pub mod units;
pub mod network;
pub mod sparams;
pub mod waveform;

pub use units::*;
pub use network::*;
pub use sparams::*;
pub use waveform::*;

/// Re-export num_complex for convenience
pub use num_complex::Complex64;

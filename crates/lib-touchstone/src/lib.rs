//! # lib-touchstone
//!
//! Reader for Touchstone 1.x (`.sNp`) S-parameter files, the usual
//! container for measured or extracted channel data.
//!
//! The parser is built with `nom` and produces [`lib_types::SParameters`].

pub mod error;
pub mod touchstone;

pub use error::ParseError;
pub use touchstone::{parse_touchstone, parse_touchstone_file, parse_touchstone_with_ports, TouchstoneFile};

//! Unit newtypes for link budgets.
//!
//! Time steps, frequency bins, reference impedances and symbol rates all
//! travel as bare `f64` in the numeric kernels; at API boundaries they are
//! wrapped so a sample period cannot be passed where a bin spacing is due.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Time in seconds, e.g. a sample period or a channel delay.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

impl Seconds {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_ps(ps: f64) -> Self {
        Self(ps * 1e-12)
    }

    #[inline]
    pub fn as_ps(&self) -> f64 {
        self.0 * 1e12
    }

    #[inline]
    pub fn as_ns(&self) -> f64 {
        self.0 * 1e9
    }

    /// Reciprocal, e.g. the sample rate of a time step.
    #[inline]
    pub fn to_frequency(&self) -> Hertz {
        Hertz(1.0 / self.0)
    }
}

impl Add for Seconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Seconds {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Seconds {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Seconds {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

impl Div<Seconds> for Seconds {
    type Output = f64;
    fn div(self, rhs: Seconds) -> f64 {
        self.0 / rhs.0
    }
}

/// Frequency in hertz. Also used for bin spacing.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_mhz(mhz: f64) -> Self {
        Self(mhz * 1e6)
    }

    #[inline]
    pub fn from_ghz(ghz: f64) -> Self {
        Self(ghz * 1e9)
    }

    #[inline]
    pub fn as_ghz(&self) -> f64 {
        self.0 * 1e-9
    }

    #[inline]
    pub fn as_mhz(&self) -> f64 {
        self.0 * 1e-6
    }

    /// Period of one cycle.
    #[inline]
    pub fn to_period(&self) -> Seconds {
        Seconds(1.0 / self.0)
    }

    /// Angular frequency (omega = 2 * pi * f).
    #[inline]
    pub fn angular(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.0
    }
}

impl Add for Hertz {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Hertz {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Hertz {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Hertz {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

/// Real reference impedance in ohms (port Z0).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Ohms(pub f64);

impl Ohms {
    /// Single-ended 50 ohm port reference.
    pub const Z0_50: Self = Self(50.0);
}

impl Mul<f64> for Ohms {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

/// Line symbol rate in baud. PAM-4 carries two bits per symbol.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Baud(pub f64);

impl Baud {
    #[inline]
    pub fn from_gbaud(gbaud: f64) -> Self {
        Self(gbaud * 1e9)
    }

    #[inline]
    pub fn as_gbaud(&self) -> f64 {
        self.0 * 1e-9
    }

    /// Unit interval, the duration of one symbol.
    #[inline]
    pub fn ui(&self) -> Seconds {
        Seconds(1.0 / self.0)
    }

    /// Nyquist frequency (half the symbol rate).
    #[inline]
    pub fn nyquist(&self) -> Hertz {
        Hertz(self.0 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_rate_timing() {
        // 26.56 GBd PAM-4 (53.12 Gb/s)
        let rate = Baud::from_gbaud(26.56);

        assert!((rate.ui().as_ps() - 37.650_6).abs() < 1e-3);
        assert!((rate.nyquist().as_ghz() - 13.28).abs() < 1e-9);
    }

    #[test]
    fn test_frequency_period_reciprocal() {
        let freq = Hertz::from_ghz(16.0);
        let period = freq.to_period();

        assert!((period.as_ps() - 62.5).abs() < 0.01);
        assert!((period.to_frequency().0 - freq.0).abs() < 1.0);
    }
}

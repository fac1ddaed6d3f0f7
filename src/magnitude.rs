//! # Uncertain magnitudes and coefficients
//!
//! First-order error propagation primitives used throughout the reduction:
//!
//! - [`MagErr`], a magnitude with its measurement uncertainty,
//! - [`ValErr`], a dimensionless value (transform coefficient, airmass)
//!   with its standard error.
//!
//! ## Propagation rules
//!
//! Sums and differences of independent quantities add uncertainties in
//! quadrature:
//!
//! ```text
//! err(x ± y) = sqrt(err(x)² + err(y)²)
//! ```
//!
//! A coefficient applied to a magnitude term propagates with the absolute
//! first-order product rule:
//!
//! ```text
//! err(k·x) = sqrt((k·err(x))² + (x·err(k))²)
//! ```
//!
//! which stays finite when either factor is zero (the relative form
//! `|k·x|·sqrt((err(k)/k)² + (err(x)/x)²)` is equivalent away from zero but
//! undefined on it, and a zero instrumental color difference is a perfectly
//! ordinary input here).
//!
//! Correlations between terms are ignored; every input is treated as
//! independent. This matches the reduction equations, which are written so
//! that shared terms appear exactly once per chain.

use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A magnitude with its 1-sigma uncertainty.
///
/// Used for instrumental magnitudes, standard (catalog) magnitudes, and
/// every derived magnitude in between. Arithmetic on `MagErr` propagates
/// uncertainties under the independence assumption described in the module
/// docs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagErr {
    /// Magnitude value.
    pub mag: f64,
    /// 1-sigma uncertainty of the magnitude.
    pub err: f64,
}

impl MagErr {
    /// Build a magnitude from its value and uncertainty.
    pub fn new(mag: f64, err: f64) -> Self {
        Self { mag, err }
    }

    /// True when both the magnitude and its uncertainty are finite.
    pub fn is_finite(&self) -> bool {
        self.mag.is_finite() && self.err.is_finite()
    }
}

impl Add for MagErr {
    type Output = MagErr;

    fn add(self, rhs: MagErr) -> MagErr {
        MagErr {
            mag: self.mag + rhs.mag,
            err: self.err.hypot(rhs.err),
        }
    }
}

impl Sub for MagErr {
    type Output = MagErr;

    fn sub(self, rhs: MagErr) -> MagErr {
        MagErr {
            mag: self.mag - rhs.mag,
            err: self.err.hypot(rhs.err),
        }
    }
}

impl fmt::Display for MagErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} ± {:.3}", self.mag, self.err)
    }
}

/// A dimensionless value with its standard error.
///
/// Transform coefficients (`Ta`, `Tb`, `Tab`, extinction `k`) and batch
/// airmasses are carried as `ValErr`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValErr {
    /// Value.
    pub value: f64,
    /// Standard error of the value.
    pub err: f64,
}

impl ValErr {
    /// Build a value from its estimate and standard error.
    pub fn new(value: f64, err: f64) -> Self {
        Self { value, err }
    }

    /// Reciprocal with exact first-order error propagation.
    ///
    /// ```text
    /// err(1/x) = err(x) / x²
    /// ```
    ///
    /// Used to turn the fitted color slope into the `Tab` coefficient.
    pub fn recip(&self) -> ValErr {
        ValErr {
            value: 1.0 / self.value,
            err: self.err / (self.value * self.value),
        }
    }

    /// True when both the value and its error are finite.
    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.err.is_finite()
    }
}

impl Mul<MagErr> for ValErr {
    type Output = MagErr;

    /// Coefficient times magnitude term, absolute first-order product rule.
    fn mul(self, rhs: MagErr) -> MagErr {
        MagErr {
            mag: self.value * rhs.mag,
            err: (self.value * rhs.err).hypot(rhs.mag * self.err),
        }
    }
}

impl fmt::Display for ValErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} ± {:.4}", self.value, self.err)
    }
}

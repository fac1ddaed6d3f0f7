//! # Photometric transform solvers
//!
//! This module fits and applies the color transforms that turn instrumental
//! magnitudes into standard magnitudes, using the comparison stars measured
//! alongside the target in every batch.
//!
//! ## Public API
//!
//! ### [`crate::transform::TransformMethod`]
//! Enumeration of the supported solver families:
//!
//! - `TransformMethod::Simple` – per-batch three-regression transform
//!   ([`crate::transform::SimpleTransform`]), fitted against the standard
//!   color index and applied through a comparison star,
//! - `TransformMethod::Classic` – session-wide two-parameter transform with
//!   first-order extinction ([`crate::transform::ClassicTransform`]), fitted
//!   on star-pair differences,
//! - `TransformMethod::ClassicWeighted` – the classic solver with rows
//!   weighted by their combined measurement uncertainty.
//!
//! You can create a [`crate::transform::TransformMethod`] from a string with:
//!
//! ```rust
//! use diffphot::transform::TransformMethod;
//! let method: TransformMethod = "simple".parse().unwrap();
//! assert_eq!(method, TransformMethod::Simple);
//! ```
//!
//! ### [`crate::transform::SimpleTransform`]
//! Fits `Ta`, `Tb` and `Tab` from the ensemble stars of a single batch and
//! derives the target's standard magnitudes twice, once through each band of
//! the pair. See the module docs of [`crate::transform::simple`] for the
//! exact equations.
//!
//! ### [`crate::transform::ClassicTransform`]
//! Solves color and extinction coefficients from the differences of every
//! star pair across all batches of a session. Solver only; its coefficients
//! feed external reduction pipelines. See [`crate::transform::classic`].
//!
//! ## See also
//!
//! * [`crate::provider::BatchDataProvider`] – supplies the joined ensembles
//!   both solvers consume.
//! * [`crate::reduction`] – drives fitting and application over a session.

pub mod classic;
pub mod simple;

use std::fmt;
use std::str::FromStr;

use crate::diffphot_errors::DiffPhotError;

pub use classic::{star_pair_rows, ClassicTransform, StarPairRow};
pub use simple::{SimpleTransform, TransformedPair};

/// Solver family used to reduce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformMethod {
    /// Per-batch three-regression transform.
    Simple,
    /// Session-wide transform with first-order extinction, unweighted.
    Classic,
    /// Session-wide transform with uncertainty-weighted rows.
    ClassicWeighted,
}

impl TransformMethod {
    /// Canonical name, as accepted by [`FromStr`] and written by settings
    /// files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMethod::Simple => "simple",
            TransformMethod::Classic => "classic",
            TransformMethod::ClassicWeighted => "classic_weighted",
        }
    }
}

impl FromStr for TransformMethod {
    type Err = DiffPhotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(TransformMethod::Simple),
            "classic" => Ok(TransformMethod::Classic),
            "classic_weighted" => Ok(TransformMethod::ClassicWeighted),
            _ => Err(DiffPhotError::InvalidTransformMethod(format!(
                "Invalid transform method: {s}"
            ))),
        }
    }
}

impl fmt::Display for TransformMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

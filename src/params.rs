//! # Reduction parameters
//!
//! Tuning knobs of a photometry reduction run, grouped in one immutable
//! [`ReductionParams`] value constructed through a validating builder:
//!
//! ```rust
//! use diffphot::params::ReductionParams;
//! use diffphot::transform::TransformMethod;
//!
//! let params = ReductionParams::builder()
//!     .outlier_sigma(2.5)
//!     .transform_method(TransformMethod::Simple)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.saturation_limit, 0.9);
//! ```
//!
//! Validation happens once in [`ReductionParamsBuilder::build`]; every
//! bound check is NaN-safe, so a NaN smuggled into a threshold fails the
//! build instead of silently disabling a filter.

use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use crate::constants::{
    Band, DEFAULT_OUTLIER_SIGMA, DEFAULT_SATURATION_LIMIT, DEFAULT_SNR_FLOOR_DB,
};
use crate::diffphot_errors::DiffPhotError;
use crate::transform::TransformMethod;

/// Parameters of one reduction run.
///
/// Construct with [`ReductionParams::builder`] or take [`Default`] values.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionParams {
    /// Canonical band order; sessions keep only the bands they observed.
    pub band_order: Vec<Band>,
    /// Peak pixel ratio above which a measurement counts as saturated.
    pub saturation_limit: f64,
    /// Signal-to-noise floor in dB; measurements at or below are dropped.
    pub snr_floor_db: f64,
    /// Check-star residual rejection threshold, in standard deviations.
    pub outlier_sigma: f64,
    /// Solver family used for the session.
    pub transform_method: TransformMethod,
}

impl ReductionParams {
    /// Default parameters.
    pub fn new() -> Self {
        Self {
            band_order: crate::bands::default_band_order(),
            saturation_limit: DEFAULT_SATURATION_LIMIT,
            snr_floor_db: DEFAULT_SNR_FLOOR_DB,
            outlier_sigma: DEFAULT_OUTLIER_SIGMA,
            transform_method: TransformMethod::Simple,
        }
    }

    /// Start a builder initialized with the defaults.
    pub fn builder() -> ReductionParamsBuilder {
        ReductionParamsBuilder::new()
    }
}

impl Default for ReductionParams {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReductionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bands = [{}], saturation < {}, snr > {} dB, outliers > {} sigma, method = {}",
            self.band_order.join(", "),
            self.saturation_limit,
            self.snr_floor_db,
            self.outlier_sigma,
            self.transform_method
        )
    }
}

/// Builder for [`ReductionParams`], with validation.
#[derive(Debug, Clone)]
pub struct ReductionParamsBuilder {
    params: ReductionParams,
}

impl Default for ReductionParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReductionParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: ReductionParams::new(),
        }
    }

    pub fn band_order(mut self, bands: Vec<Band>) -> Self {
        self.params.band_order = bands;
        self
    }

    pub fn saturation_limit(mut self, v: f64) -> Self {
        self.params.saturation_limit = v;
        self
    }

    pub fn snr_floor_db(mut self, v: f64) -> Self {
        self.params.snr_floor_db = v;
        self
    }

    pub fn outlier_sigma(mut self, v: f64) -> Self {
        self.params.outlier_sigma = v;
        self
    }

    pub fn transform_method(mut self, method: TransformMethod) -> Self {
        self.params.transform_method = method;
        self
    }

    /// Validate and return the parameters.
    pub fn build(self) -> Result<ReductionParams, DiffPhotError> {
        let p = &self.params;

        if p.band_order.is_empty() {
            return Err(DiffPhotError::InvalidParameter(
                "band_order must name at least one band".into(),
            ));
        }
        for (i, band) in p.band_order.iter().enumerate() {
            if p.band_order[..i].contains(band) {
                return Err(DiffPhotError::InvalidParameter(format!(
                    "band_order repeats band {band}"
                )));
            }
        }

        if !(Self::gt0(p.saturation_limit) && Self::le(p.saturation_limit, 1.0)) {
            return Err(DiffPhotError::InvalidParameter(
                "require 0 < saturation_limit <= 1".into(),
            ));
        }
        if !Self::ge0(p.snr_floor_db) {
            return Err(DiffPhotError::InvalidParameter(
                "snr_floor_db must be non-negative".into(),
            ));
        }
        if !Self::gt0(p.outlier_sigma) {
            return Err(DiffPhotError::InvalidParameter(
                "outlier_sigma must be > 0".into(),
            ));
        }

        Ok(self.params)
    }

    fn gt0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater))
    }

    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Equal) | Some(Less))
    }
}

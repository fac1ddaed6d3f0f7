//! # Constants and type definitions for diffphot
//!
//! This module centralizes the **default thresholds** and **common type
//! definitions** used throughout the `diffphot` library. It also defines the
//! container aliases used to organize per-batch and per-star photometry.
//!
//! ## Overview
//!
//! - Canonical photometric band order and default quality thresholds
//! - Core type aliases used across the crate
//! - Hash-map containers keyed by band, star, or (batch, star)
//!
//! These definitions are used by all main modules, including batching, the
//! catalog join engine, and the transform solver.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

// -------------------------------------------------------------------------------------------------
// Default thresholds
// -------------------------------------------------------------------------------------------------

/// Canonical band ordering from blue to red (Johnson-Cousins UBVRI).
pub const DEFAULT_BAND_ORDER: [&str; 5] = ["U", "B", "V", "Rc", "Ic"];

/// Peak pixel fraction (of full well) above which a measurement is
/// considered saturated and rejected from the ensemble.
pub const DEFAULT_SATURATION_LIMIT: f64 = 0.9;

/// Signal-to-noise floor in decibels; measurements at or below it are
/// rejected from the ensemble.
pub const DEFAULT_SNR_FLOOR_DB: f64 = 10.0;

/// Sigma multiplier for check-star residual outlier rejection.
pub const DEFAULT_OUTLIER_SIGMA: f64 = 2.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Photometric filter label (e.g. "U", "B", "V", "Rc", "Ic")
pub type Band = String;
/// AAVSO unique identifier of a catalog star (e.g. "000-BBC-123")
pub type Auid = String;
/// Dense 1-based identifier of an emitted batch
pub type BatchId = u32;
/// Identifier of a calibrated session image
pub type ImageId = u32;
/// Pair of adjacent bands in canonical order, bluer first
pub type BandPair = (Band, Band);

// -------------------------------------------------------------------------------------------------
// Data containers
// -------------------------------------------------------------------------------------------------

/// A small, inline-optimized container for the image ids of one batch.
pub type BatchImages = SmallVec<[ImageId; 8]>;

/// Lookup table keyed by band.
pub type BandMap<V> = HashMap<Band, V, ahash::RandomState>;

/// Lookup table keyed by catalog star.
pub type StarMap<V> = HashMap<Auid, V, ahash::RandomState>;

/// Set of catalog stars.
pub type StarSet = HashSet<Auid, ahash::RandomState>;

/// Lookup table keyed by (batch, catalog star).
pub type BatchStarMap<V> = HashMap<(BatchId, Auid), V, ahash::RandomState>;

//! # Band ordering and pairing
//!
//! A session observes some subset of the canonical band order
//! (blue to red). Color transforms are fitted per *adjacent pair* of the
//! ordered bands that are actually present, never per observed order.

use itertools::Itertools;

use crate::constants::{Band, BandPair, DEFAULT_BAND_ORDER};

/// The canonical band order as owned labels.
pub fn default_band_order() -> Vec<Band> {
    DEFAULT_BAND_ORDER.iter().map(|b| b.to_string()).collect()
}

/// Restrict a canonical `order` to the bands actually `present`,
/// preserving the canonical relative order.
///
/// Bands present in the session but unknown to the order are dropped.
pub fn ordered_bands(order: &[Band], present: &[Band]) -> Vec<Band> {
    order
        .iter()
        .filter(|band| present.contains(band))
        .cloned()
        .collect()
}

/// Adjacent pairs of an ordered band list, bluer band first.
///
/// `[B, V, Rc]` yields `(B, V), (V, Rc)`. Fewer than two bands yield no
/// pairs.
pub fn band_pairs(bands: &[Band]) -> Vec<BandPair> {
    bands
        .iter()
        .cloned()
        .tuple_windows()
        .collect()
}

/// Compact label of a band pair, e.g. `"BV"` or `"VRc"`.
pub fn pair_label(pair: &BandPair) -> String {
    format!("{}{}", pair.0, pair.1)
}

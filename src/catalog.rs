//! # Star catalog and photometric measurements
//!
//! The catalog side of the reduction: [`Sequence`] holds the standard stars
//! of one field (the comparison sequence of a chart) with their per-band
//! standard magnitudes, and [`Measurement`] rows carry the per-image
//! instrumental photometry produced by the upstream measurement step.
//!
//! Star roles (target, comparison, check, ensemble member) are never stored
//! here; they are assigned per invocation from the session settings. The
//! same star can serve as ensemble member for fitting and as comparison for
//! another band pair.

use crate::constants::{Auid, Band, BandMap, BandPair, ImageId, StarMap};
use crate::magnitude::MagErr;

/// One standard star of the field catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    /// Catalog identifier of the star.
    pub auid: Auid,
    /// Standard magnitude per band the chart calibrates.
    pub magnitudes: BandMap<MagErr>,
}

impl SequenceEntry {
    pub fn new(auid: impl Into<Auid>) -> Self {
        Self {
            auid: auid.into(),
            magnitudes: BandMap::default(),
        }
    }

    /// Fluent constructor for one calibrated band.
    pub fn with_magnitude(mut self, band: impl Into<Band>, magnitude: MagErr) -> Self {
        self.magnitudes.insert(band.into(), magnitude);
        self
    }

    /// Standard magnitude in `band`, if the chart calibrates it.
    pub fn magnitude(&self, band: &str) -> Option<MagErr> {
        self.magnitudes.get(band).copied()
    }

    /// True when the star is calibrated in both bands of the pair.
    pub fn has_band_pair(&self, pair: &BandPair) -> bool {
        self.magnitudes.contains_key(&pair.0) && self.magnitudes.contains_key(&pair.1)
    }
}

/// The standard-star catalog of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    /// Program star name, as charted.
    pub target_name: String,
    /// Chart identifier the sequence was taken from.
    pub chart_id: String,
    /// Catalog identifier of the program star.
    pub target_auid: Auid,
    entries: StarMap<SequenceEntry>,
}

impl Sequence {
    pub fn new(
        target_name: impl Into<String>,
        chart_id: impl Into<String>,
        target_auid: impl Into<Auid>,
    ) -> Self {
        Self {
            target_name: target_name.into(),
            chart_id: chart_id.into(),
            target_auid: target_auid.into(),
            entries: StarMap::default(),
        }
    }

    /// Insert or replace a catalog star.
    pub fn insert(&mut self, entry: SequenceEntry) {
        self.entries.insert(entry.auid.clone(), entry);
    }

    pub fn entry(&self, auid: &str) -> Option<&SequenceEntry> {
        self.entries.get(auid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceEntry> {
        self.entries.values()
    }

    /// The catalog restricted to stars calibrated in both bands of `pair`,
    /// as (standard A, standard B) per star.
    pub fn band_pair_view(&self, pair: &BandPair) -> StarMap<(MagErr, MagErr)> {
        self.entries
            .values()
            .filter_map(|entry| {
                let a = entry.magnitude(&pair.0)?;
                let b = entry.magnitude(&pair.1)?;
                Some((entry.auid.clone(), (a, b)))
            })
            .collect()
    }
}

/// One star's instrumental photometry in one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Image the star was measured on.
    pub image_id: ImageId,
    /// Catalog identifier of the star (targets included).
    pub auid: Auid,
    /// Instrumental magnitude with uncertainty.
    pub magnitude: MagErr,
    /// Integrated flux in ADU.
    pub flux: f64,
    /// Signal-to-noise ratio in decibels.
    pub snr: f64,
    /// Peak pixel value as a fraction of full well.
    pub peak_ratio: f64,
}

impl Measurement {
    pub fn new(
        image_id: ImageId,
        auid: impl Into<Auid>,
        magnitude: MagErr,
        flux: f64,
        snr: f64,
        peak_ratio: f64,
    ) -> Self {
        Self {
            image_id,
            auid: auid.into(),
            magnitude,
            flux,
            snr,
            peak_ratio,
        }
    }
}

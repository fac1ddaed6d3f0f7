//! # Catalog join engine
//!
//! [`BatchDataProvider`] joins three tables (batch membership, per-image
//! instrumental measurements, and the standard-star [`Sequence`]) into the
//! per-band-pair views the transform solver and applier consume:
//!
//! - [`BatchDataProvider::batch_band`] – (batch, star) → instrumental
//!   measurement in one band,
//! - [`BatchDataProvider::batch_band_pair`] – inner join of two bands,
//! - [`BatchDataProvider::ensemble_batches`] – the pair join further joined
//!   with the catalog, quality-filtered, grouped by batch,
//! - [`BatchDataProvider::target_series`] – the program star's instrumental
//!   pair rows, unfiltered.
//!
//! All joins are inner joins: a star missing from either side of a pair is
//! absent from the result, never NaN-padded. Rows are ordered by
//! (batch id, AUID) so that downstream fits are reproducible run to run.
//!
//! ## Quality predicates
//!
//! [`QualityPredicate`]s gate the *ensemble* rows only (the fitting side).
//! The target is not a catalog star and its rows pass through unfiltered;
//! a batch where the target was not measured in both bands is simply absent
//! from the target series. Predicates combine by logical AND.
//!
//! ## Session fusion
//!
//! [`BatchDataProvider::combine`] merges two sessions of the same field
//! into one logical run: batch and image ids of the second provider are
//! offset past the first's maxima so every join key stays unique, and the
//! sequences merge (the first provider wins AUID conflicts). Merging
//! providers pointing at different targets is refused.

use tracing::trace;

use crate::catalog::{Measurement, Sequence};
use crate::constants::{Auid, Band, BandPair, BatchId, BatchStarMap, ImageId, StarSet};
use crate::diffphot_errors::DiffPhotError;
use crate::magnitude::MagErr;
use crate::session::{Batch, ImageRecord, SessionBatches};

use std::collections::HashMap;

/// One star's instrumental measurement in one batch-band slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSlot {
    pub magnitude: MagErr,
    /// Signal-to-noise ratio in decibels.
    pub snr: f64,
    /// Peak pixel value as a fraction of full well.
    pub peak_ratio: f64,
}

/// One row of the two-band inner join, before catalog matching.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSlot {
    pub batch_id: BatchId,
    pub auid: Auid,
    pub a: BandSlot,
    pub b: BandSlot,
}

/// One catalog star usable for fitting a batch's transform: standard and
/// instrumental magnitudes in both bands of the pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleStar {
    pub auid: Auid,
    pub standard_a: MagErr,
    pub standard_b: MagErr,
    pub instr_a: BandSlot,
    pub instr_b: BandSlot,
}

impl EnsembleStar {
    /// Standard color index `A − B`.
    pub fn standard_color(&self) -> MagErr {
        self.standard_a - self.standard_b
    }

    /// Instrumental color index `a − b`.
    pub fn instrumental_color(&self) -> MagErr {
        self.instr_a.magnitude - self.instr_b.magnitude
    }
}

/// The filtered ensemble of one batch, stars ordered by AUID.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleBatch {
    pub batch_id: BatchId,
    pub stars: Vec<EnsembleStar>,
}

impl EnsembleBatch {
    pub fn star(&self, auid: &str) -> Option<&EnsembleStar> {
        self.stars.iter().find(|s| s.auid == auid)
    }

    /// Look up a configured star, failing with the batch context attached.
    pub fn require_star(&self, auid: &str) -> Result<&EnsembleStar, DiffPhotError> {
        self.star(auid).ok_or_else(|| DiffPhotError::MissingStar {
            auid: auid.to_string(),
            batch_id: self.batch_id,
        })
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

/// The program star's instrumental magnitudes in one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRow {
    pub batch_id: BatchId,
    pub instr_a: MagErr,
    pub instr_b: MagErr,
}

/// A data-quality gate on ensemble rows. Predicates combine by AND.
pub trait QualityPredicate {
    fn name(&self) -> &'static str;
    fn accept(&self, star: &EnsembleStar) -> bool;
}

/// Rejects stars saturated in either band.
pub struct SaturationLimit {
    /// Peak pixel fraction of full well at or above which a star is rejected.
    pub threshold: f64,
}

impl QualityPredicate for SaturationLimit {
    fn name(&self) -> &'static str {
        "saturation"
    }

    fn accept(&self, star: &EnsembleStar) -> bool {
        star.instr_a.peak_ratio < self.threshold && star.instr_b.peak_ratio < self.threshold
    }
}

/// Rejects stars at or below an SNR floor in either band.
pub struct SnrFloor {
    /// Minimum signal-to-noise ratio in decibels, exclusive.
    pub min_db: f64,
}

impl QualityPredicate for SnrFloor {
    fn name(&self) -> &'static str {
        "signal-to-noise"
    }

    fn accept(&self, star: &EnsembleStar) -> bool {
        star.instr_a.snr > self.min_db && star.instr_b.snr > self.min_db
    }
}

/// Rejects stars with a non-finite magnitude or uncertainty in either band,
/// on the standard or the instrumental side.
pub struct FiniteMagnitudes;

impl QualityPredicate for FiniteMagnitudes {
    fn name(&self) -> &'static str {
        "finiteness"
    }

    fn accept(&self, star: &EnsembleStar) -> bool {
        star.standard_a.is_finite()
            && star.standard_b.is_finite()
            && star.instr_a.magnitude.is_finite()
            && star.instr_b.magnitude.is_finite()
    }
}

/// Rejects stars the session settings disable.
pub struct EnabledStars {
    pub disabled: StarSet,
}

impl QualityPredicate for EnabledStars {
    fn name(&self) -> &'static str {
        "enabled"
    }

    fn accept(&self, star: &EnsembleStar) -> bool {
        !self.disabled.contains(&star.auid)
    }
}

/// The standard predicate stack: saturation, SNR floor, finiteness, and the
/// disabled-star list.
pub fn standard_predicates(
    saturation_limit: f64,
    snr_floor_db: f64,
    disabled: StarSet,
) -> Vec<Box<dyn QualityPredicate>> {
    vec![
        Box::new(SaturationLimit {
            threshold: saturation_limit,
        }),
        Box::new(SnrFloor {
            min_db: snr_floor_db,
        }),
        Box::new(FiniteMagnitudes),
        Box::new(EnabledStars { disabled }),
    ]
}

/// Typed joins between one session's batches, measurements, and catalog.
pub struct BatchDataProvider {
    session: SessionBatches,
    image_band: HashMap<ImageId, Band, ahash::RandomState>,
    image_batch: HashMap<ImageId, BatchId, ahash::RandomState>,
    measurements: Vec<Measurement>,
    sequence: Sequence,
    predicates: Vec<Box<dyn QualityPredicate>>,
}

impl BatchDataProvider {
    /// Assemble a provider from the session tables.
    ///
    /// # Arguments
    ///
    /// * `images` – The session's image records (for the image → band map).
    /// * `session` – The batching result over those images.
    /// * `measurements` – Per-image instrumental photometry, targets included.
    /// * `sequence` – The standard-star catalog of the field.
    /// * `predicates` – Quality gates applied to ensemble rows.
    pub fn new(
        images: &[ImageRecord],
        session: SessionBatches,
        measurements: Vec<Measurement>,
        sequence: Sequence,
        predicates: Vec<Box<dyn QualityPredicate>>,
    ) -> Self {
        let image_band = images
            .iter()
            .map(|img| (img.image_id, img.band.clone()))
            .collect();
        let image_batch = session
            .batches
            .iter()
            .flat_map(|batch| batch.images.iter().map(|&id| (id, batch.batch_id)))
            .collect();

        Self {
            session,
            image_band,
            image_batch,
            measurements,
            sequence,
            predicates,
        }
    }

    pub fn target_name(&self) -> &str {
        &self.sequence.target_name
    }

    pub fn chart_id(&self) -> &str {
        &self.sequence.chart_id
    }

    pub fn target_auid(&self) -> &str {
        &self.sequence.target_auid
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn session(&self) -> &SessionBatches {
        &self.session
    }

    /// Batch metadata by id.
    pub fn batch(&self, batch_id: BatchId) -> Option<&Batch> {
        self.session.batch(batch_id)
    }

    /// (batch, star) → instrumental measurement of that star in `band`.
    ///
    /// Only measurements on images that belong to a batch participate;
    /// photometry from skipped images never reaches the joins.
    pub fn batch_band(&self, band: &str) -> BatchStarMap<BandSlot> {
        let mut out = BatchStarMap::default();
        for m in &self.measurements {
            let Some(image_band) = self.image_band.get(&m.image_id) else {
                continue;
            };
            if image_band != band {
                continue;
            }
            let Some(&batch_id) = self.image_batch.get(&m.image_id) else {
                continue;
            };
            out.insert(
                (batch_id, m.auid.clone()),
                BandSlot {
                    magnitude: m.magnitude,
                    snr: m.snr,
                    peak_ratio: m.peak_ratio,
                },
            );
        }
        out
    }

    /// Inner join of the two per-band maps on (batch, star), ordered by
    /// (batch id, AUID).
    pub fn batch_band_pair(&self, pair: &BandPair) -> Vec<PairSlot> {
        let map_a = self.batch_band(&pair.0);
        let mut map_b = self.batch_band(&pair.1);

        let mut rows: Vec<PairSlot> = map_a
            .into_iter()
            .filter_map(|((batch_id, auid), a)| {
                let b = map_b.remove(&(batch_id, auid.clone()))?;
                Some(PairSlot {
                    batch_id,
                    auid,
                    a,
                    b,
                })
            })
            .collect();
        rows.sort_by(|x, y| {
            x.batch_id
                .cmp(&y.batch_id)
                .then_with(|| x.auid.cmp(&y.auid))
        });
        rows
    }

    /// The fitting view: pair join × catalog, quality-filtered, grouped by
    /// batch in ascending order. The target never appears here, and batches
    /// where no star survives filtering are absent.
    pub fn ensemble_batches(&self, pair: &BandPair) -> Vec<EnsembleBatch> {
        let seq_view = self.sequence.band_pair_view(pair);

        let mut grouped: Vec<EnsembleBatch> = Vec::new();
        for row in self.batch_band_pair(pair) {
            if row.auid == self.sequence.target_auid {
                continue;
            }
            let Some(&(standard_a, standard_b)) = seq_view.get(&row.auid) else {
                continue;
            };
            let star = EnsembleStar {
                auid: row.auid,
                standard_a,
                standard_b,
                instr_a: row.a,
                instr_b: row.b,
            };
            if let Some(p) = self.predicates.iter().find(|p| !p.accept(&star)) {
                trace!(
                    "star {} rejected by {} in batch {}",
                    star.auid,
                    p.name(),
                    row.batch_id
                );
                continue;
            }
            match grouped.last_mut() {
                Some(batch) if batch.batch_id == row.batch_id => batch.stars.push(star),
                _ => grouped.push(EnsembleBatch {
                    batch_id: row.batch_id,
                    stars: vec![star],
                }),
            }
        }
        grouped
    }

    /// The program star's per-batch instrumental pair rows, ascending by
    /// batch id, quality predicates not applied.
    pub fn target_series(&self, pair: &BandPair) -> Vec<TargetRow> {
        self.batch_band_pair(pair)
            .into_iter()
            .filter(|row| row.auid == self.sequence.target_auid)
            .map(|row| TargetRow {
                batch_id: row.batch_id,
                instr_a: row.a.magnitude,
                instr_b: row.b.magnitude,
            })
            .collect()
    }

    /// Merge another session of the same field into this provider.
    ///
    /// Batch and image ids of `other` are offset past this provider's
    /// maxima; the sequences merge with this provider winning AUID
    /// conflicts; predicates stay this provider's.
    ///
    /// # Errors
    ///
    /// [`DiffPhotError::MismatchedSequences`] when the two providers do not
    /// designate the same target star.
    pub fn combine(mut self, other: BatchDataProvider) -> Result<Self, DiffPhotError> {
        if self.sequence.target_auid != other.sequence.target_auid {
            return Err(DiffPhotError::MismatchedSequences(format!(
                "target {} vs {}",
                self.sequence.target_auid, other.sequence.target_auid
            )));
        }

        let batch_offset = self
            .session
            .batches
            .iter()
            .map(|b| b.batch_id)
            .max()
            .unwrap_or(0);
        let image_offset = self.image_band.keys().copied().max().unwrap_or(0);

        for mut batch in other.session.batches {
            batch.batch_id += batch_offset;
            for id in batch.images.iter_mut() {
                *id += image_offset;
            }
            self.session.batches.push(batch);
        }
        self.session
            .skipped
            .extend(other.session.skipped.iter().map(|id| id + image_offset));

        for (id, band) in other.image_band {
            self.image_band.insert(id + image_offset, band);
        }
        for (id, batch_id) in other.image_batch {
            self.image_batch
                .insert(id + image_offset, batch_id + batch_offset);
        }
        for mut m in other.measurements {
            m.image_id += image_offset;
            self.measurements.push(m);
        }

        for entry in other.sequence.iter() {
            if self.sequence.entry(&entry.auid).is_none() {
                self.sequence.insert(entry.clone());
            }
        }

        Ok(self)
    }
}

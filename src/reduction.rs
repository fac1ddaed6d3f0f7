//! # Session reduction driver
//!
//! Orchestrates one observing session end to end. For every configured band
//! pair, [`reduce_band_pair`] fits a per-batch [`SimpleTransform`] over the
//! filtered ensemble and standardizes the program star through the
//! configured comparison star, deriving the check star along the way.
//! [`band_candidates`] splits each pair series into its two per-band
//! candidate series, and [`reduce_session`] picks the best chain per band
//! before rejecting batches whose check-star residual is an outlier.
//!
//! Batches that cannot support a fit never fail the run. The target or a
//! configured star unmeasured, fewer than three ensemble stars, or a
//! degenerate regression each skip the batch with a warning, and the
//! skipped ids are reported on the pair series.
//!
//! [`fit_transforms`] exposes the solver dispatch on its own for callers
//! that want coefficients without a target reduction, and
//! [`verify_transforms`] cross-predicts every ensemble star from every
//! other to audit transform quality over a session.

use std::collections::HashMap;

use hifitime::Epoch;
use tracing::{debug, warn};

use crate::bands::pair_label;
use crate::constants::{Auid, BandPair, BatchId};
use crate::diffphot_errors::DiffPhotError;
use crate::magnitude::MagErr;
use crate::params::ReductionParams;
use crate::provider::{BatchDataProvider, TargetRow};
use crate::selection::{reject_outliers, select_chains, BandSeries, CheckStar, DerivedMagnitude};
use crate::settings::{PairSettings, SessionSettings};
use crate::transform::{
    star_pair_rows, ClassicTransform, SimpleTransform, TransformMethod, TransformedPair,
};

/// Check-star derivation of one batch, kept next to its catalog values.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub auid: Auid,
    /// Cataloged standard magnitude in the pair's first band.
    pub standard_a: MagErr,
    /// Cataloged standard magnitude in the pair's second band.
    pub standard_b: MagErr,
    /// Magnitudes derived through the batch transform and comparison star.
    pub derived: TransformedPair,
}

/// The target standardized through one batch of one band pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub batch_id: BatchId,
    /// Batch mean time.
    pub time: Epoch,
    /// Batch mean airmass.
    pub airmass: f64,
    /// Transform fitted on this batch's ensemble.
    pub transform: SimpleTransform,
    /// Comparison star the derivation went through.
    pub comparison: Auid,
    /// Cataloged magnitude of the comparison star in the first band.
    pub comparison_a: MagErr,
    /// Cataloged magnitude of the comparison star in the second band.
    pub comparison_b: MagErr,
    /// Standardized target magnitudes, both chains.
    pub target: TransformedPair,
    /// Check-star derivation, when a check star is configured.
    pub check: Option<CheckResult>,
}

/// Per-batch reduction of one band pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPairSeries {
    pub band_pair: BandPair,
    /// One row per batch that supported a fit, in batch order.
    pub rows: Vec<BatchResult>,
    /// Batches that could not be reduced.
    pub skipped: Vec<BatchId>,
}

/// Solver output of [`fit_transforms`].
#[derive(Debug, Clone, PartialEq)]
pub enum FittedTransforms {
    /// One transform per batch that supported a fit.
    Simple(Vec<(BatchId, SimpleTransform)>),
    /// One session-wide transform with extinction terms.
    Classic(ClassicTransform),
}

/// One cross-prediction of [`verify_transforms`]: `star` standardized
/// through `comparison` with its batch's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRow {
    pub batch_id: BatchId,
    pub comparison: Auid,
    pub star: Auid,
    /// Cataloged magnitudes of the predicted star.
    pub standard_a: MagErr,
    pub standard_b: MagErr,
    /// Magnitudes predicted through the chain led by the first band.
    pub predicted_a: MagErr,
    pub predicted_b: MagErr,
}

impl VerificationRow {
    /// Predicted-minus-cataloged residual in the pair's first band.
    pub fn residual_a(&self) -> f64 {
        self.predicted_a.mag - self.standard_a.mag
    }

    /// Predicted-minus-cataloged residual in the pair's second band.
    pub fn residual_b(&self) -> f64 {
        self.predicted_b.mag - self.standard_b.mag
    }
}

/// A whole session reduced: the per-pair batch series and the per-band
/// selection the report consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReduction {
    /// One series per configured band pair, in settings order.
    pub pair_series: Vec<BandPairSeries>,
    /// One outlier-filtered series per band, in session band order.
    pub selected: Vec<BandSeries>,
}

/// Standardize the target through every fittable batch of one band pair.
///
/// Every batch of the pair's ensemble view gets an independent
/// [`SimpleTransform`] fit, applied to the target through `roles.comp` and,
/// when configured, to the check star through the same comparison. A batch
/// is skipped with a warning when the target was not measured in both
/// bands, when fewer than three ensemble stars survive filtering, when the
/// comparison or check star is absent from the ensemble, or when the fit
/// is degenerate.
///
/// # Arguments
///
/// * `provider` – Joined session data.
/// * `pair` – Band pair to reduce.
/// * `roles` – Comparison and check star assignment for the pair.
///
/// # Return
///
/// The per-batch results in batch order, plus the skipped batch ids.
///
/// # See also
///
/// * [`band_candidates`] – splits the result into per-band series.
/// * [`reduce_session`] – drives this over every configured pair.
pub fn reduce_band_pair(
    provider: &BatchDataProvider,
    pair: &BandPair,
    roles: &PairSettings,
) -> BandPairSeries {
    let label = pair_label(pair);
    let targets: HashMap<BatchId, TargetRow, ahash::RandomState> = provider
        .target_series(pair)
        .into_iter()
        .map(|row| (row.batch_id, row))
        .collect();

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for batch in provider.ensemble_batches(pair) {
        let Some(meta) = provider.batch(batch.batch_id) else {
            warn!("batch {} has no session record, skipped", batch.batch_id);
            skipped.push(batch.batch_id);
            continue;
        };
        let Some(target) = targets.get(&batch.batch_id) else {
            warn!(
                "target not measured in both {} bands of batch {}, skipped",
                label, batch.batch_id
            );
            skipped.push(batch.batch_id);
            continue;
        };
        if batch.len() <= 2 {
            warn!(
                "batch {} has only {} ensemble stars, skipped",
                batch.batch_id,
                batch.len()
            );
            skipped.push(batch.batch_id);
            continue;
        }
        let comp = match batch.require_star(&roles.comp) {
            Ok(star) => star,
            Err(err) => {
                warn!("{}, batch skipped", err);
                skipped.push(batch.batch_id);
                continue;
            }
        };
        let check = match &roles.check {
            Some(auid) => match batch.require_star(auid) {
                Ok(star) => Some(star),
                Err(err) => {
                    warn!("{}, batch skipped", err);
                    skipped.push(batch.batch_id);
                    continue;
                }
            },
            None => None,
        };
        let transform = match SimpleTransform::fit(pair, &batch.stars) {
            Ok(transform) => transform,
            Err(err) => {
                warn!("batch {}: {}, skipped", batch.batch_id, err);
                skipped.push(batch.batch_id);
                continue;
            }
        };

        let target_mags = transform.apply((target.instr_a, target.instr_b), comp);
        let check_result = check.map(|star| CheckResult {
            auid: star.auid.clone(),
            standard_a: star.standard_a,
            standard_b: star.standard_b,
            derived: transform.apply((star.instr_a.magnitude, star.instr_b.magnitude), comp),
        });

        rows.push(BatchResult {
            batch_id: batch.batch_id,
            time: meta.time,
            airmass: meta.airmass,
            transform,
            comparison: comp.auid.clone(),
            comparison_a: comp.standard_a,
            comparison_b: comp.standard_b,
            target: target_mags,
            check: check_result,
        });
    }

    BandPairSeries {
        band_pair: pair.clone(),
        rows,
        skipped,
    }
}

fn chain_candidate(series: &BandPairSeries, lead_a: bool) -> BandSeries {
    let band = if lead_a {
        series.band_pair.0.clone()
    } else {
        series.band_pair.1.clone()
    };
    let rows = series
        .rows
        .iter()
        .map(|row| DerivedMagnitude {
            batch_id: row.batch_id,
            band: band.clone(),
            time: row.time,
            airmass: row.airmass,
            magnitude: if lead_a {
                row.target.a_first
            } else {
                row.target.b_first
            },
            chain: series.band_pair.clone(),
            comparison: row.comparison.clone(),
            comparison_magnitude: if lead_a {
                row.comparison_a
            } else {
                row.comparison_b
            },
            check: row.check.as_ref().map(|check| CheckStar {
                auid: check.auid.clone(),
                catalog: if lead_a {
                    check.standard_a
                } else {
                    check.standard_b
                },
                derived: if lead_a {
                    check.derived.a_first
                } else {
                    check.derived.b_first
                },
            }),
        })
        .collect();

    BandSeries {
        band,
        chain: series.band_pair.clone(),
        rows,
    }
}

/// Split a pair series into its two per-band candidate series.
///
/// The first element carries the pair's first band through the chain that
/// band leads, the second element the second band likewise. Check-star
/// columns follow the same chain as the target.
pub fn band_candidates(series: &BandPairSeries) -> [BandSeries; 2] {
    [chain_candidate(series, true), chain_candidate(series, false)]
}

/// Fit transform coefficients for one band pair without reducing a target.
///
/// The simple method yields one transform per fittable batch; the classic
/// methods pool every batch's star pairs into a single fit with first-order
/// extinction terms.
///
/// # Errors
///
/// [`DiffPhotError::DegenerateFit`] when a classic fit has too few rows or
/// no airmass spread. Simple fits that fail are logged and skipped batch by
/// batch instead.
pub fn fit_transforms(
    provider: &BatchDataProvider,
    pair: &BandPair,
    method: TransformMethod,
) -> Result<FittedTransforms, DiffPhotError> {
    match method {
        TransformMethod::Simple => {
            let mut fits = Vec::new();
            for batch in provider.ensemble_batches(pair) {
                match SimpleTransform::fit(pair, &batch.stars) {
                    Ok(transform) => fits.push((batch.batch_id, transform)),
                    Err(err) => warn!("batch {}: {}, not fitted", batch.batch_id, err),
                }
            }
            Ok(FittedTransforms::Simple(fits))
        }
        TransformMethod::Classic => {
            let rows = star_pair_rows(provider, pair);
            ClassicTransform::fit(pair, &rows).map(FittedTransforms::Classic)
        }
        TransformMethod::ClassicWeighted => {
            let rows = star_pair_rows(provider, pair);
            ClassicTransform::fit_weighted(pair, &rows).map(FittedTransforms::Classic)
        }
    }
}

/// Reduce a whole session: every configured band pair, chain selection,
/// and check-star outlier rejection.
///
/// # Arguments
///
/// * `provider` – Joined session data.
/// * `settings` – Session bands and per-pair star roles.
/// * `params` – Reduction parameters.
///
/// # Errors
///
/// * [`DiffPhotError::InvalidParameter`] when `params` selects a classic
///   method, which fits coefficients but cannot standardize a target.
/// * [`DiffPhotError::MissingBandPair`] when a session band pair has no
///   star-role entry in `settings`.
///
/// # See also
///
/// * [`crate::report::AavsoReport`] – formats the selected series.
pub fn reduce_session(
    provider: &BatchDataProvider,
    settings: &SessionSettings,
    params: &ReductionParams,
) -> Result<SessionReduction, DiffPhotError> {
    if params.transform_method != TransformMethod::Simple {
        return Err(DiffPhotError::InvalidParameter(format!(
            "the {} solver fits coefficients only; session reduction requires the simple transform",
            params.transform_method
        )));
    }

    let mut pair_series = Vec::new();
    let mut candidates = Vec::new();
    for pair in settings.band_pairs() {
        let roles = settings.pair(&pair)?;
        let series = reduce_band_pair(provider, &pair, roles);
        debug!(
            "pair {}: {} batches reduced, {} skipped",
            pair_label(&pair),
            series.rows.len(),
            series.skipped.len()
        );
        candidates.extend(band_candidates(&series));
        pair_series.push(series);
    }

    let selected = select_chains(&settings.bands, candidates)
        .into_iter()
        .map(|series| {
            let before = series.rows.len();
            let filtered = reject_outliers(series, params.outlier_sigma);
            let dropped = before - filtered.rows.len();
            if dropped > 0 {
                warn!(
                    "{} of {} {} batches rejected on check residuals",
                    dropped, before, filtered.band
                );
            }
            filtered
        })
        .collect();

    Ok(SessionReduction {
        pair_series,
        selected,
    })
}

/// Cross-predict every ensemble star from every other star of its batch.
///
/// Each batch gets a transform fitted on its full ensemble; then every star
/// in turn plays comparison for every other, and the chain led by the
/// pair's first band predicts both standard magnitudes. Residuals against
/// the catalog expose bad batches, bad stars, and bad fits.
pub fn verify_transforms(provider: &BatchDataProvider, pair: &BandPair) -> Vec<VerificationRow> {
    let mut rows = Vec::new();
    for batch in provider.ensemble_batches(pair) {
        let transform = match SimpleTransform::fit(pair, &batch.stars) {
            Ok(transform) => transform,
            Err(err) => {
                warn!("batch {}: {}, skipped", batch.batch_id, err);
                continue;
            }
        };
        for comp in &batch.stars {
            for star in &batch.stars {
                if star.auid == comp.auid {
                    continue;
                }
                let derived =
                    transform.apply((star.instr_a.magnitude, star.instr_b.magnitude), comp);
                rows.push(VerificationRow {
                    batch_id: batch.batch_id,
                    comparison: comp.auid.clone(),
                    star: star.auid.clone(),
                    standard_a: star.standard_a,
                    standard_b: star.standard_b,
                    predicted_a: derived.a_first,
                    predicted_b: derived.b_second,
                });
            }
        }
    }
    rows
}

#[cfg(test)]
mod reduction_test {
    use super::*;

    use crate::catalog::{Measurement, Sequence, SequenceEntry};
    use crate::constants::{
        ImageId, StarSet, DEFAULT_SATURATION_LIMIT, DEFAULT_SNR_FLOOR_DB,
    };
    use crate::provider::standard_predicates;
    use crate::session::{batch_images, ImageRecord};

    use hifitime::Duration;

    const TARGET: &str = "000-TGT-001";
    const COMP: &str = "000-BBC-001";
    const CHECK: &str = "000-BBC-002";
    const STAR_3: &str = "000-BBC-003";
    const STAR_4: &str = "000-BBC-004";

    fn bv() -> BandPair {
        ("B".to_string(), "V".to_string())
    }

    fn image(id: ImageId, band: &str, minutes: f64, airmass: f64) -> ImageRecord {
        ImageRecord::new(
            id,
            band,
            Epoch::from_gregorian_utc_at_midnight(2023, 7, 4)
                + Duration::from_seconds(60.0 * minutes),
            Duration::from_seconds(30.0),
            airmass,
            -10.0,
            format!("frame-{id:04}.fits"),
        )
    }

    fn measurement(image_id: ImageId, auid: &str, mag: f64) -> Measurement {
        Measurement::new(image_id, auid, MagErr::new(mag, 0.02), 1.0e5, 30.0, 0.5)
    }

    fn sequence(with_extra: bool) -> Sequence {
        let mut seq = Sequence::new("RR Lyr", "X28382AB", TARGET);
        seq.insert(
            SequenceEntry::new(COMP)
                .with_magnitude("B", MagErr::new(10.1, 0.02))
                .with_magnitude("V", MagErr::new(9.7, 0.02)),
        );
        seq.insert(
            SequenceEntry::new(CHECK)
                .with_magnitude("B", MagErr::new(10.8, 0.02))
                .with_magnitude("V", MagErr::new(10.2, 0.02)),
        );
        seq.insert(
            SequenceEntry::new(STAR_3)
                .with_magnitude("B", MagErr::new(11.5, 0.02))
                .with_magnitude("V", MagErr::new(10.6, 0.02)),
        );
        if with_extra {
            seq.insert(
                SequenceEntry::new(STAR_4)
                    .with_magnitude("B", MagErr::new(11.9, 0.02))
                    .with_magnitude("V", MagErr::new(11.15, 0.02)),
            );
        }
        seq
    }

    /// Instrumental magnitudes follow `b = B - (2.0 + 1.1 C) + eps_b` and
    /// `v = b - C / 0.9 + eps_c`, so per-batch fits land near Ta = 1.107,
    /// Tb = 1.213, Tab = 0.904. The target sits at B = 9.35, V = 8.95 with
    /// the same color as the comparison star.
    fn instrumentals(with_extra: bool) -> Vec<(&'static str, f64, f64)> {
        let mut rows = vec![
            (COMP, 7.670, 7.219556),
            (CHECK, 8.128, 7.470333),
            (STAR_3, 8.514, 7.512),
            (TARGET, 6.91, 6.465556),
        ];
        if with_extra {
            rows.push((STAR_4, 9.075, 8.241667));
        }
        rows
    }

    /// Four B,V batches of the same field, airmass rising batch to batch.
    /// Instrumental magnitudes repeat across batches; `drop` removes
    /// (image, star) measurements to starve individual batches.
    fn fixture(with_extra: bool, drop: &[(ImageId, &str)]) -> BatchDataProvider {
        let mut images = Vec::new();
        for k in 0..4u32 {
            let airmass = 1.1 + 0.15 * f64::from(k);
            images.push(image(2 * k + 1, "B", 10.0 * f64::from(k), airmass));
            images.push(image(2 * k + 2, "V", 10.0 * f64::from(k) + 1.0, airmass));
        }
        let session = batch_images(&images);
        assert_eq!(session.len(), 4);

        let stars = instrumentals(with_extra);
        let mut measurements = Vec::new();
        for k in 0..4u32 {
            let (b_image, v_image) = (2 * k + 1, 2 * k + 2);
            for &(auid, b_mag, v_mag) in &stars {
                if !drop.contains(&(b_image, auid)) {
                    measurements.push(measurement(b_image, auid, b_mag));
                }
                if !drop.contains(&(v_image, auid)) {
                    measurements.push(measurement(v_image, auid, v_mag));
                }
            }
        }

        BatchDataProvider::new(
            &images,
            session,
            measurements,
            sequence(with_extra),
            standard_predicates(
                DEFAULT_SATURATION_LIMIT,
                DEFAULT_SNR_FLOOR_DB,
                StarSet::default(),
            ),
        )
    }

    fn roles() -> PairSettings {
        PairSettings {
            comp: COMP.to_string(),
            check: Some(CHECK.to_string()),
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings::from_json_str(
            r#"{
                "bands": ["B", "V"],
                "diff_photometry": {
                    "BV": {"comp": "000-BBC-001", "check": "000-BBC-002"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_reduce_band_pair_covers_every_batch() {
        let provider = fixture(false, &[]);
        let series = reduce_band_pair(&provider, &bv(), &roles());

        assert_eq!(series.band_pair, bv());
        assert!(series.skipped.is_empty());
        assert_eq!(series.rows.len(), 4);
        for (i, row) in series.rows.iter().enumerate() {
            assert_eq!(row.batch_id, i as BatchId + 1);
            assert_eq!(row.comparison, COMP);
            assert_eq!(row.comparison_a, MagErr::new(10.1, 0.02));
            assert_eq!(row.comparison_b, MagErr::new(9.7, 0.02));
            approx::assert_relative_eq!(
                row.airmass,
                1.1 + 0.15 * i as f64,
                max_relative = 1.0e-12
            );
            let check = row.check.as_ref().unwrap();
            assert_eq!(check.auid, CHECK);
            assert_eq!(check.standard_a, MagErr::new(10.8, 0.02));
            assert_eq!(check.standard_b, MagErr::new(10.2, 0.02));
        }
    }

    #[test]
    fn test_derived_target_tracks_catalog() {
        let provider = fixture(false, &[]);
        let series = reduce_band_pair(&provider, &bv(), &roles());

        for row in &series.rows {
            assert!((row.target.a_first.mag - 9.35).abs() < 0.05);
            assert!((row.target.b_first.mag - 8.95).abs() < 0.05);
        }
        // hand-propagated through the fitted coefficients
        approx::assert_abs_diff_eq!(series.rows[0].target.a_first.mag, 9.3340, epsilon = 1.0e-3);
        approx::assert_abs_diff_eq!(series.rows[0].target.b_first.mag, 8.9526, epsilon = 1.0e-3);
    }

    #[test]
    fn test_batch_transforms_recover_model_coefficients() {
        let provider = fixture(false, &[]);
        let fitted = fit_transforms(&provider, &bv(), TransformMethod::Simple).unwrap();

        let FittedTransforms::Simple(fits) = fitted else {
            panic!("expected per-batch transforms");
        };
        assert_eq!(fits.len(), 4);
        for (_, transform) in &fits {
            approx::assert_relative_eq!(transform.ta.value, 1.10684, max_relative = 1.0e-4);
            approx::assert_relative_eq!(transform.tb.value, 1.21348, max_relative = 1.0e-4);
            approx::assert_relative_eq!(transform.tab.value, 0.90364, max_relative = 1.0e-4);
        }
    }

    #[test]
    fn test_classic_fit_pools_batches() {
        let provider = fixture(false, &[]);
        let fitted = fit_transforms(&provider, &bv(), TransformMethod::Classic).unwrap();

        let FittedTransforms::Classic(transform) = fitted else {
            panic!("expected a pooled transform");
        };
        // the fixture's instrumental model carries no extinction term
        approx::assert_relative_eq!(transform.ta.value, 1.10684, max_relative = 1.0e-3);
        approx::assert_relative_eq!(transform.tb.value, 1.21348, max_relative = 1.0e-3);
        assert!(transform.ka.value.abs() < 1.0e-6);
        assert!(transform.kb.value.abs() < 1.0e-6);
    }

    #[test]
    fn test_unmeasured_target_skips_batch() {
        let provider = fixture(false, &[(1, TARGET)]);
        let series = reduce_band_pair(&provider, &bv(), &roles());

        assert_eq!(series.rows.len(), 3);
        assert_eq!(series.skipped, vec![1]);
    }

    #[test]
    fn test_small_ensemble_skips_batch() {
        // batch 2 keeps only the comparison and check stars
        let provider = fixture(false, &[(3, STAR_3), (4, STAR_3)]);
        let series = reduce_band_pair(&provider, &bv(), &roles());

        assert_eq!(series.rows.len(), 3);
        assert_eq!(series.skipped, vec![2]);
    }

    #[test]
    fn test_missing_comparison_star_skips_batch() {
        // batch 3 still has three other ensemble stars
        let provider = fixture(true, &[(5, COMP), (6, COMP)]);
        let series = reduce_band_pair(&provider, &bv(), &roles());

        assert_eq!(series.rows.len(), 3);
        assert_eq!(series.skipped, vec![3]);
    }

    #[test]
    fn test_missing_check_star_skips_batch() {
        let provider = fixture(true, &[(7, CHECK), (8, CHECK)]);
        let series = reduce_band_pair(&provider, &bv(), &roles());

        assert_eq!(series.rows.len(), 3);
        assert_eq!(series.skipped, vec![4]);
    }

    #[test]
    fn test_degenerate_fit_skips_batch() {
        // every ensemble star has the same catalog color, so the color
        // regression cannot be fitted
        let images = vec![image(1, "B", 0.0, 1.2), image(2, "V", 1.0, 1.2)];
        let session = batch_images(&images);
        let mut seq = Sequence::new("RR Lyr", "X28382AB", TARGET);
        for (auid, b_mag) in [(COMP, 10.1), (CHECK, 10.8), (STAR_3, 11.5)] {
            seq.insert(
                SequenceEntry::new(auid)
                    .with_magnitude("B", MagErr::new(b_mag, 0.02))
                    .with_magnitude("V", MagErr::new(b_mag - 0.5, 0.02)),
            );
        }
        let mut measurements = Vec::new();
        for (auid, b_mag, v_mag) in [
            (COMP, 7.66, 7.21),
            (CHECK, 8.14, 7.65),
            (STAR_3, 8.51, 8.02),
            (TARGET, 6.91, 6.47),
        ] {
            measurements.push(measurement(1, auid, b_mag));
            measurements.push(measurement(2, auid, v_mag));
        }
        let provider = BatchDataProvider::new(
            &images,
            session,
            measurements,
            seq,
            standard_predicates(
                DEFAULT_SATURATION_LIMIT,
                DEFAULT_SNR_FLOOR_DB,
                StarSet::default(),
            ),
        );

        let series = reduce_band_pair(&provider, &bv(), &roles());
        assert!(series.rows.is_empty());
        assert_eq!(series.skipped, vec![1]);
    }

    #[test]
    fn test_band_candidates_split_the_chains() {
        let provider = fixture(false, &[]);
        let series = reduce_band_pair(&provider, &bv(), &roles());
        let [first, second] = band_candidates(&series);

        assert_eq!(first.band, "B");
        assert_eq!(second.band, "V");
        assert_eq!(first.chain, bv());
        assert_eq!(second.chain, bv());
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 4);

        let row = &series.rows[0];
        assert_eq!(first.rows[0].magnitude, row.target.a_first);
        assert_eq!(second.rows[0].magnitude, row.target.b_first);
        assert_eq!(first.rows[0].comparison_magnitude, row.comparison_a);
        assert_eq!(second.rows[0].comparison_magnitude, row.comparison_b);

        let check = first.rows[0].check.as_ref().unwrap();
        assert_eq!(check.auid, CHECK);
        assert_eq!(check.catalog, MagErr::new(10.8, 0.02));
        let check = second.rows[0].check.as_ref().unwrap();
        assert_eq!(check.catalog, MagErr::new(10.2, 0.02));
    }

    #[test]
    fn test_reduce_session_selects_one_series_per_band() {
        let provider = fixture(false, &[]);
        let reduction = reduce_session(&provider, &settings(), &ReductionParams::new()).unwrap();

        assert_eq!(reduction.pair_series.len(), 1);
        assert!(reduction.pair_series[0].skipped.is_empty());
        assert_eq!(reduction.selected.len(), 2);

        let b = &reduction.selected[0];
        assert_eq!(b.band, "B");
        assert_eq!(b.len(), 4);
        for row in &b.rows {
            assert!((row.magnitude.mag - 9.35).abs() < 0.05);
        }

        let v = &reduction.selected[1];
        assert_eq!(v.band, "V");
        assert_eq!(v.len(), 4);
        for row in &v.rows {
            assert!((row.magnitude.mag - 8.95).abs() < 0.05);
        }
    }

    #[test]
    fn test_reduce_session_refuses_classic_method() {
        let provider = fixture(false, &[]);
        let params = ReductionParams::builder()
            .transform_method(TransformMethod::Classic)
            .build()
            .unwrap();

        let err = reduce_session(&provider, &settings(), &params).unwrap_err();
        assert!(matches!(err, DiffPhotError::InvalidParameter(_)));
    }

    #[test]
    fn test_reduce_session_requires_pair_roles() {
        let provider = fixture(false, &[]);
        let settings = SessionSettings::from_json_str(r#"{"bands": ["B", "V"]}"#).unwrap();

        let err = reduce_session(&provider, &settings, &ReductionParams::new()).unwrap_err();
        assert!(matches!(err, DiffPhotError::MissingBandPair(_)));
    }

    #[test]
    fn test_verify_transforms_cross_predicts_the_ensemble() {
        let provider = fixture(false, &[]);
        let rows = verify_transforms(&provider, &bv());

        // 4 batches x 3 comparison choices x 2 predicted stars
        assert_eq!(rows.len(), 24);
        for row in &rows {
            assert_ne!(row.comparison, row.star);
            assert!(
                row.residual_a().abs() < 0.1,
                "B residual {}",
                row.residual_a()
            );
            assert!(
                row.residual_b().abs() < 0.1,
                "V residual {}",
                row.residual_b()
            );
        }
    }
}

//! # Chain selection and outlier rejection
//!
//! Every band except the endpoints of the band order belongs to two adjacent
//! band pairs, so two independent derivations of its standardized series
//! exist after application. This module picks one series per band and prunes
//! batches whose check-star residual disagrees with the rest of the night.
//!
//! ## Selection policy
//!
//! Candidates compete on their aggregate uncertainty
//!
//! ```text
//! total_error = sqrt(Σ err_i² / n)
//! ```
//!
//! and the smallest wins. On an exact tie the candidate built from the
//! earlier band pair wins, which keeps selection deterministic for
//! reproducible runs. A candidate without rows has no defined aggregate
//! error and loses to any candidate with one.
//!
//! ## Outlier rejection
//!
//! Two passes over the chosen series: the first computes the mean and the
//! population standard deviation of the check-star residuals, the second
//! drops every batch whose residual deviates from the mean by `sigma`
//! standard deviations or more. Not iterative sigma-clipping; one round
//! only. Series without a check star, with fewer than three rows, or with
//! zero residual spread pass through unchanged.

use hifitime::Epoch;
use ordered_float::OrderedFloat;

use crate::constants::{Auid, Band, BandMap, BandPair, BatchId};
use crate::magnitude::MagErr;

/// Check-star validation attached to one derived row.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckStar {
    /// Check star identifier.
    pub auid: Auid,
    /// Cataloged standard magnitude in the row's band.
    pub catalog: MagErr,
    /// Magnitude derived through the same transform and comparison star.
    pub derived: MagErr,
}

impl CheckStar {
    /// Derived-minus-cataloged residual, the outlier rejection statistic.
    pub fn residual(&self) -> f64 {
        self.derived.mag - self.catalog.mag
    }
}

/// Final standardized magnitude of the target in one batch and one band.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMagnitude {
    /// Batch the row was derived from.
    pub batch_id: BatchId,
    /// Band of the magnitude.
    pub band: Band,
    /// Batch mean time.
    pub time: Epoch,
    /// Batch mean airmass.
    pub airmass: f64,
    /// Standardized magnitude with propagated uncertainty.
    pub magnitude: MagErr,
    /// Band pair whose chain produced this value.
    pub chain: BandPair,
    /// Comparison star the chain went through.
    pub comparison: Auid,
    /// Cataloged magnitude of the comparison star in this band.
    pub comparison_magnitude: MagErr,
    /// Check-star validation, when a check star is configured.
    pub check: Option<CheckStar>,
}

/// One candidate series of a band, produced by a single band-pair chain.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSeries {
    /// Band the series standardizes.
    pub band: Band,
    /// Band pair the rows were derived through.
    pub chain: BandPair,
    /// Per-batch rows, in batch order.
    pub rows: Vec<DerivedMagnitude>,
}

impl BandSeries {
    /// Aggregate uncertainty of the series, `sqrt(Σ err² / n)`.
    ///
    /// NaN for an empty series; [`select_chains`] orders NaN last, so empty
    /// candidates never win against populated ones.
    pub fn total_error(&self) -> f64 {
        let n = self.rows.len() as f64;
        (self
            .rows
            .iter()
            .map(|r| r.magnitude.err.powi(2))
            .sum::<f64>()
            / n)
            .sqrt()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pick one series per band, smallest [`BandSeries::total_error`] first.
///
/// # Arguments
///
/// * `bands` – Bands to select for, in canonical order; the output follows
///   this order.
/// * `candidates` – Candidate series from every band-pair chain, in band
///   pair order. Earlier candidates win exact ties.
///
/// # Return
///
/// One series per band that has at least one candidate. Bands with no
/// candidate at all are absent from the output.
pub fn select_chains(bands: &[Band], candidates: Vec<BandSeries>) -> Vec<BandSeries> {
    let mut by_band: BandMap<Vec<BandSeries>> = BandMap::default();
    for candidate in candidates {
        by_band
            .entry(candidate.band.clone())
            .or_default()
            .push(candidate);
    }

    bands
        .iter()
        .filter_map(|band| {
            by_band.remove(band).and_then(|group| {
                group
                    .into_iter()
                    .min_by_key(|series| OrderedFloat(series.total_error()))
            })
        })
        .collect()
}

/// Drop batches whose check-star residual sits `sigma` or more population
/// standard deviations from the series mean.
///
/// Leaves the series untouched when any row lacks a check star, when fewer
/// than three rows exist, or when all residuals are identical.
pub fn reject_outliers(series: BandSeries, sigma: f64) -> BandSeries {
    let residuals: Option<Vec<f64>> = series
        .rows
        .iter()
        .map(|row| row.check.as_ref().map(CheckStar::residual))
        .collect();
    let Some(residuals) = residuals else {
        return series;
    };
    if residuals.len() < 3 {
        return series;
    }

    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let std = (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 {
        return series;
    }

    let rows = series
        .rows
        .into_iter()
        .zip(residuals)
        .filter(|(_, residual)| (residual - mean).abs() < sigma * std)
        .map(|(row, _)| row)
        .collect();

    BandSeries { rows, ..series }
}

#[cfg(test)]
mod selection_test {
    use super::*;

    use approx::assert_relative_eq;
    use hifitime::Duration;

    fn row(batch_id: BatchId, band: &str, err: f64, residual: Option<f64>) -> DerivedMagnitude {
        DerivedMagnitude {
            batch_id,
            band: band.to_string(),
            time: Epoch::from_gregorian_utc_at_midnight(2023, 7, 4)
                + Duration::from_seconds(60.0 * batch_id as f64),
            airmass: 1.2,
            magnitude: MagErr::new(11.3, err),
            chain: ("B".to_string(), "V".to_string()),
            comparison: "000-BBC-001".to_string(),
            comparison_magnitude: MagErr::new(10.1, 0.03),
            check: residual.map(|r| CheckStar {
                auid: "000-BBC-002".to_string(),
                catalog: MagErr::new(10.8, 0.02),
                derived: MagErr::new(10.8 + r, 0.05),
            }),
        }
    }

    fn series(band: &str, chain: (&str, &str), errs: &[f64]) -> BandSeries {
        BandSeries {
            band: band.to_string(),
            chain: (chain.0.to_string(), chain.1.to_string()),
            rows: errs
                .iter()
                .enumerate()
                .map(|(i, e)| row(i as BatchId + 1, band, *e, None))
                .collect(),
        }
    }

    #[test]
    fn test_total_error_hand_value() {
        let s = series("V", ("B", "V"), &[0.03, 0.04]);
        assert_relative_eq!(s.total_error(), 0.00125f64.sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn test_select_prefers_smaller_aggregate_error() {
        let from_bv = series("V", ("B", "V"), &[0.05, 0.05]);
        let from_vr = series("V", ("V", "Rc"), &[0.02, 0.02]);

        let chosen = select_chains(&["V".to_string()], vec![from_bv, from_vr]);

        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].chain, ("V".to_string(), "Rc".to_string()));
    }

    #[test]
    fn test_select_breaks_ties_toward_earlier_pair() {
        let from_bv = series("V", ("B", "V"), &[0.03, 0.03]);
        let from_vr = series("V", ("V", "Rc"), &[0.03, 0.03]);

        let chosen = select_chains(&["V".to_string()], vec![from_bv, from_vr]);

        assert_eq!(chosen[0].chain, ("B".to_string(), "V".to_string()));
    }

    #[test]
    fn test_select_skips_empty_candidate() {
        let empty = series("V", ("B", "V"), &[]);
        let populated = series("V", ("V", "Rc"), &[0.2, 0.2]);

        let chosen = select_chains(&["V".to_string()], vec![empty, populated]);

        assert_eq!(chosen[0].chain, ("V".to_string(), "Rc".to_string()));
    }

    #[test]
    fn test_select_orders_output_by_band_list() {
        let b = series("B", ("B", "V"), &[0.03]);
        let v = series("V", ("B", "V"), &[0.03]);

        let chosen = select_chains(&["B".to_string(), "V".to_string()], vec![v, b]);

        assert_eq!(chosen[0].band, "B");
        assert_eq!(chosen[1].band, "V");
    }

    #[test]
    fn test_reject_outliers_drops_only_the_deviant_batch() {
        let residuals = [0.0, 0.01, -0.01, 0.02, -0.02, 1.0];
        let rows = residuals
            .iter()
            .enumerate()
            .map(|(i, r)| row(i as BatchId + 1, "V", 0.03, Some(*r)))
            .collect();
        let s = BandSeries {
            band: "V".to_string(),
            chain: ("B".to_string(), "V".to_string()),
            rows,
        };

        let filtered = reject_outliers(s, 2.0);

        assert_eq!(filtered.len(), 5);
        assert!(filtered.rows.iter().all(|r| r.batch_id != 6));
    }

    #[test]
    fn test_reject_outliers_keeps_series_without_check() {
        let s = series("V", ("B", "V"), &[0.03, 0.03, 0.03, 0.03]);

        let filtered = reject_outliers(s.clone(), 2.0);

        assert_eq!(filtered, s);
    }

    #[test]
    fn test_reject_outliers_keeps_short_series() {
        let rows = vec![row(1, "V", 0.03, Some(0.0)), row(2, "V", 0.03, Some(0.5))];
        let s = BandSeries {
            band: "V".to_string(),
            chain: ("B".to_string(), "V".to_string()),
            rows,
        };

        let filtered = reject_outliers(s.clone(), 2.0);

        assert_eq!(filtered, s);
    }

    #[test]
    fn test_reject_outliers_keeps_zero_spread_series() {
        let rows = (1..=4).map(|i| row(i, "V", 0.03, Some(0.1))).collect();
        let s = BandSeries {
            band: "V".to_string(),
            chain: ("B".to_string(), "V".to_string()),
            rows,
        };

        let filtered = reject_outliers(s.clone(), 2.0);

        assert_eq!(filtered.len(), 4);
    }
}

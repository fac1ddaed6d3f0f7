//! # Classic session-wide transform
//!
//! The classic solver estimates a color coefficient and a first-order
//! extinction coefficient per band from the whole session at once, instead
//! of one transform per batch. It works on star-pair differences, which
//! cancel the nightly zero point:
//!
//! ```text
//! (M1 − M2) − (m1 − m2) = T·(C1 − C2) − k·X·(C1 − C2)
//! ```
//!
//! for every unordered pair of ensemble stars `(1, 2)` in every batch, with
//! `X` the batch airmass. Stacking one row per pair gives the two-parameter
//! system
//!
//! ```text
//! [ΔC, −X·ΔC] · [T, k]ᵀ = ΔM − Δm
//! ```
//!
//! solved per band by [`crate::regression::least_squares_two_param`]. The
//! weighted variant scales each row by the reciprocal of its combined
//! uncertainty (standard difference, instrumental difference and the
//! extinction term, in quadrature) before solving.
//!
//! This solver only fits coefficients. Unlike
//! [`crate::transform::SimpleTransform`] it has no application chain here;
//! its output characterizes the instrument and feeds external reductions.

use itertools::Itertools;

use crate::constants::{BandPair, BatchId};
use crate::diffphot_errors::DiffPhotError;
use crate::magnitude::{MagErr, ValErr};
use crate::provider::BatchDataProvider;
use crate::regression::least_squares_two_param;

/// Differences of one unordered ensemble-star pair inside one batch.
///
/// Every field is a star-1 minus star-2 difference except the shared batch
/// airmass. Built by [`star_pair_rows`].
#[derive(Debug, Clone, PartialEq)]
pub struct StarPairRow {
    /// Batch the pair was measured in.
    pub batch_id: BatchId,
    /// Batch airmass with its in-batch range as the error term.
    pub airmass: ValErr,
    /// Standard color difference `C1 − C2`.
    pub d_color: MagErr,
    /// Standard magnitude difference in the first band.
    pub d_standard_a: MagErr,
    /// Standard magnitude difference in the second band.
    pub d_standard_b: MagErr,
    /// Instrumental magnitude difference in the first band.
    pub d_instr_a: MagErr,
    /// Instrumental magnitude difference in the second band.
    pub d_instr_b: MagErr,
}

/// Fitted classic transform for one band pair over a whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicTransform {
    /// Band pair `(A, B)` the coefficients belong to.
    pub band_pair: BandPair,
    /// Color coefficient of the first band.
    pub ta: ValErr,
    /// First-order extinction coefficient of the first band.
    pub ka: ValErr,
    /// Color coefficient of the second band.
    pub tb: ValErr,
    /// First-order extinction coefficient of the second band.
    pub kb: ValErr,
}

/// Build the difference rows of every ensemble-star pair in every batch.
///
/// Stars come from [`BatchDataProvider::ensemble_batches`], so the target is
/// excluded and the quality predicates have already run. Pairs follow the
/// stars' AUID order within each batch, which keeps the row order
/// reproducible across runs.
///
/// # Arguments
///
/// * `provider` – Joined session data.
/// * `pair` – Band pair to difference.
pub fn star_pair_rows(provider: &BatchDataProvider, pair: &BandPair) -> Vec<StarPairRow> {
    let mut rows = Vec::new();
    for batch in provider.ensemble_batches(pair) {
        let Some(meta) = provider.batch(batch.batch_id) else {
            continue;
        };
        let airmass = ValErr::new(meta.airmass, meta.airmass_range);
        for (s1, s2) in batch.stars.iter().tuple_combinations() {
            rows.push(StarPairRow {
                batch_id: batch.batch_id,
                airmass,
                d_color: s1.standard_color() - s2.standard_color(),
                d_standard_a: s1.standard_a - s2.standard_a,
                d_standard_b: s1.standard_b - s2.standard_b,
                d_instr_a: s1.instr_a.magnitude - s2.instr_a.magnitude,
                d_instr_b: s1.instr_b.magnitude - s2.instr_b.magnitude,
            });
        }
    }
    rows
}

impl ClassicTransform {
    /// Fit both bands' coefficients from difference rows, unweighted.
    ///
    /// # Arguments
    ///
    /// * `pair` – Band pair the rows were built for.
    /// * `rows` – Star-pair difference rows, see [`star_pair_rows`].
    ///
    /// # Return
    ///
    /// * `Ok(ClassicTransform)` – Coefficients with standard errors from the
    ///   normal-equation diagonal.
    /// * `Err(DiffPhotError::DegenerateFit)` – Fewer than three rows or a
    ///   singular system (all pairs share one color, or one batch airmass
    ///   makes the columns collinear).
    pub fn fit(pair: &BandPair, rows: &[StarPairRow]) -> Result<Self, DiffPhotError> {
        Self::solve(pair, rows, false)
    }

    /// Fit with every row weighted by the reciprocal of its combined
    /// uncertainty.
    ///
    /// The row uncertainty folds the standard difference, the instrumental
    /// difference and the extinction term `X·ΔC` in quadrature, per band.
    ///
    /// # See also
    ///
    /// * [`ClassicTransform::fit`] – the unweighted variant.
    pub fn fit_weighted(pair: &BandPair, rows: &[StarPairRow]) -> Result<Self, DiffPhotError> {
        Self::solve(pair, rows, true)
    }

    fn solve(pair: &BandPair, rows: &[StarPairRow], weighted: bool) -> Result<Self, DiffPhotError> {
        let design: Vec<[f64; 2]> = rows
            .iter()
            .map(|r| [r.d_color.mag, -r.airmass.value * r.d_color.mag])
            .collect();
        let rhs_a: Vec<f64> = rows
            .iter()
            .map(|r| r.d_standard_a.mag - r.d_instr_a.mag)
            .collect();
        let rhs_b: Vec<f64> = rows
            .iter()
            .map(|r| r.d_standard_b.mag - r.d_instr_b.mag)
            .collect();

        let (weights_a, weights_b) = if weighted {
            let extinction_var: Vec<f64> = rows
                .iter()
                .map(|r| {
                    let term = r.airmass * r.d_color;
                    r.d_color.err.powi(2) + term.err.powi(2)
                })
                .collect();
            let sigma = |standard: &MagErr, instr: &MagErr, var: f64| {
                (standard.err.powi(2) + instr.err.powi(2) + var).sqrt()
            };
            let weights_a: Vec<f64> = rows
                .iter()
                .zip(&extinction_var)
                .map(|(r, var)| 1.0 / sigma(&r.d_standard_a, &r.d_instr_a, *var))
                .collect();
            let weights_b: Vec<f64> = rows
                .iter()
                .zip(&extinction_var)
                .map(|(r, var)| 1.0 / sigma(&r.d_standard_b, &r.d_instr_b, *var))
                .collect();
            (Some(weights_a), Some(weights_b))
        } else {
            (None, None)
        };

        let [ta, ka] = least_squares_two_param(&design, &rhs_a, weights_a.as_deref())?;
        let [tb, kb] = least_squares_two_param(&design, &rhs_b, weights_b.as_deref())?;

        Ok(Self {
            band_pair: pair.clone(),
            ta,
            ka,
            tb,
            kb,
        })
    }
}

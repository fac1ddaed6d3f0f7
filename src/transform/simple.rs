//! # Simple per-batch color transform
//!
//! The simple transform relates instrumental magnitudes `(a, b)` in a band
//! pair `(A, B)` to standard magnitudes through the standard color index
//! `C = A − B` of the ensemble stars of one batch.
//!
//! ## Fit
//!
//! Three ordinary least-squares regressions against `C`:
//!
//! ```text
//! a − b ~ C   slope s_ab,  Tab = 1 / s_ab
//! A − a ~ C   slope Ta
//! B − b ~ C   slope Tb
//! ```
//!
//! Coefficient standard errors come from the regression slope errors, with
//! `err(Tab) = err(s_ab) / s_ab²`. The fit degenerates when fewer than three
//! ensemble stars remain, when the standard colors carry no variance, or
//! when any regression fits its points exactly (zero slope standard error
//! leaves the coefficient uncertainties meaningless downstream).
//!
//! ## Apply
//!
//! Application derives the target's standard magnitudes through a single
//! comparison star `c`:
//!
//! ```text
//! Δ    = (a_t − b_t) − (a_c − b_c)
//! C_t  = (A_c − B_c) + Tab·Δ
//! A_t  = a_t + (A_c − a_c) + Ta·(Tab·Δ)
//! B_t  = A_t − C_t
//! ```
//!
//! The same chain runs a second time with the bands exchanged (`Tb` in place
//! of `Ta`, `Δ` negated by construction), so every application yields both
//! bands twice: once as the lead of its own chain and once derived through
//! the other band's color. The lead magnitude of a chain always carries the
//! smaller uncertainty; [`TransformedPair`] keeps all four estimates under
//! explicit names so no caller has to remember a tuple order.
//!
//! ## See also
//!
//! * [`crate::regression::linear_fit`] – the slope estimator behind the fit.
//! * [`crate::magnitude`] – the propagation rules used by the chains.

use std::fmt;

use crate::constants::BandPair;
use crate::diffphot_errors::DiffPhotError;
use crate::magnitude::{MagErr, ValErr};
use crate::provider::EnsembleStar;
use crate::regression::linear_fit;

/// Fitted simple transform for one band pair of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTransform {
    /// Band pair `(A, B)` the coefficients belong to.
    pub band_pair: BandPair,
    /// Color coefficient of the first band, slope of `A − a ~ C`.
    pub ta: ValErr,
    /// Color coefficient of the second band, slope of `B − b ~ C`.
    pub tb: ValErr,
    /// Color scale, reciprocal slope of `a − b ~ C`.
    pub tab: ValErr,
}

/// Standard magnitudes of one target measurement, derived through both
/// chains of a [`SimpleTransform`] application.
///
/// Each band appears twice. The `*_first` fields are derived as the lead of
/// their own chain and carry the smaller uncertainty; the `*_second` fields
/// are reconstructed through the other band's chain via the target color and
/// mainly serve as a consistency check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformedPair {
    /// First band, lead of the direct chain.
    pub a_first: MagErr,
    /// Second band, lead of the swapped chain.
    pub b_first: MagErr,
    /// First band, reconstructed from `b_first` and the target color.
    pub a_second: MagErr,
    /// Second band, reconstructed from `a_first` and the target color.
    pub b_second: MagErr,
    /// Standard color of the target from the direct chain.
    pub color: MagErr,
}

impl SimpleTransform {
    /// Fit the three transform coefficients from the ensemble stars of one
    /// batch.
    ///
    /// # Arguments
    ///
    /// * `pair` – Band pair `(A, B)` the stars were joined on.
    /// * `stars` – Ensemble stars carrying standard and instrumental
    ///   magnitudes in both bands, target excluded.
    ///
    /// # Return
    ///
    /// * `Ok(SimpleTransform)` – Coefficients with their standard errors.
    /// * `Err(DiffPhotError::DegenerateFit)` – Fewer than three stars, no
    ///   color variance, or an exact fit with zero slope standard error.
    ///
    /// # See also
    ///
    /// * [`SimpleTransform::apply`] – uses the fitted coefficients.
    /// * [`crate::provider::BatchDataProvider::ensemble_batches`] – builds
    ///   the star set this expects.
    pub fn fit(pair: &BandPair, stars: &[EnsembleStar]) -> Result<Self, DiffPhotError> {
        let color: Vec<f64> = stars.iter().map(|s| s.standard_color().mag).collect();
        let instr_color: Vec<f64> = stars.iter().map(|s| s.instrumental_color().mag).collect();
        let diff_a: Vec<f64> = stars
            .iter()
            .map(|s| s.standard_a.mag - s.instr_a.magnitude.mag)
            .collect();
        let diff_b: Vec<f64> = stars
            .iter()
            .map(|s| s.standard_b.mag - s.instr_b.magnitude.mag)
            .collect();

        let reg_ab = linear_fit(&color, &instr_color)?;
        let reg_a = linear_fit(&color, &diff_a)?;
        let reg_b = linear_fit(&color, &diff_b)?;

        if reg_ab.slope_err == 0.0 || reg_a.slope_err == 0.0 || reg_b.slope_err == 0.0 {
            return Err(DiffPhotError::DegenerateFit(format!(
                "exact color regression over {} ensemble stars, coefficient errors undefined",
                stars.len()
            )));
        }

        Ok(Self {
            band_pair: pair.clone(),
            ta: reg_a.slope_val_err(),
            tb: reg_b.slope_val_err(),
            tab: reg_ab.slope_val_err().recip(),
        })
    }

    /// Derive the target's standard magnitudes through one comparison star.
    ///
    /// Runs the derivation chain twice, once led by each band, and returns
    /// all four estimates. Pure arithmetic, total for finite inputs.
    ///
    /// # Arguments
    ///
    /// * `target` – Instrumental `(a_t, b_t)` of the target in this batch.
    /// * `comp` – Comparison star with standard and instrumental magnitudes
    ///   in both bands.
    pub fn apply(&self, target: (MagErr, MagErr), comp: &EnsembleStar) -> TransformedPair {
        let (a_first, b_second, color) = self.derive(
            self.ta,
            (comp.standard_a, comp.standard_b),
            (comp.instr_a.magnitude, comp.instr_b.magnitude),
            target,
        );
        let (b_first, a_second, _) = self.derive(
            self.tb,
            (comp.standard_b, comp.standard_a),
            (comp.instr_b.magnitude, comp.instr_a.magnitude),
            (target.1, target.0),
        );

        TransformedPair {
            a_first,
            b_first,
            a_second,
            b_second,
            color,
        }
    }

    /// One derivation chain, lead band first in every tuple.
    ///
    /// Returns `(lead, trail, color)` where `trail = lead − color`.
    fn derive(
        &self,
        t: ValErr,
        comp_std: (MagErr, MagErr),
        comp_instr: (MagErr, MagErr),
        target: (MagErr, MagErr),
    ) -> (MagErr, MagErr, MagErr) {
        let delta = (target.0 - target.1) - (comp_instr.0 - comp_instr.1);
        let tab_delta = self.tab * delta;
        let color = (comp_std.0 - comp_std.1) + tab_delta;
        let lead = target.0 + (comp_std.0 - comp_instr.0) + t * tab_delta;
        let trail = lead - color;
        (lead, trail, color)
    }
}

impl fmt::Display for SimpleTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = (&self.band_pair.0, &self.band_pair.1);
        write!(
            f,
            "T{a} = {}, T{b} = {}, T{a}{b} = {}",
            self.ta, self.tb, self.tab
        )
    }
}

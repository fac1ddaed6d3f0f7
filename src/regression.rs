//! Least-squares fits shared by the transform solvers: scalar ordinary
//! least squares for the per-batch color regressions, and a two-parameter
//! (weighted) least squares for the extinction-aware ensemble fit.

use nalgebra::{DMatrix, DVector};

use crate::diffphot_errors::DiffPhotError;
use crate::magnitude::ValErr;

/// Result of a scalar ordinary least-squares fit of `y` against `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Standard error of the slope. Exactly zero for a perfectly collinear
    /// sample; callers treat that as a degenerate fit.
    pub slope_err: f64,
    /// Sample size.
    pub n: usize,
}

impl LinearFit {
    pub fn slope_val_err(&self) -> ValErr {
        ValErr::new(self.slope, self.slope_err)
    }
}

/// Ordinary least squares of `y` against `x`.
///
/// Slope and intercept minimize the squared residuals; the slope standard
/// error is `sqrt(RSS / ((n−2) · Sxx))`. The fit is degenerate when fewer
/// than 3 points are given (no residual degree of freedom) or when all `x`
/// are identical (zero color variance).
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit, DiffPhotError> {
    if x.len() != y.len() {
        return Err(DiffPhotError::InvalidParameter(format!(
            "mismatched sample lengths: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 3 {
        return Err(DiffPhotError::DegenerateFit(format!(
            "{n} points leave no residual degree of freedom"
        )));
    }

    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx == 0.0 {
        return Err(DiffPhotError::DegenerateFit(
            "zero variance in the regressor sample".into(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let rss = (syy - slope * sxy).max(0.0);
    let slope_err = (rss / ((nf - 2.0) * sxx)).sqrt();

    Ok(LinearFit {
        slope,
        intercept,
        slope_err,
        n,
    })
}

/// Two-parameter least squares `rhs ≈ rows · params`, optionally row-weighted.
///
/// Parameter standard errors follow the normal-equation route:
/// `err_j = sqrt(((AᵀA)⁻¹)_jj · RSS / (n−2))`, with weights (when given)
/// folded into both the design matrix and the right-hand side beforehand.
/// The fit is degenerate when fewer than 3 rows are given or when the two
/// design columns are collinear to working precision.
pub fn least_squares_two_param(
    rows: &[[f64; 2]],
    rhs: &[f64],
    weights: Option<&[f64]>,
) -> Result<[ValErr; 2], DiffPhotError> {
    if rows.len() != rhs.len() {
        return Err(DiffPhotError::InvalidParameter(format!(
            "mismatched sample lengths: {} vs {}",
            rows.len(),
            rhs.len()
        )));
    }
    let n = rows.len();
    if n < 3 {
        return Err(DiffPhotError::DegenerateFit(format!(
            "{n} difference rows leave no residual degree of freedom"
        )));
    }
    if let Some(w) = weights {
        if w.len() != n {
            return Err(DiffPhotError::InvalidParameter(format!(
                "mismatched weight length: {} vs {n}",
                w.len()
            )));
        }
    }

    let weight = |i: usize| weights.map_or(1.0, |w| w[i]);
    let a = DMatrix::<f64>::from_fn(n, 2, |i, j| weight(i) * rows[i][j]);
    let b = DVector::<f64>::from_fn(n, |i, _| weight(i) * rhs[i]);

    // singular values come out sorted in decreasing order
    let svd = a.clone().svd(true, true);
    let singular = &svd.singular_values;
    if singular[1] <= singular[0] * f64::EPSILON.sqrt() {
        return Err(DiffPhotError::DegenerateFit(
            "collinear design columns in ensemble fit".into(),
        ));
    }

    let normal = a.transpose() * &a;
    let normal_inv = normal.try_inverse().ok_or_else(|| {
        DiffPhotError::DegenerateFit("singular normal matrix in ensemble fit".into())
    })?;

    let solution = svd
        .solve(&b, f64::EPSILON)
        .map_err(|e| DiffPhotError::DegenerateFit(e.to_string()))?;

    let rss = (&a * &solution - &b).norm_squared();
    let scale = rss / (n as f64 - 2.0);

    Ok([
        ValErr::new(solution[0], (normal_inv[(0, 0)] * scale).sqrt()),
        ValErr::new(solution[1], (normal_inv[(1, 1)] * scale).sqrt()),
    ])
}

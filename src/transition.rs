//! Transition matrix construction and sparse helpers.
//!
//! The walk operator is a convex mixture of the intra-domain normalized
//! adjacency `Anorm` and the cross-domain normalized mapping `Ynorm`:
//!
//! ```text
//! tilde_c = (c + 2 alpha) / (1 + 2 alpha)
//! W       = c / (c + 2 alpha) * Anorm + 2 alpha / (c + 2 alpha) * Ynorm
//! ```
//!
//! [`mix`] is the only place this formula lives. Everything else in the crate
//! asks for a [`Transition`].
//!
//! All matrices are `sprs::CsMat<f64>`. Operations iterate rows, so CSC
//! inputs are converted to CSR once on entry via [`to_csr`].

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::{CrossQueryError, Result};

/// Cross-network weight `alpha` and restart-preference weight `c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixingParams {
    pub alpha: f64,
    pub c: f64,
}

impl Default for MixingParams {
    fn default() -> Self {
        Self { alpha: 0.2, c: 0.85 }
    }
}

impl MixingParams {
    pub fn new(alpha: f64, c: f64) -> Result<Self> {
        let params = Self { alpha, c };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(CrossQueryError::InvalidParameter(format!(
                "alpha must be finite and >= 0, got {}",
                self.alpha
            )));
        }
        if !(self.c > 0.0 && self.c < 1.0) {
            return Err(CrossQueryError::InvalidParameter(format!(
                "c must lie in (0, 1), got {}",
                self.c
            )));
        }
        Ok(())
    }

    /// Decay of the geometric series, `(c + 2 alpha) / (1 + 2 alpha)`.
    #[inline]
    pub fn tilde_c(&self) -> f64 {
        (self.c + 2.0 * self.alpha) / (1.0 + 2.0 * self.alpha)
    }

    /// Weight of `Anorm` in `W`.
    #[inline]
    pub fn intra_weight(&self) -> f64 {
        self.c / (self.c + 2.0 * self.alpha)
    }

    /// Weight of `Ynorm` in `W`.
    #[inline]
    pub fn cross_weight(&self) -> f64 {
        2.0 * self.alpha / (self.c + 2.0 * self.alpha)
    }
}

/// Walk operator plus the decay it is paired with.
#[derive(Debug, Clone)]
pub struct Transition {
    pub matrix: CsMat<f64>,
    pub tilde_c: f64,
}

/// Build `W` and `tilde_c` from `Anorm`, `Ynorm` and the mixing weights.
pub fn mix(anorm: &CsMat<f64>, ynorm: &CsMat<f64>, params: MixingParams) -> Result<Transition> {
    params.validate()?;
    check_square(anorm)?;
    if ynorm.shape() != anorm.shape() {
        return Err(CrossQueryError::DimensionMismatch {
            expected: anorm.rows(),
            actual: ynorm.rows(),
        });
    }

    let n = anorm.rows();
    let (wa, wy) = (params.intra_weight(), params.cross_weight());
    let anorm = to_csr(anorm);
    let ynorm = to_csr(ynorm);
    let mut tri = TriMat::with_capacity((n, n), anorm.nnz() + ynorm.nnz());
    for (weight, m) in [(wa, &*anorm), (wy, &*ynorm)] {
        if weight == 0.0 {
            continue;
        }
        for (row, vec) in m.outer_iterator().enumerate() {
            for (col, &val) in vec.iter() {
                tri.add_triplet(row, col, weight * val);
            }
        }
    }
    let matrix: CsMat<f64> = tri.to_csr();

    Ok(Transition {
        matrix,
        tilde_c: params.tilde_c(),
    })
}

/// Borrow `m` if it is already row-major, otherwise convert.
pub fn to_csr(m: &CsMat<f64>) -> Cow<'_, CsMat<f64>> {
    if m.is_csr() {
        Cow::Borrowed(m)
    } else {
        Cow::Owned(m.to_csr())
    }
}

pub(crate) fn check_square(m: &CsMat<f64>) -> Result<()> {
    if m.rows() != m.cols() {
        return Err(CrossQueryError::DimensionMismatch {
            expected: m.rows(),
            actual: m.cols(),
        });
    }
    Ok(())
}

/// `Wmax[i] = max_j W[i, j]`, with implicit zeros included.
pub fn row_max(w: &CsMat<f64>) -> Vec<f64> {
    let w = to_csr(w);
    w.outer_iterator()
        .map(|row| row.iter().fold(0.0_f64, |acc, (_, &v)| acc.max(v)))
        .collect()
}

pub fn row_sums(m: &CsMat<f64>) -> Vec<f64> {
    let m = to_csr(m);
    m.outer_iterator()
        .map(|row| row.iter().map(|(_, &v)| v).sum())
        .collect()
}

/// `out = W p` for a CSR `w`.
pub(crate) fn spmv(w: &CsMat<f64>, p: &[f64], out: &mut [f64]) {
    debug_assert!(w.is_csr());
    for (row, vec) in w.outer_iterator().enumerate() {
        out[row] = vec.iter().map(|(col, &v)| v * p[col]).sum();
    }
}

/// Rows and columns of `m` restricted to `keep`, renumbered in `keep` order.
pub fn submatrix(m: &CsMat<f64>, keep: &[usize]) -> CsMat<f64> {
    let m = to_csr(m);
    let mut new_index = vec![None; m.cols()];
    for (i, &old) in keep.iter().enumerate() {
        new_index[old] = Some(i);
    }
    let mut tri = TriMat::new((keep.len(), keep.len()));
    for (i, &old_row) in keep.iter().enumerate() {
        if let Some(row) = m.outer_view(old_row) {
            for (col, &val) in row.iter() {
                if let Some(j) = new_index[col] {
                    tri.add_triplet(i, j, val);
                }
            }
        }
    }
    tri.to_csr()
}

/// Reject negative or non-finite entries.
pub(crate) fn check_nonnegative(m: &CsMat<f64>, what: &str) -> Result<()> {
    let m = to_csr(m);
    for (row, vec) in m.outer_iterator().enumerate() {
        for (col, &val) in vec.iter() {
            if !val.is_finite() || val < 0.0 {
                return Err(CrossQueryError::InvalidParameter(format!(
                    "{what}[{row}, {col}] = {val} is not a finite nonnegative weight"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn from_dense(rows: &[Vec<f64>]) -> CsMat<f64> {
    let n = rows.len();
    let m = rows.first().map_or(0, Vec::len);
    let mut tri = TriMat::new((n, m));
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            if v != 0.0 {
                tri.add_triplet(i, j, v);
            }
        }
    }
    tri.to_csr()
}

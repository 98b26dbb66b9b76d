//! Subnetwork-restricted top-k retrieval ("Fast").
//!
//! 1. [`extract_subnet`] picks the domains that can carry a meaningful share
//!    of walk mass between the source and the target domain.
//! 2. `Anorm`, `Y` and `G` are restricted to those domains.
//! 3. The cross-domain matrix is re-balanced for the reduced main network and
//!    normalized again ([`renormalize_cross`]).
//! 4. `W` is mixed from the reduced matrices and bound propagation runs in the
//!    reduced index space.
//!
//! External ids are carried through the restriction, so results need no
//! remapping; reported domains are indices of the original NoN.

use sprs::{CsMat, TriMat};
use tracing::debug;

use crate::basic::{BasicRun, BoundedTopKRetriever};
use crate::config::QueryConfig;
use crate::error::{CrossQueryError, Result};
use crate::network::{DomainLayout, ExternalId};
use crate::subnet::{extract_subnet, Subnetwork};
use crate::transition::{check_square, mix, row_sums, submatrix, to_csr};

/// Relative slack tolerated when a node's cross-domain weight exceeds its
/// domain degree through rounding.
const BALANCE_TOLERANCE: f64 = 1e-12;

/// Outcome of a Fast query.
#[derive(Debug, Clone)]
pub struct FastRun {
    /// Top-k external ids from the target domain.
    pub ids: Vec<ExternalId>,
    /// Domains the query ran on, as original domain indices (ascending).
    pub domains: Vec<usize>,
    /// Survivors as global indices of the original NoN.
    pub candidates: Vec<usize>,
    /// Bound-propagation result in the reduced index space.
    pub basic: BasicRun,
    pub subnetwork: Subnetwork,
    /// Node count of the reduced NoN.
    pub reduced_nodes: usize,
}

/// Re-balance and normalize a cross-domain matrix against a main network.
///
/// `y` and `layout` describe the same node set; `g` is the main network over
/// `layout`'s domains. Each node's cross-domain weight is topped up on the
/// diagonal to its domain's degree `dy` in `g`, then the result is scaled as
/// `Dy^-1/2 Y Dy^-1/2`.
///
/// `domains` names the original index of each domain of `layout`, for errors.
pub fn renormalize_cross(
    y: &CsMat<f64>,
    g: &CsMat<f64>,
    layout: &DomainLayout,
    domains: &[usize],
) -> Result<CsMat<f64>> {
    let n = layout.num_nodes();
    check_square(y)?;
    check_square(g)?;
    if y.rows() != n {
        return Err(CrossQueryError::DimensionMismatch {
            expected: n,
            actual: y.rows(),
        });
    }
    if g.rows() != layout.num_domains() {
        return Err(CrossQueryError::DimensionMismatch {
            expected: layout.num_domains(),
            actual: g.rows(),
        });
    }

    let domain_degree = row_sums(g);
    let mut dy = Vec::with_capacity(n);
    for (i, &degree) in domain_degree.iter().enumerate() {
        if !(degree.is_finite() && degree > 0.0) {
            return Err(CrossQueryError::NumericDegeneracy {
                domain: domains.get(i).copied().unwrap_or(i),
            });
        }
        dy.extend(std::iter::repeat(degree).take(layout.domain_size(i)));
    }

    let y = to_csr(y);
    let cross = row_sums(&y);
    let mut tri = TriMat::with_capacity((n, n), y.nnz() + n);
    for (r, row) in y.outer_iterator().enumerate() {
        for (c, &v) in row.iter() {
            tri.add_triplet(r, c, v / (dy[r] * dy[c]).sqrt());
        }
        let mut deficit = dy[r] - cross[r];
        if deficit < 0.0 {
            if deficit < -BALANCE_TOLERANCE * dy[r] {
                return Err(CrossQueryError::InvalidParameter(format!(
                    "cross-domain weight {} of node {r} exceeds its domain degree {}",
                    cross[r], dy[r]
                )));
            }
            deficit = 0.0;
        }
        if deficit > 0.0 {
            tri.add_triplet(r, r, deficit / dy[r]);
        }
    }
    Ok(tri.to_csr())
}

/// Top-k ids of domain `target` for `query` in domain `source`, run on the
/// extracted subnetwork.
///
/// Returns the ids together with the domains judged relevant.
#[allow(clippy::too_many_arguments)]
pub fn retrieve_top_k_fast(
    anorm: &CsMat<f64>,
    y: &CsMat<f64>,
    g: &CsMat<f64>,
    query: ExternalId,
    source: usize,
    target: usize,
    k: usize,
    alpha: f64,
    c: f64,
    epsilon: f64,
    layout: &DomainLayout,
) -> Result<(Vec<ExternalId>, Vec<usize>)> {
    let config = QueryConfig {
        alpha,
        c,
        epsilon,
        k,
        ..QueryConfig::default()
    };
    let run = retrieve_top_k_fast_run(anorm, y, g, query, source, target, layout, &config)?;
    Ok((run.ids, run.domains))
}

/// Like [`retrieve_top_k_fast`], returning the full run.
#[allow(clippy::too_many_arguments)]
pub fn retrieve_top_k_fast_run(
    anorm: &CsMat<f64>,
    y: &CsMat<f64>,
    g: &CsMat<f64>,
    query: ExternalId,
    source: usize,
    target: usize,
    layout: &DomainLayout,
    config: &QueryConfig,
) -> Result<FastRun> {
    config.validate()?;
    layout.check_domain(target)?;
    layout.query_index(query, source)?;
    let n = layout.num_nodes();
    for m in [anorm, y] {
        check_square(m)?;
        if m.rows() != n {
            return Err(CrossQueryError::DimensionMismatch {
                expected: n,
                actual: m.rows(),
            });
        }
    }
    check_square(g)?;
    if g.rows() != layout.num_domains() {
        return Err(CrossQueryError::DimensionMismatch {
            expected: layout.num_domains(),
            actual: g.rows(),
        });
    }

    let subnetwork = extract_subnet(g, source, target, config.epsilon)?;
    let domains = subnetwork.domains.clone();
    let (sub_layout, kept) = layout.restrict(&domains)?;

    let sub_anorm = submatrix(anorm, &kept);
    let sub_y = submatrix(y, &kept);
    let sub_g = submatrix(g, &domains);
    let sub_ynorm = renormalize_cross(&sub_y, &sub_g, &sub_layout, &domains)?;
    let transition = mix(&sub_anorm, &sub_ynorm, config.mixing())?;

    let reduced = |domain: usize| {
        domains
            .binary_search(&domain)
            .map_err(|_| CrossQueryError::InvariantViolation(format!(
                "domain {domain} missing from its own subnetwork"
            )))
    };
    let (sub_source, sub_target) = (reduced(source)?, reduced(target)?);

    debug!(
        domains = domains.len(),
        nodes = kept.len(),
        total_nodes = n,
        "running bound propagation on subnetwork"
    );

    let basic = BoundedTopKRetriever::new(
        &transition.matrix,
        &sub_layout,
        query,
        sub_source,
        sub_target,
        config.k,
        transition.tilde_c,
    )?
    .run(&config.basic_config())?;

    let candidates = basic.candidates.iter().map(|&i| kept[i]).collect();
    Ok(FastRun {
        ids: basic.ids.clone(),
        domains,
        candidates,
        basic,
        subnetwork,
        reduced_nodes: kept.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::from_dense;

    fn get(m: &CsMat<f64>, i: usize, j: usize) -> f64 {
        m.get(i, j).copied().unwrap_or(0.0)
    }

    #[test]
    fn renormalize_balances_rows() {
        // Two domains of one node each, joined with weight 2.
        let layout = DomainLayout::from_sizes(&[1, 1]).unwrap();
        let g = from_dense(&[vec![0.0, 2.0], vec![2.0, 0.0]]);
        let y = from_dense(&[vec![0.0, 0.5], vec![0.5, 0.0]]);
        let ynorm = renormalize_cross(&y, &g, &layout, &[0, 1]).unwrap();
        assert!((get(&ynorm, 0, 1) - 0.25).abs() < 1e-12);
        assert!((get(&ynorm, 0, 0) - 0.75).abs() < 1e-12);
        // rows of Dy^-1/2 Y' Dy^-1/2 sum to 1 when degrees are equal
        let sums = row_sums(&ynorm);
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn zero_degree_domain_is_degenerate() {
        let layout = DomainLayout::from_sizes(&[1, 1]).unwrap();
        let g = from_dense(&[vec![0.0, 0.0], vec![0.0, 0.0]]);
        let y = from_dense(&[vec![0.0, 0.0], vec![0.0, 0.0]]);
        assert_eq!(
            renormalize_cross(&y, &g, &layout, &[4, 7]).unwrap_err(),
            CrossQueryError::NumericDegeneracy { domain: 4 }
        );
    }

    #[test]
    fn overweight_cross_row_rejected() {
        let layout = DomainLayout::from_sizes(&[1, 1]).unwrap();
        let g = from_dense(&[vec![0.0, 1.0], vec![1.0, 0.0]]);
        let y = from_dense(&[vec![0.0, 3.0], vec![3.0, 0.0]]);
        assert!(matches!(
            renormalize_cross(&y, &g, &layout, &[0, 1]),
            Err(CrossQueryError::InvalidParameter(_))
        ));
    }
}

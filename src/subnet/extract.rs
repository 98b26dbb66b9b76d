//! Relevant-subnetwork extraction on the main (domain-level) network.

use sprs::{CsMat, TriMat};
use tracing::debug;

use super::expander::{BidirectionalExpander, DistanceGraph};
use crate::error::{CrossQueryError, Result};
use crate::transition::{check_nonnegative, check_square, row_sums, to_csr};

/// Domains kept for a source/target pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Subnetwork {
    /// Retained domain indices, ascending. Always contains source and target.
    pub domains: Vec<usize>,
    /// Provisional shortest source-target distance found by the expansion.
    pub shortest_distance: f64,
    /// Radius cap both sides expanded under.
    pub max_radius: f64,
    /// Heap pops spent, full relax included.
    pub steps: usize,
}

/// Turn similarity weights of `g` into edge lengths.
///
/// Weights are normalized as `D^-1/2 G D^-1/2` (D = row sums), floored at
/// machine epsilon and mapped to `-log10(sim)`, so stronger ties are shorter.
/// The diagonal and zero weights are dropped.
pub fn distance_graph(g: &CsMat<f64>) -> Result<DistanceGraph> {
    check_square(g)?;
    check_nonnegative(g, "G")?;
    let degrees = row_sums(g);
    let g = to_csr(g);
    let mut tri = TriMat::with_capacity(g.shape(), g.nnz());
    for (i, row) in g.outer_iterator().enumerate() {
        for (j, &w) in row.iter() {
            if i == j || w == 0.0 {
                continue;
            }
            let scale = (degrees[i] * degrees[j]).sqrt();
            let sim = if scale > 0.0 { w / scale } else { 0.0 };
            let length = -sim.max(f64::EPSILON).log10();
            tri.add_triplet(i, j, length.max(0.0));
        }
    }
    DistanceGraph::new(tri.to_csr())
}

/// Extract the domains relevant to a query from `source` to `target`.
///
/// A domain `u` settled by either side is kept iff
/// `Dis_s[u] + Dis_d[u] <= L_sd - log10(epsilon)`. Larger `epsilon` keeps
/// fewer domains.
pub fn extract_subnet(
    g: &CsMat<f64>,
    source: usize,
    target: usize,
    epsilon: f64,
) -> Result<Subnetwork> {
    if !(epsilon > 0.0 && epsilon < 1.0) {
        return Err(CrossQueryError::InvalidParameter(format!(
            "epsilon must lie in (0, 1), got {epsilon}"
        )));
    }
    let graph = distance_graph(g)?;
    let slack = -epsilon.log10();

    let mut expander = BidirectionalExpander::new(&graph, source, target)?;
    let outcome = expander.run(slack)?;
    let relax_steps = expander.full_relax();

    let forward = expander.forward();
    let backward = expander.backward();
    let mut candidates: Vec<usize> = forward
        .neighborhood()
        .iter()
        .chain(backward.neighborhood())
        .copied()
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    let budget = outcome.shortest + slack;
    let mut domains: Vec<usize> = candidates
        .into_iter()
        .filter(|&u| forward.distance(u) + backward.distance(u) <= budget)
        .collect();
    for endpoint in [source, target] {
        if let Err(pos) = domains.binary_search(&endpoint) {
            domains.insert(pos, endpoint);
        }
    }

    debug!(
        source,
        target,
        epsilon,
        kept = domains.len(),
        total = graph.num_nodes(),
        shortest = outcome.shortest,
        "extracted subnetwork"
    );

    Ok(Subnetwork {
        domains,
        shortest_distance: outcome.shortest,
        max_radius: outcome.max_radius,
        steps: outcome.steps + relax_steps,
    })
}

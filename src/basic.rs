//! Bound-propagation top-k retrieval ("Basic").
//!
//! Scores follow the random-walk-with-restart series
//!
//! ```text
//! score = (1 - tilde_c) * sum_{t >= 0} tilde_c^t * (W^t e)
//! ```
//!
//! Instead of summing the series for every node, the retriever keeps a lower
//! bound (the partial sum so far) and an upper bound (partial sum plus a tail
//! estimate) for each candidate in the target domain. After each propagation
//! step it drops every candidate whose upper bound falls below the k-th
//! largest lower bound. It stops once exactly k candidates remain.
//!
//! # Bounds
//!
//! At iteration `t`:
//!
//! - `Lower[i] += (1 - tilde_c) * tilde_c^t * p_t[i]` with `p_t = W^t e`
//! - `Upper[i]  = Lower[i] + tilde_c^(t+1) * Wmax[i]`, `Wmax[i] = max_j W[i, j]`
//!
//! The tail term is a single amplification step rather than the full geometric
//! tail. It is kept as is: output composition at tie boundaries depends on it.
//!
//! When `max(Upper - Lower)` drops below the convergence threshold the bounds
//! can no longer separate candidates, and ties at the threshold are broken in
//! global index order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crossquery::{basic::retrieve_top_k_basic, mix, DomainLayout, MixingParams};
//!
//! let t = mix(&anorm, &ynorm, MixingParams::new(0.2, 0.85)?)?;
//! let ids = retrieve_top_k_basic(&t.matrix, query, 0, 2, 10, t.tilde_c, &layout)?;
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sprs::CsMat;
use tracing::{debug, trace};

use crate::error::{CrossQueryError, Result};
use crate::network::{DomainLayout, ExternalId};
use crate::transition::{check_nonnegative, check_square, row_max, spmv, to_csr};

/// Termination knobs for bound propagation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    /// Hard cap on propagation steps. `None` runs until the bounds settle.
    pub max_iterations: Option<usize>,
    /// Bounds count as converged once `max(Upper - Lower)` is below this.
    pub convergence: f64,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            convergence: 1e-15,
        }
    }
}

/// Outcome of one bound-propagation query.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicRun {
    /// External ids of the surviving candidates, same order as `candidates`.
    pub ids: Vec<ExternalId>,
    /// Global indices of the survivors, ascending.
    pub candidates: Vec<usize>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// Propagation steps performed.
    pub iterations: usize,
    /// Whether the tie-break path ran (bounds collapsed before separation).
    pub converged: bool,
}

impl BasicRun {
    /// Survivors sorted by lower bound, best first; ties by global index.
    pub fn ranked(&self) -> Vec<(ExternalId, f64)> {
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        order.sort_by(|&a, &b| {
            self.lower[b]
                .total_cmp(&self.lower[a])
                .then_with(|| self.candidates[a].cmp(&self.candidates[b]))
        });
        order
            .into_iter()
            .map(|slot| (self.ids[slot], self.lower[slot]))
            .collect()
    }
}

/// A candidate dropped in the most recent step, with its bounds at that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pruned {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Anytime top-k search state over one query.
///
/// `step` performs one propagation and pruning round; the candidate set and
/// bounds are observable in between.
#[derive(Debug, Clone)]
pub struct BoundedTopKRetriever<'a> {
    w: Cow<'a, CsMat<f64>>,
    layout: &'a DomainLayout,
    wmax: Vec<f64>,
    k: usize,
    tilde_c: f64,
    /// p = W^iter e
    p: Vec<f64>,
    scratch: Vec<f64>,
    candidates: Vec<usize>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    pruned: Vec<Pruned>,
    theta: f64,
    iteration: usize,
    converged: bool,
}

impl<'a> BoundedTopKRetriever<'a> {
    /// Set up a query for node `query` of domain `source`, ranking domain `target`.
    pub fn new(
        w: &'a CsMat<f64>,
        layout: &'a DomainLayout,
        query: ExternalId,
        source: usize,
        target: usize,
        k: usize,
        tilde_c: f64,
    ) -> Result<Self> {
        if k == 0 {
            return Err(CrossQueryError::InvalidK);
        }
        if !(tilde_c > 0.0 && tilde_c < 1.0) {
            return Err(CrossQueryError::InvalidParameter(format!(
                "tilde_c must lie in (0, 1), got {tilde_c}"
            )));
        }
        layout.check_domain(target)?;
        check_square(w)?;
        let n = layout.num_nodes();
        if w.rows() != n {
            return Err(CrossQueryError::DimensionMismatch {
                expected: n,
                actual: w.rows(),
            });
        }
        let p = layout.query_vector(query, source)?;
        check_nonnegative(w, "W")?;

        let w = to_csr(w);
        let wmax = row_max(&w);
        let candidates: Vec<usize> = layout.domain_range(target).collect();
        let restart = 1.0 - tilde_c;
        let lower: Vec<f64> = candidates.iter().map(|&i| restart * p[i]).collect();
        let upper: Vec<f64> = candidates
            .iter()
            .zip(&lower)
            .map(|(&i, &lo)| lo + tilde_c * wmax[i])
            .collect();

        Ok(Self {
            w,
            layout,
            wmax,
            k,
            tilde_c,
            scratch: vec![0.0; n],
            p,
            candidates,
            lower,
            upper,
            pruned: Vec::new(),
            theta: 0.0,
            iteration: 0,
            converged: false,
        })
    }

    /// No more than k candidates remain.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.candidates.len() <= self.k
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Current pruning threshold (k-th largest lower bound).
    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Candidates removed by the last step's threshold test.
    pub fn pruned(&self) -> &[Pruned] {
        &self.pruned
    }

    /// One propagation, bound update and pruning round.
    pub fn step(&mut self, convergence: f64) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }
        self.iteration += 1;
        let iter = self.iteration as i32;

        spmv(&self.w, &self.p, &mut self.scratch);
        std::mem::swap(&mut self.p, &mut self.scratch);

        let gain = (1.0 - self.tilde_c) * self.tilde_c.powi(iter);
        let tail = self.tilde_c.powi(iter + 1);
        for (slot, &i) in self.candidates.iter().enumerate() {
            let mass = self.p[i];
            if mass < 0.0 {
                return Err(CrossQueryError::InvariantViolation(format!(
                    "negative walk mass {mass} at node {i}"
                )));
            }
            self.lower[slot] += gain * mass;
            let upper = self.lower[slot] + tail * self.wmax[i];
            if upper.is_nan() || upper < self.lower[slot] {
                return Err(CrossQueryError::InvariantViolation(format!(
                    "upper bound {upper} below lower bound {} at node {i}",
                    self.lower[slot]
                )));
            }
            self.upper[slot] = upper;
        }

        self.theta = kth_largest(&self.lower, self.k);
        self.prune();

        if self.candidates.len() < self.k {
            return Err(CrossQueryError::InvariantViolation(format!(
                "{} candidates left after pruning, need {}",
                self.candidates.len(),
                self.k
            )));
        }

        let gap = self
            .lower
            .iter()
            .zip(&self.upper)
            .fold(0.0_f64, |acc, (lo, up)| acc.max(up - lo));

        trace!(
            iteration = self.iteration,
            candidates = self.candidates.len(),
            theta = self.theta,
            gap,
            "bound propagation step"
        );

        if gap < convergence {
            self.break_ties()?;
        }
        Ok(())
    }

    /// Keep only candidates whose upper bound reaches the threshold.
    fn prune(&mut self) {
        let theta = self.theta;
        let mut keep = 0;
        self.pruned.clear();
        for slot in 0..self.candidates.len() {
            if self.upper[slot] >= theta {
                self.candidates[keep] = self.candidates[slot];
                self.lower[keep] = self.lower[slot];
                self.upper[keep] = self.upper[slot];
                keep += 1;
            } else {
                self.pruned.push(Pruned {
                    index: self.candidates[slot],
                    lower: self.lower[slot],
                    upper: self.upper[slot],
                });
            }
        }
        self.candidates.truncate(keep);
        self.lower.truncate(keep);
        self.upper.truncate(keep);
    }

    /// Bounds collapsed: take everything above the threshold, then fill with
    /// threshold ties in index order.
    fn break_ties(&mut self) -> Result<()> {
        let theta = self.theta;
        let len = self.candidates.len();
        let mut picked: Vec<usize> = (0..len).filter(|&s| self.lower[s] > theta).collect();
        picked.extend((0..len).filter(|&s| self.lower[s] == theta));
        picked.truncate(self.k);
        if picked.len() < self.k {
            return Err(CrossQueryError::InvariantViolation(format!(
                "only {} candidates at or above threshold {theta}",
                picked.len()
            )));
        }
        picked.sort_unstable();
        self.candidates = picked.iter().map(|&s| self.candidates[s]).collect();
        self.lower = picked.iter().map(|&s| self.lower[s]).collect();
        self.upper = picked.iter().map(|&s| self.upper[s]).collect();
        self.converged = true;
        Ok(())
    }

    /// Step until exactly k candidates survive.
    pub fn run(mut self, config: &BasicConfig) -> Result<BasicRun> {
        while !self.is_done() {
            if let Some(max) = config.max_iterations {
                if self.iteration >= max {
                    return Err(CrossQueryError::IterationLimit { iterations: max });
                }
            }
            self.step(config.convergence)?;
        }

        let ids = self
            .candidates
            .iter()
            .map(|&i| {
                self.layout.external_id(i).ok_or_else(|| {
                    CrossQueryError::InvariantViolation(format!("global index {i} has no id"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            k = self.k,
            returned = ids.len(),
            iterations = self.iteration,
            converged = self.converged,
            "bound propagation finished"
        );

        Ok(BasicRun {
            ids,
            candidates: self.candidates,
            lower: self.lower,
            upper: self.upper,
            iterations: self.iteration,
            converged: self.converged,
        })
    }
}

/// k-th largest value of `values` (1-based `k`, `k <= values.len()`).
fn kth_largest(values: &[f64], k: usize) -> f64 {
    let mut sorted = values.to_vec();
    let (_, kth, _) = sorted.select_nth_unstable_by(k - 1, |a, b| b.total_cmp(a));
    *kth
}

/// Top-k external ids of domain `target` for query node `query` of domain `source`.
///
/// Returns `min(k, |target|)` ids in global index order, not sorted by score.
pub fn retrieve_top_k_basic(
    w: &CsMat<f64>,
    query: ExternalId,
    source: usize,
    target: usize,
    k: usize,
    tilde_c: f64,
    layout: &DomainLayout,
) -> Result<Vec<ExternalId>> {
    retrieve_top_k_basic_run(w, query, source, target, k, tilde_c, layout, &BasicConfig::default())
        .map(|run| run.ids)
}

/// Like [`retrieve_top_k_basic`], returning bounds and iteration statistics.
#[allow(clippy::too_many_arguments)]
pub fn retrieve_top_k_basic_run(
    w: &CsMat<f64>,
    query: ExternalId,
    source: usize,
    target: usize,
    k: usize,
    tilde_c: f64,
    layout: &DomainLayout,
    config: &BasicConfig,
) -> Result<BasicRun> {
    BoundedTopKRetriever::new(w, layout, query, source, target, k, tilde_c)?.run(config)
}

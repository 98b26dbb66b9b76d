//! Bidirectional Dijkstra expansion over the domain distance graph.
//!
//! Two [`Frontier`]s grow from the source and the target domain, one settled
//! node per step. The first node settled by both sides gives a provisional
//! source-target distance `L_sd`, which caps both radii at
//! `(L_sd - log10(epsilon)) / 2`. Expansion stops once neither side is both
//! non-empty and within that radius.

use sprs::{CsMat, CsVecView};
use tracing::{debug, trace};

use crate::error::{CrossQueryError, Result};
use crate::heap::IndexedMinHeap;

/// Nonnegative edge lengths between domains, stored row-major.
#[derive(Debug, Clone)]
pub struct DistanceGraph {
    lengths: CsMat<f64>,
}

impl DistanceGraph {
    /// Wrap a square CSR matrix of edge lengths.
    pub fn new(lengths: CsMat<f64>) -> Result<Self> {
        crate::transition::check_square(&lengths)?;
        crate::transition::check_nonnegative(&lengths, "distance")?;
        let lengths = crate::transition::to_csr(&lengths).into_owned();
        Ok(Self { lengths })
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.lengths.rows()
    }

    /// Outgoing edges of `node` as a sparse row.
    pub fn row(&self, node: usize) -> Option<CsVecView<'_, f64>> {
        self.lengths.outer_view(node)
    }

    /// Stored length of edge `(u, v)`, if any.
    pub fn length(&self, u: usize, v: usize) -> Option<f64> {
        self.lengths.get(u, v).copied()
    }
}

/// One side of the bidirectional search.
#[derive(Debug, Clone)]
pub struct Frontier {
    heap: IndexedMinHeap,
    /// Nodes recorded as this side's neighborhood, in settle order.
    neighborhood: Vec<usize>,
    in_neighborhood: Vec<bool>,
    radius: f64,
}

impl Frontier {
    pub fn new(num_nodes: usize, seed: usize) -> Self {
        Self {
            heap: IndexedMinHeap::with_source(num_nodes, seed),
            neighborhood: Vec::new(),
            in_neighborhood: vec![false; num_nodes],
            radius: 0.0,
        }
    }

    /// Still allowed to expand under `max_radius`.
    #[inline]
    pub fn is_active(&self, max_radius: f64) -> bool {
        !self.heap.is_empty() && self.radius <= max_radius
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn neighborhood(&self) -> &[usize] {
        &self.neighborhood
    }

    #[inline]
    pub fn contains(&self, node: usize) -> bool {
        self.in_neighborhood[node]
    }

    pub fn distance(&self, node: usize) -> f64 {
        self.heap.distance(node)
    }

    pub fn distances(&self) -> &[f64] {
        self.heap.distances()
    }

    fn record(&mut self, node: usize) {
        if !self.in_neighborhood[node] {
            self.in_neighborhood[node] = true;
            self.neighborhood.push(node);
        }
    }

    /// Settle the closest open node and relax its outgoing edges.
    ///
    /// Returns the settled node and the new radius (its distance), or `None`
    /// once the heap is empty. The node is not added to the neighborhood.
    pub fn step(&mut self, graph: &DistanceGraph) -> Option<(usize, f64)> {
        let u = self.heap.pop_min()?;
        let du = self.heap.distance(u);
        self.radius = du;
        if let Some(row) = graph.row(u) {
            for (v, &w) in row.iter() {
                self.heap.relax(v, du + w);
            }
        }
        Some((u, du))
    }
}

/// Result of a bidirectional expansion.
#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    /// Provisional shortest source-target distance `L_sd`.
    pub shortest: f64,
    /// Radius cap derived from `shortest`.
    pub max_radius: f64,
    /// First node settled by both sides.
    pub meeting: usize,
    /// `pop_min` calls across both sides during the main loop.
    pub steps: usize,
}

/// Alternating Dijkstra from a source and a target domain.
#[derive(Debug, Clone)]
pub struct BidirectionalExpander<'g> {
    graph: &'g DistanceGraph,
    source: usize,
    target: usize,
    forward: Frontier,
    backward: Frontier,
    steps: usize,
}

impl<'g> BidirectionalExpander<'g> {
    pub fn new(graph: &'g DistanceGraph, source: usize, target: usize) -> Result<Self> {
        let n = graph.num_nodes();
        for domain in [source, target] {
            if domain >= n {
                return Err(CrossQueryError::InvalidDomain {
                    domain,
                    num_domains: n,
                });
            }
        }
        Ok(Self {
            graph,
            source,
            target,
            forward: Frontier::new(n, source),
            backward: Frontier::new(n, target),
            steps: 0,
        })
    }

    pub fn forward(&self) -> &Frontier {
        &self.forward
    }

    pub fn backward(&self) -> &Frontier {
        &self.backward
    }

    /// Run the alternating expansion until both sides are exhausted.
    ///
    /// `slack` is `-log10(epsilon)`. Fails with
    /// [`CrossQueryError::UnreachablePair`] when the sides never meet.
    pub fn run(&mut self, slack: f64) -> Result<ExpansionOutcome> {
        let mut shortest = f64::INFINITY;
        let mut max_radius = f64::INFINITY;
        let mut meeting = None;

        loop {
            let mut progressed = false;

            if self.forward.is_active(max_radius) {
                if let Some((u, _)) = self.forward.step(self.graph) {
                    self.steps += 1;
                    self.forward.record(u);
                    progressed = true;
                    if meeting.is_none() && self.backward.contains(u) {
                        shortest = self.forward.distance(u) + self.backward.distance(u);
                        max_radius = (shortest + slack) / 2.0;
                        meeting = Some(u);
                        debug!(node = u, shortest, max_radius, "neighborhoods met");
                    }
                }
            }

            if self.backward.is_active(max_radius) {
                if let Some((u, _)) = self.backward.step(self.graph) {
                    self.steps += 1;
                    self.backward.record(u);
                    progressed = true;
                    if meeting.is_none() && self.forward.contains(u) {
                        shortest = self.forward.distance(u) + self.backward.distance(u);
                        max_radius = (shortest + slack) / 2.0;
                        meeting = Some(u);
                        debug!(node = u, shortest, max_radius, "neighborhoods met");
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        trace!(
            forward = self.forward.neighborhood.len(),
            backward = self.backward.neighborhood.len(),
            steps = self.steps,
            "expansion exhausted"
        );

        let meeting = meeting.ok_or(CrossQueryError::UnreachablePair {
            source_domain: self.source,
            target_domain: self.target,
        })?;

        Ok(ExpansionOutcome {
            shortest,
            max_radius,
            meeting,
            steps: self.steps,
        })
    }

    /// Finish the distances the main loop left open.
    ///
    /// Nodes only the backward side reached have no final forward distance
    /// (and vice versa). Each side keeps stepping until it has settled all of
    /// them, or until its heap runs dry.
    pub fn full_relax(&mut self) -> usize {
        let mut forward_missing: Vec<usize> = self
            .backward
            .neighborhood
            .iter()
            .copied()
            .filter(|&u| !self.forward.contains(u))
            .collect();
        let mut backward_missing: Vec<usize> = self
            .forward
            .neighborhood
            .iter()
            .copied()
            .filter(|&u| !self.backward.contains(u))
            .collect();

        let before = self.steps;
        self.steps += settle_all(&mut self.forward, self.graph, &mut forward_missing);
        self.steps += settle_all(&mut self.backward, self.graph, &mut backward_missing);
        self.steps - before
    }
}

/// Step `frontier` until every node in `missing` is settled; returns the step count.
fn settle_all(frontier: &mut Frontier, graph: &DistanceGraph, missing: &mut Vec<usize>) -> usize {
    let mut steps = 0;
    while !missing.is_empty() {
        let Some((u, _)) = frontier.step(graph) else {
            break;
        };
        steps += 1;
        if let Some(pos) = missing.iter().position(|&m| m == u) {
            missing.swap_remove(pos);
            frontier.record(u);
        }
    }
    steps
}

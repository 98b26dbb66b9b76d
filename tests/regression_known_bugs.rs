//! Regression tests for failure modes of cross-domain top-k search.
//!
//! Each test pins down a way a straightforward implementation goes wrong:
//! - treating node 0 as "no node" when the heap tracks positions
//! - missing a meeting because both sides are checked only once per round
//! - spinning forever when source and target are not connected
//! - dividing by a zero domain degree and ranking NaN scores
//! - drifting from the single-step tail estimate of the upper bound
//! - breaking threshold ties by anything other than index order

#![allow(clippy::float_cmp)]

mod common;

use common::{dense, ext, uniform};
use crossquery::subnet::{BidirectionalExpander, DistanceGraph};
use crossquery::transition::row_max;
use crossquery::{
    extract_subnet, renormalize_cross, retrieve_top_k_basic_run, BasicConfig, CrossQueryError,
    DomainLayout, IndexedMinHeap, Position,
};

/// Node 0 used to double as the "not in heap" marker, so the source domain
/// was never settled when it had index 0.
#[test]
fn domain_zero_is_settled_like_any_other() {
    let mut heap = IndexedMinHeap::with_source(3, 0);
    assert_eq!(heap.position(0), Position::InHeap(0));
    assert_eq!(heap.pop_min(), Some(0));
    assert!(heap.is_settled(0));
    assert!(!heap.relax(0, -1.0));

    let g = dense(&[
        vec![0.0, 1.0, 0.0],
        vec![1.0, 0.0, 1.0],
        vec![0.0, 1.0, 0.0],
    ]);
    let sub = extract_subnet(&g, 0, 2, 0.01).unwrap();
    assert_eq!(sub.domains, vec![0, 1, 2]);
}

/// Both middle nodes of a diamond are reached by both sides in the same
/// round. The first one settled by both fixes the distance.
#[test]
fn meeting_is_detected_on_the_step_it_happens() {
    let graph = DistanceGraph::new(dense(&[
        vec![0.0, 1.0, 1.0, 0.0],
        vec![1.0, 0.0, 0.0, 1.0],
        vec![1.0, 0.0, 0.0, 1.0],
        vec![0.0, 1.0, 1.0, 0.0],
    ]))
    .unwrap();
    let mut expander = BidirectionalExpander::new(&graph, 0, 3).unwrap();
    let outcome = expander.run(0.5).unwrap();
    assert_eq!(outcome.meeting, 1);
    assert_eq!(outcome.shortest, 2.0);
    assert_eq!(outcome.max_radius, 1.25);
}

/// Two components with no tie between them: the search must give up once
/// both heaps run dry instead of waiting for a meeting.
#[test]
fn disconnected_components_terminate() {
    let n = 40;
    let mut rows = vec![vec![0.0; n]; n];
    for i in 0..n - 1 {
        if i + 1 == n / 2 {
            continue;
        }
        rows[i][i + 1] = 1.0;
        rows[i + 1][i] = 1.0;
    }
    let g = dense(&rows);
    assert_eq!(
        extract_subnet(&g, 0, n - 1, 0.003).unwrap_err(),
        CrossQueryError::UnreachablePair {
            source_domain: 0,
            target_domain: n - 1
        }
    );
    // Within one component the same network is fine.
    let sub = extract_subnet(&g, 0, n / 2 - 1, 0.003).unwrap();
    assert!(sub.domains.iter().all(|&d| d < n / 2));
}

/// A domain without main-network ties has degree 0; normalizing its
/// cross-domain rows must fail instead of producing NaN weights.
#[test]
fn zero_degree_domain_is_reported() {
    let mut toy = uniform(&[2, 2, 2], 0.0, 0.0);
    toy.g = dense(&[
        vec![0.0, 1.0, 0.0],
        vec![1.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0],
    ]);
    assert_eq!(
        renormalize_cross(&toy.y, &toy.g, &toy.layout, &[0, 1, 2]).unwrap_err(),
        CrossQueryError::NumericDegeneracy { domain: 2 }
    );
}

/// `Upper = Lower + tilde_c^(t+1) * Wmax`. Replacing this with the full
/// geometric tail changes which candidates survive near the threshold.
#[test]
fn upper_bound_keeps_single_step_tail() {
    let mut toy = uniform(&[2, 3, 2], 0.2, 1.0);
    toy.boost_cross(0, 3, 0.4);
    let t = toy.transition(0.2, 0.85);
    let wmax = row_max(&t.matrix);
    let run = retrieve_top_k_basic_run(
        &t.matrix,
        ext(0, 0),
        0,
        1,
        1,
        t.tilde_c,
        &toy.layout,
        &BasicConfig::default(),
    )
    .unwrap();
    let tail = t.tilde_c.powi(run.iterations as i32 + 1);
    for (slot, &i) in run.candidates.iter().enumerate() {
        assert_eq!(run.upper[slot], run.lower[slot] + tail * wmax[i]);
    }
}

/// Interchangeable candidates at the threshold go to the lowest global index.
#[test]
fn threshold_ties_prefer_lower_index() {
    let toy = uniform(&[2, 3, 2], 0.2, 1.0);
    let t = toy.transition(0.2, 0.85);
    let run = retrieve_top_k_basic_run(
        &t.matrix,
        ext(0, 0),
        0,
        1,
        1,
        t.tilde_c,
        &toy.layout,
        &BasicConfig::default(),
    )
    .unwrap();
    assert!(run.converged);
    assert_eq!(run.ids, vec![ext(1, 0)]);
}

/// An id listed twice in a domain resolves to its first position.
#[test]
fn duplicate_query_id_uses_first_occurrence() {
    let layout = DomainLayout::new(vec![vec![7, 8, 7], vec![1]]).unwrap();
    assert_eq!(layout.query_index(7, 0), Ok(0));
    assert_eq!(
        layout.query_index(1, 0),
        Err(CrossQueryError::InvalidQuery { query: 1, domain: 0 })
    );
}

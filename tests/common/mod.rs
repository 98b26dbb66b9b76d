//! Toy networks of networks shared by the integration tests.

#![allow(dead_code)]

use crossquery::{mix, renormalize_cross, CsMat, DomainLayout, ExternalId, MixingParams, Transition};
use sprs::TriMat;

/// Matrices and layout of a small NoN.
pub struct Toy {
    pub layout: DomainLayout,
    pub anorm: CsMat<f64>,
    pub y: CsMat<f64>,
    pub g: CsMat<f64>,
}

/// Route `tracing` output to the test harness. Set `RUST_LOG=crossquery=debug`
/// to see extraction and propagation events.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// External id of local node `i` in domain `d`.
pub fn ext(d: usize, i: usize) -> ExternalId {
    (d * 100 + i) as ExternalId
}

pub fn dense(rows: &[Vec<f64>]) -> CsMat<f64> {
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

pub fn layout(sizes: &[usize]) -> DomainLayout {
    DomainLayout::new(
        sizes
            .iter()
            .enumerate()
            .map(|(d, &size)| (0..size).map(|i| ext(d, i)).collect())
            .collect(),
    )
    .unwrap()
}

/// Block-diagonal `Anorm` with every domain a normalized clique.
pub fn clique_anorm(layout: &DomainLayout) -> CsMat<f64> {
    let n = layout.num_nodes();
    let mut rows = vec![vec![0.0; n]; n];
    for d in 0..layout.num_domains() {
        let range = layout.domain_range(d);
        let size = range.len();
        if size < 2 {
            continue;
        }
        let w = 1.0 / (size - 1) as f64;
        for i in range.clone() {
            for j in range.clone() {
                if i != j {
                    rows[i][j] = w;
                }
            }
        }
    }
    dense(&rows)
}

/// Uniform NoN: clique domains, uniform cross weight between every pair of
/// nodes in different domains, and a complete main network of weight `tie`.
pub fn uniform(sizes: &[usize], cross: f64, tie: f64) -> Toy {
    let layout = layout(sizes);
    let n = layout.num_nodes();
    let g_n = sizes.len();
    let domain_of: Vec<usize> = (0..n).map(|i| layout.domain_of(i).unwrap()).collect();

    let mut y = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            if domain_of[i] != domain_of[j] {
                y[i][j] = cross;
            }
        }
    }
    let mut g = vec![vec![0.0; g_n]; g_n];
    for (a, row) in g.iter_mut().enumerate() {
        for (b, v) in row.iter_mut().enumerate() {
            if a != b {
                *v = tie;
            }
        }
    }
    Toy {
        anorm: clique_anorm(&layout),
        y: dense(&y),
        g: dense(&g),
        layout,
    }
}

/// Dense copy of a sparse matrix.
pub fn to_dense(m: &CsMat<f64>) -> Vec<Vec<f64>> {
    let m = m.to_csr();
    let mut rows = vec![vec![0.0; m.cols()]; m.rows()];
    for (i, row) in m.outer_iterator().enumerate() {
        for (j, &v) in row.iter() {
            rows[i][j] = v;
        }
    }
    rows
}

impl Toy {
    /// `Ynorm` over the whole NoN.
    pub fn ynorm(&self) -> CsMat<f64> {
        let all: Vec<usize> = (0..self.layout.num_domains()).collect();
        renormalize_cross(&self.y, &self.g, &self.layout, &all).unwrap()
    }

    pub fn transition(&self, alpha: f64, c: f64) -> Transition {
        mix(&self.anorm, &self.ynorm(), MixingParams::new(alpha, c).unwrap()).unwrap()
    }

    /// Add `extra` to the symmetric cross weight between global nodes `i` and `j`.
    pub fn boost_cross(&mut self, i: usize, j: usize, extra: f64) {
        let mut y = to_dense(&self.y);
        y[i][j] += extra;
        y[j][i] += extra;
        self.y = dense(&y);
    }
}

/// Scores from summing the series `(1 - tilde_c) sum_t tilde_c^t W^t e` for
/// `terms` terms.
pub fn series_scores(w: &CsMat<f64>, start: usize, tilde_c: f64, terms: usize) -> Vec<f64> {
    let w = to_dense(w);
    let n = w.len();
    let mut p = vec![0.0; n];
    p[start] = 1.0;
    let mut score: Vec<f64> = p.iter().map(|x| (1.0 - tilde_c) * x).collect();
    let mut decay = 1.0;
    for _ in 0..terms {
        let next: Vec<f64> = (0..n)
            .map(|i| (0..n).map(|j| w[i][j] * p[j]).sum())
            .collect();
        p = next;
        decay *= tilde_c;
        for i in 0..n {
            score[i] += (1.0 - tilde_c) * decay * p[i];
        }
    }
    score
}

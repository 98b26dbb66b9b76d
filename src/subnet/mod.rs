//! Subnetwork extraction on the main network.
//!
//! Running bound propagation on the full NoN touches every domain, although
//! random-walk mass between a source and a target domain mostly flows through
//! domains that sit on short paths between them. This module finds those
//! domains with a bidirectional Dijkstra search over the main network, after
//! mapping similarities to lengths with `-log10`.
//!
//! # Algorithm
//!
//! 1. Normalize `G` symmetrically and map each tie to `-log10(sim)`.
//! 2. Expand alternately from the source and the target domain
//!    ([`BidirectionalExpander`]). The first shared node yields a provisional
//!    distance `L_sd`; both radii are then capped at
//!    `(L_sd - log10(epsilon)) / 2`.
//! 3. Full relax: finish the distances each side left open for nodes only the
//!    other side reached.
//! 4. Keep `u` iff `Dis_s[u] + Dis_d[u] <= L_sd - log10(epsilon)`.
//!
//! A walk segment of length `l` carries roughly `10^-l` of the mass, so a
//! domain is dropped when routing through it costs more than a factor
//! `epsilon` against the best route.

mod expander;
mod extract;

pub use expander::{BidirectionalExpander, DistanceGraph, ExpansionOutcome, Frontier};
pub use extract::{distance_graph, extract_subnet, Subnetwork};

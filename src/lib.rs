//! crossquery: cross-domain top-k relevance search on a network of networks.
//!
//! A network of networks (NoN) is a set of domain-specific graphs (e.g. one
//! co-author graph per venue) tied together by a main network over the
//! domains and by a cross-domain mapping between nodes that co-occur. Given a
//! query node in a source domain, this crate returns the k nodes of a target
//! domain with the highest random-walk-with-restart relevance, without
//! computing exact scores for the whole NoN.
//!
//! - [`basic`]: bound-propagation top-k on the full transition matrix.
//! - [`subnet`]: bidirectional Dijkstra over the main network that keeps only
//!   the domains on short source-target routes.
//! - [`fast`]: Basic run on the extracted subnetwork.
//! - [`heap`]: indexed min-heap with decrease-key used by the expansion.
//! - [`transition`]: the `W` mixture formula and sparse helpers.
//!
//! # Inputs
//!
//! The normalized matrices are precomputed by the caller:
//!
//! - `Anorm` (n x n): block-diagonal normalized intra-domain adjacency.
//! - `Y` / `Ynorm` (n x n): cross-domain mapping, raw / normalized by degree.
//! - `G` (g x g): main network over the domains.
//! - a [`DomainLayout`] listing the external id of every node, per domain.
//!
//! # Critical Nuances
//!
//! ## Results are sets
//!
//! Both retrievers return the k survivors in global index order, not ranked.
//! Use [`BasicRun::ranked`] to order them by lower bound.
//!
//! ## Accuracy of Fast
//!
//! `epsilon` trades accuracy for speed. Domains whose detour costs more than
//! `-log10(epsilon)` over the best source-target route are dropped, and their
//! walk mass with them. `epsilon` close to 0 keeps the whole reachable main
//! network.
//!
//! ## Concurrency
//!
//! All query state lives in the call. Matrices and layouts are only read, so
//! independent queries may share them across threads.
//!
//! # References
//!
//! - Ni, Tong, Fan, Zhang (2014): "Inside the Atoms: Ranking on a Network of
//!   Networks", KDD.

pub mod basic;
pub mod config;
pub mod error;
pub mod fast;
pub mod heap;
pub mod network;
pub mod subnet;
pub mod transition;

// Re-exports
pub use basic::{
    retrieve_top_k_basic, retrieve_top_k_basic_run, BasicConfig, BasicRun, BoundedTopKRetriever,
    Pruned,
};
pub use config::QueryConfig;
pub use error::{CrossQueryError, Result};
pub use fast::{renormalize_cross, retrieve_top_k_fast, retrieve_top_k_fast_run, FastRun};
pub use heap::{IndexedMinHeap, Position};
pub use network::{DomainLayout, ExternalId};
pub use subnet::{extract_subnet, Subnetwork};
pub use transition::{mix, MixingParams, Transition};

pub use sprs::CsMat;

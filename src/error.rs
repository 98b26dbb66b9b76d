//! Error types for crossquery.

use thiserror::Error;

use crate::network::ExternalId;

/// Errors that can occur while answering a cross-domain query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrossQueryError {
    /// Query node is not a member of the declared source domain.
    #[error("query node {query} is not in source domain {domain}")]
    InvalidQuery { query: ExternalId, domain: usize },

    /// `k` must be at least 1.
    #[error("k must be positive")]
    InvalidK,

    /// Domain index outside the network of networks.
    #[error("domain {domain} out of range ({num_domains} domains)")]
    InvalidDomain { domain: usize, num_domains: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Matrix or vector shape does not match the layout.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A domain has no weight left in the reduced main network, so its
    /// cross-domain block cannot be normalized.
    #[error("zero total weight for domain {domain} in the reduced main network")]
    NumericDegeneracy { domain: usize },

    /// Source and target never meet in the main network.
    #[error("domains {source_domain} and {target_domain} are not connected in the main network")]
    UnreachablePair {
        source_domain: usize,
        target_domain: usize,
    },

    /// Bound propagation ran out of its iteration budget.
    #[error("bound propagation did not settle within {iterations} iterations")]
    IterationLimit { iterations: usize },

    /// Internal invariant broken (logic or input-data defect).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, CrossQueryError>;

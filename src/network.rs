//! Domain layout of a network of networks.
//!
//! Nodes of all domain-specific networks share one global index space: the
//! domains are laid out back to back in a fixed order, so a node's global
//! index is the total size of the preceding domains plus its local index.
//! [`DomainLayout`] owns that bookkeeping together with the per-domain table
//! mapping local rows to external node identifiers (e.g. author ids).

use std::collections::HashSet;
use std::ops::Range;

use crate::error::{CrossQueryError, Result};

/// Identifier of a node outside the global index space.
pub type ExternalId = u64;

/// Per-domain id tables and the offsets that concatenate them.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainLayout {
    ids: Vec<Vec<ExternalId>>,
    /// offsets[d] = first global index of domain d; offsets[g] = n
    offsets: Vec<usize>,
}

impl DomainLayout {
    /// Build a layout from one id list per domain, in domain order.
    pub fn new(ids: Vec<Vec<ExternalId>>) -> Result<Self> {
        if ids.is_empty() {
            return Err(CrossQueryError::InvalidParameter(
                "a network of networks needs at least one domain".into(),
            ));
        }
        let mut offsets = Vec::with_capacity(ids.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for domain in &ids {
            total += domain.len();
            offsets.push(total);
        }
        Ok(Self { ids, offsets })
    }

    /// Layout whose external ids equal the local indices `0..size`.
    pub fn from_sizes(sizes: &[usize]) -> Result<Self> {
        Self::new(
            sizes
                .iter()
                .map(|&size| (0..size as ExternalId).collect())
                .collect(),
        )
    }

    #[inline]
    pub fn num_domains(&self) -> usize {
        self.ids.len()
    }

    /// Total node count `n` across all domains.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.offsets[self.ids.len()]
    }

    pub fn check_domain(&self, domain: usize) -> Result<()> {
        if domain < self.ids.len() {
            Ok(())
        } else {
            Err(CrossQueryError::InvalidDomain {
                domain,
                num_domains: self.ids.len(),
            })
        }
    }

    /// # Panics
    ///
    /// Panics if `domain` is out of range.
    pub fn domain_size(&self, domain: usize) -> usize {
        self.ids[domain].len()
    }

    pub fn domain_sizes(&self) -> Vec<usize> {
        self.ids.iter().map(Vec::len).collect()
    }

    /// Global index range covered by `domain`.
    pub fn domain_range(&self, domain: usize) -> Range<usize> {
        self.offsets[domain]..self.offsets[domain + 1]
    }

    pub fn global_index(&self, domain: usize, local: usize) -> usize {
        self.offsets[domain] + local
    }

    /// Domain owning a global index.
    pub fn domain_of(&self, global: usize) -> Option<usize> {
        if global >= self.num_nodes() {
            return None;
        }
        // offsets is sorted; the owning domain is the last offset <= global
        // among non-empty domains.
        match self.offsets.binary_search(&global) {
            Ok(mut d) => {
                while self.offsets[d + 1] == global {
                    d += 1;
                }
                Some(d)
            }
            Err(d) => Some(d - 1),
        }
    }

    /// External id stored at a global index.
    pub fn external_id(&self, global: usize) -> Option<ExternalId> {
        let domain = self.domain_of(global)?;
        Some(self.ids[domain][global - self.offsets[domain]])
    }

    pub fn ids(&self, domain: usize) -> &[ExternalId] {
        &self.ids[domain]
    }

    /// Global index of external id `query` inside domain `source`.
    ///
    /// The first occurrence wins if the id is listed more than once.
    pub fn query_index(&self, query: ExternalId, source: usize) -> Result<usize> {
        self.check_domain(source)?;
        self.ids[source]
            .iter()
            .position(|&id| id == query)
            .map(|local| self.offsets[source] + local)
            .ok_or(CrossQueryError::InvalidQuery {
                query,
                domain: source,
            })
    }

    /// One-hot query vector `e` of length `n`.
    pub fn query_vector(&self, query: ExternalId, source: usize) -> Result<Vec<f64>> {
        let idx = self.query_index(query, source)?;
        let mut e = vec![0.0; self.num_nodes()];
        e[idx] = 1.0;
        Ok(e)
    }

    /// Layout of the sub-network made of `domains`, in the order given.
    ///
    /// Also returns the original global index of every kept node, in reduced
    /// order, so matrices can be restricted consistently.
    pub fn restrict(&self, domains: &[usize]) -> Result<(DomainLayout, Vec<usize>)> {
        let mut seen = HashSet::with_capacity(domains.len());
        let mut ids = Vec::with_capacity(domains.len());
        let mut kept = Vec::new();
        for &domain in domains {
            self.check_domain(domain)?;
            if !seen.insert(domain) {
                return Err(CrossQueryError::InvalidParameter(format!(
                    "domain {domain} listed twice"
                )));
            }
            ids.push(self.ids[domain].clone());
            kept.extend(self.domain_range(domain));
        }
        Ok((DomainLayout::new(ids)?, kept))
    }
}

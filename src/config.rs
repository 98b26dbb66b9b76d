//! Query configuration.
//!
//! Defaults reproduce the published DBLP setup: `alpha = 0.2`, `c = 0.85`,
//! `epsilon = 0.003`, top 10.

use serde::{Deserialize, Serialize};

use crate::basic::BasicConfig;
use crate::error::{CrossQueryError, Result};
use crate::transition::MixingParams;

/// Parameters of one cross-domain query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Cross-network consistency weight.
    pub alpha: f64,
    /// Query preference weight.
    pub c: f64,
    /// Accuracy factor for subnetwork extraction; larger keeps fewer domains.
    pub epsilon: f64,
    /// Number of nodes to retrieve.
    pub k: usize,
    /// Optional cap on bound-propagation iterations.
    pub max_iterations: Option<usize>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            c: 0.85,
            epsilon: 0.003,
            k: 10,
            max_iterations: None,
        }
    }
}

impl QueryConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_mixing(mut self, alpha: f64, c: f64) -> Self {
        self.alpha = alpha;
        self.c = c;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(CrossQueryError::InvalidK);
        }
        self.mixing().validate()?;
        if !(self.epsilon > 0.0 && self.epsilon < 1.0) {
            return Err(CrossQueryError::InvalidParameter(format!(
                "epsilon must lie in (0, 1), got {}",
                self.epsilon
            )));
        }
        Ok(())
    }

    pub fn mixing(&self) -> MixingParams {
        MixingParams {
            alpha: self.alpha,
            c: self.c,
        }
    }

    pub fn basic_config(&self) -> BasicConfig {
        BasicConfig {
            max_iterations: self.max_iterations,
            ..BasicConfig::default()
        }
    }
}

// ==========================================
// Jury Engine - weight configuration seam
// ==========================================
// The evaluation aggregator reads weights through this trait so tests and
// embedders can supply fixed weights without a config table.
// ==========================================

use crate::domain::evaluation::CriterionWeights;
use crate::repository::error::RepositoryResult;

/// Source of the current criterion weights
pub trait WeightConfig: Send + Sync {
    /// Weights in effect now; always positive and finite
    fn weights(&self) -> RepositoryResult<CriterionWeights>;
}

/// Fixed weights
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticWeights(pub CriterionWeights);

impl WeightConfig for StaticWeights {
    fn weights(&self) -> RepositoryResult<CriterionWeights> {
        Ok(self.0)
    }
}

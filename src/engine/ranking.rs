// ==========================================
// Jury Engine - ranking service
// ==========================================
// Rankings read completed evaluations of published candidates only.
// Results are memoized per (scope, limit, category).
// ==========================================

use crate::cache::{cached, CacheKey, StatisticsCache};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::round2;
use crate::repository::{EvaluationRepository, ReviewerRepository};
use serde::Serialize;
use std::sync::Arc;

/// Largest accepted ranking limit
pub const MAX_RANKING_LIMIT: u32 = 500;

/// One entry of a reviewer's personal ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerRankingEntry {
    pub candidate_id: i64,
    pub name: String,
    pub organization: Option<String>,
    pub total_score: f64,
}

/// One entry of the overall ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallRankingEntry {
    pub candidate_id: i64,
    pub name: String,
    pub organization: Option<String>,
    pub average_score: f64,
    /// Reviewers contributing a completed evaluation
    pub evaluation_count: i64,
}

/// Overall entry with its 1-based position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: OverallRankingEntry,
}

pub struct RankingService {
    reviewer_repo: Arc<ReviewerRepository>,
    evaluation_repo: Arc<EvaluationRepository>,
    cache: Arc<dyn StatisticsCache>,
}

impl RankingService {
    pub fn new(
        reviewer_repo: Arc<ReviewerRepository>,
        evaluation_repo: Arc<EvaluationRepository>,
        cache: Arc<dyn StatisticsCache>,
    ) -> Self {
        Self {
            reviewer_repo,
            evaluation_repo,
            cache,
        }
    }

    fn check_limit(limit: u32) -> EngineResult<()> {
        if limit == 0 || limit > MAX_RANKING_LIMIT {
            return Err(EngineError::validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_RANKING_LIMIT, limit
            )));
        }
        Ok(())
    }

    /// A reviewer's completed evaluations, best first (ties by candidate id)
    pub fn rank_for_reviewer(
        &self,
        reviewer_id: i64,
        limit: u32,
    ) -> EngineResult<Vec<ReviewerRankingEntry>> {
        Self::check_limit(limit)?;
        if !self.reviewer_repo.exists(reviewer_id)? {
            return Err(EngineError::not_found("Reviewer", reviewer_id));
        }

        let key = CacheKey::ReviewerRanking { reviewer_id, limit };
        cached(self.cache.as_ref(), key, || {
            let rows = self.evaluation_repo.completed_for_reviewer(reviewer_id, limit)?;
            Ok(rows
                .into_iter()
                .map(|row| ReviewerRankingEntry {
                    candidate_id: row.candidate_id,
                    name: row.name,
                    organization: row.organization,
                    total_score: row.total_score,
                })
                .collect())
        })
    }

    /// Mean completed total per candidate, best first (ties by candidate id)
    pub fn overall_ranking(
        &self,
        limit: u32,
        category: Option<&str>,
    ) -> EngineResult<Vec<OverallRankingEntry>> {
        Self::check_limit(limit)?;
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        let key = CacheKey::OverallRanking {
            limit,
            category: category.map(str::to_string),
        };
        cached(self.cache.as_ref(), key, || {
            let rows = self.evaluation_repo.candidate_averages(limit, category)?;
            Ok(rows
                .into_iter()
                .map(|row| OverallRankingEntry {
                    candidate_id: row.candidate_id,
                    name: row.name,
                    organization: row.organization,
                    average_score: round2(row.average_score),
                    evaluation_count: row.evaluation_count,
                })
                .collect())
        })
    }

    /// Overall ranking with positions annotated
    pub fn top_candidates(
        &self,
        limit: u32,
        category: Option<&str>,
    ) -> EngineResult<Vec<RankedCandidate>> {
        Ok(self
            .overall_ranking(limit, category)?
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| RankedCandidate {
                rank: idx + 1,
                entry,
            })
            .collect())
    }
}

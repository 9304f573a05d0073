// ==========================================
// Jury Engine - ranking API
// ==========================================

use std::sync::Arc;

use serde::Serialize;

use crate::api::dto::{RankingParams, DEFAULT_RANKING_LIMIT};
use crate::api::error::ApiResult;
use crate::engine::{RankedCandidate, RankingService, ReviewerRankingEntry};

/// Ranking payload: a reviewer's list or the overall list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", content = "entries", rename_all = "snake_case")]
pub enum Rankings {
    Reviewer(Vec<ReviewerRankingEntry>),
    Overall(Vec<RankedCandidate>),
}

impl Rankings {
    pub fn len(&self) -> usize {
        match self {
            Rankings::Reviewer(v) => v.len(),
            Rankings::Overall(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RankingApi {
    ranking: Arc<RankingService>,
}

impl RankingApi {
    pub fn new(ranking: Arc<RankingService>) -> Self {
        Self { ranking }
    }

    /// Reviewer ranking when `reviewer_id` is given, overall otherwise
    pub fn get_rankings(&self, params: RankingParams) -> ApiResult<Rankings> {
        let limit = params.limit.unwrap_or(DEFAULT_RANKING_LIMIT);
        match params.reviewer_id {
            Some(reviewer_id) => Ok(Rankings::Reviewer(
                self.ranking.rank_for_reviewer(reviewer_id, limit)?,
            )),
            None => Ok(Rankings::Overall(
                self.ranking
                    .top_candidates(limit, params.category.as_deref())?,
            )),
        }
    }
}

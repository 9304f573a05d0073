// ==========================================
// Jury Engine - evaluation API
// ==========================================

use std::sync::Arc;

use crate::api::dto::{parse_scores, EvaluationParams, PairParams};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::evaluation::Evaluation;
use crate::engine::{EvaluationAggregator, EvaluationStats, ReviewerProgress, StatisticsService};

pub struct EvaluationApi {
    aggregator: Arc<EvaluationAggregator>,
    statistics: Arc<StatisticsService>,
}

impl EvaluationApi {
    pub fn new(aggregator: Arc<EvaluationAggregator>, statistics: Arc<StatisticsService>) -> Self {
        Self {
            aggregator,
            statistics,
        }
    }

    /// Save a partial evaluation; returns evaluation_id
    pub fn save_draft(&self, params: EvaluationParams) -> ApiResult<i64> {
        let scores = parse_scores(&params.scores)?;
        Ok(self.aggregator.save_draft(
            params.reviewer_id,
            params.candidate_id,
            &scores,
            params.comments.as_deref(),
        )?)
    }

    /// Submit a final evaluation; returns evaluation_id
    pub fn submit_evaluation(&self, params: EvaluationParams) -> ApiResult<i64> {
        let scores = parse_scores(&params.scores)?;
        Ok(self.aggregator.submit_final(
            params.reviewer_id,
            params.candidate_id,
            &scores,
            params.comments.as_deref(),
        )?)
    }

    pub fn get_evaluation(&self, params: PairParams) -> ApiResult<Evaluation> {
        self.aggregator
            .get_evaluation(params.reviewer_id, params.candidate_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "evaluation for reviewer {} and candidate {}",
                    params.reviewer_id, params.candidate_id
                ))
            })
    }

    pub fn get_evaluation_stats(&self) -> ApiResult<EvaluationStats> {
        Ok(self.aggregator.evaluation_statistics()?)
    }

    pub fn get_reviewer_progress(&self, reviewer_id: i64) -> ApiResult<ReviewerProgress> {
        Ok(self.statistics.reviewer_progress(reviewer_id)?)
    }

    pub fn remove_orphaned_evaluations(&self) -> ApiResult<usize> {
        Ok(self.aggregator.remove_orphaned_evaluations()?)
    }
}

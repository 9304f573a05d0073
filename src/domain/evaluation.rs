// ==========================================
// Jury Engine - Evaluation entity
// ==========================================
// One evaluation per (reviewer_id, candidate_id).
// total_score is computed at write time from the weights configured then.
// ==========================================

use crate::domain::types::{Criterion, EvaluationStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lower bound of a criterion score
pub const MIN_SCORE: f64 = 0.0;
/// Upper bound of a criterion score
pub const MAX_SCORE: f64 = 10.0;
/// Decimal places a criterion score may carry; totals are stored at the same precision
pub const SCORE_DECIMALS: i32 = 2;

// ==========================================
// CriterionScores
// ==========================================

/// Per-criterion scores; `None` means "not provided yet" (drafts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub courage: Option<f64>,
    pub innovation: Option<f64>,
    pub implementation: Option<f64>,
    pub relevance: Option<f64>,
    pub visibility: Option<f64>,
}

impl CriterionScores {
    /// All five criteria set to the same value
    pub fn uniform(value: f64) -> Self {
        let mut scores = Self::default();
        for criterion in Criterion::ALL {
            scores.set(criterion, value);
        }
        scores
    }

    pub fn get(&self, criterion: Criterion) -> Option<f64> {
        match criterion {
            Criterion::Courage => self.courage,
            Criterion::Innovation => self.innovation,
            Criterion::Implementation => self.implementation,
            Criterion::Relevance => self.relevance,
            Criterion::Visibility => self.visibility,
        }
    }

    pub fn set(&mut self, criterion: Criterion, value: f64) {
        let slot = match criterion {
            Criterion::Courage => &mut self.courage,
            Criterion::Innovation => &mut self.innovation,
            Criterion::Implementation => &mut self.implementation,
            Criterion::Relevance => &mut self.relevance,
            Criterion::Visibility => &mut self.visibility,
        };
        *slot = Some(value);
    }

    /// Provided scores of `self` over the stored ones in `base`
    pub fn merged_over(&self, base: &CriterionScores) -> CriterionScores {
        let mut merged = *base;
        for criterion in Criterion::ALL {
            if let Some(v) = self.get(criterion) {
                merged.set(criterion, v);
            }
        }
        merged
    }

    pub fn missing(&self) -> Vec<Criterion> {
        Criterion::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Criterion::ALL.iter().all(|c| self.get(*c).is_none())
    }
}

// ==========================================
// CriterionWeights
// ==========================================

/// Criterion -> positive weight; uniform 1.0 by default
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionWeights {
    pub courage: f64,
    pub innovation: f64,
    pub implementation: f64,
    pub relevance: f64,
    pub visibility: f64,
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self {
            courage: 1.0,
            innovation: 1.0,
            implementation: 1.0,
            relevance: 1.0,
            visibility: 1.0,
        }
    }
}

impl CriterionWeights {
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Courage => self.courage,
            Criterion::Innovation => self.innovation,
            Criterion::Implementation => self.implementation,
            Criterion::Relevance => self.relevance,
            Criterion::Visibility => self.visibility,
        }
    }

    pub fn set(&mut self, criterion: Criterion, weight: f64) {
        match criterion {
            Criterion::Courage => self.courage = weight,
            Criterion::Innovation => self.innovation = weight,
            Criterion::Implementation => self.implementation = weight,
            Criterion::Relevance => self.relevance = weight,
            Criterion::Visibility => self.visibility = weight,
        }
    }

    pub fn total(&self) -> f64 {
        Criterion::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// First criterion whose weight is not a positive finite number
    pub fn first_invalid(&self) -> Option<(Criterion, f64)> {
        Criterion::ALL
            .into_iter()
            .map(|c| (c, self.get(c)))
            .find(|(_, w)| !w.is_finite() || *w <= 0.0)
    }
}

// ==========================================
// Evaluation
// ==========================================

/// A reviewer's scored judgment of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluation_id: i64,
    pub reviewer_id: i64,
    pub candidate_id: i64,
    pub scores: CriterionScores,
    pub total_score: f64,
    pub status: EvaluationStatus,
    pub comments: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Row values written by an evaluation upsert
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationUpsert {
    pub scores: CriterionScores,
    pub total_score: f64,
    pub status: EvaluationStatus,
    pub comments: Option<String>,
}

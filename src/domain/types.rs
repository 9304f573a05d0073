// ==========================================
// Jury Engine - domain enums
// ==========================================
// Reviewer status, evaluation status and the five criteria.
// Each enum persists as a lowercase string column.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// ReviewerStatus
// ==========================================

/// Reviewer status
///
/// Only `Active` reviewers take part in new assignment rounds.
/// Inactive/pending reviewers keep the assignments they already hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerStatus {
    Active,
    Inactive,
    Pending,
}

impl ReviewerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewerStatus::Active => "active",
            ReviewerStatus::Inactive => "inactive",
            ReviewerStatus::Pending => "pending",
        }
    }
}

impl Default for ReviewerStatus {
    fn default() -> Self {
        ReviewerStatus::Active
    }
}

impl fmt::Display for ReviewerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ReviewerStatus::Active),
            "inactive" => Ok(ReviewerStatus::Inactive),
            "pending" => Ok(ReviewerStatus::Pending),
            other => Err(format!("unknown reviewer status: {}", other)),
        }
    }
}

// ==========================================
// EvaluationStatus
// ==========================================

/// Evaluation lifecycle
///
/// `Draft -> Completed` only moves forward; a completed evaluation stays
/// editable but never reverts to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Draft,
    Completed,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::Draft => "draft",
            EvaluationStatus::Completed => "completed",
        }
    }

    /// Status after applying `requested` on top of `self`
    pub fn advance(self, requested: EvaluationStatus) -> EvaluationStatus {
        match (self, requested) {
            (EvaluationStatus::Completed, _) => EvaluationStatus::Completed,
            (EvaluationStatus::Draft, next) => next,
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(EvaluationStatus::Draft),
            "completed" => Ok(EvaluationStatus::Completed),
            other => Err(format!("unknown evaluation status: {}", other)),
        }
    }
}

// ==========================================
// Criterion
// ==========================================

/// The five fixed evaluation criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Courage,
    Innovation,
    Implementation,
    Relevance,
    Visibility,
}

impl Criterion {
    /// All criteria in storage order
    pub const ALL: [Criterion; 5] = [
        Criterion::Courage,
        Criterion::Innovation,
        Criterion::Implementation,
        Criterion::Relevance,
        Criterion::Visibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Courage => "courage",
            Criterion::Innovation => "innovation",
            Criterion::Implementation => "implementation",
            Criterion::Relevance => "relevance",
            Criterion::Visibility => "visibility",
        }
    }

    /// Human readable label used in validation messages
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Courage => "Courage & Pioneer Spirit",
            Criterion::Innovation => "Innovation Degree",
            Criterion::Implementation => "Implementation & Impact",
            Criterion::Relevance => "Mobility Transformation Relevance",
            Criterion::Visibility => "Role Model & Visibility",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = String;

    /// Accepts both `courage` and the legacy `courage_score` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let key = key.strip_suffix("_score").unwrap_or(&key);
        match key {
            "courage" => Ok(Criterion::Courage),
            "innovation" => Ok(Criterion::Innovation),
            "implementation" => Ok(Criterion::Implementation),
            "relevance" => Ok(Criterion::Relevance),
            "visibility" => Ok(Criterion::Visibility),
            other => Err(format!("unknown criterion: {}", other)),
        }
    }
}

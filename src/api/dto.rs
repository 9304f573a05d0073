// ==========================================
// Jury Engine - request payloads
// ==========================================
// Payloads arrive as loosely typed JSON. Enum-like fields stay strings and
// scores stay raw JSON here so that parse failures can name the field.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::evaluation::CriterionScores;
use crate::domain::types::Criterion;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Actor recorded when a request does not name one
pub const DEFAULT_ACTOR: &str = "system";
/// Ranking size when a request does not give a limit
pub const DEFAULT_RANKING_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutoAssignParams {
    pub strategy: Option<String>,
    pub candidates_per_reviewer: Option<u32>,
    #[serde(default)]
    pub clear_existing: bool,
    pub reviewers_per_candidate: Option<u32>,
    pub seed: Option<u64>,
    pub unmatched_policy: Option<String>,
    pub assigned_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualAssignParams {
    pub candidate_id: i64,
    pub reviewer_ids: Vec<i64>,
    pub assigned_by: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PairParams {
    pub reviewer_id: i64,
    pub candidate_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReviewerParams {
    pub reviewer_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CandidateIdParams {
    pub candidate_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationParams {
    pub reviewer_id: i64,
    pub candidate_id: i64,
    /// Criterion -> score; names may carry a `_score` suffix
    #[serde(default)]
    pub scores: Value,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingParams {
    pub reviewer_id: Option<i64>,
    pub limit: Option<u32>,
    pub category: Option<String>,
}

/// Candidate registration/update
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateParams {
    pub candidate_id: i64,
    pub name: String,
    pub organization: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    pub published: Option<bool>,
}

/// Reviewer registration/update
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewerRecordParams {
    pub reviewer_id: i64,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    pub max_assignments: Option<u32>,
    pub status: Option<String>,
}

/// Partial configuration update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdateParams {
    /// criterion -> weight; criteria not named keep their current weight
    pub criteria_weights: Option<BTreeMap<String, f64>>,
    pub default_candidates_per_reviewer: Option<u32>,
    pub default_max_assignments: Option<u32>,
    pub stats_cache_ttl_minutes: Option<u64>,
    pub unmatched_policy: Option<String>,
}

/// Parse a JSON score object into typed scores
///
/// - `null` or a missing object gives no scores
/// - numbers and numeric strings are accepted
/// - `null` values are treated as "not provided"
/// - unknown criterion names and non-numeric values are rejected by name
pub fn parse_scores(raw: &Value) -> ApiResult<CriterionScores> {
    let mut scores = CriterionScores::default();
    let object = match raw {
        Value::Null => return Ok(scores),
        Value::Object(map) => map,
        other => {
            return Err(ApiError::InvalidInput(format!(
                "scores must be an object, got {}",
                json_type_name(other)
            )))
        }
    };

    for (key, value) in object {
        let criterion = key
            .parse::<Criterion>()
            .map_err(ApiError::InvalidInput)?;
        let number = match value {
            Value::Null => continue,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(v) => scores.set(criterion, v),
            None => {
                return Err(ApiError::InvalidInput(format!(
                    "{} must be a number, got {}",
                    criterion.as_str(),
                    value
                )))
            }
        }
    }
    Ok(scores)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

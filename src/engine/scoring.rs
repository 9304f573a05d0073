// ==========================================
// Jury Engine - score validation and weighting
// ==========================================

use crate::domain::evaluation::{
    CriterionScores, CriterionWeights, MAX_SCORE, MIN_SCORE, SCORE_DECIMALS,
};
use crate::domain::types::Criterion;
use crate::engine::error::{EngineError, EngineResult};

/// Check every provided score is finite, within [MIN_SCORE, MAX_SCORE] and
/// carries at most SCORE_DECIMALS decimal places
///
/// The precision limit keeps the rounded total of five equal scores equal to
/// that score under any weights.
pub fn validate_scores(scores: &CriterionScores) -> EngineResult<()> {
    for criterion in Criterion::ALL {
        if let Some(value) = scores.get(criterion) {
            if !value.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(EngineError::validation(format!(
                    "{} ({}) must be between {} and {}, got {}",
                    criterion.as_str(),
                    criterion.label(),
                    MIN_SCORE,
                    MAX_SCORE,
                    value
                )));
            }
            if !has_score_precision(value) {
                return Err(EngineError::validation(format!(
                    "{} ({}) allows at most {} decimal places, got {}",
                    criterion.as_str(),
                    criterion.label(),
                    SCORE_DECIMALS,
                    value
                )));
            }
        }
    }
    Ok(())
}

fn has_score_precision(value: f64) -> bool {
    let scaled = value * 10f64.powi(SCORE_DECIMALS);
    (scaled - scaled.round()).abs() < 1e-6
}

/// Weighted mean over all five criteria, rounded to 2 decimals
///
/// A criterion without a score contributes 0.
pub fn weighted_total(scores: &CriterionScores, weights: &CriterionWeights) -> f64 {
    let weight_sum = weights.total();
    if weight_sum <= 0.0 || !weight_sum.is_finite() {
        return 0.0;
    }
    let weighted: f64 = Criterion::ALL
        .iter()
        .map(|c| scores.get(*c).unwrap_or(0.0) * weights.get(*c))
        .sum();
    round2(weighted / weight_sum)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: [f64; 5]) -> CriterionScores {
        let mut s = CriterionScores::default();
        for (c, v) in Criterion::ALL.into_iter().zip(values) {
            s.set(c, v);
        }
        s
    }

    #[test]
    fn test_uniform_weights_mean() {
        let total = weighted_total(&scores([8.0, 6.0, 7.0, 9.0, 5.0]), &CriterionWeights::default());
        assert_eq!(total, 7.0);
    }

    #[test]
    fn test_weights_shift_total() {
        let mut weights = CriterionWeights::default();
        weights.set(Criterion::Courage, 3.0);
        // (10*3 + 0*4) / 7
        let total = weighted_total(&scores([10.0, 0.0, 0.0, 0.0, 0.0]), &weights);
        assert_eq!(total, 4.29);
    }

    #[test]
    fn test_equal_scores_survive_any_weights() {
        let mut weights = CriterionWeights::default();
        weights.set(Criterion::Courage, 3.0);
        weights.set(Criterion::Implementation, 2.5);
        weights.set(Criterion::Visibility, 0.5);

        for hundredths in 0..=1000 {
            let x = f64::from(hundredths) / 100.0;
            let uniform = scores([x; 5]);
            assert!(validate_scores(&uniform).is_ok(), "x = {}", x);
            assert_eq!(weighted_total(&uniform, &weights), x, "x = {}", x);
        }
    }

    #[test]
    fn test_validate_rejects_extra_precision() {
        let fine = CriterionScores {
            innovation: Some(3.337),
            ..Default::default()
        };
        let err = validate_scores(&fine).unwrap_err().to_string();
        assert!(err.contains("innovation"), "got {err}");
        assert!(err.contains("decimal places"), "got {err}");

        assert!(validate_scores(&scores([7.35, 0.1, 9.99, 0.01, 4.2])).is_ok());
    }

    #[test]
    fn test_missing_criterion_counts_as_zero() {
        let partial = CriterionScores {
            courage: Some(10.0),
            ..Default::default()
        };
        assert_eq!(weighted_total(&partial, &CriterionWeights::default()), 2.0);
    }

    #[test]
    fn test_validate_names_offending_criterion() {
        let bad = CriterionScores {
            relevance: Some(10.5),
            ..Default::default()
        };
        let err = validate_scores(&bad).unwrap_err().to_string();
        assert!(err.contains("relevance"), "got {err}");

        let nan = CriterionScores {
            courage: Some(f64::NAN),
            ..Default::default()
        };
        assert!(validate_scores(&nan).is_err());
        assert!(validate_scores(&scores([0.0, 10.0, 5.5, 0.0, 10.0])).is_ok());
    }
}

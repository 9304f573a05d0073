// ==========================================
// Jury Engine - domain layer
// ==========================================
// Entities and value types. No I/O.
// ==========================================

pub mod assignment;
pub mod candidate;
pub mod evaluation;
pub mod reviewer;
pub mod types;

pub use assignment::{Assignment, InsertOutcome};
pub use candidate::Candidate;
pub use evaluation::{
    CriterionScores, CriterionWeights, Evaluation, EvaluationUpsert, MAX_SCORE, MIN_SCORE,
    SCORE_DECIMALS,
};
pub use reviewer::{Reviewer, DEFAULT_MAX_ASSIGNMENTS};
pub use types::{Criterion, EvaluationStatus, ReviewerStatus};

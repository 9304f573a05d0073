// ==========================================
// Jury Engine - repository layer
// ==========================================
// Data access only, no business rules.
// All queries are parameterized.
// ==========================================

pub mod assignment_repo;
pub mod candidate_repo;
pub mod error;
pub mod evaluation_repo;
pub mod reviewer_repo;
pub mod row_utils;

pub use assignment_repo::{
    AssignmentMove, AssignmentRepository, BulkInsertReport, PairFailure, ReviewerLoadRow,
};
pub use candidate_repo::CandidateRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use evaluation_repo::{
    CandidateAverageRow, EvaluationCounts, EvaluationRepository, ReviewerScoreRow,
};
pub use reviewer_repo::ReviewerRepository;

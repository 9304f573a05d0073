// ==========================================
// Jury Engine - engine layer
// ==========================================
// Business rules. No SQL here; storage goes through repositories.
// ==========================================

pub mod allocation;
pub mod assignment;
pub mod error;
pub mod evaluation;
pub mod ranking;
pub mod scoring;
pub mod statistics;
pub mod strategy;

pub use allocation::{
    strategy_for, AllocationInput, AllocationPlan, AllocationStrategy, BalancedStrategy,
    CategoryStrategy, ExpertiseStrategy, LoadBook, RandomStrategy,
};
pub use assignment::{
    AssignmentEngine, AutoAssignReport, AutoAssignRequest, DistributionQuality, DistributionStats,
    ItemFailure, ManualAssignReport, RebalanceReport,
};
pub use error::{EngineError, EngineResult};
pub use evaluation::{EvaluationAggregator, EvaluationStats};
pub use ranking::{
    OverallRankingEntry, RankedCandidate, RankingService, ReviewerRankingEntry, MAX_RANKING_LIMIT,
};
pub use statistics::{AssignmentStats, ReviewerProgress, StatisticsService};
pub use strategy::{AssignmentStrategy, UnmatchedPolicy};

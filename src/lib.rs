// ==========================================
// Jury Engine - core library
// ==========================================
// Reviewer assignment, weighted evaluation scoring and rankings for an
// awards jury. Storage: SQLite via rusqlite.
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - entities and value types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Engine layer - business rules
pub mod engine;

// Configuration
pub mod config;

// Statistics memoization
pub mod cache;

// Database infrastructure (connection setup, schema)
pub mod db;

// Logging
pub mod logging;

// Per-request timing
pub mod perf;

// API layer - typed request handling
pub mod api;

// Application layer - state wiring and JSON dispatch
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::{
    Assignment, Candidate, Criterion, CriterionScores, CriterionWeights, Evaluation,
    EvaluationStatus, Reviewer, ReviewerStatus,
};

pub use engine::{
    AssignmentEngine, AssignmentStrategy, EngineError, EvaluationAggregator, RankingService,
    StatisticsService, UnmatchedPolicy,
};

pub use api::{ApiError, AssignmentApi, EvaluationApi, RankingApi, RegistryApi};

pub use app::{AppState, RpcRequest, RpcResponse};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Jury Engine";

// ==========================================
// Jury Engine - API layer
// ==========================================
// Typed request handling: parses payloads, applies defaults, maps errors
// to stable codes. Business rules stay in the engine layer.
// ==========================================

pub mod assignment_api;
pub mod config_api;
pub mod dto;
pub mod error;
pub mod evaluation_api;
pub mod ranking_api;
pub mod registry_api;

pub use assignment_api::AssignmentApi;
pub use config_api::ConfigApi;
pub use dto::{
    parse_scores, AutoAssignParams, CandidateIdParams, CandidateParams, ConfigUpdateParams,
    EvaluationParams, ManualAssignParams, PairParams, RankingParams, ReviewerParams,
    ReviewerRecordParams,
};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use evaluation_api::EvaluationApi;
pub use ranking_api::{RankingApi, Rankings};
pub use registry_api::RegistryApi;

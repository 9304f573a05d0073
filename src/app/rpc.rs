// ==========================================
// Jury Engine - JSON request dispatch
// ==========================================
// One JSON object per request, `action` selects the operation and the
// remaining fields are its parameters:
//   {"action": "save_draft", "reviewer_id": 1, "candidate_id": 2, "scores": {...}}
// Responses use one envelope:
//   {"success": true, "data": ...}
//   {"success": false, "error": {"code", "message", "details"}}
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::{
    ApiError, ApiResult, AutoAssignParams, CandidateIdParams, CandidateParams, ConfigUpdateParams,
    ErrorResponse, EvaluationParams, ManualAssignParams, PairParams, RankingParams, ReviewerParams,
    ReviewerRecordParams,
};
use crate::app::state::AppState;
use crate::perf::PerfGuard;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RpcRequest {
    // ===== registry =====
    UpsertCandidate(CandidateParams),
    UpsertReviewer(ReviewerRecordParams),

    // ===== assignments =====
    AutoAssign(AutoAssignParams),
    ManualAssign(ManualAssignParams),
    RemoveAssignment(PairParams),
    RemoveReviewerAssignments(ReviewerParams),
    RemoveCandidateAssignments(CandidateIdParams),
    ClearAssignments,
    GetAssignmentStats,
    GetDistributionStats,
    RebalanceAssignments,
    GetUnassignedCandidates,

    // ===== evaluations =====
    SaveDraft(EvaluationParams),
    SubmitEvaluation(EvaluationParams),
    GetEvaluation(PairParams),
    GetEvaluationStats,
    GetReviewerProgress(ReviewerParams),
    RemoveOrphanedEvaluations,

    // ===== rankings =====
    GetRankings(RankingParams),

    // ===== configuration =====
    GetConfig,
    UpdateConfig(ConfigUpdateParams),
}

impl RpcRequest {
    pub fn action(&self) -> &'static str {
        match self {
            RpcRequest::UpsertCandidate(_) => "upsert_candidate",
            RpcRequest::UpsertReviewer(_) => "upsert_reviewer",
            RpcRequest::AutoAssign(_) => "auto_assign",
            RpcRequest::ManualAssign(_) => "manual_assign",
            RpcRequest::RemoveAssignment(_) => "remove_assignment",
            RpcRequest::RemoveReviewerAssignments(_) => "remove_reviewer_assignments",
            RpcRequest::RemoveCandidateAssignments(_) => "remove_candidate_assignments",
            RpcRequest::ClearAssignments => "clear_assignments",
            RpcRequest::GetAssignmentStats => "get_assignment_stats",
            RpcRequest::GetDistributionStats => "get_distribution_stats",
            RpcRequest::RebalanceAssignments => "rebalance_assignments",
            RpcRequest::GetUnassignedCandidates => "get_unassigned_candidates",
            RpcRequest::SaveDraft(_) => "save_draft",
            RpcRequest::SubmitEvaluation(_) => "submit_evaluation",
            RpcRequest::GetEvaluation(_) => "get_evaluation",
            RpcRequest::GetEvaluationStats => "get_evaluation_stats",
            RpcRequest::GetReviewerProgress(_) => "get_reviewer_progress",
            RpcRequest::RemoveOrphanedEvaluations => "remove_orphaned_evaluations",
            RpcRequest::GetRankings(_) => "get_rankings",
            RpcRequest::GetConfig => "get_config",
            RpcRequest::UpdateConfig(_) => "update_config",
        }
    }
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl RpcResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(err: &ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_response()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"error":{{"code":"INTERNAL_ERROR","message":"response encoding failed: {}","details":null}}}}"#,
                e
            )
        })
    }
}

/// Parse and dispatch one raw JSON request
pub fn handle_json(state: &AppState, raw: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(raw) {
        Ok(request) => dispatch(state, request),
        Err(e) => {
            let err = ApiError::InvalidInput(format!("malformed request: {}", e));
            tracing::warn!(error = %err, "request rejected");
            RpcResponse::err(&err)
        }
    }
}

/// Run one request against the app state
pub fn dispatch(state: &AppState, request: RpcRequest) -> RpcResponse {
    let action = request.action();
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("rpc", action, %request_id);
    let _enter = span.enter();
    let _perf = PerfGuard::new(action);

    match execute(state, request) {
        Ok(data) => RpcResponse::ok(data),
        Err(err) => {
            tracing::warn!(code = err.code(), error = %err, "request failed");
            RpcResponse::err(&err)
        }
    }
}

fn execute(state: &AppState, request: RpcRequest) -> ApiResult<Value> {
    let assignments = &state.assignment_api;
    let evaluations = &state.evaluation_api;

    match request {
        RpcRequest::UpsertCandidate(p) => to_value(state.registry_api.upsert_candidate(p)?),
        RpcRequest::UpsertReviewer(p) => to_value(state.registry_api.upsert_reviewer(p)?),
        RpcRequest::AutoAssign(p) => to_value(assignments.auto_assign(p)?),
        RpcRequest::ManualAssign(p) => to_value(assignments.manual_assign(p)?),
        RpcRequest::RemoveAssignment(p) => to_value(assignments.remove_assignment(p)?),
        RpcRequest::RemoveReviewerAssignments(p) => {
            to_value(assignments.remove_reviewer_assignments(p.reviewer_id)?)
        }
        RpcRequest::RemoveCandidateAssignments(p) => {
            to_value(assignments.remove_candidate_assignments(p.candidate_id)?)
        }
        RpcRequest::ClearAssignments => to_value(assignments.clear_assignments()?),
        RpcRequest::GetAssignmentStats => to_value(assignments.get_assignment_stats()?),
        RpcRequest::GetDistributionStats => to_value(assignments.get_distribution_stats()?),
        RpcRequest::RebalanceAssignments => to_value(assignments.rebalance_assignments()?),
        RpcRequest::GetUnassignedCandidates => {
            to_value(assignments.get_unassigned_candidates()?)
        }
        RpcRequest::SaveDraft(p) => {
            let evaluation_id = evaluations.save_draft(p)?;
            to_value(serde_json::json!({ "evaluation_id": evaluation_id }))
        }
        RpcRequest::SubmitEvaluation(p) => {
            let evaluation_id = evaluations.submit_evaluation(p)?;
            to_value(serde_json::json!({ "evaluation_id": evaluation_id }))
        }
        RpcRequest::GetEvaluation(p) => to_value(evaluations.get_evaluation(p)?),
        RpcRequest::GetEvaluationStats => to_value(evaluations.get_evaluation_stats()?),
        RpcRequest::GetReviewerProgress(p) => {
            to_value(evaluations.get_reviewer_progress(p.reviewer_id)?)
        }
        RpcRequest::RemoveOrphanedEvaluations => {
            to_value(evaluations.remove_orphaned_evaluations()?)
        }
        RpcRequest::GetRankings(p) => to_value(state.ranking_api.get_rankings(p)?),
        RpcRequest::GetConfig => to_value(state.config_api.get_config()?),
        RpcRequest::UpdateConfig(p) => to_value(state.config_api.update_config(p)?),
    }
}

fn to_value<T: Serialize>(data: T) -> ApiResult<Value> {
    serde_json::to_value(data)
        .map_err(|e| ApiError::InternalError(format!("response encoding failed: {}", e)))
}

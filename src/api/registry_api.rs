// ==========================================
// Jury Engine - candidate/reviewer registry API
// ==========================================
// Entities are owned by the host system; this is the write path it uses
// to mirror them into the engine database.
// ==========================================

use std::sync::Arc;

use crate::api::dto::{CandidateParams, ReviewerRecordParams};
use crate::api::error::{ApiError, ApiResult};
use crate::cache::StatisticsCache;
use crate::config::ConfigManager;
use crate::domain::candidate::Candidate;
use crate::domain::reviewer::Reviewer;
use crate::domain::types::ReviewerStatus;
use crate::repository::{CandidateRepository, ReviewerRepository};

pub struct RegistryApi {
    candidate_repo: Arc<CandidateRepository>,
    reviewer_repo: Arc<ReviewerRepository>,
    config: Arc<ConfigManager>,
    cache: Arc<dyn StatisticsCache>,
}

impl RegistryApi {
    pub fn new(
        candidate_repo: Arc<CandidateRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
        config: Arc<ConfigManager>,
        cache: Arc<dyn StatisticsCache>,
    ) -> Self {
        Self {
            candidate_repo,
            reviewer_repo,
            config,
            cache,
        }
    }

    pub fn upsert_candidate(&self, params: CandidateParams) -> ApiResult<Candidate> {
        let name = required_name(&params.name, "candidate")?;
        let candidate = Candidate {
            candidate_id: params.candidate_id,
            name,
            organization: params
                .organization
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            categories: clean_tags(params.categories),
            expertise: clean_tags(params.expertise),
            published: params.published.unwrap_or(true),
        };

        self.candidate_repo.upsert(&candidate)?;
        // Candidate fields show up in every reviewer's ranking
        self.cache.invalidate_all();
        tracing::info!(candidate_id = candidate.candidate_id, "candidate saved");
        Ok(candidate)
    }

    pub fn upsert_reviewer(&self, params: ReviewerRecordParams) -> ApiResult<Reviewer> {
        let name = required_name(&params.name, "reviewer")?;
        let status = match params.status.as_deref() {
            Some(s) => s.parse::<ReviewerStatus>().map_err(ApiError::ValidationError)?,
            None => ReviewerStatus::default(),
        };
        let max_assignments = match params.max_assignments {
            Some(0) => {
                return Err(ApiError::ValidationError(
                    "max_assignments must be at least 1".to_string(),
                ))
            }
            Some(v) => v,
            None => self.config.get_default_max_assignments()?,
        };

        let reviewer = Reviewer::new(params.reviewer_id, name)
            .with_categories(clean_tags(params.categories))
            .with_expertise(clean_tags(params.expertise))
            .with_max_assignments(max_assignments)
            .with_status(status);

        self.reviewer_repo.upsert(&reviewer)?;
        self.cache.invalidate_reviewer(reviewer.reviewer_id);
        self.cache.invalidate_global();
        tracing::info!(reviewer_id = reviewer.reviewer_id, status = %status, "reviewer saved");
        Ok(reviewer)
    }
}

fn required_name(name: &str, what: &str) -> ApiResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationError(format!("{} name is required", what)));
    }
    Ok(trimmed.to_string())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

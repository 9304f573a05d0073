// ==========================================
// Jury Engine - Reviewer (jury member) entity
// ==========================================

use crate::domain::types::ReviewerStatus;
use serde::{Deserialize, Serialize};

/// Default per-reviewer capacity when none is configured
pub const DEFAULT_MAX_ASSIGNMENTS: u32 = 50;

/// Jury member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    pub reviewer_id: i64,
    pub name: String,
    pub categories: Vec<String>,
    pub expertise: Vec<String>,
    /// Upper bound on assignments held at any time
    pub max_assignments: u32,
    pub status: ReviewerStatus,
}

impl Reviewer {
    pub fn new(reviewer_id: i64, name: impl Into<String>) -> Self {
        Self {
            reviewer_id,
            name: name.into(),
            categories: Vec::new(),
            expertise: Vec::new(),
            max_assignments: DEFAULT_MAX_ASSIGNMENTS,
            status: ReviewerStatus::Active,
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expertise<I, S>(mut self, expertise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = expertise.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: ReviewerStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_max_assignments(mut self, max_assignments: u32) -> Self {
        self.max_assignments = max_assignments;
        self
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category.trim()))
    }

    /// Number of expertise tags shared with `tags` (case-insensitive)
    pub fn expertise_overlap(&self, tags: &[String]) -> usize {
        tags.iter()
            .filter(|t| self.expertise.iter().any(|e| e.eq_ignore_ascii_case(t)))
            .count()
    }
}

// ==========================================
// Jury Engine - Candidate entity
// ==========================================
// Created externally; the engine only reads categories/expertise.
// ==========================================

use serde::{Deserialize, Serialize};

/// Candidate under evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: i64,
    pub name: String,
    pub organization: Option<String>,
    /// Award categories, first entry is the primary category
    pub categories: Vec<String>,
    pub expertise: Vec<String>,
    /// Unpublished candidates are ignored by assignment rounds and rankings
    pub published: bool,
}

impl Candidate {
    pub fn new(candidate_id: i64, name: impl Into<String>) -> Self {
        Self {
            candidate_id,
            name: name.into(),
            organization: None,
            categories: Vec::new(),
            expertise: Vec::new(),
            published: true,
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

    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Case-insensitive category membership
    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category.trim()))
    }
}

// ==========================================
// Jury Engine - Assignment entity
// ==========================================
// Invariant: (reviewer_id, candidate_id) is unique. The storage layer
// enforces it with a UNIQUE constraint.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Reviewer <-> candidate pairing granting evaluation permission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: i64,
    pub reviewer_id: i64,
    pub candidate_id: i64,
    pub assigned_at: NaiveDateTime,
    pub assigned_by: String,
}

/// Outcome of a single guarded insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(i64),
    /// The pair already existed (pre-check or UNIQUE violation)
    AlreadyExists,
}

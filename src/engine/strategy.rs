// ==========================================
// Jury Engine - allocation strategy names
// ==========================================
// The strategy enum is what requests and config carry; each variant maps to
// one AllocationStrategy implementation in engine::allocation.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Allocation strategy for auto-assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    Balanced,
    Random,
    Expertise,
    Category,
}

impl AssignmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStrategy::Balanced => "balanced",
            AssignmentStrategy::Random => "random",
            AssignmentStrategy::Expertise => "expertise",
            AssignmentStrategy::Category => "category",
        }
    }
}

impl Default for AssignmentStrategy {
    fn default() -> Self {
        AssignmentStrategy::Balanced
    }
}

impl fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced" => Ok(AssignmentStrategy::Balanced),
            "random" => Ok(AssignmentStrategy::Random),
            "expertise" | "expertise_match" | "expertise-match" => {
                Ok(AssignmentStrategy::Expertise)
            }
            "category" | "category_based" | "category-based" => Ok(AssignmentStrategy::Category),
            other => Err(format!("unknown assignment strategy: {}", other)),
        }
    }
}

/// What happens to candidates a matching strategy cannot place
///
/// - `Deferred`: placed by the balanced rule after every matched candidate
/// - `Immediate`: placed by the balanced rule in candidate order
/// - `Skip`: left unassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    Deferred,
    Immediate,
    Skip,
}

impl UnmatchedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmatchedPolicy::Deferred => "deferred",
            UnmatchedPolicy::Immediate => "immediate",
            UnmatchedPolicy::Skip => "skip",
        }
    }
}

impl Default for UnmatchedPolicy {
    fn default() -> Self {
        UnmatchedPolicy::Deferred
    }
}

impl fmt::Display for UnmatchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UnmatchedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deferred" => Ok(UnmatchedPolicy::Deferred),
            "immediate" => Ok(UnmatchedPolicy::Immediate),
            "skip" => Ok(UnmatchedPolicy::Skip),
            other => Err(format!("unknown unmatched policy: {}", other)),
        }
    }
}

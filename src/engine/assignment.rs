// ==========================================
// Jury Engine - assignment engine
// ==========================================
// Responsibilities:
// - automatic rounds (planned and written in one IMMEDIATE transaction)
// - manual assignment with per-reviewer outcomes
// - removal, clearing and rebalancing
// - distribution quality
// Every write invalidates the statistics cache after commit.
// ==========================================

use crate::cache::{cached, CacheKey, StatisticsCache};
use crate::config::CANDIDATES_PER_REVIEWER_RANGE;
use crate::domain::assignment::InsertOutcome;
use crate::domain::candidate::Candidate;
use crate::engine::allocation::{strategy_for, AllocationInput};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::round2;
use crate::engine::strategy::{AssignmentStrategy, UnmatchedPolicy};
use crate::repository::{
    AssignmentMove, AssignmentRepository, CandidateRepository, PairFailure, RepositoryError,
    ReviewerRepository,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// Requests / reports
// ==========================================

/// One automatic assignment round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoAssignRequest {
    pub strategy: AssignmentStrategy,
    /// Per-reviewer quota for this round (1..=50)
    pub candidates_per_reviewer: u32,
    /// Delete every assignment in the same transaction first
    pub clear_existing: bool,
    /// Distinct reviewers each candidate should end up with
    pub reviewers_per_candidate: u32,
    /// Seed for the random strategy; drawn fresh when absent
    pub seed: Option<u64>,
    pub unmatched_policy: UnmatchedPolicy,
    pub assigned_by: String,
}

impl Default for AutoAssignRequest {
    fn default() -> Self {
        Self {
            strategy: AssignmentStrategy::Balanced,
            candidates_per_reviewer: crate::config::DEFAULT_CANDIDATES_PER_REVIEWER,
            clear_existing: false,
            reviewers_per_candidate: 1,
            seed: None,
            unmatched_policy: UnmatchedPolicy::Deferred,
            assigned_by: "system".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoAssignReport {
    pub strategy: String,
    pub created: usize,
    pub skipped: usize,
    pub cleared: usize,
    /// Candidates left below the coverage target
    pub unassigned: Vec<i64>,
    pub errors: Vec<PairFailure>,
    /// Seed actually used by the random strategy
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub reviewer_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManualAssignReport {
    pub success_count: usize,
    /// Reviewers that already held the candidate
    pub skipped: Vec<i64>,
    pub errors: Vec<ItemFailure>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebalanceReport {
    pub moved: usize,
    pub target_per_reviewer: u32,
    pub moves: Vec<AssignmentMove>,
}

/// Quality band of the load spread (population standard deviation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    /// No assignments yet
    NotApplicable,
}

impl DistributionQuality {
    pub fn from_std_deviation(std_dev: f64) -> Self {
        if std_dev <= 1.5 {
            DistributionQuality::Excellent
        } else if std_dev <= 3.0 {
            DistributionQuality::Good
        } else if std_dev <= 5.0 {
            DistributionQuality::Fair
        } else {
            DistributionQuality::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats {
    pub total_assignments: i64,
    /// Reviewers holding at least one assignment
    pub reviewer_count: usize,
    pub average: f64,
    pub min: i64,
    pub max: i64,
    pub std_deviation: f64,
    pub quality: DistributionQuality,
}

// ==========================================
// AssignmentEngine
// ==========================================

pub struct AssignmentEngine {
    candidate_repo: Arc<CandidateRepository>,
    reviewer_repo: Arc<ReviewerRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    cache: Arc<dyn StatisticsCache>,
}

impl AssignmentEngine {
    pub fn new(
        candidate_repo: Arc<CandidateRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        cache: Arc<dyn StatisticsCache>,
    ) -> Self {
        Self {
            candidate_repo,
            reviewer_repo,
            assignment_repo,
            cache,
        }
    }

    // ==========================================
    // Automatic rounds
    // ==========================================

    /// Run one automatic assignment round
    ///
    /// # Returns
    /// - Ok(AutoAssignReport): per-pair failures are listed in `errors`
    /// - Err(Validation): quota or coverage out of range
    /// - Err(Storage): the write transaction could not begin or commit
    #[instrument(skip(self, request), fields(
        strategy = %request.strategy,
        candidates_per_reviewer = request.candidates_per_reviewer,
        clear_existing = request.clear_existing
    ))]
    pub fn auto_assign(&self, request: &AutoAssignRequest) -> EngineResult<AutoAssignReport> {
        if !CANDIDATES_PER_REVIEWER_RANGE.contains(&request.candidates_per_reviewer) {
            return Err(EngineError::validation(format!(
                "candidates_per_reviewer must be between {} and {}, got {}",
                CANDIDATES_PER_REVIEWER_RANGE.start(),
                CANDIDATES_PER_REVIEWER_RANGE.end(),
                request.candidates_per_reviewer
            )));
        }
        if request.reviewers_per_candidate == 0 {
            return Err(EngineError::validation(
                "reviewers_per_candidate must be at least 1",
            ));
        }

        let reviewers = self.reviewer_repo.list_active()?;
        let candidates = self.candidate_repo.list_published()?;

        let seed = match request.strategy {
            AssignmentStrategy::Random => Some(request.seed.unwrap_or_else(rand::random)),
            _ => None,
        };
        let strategy = strategy_for(request.strategy, seed.unwrap_or_default());

        // planned against the pairs stored under the write lock
        let (written, unassigned) = self.assignment_repo.bulk_create(
            &request.assigned_by,
            request.clear_existing,
            |existing| {
                let plan = strategy.allocate(&AllocationInput {
                    reviewers: &reviewers,
                    candidates: &candidates,
                    existing,
                    candidates_per_reviewer: request.candidates_per_reviewer,
                    reviewers_per_candidate: request.reviewers_per_candidate,
                    unmatched_policy: request.unmatched_policy,
                });
                tracing::debug!(
                    strategy = %strategy.kind(),
                    reviewers = reviewers.len(),
                    candidates = candidates.len(),
                    stored = existing.len(),
                    planned = plan.len(),
                    "allocation planned"
                );
                (plan.pairs, plan.unassigned)
            },
        )?;
        if written.created > 0 || written.cleared > 0 {
            self.cache.invalidate_all();
        }

        let report = AutoAssignReport {
            strategy: request.strategy.as_str().to_string(),
            created: written.created,
            skipped: written.skipped,
            cleared: written.cleared,
            unassigned,
            errors: written.failures,
            seed,
        };

        tracing::info!(
            created = report.created,
            skipped = report.skipped,
            cleared = report.cleared,
            unassigned = report.unassigned.len(),
            errors = report.errors.len(),
            "auto assignment finished"
        );
        Ok(report)
    }

    // ==========================================
    // Manual assignment
    // ==========================================

    /// Assign one candidate to several reviewers
    ///
    /// Unknown reviewers and write failures are reported per reviewer and
    /// the remaining reviewers are still processed.
    #[instrument(skip(self, reviewer_ids), fields(reviewers = reviewer_ids.len()))]
    pub fn manual_assign(
        &self,
        candidate_id: i64,
        reviewer_ids: &[i64],
        assigned_by: &str,
    ) -> EngineResult<ManualAssignReport> {
        if reviewer_ids.is_empty() {
            return Err(EngineError::validation("reviewer_ids must not be empty"));
        }
        if !self.candidate_repo.exists(candidate_id)? {
            return Err(EngineError::not_found("Candidate", candidate_id));
        }

        let mut report = ManualAssignReport::default();
        let mut seen = HashSet::new();
        for &reviewer_id in reviewer_ids {
            if !seen.insert(reviewer_id) {
                report.skipped.push(reviewer_id);
                continue;
            }
            if !self.reviewer_repo.exists(reviewer_id)? {
                report.errors.push(ItemFailure {
                    reviewer_id,
                    reason: format!("reviewer {} not found", reviewer_id),
                });
                continue;
            }
            match self.assignment_repo.create(reviewer_id, candidate_id, assigned_by) {
                Ok(InsertOutcome::Created(_)) => {
                    report.success_count += 1;
                    self.cache.invalidate_reviewer(reviewer_id);
                }
                Ok(InsertOutcome::AlreadyExists) => report.skipped.push(reviewer_id),
                Err(RepositoryError::LockError(e)) => {
                    return Err(RepositoryError::LockError(e).into());
                }
                Err(e) => {
                    tracing::warn!(reviewer_id, candidate_id, error = %e, "manual assignment failed");
                    report.errors.push(ItemFailure {
                        reviewer_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.success_count > 0 {
            self.cache.invalidate_global();
        }
        report.message = format!(
            "{} of {} reviewers assigned",
            report.success_count,
            reviewer_ids.len()
        );
        tracing::info!(
            candidate_id,
            created = report.success_count,
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "manual assignment finished"
        );
        Ok(report)
    }

    // ==========================================
    // Removal
    // ==========================================

    /// Remove one pair; false when it did not exist
    pub fn unassign(&self, reviewer_id: i64, candidate_id: i64) -> EngineResult<bool> {
        let removed = self.assignment_repo.delete_pair(reviewer_id, candidate_id)?;
        if removed {
            self.cache.invalidate_reviewer(reviewer_id);
            self.cache.invalidate_global();
            tracing::info!(reviewer_id, candidate_id, "assignment removed");
        }
        Ok(removed)
    }

    pub fn unassign_reviewer(&self, reviewer_id: i64) -> EngineResult<usize> {
        let removed = self.assignment_repo.delete_by_reviewer(reviewer_id)?;
        self.cache.invalidate_reviewer(reviewer_id);
        self.cache.invalidate_global();
        tracing::info!(reviewer_id, removed, "reviewer assignments removed");
        Ok(removed)
    }

    pub fn unassign_candidate(&self, candidate_id: i64) -> EngineResult<usize> {
        let removed = self.assignment_repo.delete_by_candidate(candidate_id)?;
        // holders are unknown after the delete
        self.cache.invalidate_all();
        tracing::info!(candidate_id, removed, "candidate assignments removed");
        Ok(removed)
    }

    /// Delete every assignment in one transaction
    pub fn clear_all(&self) -> EngineResult<bool> {
        let removed = self.assignment_repo.clear_all()?;
        self.cache.invalidate_all();
        tracing::info!(removed, "all assignments cleared");
        Ok(true)
    }

    // ==========================================
    // Rebalancing
    // ==========================================

    /// Move assignments from overloaded to underloaded active reviewers
    ///
    /// target = floor(total / active reviewers). Donors are reviewers above
    /// target + 1, receivers are reviewers below target. A pair with an
    /// evaluation is never moved, nor one the receiver already holds.
    #[instrument(skip(self))]
    pub fn rebalance(&self) -> EngineResult<RebalanceReport> {
        let reviewers = self.reviewer_repo.list_active()?;
        if reviewers.is_empty() {
            return Ok(RebalanceReport::default());
        }

        let stored = self.assignment_repo.load_by_reviewer()?;
        let mut load: HashMap<i64, i64> = reviewers
            .iter()
            .map(|r| (r.reviewer_id, stored.get(&r.reviewer_id).copied().unwrap_or(0)))
            .collect();
        let caps: HashMap<i64, i64> = reviewers
            .iter()
            .map(|r| (r.reviewer_id, i64::from(r.max_assignments)))
            .collect();
        let total: i64 = load.values().sum();
        let target = total / reviewers.len() as i64;

        let mut held: HashSet<(i64, i64)> = self.assignment_repo.list_pairs()?.into_iter().collect();
        let mut movable: HashMap<i64, Vec<(i64, i64)>> = HashMap::new();
        let mut moves = Vec::new();

        loop {
            let donor = reviewers
                .iter()
                .map(|r| r.reviewer_id)
                .filter(|id| load[id] > target + 1)
                .max_by_key(|id| (load[id], std::cmp::Reverse(*id)));
            let Some(donor) = donor else { break };

            let pool = match movable.entry(donor) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => e.insert(
                    self.assignment_repo
                        .list_movable_for_reviewer(donor)?
                        .into_iter()
                        .map(|a| (a.assignment_id, a.candidate_id))
                        .collect(),
                ),
            };

            let mut receivers: Vec<i64> = reviewers
                .iter()
                .map(|r| r.reviewer_id)
                .filter(|id| load[id] < target && load[id] < caps[id])
                .collect();
            receivers.sort_by_key(|id| (load[id], *id));

            let choice = pool.iter().enumerate().find_map(|(idx, (_, candidate_id))| {
                receivers
                    .iter()
                    .find(|r| !held.contains(&(**r, *candidate_id)))
                    .map(|r| (idx, *r))
            });
            let Some((idx, receiver)) = choice else { break };

            let (assignment_id, candidate_id) = pool.remove(idx);
            held.remove(&(donor, candidate_id));
            held.insert((receiver, candidate_id));
            if let Some(l) = load.get_mut(&donor) {
                *l -= 1;
            }
            if let Some(l) = load.get_mut(&receiver) {
                *l += 1;
            }
            moves.push(AssignmentMove {
                assignment_id,
                from_reviewer: donor,
                to_reviewer: receiver,
                candidate_id,
            });
        }

        let applied = if moves.is_empty() {
            moves
        } else {
            let applied = self.assignment_repo.apply_moves(&moves)?;
            self.cache.invalidate_all();
            applied
        };

        tracing::info!(moved = applied.len(), target, "rebalance finished");
        Ok(RebalanceReport {
            moved: applied.len(),
            target_per_reviewer: u32::try_from(target).unwrap_or(u32::MAX),
            moves: applied,
        })
    }

    // ==========================================
    // Queries
    // ==========================================

    /// Spread of assignment counts over reviewers holding assignments
    pub fn distribution_statistics(&self) -> EngineResult<DistributionStats> {
        cached(self.cache.as_ref(), CacheKey::DistributionStats, || {
            let counts: Vec<i64> = self
                .assignment_repo
                .load_by_reviewer()?
                .into_values()
                .filter(|c| *c > 0)
                .collect();
            Ok(distribution_of(&counts))
        })
    }

    /// Published candidates without any assignment, by name
    pub fn unassigned_candidates(&self) -> EngineResult<Vec<Candidate>> {
        Ok(self.candidate_repo.list_unassigned()?)
    }
}

fn distribution_of(counts: &[i64]) -> DistributionStats {
    if counts.is_empty() {
        return DistributionStats {
            total_assignments: 0,
            reviewer_count: 0,
            average: 0.0,
            min: 0,
            max: 0,
            std_deviation: 0.0,
            quality: DistributionQuality::NotApplicable,
        };
    }

    let total: i64 = counts.iter().sum();
    let n = counts.len() as f64;
    let mean = total as f64 / n;
    let variance = counts
        .iter()
        .map(|c| (*c as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    DistributionStats {
        total_assignments: total,
        reviewer_count: counts.len(),
        average: round2(mean),
        min: counts.iter().copied().min().unwrap_or(0),
        max: counts.iter().copied().max().unwrap_or(0),
        std_deviation: round2(std_dev),
        quality: DistributionQuality::from_std_deviation(std_dev),
    }
}

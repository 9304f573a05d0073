// ==========================================
// Jury Engine - allocation strategies
// ==========================================
// Pure planning: no SQL here. Each strategy receives the eligible
// reviewers, the published candidates and the pairs already stored, and
// returns the (reviewer, candidate) pairs to write.
//
// Shared rules:
// - effective cap per reviewer = min(candidates_per_reviewer, max_assignments)
// - load counts pairs already stored
// - a candidate wants `reviewers_per_candidate` distinct reviewers; one that
//   is already covered re-proposes its stored pairs and gets nothing new
// - a reviewer never receives a candidate it already holds
// ==========================================

use crate::domain::candidate::Candidate;
use crate::domain::reviewer::Reviewer;
use crate::engine::strategy::{AssignmentStrategy, UnmatchedPolicy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

// ==========================================
// Input / output
// ==========================================

/// Planning input
#[derive(Debug, Clone, Copy)]
pub struct AllocationInput<'a> {
    /// Eligible reviewers, ordered by id
    pub reviewers: &'a [Reviewer],
    /// Published candidates, ordered by id
    pub candidates: &'a [Candidate],
    /// Pairs already stored (empty when the round clears first)
    pub existing: &'a [(i64, i64)],
    pub candidates_per_reviewer: u32,
    pub reviewers_per_candidate: u32,
    pub unmatched_policy: UnmatchedPolicy,
}

/// Planning output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationPlan {
    /// Stored pairs re-proposed for covered candidates, then new pairs
    pub pairs: Vec<(i64, i64)>,
    /// Candidates left below the coverage target, ordered by id
    pub unassigned: Vec<i64>,
}

impl AllocationPlan {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ==========================================
// LoadBook - running load while planning
// ==========================================

/// Load, capacity and holdings tracked while a plan is built
#[derive(Debug, Clone)]
pub struct LoadBook {
    caps: HashMap<i64, u32>,
    load: HashMap<i64, u32>,
    held: HashSet<(i64, i64)>,
    coverage: HashMap<i64, u32>,
}

impl LoadBook {
    pub fn new(reviewers: &[Reviewer], existing: &[(i64, i64)], candidates_per_reviewer: u32) -> Self {
        let caps = reviewers
            .iter()
            .map(|r| (r.reviewer_id, candidates_per_reviewer.min(r.max_assignments)))
            .collect();

        let mut book = Self {
            caps,
            load: HashMap::new(),
            held: HashSet::new(),
            coverage: HashMap::new(),
        };
        for &(reviewer_id, candidate_id) in existing {
            if book.held.insert((reviewer_id, candidate_id)) {
                *book.load.entry(reviewer_id).or_default() += 1;
                *book.coverage.entry(candidate_id).or_default() += 1;
            }
        }
        book
    }

    pub fn load(&self, reviewer_id: i64) -> u32 {
        self.load.get(&reviewer_id).copied().unwrap_or(0)
    }

    pub fn cap(&self, reviewer_id: i64) -> u32 {
        self.caps.get(&reviewer_id).copied().unwrap_or(0)
    }

    pub fn has_capacity(&self, reviewer_id: i64) -> bool {
        self.load(reviewer_id) < self.cap(reviewer_id)
    }

    pub fn holds(&self, reviewer_id: i64, candidate_id: i64) -> bool {
        self.held.contains(&(reviewer_id, candidate_id))
    }

    pub fn coverage(&self, candidate_id: i64) -> u32 {
        self.coverage.get(&candidate_id).copied().unwrap_or(0)
    }

    /// Can `reviewer_id` take `candidate_id` now
    pub fn accepts(&self, reviewer_id: i64, candidate_id: i64) -> bool {
        self.has_capacity(reviewer_id) && !self.holds(reviewer_id, candidate_id)
    }

    pub fn assign(&mut self, reviewer_id: i64, candidate_id: i64) {
        if self.held.insert((reviewer_id, candidate_id)) {
            *self.load.entry(reviewer_id).or_default() += 1;
            *self.coverage.entry(candidate_id).or_default() += 1;
        }
    }
}

// ==========================================
// AllocationStrategy trait
// ==========================================

pub trait AllocationStrategy {
    fn kind(&self) -> AssignmentStrategy;

    fn allocate(&self, input: &AllocationInput<'_>) -> AllocationPlan;
}

/// Build the strategy object for a request
pub fn strategy_for(kind: AssignmentStrategy, seed: u64) -> Box<dyn AllocationStrategy> {
    match kind {
        AssignmentStrategy::Balanced => Box::new(BalancedStrategy),
        AssignmentStrategy::Random => Box::new(RandomStrategy { seed }),
        AssignmentStrategy::Expertise => Box::new(ExpertiseStrategy),
        AssignmentStrategy::Category => Box::new(CategoryStrategy),
    }
}

// ==========================================
// Shared planning state
// ==========================================

struct Planner<'a> {
    input: &'a AllocationInput<'a>,
    book: LoadBook,
    pairs: Vec<(i64, i64)>,
}

impl<'a> Planner<'a> {
    /// Load the book and re-propose stored pairs of covered candidates
    fn start(input: &'a AllocationInput<'a>) -> Self {
        let book = LoadBook::new(input.reviewers, input.existing, input.candidates_per_reviewer);
        let target = input.reviewers_per_candidate;

        let covered: HashSet<i64> = input
            .candidates
            .iter()
            .map(|c| c.candidate_id)
            .filter(|id| book.coverage(*id) >= target)
            .collect();
        let pairs = input
            .existing
            .iter()
            .copied()
            .filter(|(_, candidate_id)| covered.contains(candidate_id))
            .collect();

        Self { input, book, pairs }
    }

    fn need(&self, candidate_id: i64) -> u32 {
        self.input
            .reviewers_per_candidate
            .saturating_sub(self.book.coverage(candidate_id))
    }

    fn assign(&mut self, reviewer_id: i64, candidate_id: i64) {
        self.book.assign(reviewer_id, candidate_id);
        self.pairs.push((reviewer_id, candidate_id));
    }

    /// Least-loaded accepting reviewer from `pool`; ties by id
    fn pick_balanced<'r, I>(&self, pool: I, candidate_id: i64) -> Option<i64>
    where
        I: IntoIterator<Item = &'r Reviewer>,
    {
        pool.into_iter()
            .map(|r| r.reviewer_id)
            .filter(|id| self.book.accepts(*id, candidate_id))
            .min_by_key(|id| (self.book.load(*id), *id))
    }

    /// Fill the candidate's need with the balanced rule over every reviewer
    fn fill_balanced(&mut self, candidate_id: i64) {
        while self.need(candidate_id) > 0 {
            match self.pick_balanced(self.input.reviewers, candidate_id) {
                Some(reviewer_id) => self.assign(reviewer_id, candidate_id),
                None => break,
            }
        }
    }

    /// Place candidates with `pick`, routing unmet need through the policy
    fn fill_matched<F>(&mut self, order: &[&Candidate], pick: F)
    where
        F: Fn(&Self, &Candidate) -> Option<i64>,
    {
        let mut deferred = Vec::new();
        for &candidate in order {
            let candidate_id = candidate.candidate_id;
            while self.need(candidate_id) > 0 {
                match pick(&*self, candidate) {
                    Some(reviewer_id) => self.assign(reviewer_id, candidate_id),
                    None => break,
                }
            }
            if self.need(candidate_id) == 0 {
                continue;
            }
            match self.input.unmatched_policy {
                UnmatchedPolicy::Immediate => self.fill_balanced(candidate_id),
                UnmatchedPolicy::Deferred => deferred.push(candidate_id),
                UnmatchedPolicy::Skip => {}
            }
        }

        if !deferred.is_empty() {
            tracing::debug!(count = deferred.len(), "placing unmatched candidates by load");
        }
        for candidate_id in deferred {
            self.fill_balanced(candidate_id);
        }
    }

    fn finish(self) -> AllocationPlan {
        let unassigned = self
            .input
            .candidates
            .iter()
            .map(|c| c.candidate_id)
            .filter(|id| self.book.coverage(*id) < self.input.reviewers_per_candidate)
            .collect();
        AllocationPlan {
            pairs: self.pairs,
            unassigned,
        }
    }
}

// ==========================================
// Balanced
// ==========================================

/// Each candidate (id order) goes to the least-loaded reviewer with room
pub struct BalancedStrategy;

impl AllocationStrategy for BalancedStrategy {
    fn kind(&self) -> AssignmentStrategy {
        AssignmentStrategy::Balanced
    }

    fn allocate(&self, input: &AllocationInput<'_>) -> AllocationPlan {
        let mut planner = Planner::start(input);
        for candidate in input.candidates {
            planner.fill_balanced(candidate.candidate_id);
        }
        planner.finish()
    }
}

// ==========================================
// Random
// ==========================================

/// Seeded shuffle of candidates, dealt round-robin over reviewers
pub struct RandomStrategy {
    pub seed: u64,
}

impl AllocationStrategy for RandomStrategy {
    fn kind(&self) -> AssignmentStrategy {
        AssignmentStrategy::Random
    }

    fn allocate(&self, input: &AllocationInput<'_>) -> AllocationPlan {
        let mut planner = Planner::start(input);
        let mut order: Vec<i64> = input.candidates.iter().map(|c| c.candidate_id).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let reviewer_ids: Vec<i64> = input.reviewers.iter().map(|r| r.reviewer_id).collect();
        let n = reviewer_ids.len();
        let mut cursor = 0usize;

        for candidate_id in order {
            while planner.need(candidate_id) > 0 {
                let next = (0..n)
                    .map(|offset| (cursor + offset) % n)
                    .find(|idx| planner.book.accepts(reviewer_ids[*idx], candidate_id));
                match next {
                    Some(idx) => {
                        planner.assign(reviewer_ids[idx], candidate_id);
                        cursor = (idx + 1) % n;
                    }
                    None => break,
                }
            }
        }
        planner.finish()
    }
}

// ==========================================
// Expertise
// ==========================================

/// Least-loaded reviewer sharing an expertise tag; ties by larger overlap
pub struct ExpertiseStrategy;

impl AllocationStrategy for ExpertiseStrategy {
    fn kind(&self) -> AssignmentStrategy {
        AssignmentStrategy::Expertise
    }

    fn allocate(&self, input: &AllocationInput<'_>) -> AllocationPlan {
        let mut planner = Planner::start(input);
        let order: Vec<&Candidate> = input.candidates.iter().collect();

        planner.fill_matched(&order, |p, candidate| {
            p.input
                .reviewers
                .iter()
                .filter(|r| p.book.accepts(r.reviewer_id, candidate.candidate_id))
                .map(|r| (r.reviewer_id, r.expertise_overlap(&candidate.expertise)))
                .filter(|(_, overlap)| *overlap > 0)
                .min_by_key(|(id, overlap)| (p.book.load(*id), Reverse(*overlap), *id))
                .map(|(id, _)| id)
        });
        planner.finish()
    }
}

// ==========================================
// Category
// ==========================================

/// Balanced inside each primary-category pool, spilling into the
/// candidate's secondary categories when the primary pool is full
pub struct CategoryStrategy;

impl AllocationStrategy for CategoryStrategy {
    fn kind(&self) -> AssignmentStrategy {
        AssignmentStrategy::Category
    }

    fn allocate(&self, input: &AllocationInput<'_>) -> AllocationPlan {
        let mut planner = Planner::start(input);

        // category -> candidates; uncategorized go last
        let mut partitions: BTreeMap<&str, Vec<&Candidate>> = BTreeMap::new();
        let mut uncategorized = Vec::new();
        for candidate in input.candidates {
            match candidate.primary_category() {
                Some(category) => partitions.entry(category).or_default().push(candidate),
                None => uncategorized.push(candidate),
            }
        }
        let order: Vec<&Candidate> = partitions
            .into_values()
            .flatten()
            .chain(uncategorized)
            .collect();

        // primary pool first, then the candidate's other categories in order
        planner.fill_matched(&order, |p, candidate| {
            candidate.categories.iter().find_map(|category| {
                p.pick_balanced(
                    p.input.reviewers.iter().filter(|r| r.has_category(category)),
                    candidate.candidate_id,
                )
            })
        });
        planner.finish()
    }
}

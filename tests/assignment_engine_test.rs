// ==========================================
// Assignment engine integration tests
// ==========================================
// Automatic rounds, manual assignment, rebalancing and removal against a
// temp SQLite file.
// ==========================================


#[cfg(test)]
mod assignment_engine_test {
    use jury_engine::api::{ApiError, AutoAssignParams, EvaluationParams, ManualAssignParams, PairParams};
    use jury_engine::app::AppState;
    use jury_engine::db::open_sqlite_connection;
    use jury_engine::domain::{Candidate, Reviewer, ReviewerStatus};
    use jury_engine::engine::DistributionQuality;
    use jury_engine::repository::AssignmentRepository;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    use crate::test_helpers::{
        add_candidate, add_reviewer, create_test_state, loads_desc, seed_candidates,
        seed_reviewers,
    };

    // ==========================================
    // Helpers
    // ==========================================

    fn balanced() -> AutoAssignParams {
        AutoAssignParams {
            strategy: Some("balanced".to_string()),
            candidates_per_reviewer: Some(20),
            ..Default::default()
        }
    }

    fn with_strategy(name: &str) -> AutoAssignParams {
        AutoAssignParams {
            strategy: Some(name.to_string()),
            ..balanced()
        }
    }

    fn assignment_repo(db_path: &str) -> AssignmentRepository {
        let conn = open_sqlite_connection(db_path).unwrap();
        AssignmentRepository::new(Arc::new(Mutex::new(conn)))
    }

    /// reviewer_id -> held candidate ids
    fn holdings(db_path: &str) -> HashMap<i64, Vec<i64>> {
        let mut out: HashMap<i64, Vec<i64>> = HashMap::new();
        for (reviewer_id, candidate_id) in assignment_repo(db_path).list_pairs().unwrap() {
            out.entry(reviewer_id).or_default().push(candidate_id);
        }
        for held in out.values_mut() {
            held.sort_unstable();
        }
        out
    }

    fn assert_pairs_unique(db_path: &str) {
        let pairs = assignment_repo(db_path).list_pairs().unwrap();
        let distinct: HashSet<(i64, i64)> = pairs.iter().copied().collect();
        assert_eq!(pairs.len(), distinct.len(), "duplicate (reviewer, candidate) pair stored");
    }

    // ==========================================
    // Automatic rounds
    // ==========================================

    #[test]
    fn test_balanced_round_is_idempotent_and_extends() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 3);
        seed_candidates(&state, 7);

        let first = state.assignment_api.auto_assign(balanced()).unwrap();
        assert_eq!(first.created, 7);
        assert_eq!(first.skipped, 0);
        assert!(first.unassigned.is_empty());
        assert_eq!(loads_desc(&state), vec![3, 2, 2]);

        // unchanged input: stored pairs are re-proposed and skipped
        let rerun = state.assignment_api.auto_assign(balanced()).unwrap();
        assert_eq!(rerun.created, 0);
        assert_eq!(rerun.skipped, 7);
        assert_eq!(loads_desc(&state), vec![3, 2, 2]);

        // an eighth candidate goes to the least-loaded reviewer with the lower id
        add_candidate(&state, Candidate::new(8, "Candidate 8"));
        let extended = state.assignment_api.auto_assign(balanced()).unwrap();
        assert_eq!(extended.created, 1);
        assert_eq!(extended.skipped, 7);
        assert_eq!(loads_desc(&state), vec![3, 3, 2]);
        assert_eq!(holdings(&db_path)[&2], vec![2, 5, 8]);

        assert_pairs_unique(&db_path);
    }

    #[test]
    fn test_every_strategy_keeps_pairs_unique() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 4);
        seed_candidates(&state, 10);

        for name in ["balanced", "random", "expertise", "category", "balanced"] {
            let report = state.assignment_api.auto_assign(with_strategy(name)).unwrap();
            assert!(report.errors.is_empty(), "{} reported errors", name);
        }

        assert_pairs_unique(&db_path);
        assert_eq!(state.assignment_api.get_assignment_stats().unwrap().total_assignments, 10);
    }

    #[test]
    fn test_inactive_reviewers_are_not_assigned() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 2);
        add_reviewer(
            &state,
            Reviewer::new(3, "Reviewer 3").with_status(ReviewerStatus::Inactive),
        );
        add_reviewer(
            &state,
            Reviewer::new(4, "Reviewer 4").with_status(ReviewerStatus::Pending),
        );
        seed_candidates(&state, 7);

        let report = state.assignment_api.auto_assign(balanced()).unwrap();
        assert_eq!(report.created, 7);

        let held = holdings(&db_path);
        assert!(!held.contains_key(&3));
        assert!(!held.contains_key(&4));
        assert_eq!(held[&1].len(), 4);
        assert_eq!(held[&2].len(), 3);
    }

    #[test]
    fn test_quota_and_max_assignments_cap_load() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 3);
        seed_candidates(&state, 7);

        let report = state
            .assignment_api
            .auto_assign(AutoAssignParams {
                candidates_per_reviewer: Some(2),
                ..balanced()
            })
            .unwrap();
        assert_eq!(report.created, 6);
        assert_eq!(report.unassigned, vec![7]);
        assert_eq!(loads_desc(&state), vec![2, 2, 2]);

        // max_assignments below the quota wins
        state.assignment_api.clear_assignments().unwrap();
        add_reviewer(&state, Reviewer::new(1, "Reviewer 1").with_max_assignments(1));
        let report = state.assignment_api.auto_assign(balanced()).unwrap();
        assert_eq!(report.created, 7);
        assert_eq!(holdings(&db_path)[&1].len(), 1);
    }

    #[test]
    fn test_quota_out_of_range_is_rejected() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 1);
        seed_candidates(&state, 1);

        for quota in [0, 51] {
            let err = state
                .assignment_api
                .auto_assign(AutoAssignParams {
                    candidates_per_reviewer: Some(quota),
                    ..balanced()
                })
                .unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR", "quota {}", quota);
        }

        let err = state
            .assignment_api
            .auto_assign(with_strategy("fastest"))
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
        assert_eq!(state.assignment_api.get_assignment_stats().unwrap().total_assignments, 0);
    }

    #[test]
    fn test_configured_quota_applies_when_absent() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 2);
        seed_candidates(&state, 5);
        state.config.set_default_candidates_per_reviewer(1).unwrap();

        let report = state
            .assignment_api
            .auto_assign(AutoAssignParams::default())
            .unwrap();
        assert_eq!(report.strategy, "balanced");
        assert_eq!(report.created, 2);
        assert_eq!(report.unassigned, vec![3, 4, 5]);
    }

    #[test]
    fn test_clear_existing_runs_in_same_round() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 3);
        seed_candidates(&state, 7);
        state.assignment_api.auto_assign(balanced()).unwrap();

        let report = state
            .assignment_api
            .auto_assign(AutoAssignParams {
                clear_existing: true,
                ..balanced()
            })
            .unwrap();
        assert_eq!(report.cleared, 7);
        assert_eq!(report.created, 7);
        assert_eq!(report.skipped, 0);
        assert_eq!(loads_desc(&state), vec![3, 2, 2]);
    }

    #[test]
    fn test_random_strategy_is_reproducible_with_seed() {
        let run = |seed: u64| {
            let (_tmp, db_path, state) = create_test_state().unwrap();
            seed_reviewers(&state, 3);
            seed_candidates(&state, 9);
            let report = state
                .assignment_api
                .auto_assign(AutoAssignParams {
                    seed: Some(seed),
                    ..with_strategy("random")
                })
                .unwrap();
            assert_eq!(report.seed, Some(seed));
            assert_eq!(report.created, 9);
            (holdings(&db_path), loads_desc(&state))
        };

        let (first, loads) = run(42);
        let (second, _) = run(42);
        assert_eq!(first, second);
        assert_eq!(loads, vec![3, 3, 3]);
    }

    #[test]
    fn test_random_strategy_reports_drawn_seed() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 2);
        seed_candidates(&state, 3);

        let report = state.assignment_api.auto_assign(with_strategy("random")).unwrap();
        assert!(report.seed.is_some());

        let report = state.assignment_api.auto_assign(balanced()).unwrap();
        assert_eq!(report.seed, None);
    }

    #[test]
    fn test_expertise_strategy_with_fallback() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        add_reviewer(&state, Reviewer::new(1, "Ada").with_expertise(["ai"]));
        add_reviewer(&state, Reviewer::new(2, "Grace").with_expertise(["design"]));
        add_candidate(&state, Candidate::new(1, "Vision").with_expertise(["ai"]));
        add_candidate(&state, Candidate::new(2, "Poster").with_expertise(["design"]));
        add_candidate(&state, Candidate::new(3, "Robot").with_expertise(["ai", "hardware"]));
        add_candidate(&state, Candidate::new(4, "Statute").with_expertise(["law"]));

        let report = state
            .assignment_api
            .auto_assign(AutoAssignParams {
                unmatched_policy: Some("deferred".to_string()),
                ..with_strategy("expertise")
            })
            .unwrap();
        assert_eq!(report.created, 4);

        let held = holdings(&db_path);
        assert_eq!(held[&1], vec![1, 3]);
        // no match for candidate 4: placed by load afterwards
        assert_eq!(held[&2], vec![2, 4]);
    }

    #[test]
    fn test_expertise_strategy_skip_policy_leaves_unmatched() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        add_reviewer(&state, Reviewer::new(1, "Ada").with_expertise(["ai"]));
        add_candidate(&state, Candidate::new(1, "Vision").with_expertise(["ai"]));
        add_candidate(&state, Candidate::new(2, "Statute").with_expertise(["law"]));

        let report = state
            .assignment_api
            .auto_assign(AutoAssignParams {
                unmatched_policy: Some("skip".to_string()),
                ..with_strategy("expertise")
            })
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.unassigned, vec![2]);
    }

    #[test]
    fn test_category_strategy_pools_by_primary_category() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        add_reviewer(&state, Reviewer::new(1, "Film juror").with_categories(["film"]));
        add_reviewer(&state, Reviewer::new(2, "Music juror").with_categories(["music"]));
        add_candidate(&state, Candidate::new(1, "Short").with_categories(["film"]));
        add_candidate(&state, Candidate::new(2, "Album").with_categories(["music", "film"]));
        add_candidate(&state, Candidate::new(3, "Documentary").with_categories(["film"]));
        add_candidate(&state, Candidate::new(4, "Untitled"));

        let report = state.assignment_api.auto_assign(with_strategy("category")).unwrap();
        assert_eq!(report.created, 4);

        let held = holdings(&db_path);
        assert_eq!(held[&1], vec![1, 3]);
        assert_eq!(held[&2], vec![2, 4]);
    }

    #[test]
    fn test_reviewers_per_candidate_gives_distinct_reviewers() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 3);
        seed_candidates(&state, 3);

        let report = state
            .assignment_api
            .auto_assign(AutoAssignParams {
                reviewers_per_candidate: Some(2),
                ..balanced()
            })
            .unwrap();
        assert_eq!(report.created, 6);
        assert!(report.unassigned.is_empty());
        assert_eq!(loads_desc(&state), vec![2, 2, 2]);

        let repo = assignment_repo(&db_path);
        for candidate_id in 1..=3 {
            let holders = repo.list_pairs().unwrap().into_iter().filter(|(_, c)| *c == candidate_id);
            assert_eq!(holders.count(), 2);
        }
        assert_pairs_unique(&db_path);
    }

    #[test]
    fn test_concurrent_rounds_never_duplicate_pairs() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 4);
        seed_candidates(&state, 20);
        drop(state);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let path = db_path.clone();
                thread::spawn(move || {
                    let state = AppState::new(&path).unwrap();
                    state.assignment_api.auto_assign(balanced()).unwrap()
                })
            })
            .collect();
        for handle in handles {
            let report = handle.join().unwrap();
            assert!(report.errors.is_empty());
        }

        assert_pairs_unique(&db_path);
        let fresh = AppState::new(&db_path).unwrap();
        assert!(fresh.assignment_api.get_unassigned_candidates().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_random_rounds_respect_caps() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 2);
        seed_candidates(&state, 40);
        drop(state);

        for trial in 0..5u64 {
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2u64)
                .map(|n| {
                    let path = db_path.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        let state = AppState::new(&path).unwrap();
                        barrier.wait();
                        state
                            .assignment_api
                            .auto_assign(AutoAssignParams {
                                strategy: Some("random".to_string()),
                                candidates_per_reviewer: Some(3),
                                clear_existing: n == 0 && trial > 0,
                                seed: Some(trial * 2 + n),
                                ..Default::default()
                            })
                            .unwrap()
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().errors.is_empty());
            }

            assert_pairs_unique(&db_path);
            let pairs = assignment_repo(&db_path).list_pairs().unwrap();
            let mut loads: HashMap<i64, usize> = HashMap::new();
            let mut coverage: HashMap<i64, usize> = HashMap::new();
            for (reviewer_id, candidate_id) in pairs {
                *loads.entry(reviewer_id).or_default() += 1;
                *coverage.entry(candidate_id).or_default() += 1;
            }
            assert!(loads.values().all(|l| *l <= 3), "trial {}: loads {:?}", trial, loads);
            assert!(coverage.values().all(|c| *c == 1), "trial {}", trial);
        }
    }

    // ==========================================
    // Manual assignment
    // ==========================================

    #[test]
    fn test_manual_assign_reports_per_reviewer() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 2);
        seed_candidates(&state, 1);

        let report = state
            .assignment_api
            .manual_assign(ManualAssignParams {
                candidate_id: 1,
                reviewer_ids: vec![1, 2, 99, 1],
                assigned_by: Some("chair".to_string()),
            })
            .unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.skipped, vec![1]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].reviewer_id, 99);
        assert_eq!(report.message, "2 of 4 reviewers assigned");

        let again = state
            .assignment_api
            .manual_assign(ManualAssignParams {
                candidate_id: 1,
                reviewer_ids: vec![1],
                assigned_by: None,
            })
            .unwrap();
        assert_eq!(again.success_count, 0);
        assert_eq!(again.skipped, vec![1]);
    }

    #[test]
    fn test_manual_assign_unknown_candidate() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 1);

        let err = state
            .assignment_api
            .manual_assign(ManualAssignParams {
                candidate_id: 404,
                reviewer_ids: vec![1],
                assigned_by: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let err = state
            .assignment_api
            .manual_assign(ManualAssignParams {
                candidate_id: 404,
                reviewer_ids: vec![],
                assigned_by: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    // ==========================================
    // Rebalancing
    // ==========================================

    #[test]
    fn test_rebalance_moves_unevaluated_assignments() {
        let (_tmp, db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 3);
        seed_candidates(&state, 6);
        for candidate_id in 1..=6 {
            state
                .assignment_api
                .manual_assign(ManualAssignParams {
                    candidate_id,
                    reviewer_ids: vec![1],
                    assigned_by: None,
                })
                .unwrap();
        }
        state
            .evaluation_api
            .save_draft(EvaluationParams {
                reviewer_id: 1,
                candidate_id: 6,
                scores: json!({"courage": 5}),
                comments: None,
            })
            .unwrap();

        let report = state.assignment_api.rebalance_assignments().unwrap();
        assert_eq!(report.target_per_reviewer, 2);
        assert_eq!(report.moved, 3);
        assert!(report.moves.iter().all(|m| m.from_reviewer == 1));
        assert!(report.moves.iter().all(|m| m.candidate_id != 6));

        let held = holdings(&db_path);
        assert!(held[&1].contains(&6));
        assert_eq!(loads_desc(&state), vec![3, 2, 1]);

        // already within target + 1
        let again = state.assignment_api.rebalance_assignments().unwrap();
        assert_eq!(again.moved, 0);
    }

    // ==========================================
    // Removal and queries
    // ==========================================

    #[test]
    fn test_remove_and_clear() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 3);
        seed_candidates(&state, 7);
        state.assignment_api.auto_assign(balanced()).unwrap();

        let pair = PairParams {
            reviewer_id: 1,
            candidate_id: 1,
        };
        assert!(state.assignment_api.remove_assignment(pair).unwrap());
        assert!(!state.assignment_api.remove_assignment(pair).unwrap());

        let unassigned = state.assignment_api.get_unassigned_candidates().unwrap();
        assert_eq!(
            unassigned.iter().map(|c| c.candidate_id).collect::<Vec<_>>(),
            vec![1]
        );

        assert_eq!(state.assignment_api.remove_reviewer_assignments(2).unwrap(), 2);
        assert_eq!(state.assignment_api.remove_candidate_assignments(3).unwrap(), 1);

        assert!(state.assignment_api.clear_assignments().unwrap());
        let stats = state.assignment_api.get_assignment_stats().unwrap();
        assert_eq!(stats.total_assignments, 0);
        assert_eq!(stats.unassigned_candidates, 7);
        assert_eq!(stats.total_reviewers, 3);
    }

    #[test]
    fn test_distribution_statistics() {
        let (_tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 3);
        seed_candidates(&state, 7);

        let empty = state.assignment_api.get_distribution_stats().unwrap();
        assert_eq!(empty.quality, DistributionQuality::NotApplicable);

        state.assignment_api.auto_assign(balanced()).unwrap();
        let stats = state.assignment_api.get_distribution_stats().unwrap();
        assert_eq!(stats.total_assignments, 7);
        assert_eq!(stats.reviewer_count, 3);
        assert_eq!(stats.min, 2);
        assert_eq!(stats.max, 3);
        assert_eq!(stats.average, 2.33);
        assert_eq!(stats.std_deviation, 0.47);
        assert_eq!(stats.quality, DistributionQuality::Excellent);
    }
}

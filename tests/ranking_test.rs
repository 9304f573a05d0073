// ==========================================
// Ranking integration tests
// ==========================================


#[cfg(test)]
mod ranking_test {
    use jury_engine::api::{CandidateParams, EvaluationParams, ManualAssignParams, RankingParams, Rankings};
    use jury_engine::app::AppState;
    use jury_engine::domain::Candidate;
    use serde_json::json;

    use crate::test_helpers::{add_candidate, create_test_state, seed_reviewers};

    fn assign_all(state: &AppState, candidate_id: i64, reviewer_ids: Vec<i64>) {
        state
            .assignment_api
            .manual_assign(ManualAssignParams {
                candidate_id,
                reviewer_ids,
                assigned_by: None,
            })
            .unwrap();
    }

    fn submit(state: &AppState, reviewer_id: i64, candidate_id: i64, score: f64) {
        state
            .evaluation_api
            .submit_evaluation(EvaluationParams {
                reviewer_id,
                candidate_id,
                scores: json!({
                    "courage": score,
                    "innovation": score,
                    "implementation": score,
                    "relevance": score,
                    "visibility": score
                }),
                comments: None,
            })
            .unwrap();
    }

    fn overall(state: &AppState, limit: Option<u32>, category: Option<&str>) -> Vec<(i64, f64)> {
        match state
            .ranking_api
            .get_rankings(RankingParams {
                reviewer_id: None,
                limit,
                category: category.map(str::to_string),
            })
            .unwrap()
        {
            Rankings::Overall(entries) => entries
                .into_iter()
                .map(|e| (e.entry.candidate_id, e.entry.average_score))
                .collect(),
            other => panic!("expected overall ranking, got {:?}", other),
        }
    }

    /// Reviewers 1..=2 both assigned to candidates 1 (film), 2 (music), 3 (film)
    fn setup() -> (tempfile::NamedTempFile, AppState) {
        let (tmp, _db_path, state) = create_test_state().unwrap();
        seed_reviewers(&state, 2);
        add_candidate(&state, Candidate::new(1, "Short").with_categories(["film"]));
        add_candidate(&state, Candidate::new(2, "Album").with_categories(["music"]));
        add_candidate(&state, Candidate::new(3, "Documentary").with_categories(["film"]));
        for candidate_id in 1..=3 {
            assign_all(&state, candidate_id, vec![1, 2]);
        }
        (tmp, state)
    }

    #[test]
    fn test_overall_ranking_averages_completed_only() {
        let (_tmp, state) = setup();
        submit(&state, 1, 1, 8.0);
        submit(&state, 2, 1, 6.0);
        submit(&state, 1, 2, 9.0);
        // draft: never ranked
        state
            .evaluation_api
            .save_draft(EvaluationParams {
                reviewer_id: 2,
                candidate_id: 2,
                scores: json!({"courage": 1}),
                comments: None,
            })
            .unwrap();
        state
            .evaluation_api
            .save_draft(EvaluationParams {
                reviewer_id: 1,
                candidate_id: 3,
                scores: json!({"courage": 10}),
                comments: None,
            })
            .unwrap();

        assert_eq!(overall(&state, None, None), vec![(2, 9.0), (1, 7.0)]);
    }

    #[test]
    fn test_unpublished_candidates_are_excluded() {
        let (_tmp, state) = setup();
        submit(&state, 1, 1, 5.0);
        submit(&state, 1, 3, 9.0);

        state
            .registry_api
            .upsert_candidate(CandidateParams {
                candidate_id: 3,
                name: "Documentary".to_string(),
                organization: None,
                categories: vec!["film".to_string()],
                expertise: Vec::new(),
                published: Some(false),
            })
            .unwrap();

        assert_eq!(overall(&state, None, None), vec![(1, 5.0)]);
        match state
            .ranking_api
            .get_rankings(RankingParams {
                reviewer_id: Some(1),
                limit: None,
                category: None,
            })
            .unwrap()
        {
            Rankings::Reviewer(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].candidate_id, 1);
            }
            other => panic!("expected reviewer ranking, got {:?}", other),
        }
    }

    #[test]
    fn test_ties_break_by_candidate_id() {
        let (_tmp, state) = setup();
        submit(&state, 1, 3, 7.0);
        submit(&state, 1, 1, 7.0);
        submit(&state, 1, 2, 7.0);

        assert_eq!(overall(&state, None, None), vec![(1, 7.0), (2, 7.0), (3, 7.0)]);

        match state
            .ranking_api
            .get_rankings(RankingParams {
                reviewer_id: Some(1),
                limit: Some(2),
                category: None,
            })
            .unwrap()
        {
            Rankings::Reviewer(entries) => {
                let ids: Vec<i64> = entries.iter().map(|e| e.candidate_id).collect();
                assert_eq!(ids, vec![1, 2]);
            }
            other => panic!("expected reviewer ranking, got {:?}", other),
        }
    }

    #[test]
    fn test_category_filter_and_positions() {
        let (_tmp, state) = setup();
        submit(&state, 1, 1, 6.0);
        submit(&state, 1, 2, 9.0);
        submit(&state, 1, 3, 8.0);

        assert_eq!(overall(&state, None, Some(" film ")), vec![(3, 8.0), (1, 6.0)]);
        assert!(overall(&state, None, Some("sculpture")).is_empty());

        match state
            .ranking_api
            .get_rankings(RankingParams {
                reviewer_id: None,
                limit: Some(2),
                category: None,
            })
            .unwrap()
        {
            Rankings::Overall(entries) => {
                let ranks: Vec<(usize, i64)> =
                    entries.iter().map(|e| (e.rank, e.entry.candidate_id)).collect();
                assert_eq!(ranks, vec![(1, 2), (2, 3)]);
                assert_eq!(entries[0].entry.evaluation_count, 1);
            }
            other => panic!("expected overall ranking, got {:?}", other),
        }
    }

    #[test]
    fn test_ranking_refreshes_after_new_evaluation() {
        let (_tmp, state) = setup();
        submit(&state, 1, 1, 4.0);
        assert_eq!(overall(&state, None, None), vec![(1, 4.0)]);

        submit(&state, 2, 1, 6.0);
        assert_eq!(overall(&state, None, None), vec![(1, 5.0)]);
    }

    #[test]
    fn test_limit_bounds() {
        let (_tmp, state) = setup();

        for limit in [0, 501] {
            let err = state
                .ranking_api
                .get_rankings(RankingParams {
                    reviewer_id: None,
                    limit: Some(limit),
                    category: None,
                })
                .unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR", "limit {}", limit);
        }

        let err = state
            .ranking_api
            .get_rankings(RankingParams {
                reviewer_id: Some(77),
                limit: Some(5),
                category: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        assert!(state
            .ranking_api
            .get_rankings(RankingParams {
                reviewer_id: None,
                limit: Some(500),
                category: None,
            })
            .unwrap()
            .is_empty());
    }
}

// ==========================================
// Jury Engine - evaluation repository
// ==========================================
// One row per (reviewer_id, candidate_id). Writes go through a single
// INSERT ... ON CONFLICT DO UPDATE inside BEGIN IMMEDIATE, so concurrent
// saves for the same pair never create a second row and the merge sees
// the latest stored scores.
// ==========================================

use crate::domain::evaluation::{CriterionScores, Evaluation, EvaluationUpsert};
use crate::domain::types::{Criterion, EvaluationStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_datetime, now, parse_datetime, parse_enum};
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "evaluation_id, reviewer_id, candidate_id, \
     courage_score, innovation_score, implementation_score, relevance_score, visibility_score, \
     total_score, status, comments, created_at, updated_at";

// ==========================================
// Query result rows
// ==========================================

/// One completed evaluation in a reviewer's ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerScoreRow {
    pub candidate_id: i64,
    pub name: String,
    pub organization: Option<String>,
    pub total_score: f64,
}

/// Mean completed score of one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateAverageRow {
    pub candidate_id: i64,
    pub name: String,
    pub organization: Option<String>,
    pub average_score: f64,
    pub evaluation_count: i64,
}

/// Aggregate evaluation counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationCounts {
    pub total: i64,
    pub completed: i64,
    pub drafts: i64,
    /// Mean total_score over completed evaluations
    pub average_score: Option<f64>,
    /// Mean per criterion over completed evaluations
    pub by_criterion: BTreeMap<Criterion, f64>,
}

// ==========================================
// EvaluationRepository
// ==========================================

/// Evaluation repository (table `evaluation`)
pub struct EvaluationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EvaluationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn find_on(
        conn: &Connection,
        reviewer_id: i64,
        candidate_id: i64,
    ) -> RepositoryResult<Option<Evaluation>> {
        let sql = format!(
            "SELECT {} FROM evaluation WHERE reviewer_id = ?1 AND candidate_id = ?2",
            SELECT_COLUMNS
        );
        let found = conn
            .query_row(&sql, params![reviewer_id, candidate_id], map_row)
            .optional()?;
        Ok(found)
    }

    /// Read-merge-write for one (reviewer, candidate) pair
    ///
    /// # Arguments
    /// - build: receives the stored row (if any) and returns the values to write
    ///
    /// # Returns
    /// - evaluation_id of the written row
    ///
    /// # Notes
    /// - `build` runs inside the IMMEDIATE transaction, so no other writer can
    ///   change the row between the read and the write
    /// - a completed row stays completed whatever `build` returns
    /// - `comments = None` keeps the stored comments
    pub fn upsert_merged<F, E>(&self, reviewer_id: i64, candidate_id: i64, build: F) -> Result<i64, E>
    where
        F: FnOnce(Option<&Evaluation>) -> Result<EvaluationUpsert, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let existing = Self::find_on(&tx, reviewer_id, candidate_id)?;
        let values = build(existing.as_ref())?;
        let ts = format_datetime(&now());

        tx.execute(
            r#"
            INSERT INTO evaluation (
                reviewer_id, candidate_id,
                courage_score, innovation_score, implementation_score,
                relevance_score, visibility_score,
                total_score, status, comments, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            ON CONFLICT(reviewer_id, candidate_id) DO UPDATE SET
                courage_score = COALESCE(excluded.courage_score, evaluation.courage_score),
                innovation_score = COALESCE(excluded.innovation_score, evaluation.innovation_score),
                implementation_score = COALESCE(excluded.implementation_score, evaluation.implementation_score),
                relevance_score = COALESCE(excluded.relevance_score, evaluation.relevance_score),
                visibility_score = COALESCE(excluded.visibility_score, evaluation.visibility_score),
                total_score = excluded.total_score,
                status = CASE
                    WHEN evaluation.status = 'completed' THEN 'completed'
                    ELSE excluded.status
                END,
                comments = COALESCE(excluded.comments, evaluation.comments),
                updated_at = excluded.updated_at
            "#,
            params![
                reviewer_id,
                candidate_id,
                values.scores.courage,
                values.scores.innovation,
                values.scores.implementation,
                values.scores.relevance,
                values.scores.visibility,
                values.total_score,
                values.status.as_str(),
                values.comments,
                ts,
            ],
        )
        .map_err(RepositoryError::from)?;

        let evaluation_id: i64 = tx
            .query_row(
                "SELECT evaluation_id FROM evaluation WHERE reviewer_id = ?1 AND candidate_id = ?2",
                params![reviewer_id, candidate_id],
                |row| row.get(0),
            )
            .map_err(RepositoryError::from)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(evaluation_id)
    }

    pub fn find_by_pair(
        &self,
        reviewer_id: i64,
        candidate_id: i64,
    ) -> RepositoryResult<Option<Evaluation>> {
        let conn = self.get_conn()?;
        Self::find_on(&conn, reviewer_id, candidate_id)
    }

    pub fn list_by_reviewer(&self, reviewer_id: i64) -> RepositoryResult<Vec<Evaluation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM evaluation WHERE reviewer_id = ?1 ORDER BY candidate_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![reviewer_id], map_row)?
            .collect::<SqliteResult<Vec<Evaluation>>>()?;
        Ok(rows)
    }

    /// Completed evaluations of one reviewer on published candidates
    ///
    /// Ordered by total_score desc, then candidate_id asc.
    pub fn completed_for_reviewer(
        &self,
        reviewer_id: i64,
        limit: u32,
    ) -> RepositoryResult<Vec<ReviewerScoreRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.candidate_id, c.name, c.organization, e.total_score
            FROM evaluation e
            JOIN candidate c ON c.candidate_id = e.candidate_id
            WHERE e.reviewer_id = ?1
              AND e.status = 'completed'
              AND c.published = 1
            ORDER BY e.total_score DESC, e.candidate_id ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![reviewer_id, limit], |row| {
                Ok(ReviewerScoreRow {
                    candidate_id: row.get(0)?,
                    name: row.get(1)?,
                    organization: row.get(2)?,
                    total_score: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<ReviewerScoreRow>>>()?;
        Ok(rows)
    }

    /// Mean completed total per published candidate
    ///
    /// # Arguments
    /// - category: restrict to candidates carrying this category tag
    ///
    /// Candidates without completed evaluations never appear.
    /// Ordered by average desc, then candidate_id asc.
    pub fn candidate_averages(
        &self,
        limit: u32,
        category: Option<&str>,
    ) -> RepositoryResult<Vec<CandidateAverageRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.candidate_id, c.name, c.organization,
                   AVG(e.total_score) AS average_score,
                   COUNT(*) AS evaluation_count
            FROM evaluation e
            JOIN candidate c ON c.candidate_id = e.candidate_id
            WHERE e.status = 'completed'
              AND c.published = 1
              AND (?1 IS NULL OR EXISTS (
                  SELECT 1 FROM json_each(c.categories_json) j WHERE j.value = ?1
              ))
            GROUP BY e.candidate_id, c.name, c.organization
            ORDER BY average_score DESC, e.candidate_id ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![category, limit], |row| {
                Ok(CandidateAverageRow {
                    candidate_id: row.get(0)?,
                    name: row.get(1)?,
                    organization: row.get(2)?,
                    average_score: row.get(3)?,
                    evaluation_count: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<CandidateAverageRow>>>()?;
        Ok(rows)
    }

    /// (completed, drafts) for one reviewer
    pub fn counts_for_reviewer(&self, reviewer_id: i64) -> RepositoryResult<(i64, i64)> {
        let conn = self.get_conn()?;
        let counts = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'draft' THEN 1 ELSE 0 END), 0)
            FROM evaluation
            WHERE reviewer_id = ?1
            "#,
            params![reviewer_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// Totals plus per-criterion means over completed evaluations
    pub fn statistics(&self) -> RepositoryResult<EvaluationCounts> {
        let conn = self.get_conn()?;
        let (total, completed, drafts) = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'draft' THEN 1 ELSE 0 END), 0)
            FROM evaluation
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let averages: [Option<f64>; 6] = conn.query_row(
            r#"
            SELECT AVG(total_score),
                   AVG(courage_score), AVG(innovation_score), AVG(implementation_score),
                   AVG(relevance_score), AVG(visibility_score)
            FROM evaluation
            WHERE status = 'completed'
            "#,
            [],
            |row| {
                Ok([
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ])
            },
        )?;

        let by_criterion = Criterion::ALL
            .into_iter()
            .zip(averages[1..].iter())
            .filter_map(|(c, avg)| avg.map(|v| (c, v)))
            .collect();

        Ok(EvaluationCounts {
            total,
            completed,
            drafts,
            average_score: averages[0],
            by_criterion,
        })
    }

    /// Delete evaluations whose assignment no longer exists
    pub fn delete_orphaned(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            DELETE FROM evaluation
            WHERE NOT EXISTS (
                SELECT 1 FROM assignment a
                WHERE a.reviewer_id = evaluation.reviewer_id
                  AND a.candidate_id = evaluation.candidate_id
            )
            "#,
            [],
        )?;
        Ok(affected)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM evaluation", [], |row| row.get(0))?;
        Ok(n)
    }
}

fn map_row(row: &Row) -> SqliteResult<Evaluation> {
    Ok(Evaluation {
        evaluation_id: row.get(0)?,
        reviewer_id: row.get(1)?,
        candidate_id: row.get(2)?,
        scores: CriterionScores {
            courage: row.get(3)?,
            innovation: row.get(4)?,
            implementation: row.get(5)?,
            relevance: row.get(6)?,
            visibility: row.get(7)?,
        },
        total_score: row.get(8)?,
        status: parse_enum::<EvaluationStatus>(9, &row.get::<_, String>(9)?)?,
        comments: row.get(10)?,
        created_at: parse_datetime(11, &row.get::<_, String>(11)?)?,
        updated_at: parse_datetime(12, &row.get::<_, String>(12)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::{Candidate, Reviewer};
    use crate::repository::{AssignmentRepository, CandidateRepository, ReviewerRepository};

    struct Fixture {
        evaluations: EvaluationRepository,
        assignments: AssignmentRepository,
        candidates: CandidateRepository,
    }

    fn setup() -> Fixture {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));
        let reviewers = ReviewerRepository::new(conn.clone());
        let candidates = CandidateRepository::new(conn.clone());
        reviewers.upsert(&Reviewer::new(1, "R1")).unwrap();
        reviewers.upsert(&Reviewer::new(2, "R2")).unwrap();
        candidates
            .upsert(&Candidate::new(10, "A").with_categories(["startups"]))
            .unwrap();
        candidates
            .upsert(&Candidate::new(20, "B").with_categories(["cities"]))
            .unwrap();
        Fixture {
            evaluations: EvaluationRepository::new(conn.clone()),
            assignments: AssignmentRepository::new(conn),
            candidates,
        }
    }

    fn write(
        repo: &EvaluationRepository,
        reviewer_id: i64,
        candidate_id: i64,
        scores: CriterionScores,
        total: f64,
        status: EvaluationStatus,
        comments: Option<&str>,
    ) -> i64 {
        repo.upsert_merged::<_, RepositoryError>(reviewer_id, candidate_id, |_| {
            Ok(EvaluationUpsert {
                scores,
                total_score: total,
                status,
                comments: comments.map(str::to_string),
            })
        })
        .unwrap()
    }

    #[test]
    fn test_upsert_keeps_single_row_and_merges() {
        let f = setup();
        let first = write(
            &f.evaluations,
            1,
            10,
            CriterionScores {
                courage: Some(4.0),
                ..Default::default()
            },
            0.8,
            EvaluationStatus::Draft,
            Some("first"),
        );
        let second = write(
            &f.evaluations,
            1,
            10,
            CriterionScores {
                innovation: Some(6.0),
                ..Default::default()
            },
            2.0,
            EvaluationStatus::Draft,
            None,
        );

        assert_eq!(first, second);
        assert_eq!(f.evaluations.count().unwrap(), 1);
        let stored = f.evaluations.find_by_pair(1, 10).unwrap().unwrap();
        assert_eq!(stored.scores.courage, Some(4.0));
        assert_eq!(stored.scores.innovation, Some(6.0));
        assert_eq!(stored.comments.as_deref(), Some("first"));
    }

    #[test]
    fn test_completed_never_reverts_to_draft() {
        let f = setup();
        let full = CriterionScores::uniform(5.0);
        write(&f.evaluations, 1, 10, full, 5.0, EvaluationStatus::Completed, None);
        write(&f.evaluations, 1, 10, full, 5.0, EvaluationStatus::Draft, None);

        let stored = f.evaluations.find_by_pair(1, 10).unwrap().unwrap();
        assert_eq!(stored.status, EvaluationStatus::Completed);
    }

    #[test]
    fn test_build_error_rolls_back() {
        let f = setup();
        let result = f
            .evaluations
            .upsert_merged(1, 10, |_| Err(RepositoryError::ValidationError("no".into())));
        assert!(result.is_err());
        assert_eq!(f.evaluations.count().unwrap(), 0);
    }

    #[test]
    fn test_candidate_averages_filters_drafts_and_category() {
        let f = setup();
        let full = CriterionScores::uniform(8.0);
        write(&f.evaluations, 1, 10, full, 8.0, EvaluationStatus::Completed, None);
        write(&f.evaluations, 2, 10, full, 6.0, EvaluationStatus::Completed, None);
        write(&f.evaluations, 1, 20, full, 9.0, EvaluationStatus::Draft, None);

        let all = f.evaluations.candidate_averages(10, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].candidate_id, 10);
        assert!((all[0].average_score - 7.0).abs() < 1e-9);
        assert_eq!(all[0].evaluation_count, 2);

        assert!(f
            .evaluations
            .candidate_averages(10, Some("cities"))
            .unwrap()
            .is_empty());

        let mut hidden = Candidate::new(10, "A").with_categories(["startups"]);
        hidden.published = false;
        f.candidates.upsert(&hidden).unwrap();
        assert!(f.evaluations.candidate_averages(10, None).unwrap().is_empty());
    }

    #[test]
    fn test_statistics_and_orphans() {
        let f = setup();
        f.assignments.create(1, 10, "admin").unwrap();
        write(
            &f.evaluations,
            1,
            10,
            CriterionScores::uniform(4.0),
            4.0,
            EvaluationStatus::Completed,
            None,
        );
        write(
            &f.evaluations,
            2,
            20,
            CriterionScores::default(),
            0.0,
            EvaluationStatus::Draft,
            None,
        );

        let stats = f.evaluations.statistics().unwrap();
        assert_eq!((stats.total, stats.completed, stats.drafts), (2, 1, 1));
        assert_eq!(stats.average_score, Some(4.0));
        assert_eq!(stats.by_criterion.get(&Criterion::Courage), Some(&4.0));

        assert_eq!(f.evaluations.delete_orphaned().unwrap(), 1);
        assert_eq!(f.evaluations.counts_for_reviewer(1).unwrap(), (1, 0));
    }
}

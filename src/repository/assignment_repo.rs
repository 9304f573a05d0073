// ==========================================
// Jury Engine - assignment repository
// ==========================================
// Uniqueness of (reviewer_id, candidate_id) is a storage constraint.
// Every insert path does an existence check first, and a UNIQUE violation
// from a concurrent writer is reported as AlreadyExists, not as an error.
// Bulk writes run in one BEGIN IMMEDIATE transaction.
// ==========================================

use crate::domain::assignment::{Assignment, InsertOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{format_datetime, now, parse_datetime};
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "assignment_id, reviewer_id, candidate_id, assigned_at, assigned_by";

// ==========================================
// Bulk write result types
// ==========================================

/// A pair that could not be written, with the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFailure {
    pub reviewer_id: i64,
    pub candidate_id: i64,
    pub reason: String,
}

/// Result of one bulk insert transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkInsertReport {
    /// Rows removed before inserting (clear_first)
    pub cleared: usize,
    pub created: usize,
    pub skipped: usize,
    pub failures: Vec<PairFailure>,
}

/// Per-reviewer load row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerLoadRow {
    pub reviewer_id: i64,
    pub name: String,
    pub assignment_count: i64,
    pub completed_count: i64,
}

/// One planned move used by rebalancing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignmentMove {
    pub assignment_id: i64,
    pub from_reviewer: i64,
    pub to_reviewer: i64,
    pub candidate_id: i64,
}

// ==========================================
// AssignmentRepository
// ==========================================

/// Assignment repository (table `assignment`)
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Guarded insert on an open connection/transaction
    fn insert_guarded(
        conn: &Connection,
        reviewer_id: i64,
        candidate_id: i64,
        assigned_at: &str,
        assigned_by: &str,
    ) -> RepositoryResult<InsertOutcome> {
        if Self::exists_on(conn, reviewer_id, candidate_id)? {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let result = conn.execute(
            r#"
            INSERT INTO assignment (reviewer_id, candidate_id, assigned_at, assigned_by)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![reviewer_id, candidate_id, assigned_at, assigned_by],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Created(conn.last_insert_rowid())),
            Err(e) => {
                let err = RepositoryError::from(e);
                if err.is_unique_violation() {
                    Ok(InsertOutcome::AlreadyExists)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn exists_on(conn: &Connection, reviewer_id: i64, candidate_id: i64) -> RepositoryResult<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM assignment WHERE reviewer_id = ?1 AND candidate_id = ?2",
                params![reviewer_id, candidate_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create a single assignment
    pub fn create(
        &self,
        reviewer_id: i64,
        candidate_id: i64,
        assigned_by: &str,
    ) -> RepositoryResult<InsertOutcome> {
        let conn = self.get_conn()?;
        let assigned_at = format_datetime(&now());
        Self::insert_guarded(&conn, reviewer_id, candidate_id, &assigned_at, assigned_by)
    }

    /// Plan and insert many pairs in one transaction
    ///
    /// # Arguments
    /// - assigned_by: actor recorded on every created row
    /// - clear_first: delete every assignment inside the same transaction first
    /// - plan: receives the pairs stored at transaction start (empty after a
    ///   clear) and returns the (reviewer_id, candidate_id) pairs to insert,
    ///   in order, plus any value the caller wants back
    ///
    /// # Returns
    /// - Ok((BulkInsertReport, T)): per-item failures are collected, not raised
    /// - Err: the transaction could not begin or commit
    ///
    /// # Notes
    /// - `plan` runs under the IMMEDIATE lock, so concurrent rounds plan
    ///   against each other's committed pairs and never overshoot a cap
    pub fn bulk_create<F, T>(
        &self,
        assigned_by: &str,
        clear_first: bool,
        plan: F,
    ) -> RepositoryResult<(BulkInsertReport, T)>
    where
        F: FnOnce(&[(i64, i64)]) -> (Vec<(i64, i64)>, T),
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut report = BulkInsertReport::default();

        if clear_first {
            report.cleared = tx.execute("DELETE FROM assignment", [])?;
        }

        let stored = Self::list_pairs_on(&tx)?;
        let (pairs, planned) = plan(&stored);

        let assigned_at = format_datetime(&now());
        for (reviewer_id, candidate_id) in pairs {
            match Self::insert_guarded(&tx, reviewer_id, candidate_id, &assigned_at, assigned_by) {
                Ok(InsertOutcome::Created(_)) => report.created += 1,
                Ok(InsertOutcome::AlreadyExists) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(reviewer_id, candidate_id, error = %e, "assignment insert failed");
                    report.failures.push(PairFailure {
                        reviewer_id,
                        candidate_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok((report, planned))
    }

    pub fn exists(&self, reviewer_id: i64, candidate_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Self::exists_on(&conn, reviewer_id, candidate_id)
    }

    pub fn list_by_reviewer(&self, reviewer_id: i64) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM assignment WHERE reviewer_id = ?1 ORDER BY candidate_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![reviewer_id], map_row)?
            .collect::<SqliteResult<Vec<Assignment>>>()?;
        Ok(rows)
    }

    /// All (reviewer_id, candidate_id) pairs
    pub fn list_pairs(&self) -> RepositoryResult<Vec<(i64, i64)>> {
        let conn = self.get_conn()?;
        Self::list_pairs_on(&conn)
    }

    fn list_pairs_on(conn: &Connection) -> RepositoryResult<Vec<(i64, i64)>> {
        let mut stmt =
            conn.prepare("SELECT reviewer_id, candidate_id FROM assignment ORDER BY assignment_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<Vec<(i64, i64)>>>()?;
        Ok(rows)
    }

    /// reviewer_id -> number of assignments held
    pub fn load_by_reviewer(&self) -> RepositoryResult<HashMap<i64, i64>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT reviewer_id, COUNT(*) FROM assignment GROUP BY reviewer_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<SqliteResult<HashMap<i64, i64>>>()?;
        Ok(rows)
    }

    /// Per-reviewer load for every reviewer (zero rows included), busiest first
    pub fn reviewer_loads(&self) -> RepositoryResult<Vec<ReviewerLoadRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.reviewer_id, r.name,
                   (SELECT COUNT(*) FROM assignment a WHERE a.reviewer_id = r.reviewer_id),
                   (SELECT COUNT(*) FROM evaluation e
                     WHERE e.reviewer_id = r.reviewer_id AND e.status = 'completed')
            FROM reviewer r
            ORDER BY 3 DESC, r.reviewer_id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ReviewerLoadRow {
                    reviewer_id: row.get(0)?,
                    name: row.get(1)?,
                    assignment_count: row.get(2)?,
                    completed_count: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<ReviewerLoadRow>>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM assignment", [], |row| row.get(0))?;
        Ok(n)
    }

    /// (distinct candidates, distinct reviewers) holding at least one assignment
    pub fn count_distinct(&self) -> RepositoryResult<(i64, i64)> {
        let conn = self.get_conn()?;
        let counts = conn.query_row(
            "SELECT COUNT(DISTINCT candidate_id), COUNT(DISTINCT reviewer_id) FROM assignment",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    pub fn delete_pair(&self, reviewer_id: i64, candidate_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM assignment WHERE reviewer_id = ?1 AND candidate_id = ?2",
            params![reviewer_id, candidate_id],
        )?;
        Ok(affected > 0)
    }

    pub fn delete_by_reviewer(&self, reviewer_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM assignment WHERE reviewer_id = ?1",
            params![reviewer_id],
        )?;
        Ok(affected)
    }

    pub fn delete_by_candidate(&self, candidate_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM assignment WHERE candidate_id = ?1",
            params![candidate_id],
        )?;
        Ok(affected)
    }

    /// Delete every assignment in one transaction
    pub fn clear_all(&self) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let affected = tx.execute("DELETE FROM assignment", [])?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(affected)
    }

    /// Assignments of a reviewer that have no evaluation yet
    pub fn list_movable_for_reviewer(&self, reviewer_id: i64) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM assignment a
            WHERE a.reviewer_id = ?1
              AND NOT EXISTS (
                  SELECT 1 FROM evaluation e
                  WHERE e.reviewer_id = a.reviewer_id AND e.candidate_id = a.candidate_id
              )
            ORDER BY a.candidate_id DESC
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![reviewer_id], map_row)?
            .collect::<SqliteResult<Vec<Assignment>>>()?;
        Ok(rows)
    }

    /// Re-point assignments to other reviewers in one transaction
    ///
    /// A move whose target already holds the candidate is dropped.
    /// Returns the moves that were applied.
    pub fn apply_moves(&self, moves: &[AssignmentMove]) -> RepositoryResult<Vec<AssignmentMove>> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut applied = Vec::with_capacity(moves.len());
        let assigned_at = format_datetime(&now());
        for mv in moves {
            let result = tx.execute(
                r#"
                UPDATE assignment SET reviewer_id = ?2, assigned_at = ?3
                WHERE assignment_id = ?1 AND reviewer_id = ?4
                "#,
                params![mv.assignment_id, mv.to_reviewer, assigned_at, mv.from_reviewer],
            );
            match result.map_err(RepositoryError::from) {
                Ok(1) => applied.push(*mv),
                Ok(_) => {}
                Err(e) if e.is_unique_violation() => {}
                Err(e) => return Err(e),
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(applied)
    }
}

fn map_row(row: &Row) -> SqliteResult<Assignment> {
    Ok(Assignment {
        assignment_id: row.get(0)?,
        reviewer_id: row.get(1)?,
        candidate_id: row.get(2)?,
        assigned_at: parse_datetime(3, &row.get::<_, String>(3)?)?,
        assigned_by: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::{Candidate, Reviewer};
    use crate::repository::{CandidateRepository, ReviewerRepository};

    fn setup() -> AssignmentRepository {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));
        let reviewers = ReviewerRepository::new(conn.clone());
        let candidates = CandidateRepository::new(conn.clone());
        for id in 1..=3 {
            reviewers.upsert(&Reviewer::new(id, format!("R{id}"))).unwrap();
            candidates.upsert(&Candidate::new(id * 10, format!("C{id}"))).unwrap();
        }
        AssignmentRepository::new(conn)
    }

    #[test]
    fn test_create_twice_reports_already_exists() {
        let repo = setup();
        assert!(matches!(repo.create(1, 10, "admin").unwrap(), InsertOutcome::Created(_)));
        assert_eq!(repo.create(1, 10, "admin").unwrap(), InsertOutcome::AlreadyExists);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_bulk_create_counts_skips_and_failures() {
        let repo = setup();
        repo.create(2, 20, "admin").unwrap();

        // (9, 10): unknown reviewer -> foreign key failure, batch continues
        let (report, ()) = repo
            .bulk_create("auto", false, |_| {
                (vec![(1, 10), (2, 20), (9, 10), (1, 10), (3, 30)], ())
            })
            .unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].reviewer_id, 9);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn test_bulk_create_clear_first() {
        let repo = setup();
        repo.create(1, 10, "admin").unwrap();
        repo.create(1, 20, "admin").unwrap();

        let (report, seen) = repo
            .bulk_create("auto", true, |stored| (vec![(2, 10)], stored.len()))
            .unwrap();
        assert_eq!(seen, 0);
        assert_eq!(report.cleared, 2);
        assert_eq!(report.created, 1);
        assert_eq!(repo.list_pairs().unwrap(), vec![(2, 10)]);
    }

    #[test]
    fn test_bulk_create_plans_against_stored_pairs() {
        let repo = setup();
        repo.create(1, 10, "admin").unwrap();

        let (report, seen) = repo
            .bulk_create("auto", false, |stored| {
                let pairs = if stored.contains(&(1, 10)) {
                    vec![(2, 20)]
                } else {
                    vec![(1, 10)]
                };
                (pairs, stored.to_vec())
            })
            .unwrap();
        assert_eq!(seen, vec![(1, 10)]);
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_delete_variants() {
        let repo = setup();
        repo.bulk_create("auto", false, |_| (vec![(1, 10), (1, 20), (2, 10), (3, 30)], ()))
            .unwrap();

        assert!(repo.delete_pair(3, 30).unwrap());
        assert!(!repo.delete_pair(3, 30).unwrap());
        assert_eq!(repo.delete_by_candidate(10).unwrap(), 2);
        assert_eq!(repo.delete_by_reviewer(1).unwrap(), 1);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_apply_moves_skips_duplicate_target() {
        let repo = setup();
        repo.bulk_create("auto", false, |_| (vec![(1, 10), (1, 20), (2, 20)], ()))
            .unwrap();
        let held = repo.list_by_reviewer(1).unwrap();
        let (a10, a20) = (&held[0], &held[1]);
        assert_eq!((a10.candidate_id, a20.candidate_id), (10, 20));

        let applied = repo
            .apply_moves(&[
                AssignmentMove {
                    assignment_id: a10.assignment_id,
                    from_reviewer: 1,
                    to_reviewer: 2,
                    candidate_id: 10,
                },
                AssignmentMove {
                    assignment_id: a20.assignment_id,
                    from_reviewer: 1,
                    to_reviewer: 2,
                    candidate_id: 20,
                },
            ])
            .unwrap();

        assert_eq!(applied.len(), 1);
        assert!(repo.exists(2, 10).unwrap());
        assert!(repo.exists(1, 20).unwrap());
    }
}

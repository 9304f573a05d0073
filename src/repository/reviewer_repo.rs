// ==========================================
// Jury Engine - reviewer repository
// ==========================================

use crate::domain::reviewer::Reviewer;
use crate::domain::types::ReviewerStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{parse_enum, tags_from_json, tags_to_json};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str =
    "reviewer_id, name, categories_json, expertise_json, max_assignments, status";

/// Reviewer repository (table `reviewer`)
pub struct ReviewerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReviewerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, reviewer: &Reviewer) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO reviewer (
                reviewer_id, name, categories_json, expertise_json, max_assignments, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(reviewer_id) DO UPDATE SET
                name = excluded.name,
                categories_json = excluded.categories_json,
                expertise_json = excluded.expertise_json,
                max_assignments = excluded.max_assignments,
                status = excluded.status,
                updated_at = datetime('now')
            "#,
            params![
                reviewer.reviewer_id,
                reviewer.name,
                tags_to_json(&reviewer.categories),
                tags_to_json(&reviewer.expertise),
                reviewer.max_assignments,
                reviewer.status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn exists(&self, reviewer_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM reviewer WHERE reviewer_id = ?1",
                params![reviewer_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Active reviewers ordered by id
    pub fn list_active(&self) -> RepositoryResult<Vec<Reviewer>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM reviewer WHERE status = ?1 ORDER BY reviewer_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![ReviewerStatus::Active.as_str()], map_row)?
            .collect::<SqliteResult<Vec<Reviewer>>>()?;
        Ok(rows)
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM reviewer", [], |row| row.get(0))?;
        Ok(n)
    }
}

fn map_row(row: &Row) -> SqliteResult<Reviewer> {
    Ok(Reviewer {
        reviewer_id: row.get(0)?,
        name: row.get(1)?,
        categories: tags_from_json(2, &row.get::<_, String>(2)?)?,
        expertise: tags_from_json(3, &row.get::<_, String>(3)?)?,
        max_assignments: row.get(4)?,
        status: parse_enum(5, &row.get::<_, String>(5)?)?,
    })
}

// ==========================================
// Jury Engine - candidate repository
// ==========================================
// No business logic here: CRUD and existence checks only.
// ==========================================

use crate::domain::candidate::Candidate;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{tags_from_json, tags_to_json};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str =
    "candidate_id, name, organization, categories_json, expertise_json, published";

/// Candidate repository (table `candidate`)
pub struct CandidateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CandidateRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Insert or update a candidate by id
    pub fn upsert(&self, candidate: &Candidate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO candidate (
                candidate_id, name, organization, categories_json, expertise_json, published
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(candidate_id) DO UPDATE SET
                name = excluded.name,
                organization = excluded.organization,
                categories_json = excluded.categories_json,
                expertise_json = excluded.expertise_json,
                published = excluded.published,
                updated_at = datetime('now')
            "#,
            params![
                candidate.candidate_id,
                candidate.name,
                candidate.organization,
                tags_to_json(&candidate.categories),
                tags_to_json(&candidate.expertise),
                candidate.published,
            ],
        )?;
        Ok(())
    }

    pub fn exists(&self, candidate_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM candidate WHERE candidate_id = ?1",
                params![candidate_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Published candidates ordered by id
    pub fn list_published(&self) -> RepositoryResult<Vec<Candidate>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM candidate WHERE published = 1 ORDER BY candidate_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<Candidate>>>()?;
        Ok(rows)
    }

    /// Published candidates without any assignment
    pub fn list_unassigned(&self) -> RepositoryResult<Vec<Candidate>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM candidate c
            WHERE c.published = 1
              AND NOT EXISTS (SELECT 1 FROM assignment a WHERE a.candidate_id = c.candidate_id)
            ORDER BY c.name, c.candidate_id
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<Candidate>>>()?;
        Ok(rows)
    }

    pub fn count_published(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM candidate WHERE published = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

fn map_row(row: &Row) -> SqliteResult<Candidate> {
    Ok(Candidate {
        candidate_id: row.get(0)?,
        name: row.get(1)?,
        organization: row.get(2)?,
        categories: tags_from_json(3, &row.get::<_, String>(3)?)?,
        expertise: tags_from_json(4, &row.get::<_, String>(4)?)?,
        published: row.get(5)?,
    })
}

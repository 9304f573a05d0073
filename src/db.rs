// ==========================================
// Jury Engine - SQLite connection setup
// ==========================================
// Goals:
// - every Connection::open goes through the same PRAGMAs (foreign keys on)
// - one busy_timeout for all connections so concurrent writers wait
//   instead of failing with SQLITE_BUSY
// - schema creation is idempotent
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version this code expects
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Timestamp format used by every TEXT datetime column
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Apply the per-connection PRAGMAs
///
/// foreign_keys and busy_timeout are connection-scoped in SQLite.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// In-memory connection with schema, for tests and dry runs
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create all tables and indexes (idempotent)
///
/// Tables:
/// - candidate / reviewer: entity rows, tags as JSON arrays
/// - assignment: UNIQUE(reviewer_id, candidate_id)
/// - evaluation: UNIQUE(reviewer_id, candidate_id), nullable criterion columns
/// - config_kv: key-value configuration (weights, defaults)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS candidate (
            candidate_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            organization TEXT,
            categories_json TEXT NOT NULL DEFAULT '[]',
            expertise_json TEXT NOT NULL DEFAULT '[]',
            published INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS reviewer (
            reviewer_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            categories_json TEXT NOT NULL DEFAULT '[]',
            expertise_json TEXT NOT NULL DEFAULT '[]',
            max_assignments INTEGER NOT NULL DEFAULT 50 CHECK (max_assignments >= 0),
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'inactive', 'pending')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS assignment (
            assignment_id INTEGER PRIMARY KEY AUTOINCREMENT,
            reviewer_id INTEGER NOT NULL REFERENCES reviewer(reviewer_id) ON DELETE CASCADE,
            candidate_id INTEGER NOT NULL REFERENCES candidate(candidate_id) ON DELETE CASCADE,
            assigned_at TEXT NOT NULL,
            assigned_by TEXT NOT NULL,
            UNIQUE (reviewer_id, candidate_id)
        );

        CREATE INDEX IF NOT EXISTS idx_assignment_candidate ON assignment(candidate_id);

        CREATE TABLE IF NOT EXISTS evaluation (
            evaluation_id INTEGER PRIMARY KEY AUTOINCREMENT,
            reviewer_id INTEGER NOT NULL REFERENCES reviewer(reviewer_id) ON DELETE CASCADE,
            candidate_id INTEGER NOT NULL REFERENCES candidate(candidate_id) ON DELETE CASCADE,
            courage_score REAL CHECK (courage_score IS NULL OR courage_score BETWEEN 0 AND 10),
            innovation_score REAL CHECK (innovation_score IS NULL OR innovation_score BETWEEN 0 AND 10),
            implementation_score REAL CHECK (implementation_score IS NULL OR implementation_score BETWEEN 0 AND 10),
            relevance_score REAL CHECK (relevance_score IS NULL OR relevance_score BETWEEN 0 AND 10),
            visibility_score REAL CHECK (visibility_score IS NULL OR visibility_score BETWEEN 0 AND 10),
            total_score REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL CHECK (status IN ('draft', 'completed')),
            comments TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (reviewer_id, candidate_id)
        );

        CREATE INDEX IF NOT EXISTS idx_evaluation_candidate_status ON evaluation(candidate_id, status);
        CREATE INDEX IF NOT EXISTS idx_evaluation_reviewer_status ON evaluation(reviewer_id, status);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Read schema_version (None when the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

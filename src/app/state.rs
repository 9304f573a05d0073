// ==========================================
// Jury Engine - application state
// ==========================================
// Wires repositories, engines and APIs over one shared connection.
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{AssignmentApi, ConfigApi, EvaluationApi, RankingApi, RegistryApi};
use crate::cache::{MemoryStatsCache, StatisticsCache};
use crate::config::{ConfigManager, WeightConfig};
use crate::db::{
    init_schema, open_in_memory, open_sqlite_connection, read_schema_version,
    CURRENT_SCHEMA_VERSION,
};
use crate::engine::{AssignmentEngine, EvaluationAggregator, RankingService, StatisticsService};
use crate::repository::{
    AssignmentRepository, CandidateRepository, EvaluationRepository, RepositoryError,
    RepositoryResult, ReviewerRepository,
};

/// Environment variable overriding the database path
pub const DB_PATH_ENV: &str = "JURY_ENGINE_DB";

/// Shared state for one database
pub struct AppState {
    pub db_path: String,

    pub assignment_api: Arc<AssignmentApi>,
    pub evaluation_api: Arc<EvaluationApi>,
    pub ranking_api: Arc<RankingApi>,
    pub registry_api: Arc<RegistryApi>,
    pub config_api: Arc<ConfigApi>,

    /// Entity repositories (candidate/reviewer registration)
    pub candidate_repo: Arc<CandidateRepository>,
    pub reviewer_repo: Arc<ReviewerRepository>,

    pub config: Arc<ConfigManager>,
    pub cache: Arc<dyn StatisticsCache>,
}

impl AppState {
    /// Open (and if needed create) the database at `db_path`
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        tracing::info!(db_path, "initializing app state");
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        if let Some(version) = read_schema_version(&conn)? {
            if version > CURRENT_SCHEMA_VERSION {
                return Err(RepositoryError::DatabaseConnectionError(format!(
                    "database schema version {} is newer than supported version {}",
                    version, CURRENT_SCHEMA_VERSION
                )));
            }
        }
        init_schema(&conn)?;
        Self::from_connection(Arc::new(Mutex::new(conn)), db_path)
    }

    /// Fresh in-memory database
    pub fn in_memory() -> RepositoryResult<Self> {
        let conn = open_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)), ":memory:")
    }

    fn from_connection(conn: Arc<Mutex<Connection>>, db_path: &str) -> RepositoryResult<Self> {
        // ===== repositories =====
        let candidate_repo = Arc::new(CandidateRepository::new(conn.clone()));
        let reviewer_repo = Arc::new(ReviewerRepository::new(conn.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::new(conn.clone()));
        let evaluation_repo = Arc::new(EvaluationRepository::new(conn.clone()));

        // ===== config & cache =====
        let config = Arc::new(ConfigManager::from_connection(conn)?);
        let ttl_minutes = config.get_stats_cache_ttl_minutes()?;
        let cache: Arc<dyn StatisticsCache> = Arc::new(MemoryStatsCache::with_ttl_minutes(ttl_minutes));
        let weights: Arc<dyn WeightConfig> = config.clone();

        // ===== engines =====
        let assignment_engine = Arc::new(AssignmentEngine::new(
            candidate_repo.clone(),
            reviewer_repo.clone(),
            assignment_repo.clone(),
            cache.clone(),
        ));
        let statistics = Arc::new(StatisticsService::new(
            candidate_repo.clone(),
            reviewer_repo.clone(),
            assignment_repo.clone(),
            evaluation_repo.clone(),
            cache.clone(),
        ));
        let aggregator = Arc::new(EvaluationAggregator::new(
            reviewer_repo.clone(),
            candidate_repo.clone(),
            assignment_repo,
            evaluation_repo.clone(),
            weights,
            cache.clone(),
        ));
        let ranking = Arc::new(RankingService::new(
            reviewer_repo.clone(),
            evaluation_repo,
            cache.clone(),
        ));

        // ===== APIs =====
        let assignment_api = Arc::new(AssignmentApi::new(
            assignment_engine,
            statistics.clone(),
            config.clone(),
        ));
        let evaluation_api = Arc::new(EvaluationApi::new(aggregator, statistics));
        let ranking_api = Arc::new(RankingApi::new(ranking));
        let registry_api = Arc::new(RegistryApi::new(
            candidate_repo.clone(),
            reviewer_repo.clone(),
            config.clone(),
            cache.clone(),
        ));
        let config_api = Arc::new(ConfigApi::new(config.clone()));

        tracing::info!(ttl_minutes, "app state ready");
        Ok(Self {
            db_path: db_path.to_string(),
            assignment_api,
            evaluation_api,
            ranking_api,
            registry_api,
            config_api,
            candidate_repo,
            reviewer_repo,
            config,
            cache,
        })
    }
}

/// Default database path
///
/// `JURY_ENGINE_DB` wins; otherwise `<data_dir>/jury-engine/jury_engine.db`,
/// falling back to `./jury_engine.db` when no data directory is known.
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./jury_engine.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("jury-engine");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join("jury_engine.db"),
            Err(e) => tracing::warn!(error = %e, dir = %dir.display(), "cannot create data dir"),
        }
    }
    path.to_string_lossy().to_string()
}

use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::gauge;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
    /// Echo statements through sqlx logging
    pub sqlx_logging: bool,
    /// How long a SQLite connection waits on a locked database before the
    /// statement fails with a write conflict
    pub sqlite_busy_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(300),
            acquire_timeout: Duration::from_secs(30),
            sqlx_logging: false,
            sqlite_busy_timeout: Duration::from_secs(5),
        }
    }
}

impl DbConfig {
    /// Single shared connection to a private in-memory SQLite database.
    ///
    /// Every `sqlite::memory:` connection opens its own database, so the pool
    /// is pinned to exactly one connection; concurrent transactions queue on it.
    pub fn in_memory_sqlite() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
            sqlx_logging: cfg.log_level.eq_ignore_ascii_case("trace"),
            ..Default::default()
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(config.sqlx_logging);

    let busy_timeout = config.sqlite_busy_timeout;
    opt.map_sqlx_sqlite_opts(move |sqlite| sqlite.busy_timeout(busy_timeout));

    gauge!("campus_ledger.db.max_connections", config.max_connections as f64);

    info!(
        max_connections = config.max_connections,
        "Connecting to database"
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        ServiceError::db_error(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig::from(cfg)).await
}

/// Applies every pending schema migration.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    migrations::Migrator::up(pool, None).await.map_err(|e| {
        error!("Migration failed: {}", e);
        ServiceError::db_error(e)
    })?;

    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Database migrations completed"
    );
    Ok(())
}

/// Round-trips a trivial statement to confirm the pool is usable.
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let backend = pool.get_database_backend();
    pool.execute(Statement::from_string(backend, "SELECT 1"))
        .await
        .map(|_| ())
        .map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_maps_pool_settings() {
        let mut cfg = AppConfig::new("postgres://localhost/ledger".into(), "test".into());
        cfg.db_max_connections = 25;
        cfg.db_acquire_timeout_secs = 4;

        let db = DbConfig::from(&cfg);
        assert_eq!(db.url, "postgres://localhost/ledger");
        assert_eq!(db.max_connections, 25);
        assert_eq!(db.acquire_timeout, Duration::from_secs(4));
        assert!(!db.sqlx_logging);
    }

    #[tokio::test]
    async fn in_memory_pool_migrates_and_answers() {
        let pool = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        check_connection(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn locked_file_surfaces_as_write_conflict() {
        use crate::errors::ServiceError;
        use sea_orm::TransactionTrait;

        let dir = tempfile::TempDir::new().unwrap();
        let pool = establish_connection_with_config(&DbConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("busy.db").display()),
            max_connections: 2,
            sqlite_busy_timeout: Duration::from_millis(50),
            ..Default::default()
        })
        .await
        .unwrap();
        pool.execute_unprepared("CREATE TABLE ledger_lock (n INTEGER)")
            .await
            .unwrap();

        let holder = pool.begin().await.unwrap();
        holder
            .execute_unprepared("INSERT INTO ledger_lock VALUES (1)")
            .await
            .unwrap();

        let contender = pool.begin().await.unwrap();
        let err = contender
            .execute_unprepared("INSERT INTO ledger_lock VALUES (2)")
            .await
            .unwrap_err();
        let err = ServiceError::from(err);
        assert!(matches!(err, ServiceError::WriteConflict(_)), "{err:?}");
        assert!(err.is_retryable());

        contender.rollback().await.unwrap();
        holder.commit().await.unwrap();
    }
}

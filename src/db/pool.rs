//! Connection pool management.
//!
//! One `PgPool` per process, created lazily on first use. Initialization is
//! single-flight: concurrent first callers wait on the same attempt instead of
//! opening their own pools. A failed attempt leaves the pool unset so the next
//! call retries.

use crate::config::{DatabaseSettings, PoolSettings};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionStatus, ConnectionTarget};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

const CONNECTION_CHECK_SQL: &str = "SELECT version(), current_database(), current_user";

/// Session parameters set on every connection. Text-format intervals then
/// arrive as ISO-8601 durations, matching the binary rendering.
const SESSION_OPTIONS: [(&str, &str); 1] = [("IntervalStyle", "iso_8601")];

/// Idle connections above `min_connections` are closed after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Owns the shared pool and its creation parameters.
#[derive(Debug)]
pub struct PoolManager {
    database: DatabaseSettings,
    settings: PoolSettings,
    pool: OnceCell<PgPool>,
    init_attempts: AtomicUsize,
}

impl PoolManager {
    pub fn new(database: DatabaseSettings, settings: PoolSettings) -> Self {
        Self {
            database,
            settings,
            pool: OnceCell::new(),
            init_attempts: AtomicUsize::new(0),
        }
    }

    /// Create the pool if it does not exist yet.
    pub async fn ensure_ready(&self) -> DbResult<()> {
        self.pool().await.map(|_| ())
    }

    /// The live pool, initializing it on first use.
    pub async fn pool(&self) -> DbResult<&PgPool> {
        self.pool.get_or_try_init(|| self.create_pool()).await
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    /// Number of pool creation attempts made so far.
    pub fn init_attempts(&self) -> usize {
        self.init_attempts.load(Ordering::SeqCst)
    }

    /// Upper bound for a single statement.
    pub fn query_timeout(&self) -> Duration {
        self.settings.query_timeout
    }

    pub fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    /// Run a database round trip under the statement timeout.
    pub async fn bounded<T, F>(&self, operation: &str, fut: F) -> DbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let limit = self.settings.query_timeout;
        match timeout(limit, fut).await {
            Ok(result) => result.map_err(|e| self.translate(e)),
            Err(_) => Err(DbError::timeout(operation, limit)),
        }
    }

    /// Pool acquire timeouts report the configured acquire limit.
    fn translate(&self, err: sqlx::Error) -> DbError {
        match err {
            sqlx::Error::PoolTimedOut => {
                DbError::timeout("connection pool acquire", self.settings.acquire_timeout)
            }
            other => other.into(),
        }
    }

    /// Round trip reporting server version, database and user.
    ///
    /// Performs lazy initialization when needed. Never fails: problems are
    /// reported as [`ConnectionStatus::Failed`].
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.check_connection().await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "Database connection test failed");
                ConnectionStatus::failed(e.to_string())
            }
        }
    }

    async fn check_connection(&self) -> DbResult<ConnectionStatus> {
        let pool = self.pool().await?;
        let row = self
            .bounded(
                "connection test",
                sqlx::query(CONNECTION_CHECK_SQL).fetch_one(pool),
            )
            .await?;

        Ok(ConnectionStatus::Connected {
            version: row.try_get(0)?,
            database: row.try_get(1)?,
            user: row.try_get(2)?,
            connection_info: ConnectionTarget {
                host: self.database.host().to_string(),
                port: self.database.port(),
                database: self.database.database().to_string(),
            },
        })
    }

    /// Close the pool. Only called at process shutdown.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!("PostgreSQL connection pool closed");
        }
    }

    async fn create_pool(&self) -> DbResult<PgPool> {
        let attempt = self.init_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            target_db = %self.database.redacted_connection_string(),
            min_connections = self.settings.min_connections,
            max_connections = self.settings.max_connections,
            attempt,
            "Initializing PostgreSQL connection pool"
        );

        let options = PgConnectOptions::from_str(self.database.connection_string())?
            .options(SESSION_OPTIONS);

        let pool = PgPoolOptions::new()
            .min_connections(self.settings.min_connections)
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout)
            .idle_timeout(Some(IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(|e| {
                warn!(error = %e, attempt, "Failed to initialize connection pool");
                DbError::connection(format!("Failed to initialize connection pool: {}", e))
            })?;

        debug!(size = pool.size(), "PostgreSQL connection pool ready");
        Ok(pool)
    }
}

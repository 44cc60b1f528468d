//! # Database Pool
//!
//! One SQLite file per till, shared by the checkout and the back office.
//!
//! ## Writers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SQLite: many readers, one writer                      │
//! │                                                                         │
//! │  finalize_cart ──┐                                                      │
//! │  debt payment ───┼──► BEGIN IMMEDIATE ──► write lock held until COMMIT  │
//! │  resume parked ──┘         │                                            │
//! │                            │ lock taken by another connection?          │
//! │                            ▼                                            │
//! │                 wait up to busy_timeout, then DbError::Busy             │
//! │                                                                         │
//! │  reads (lookups, listings) never wait: WAL gives them a snapshot        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write transactions start with `BEGIN IMMEDIATE` ([`begin_write`]). A
//! deferred `BEGIN` that reads first and writes later can fail with
//! `SQLITE_BUSY` without waiting when another writer commits in between;
//! an immediate one queues on the busy handler instead.
//!
//! The conditional debt update relies on this: payments are serialized by
//! the write lock, and the `version` guard decides which of them may land.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::debt::DebtRepository;
use crate::repository::payment_method::PaymentMethodRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::suspended::SuspendedSaleRepository;

/// Statement that opens every write transaction.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/duka/till.db")
///     .max_connections(4)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect. `:memory:` for tests.
    pub database_path: PathBuf,

    /// Pool size. Default 5: one till plus back-office readers.
    pub max_connections: u32,

    /// How long a writer waits for the write lock before giving up.
    /// Default 5 seconds.
    pub busy_timeout: Duration,

    /// How long a caller waits for a free pooled connection.
    /// Default 30 seconds.
    pub acquire_timeout: Duration,

    /// Apply pending migrations on connect. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Isolated database for tests.
    ///
    /// Every SQLite connection to `:memory:` opens its own database, so the
    /// pool is pinned to a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(":memory:")
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);

        Ok(options)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the till database. Clones share one pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./duka.db")).await?;
/// let owed = db.debts().customer_balance("Alice").await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening till database"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }

        debug!("Database ready");
        Ok(db)
    }

    /// The underlying pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn payment_methods(&self) -> PaymentMethodRepository {
        PaymentMethodRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn debts(&self) -> DebtRepository {
        DebtRepository::new(self.pool.clone())
    }

    pub fn suspended_sales(&self) -> SuspendedSaleRepository {
        SuspendedSaleRepository::new(self.pool.clone())
    }

    /// True if the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Opens a write transaction holding SQLite's write lock from the start.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with(BEGIN_WRITE).await?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_migrations_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();

        assert!(total > 0);
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_busy_timeout_reaches_connection() {
        let db = Database::new(DbConfig::in_memory().busy_timeout(Duration::from_millis(1_500)))
            .await
            .unwrap();

        let timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(timeout, 1_500);
    }

    #[tokio::test]
    async fn test_second_writer_times_out_as_busy() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("till.db"))
            .max_connections(2)
            .busy_timeout(Duration::from_millis(100));
        let db = Database::new(config).await.unwrap();

        let first = begin_write(db.pool()).await.unwrap();
        let err = begin_write(db.pool()).await.unwrap_err();
        assert!(matches!(err, DbError::Busy));

        first.rollback().await.unwrap();
        assert!(begin_write(db.pool()).await.is_ok());
    }
}

//! # Database Migrations
//!
//! The schema ships inside the binary; a till upgrades itself on connect.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_checkout_schema.sql   products, payment methods, sales, lines, payments
//! └── 002_debt_ledger.sql       debts, debt payments, suspended sales
//! ```
//!
//! Money columns are `_cents` integers. Row-level ledger invariants
//! (`balance = amount - paid`, positive payment amounts) are also CHECK
//! constraints and surface as [`DbError::CheckViolation`].
//! Applied files are never edited; a schema change is a new numbered file.
//!
//! [`DbError::CheckViolation`]: crate::error::DbError::CheckViolation

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in file order, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;

    info!(count = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts.
///
/// Only migrations recorded as successful count as applied. A database
/// that has never been migrated reports zero.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    Ok((total, applied as usize))
}

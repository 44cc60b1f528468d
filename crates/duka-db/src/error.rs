//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (duka-core)               │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ◄── Domain(CoreError) keeps the checkout        │
//! │       │                    message and category intact                 │
//! │       ▼                                                                 │
//! │  Caller maps category → user-facing treatment                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use duka_core::error::{CoreError, ErrorCategory};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE or PRIMARY KEY constraint rejected the row.
    #[error("Duplicate value for {constraint}")]
    UniqueViolation { constraint: String },

    /// A row referenced a product, sale, debt or payment method that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK constraint rejected the row, e.g. a debt whose balance does
    /// not equal amount minus paid.
    #[error("Constraint violated: {message}")]
    CheckViolation { message: String },

    /// A checkout or ledger rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Another connection held the write lock for longer than the busy timeout.
    #[error("Database is busy, please retry")]
    Busy,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value could not be decoded (e.g. a corrupt snapshot).
    #[error("Corrupt {entity} record: {reason}")]
    Corrupt { entity: String, reason: String },

    /// No pooled connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Primary result code of `SQLITE_BUSY`; extended codes keep it in the low byte.
const SQLITE_BUSY: i32 = 5;

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the wrapped domain error, if this is one.
    pub fn domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Category for caller-facing errors, `None` for infrastructure failures.
    ///
    /// `Busy` is a conflict: the same request can succeed on retry.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            DbError::Domain(err) => Some(err.category()),
            DbError::NotFound { .. } => Some(ErrorCategory::NotFound),
            DbError::Busy => Some(ErrorCategory::Conflict),
            _ => None,
        }
    }
}

impl From<duka_core::ValidationError> for DbError {
    fn from(err: duka_core::ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Classifies sqlx errors.
///
/// ## Error Mapping
/// ```text
/// RowNotFound                      → NotFound
/// Database, SQLITE_BUSY*           → Busy
/// Database, UNIQUE / PRIMARY KEY   → UniqueViolation
/// Database, FOREIGN KEY            → ForeignKeyViolation
/// Database, CHECK                  → CheckViolation
/// Database, anything else          → QueryFailed
/// PoolTimedOut                     → PoolExhausted
/// Other                            → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let busy = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .is_some_and(|code| code & 0xff == SQLITE_BUSY);
                if busy {
                    return DbError::Busy;
                }

                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        // "UNIQUE constraint failed: payment_methods.id"
                        constraint: message
                            .rsplit(": ")
                            .next()
                            .unwrap_or_default()
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation => DbError::CheckViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::Money;

    #[test]
    fn test_domain_error_keeps_message() {
        let err: DbError = CoreError::InsufficientTender {
            shortfall: Money::from_cents(5_000),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient payment: short by 50.00. Attach a customer to sell on credit"
        );
        assert_eq!(err.category(), Some(ErrorCategory::Policy));
    }

    #[test]
    fn test_row_not_found_maps() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(err.domain().is_none());
    }

    #[tokio::test]
    async fn test_constraint_failures_are_classified() {
        use crate::pool::{Database, DbConfig};
        use duka_core::{PaymentMethod, PaymentMethodKind};

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cash = PaymentMethod {
            id: "cash".to_string(),
            name: "Cash".to_string(),
            kind: PaymentMethodKind::Cash,
            is_active: true,
        };
        db.payment_methods().insert(&cash).await.unwrap();

        let err = db.payment_methods().insert(&cash).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref constraint } if constraint == "payment_methods.id"));

        let err: DbError = sqlx::query(
            "INSERT INTO sale_payments (id, sale_id, payment_method_id, method_name, method_kind, amount_cents) \
             VALUES ('p1', 'no-such-sale', 'cash', 'Cash', 'cash', 100)",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}

//! # Payment Method Repository
//!
//! The configured tender types (Cash, M-Pesa, ...). The till reads them to
//! build tender entries; finalize trusts the entry's captured `is_active`.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use duka_core::PaymentMethod;

/// Repository for payment method operations.
#[derive(Debug, Clone)]
pub struct PaymentMethodRepository {
    pool: SqlitePool,
}

impl PaymentMethodRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentMethodRepository { pool }
    }

    /// Inserts a payment method.
    pub async fn insert(&self, method: &PaymentMethod) -> DbResult<PaymentMethod> {
        debug!(id = %method.id, kind = ?method.kind, "Inserting payment method");

        sqlx::query(
            "INSERT INTO payment_methods (id, name, kind, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&method.id)
        .bind(&method.name)
        .bind(method.kind)
        .bind(method.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(method.clone())
    }

    /// Active methods, by name.
    pub async fn list_active(&self) -> DbResult<Vec<PaymentMethod>> {
        let methods = sqlx::query_as::<Sqlite, PaymentMethod>(
            "SELECT id, name, kind, is_active FROM payment_methods \
             WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(methods)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PaymentMethod>> {
        let method = sqlx::query_as::<Sqlite, PaymentMethod>(
            "SELECT id, name, kind, is_active FROM payment_methods WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(method)
    }

    /// Enables or disables a method.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE payment_methods SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PaymentMethod", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use duka_core::PaymentMethodKind;

    #[tokio::test]
    async fn test_insert_list_and_disable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.payment_methods();

        let mpesa = PaymentMethod {
            id: "mpesa".to_string(),
            name: "M-Pesa".to_string(),
            kind: PaymentMethodKind::Mpesa,
            is_active: true,
        };
        repo.insert(&mpesa).await.unwrap();

        assert_eq!(repo.get_by_id("mpesa").await.unwrap(), Some(mpesa.clone()));
        assert_eq!(repo.list_active().await.unwrap(), vec![mpesa]);

        repo.set_active("mpesa", false).await.unwrap();
        assert!(repo.list_active().await.unwrap().is_empty());
        assert!(matches!(
            repo.set_active("nope", false).await,
            Err(DbError::NotFound { .. })
        ));
    }
}

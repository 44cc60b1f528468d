//! # Suspended Sale Repository
//!
//! Durable parking of carts. The whole cart is stored as one JSON snapshot;
//! resume reads and deletes it in the same transaction so a parked sale can
//! be resumed at most once.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use duka_core::{Cart, CoreError, SuspendedSale};

/// Row shape of `suspended_sales`.
#[derive(Debug, FromRow)]
struct SuspendedRow {
    id: String,
    snapshot: String,
    receipt_date: DateTime<Utc>,
    price_list: Option<String>,
    remarks: Option<String>,
}

impl SuspendedRow {
    fn into_sale(self) -> DbResult<SuspendedSale> {
        let cart: Cart = serde_json::from_str(&self.snapshot).map_err(|e| DbError::Corrupt {
            entity: "suspended sale".to_string(),
            reason: e.to_string(),
        })?;

        Ok(SuspendedSale {
            id: self.id,
            cart,
            receipt_date: self.receipt_date,
            price_list: self.price_list,
            remarks: self.remarks,
        })
    }
}

/// Repository for parked carts.
#[derive(Debug, Clone)]
pub struct SuspendedSaleRepository {
    pool: SqlitePool,
}

impl SuspendedSaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SuspendedSaleRepository { pool }
    }

    /// Parks a cart and returns the snapshot id.
    pub async fn suspend(
        &self,
        cart: &Cart,
        price_list: Option<&str>,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let sale = SuspendedSale::capture(cart, price_list, remarks, now)?;
        let snapshot = serde_json::to_string(&sale.cart).map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            "INSERT INTO suspended_sales (id, snapshot, receipt_date, price_list, remarks) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&sale.id)
        .bind(&snapshot)
        .bind(sale.receipt_date)
        .bind(&sale.price_list)
        .bind(&sale.remarks)
        .execute(&self.pool)
        .await?;

        info!(id = %sale.id, lines = cart.line_count(), "Sale suspended");
        Ok(sale.id)
    }

    /// Removes a parked sale and returns its cart.
    pub async fn resume(&self, id: &str) -> DbResult<Cart> {
        let mut tx = begin_write(&self.pool).await?;

        let row = sqlx::query_as::<_, SuspendedRow>(
            "SELECT id, snapshot, receipt_date, price_list, remarks \
             FROM suspended_sales WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::SuspendedSaleNotFound(id.to_string()))?;

        sqlx::query("DELETE FROM suspended_sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let sale = row.into_sale()?;
        tx.commit().await?;

        info!(id = %id, "Suspended sale resumed");
        Ok(sale.into_cart())
    }

    /// All parked sales in suspension order.
    pub async fn list(&self) -> DbResult<Vec<SuspendedSale>> {
        let rows = sqlx::query_as::<_, SuspendedRow>(
            "SELECT id, snapshot, receipt_date, price_list, remarks \
             FROM suspended_sales ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed suspended sales");
        rows.into_iter().map(SuspendedRow::into_sale).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use duka_core::{Customer, Discount, Money, Product};

    fn cart(remarks: &str) -> Cart {
        let product = Product {
            id: "milk".to_string(),
            name: "Milk 500ml".to_string(),
            selling_price_cents: 6_000,
            current_stock: Some(40),
            is_active: true,
        };
        let mut cart = Cart::new();
        cart.add_product(&product, 4).unwrap();
        cart.set_discount("milk", Discount::fixed(Money::from_cents(1_000))).unwrap();
        cart.attach_customer(Customer::new("Alice", None));
        cart.set_remarks(Some(remarks)).unwrap();
        cart
    }

    #[tokio::test]
    async fn test_suspend_resume_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.suspended_sales();
        let original = cart("collect at 5pm");

        let id = repo.suspend(&original, Some("retail"), None, Utc::now()).await.unwrap();
        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].price_list.as_deref(), Some("retail"));

        let resumed = repo.resume(&id).await.unwrap();
        assert_eq!(resumed, original);
        assert!(repo.list().await.unwrap().is_empty());

        let err = repo.resume(&id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::SuspendedSaleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_in_suspension_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.suspended_sales();

        let first = repo.suspend(&cart("one"), None, None, Utc::now()).await.unwrap();
        let second = repo.suspend(&cart("two"), None, None, Utc::now()).await.unwrap();

        let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, [first, second]);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .suspended_sales()
            .suspend(&Cart::new(), None, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
    }
}

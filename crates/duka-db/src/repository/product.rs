//! # Product Repository
//!
//! Database operations for the products the checkout sells.
//!
//! ## Key Operations
//! - Lookup for adding to the cart
//! - Insert (seeding, back office import)
//! - Guarded stock decrement during finalize
//!
//! ## Stock Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                    │
//! │  SET current_stock = current_stock - :qty                           │
//! │  WHERE id = :id AND (current_stock IS NULL OR current_stock >= :qty)│
//! │                                                                     │
//! │  rows_affected = 1  → stock taken                                   │
//! │  rows_affected = 0  → another till sold it first: InsufficientStock │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use duka_core::{CoreError, Product};

const PRODUCT_COLUMNS: &str = "id, name, selling_price_cents, current_stock, is_active";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_id("uuid-here").await?;
/// let shelf = repo.list_active(50).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<Sqlite, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed active products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<Sqlite, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The inserted product
    /// * `Err(DbError::UniqueViolation)` - ID already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, selling_price_cents, current_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.selling_price_cents)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Takes `quantity` units out of stock inside the caller's transaction.
    ///
    /// Untracked products (`current_stock IS NULL`) always succeed.
    pub(crate) async fn decrement_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        name: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET current_stock = current_stock - ?2,
                updated_at = ?3
            WHERE id = ?1
              AND (current_stock IS NULL OR current_stock >= ?2)
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let available: Option<Option<i64>> =
            sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;

        match available {
            None => Err(DbError::not_found("Product", product_id)),
            Some(available) => Err(CoreError::InsufficientStock {
                product: name.to_string(),
                available: available.unwrap_or(0),
                requested: quantity,
            }
            .into()),
        }
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(name: &str, stock: Option<i64>) -> Product {
        Product {
            id: generate_product_id(),
            name: name.to_string(),
            selling_price_cents: 10_000,
            current_stock: stock,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let rice = repo.insert(&product("Rice 2kg", Some(10))).await.unwrap();
        let loaded = repo.get_by_id(&rice.id).await.unwrap().unwrap();

        assert_eq!(loaded, rice);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_active_sorted_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("Sugar 1kg", None)).await.unwrap();
        repo.insert(&product("Bread", None)).await.unwrap();
        let mut retired = product("Old Soap", None);
        retired.is_active = false;
        repo.insert(&retired).await.unwrap();

        let names: Vec<_> = repo
            .list_active(10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Bread", "Sugar 1kg"]);
    }

    #[tokio::test]
    async fn test_decrement_stock_is_guarded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let rice = repo.insert(&product("Rice 2kg", Some(3))).await.unwrap();
        let bread = repo.insert(&product("Bread", None)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        ProductRepository::decrement_stock(&mut conn, &rice.id, &rice.name, 2)
            .await
            .unwrap();
        let err = ProductRepository::decrement_stock(&mut conn, &rice.id, &rice.name, 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));
        ProductRepository::decrement_stock(&mut conn, &bread.id, &bread.name, 500)
            .await
            .unwrap();
        drop(conn);

        let rice = repo.get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(rice.current_stock, Some(1));
    }
}

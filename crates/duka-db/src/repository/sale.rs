//! # Sale Repository
//!
//! Database operations for finalized sales.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  record(FinalizedSale) - ONE transaction                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── INSERT sales                                                      │
//! │   ├── INSERT sale_lines        (one per cart line)                      │
//! │   ├── UPDATE products          (guarded stock decrement per line)       │
//! │   ├── INSERT sale_payments     (one per accepted tender)                │
//! │   └── INSERT debts             (only for an under-tendered credit sale) │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure → ROLLBACK, nothing is written                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::debt::DebtRepository;
use crate::repository::product::ProductRepository;
use duka_core::settlement::FinalizedSale;
use duka_core::{Sale, SaleLine, SalePayment};

const SALE_COLUMNS: &str = "id, receipt_number, customer_name, subtotal_cents, discount_cents, \
     net_cents, vat_cents, total_cents, tendered_cents, change_cents, notes, sale_date";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists everything a checkout produced, atomically.
    pub async fn record(&self, finalized: &FinalizedSale) -> DbResult<()> {
        let sale = &finalized.sale;
        debug!(
            id = %sale.id,
            receipt_number = %sale.receipt_number,
            lines = finalized.lines.len(),
            payments = finalized.payments.len(),
            "Recording sale"
        );

        let mut tx = begin_write(&self.pool).await?;

        insert_sale(&mut tx, sale).await?;
        for line in &finalized.lines {
            insert_line(&mut tx, line).await?;
            ProductRepository::decrement_stock(
                &mut tx,
                &line.product_id,
                &line.name_snapshot,
                line.quantity,
            )
            .await?;
        }
        for payment in &finalized.payments {
            insert_payment(&mut tx, payment).await?;
        }
        if let Some(debt) = &finalized.debt {
            DebtRepository::insert_with(&mut tx, debt).await?;
        }

        tx.commit().await?;

        info!(
            id = %sale.id,
            receipt_number = %sale.receipt_number,
            total_cents = sale.total_cents,
            on_credit = finalized.debt.is_some(),
            "Sale recorded"
        );
        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<Sqlite, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Sales made to a customer, newest first.
    pub async fn list_for_customer(&self, customer_name: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE customer_name = ?1 \
             ORDER BY sale_date DESC LIMIT ?2"
        );
        let sales = sqlx::query_as::<Sqlite, Sale>(&sql)
            .bind(customer_name)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Gets all lines for a sale, in cart order.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<Sqlite, SaleLine>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot, quantity,
                   unit_price_cents, discount_cents, line_total_cents
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets all payments for a sale.
    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<SalePayment>> {
        let payments = sqlx::query_as::<Sqlite, SalePayment>(
            r#"
            SELECT id, sale_id, payment_method_id, method_name, method_kind,
                   amount_cents, reference_number
            FROM sale_payments
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Gets total amount tendered for a sale.
    pub async fn get_total_paid(&self, sale_id: &str) -> DbResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount_cents) FROM sale_payments WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total.unwrap_or(0))
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, receipt_number, customer_name,
            subtotal_cents, discount_cents, net_cents, vat_cents, total_cents,
            tendered_cents, change_cents, notes, sale_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.receipt_number)
    .bind(&sale.customer_name)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.net_cents)
    .bind(sale.vat_cents)
    .bind(sale.total_cents)
    .bind(sale.tendered_cents)
    .bind(sale.change_cents)
    .bind(&sale.notes)
    .bind(sale.sale_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Product details are copied into the line so the receipt survives later
/// price or name changes.
async fn insert_line(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_lines (
            id, sale_id, product_id, name_snapshot, quantity,
            unit_price_cents, discount_cents, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(&line.product_id)
    .bind(&line.name_snapshot)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.discount_cents)
    .bind(line.line_total_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &SalePayment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_payments (
            id, sale_id, payment_method_id, method_name, method_kind,
            amount_cents, reference_number
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(&payment.payment_method_id)
    .bind(&payment.method_name)
    .bind(payment.method_kind)
    .bind(payment.amount_cents)
    .bind(&payment.reference_number)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

//! # Debt Repository
//!
//! Persistence for the customer debt ledger.
//!
//! ## Concurrent Payments
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier A                         Cashier B                            │
//! │  load debt (v3, balance 80.00)     load debt (v3, balance 80.00)        │
//! │  pay 80.00                         pay 50.00                            │
//! │     │                                 │                                 │
//! │     ▼                                 ▼                                 │
//! │  UPDATE debts ...                  UPDATE debts ...                     │
//! │  WHERE id = ? AND version = 3      WHERE id = ? AND version = 3         │
//! │    AND balance_cents >= 8000         AND balance_cents >= 5000          │
//! │     │                                 │                                 │
//! │  1 row → commit (v4, paid)         0 rows → BalanceChanged, retry       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The new amounts come from [`Debt::record_payment`]; this module only
//! decides whether they may be committed.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use duka_core::validation::validate_uuid;
use duka_core::{CoreError, Debt, DebtPayment, DebtStatus, Money};

const DEBT_COLUMNS: &str = "id, customer_name, customer_contact, sale_id, amount_cents, \
     amount_paid_cents, balance_cents, debt_date, due_date, status, notes, version, \
     created_at, updated_at";

/// Filters for [`DebtRepository::list`]. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct DebtFilter {
    /// Substring of the customer name; SQLite `LIKE` ignores ASCII case.
    pub customer_name: Option<String>,
    pub statuses: Vec<DebtStatus>,
    /// Inclusive lower bound on `debt_date`.
    pub debt_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `debt_date`.
    pub debt_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    /// Rows to skip, for paging.
    pub offset: Option<u32>,
}

impl DebtFilter {
    /// Open debts of customers whose name contains `customer_name`.
    pub fn open_for(customer_name: impl Into<String>) -> Self {
        DebtFilter {
            customer_name: Some(customer_name.into()),
            statuses: DebtStatus::ALL
                .into_iter()
                .filter(DebtStatus::is_open)
                .collect(),
            ..DebtFilter::default()
        }
    }
}

/// Escapes `LIKE` wildcards so user input matches literally.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Repository for debt ledger operations.
#[derive(Debug, Clone)]
pub struct DebtRepository {
    pool: SqlitePool,
}

impl DebtRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DebtRepository { pool }
    }

    /// Inserts a debt opened outside of a checkout (e.g. a migrated balance).
    pub async fn insert(&self, debt: &Debt) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_with(&mut conn, debt).await
    }

    /// Inserts a debt on an existing connection or transaction.
    pub(crate) async fn insert_with(conn: &mut SqliteConnection, debt: &Debt) -> DbResult<()> {
        debug!(
            id = %debt.id,
            customer = %debt.customer_name,
            amount_cents = debt.amount_cents,
            "Inserting debt"
        );

        sqlx::query(
            r#"
            INSERT INTO debts (
                id, customer_name, customer_contact, sale_id,
                amount_cents, amount_paid_cents, balance_cents,
                debt_date, due_date, status, notes, version,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&debt.id)
        .bind(&debt.customer_name)
        .bind(&debt.customer_contact)
        .bind(&debt.sale_id)
        .bind(debt.amount_cents)
        .bind(debt.amount_paid_cents)
        .bind(debt.balance_cents)
        .bind(debt.debt_date)
        .bind(debt.due_date)
        .bind(debt.status)
        .bind(&debt.notes)
        .bind(debt.version)
        .bind(debt.created_at)
        .bind(debt.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets a debt by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Debt>> {
        let sql = format!("SELECT {DEBT_COLUMNS} FROM debts WHERE id = ?1");
        let debt = sqlx::query_as::<Sqlite, Debt>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(debt)
    }

    /// The debt created by a sale, if it was sold on credit.
    pub async fn get_by_sale(&self, sale_id: &str) -> DbResult<Option<Debt>> {
        let sql = format!("SELECT {DEBT_COLUMNS} FROM debts WHERE sale_id = ?1");
        let debt = sqlx::query_as::<Sqlite, Debt>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(debt)
    }

    /// Lists debts, newest first.
    pub async fn list(&self, filter: &DebtFilter) -> DbResult<Vec<Debt>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {DEBT_COLUMNS} FROM debts WHERE 1 = 1"
        ));

        if let Some(name) = &filter.customer_name {
            query
                .push(" AND customer_name LIKE ")
                .push_bind(like_pattern(name.trim()))
                .push(" ESCAPE '\\'");
        }
        if !filter.statuses.is_empty() {
            query.push(" AND status IN (");
            let mut statuses = query.separated(", ");
            for status in &filter.statuses {
                statuses.push_bind(*status);
            }
            statuses.push_unseparated(")");
        }
        if let Some(from) = filter.debt_from {
            query.push(" AND debt_date >= ").push_bind(from);
        }
        if let Some(to) = filter.debt_to {
            query.push(" AND debt_date < ").push_bind(to);
        }
        query.push(" ORDER BY debt_date DESC, rowid DESC");
        match (filter.limit, filter.offset) {
            (Some(limit), offset) => {
                query.push(" LIMIT ").push_bind(limit);
                query.push(" OFFSET ").push_bind(offset.unwrap_or(0));
            }
            // SQLite only accepts OFFSET after a LIMIT; -1 means no limit
            (None, Some(offset)) => {
                query.push(" LIMIT -1 OFFSET ").push_bind(offset);
            }
            (None, None) => {}
        }

        let debts = query.build_query_as::<Debt>().fetch_all(&self.pool).await?;
        debug!(count = debts.len(), "Listed debts");
        Ok(debts)
    }

    /// Payment history of a debt, oldest first.
    pub async fn payments(&self, debt_id: &str) -> DbResult<Vec<DebtPayment>> {
        let payments = sqlx::query_as::<Sqlite, DebtPayment>(
            r#"
            SELECT id, debt_id, amount_cents, payment_method_id, notes, created_at
            FROM debt_payments
            WHERE debt_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(debt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Sum of a customer's outstanding balances.
    ///
    /// Counts every row still holding money, including a residual cent on a
    /// debt already marked paid.
    pub async fn customer_balance(&self, customer_name: &str) -> DbResult<Money> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(balance_cents) FROM debts WHERE customer_name = ?1 AND balance_cents > 0",
        )
        .bind(customer_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(total.unwrap_or(0)))
    }

    /// Loads a debt and applies a payment to it.
    ///
    /// ## Returns
    /// * `Ok((Debt, DebtPayment))` - the committed state and the payment row
    /// * `Err(Domain(PaymentExceedsBalance))` - amount larger than the balance
    /// * `Err(Domain(BalanceChanged))` - another payment committed first
    pub async fn record_payment(
        &self,
        debt_id: &str,
        amount: Money,
        payment_method_id: Option<String>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<(Debt, DebtPayment)> {
        validate_uuid(debt_id)?;
        let current = self
            .get(debt_id)
            .await?
            .ok_or_else(|| DbError::not_found("Debt", debt_id))?;

        self.apply_payment(&current, amount, payment_method_id, notes, now)
            .await
    }

    /// Commits a payment computed against `expected`.
    ///
    /// The write only lands if the stored row still has `expected.version`
    /// and enough balance.
    pub async fn apply_payment(
        &self,
        expected: &Debt,
        amount: Money,
        payment_method_id: Option<String>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<(Debt, DebtPayment)> {
        let mut updated = expected.clone();
        let payment = updated.record_payment(amount, payment_method_id, notes, now)?;

        let mut tx = begin_write(&self.pool).await?;

        let result = sqlx::query(
            r#"
            UPDATE debts
            SET amount_paid_cents = amount_paid_cents + ?2,
                balance_cents = balance_cents - ?2,
                status = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1
              AND version = ?5
              AND balance_cents >= ?2
            "#,
        )
        .bind(&expected.id)
        .bind(amount.cents())
        .bind(updated.status)
        .bind(now)
        .bind(expected.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(
                debt_id = %expected.id,
                version = expected.version,
                "Debt payment lost a concurrent update"
            );
            return Err(CoreError::BalanceChanged {
                debt_id: expected.id.clone(),
            }
            .into());
        }

        sqlx::query(
            r#"
            INSERT INTO debt_payments (id, debt_id, amount_cents, payment_method_id, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.debt_id)
        .bind(payment.amount_cents)
        .bind(&payment.payment_method_id)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            debt_id = %updated.id,
            amount_cents = amount.cents(),
            balance_cents = updated.balance_cents,
            status = updated.status.as_str(),
            "Debt payment recorded"
        );
        Ok((updated, payment))
    }

    /// Flags open debts whose due date has passed. Returns how many changed.
    pub async fn mark_overdue(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let sql = format!(
            "SELECT {DEBT_COLUMNS} FROM debts \
             WHERE status IN ('pending', 'partial') AND due_date IS NOT NULL"
        );
        let candidates = sqlx::query_as::<Sqlite, Debt>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let mut marked = 0;
        for debt in candidates {
            if debt.effective_status(now) != DebtStatus::Overdue {
                continue;
            }
            let result = sqlx::query(
                "UPDATE debts SET status = 'overdue', updated_at = ?2 \
                 WHERE id = ?1 AND status = ?3",
            )
            .bind(&debt.id)
            .bind(now)
            .bind(debt.status)
            .execute(&self.pool)
            .await?;
            marked += result.rows_affected();
        }

        if marked > 0 {
            info!(count = marked, "Debts marked overdue");
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    fn debt(customer: &str, amount_cents: i64, now: DateTime<Utc>) -> Debt {
        Debt::new(customer, None, None, Money::from_cents(amount_cents), None, None, now).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.debts();
        let d = debt("Alice", 18_000, Utc::now());

        repo.insert(&d).await.unwrap();
        let loaded = repo.get(&d.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, d.id);
        assert_eq!(loaded.balance_cents, 18_000);
        assert_eq!(loaded.status, DebtStatus::Pending);
        assert_eq!(loaded.version, 0);
    }

    #[tokio::test]
    async fn test_payments_walk_the_state_machine() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.debts();
        let d = debt("Alice", 18_000, Utc::now());
        repo.insert(&d).await.unwrap();

        let (after, _) = repo
            .record_payment(&d.id, Money::from_cents(10_000), None, Some("cash"), Utc::now())
            .await
            .unwrap();
        assert_eq!(after.balance_cents, 8_000);
        assert_eq!(after.status, DebtStatus::Partial);

        let err = repo
            .record_payment(&d.id, Money::from_cents(10_000), None, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::PaymentExceedsBalance { .. })
        ));

        let (after, _) = repo
            .record_payment(&d.id, Money::from_cents(8_000), None, None, Utc::now())
            .await
            .unwrap();
        assert_eq!(after.status, DebtStatus::Paid);

        let stored = repo.get(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.balance_cents, 0);
        assert_eq!(stored.amount_paid_cents, 18_000);
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, DebtStatus::Paid);

        let history = repo.payments(&d.id).await.unwrap();
        let amounts: Vec<_> = history.iter().map(|p| p.amount_cents).collect();
        assert_eq!(amounts, [10_000, 8_000]);
    }

    #[tokio::test]
    async fn test_stale_payment_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.debts();
        let d = debt("Alice", 8_000, Utc::now());
        repo.insert(&d).await.unwrap();

        // Both cashiers loaded the same version
        let snapshot = repo.get(&d.id).await.unwrap().unwrap();

        repo.apply_payment(&snapshot, Money::from_cents(8_000), None, None, Utc::now())
            .await
            .unwrap();
        let err = repo
            .apply_payment(&snapshot, Money::from_cents(5_000), None, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::BalanceChanged { .. })
        ));

        let stored = repo.get(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.balance_cents, 0);
        assert_eq!(repo.payments(&d.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_payments_never_overdraw() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.debts();
        let d = debt("Alice", 8_000, Utc::now());
        repo.insert(&d).await.unwrap();

        let (a, b) = tokio::join!(
            repo.record_payment(&d.id, Money::from_cents(8_000), None, None, Utc::now()),
            repo.record_payment(&d.id, Money::from_cents(5_000), None, None, Utc::now()),
        );

        let stored = repo.get(&d.id).await.unwrap().unwrap();
        let committed: i64 = repo
            .payments(&d.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.amount_cents)
            .sum();
        assert!(stored.balance_cents >= 0);
        assert_eq!(stored.amount_paid_cents, committed);
        assert!(a.is_ok() || b.is_ok());
        assert!(a.is_err() || b.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_tills_commit_one_payment() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("till.db")).max_connections(5))
            .await
            .unwrap();
        let d = debt("Alice", 8_000, Utc::now());
        db.debts().insert(&d).await.unwrap();

        let mut tills = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let id = d.id.clone();
            tills.push(tokio::spawn(async move {
                db.debts()
                    .record_payment(&id, Money::from_cents(5_000), None, None, Utc::now())
                    .await
            }));
        }

        let mut committed = 0;
        for till in tills {
            match till.await.unwrap() {
                Ok(_) => committed += 1,
                Err(DbError::Domain(
                    CoreError::BalanceChanged { .. } | CoreError::PaymentExceedsBalance { .. },
                )) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(committed, 1);

        let stored = db.debts().get(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.balance_cents, 3_000);
        assert_eq!(stored.amount_paid_cents, 5_000);
        assert_eq!(stored.version, 1);
        assert_eq!(db.debts().payments(&d.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.debts();
        let start = Utc::now() - Duration::hours(3);

        let older = debt("Alice", 5_000, start);
        let newer = debt("Alice", 3_000, start + Duration::hours(1));
        let other = debt("Bob", 9_900, start + Duration::hours(2));
        for d in [&older, &newer, &other] {
            repo.insert(d).await.unwrap();
        }
        repo.record_payment(&older.id, Money::from_cents(5_000), None, None, Utc::now())
            .await
            .unwrap();

        let alice = repo
            .list(&DebtFilter {
                customer_name: Some("Alice".to_string()),
                ..DebtFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = alice.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, [newer.id.as_str(), older.id.as_str()]);

        let open = repo.list(&DebtFilter::open_for("Alice")).await.unwrap();
        assert_eq!(open.len(), 1);

        // Substring match ignores case
        let fragment = repo
            .list(&DebtFilter {
                customer_name: Some(" ali ".to_string()),
                ..DebtFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(fragment.len(), 2);
        let open = repo.list(&DebtFilter::open_for("alice")).await.unwrap();
        assert_eq!(open[0].id, newer.id);

        // Wildcards in the name are literal
        let wildcard = repo
            .list(&DebtFilter {
                customer_name: Some("%".to_string()),
                ..DebtFilter::default()
            })
            .await
            .unwrap();
        assert!(wildcard.is_empty());

        let window = repo
            .list(&DebtFilter {
                debt_from: Some(start + Duration::minutes(30)),
                debt_to: Some(start + Duration::hours(2)),
                ..DebtFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = window.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, [newer.id.as_str()]);

        let limited = repo
            .list(&DebtFilter {
                limit: Some(1),
                ..DebtFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(limited[0].id, other.id);

        let second_page = repo
            .list(&DebtFilter {
                limit: Some(1),
                offset: Some(1),
                ..DebtFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = second_page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, [newer.id.as_str()]);

        let skipped = repo
            .list(&DebtFilter {
                offset: Some(2),
                ..DebtFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = skipped.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, [older.id.as_str()]);

        assert_eq!(repo.customer_balance("Alice").await.unwrap().cents(), 3_000);
        assert!(repo.customer_balance("Nobody").await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_mark_overdue() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.debts();
        let opened = Utc::now() - Duration::days(45);

        let late = Debt::new(
            "Alice",
            None,
            None,
            Money::from_cents(4_000),
            Some(opened + Duration::days(30)),
            None,
            opened,
        )
        .unwrap();
        let current = Debt::new(
            "Bob",
            None,
            None,
            Money::from_cents(4_000),
            Some(Utc::now() + Duration::days(10)),
            None,
            opened,
        )
        .unwrap();
        repo.insert(&late).await.unwrap();
        repo.insert(&current).await.unwrap();

        assert_eq!(repo.mark_overdue(Utc::now()).await.unwrap(), 1);
        assert_eq!(repo.mark_overdue(Utc::now()).await.unwrap(), 0);
        assert_eq!(
            repo.get(&late.id).await.unwrap().unwrap().status,
            DebtStatus::Overdue
        );
        assert_eq!(
            repo.get(&current.id).await.unwrap().unwrap().status,
            DebtStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_unknown_debt() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let missing = uuid::Uuid::new_v4().to_string();

        let err = db
            .debts()
            .record_payment(&missing, Money::from_cents(100), None, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = db
            .debts()
            .record_payment("not-an-id", Money::from_cents(100), None, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}

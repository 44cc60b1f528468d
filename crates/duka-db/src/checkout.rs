//! # Checkout Orchestration
//!
//! Glue between the pure settlement rules and the repositories.
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Cart ──► settlement::finalize() ──► FinalizedSale                      │
//! │  (pure: validation, sufficiency, debt amount)      │                    │
//! │                                                    ▼                    │
//! │                               SaleRepository::record() (1 transaction)  │
//! │                                                    │                    │
//! │                       ┌────────── Ok ──────────────┴──── Err ───────┐   │
//! │                       ▼                                             ▼   │
//! │                 cart.clear()                            cart untouched  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! The till's cart lives in [`CartState`], an `Arc<Mutex<Cart>>`. The async
//! mutex is held across the database write so no line can be added between
//! pricing and clearing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::pool::Database;
use duka_core::settlement::{self, CheckoutPolicy, FinalizedSale};
use duka_core::{Cart, TenderSet};

/// Finalizes a cart and records the sale.
///
/// The cart is cleared only after the transaction commits.
pub async fn finalize_cart(
    db: &Database,
    cart: &mut Cart,
    tenders: &TenderSet,
    policy: &CheckoutPolicy,
    now: DateTime<Utc>,
) -> DbResult<FinalizedSale> {
    debug!(
        lines = cart.line_count(),
        tenders = tenders.entries().len(),
        "Finalizing cart"
    );

    let finalized = settlement::finalize(cart, tenders, policy, now)?;
    db.sales().record(&finalized).await?;
    cart.clear();

    info!(
        receipt_number = %finalized.sale.receipt_number,
        change_cents = finalized.change_due().cents(),
        "Checkout complete"
    );
    Ok(finalized)
}

// =============================================================================
// Cart State
// =============================================================================

/// The till's current cart, shareable across tasks.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        CartState::default()
    }

    /// Locks the cart for editing.
    pub async fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().await
    }

    /// A copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    /// Finalizes the current cart.
    pub async fn finalize(
        &self,
        db: &Database,
        tenders: &TenderSet,
        policy: &CheckoutPolicy,
        now: DateTime<Utc>,
    ) -> DbResult<FinalizedSale> {
        let mut cart = self.cart.lock().await;
        finalize_cart(db, &mut cart, tenders, policy, now).await
    }

    /// Parks the current cart and starts a fresh one.
    pub async fn suspend(
        &self,
        db: &Database,
        policy: &CheckoutPolicy,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let mut cart = self.cart.lock().await;
        let id = db
            .suspended_sales()
            .suspend(&cart, policy.price_list.as_deref(), remarks, now)
            .await?;
        cart.clear();
        Ok(id)
    }

    /// Replaces the current cart with a parked one.
    pub async fn resume(&self, db: &Database, id: &str) -> DbResult<()> {
        let mut cart = self.cart.lock().await;
        *cart = db.suspended_sales().resume(id).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::DbConfig;
    use duka_core::{
        CoreError, Customer, DebtStatus, Discount, Money, PaymentMethod, PaymentMethodKind,
        Product, TenderEntry,
    };

    struct Till {
        db: Database,
        rice: Product,
        cash: PaymentMethod,
        mpesa: PaymentMethod,
    }

    async fn till() -> Till {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rice = db
            .products()
            .insert(&Product {
                id: uuid::Uuid::new_v4().to_string(),
                name: "Rice 2kg".to_string(),
                selling_price_cents: 10_000,
                current_stock: Some(10),
                is_active: true,
            })
            .await
            .unwrap();
        let cash = db
            .payment_methods()
            .insert(&PaymentMethod {
                id: "cash".to_string(),
                name: "Cash".to_string(),
                kind: PaymentMethodKind::Cash,
                is_active: true,
            })
            .await
            .unwrap();
        let mpesa = db
            .payment_methods()
            .insert(&PaymentMethod {
                id: "mpesa".to_string(),
                name: "M-Pesa".to_string(),
                kind: PaymentMethodKind::Mpesa,
                is_active: true,
            })
            .await
            .unwrap();
        Till {
            db,
            rice,
            cash,
            mpesa,
        }
    }

    /// 2 × 100.00 at 10% off = 180.00
    fn cart_for(till: &Till) -> Cart {
        let mut cart = Cart::new();
        cart.add_product(&till.rice, 2).unwrap();
        cart.set_discount(&till.rice.id, Discount::percent(10)).unwrap();
        cart
    }

    fn tender(method: &PaymentMethod, cents: i64) -> TenderSet {
        [TenderEntry::for_method(method, Money::from_cents(cents))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_cash_sale_is_recorded() {
        let till = till().await;
        let mut cart = cart_for(&till);
        let policy = CheckoutPolicy::default();

        let done = finalize_cart(&till.db, &mut cart, &tender(&till.cash, 20_000), &policy, Utc::now())
            .await
            .unwrap();

        assert!(cart.is_empty());
        assert_eq!(done.change_due().cents(), 2_000);

        let sales = till.db.sales();
        let sale = sales.get_by_id(&done.sale.id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 18_000);
        assert_eq!(sale.change_cents, 2_000);
        assert_eq!(sales.get_lines(&sale.id).await.unwrap().len(), 1);
        assert_eq!(sales.get_total_paid(&sale.id).await.unwrap(), 20_000);

        let rice = till.db.products().get_by_id(&till.rice.id).await.unwrap().unwrap();
        assert_eq!(rice.current_stock, Some(8));
        assert!(till.db.debts().get_by_sale(&sale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credit_sale_opens_debt() {
        let till = till().await;
        let mut cart = cart_for(&till);
        cart.attach_customer(Customer::new("Alice", None));

        let done = finalize_cart(
            &till.db,
            &mut cart,
            &tender(&till.cash, 0),
            &CheckoutPolicy::default(),
            Utc::now(),
        )
        .await
        .unwrap();

        let debt = till.db.debts().get_by_sale(&done.sale.id).await.unwrap().unwrap();
        assert_eq!(debt.amount_cents, 18_000);
        assert_eq!(debt.balance_cents, 18_000);
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(
            till.db.debts().customer_balance("Alice").await.unwrap().cents(),
            18_000
        );
        assert!(till.db.sales().get_payments(&done.sale.id).await.unwrap().is_empty());

        let sales = till.db.sales().list_for_customer("Alice", 10).await.unwrap();
        assert_eq!(sales.len(), 1);
    }

    #[tokio::test]
    async fn test_cent_short_sale_is_owed() {
        let till = till().await;
        let mut cart = cart_for(&till);
        cart.attach_customer(Customer::new("Alice", None));

        let done = finalize_cart(
            &till.db,
            &mut cart,
            &tender(&till.cash, 17_999),
            &CheckoutPolicy::default(),
            Utc::now(),
        )
        .await
        .unwrap();

        let debt = till.db.debts().get_by_sale(&done.sale.id).await.unwrap().unwrap();
        assert_eq!(debt.balance_cents, 1);
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(
            till.db.debts().customer_balance("Alice").await.unwrap().cents(),
            1
        );
    }

    #[tokio::test]
    async fn test_rejected_finalize_keeps_cart() {
        let till = till().await;
        let mut cart = cart_for(&till);
        let before = cart.clone();

        let err = finalize_cart(
            &till.db,
            &mut cart,
            &tender(&till.cash, 10_000),
            &CheckoutPolicy::default(),
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientTender { shortfall }) if shortfall.cents() == 8_000
        ));
        assert_eq!(cart, before);
    }

    #[tokio::test]
    async fn test_stock_race_rolls_back() {
        let till = till().await;
        let mut cart = cart_for(&till);

        // Another till sells 9 of the 10 bags after our cart was built
        let mut other = Cart::new();
        other.add_product(&till.rice, 9).unwrap();
        finalize_cart(
            &till.db,
            &mut other,
            &tender(&till.cash, 90_000),
            &CheckoutPolicy::default(),
            Utc::now(),
        )
        .await
        .unwrap();

        let before = cart.clone();
        let err = finalize_cart(
            &till.db,
            &mut cart,
            &tender(&till.cash, 18_000),
            &CheckoutPolicy::default(),
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 1, .. })
        ));
        assert_eq!(cart, before);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(till.db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_mpesa_reference_required() {
        let till = till().await;
        let mut cart = cart_for(&till);

        let mut tenders = tender(&till.mpesa, 18_000);
        let err = finalize_cart(&till.db, &mut cart, &tenders, &CheckoutPolicy::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("M-Pesa reference number is required"));
        assert!(!cart.is_empty());

        tenders.set(TenderEntry::for_method(&till.mpesa, Money::from_cents(18_000)).with_reference("QJK12AB"));
        let done = finalize_cart(&till.db, &mut cart, &tenders, &CheckoutPolicy::default(), Utc::now())
            .await
            .unwrap();
        let payments = till.db.sales().get_payments(&done.sale.id).await.unwrap();
        assert_eq!(payments[0].reference_number.as_deref(), Some("QJK12AB"));
        assert_eq!(payments[0].method_kind, PaymentMethodKind::Mpesa);
    }

    #[tokio::test]
    async fn test_cart_state_suspend_and_resume() {
        let till = till().await;
        let state = CartState::new();
        *state.lock().await = cart_for(&till);
        let parked = state.snapshot().await;

        let id = state
            .suspend(&till.db, &CheckoutPolicy::default(), Some("customer fetching wallet"), Utc::now())
            .await
            .unwrap();
        assert!(state.snapshot().await.is_empty());

        state.resume(&till.db, &id).await.unwrap();
        assert_eq!(state.snapshot().await, parked);

        state
            .finalize(&till.db, &tender(&till.cash, 18_000), &CheckoutPolicy::default(), Utc::now())
            .await
            .unwrap();
        assert!(state.snapshot().await.is_empty());
    }
}

//! # Suspended Sales
//!
//! Parking a cart so the till can serve the next customer.
//!
//! ```text
//! Cart ──suspend()──► SuspendedSale (deep snapshot) ──resume()──► Cart
//!                            │
//!                            └── removed from the store on resume
//! ```
//!
//! A snapshot is never edited in place: resume hands back an owned cart and
//! the cashier suspends again if needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::validation::normalize_note;

/// A parked cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SuspendedSale {
    pub id: String,
    pub cart: Cart,
    #[ts(as = "String")]
    pub receipt_date: DateTime<Utc>,
    pub price_list: Option<String>,
    pub remarks: Option<String>,
}

impl SuspendedSale {
    /// Takes a snapshot of a non-empty cart.
    pub fn capture(
        cart: &Cart,
        price_list: Option<&str>,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        Ok(SuspendedSale {
            id: Uuid::new_v4().to_string(),
            cart: cart.clone(),
            receipt_date: now,
            price_list: normalize_note("price list", price_list)?,
            remarks: normalize_note("remarks", remarks)?,
        })
    }

    pub fn into_cart(self) -> Cart {
        self.cart
    }
}

/// In-memory suspended sale store, in suspension order.
#[derive(Debug, Default)]
pub struct SuspendedSaleStore {
    pending: Vec<SuspendedSale>,
}

impl SuspendedSaleStore {
    pub fn new() -> Self {
        SuspendedSaleStore::default()
    }

    /// Parks a cart and returns the snapshot id.
    pub fn suspend(
        &mut self,
        cart: &Cart,
        price_list: Option<&str>,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        let sale = SuspendedSale::capture(cart, price_list, remarks, now)?;
        let id = sale.id.clone();
        self.pending.push(sale);
        Ok(id)
    }

    /// Removes a parked sale and returns its cart.
    pub fn resume(&mut self, id: &str) -> CoreResult<Cart> {
        let index = self
            .pending
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| CoreError::SuspendedSaleNotFound(id.to_string()))?;
        Ok(self.pending.remove(index).into_cart())
    }

    pub fn list(&self) -> &[SuspendedSale] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

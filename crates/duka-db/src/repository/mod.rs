//! # Repository Module
//!
//! Database repository implementations for the Duka POS checkout.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Checkout / back office                                                │
//! │       │                                                                 │
//! │       │  db.debts().record_payment(id, amount, ...)                    │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  DebtRepository                                                        │
//! │  ├── get(&self, id)                                                    │
//! │  ├── list(&self, filter)                                               │
//! │  ├── record_payment(&self, id, amount, ...)                            │
//! │  └── mark_overdue(&self, now)                                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (mock the repository)                                  │
//! │  • SQL is isolated in one place                                        │
//! │  • Can swap database implementations                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product lookup and guarded stock
//! - [`payment_method::PaymentMethodRepository`] - Configured tender types
//! - [`sale::SaleRepository`] - Atomic recording of finalized sales
//! - [`debt::DebtRepository`] - Debt ledger with conditional payments
//! - [`suspended::SuspendedSaleRepository`] - Parked carts

pub mod debt;
pub mod payment_method;
pub mod product;
pub mod sale;
pub mod suspended;

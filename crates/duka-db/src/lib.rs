//! # duka-db: Database Layer for Duka POS
//!
//! This crate persists what the checkout core decides. It uses SQLite for
//! local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Duka POS Data Flow                               │
//! │                                                                         │
//! │  Till (cart edits, tenders, "Complete sale")                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  duka-core: pricing → settlement::finalize() → FinalizedSale           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     duka-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_checkout │  │   │
//! │  │   │ WAL, FK on    │    │ DebtRepo      │    │ 002_debts    │  │   │
//! │  │   │               │    │ SuspendedRepo │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   checkout.rs: finalize_cart (record, then clear the cart)     │   │
//! │  │   config.rs:   DUKA_* environment → DbConfig + CheckoutPolicy  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (duka.db)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`checkout`] - Finalize orchestration and the shared cart
//! - [`config`] - Environment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use duka_db::{checkout::finalize_cart, AppConfig, Database};
//!
//! let config = AppConfig::from_env()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sale = finalize_cart(&db, &mut cart, &tenders, &config.policy, Utc::now()).await?;
//! println!("Change: {}", sale.change_due());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{finalize_cart, CartState};
pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::debt::{DebtFilter, DebtRepository};
pub use repository::payment_method::PaymentMethodRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::suspended::SuspendedSaleRepository;

//! # Seed Data Generator
//!
//! Populates a till database with payment methods and shelf stock for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by DUKA_DB_PATH (default ./duka.db)
//! cargo run -p duka-db --bin seed
//!
//! # Limit the number of products
//! cargo run -p duka-db --bin seed -- --count 20
//!
//! # Specify database path
//! cargo run -p duka-db --bin seed -- --db ./data/till.db
//! ```
//!
//! Each product has a fixed shelf price in KES cents and a stock level
//! between 5 and 120. Seeding is skipped when products already exist.

use std::env;

use duka_core::{PaymentMethod, PaymentMethodKind, Product};
use duka_db::repository::product::generate_product_id;
use duka_db::{AppConfig, Database};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Tenders every till starts with.
const PAYMENT_METHODS: &[(&str, &str, PaymentMethodKind)] = &[
    ("cash", "Cash", PaymentMethodKind::Cash),
    ("mpesa", "M-Pesa", PaymentMethodKind::Mpesa),
    ("credit-note", "Credit Note", PaymentMethodKind::CreditNote),
    ("cheque", "Cheque", PaymentMethodKind::Other),
];

/// (name, price in cents)
const PRODUCTS: &[(&str, i64)] = &[
    ("Unga Pembe 2kg", 17_500),
    ("Jogoo Maize Meal 2kg", 16_800),
    ("Pishori Rice 1kg", 22_000),
    ("Sugar 1kg", 15_500),
    ("Brookside Milk 500ml", 6_000),
    ("Fresha Yoghurt 250ml", 7_500),
    ("Kimbo 1kg", 39_000),
    ("Elianto Oil 1L", 42_500),
    ("Royco Mchuzi Mix 200g", 11_000),
    ("Ketepa Tea 100g", 9_000),
    ("Blue Band 500g", 25_000),
    ("Supa Loaf 400g", 6_500),
    ("Kabras Sugar 2kg", 30_000),
    ("Menengai Bar Soap 1kg", 21_000),
    ("Omo 1kg", 33_000),
    ("Colgate 140g", 18_500),
    ("Dasani Water 1L", 8_000),
    ("Coca-Cola 500ml", 7_000),
    ("Eggs Tray (30)", 48_000),
    ("Sukuma Wiki Bunch", 3_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = AppConfig::from_env()?;
    let args: Vec<String> = env::args().collect();
    let mut count: usize = PRODUCTS.len();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(PRODUCTS.len());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Duka POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to insert (default: all)");
                println!("  -d, --db <PATH>    Database file path (default: $DUKA_DB_PATH or ./duka.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %config.database_path.display(), "Opening database");
    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    for (id, name, kind) in PAYMENT_METHODS {
        db.payment_methods()
            .insert(&PaymentMethod {
                id: id.to_string(),
                name: name.to_string(),
                kind: *kind,
                is_active: true,
            })
            .await?;
    }
    info!(count = PAYMENT_METHODS.len(), "Payment methods seeded");

    let mut generated = 0;
    for (idx, (name, price_cents)) in PRODUCTS.iter().take(count).enumerate() {
        let product = Product {
            id: generate_product_id(),
            name: name.to_string(),
            selling_price_cents: *price_cents,
            current_stock: Some(5 + ((idx * 37) % 116) as i64),
            is_active: true,
        };

        if let Err(e) = db.products().insert(&product).await {
            warn!(name = %product.name, error = %e, "Failed to insert product");
            continue;
        }
        generated += 1;
    }

    info!(generated, "Seed complete");
    Ok(())
}

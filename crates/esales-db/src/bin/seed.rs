//! # Seed Data Generator
//!
//! Populates the database with the storefront's catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p esales-db --bin seed
//!
//! # Specify database path
//! cargo run -p esales-db --bin seed -- --db ./data/esales.db
//!
//! # Override stock of every variant
//! cargo run -p esales-db --bin seed -- --stock 3
//! ```
//!
//! ## Generated Catalog
//! One product with one variant per color. Each variant has its own price
//! adjustment and stock level.

use esales_core::Money;
use esales_db::{Database, DbConfig, NewProduct, NewVariant};
use std::env;

/// (color, price adjustment in cents, stock)
const VARIANTS: &[(&str, i64, i64)] = &[
    ("Black", 0, 25),
    ("White", 0, 20),
    ("Red", 500, 10),
    ("Navy", 500, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./data/esales.db");
    let mut stock_override: Option<i64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock_override = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("eSalesOne Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./data/esales.db)");
                println!("  -s, --stock <N>     Stock for every variant (default: per color)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 eSalesOne Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().list_products().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let product_id = db
        .catalog()
        .insert_product(&NewProduct {
            name: "Classic Sneaker".to_string(),
            description: Some(
                "Lightweight canvas sneaker with a cushioned sole, built for all-day wear."
                    .to_string(),
            ),
            price: Money::from_cents(2999),
            image_url: Some(
                "https://images.unsplash.com/photo-1542291026-7eec264c27ff?w=800".to_string(),
            ),
        })
        .await?;

    println!("✓ Created product #{}", product_id);

    for (color, adjustment, stock) in VARIANTS {
        let stock = stock_override.unwrap_or(*stock);
        let variant_id = db
            .catalog()
            .insert_variant(&NewVariant {
                product_id,
                name: "Color".to_string(),
                value: color.to_string(),
                price_adjustment: Money::from_cents(*adjustment),
                stock,
            })
            .await?;

        println!(
            "  Variant #{}: {} ({}, stock {})",
            variant_id,
            color,
            Money::from_cents(*adjustment),
            stock
        );
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

//! # Seed Data Generator
//!
//! Populates the database with a demo plywood brand so the pricing screens
//! have something to show during development.
//!
//! ## Usage
//! ```bash
//! cargo run -p timber-db --bin seed
//!
//! # Specify database path
//! cargo run -p timber-db --bin seed -- --db ./data/timber.db
//! ```
//!
//! ## Generated Data
//! One plywood scope (company / category / brand) with:
//! - A markup rule (bill 50%, skim 10%, commission 5%, discount 5%,
//!   showroom profit 20-40%)
//! - One item per sheet size x thickness, price factor = sheet area in sqft
//! - A Trigger A cascade at a reference price of 45.0 per sqft, so every
//!   item ends up with a stored MRP band and ladder

use std::env;

use timber_core::{MarkupParameters, Material, ProfitRange, ScopeKey};
use timber_db::{Database, DbConfig, NewCatalogItem};
use uuid::Uuid;

/// Sheet sizes with their area in square feet.
const SHEET_SIZES: &[(&str, f64)] = &[("8x4", 32.0), ("7x4", 28.0), ("6x4", 24.0), ("6x3", 18.0)];

const THICKNESSES: &[&str] = &["6mm", "9mm", "12mm", "18mm"];

/// Reference purchase price per square foot used for the initial cascade.
const REFERENCE_PRICE: f64 = 45.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./timber_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("TimberBooks Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./timber_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 TimberBooks Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog_items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // One demo scope: a plywood brand under a company's plywood category.
    let scope = ScopeKey::new(
        Uuid::new_v4().to_string(),
        Uuid::new_v4().to_string(),
        Material::Plywood,
        Uuid::new_v4().to_string(),
    );

    println!();
    println!("Generating items for scope {}...", scope);

    let mut generated = 0;
    for (size_label, area_sqft) in SHEET_SIZES {
        for thickness in THICKNESSES {
            let item = NewCatalogItem {
                scope: scope.clone(),
                name: format!("Marine Ply {} {}", size_label, thickness),
                size_label: Some(size_label.to_string()),
                thickness_label: Some(thickness.to_string()),
                price_factor: *area_sqft,
                purchase_price: 0.0,
            };

            if let Err(e) = db.catalog_items().insert(item).await {
                eprintln!("Failed to insert {} {}: {}", size_label, thickness, e);
                continue;
            }
            generated += 1;
        }
    }

    println!("✓ Generated {} items", generated);

    // Configure the scope's markup rule, then price everything via the
    // reference-price cascade.
    let params = MarkupParameters::new(50.0, 10.0, 5.0, 5.0, ProfitRange::new(20.0, 40.0));
    db.markup_rules().upsert(&scope, &params).await?;
    println!("✓ Markup rule configured");

    let report = db
        .cascade()
        .on_reference_price_change(&scope, REFERENCE_PRICE)
        .await?;

    println!();
    println!("Cascade at reference price {}: {}", REFERENCE_PRICE, report.message());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

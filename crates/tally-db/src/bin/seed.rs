//! # Seed Data Generator
//!
//! Registers a demo company and fills its catalog for development.
//!
//! ## Usage
//! ```bash
//! # Demo company with 40 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p tally-db --bin seed -- --count 200 --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - One company on the free plan, with its `company_created` audit entry
//! - Products across a few categories, stock 0..=60, some below threshold
//! - A handful of services, one of them inactive
//!
//! The tenant id and admin id are printed at the end so a development
//! token can be minted for them.

use std::env;

use tally_db::{Database, DbConfig, NewCompany, NewProduct, ServiceInput};

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Hair Care",
        &[
            "Shampoo",
            "Conditioner",
            "Hair Mask",
            "Leave-in Cream",
            "Hair Oil",
            "Dry Shampoo",
        ],
    ),
    (
        "Skin Care",
        &[
            "Moisturizer",
            "Sunscreen SPF 50",
            "Face Wash",
            "Body Lotion",
            "Hand Cream",
        ],
    ),
    (
        "Nails",
        &[
            "Nail Polish",
            "Top Coat",
            "Cuticle Oil",
            "Nail File",
            "Polish Remover",
        ],
    ),
    (
        "Accessories",
        &["Hair Clip", "Comb", "Round Brush", "Hair Tie Pack", "Shower Cap"],
    ),
];

/// Size variants appended to product names, with a price add-on in cents.
const SIZES: &[(&str, i64)] = &[("Travel", 0), ("Regular", 450), ("Large", 900)];

/// (name, price_cents, duration_minutes, active)
const SERVICES: &[(&str, i64, i64, bool)] = &[
    ("Haircut", 4500, 45, true),
    ("Blow Dry", 3000, 30, true),
    ("Manicure", 2500, 40, true),
    ("Pedicure", 3500, 50, true),
    ("Hair Coloring", 12000, 120, true),
    ("Beard Trim", 2000, 20, false),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./tally_dev.db");
    let mut company_name = String::from("Demo Salon");
    let mut admin_email = String::from("owner@demo-salon.test");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--company" => {
                if i + 1 < args.len() {
                    company_name = args[i + 1].clone();
                    i += 1;
                }
            }
            "--email" => {
                if i + 1 < args.len() {
                    admin_email = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 40)");
                println!("  -d, --db <PATH>      Database file path (default: ./tally_dev.db)");
                println!("      --company <NAME> Company name (default: Demo Salon)");
                println!("      --email <EMAIL>  Admin e-mail (default: owner@demo-salon.test)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let (company, admin) = db
        .companies()
        .create(NewCompany {
            name: company_name,
            admin_email,
            admin_id: uuid::Uuid::new_v4().to_string(),
        })
        .await?;
    println!("✓ Registered company '{}'", company.name);

    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category, names) in CATEGORIES {
        for name in names.iter() {
            for (size, price_addon) in SIZES {
                if generated >= count {
                    break 'outer;
                }

                let input = generate_product(category, name, size, *price_addon, generated);
                if let Err(e) = db.products().create(&admin, input).await {
                    eprintln!("Failed to insert {} {}: {}", name, size, e);
                    continue;
                }
                generated += 1;
            }
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    println!();
    println!("Generating services...");
    for (name, price_cents, duration, active) in SERVICES {
        db.services()
            .create(
                &admin,
                ServiceInput {
                    name: name.to_string(),
                    description: None,
                    price_cents: *price_cents,
                    duration_minutes: Some(*duration),
                    active: *active,
                },
            )
            .await?;
    }
    println!("✓ Generated {} services", SERVICES.len());

    let in_stock = db.products().list_in_stock(&company.id).await?;
    let low = db.products().list_low_stock(&company.id).await?;
    println!("  In stock: {}  Low/out: {}", in_stock.len(), low.len());

    println!();
    println!("✓ Seed complete!");
    println!("  tenant_id: {}", company.id);
    println!("  admin id:  {}", admin.actor_id);

    db.close().await;
    Ok(())
}

/// Generates a single product with deterministic, realistic data.
fn generate_product(
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> NewProduct {
    // Base price $4.99 - $24.99 plus size add-on
    let price_cents = 499 + ((seed * 37) % 2000) as i64 + price_addon;

    // Stock 0..=60; every seventh product starts sold out
    let stock = if seed % 7 == 0 { 0 } else { (seed * 13 % 61) as i64 };

    NewProduct {
        name: format!("{} {}", name, size),
        category: category.to_string(),
        description: None,
        price_cents,
        stock,
        min_stock: Some(5 + (seed % 3) as i64 * 5),
    }
}

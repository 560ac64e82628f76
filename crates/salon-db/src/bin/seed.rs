//! # Seed Data Generator
//!
//! Populates the database with salon retail products, stock movements,
//! sales and course tickets for development.
//!
//! ## Usage
//! ```bash
//! # 20 products (default) into SALON_DB_PATH or ./salon.db
//! cargo run -p salon-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p salon-db --bin seed -- --products 40 --db ./data/salon.db
//! ```
//!
//! Everything goes through the public engine API, so the seeded ledger
//! obeys the same rules as production data: every sale has its `sale_out`
//! entry and no product ever dips below zero.

use std::env;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use salon_core::stocktake::stocktake_label;
use salon_core::{LogType, NewCourseTicket, NewLedgerEntry, NewProduct, NewSale};
use salon_db::{Database, EngineConfig};

/// Retail catalog: (category, names)
const CATALOG: &[(&str, &[&str])] = &[
    (
        "hair care",
        &[
            "Repair Shampoo",
            "Color Protect Conditioner",
            "Argan Hair Oil",
            "Keratin Mask",
            "Scalp Tonic",
            "Volume Mousse",
        ],
    ),
    (
        "styling",
        &[
            "Matte Wax",
            "Curl Cream",
            "Heat Protect Spray",
            "Texture Powder",
        ],
    ),
    (
        "skin care",
        &[
            "Hydrating Toner",
            "Vitamin C Serum",
            "Barrier Cream",
            "Sheet Mask Pack",
        ],
    ),
    (
        "tools",
        &["Boar Bristle Brush", "Wide Tooth Comb", "Silk Scrunchie"],
    ),
];

/// Course tickets sold to seeded customers: (name, sessions, price)
const TICKETS: &[(&str, i64, i64)] = &[
    ("Scalp Care x5", 5, 40_000),
    ("Head Spa x10", 10, 90_000),
    ("Treatment x3", 3, 27_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = EngineConfig::from_env()?;
    let mut count: usize = 20;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(20);
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
                println!("Salon Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>  Number of products to generate (default: 20)");
                println!("  -d, --db <PATH>      Database file path (default: $SALON_DB_PATH or ./salon.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %config.database_path.display(), products = count, "Seeding");

    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let month_start = today.with_day(1).unwrap_or(today);
    let start = std::time::Instant::now();

    let names: Vec<(&str, &str)> = CATALOG
        .iter()
        .flat_map(|(category, names)| names.iter().map(move |name| (*category, *name)))
        .collect();

    let mut product_ids = Vec::with_capacity(count);
    for seed in 0..count {
        let Some(&(category, base_name)) = names.get(seed % names.len()) else {
            break;
        };
        let name = if seed < names.len() {
            base_name.to_string()
        } else {
            format!("{base_name} #{}", seed / names.len() + 1)
        };

        let product_id = seed_product(&db, seed, category, &name, month_start).await?;
        product_ids.push(product_id);
    }

    info!(products = product_ids.len(), "Products received");

    let mut sales = 0;
    for (seed, product_id) in product_ids.iter().enumerate() {
        let quantity = (seed % 3) as i64 + 1;
        let sale = NewSale {
            product_id: product_id.clone(),
            customer_id: format!("cust-{:03}", seed % 7),
            quantity,
            unit_price_cents: 1500 + (seed as i64 * 250) % 4000,
            logged_at: month_start + Duration::days((seed % 10) as i64 + 1),
            reason: None,
            record_id: None,
        };

        match db.sales().record_sale(&sale).await {
            Ok(_) => sales += 1,
            Err(e) => warn!(product_id = %product_id, error = %e, "Seed sale skipped"),
        }

        if seed % 5 == 0 {
            db.ledger()
                .append(&NewLedgerEntry::movement(
                    product_id,
                    LogType::SampleOut,
                    -1,
                    Some("counter tester".to_string()),
                    month_start + Duration::days(12),
                ))
                .await?;
        }
    }

    info!(sales, "Sales recorded");

    for (seed, (name, sessions, price)) in TICKETS.iter().enumerate() {
        let ticket = db
            .tickets()
            .create(&NewCourseTicket {
                customer_id: format!("cust-{:03}", seed),
                ticket_name: name.to_string(),
                total_sessions: *sessions,
                price_cents: *price,
                expiry_date: Some(today + Duration::days(180)),
            })
            .await?;

        for _ in 0..=seed {
            db.tickets().consume(&ticket.id).await?;
        }
    }

    info!(tickets = TICKETS.len(), "Course tickets sold");

    // One month-end stocktake on the first product so the ledger has an adjust.
    if let Some(first) = product_ids.first() {
        let stock = db.ledger().current_stock(first).await?;
        let counted = [(first.clone(), (stock - 1).max(0))].into_iter().collect();
        let diffs = db.stocktake().compute_diff(&counted).await?;
        db.stocktake()
            .commit(
                &diffs,
                today,
                &stocktake_label(today.year(), today.month()),
            )
            .await?;
    }

    let elapsed = start.elapsed();
    info!(?elapsed, "Seed complete");

    let summary = db.ledger().inventory_summary().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    db.close().await;
    Ok(())
}

/// Creates one product and receives its opening stock in two deliveries.
async fn seed_product(
    db: &Database,
    seed: usize,
    category: &str,
    name: &str,
    month_start: NaiveDate,
) -> Result<String, Box<dyn std::error::Error>> {
    // Sell price 15.00 - 54.75, cost 40-55% of it
    let sell = 1500 + ((seed as i64 * 175) % 4000);
    let cost = sell * (40 + (seed % 4) as i64 * 5) / 100;

    let product = db
        .products()
        .insert(&NewProduct {
            name: name.to_string(),
            category: Some(category.to_string()),
            base_sell_price_cents: sell,
            base_cost_price_cents: cost,
            reorder_point: 2 + (seed % 3) as i64,
        })
        .await?;

    let first = 4 + (seed % 6) as i64;
    let second = 2 + (seed % 4) as i64;
    db.ledger()
        .append(&NewLedgerEntry::purchase(&product.id, first, cost, month_start))
        .await?;
    db.ledger()
        .append(&NewLedgerEntry::purchase(
            &product.id,
            second,
            cost + 50,
            month_start + Duration::days(7),
        ))
        .await?;

    Ok(product.id)
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=salon=trace` - Show trace for salon crates only
/// - Default: `info,salon=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,salon=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

//! # Seed Data Generator
//!
//! Populates a database with one demo company for dashboard development.
//!
//! ## Usage
//! ```bash
//! # 120 days of history (default)
//! cargo run -p tally-db --bin seed
//!
//! # Longer history, custom path
//! cargo run -p tally-db --bin seed -- --days 400 --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - 3 staff users (manager, cashier, technician)
//! - A catalogue where each cost column scheme is represented
//!   (cost_price only, cost only, purchase_price only, no cost at all)
//! - 1-4 sales per day with line items, plus the odd swap-mode sale
//! - Swaps with profit links, some realized by a later resale
//! - Repairs with fitted parts
//! - Module flags and one scheduled report

use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use std::env;
use tally_db::repository::sql_timestamp;
use tally_db::{Database, DbConfig};
use uuid::Uuid;

const COMPANY_ID: &str = "demo-company";

/// (name, price, cost_price, cost, purchase_price)
const PRODUCTS: &[(&str, i64, Option<i64>, Option<i64>, Option<i64>)] = &[
    ("iPhone 13 Case", 2500, Some(800), None, None),
    ("USB-C Cable", 1500, None, Some(400), None),
    ("Screen Protector", 1200, None, None, Some(300)),
    ("Wireless Charger", 4500, Some(2200), Some(2000), None),
    ("Gift Wrap", 300, None, None, None),
    ("Refurbished Galaxy S21", 32000, Some(24000), None, None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 120;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(120);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of history to generate (default: 120)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("History:  {} days", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let pool = db.pool();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE company_id = ?1")
        .bind(COMPANY_ID)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("⚠ Demo company already has {} sales", existing);
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let now = Utc::now().naive_utc();

    seed_company(pool).await?;
    let product_ids = seed_products(pool).await?;
    let (sales, swap_sales) = seed_sales(pool, &product_ids, now, days).await?;
    let (swaps, realized) = seed_swaps(pool, &product_ids, now, days).await?;
    let repairs = seed_repairs(pool, &product_ids, now, days).await?;

    println!();
    println!("✓ {} sales ({} in swap mode)", sales, swap_sales);
    println!("✓ {} swaps ({} realized)", swaps, realized);
    println!("✓ {} repairs", repairs);
    println!("✓ Seed complete in {:?}", start.elapsed());
    println!();
    println!("Company id: {}", COMPANY_ID);

    Ok(())
}

async fn seed_company(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO companies (id, name) VALUES (?1, 'Demo Phone Shop')")
        .bind(COMPANY_ID)
        .execute(pool)
        .await?;

    for (id, name, role) in [
        ("u-manager", "Morgan Manager", "manager"),
        ("u-cashier", "Casey Cashier", "cashier"),
        ("u-tech", "Taylor Technician", "technician"),
    ] {
        sqlx::query("INSERT INTO users (id, company_id, full_name, role) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(COMPANY_ID)
            .bind(name)
            .bind(role)
            .execute(pool)
            .await?;
    }

    for (key, enabled) in [("pos", true), ("repairs", true), ("swaps", true), ("inventory", true)] {
        sqlx::query("INSERT INTO company_modules (company_id, module_key, enabled) VALUES (?1, ?2, ?3)")
            .bind(COMPANY_ID)
            .bind(key)
            .bind(enabled)
            .execute(pool)
            .await?;
    }

    sqlx::query(
        "INSERT INTO scheduled_reports (id, company_id, name, frequency, is_active, next_run_at) \
         VALUES (?1, ?2, 'Weekly profit summary', 'weekly', 1, datetime('now', '+7 days'))",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(COMPANY_ID)
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_products(pool: &SqlitePool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let mut ids = Vec::with_capacity(PRODUCTS.len());
    for (idx, (name, price, cost_price, cost, purchase_price)) in PRODUCTS.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO products (id, company_id, name, price_cents, quantity, cost_price_cents, cost_cents, purchase_price_cents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(COMPANY_ID)
        .bind(*name)
        .bind(*price)
        .bind(((idx * 7) % 20) as i64)
        .bind(*cost_price)
        .bind(*cost)
        .bind(*purchase_price)
        .execute(pool)
        .await?;
        ids.push((id, *price));
    }
    Ok(ids)
}

async fn insert_sale(
    pool: &SqlitePool,
    staff: &str,
    amount: i64,
    at: NaiveDateTime,
    swap_id: Option<&str>,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO sales (id, company_id, created_by, final_amount_cents, is_swap_mode, swap_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&id)
    .bind(COMPANY_ID)
    .bind(staff)
    .bind(amount)
    .bind(swap_id.is_some())
    .bind(swap_id)
    .bind(sql_timestamp(at))
    .execute(pool)
    .await?;
    Ok(id)
}

async fn insert_item(
    pool: &SqlitePool,
    sale_id: &str,
    product: Option<&str>,
    name: &str,
    quantity: i64,
    unit_price: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sale_items (id, sale_id, product_id, item_name, quantity, unit_price_cents) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(sale_id)
    .bind(product)
    .bind(name)
    .bind(quantity)
    .bind(unit_price)
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_sales(
    pool: &SqlitePool,
    products: &[(String, i64)],
    now: NaiveDateTime,
    days: i64,
) -> Result<(usize, usize), sqlx::Error> {
    let mut sales = 0;
    let mut swap_sales = 0;

    for day in 0..days {
        let per_day = 1 + (day * 13 % 4) as usize;
        for n in 0..per_day {
            let at = now - Duration::days(day) - Duration::minutes((n as i64) * 97 + 30);
            let idx = (day as usize * 3 + n) % products.len();
            let (product_id, price) = &products[idx];
            let quantity = 1 + (n as i64 % 2);
            let staff = if n % 2 == 0 { "u-cashier" } else { "u-manager" };

            let sale_id = insert_sale(pool, staff, price * quantity, at, None).await?;
            // every fifth line only carries the product name
            let by_id = (day + n as i64) % 5 != 0;
            insert_item(
                pool,
                &sale_id,
                by_id.then_some(product_id.as_str()),
                PRODUCTS[idx].0,
                quantity,
                *price,
            )
            .await?;
            sales += 1;
        }

        if day % 9 == 0 {
            let swap_ref = Uuid::new_v4().to_string();
            insert_sale(pool, "u-cashier", 32000, now - Duration::days(day), Some(swap_ref.as_str())).await?;
            swap_sales += 1;
        }
    }

    Ok((sales, swap_sales))
}

async fn seed_swaps(
    pool: &SqlitePool,
    products: &[(String, i64)],
    now: NaiveDateTime,
    days: i64,
) -> Result<(usize, usize), sqlx::Error> {
    let mut swaps = 0;
    let mut realized = 0;
    let phone = &products[products.len() - 1].0;

    for (n, day) in (0..days).step_by(11).enumerate() {
        let swap_id = Uuid::new_v4().to_string();
        let taken_at = now - Duration::days(day);
        sqlx::query(
            "INSERT INTO swaps (id, company_id, company_product_id, customer_item_name, total_value_cents, status, created_at) \
             VALUES (?1, ?2, ?3, 'Customer trade-in', ?4, 'completed', ?5)",
        )
        .bind(&swap_id)
        .bind(COMPANY_ID)
        .bind(phone)
        .bind(18000 + (n as i64 % 3) * 2000)
        .bind(sql_timestamp(taken_at))
        .execute(pool)
        .await?;

        // older trade-ins have been resold, recent ones are still on the shelf
        let resale = if day > 14 {
            let resold_at = taken_at + Duration::days(7);
            let sale_id = insert_sale(pool, "u-cashier", 21000, resold_at, None).await?;
            insert_item(pool, &sale_id, None, "Customer trade-in", 1, 21000).await?;
            realized += 1;
            Some((sale_id, resold_at))
        } else {
            None
        };

        let final_profit = resale.as_ref().and_then(|_| (n % 2 == 0).then_some(2500 + n as i64 * 10));
        sqlx::query(
            "INSERT INTO swap_profit_links (id, swap_id, customer_item_sale_id, profit_estimate_cents, final_profit_cents, status, created_at, finalized_at) \
             VALUES (?1, ?2, ?3, 3000, ?4, ?5, ?6, ?7)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&swap_id)
        .bind(resale.as_ref().map(|(id, _)| id.clone()))
        .bind(final_profit)
        .bind(if resale.is_some() { "finalized" } else { "pending" })
        .bind(sql_timestamp(taken_at))
        .bind(resale.as_ref().map(|(_, at)| sql_timestamp(*at)))
        .execute(pool)
        .await?;

        swaps += 1;
    }

    Ok((swaps, realized))
}

async fn seed_repairs(
    pool: &SqlitePool,
    products: &[(String, i64)],
    now: NaiveDateTime,
    days: i64,
) -> Result<usize, sqlx::Error> {
    let mut repairs = 0;
    let statuses = ["completed", "pending", "delivered"];

    for (n, day) in (0..days).step_by(4).enumerate() {
        let id = Uuid::new_v4().to_string();
        let labour: Option<i64> = (n % 3 == 0).then_some(3000);
        sqlx::query(
            "INSERT INTO repairs (id, company_id, technician_id, device, repair_cost_cents, labour_cost_cents, status, created_at) \
             VALUES (?1, ?2, 'u-tech', 'Phone', ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(COMPANY_ID)
        .bind(6000 + (n as i64 % 4) * 1500)
        .bind(labour)
        .bind(statuses[n % statuses.len()])
        .bind(sql_timestamp(now - Duration::days(day) - Duration::hours(3)))
        .execute(pool)
        .await?;

        if n % 2 == 0 {
            let (part_id, price) = &products[2];
            sqlx::query(
                "INSERT INTO repair_parts (id, repair_id, product_id, price_cents, quantity) VALUES (?1, ?2, ?3, ?4, 1)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(part_id)
            .bind(*price)
            .execute(pool)
            .await?;
        }

        repairs += 1;
    }

    Ok(repairs)
}

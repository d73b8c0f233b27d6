use std::path::PathBuf;

use chrono::{Datelike, Local, NaiveDate};
use rusqlite::Connection;

use crate::classifier::days_in_month;
use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings};

const DEMO_EMAIL: &str = "demo@penny.example";
const DEMO_ITEM: &str = "demo-checking";
const FEED_FILE: &str = "demo-feed.json";

struct DemoFixedCost {
    name: &'static str,
    amount: f64,
    category: &'static str,
    merchant: Option<&'static str>,
    due_day: u32,
}

const FIXED_COSTS: &[DemoFixedCost] = &[
    DemoFixedCost { name: "Rent", amount: 1400.0, category: "Housing", merchant: None, due_day: 1 },
    DemoFixedCost { name: "Netflix", amount: 15.49, category: "Subscriptions", merchant: Some("NETFLIX.COM"), due_day: 5 },
    DemoFixedCost { name: "Car insurance", amount: 130.0, category: "Insurance", merchant: Some("GEICO"), due_day: 12 },
    DemoFixedCost { name: "Emergency fund", amount: 150.0, category: "Savings", merchant: None, due_day: 1 },
];

struct DemoTxn {
    day: u32,
    name: &'static str,
    merchant: Option<&'static str>,
    /// Feed sign convention: negative is money in.
    amount: f64,
}

const MONTHLY: &[DemoTxn] = &[
    DemoTxn { day: 1, name: "ACME CORP PAYROLL", merchant: Some("ACME CORP PAYROLL"), amount: -2950.0 },
    DemoTxn { day: 15, name: "ACME CORP PAYROLL", merchant: Some("ACME CORP PAYROLL"), amount: -3050.0 },
    DemoTxn { day: 3, name: "TRADER JOES", merchant: Some("TRADER JOES"), amount: 84.12 },
    DemoTxn { day: 5, name: "NETFLIX.COM", merchant: Some("NETFLIX.COM"), amount: 15.49 },
    DemoTxn { day: 8, name: "SHELL OIL", merchant: Some("SHELL OIL"), amount: 42.80 },
    DemoTxn { day: 12, name: "GEICO", merchant: Some("GEICO"), amount: 130.0 },
    DemoTxn { day: 17, name: "TRADER JOES", merchant: Some("TRADER JOES"), amount: 96.40 },
    DemoTxn { day: 21, name: "CHIPOTLE", merchant: Some("CHIPOTLE"), amount: 23.75 },
];

/// One-off events layered over the monthly pattern.
const ONE_OFFS: &[(u32, u32, &str, f64)] = &[
    // (months ago, day, name, amount)
    (1, 19, "BEST BUY - OLED TV", 1249.99),
    (0, 6, "VENMO FROM SAM", -220.0),
    (2, 23, "STATE TAX REFUND", -415.0),
];

fn make_date(today: NaiveDate, months_ago: u32, day: u32) -> String {
    let target = today - chrono::Months::new(months_ago);
    let d = day.min(days_in_month(target.year(), target.month()));
    format!("{:04}-{:02}-{:02}", target.year(), target.month(), d)
}

fn generate_feed(today: NaiveDate) -> Vec<serde_json::Value> {
    let mut records = Vec::new();
    let mut seq = 0u32;

    for months_ago in (0..3u32).rev() {
        for txn in MONTHLY {
            seq += 1;
            records.push(serde_json::json!({
                "external_id": format!("demo-{seq:04}"),
                "account_id": "demo-acct-1",
                "amount": txn.amount,
                "date": make_date(today, months_ago, txn.day),
                "name": txn.name,
                "merchant_name": txn.merchant,
                "pending": false,
            }));
        }
    }
    for (months_ago, day, name, amount) in ONE_OFFS {
        seq += 1;
        records.push(serde_json::json!({
            "external_id": format!("demo-{seq:04}"),
            "account_id": "demo-acct-1",
            "amount": amount,
            "date": make_date(today, *months_ago, *day),
            "name": name,
            "merchant_name": name,
            "pending": false,
        }));
    }
    records
}

fn insert_demo_data(conn: &Connection, feed_path: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, pay_day_1, pay_day_2, expected_paycheck_amount) \
         VALUES ('Demo User', ?1, 1, 15, 3000.0)",
        [DEMO_EMAIL],
    )?;
    let user_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO balances (user_id, amount) VALUES (?1, 0.0)",
        [user_id],
    )?;

    for fc in FIXED_COSTS {
        let today = Local::now().date_naive();
        let due = make_date(today, 0, fc.due_day);
        conn.execute(
            "INSERT INTO fixed_costs (user_id, name, amount, category, merchant_name, next_due_date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![user_id, fc.name, fc.amount, fc.category, fc.merchant, due],
        )?;
    }

    conn.execute(
        "INSERT INTO items (user_id, item_id, access_token, institution) \
         VALUES (?1, ?2, ?3, 'Demo Bank')",
        rusqlite::params![user_id, DEMO_ITEM, feed_path],
    )?;

    Ok(user_id)
}

pub fn run() -> Result<()> {
    let mut settings = load_settings();
    let data_dir = PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("penny.db");

    if !db_path.exists() {
        eprintln!("No database found. Run `penny init` first.");
        std::process::exit(1);
    }

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    // Idempotency guard
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [DEMO_EMAIL],
        |r| r.get(0),
    )?;
    if exists {
        println!("Demo data already loaded (user '{DEMO_EMAIL}' exists).");
        return Ok(());
    }

    let today = Local::now().date_naive();
    let feed = generate_feed(today);
    let feed_path = data_dir.join(FEED_FILE);
    std::fs::write(&feed_path, serde_json::to_string_pretty(&feed)?)?;

    let feed_path_str = feed_path.to_string_lossy().to_string();
    insert_demo_data(&conn, &feed_path_str)?;

    settings.user_email = DEMO_EMAIL.to_string();
    save_settings(&settings)?;

    println!("Demo data loaded!");
    println!("  User:         {DEMO_EMAIL}");
    println!("  Feed:         {} ({} transactions)", feed_path.display(), feed.len());
    println!("  Fixed costs:  {}", FIXED_COSTS.len());
    println!();
    println!("Try these next:");
    println!("  penny sync");
    println!("  penny deposits list");
    println!("  penny expenses list");
    println!("  penny balance show");
    println!("  penny status");

    Ok(())
}

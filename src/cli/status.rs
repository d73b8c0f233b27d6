use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{format_bytes, money};
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("penny.db");

    println!("User:       {}", if settings.user_email.is_empty() { "(not set)" } else { &settings.user_email });
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;

        let items: i64 = conn.query_row("SELECT count(*) FROM items", [], |r| r.get(0))?;
        let transactions: i64 =
            conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let pending_deposits: i64 = conn.query_row(
            "SELECT count(*) FROM transactions \
             WHERE suggested_kind != 'unknown' AND user_decision = 'undecided'",
            [],
            |r| r.get(0),
        )?;
        let flagged: i64 = conn.query_row(
            "SELECT count(*) FROM transactions \
             WHERE is_large_expense_candidate = 1 AND large_expense_handled = 0",
            [],
            |r| r.get(0),
        )?;
        let fixed_costs: i64 = conn.query_row("SELECT count(*) FROM fixed_costs", [], |r| r.get(0))?;

        println!();
        println!("Linked feeds:      {items}");
        println!("Transactions:      {transactions}");
        println!("Pending deposits:  {pending_deposits}");
        println!("Large expenses:    {flagged}");
        println!("Fixed costs:       {fixed_costs}");

        if !settings.user_email.is_empty() {
            let balance: Option<f64> = conn
                .query_row(
                    "SELECT b.amount FROM balances b JOIN users u ON u.id = b.user_id \
                     WHERE u.email = ?1",
                    [&settings.user_email],
                    |r| r.get(0),
                )
                .ok();
            if let Some(b) = balance {
                println!("Spendable balance: {}", money(b));
            }
        }
    } else {
        println!();
        println!("Database not found. Run `penny init` to set up.");
    }

    Ok(())
}

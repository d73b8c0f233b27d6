use colored::Colorize;

use crate::cli::current_user;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::get_data_dir;

pub fn show() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;

    let balance: Option<f64> = conn
        .query_row("SELECT amount FROM balances WHERE user_id = ?1", [user_id], |r| r.get(0))
        .ok();

    match balance {
        Some(b) if b < 0.0 => println!("Spendable balance: {}", money(b).red()),
        Some(b) => println!("Spendable balance: {}", money(b).green()),
        None => println!("No balance yet. Run `penny onboard` to start a pay cycle."),
    }
    Ok(())
}

pub fn set(amount: f64) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;

    conn.execute(
        "INSERT INTO balances (user_id, amount) VALUES (?1, ?2) \
         ON CONFLICT(user_id) DO UPDATE SET amount = excluded.amount, updated_at = datetime('now')",
        rusqlite::params![user_id, amount],
    )?;
    println!("Spendable balance set to {}", money(amount));
    Ok(())
}

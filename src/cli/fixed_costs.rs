use comfy_table::{Cell, Table};

use crate::cli::{current_user, parse_date};
use crate::db::get_connection;
use crate::error::{PennyError, Result};
use crate::fmt::money;
use crate::settings::get_data_dir;

pub fn add(
    name: &str,
    amount: f64,
    category: &str,
    merchant: Option<&str>,
    next_due: Option<&str>,
) -> Result<()> {
    if amount <= 0.0 {
        return Err(PennyError::InvalidArgument("amount must be positive".to_string()));
    }
    let due = next_due.map(parse_date).transpose()?;

    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;
    conn.execute(
        "INSERT INTO fixed_costs (user_id, name, amount, category, merchant_name, next_due_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            user_id,
            name,
            amount,
            category,
            merchant,
            due.map(|d| d.format("%Y-%m-%d").to_string()),
        ],
    )?;
    println!("Added fixed cost: {name} ({})", money(amount));
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;

    let mut stmt = conn.prepare(
        "SELECT id, name, amount, category, kind, merchant_name, next_due_date FROM fixed_costs \
         WHERE user_id = ?1 ORDER BY next_due_date IS NULL, next_due_date, name",
    )?;
    let rows: Vec<(i64, String, f64, String, String, Option<String>, Option<String>)> = stmt
        .query_map([user_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        println!("No fixed costs yet. Add one with `penny fixed-costs add`.");
        return Ok(());
    }

    let mut total = 0.0;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Amount", "Category", "Kind", "Merchant", "Next Due"]);
    for (id, name, amount, category, kind, merchant, due) in rows {
        total += amount;
        table.add_row(vec![
            Cell::new(id),
            Cell::new(name),
            Cell::new(money(amount)),
            Cell::new(category),
            Cell::new(kind),
            Cell::new(merchant.unwrap_or_default()),
            Cell::new(due.unwrap_or_default()),
        ]);
    }
    println!("Fixed costs\n{table}");
    println!("Total per period: {}", money(total));
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;
    let changed = conn.execute(
        "DELETE FROM fixed_costs WHERE id = ?1 AND user_id = ?2",
        [id, user_id],
    )?;
    if changed == 0 {
        return Err(PennyError::NotFound(format!("fixed cost {id}")));
    }
    println!("Deleted fixed cost {id}.");
    Ok(())
}

use comfy_table::{Cell, Table};

use crate::cli::current_user;
use crate::db::get_connection;
use crate::error::{PennyError, Result};
use crate::fmt::money;
use crate::settings::get_data_dir;
use crate::sync::map_txn_row;

pub fn run(month: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;

    let like = match month {
        Some(m) => {
            if m.len() != 7 || m.as_bytes()[4] != b'-' {
                return Err(PennyError::InvalidArgument(format!(
                    "invalid month: {m} (expected YYYY-MM)"
                )));
            }
            format!("{m}-%")
        }
        None => "%".to_string(),
    };

    let mut stmt = conn.prepare(
        "SELECT id, user_id, external_id, account_id, amount, date, name, merchant_name, pending, \
         suggested_kind, user_decision, counted_as_income, is_large_expense_candidate, \
         large_expense_handled FROM transactions \
         WHERE user_id = ?1 AND date LIKE ?2 ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![user_id, like], map_txn_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        println!("No transactions. Run `penny sync` to pull from your linked feeds.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Name", "Amount", "Kind", "Decision", "Flags"]);
    for txn in &rows {
        let mut flags = Vec::new();
        if txn.pending {
            flags.push("pending");
        }
        if txn.is_large_expense_candidate {
            flags.push("large");
        }
        if txn.counted_as_income {
            flags.push("income");
        }
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(&txn.date),
            Cell::new(txn.merchant_name.as_deref().unwrap_or(&txn.name)),
            Cell::new(money(txn.amount)),
            Cell::new(txn.suggested_kind.code()),
            Cell::new(&txn.user_decision),
            Cell::new(flags.join(",")),
        ]);
    }
    println!("Transactions ({})\n{table}", rows.len());
    Ok(())
}

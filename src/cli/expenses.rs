use comfy_table::{Cell, Table};

use crate::cli::{current_user, parse_date};
use crate::db::get_connection;
use crate::decisions::{apply_decision, pending_large_expenses};
use crate::error::{PennyError, Result};
use crate::fmt::money;
use crate::models::{Decision, LargeExpenseDecision};
use crate::settings::get_data_dir;

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;
    let rows = pending_large_expenses(&conn, user_id)?;

    if rows.is_empty() {
        println!("No large expenses waiting for a decision.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Name", "Amount"]);
    for txn in rows {
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(&txn.date),
            Cell::new(txn.merchant_name.as_deref().unwrap_or(&txn.name)),
            Cell::new(money(txn.amount)),
        ]);
    }
    println!("Flagged large expenses\n{table}");
    println!("Decide with: penny expenses decide <id> spend|savings|installments");
    Ok(())
}

pub fn decide(
    id: i64,
    decision: &str,
    periods: Option<u32>,
    name: Option<String>,
    amount: Option<f64>,
    first_due: Option<&str>,
) -> Result<()> {
    let mut conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;

    let d = match decision {
        "spend" => LargeExpenseDecision::TreatAsVariableSpend,
        "savings" => LargeExpenseDecision::FromSavings,
        "installments" => LargeExpenseDecision::ToFixedCost {
            periods,
            per_period_amount: amount,
            name,
            first_due_date: first_due.map(parse_date).transpose()?,
        },
        other => {
            return Err(PennyError::InvalidArgument(format!(
                "unknown decision '{other}' (expected spend, savings, or installments)"
            )))
        }
    };

    let outcome = apply_decision(&mut conn, user_id, id, &Decision::LargeExpense(d))?;
    println!("Recorded: {}", outcome.decision);
    if let Some(balance) = outcome.balance {
        println!("Spendable balance: {}", money(balance));
    }
    Ok(())
}

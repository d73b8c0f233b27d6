use comfy_table::{Cell, Table};

use crate::cli::current_user;
use crate::db::get_connection;
use crate::decisions::{apply_decision, pending_deposits};
use crate::error::{PennyError, Result};
use crate::fmt::money;
use crate::models::{Decision, DepositDecision};
use crate::settings::get_data_dir;

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;
    let rows = pending_deposits(&conn, user_id)?;

    if rows.is_empty() {
        println!("No deposits waiting for a decision.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Name", "Amount", "Looks like"]);
    for txn in rows {
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(&txn.date),
            Cell::new(txn.merchant_name.as_deref().unwrap_or(&txn.name)),
            Cell::new(money(txn.amount)),
            Cell::new(txn.suggested_kind.code()),
        ]);
    }
    println!("Pending deposits\n{table}");
    println!("Decide with: penny deposits decide <id> income|ignore|debt|savings");
    Ok(())
}

fn parse_decision(s: &str) -> Result<DepositDecision> {
    match s {
        "income" => Ok(DepositDecision::TreatAsIncome),
        "ignore" => Ok(DepositDecision::IgnoreForDynamic),
        "debt" => Ok(DepositDecision::DebtPayment),
        "savings" => Ok(DepositDecision::SavingsFunded),
        other => Err(PennyError::InvalidArgument(format!(
            "unknown decision '{other}' (expected income, ignore, debt, or savings)"
        ))),
    }
}

pub fn decide(id: i64, decision: &str) -> Result<()> {
    let mut conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;
    let d = Decision::Deposit(parse_decision(decision)?);

    let outcome = apply_decision(&mut conn, user_id, id, &d)?;
    println!("Recorded: {}", outcome.decision);
    if let Some(balance) = outcome.balance {
        println!("Spendable balance: {}", money(balance));
    }
    Ok(())
}

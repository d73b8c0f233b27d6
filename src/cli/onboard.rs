use chrono::Local;
use colored::Colorize;

use crate::cli::{current_user, parse_date};
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::notifier::{ConsoleNotifier, Notifier};
use crate::period::{finalize_budget, FinalizeRequest};
use crate::settings::get_data_dir;

pub fn run(
    paycheck: f64,
    pay_day_1: u32,
    pay_day_2: u32,
    next_paycheck: &str,
    debt: Option<f64>,
) -> Result<()> {
    let mut conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;

    let req = FinalizeRequest {
        paycheck_amount: paycheck,
        pay_day_1,
        pay_day_2,
        next_paycheck_date: parse_date(next_paycheck)?,
        debt_per_paycheck: debt,
    };
    let today = Local::now().date_naive();
    let outcome = finalize_budget(&mut conn, user_id, &req, today)?;

    println!("{}", "Budget finalized.".green());
    println!(
        "  Pay cycle:     {} days ({} remaining)",
        outcome.pay_cycle_days, outcome.days_until_next_paycheck
    );
    println!("  Prorated at:   {:.0}%", outcome.prorate_factor * 100.0);
    println!("  Spendable:     {}", money(outcome.balance).bold());

    // Best effort, same as every other notification.
    let _ = ConsoleNotifier.notify_user(
        user_id,
        "Budget ready",
        &format!(
            "You have {} to spend until your next paycheck.",
            money(outcome.balance)
        ),
    );
    Ok(())
}

use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};

use crate::classifier::days_in_month;
use crate::error::{PennyError, Result};

#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub paycheck_amount: f64,
    pub pay_day_1: u32,
    pub pay_day_2: u32,
    pub next_paycheck_date: NaiveDate,
    pub debt_per_paycheck: Option<f64>,
}

#[derive(Debug)]
pub struct FinalizeOutcome {
    pub balance: f64,
    pub prorate_factor: f64,
    pub pay_cycle_days: i64,
    pub days_until_next_paycheck: i64,
}

/// The paycheck date before `next`: the two pay-days alternate, so if `next`
/// lands on the smaller day the previous one was the larger day last month
/// (clamped to that month's length), otherwise it was the smaller day in
/// `next`'s month.
pub fn previous_paycheck_date(pay_day_1: u32, pay_day_2: u32, next: NaiveDate) -> NaiveDate {
    let (small, large) = if pay_day_1 <= pay_day_2 {
        (pay_day_1, pay_day_2)
    } else {
        (pay_day_2, pay_day_1)
    };

    if next.day() == small {
        let (py, pm) = if next.month() == 1 {
            (next.year() - 1, 12)
        } else {
            (next.year(), next.month() - 1)
        };
        let day = large.min(days_in_month(py, pm));
        NaiveDate::from_ymd_opt(py, pm, day).expect("clamped day is valid")
    } else {
        let day = small.min(days_in_month(next.year(), next.month()));
        NaiveDate::from_ymd_opt(next.year(), next.month(), day).expect("clamped day is valid")
    }
}

/// Seed the dynamic balance for a fresh pay cycle: prorate the declared
/// paycheck (net of recurring costs due this period) by the fraction of the
/// cycle remaining. Runs once per user; re-running is a conflict. This is
/// the only place the balance is reset rather than incrementally adjusted.
pub fn finalize_budget(
    conn: &mut Connection,
    user_id: i64,
    req: &FinalizeRequest,
    today: NaiveDate,
) -> Result<FinalizeOutcome> {
    let onboarded: bool = conn
        .query_row("SELECT onboarding_complete FROM users WHERE id = ?1", [user_id], |r| r.get(0))
        .map_err(|_| PennyError::NotFound(format!("user {user_id}")))?;
    if onboarded {
        return Err(PennyError::Conflict("onboarding already complete".into()));
    }

    if req.next_paycheck_date <= today {
        return Err(PennyError::InvalidArgument(
            "next paycheck date must be in the future".into(),
        ));
    }

    let previous = previous_paycheck_date(req.pay_day_1, req.pay_day_2, req.next_paycheck_date);
    let pay_cycle_days = (req.next_paycheck_date - previous).num_days();
    if pay_cycle_days <= 0 {
        return Err(PennyError::InvalidArgument("invalid pay cycle".into()));
    }

    let days_until = (req.next_paycheck_date - today).num_days();
    if days_until < 0 || days_until > pay_cycle_days {
        return Err(PennyError::InvalidArgument(
            "next paycheck date is inconsistent with pay days and today's date".into(),
        ));
    }

    let today_s = today.format("%Y-%m-%d").to_string();
    let next_s = req.next_paycheck_date.format("%Y-%m-%d").to_string();

    let db = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Bills due inside this cycle, plus Savings rows regardless of due date.
    let due_in_period: f64 = db.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM fixed_costs \
         WHERE user_id = ?1 AND next_due_date IS NOT NULL \
         AND date(next_due_date) >= date(?2) AND date(next_due_date) <= date(?3)",
        rusqlite::params![user_id, today_s, next_s],
        |r| r.get(0),
    )?;
    let savings: f64 = db.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM fixed_costs WHERE user_id = ?1 AND category = 'Savings'",
        [user_id],
        |r| r.get(0),
    )?;

    let total_recurring = due_in_period + savings + req.debt_per_paycheck.unwrap_or(0.0);
    let effective_paycheck = req.paycheck_amount - total_recurring;
    let prorate_factor = days_until as f64 / pay_cycle_days as f64;
    let final_balance = effective_paycheck * prorate_factor;

    db.execute(
        "INSERT INTO balances (user_id, amount) VALUES (?1, ?2) \
         ON CONFLICT(user_id) DO UPDATE SET amount = excluded.amount, updated_at = datetime('now')",
        rusqlite::params![user_id, final_balance],
    )?;
    db.execute(
        "UPDATE users SET onboarding_complete = 1, pay_day_1 = ?1, pay_day_2 = ?2, \
         expected_paycheck_amount = ?3, debt_per_paycheck = ?4, updated_at = datetime('now') \
         WHERE id = ?5",
        rusqlite::params![
            req.pay_day_1,
            req.pay_day_2,
            req.paycheck_amount,
            req.debt_per_paycheck,
            user_id
        ],
    )?;

    db.commit()?;

    Ok(FinalizeOutcome {
        balance: final_balance,
        prorate_factor,
        pay_cycle_days,
        days_until_next_paycheck: days_until,
    })
}

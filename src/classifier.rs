use chrono::{Datelike, NaiveDate};

use crate::models::SuggestedKind;

/// Days around a configured payday we still consider "pay window".
pub const PAY_WINDOW_DAYS: i64 = 5;

/// How close (fraction of expected) a deposit must be to the expected
/// paycheck amount, boundary inclusive.
pub const AMOUNT_TOLERANCE: f64 = 0.15;

/// A debit at or above this fraction of the expected paycheck is held for
/// explicit user disposition.
pub const LARGE_EXPENSE_RATIO: f64 = 0.30;

/// Merchant-name token used when no expected paycheck is configured.
pub const PAYROLL_TOKEN: &str = "payroll";

/// Everything the classifier needs to know about a credit.
#[derive(Debug, Clone)]
pub struct DepositContext<'a> {
    pub amount: f64,
    pub date: NaiveDate,
    pub merchant_name: Option<&'a str>,
    pub pay_day_1: u32,
    pub pay_day_2: u32,
    pub expected_paycheck_amount: f64,
}

/// Classify a credit as paycheck or windfall. Pure: same inputs, same
/// answer, no I/O.
pub fn classify_deposit(ctx: &DepositContext) -> SuggestedKind {
    if ctx.amount <= 0.0 {
        return SuggestedKind::Unknown;
    }

    // Without an expected paycheck we can't amount-match; fall back to the
    // merchant-name heuristic.
    if ctx.expected_paycheck_amount <= 0.0 {
        let looks_like_payroll = ctx
            .merchant_name
            .map(|m| m.to_lowercase().contains(PAYROLL_TOKEN))
            .unwrap_or(false);
        return if looks_like_payroll {
            SuggestedKind::Paycheck
        } else {
            SuggestedKind::Windfall
        };
    }

    if !amount_within_tolerance(ctx.amount, ctx.expected_paycheck_amount) {
        return SuggestedKind::Windfall;
    }

    let valid_paydays: Vec<u32> = [ctx.pay_day_1, ctx.pay_day_2]
        .into_iter()
        .filter(|d| (1..=31).contains(d))
        .collect();

    // Amount matched but no payday configured: amount-only fallback.
    if valid_paydays.is_empty() {
        return SuggestedKind::Paycheck;
    }

    // Amount looked right but the timing did not: still a windfall, we do
    // not fall through to paycheck.
    if valid_paydays.iter().any(|&d| in_pay_window(ctx.date, d)) {
        SuggestedKind::Paycheck
    } else {
        SuggestedKind::Windfall
    }
}

/// True iff the debit is big enough relative to the expected paycheck to
/// warrant explicit user disposition. Non-positive operands never qualify.
pub fn is_large_expense(amount: f64, expected_paycheck_amount: f64) -> bool {
    if amount <= 0.0 || expected_paycheck_amount <= 0.0 {
        return false;
    }
    amount / expected_paycheck_amount >= LARGE_EXPENSE_RATIO
}

fn amount_within_tolerance(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= AMOUNT_TOLERANCE * expected
}

/// Is `date` within PAY_WINDOW_DAYS of `payday`'s occurrence in the same
/// month? A payday past the end of the month clamps to the last day.
fn in_pay_window(date: NaiveDate, payday: u32) -> bool {
    if !(1..=31).contains(&payday) {
        return false;
    }
    let last = days_in_month(date.year(), date.month());
    let day = payday.min(last);
    // day is always valid after clamping
    let Some(candidate) = NaiveDate::from_ymd_opt(date.year(), date.month(), day) else {
        return false;
    };
    (candidate - date).num_days().abs() <= PAY_WINDOW_DAYS
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_next = NaiveDate::from_ymd_opt(ny, nm, 1).expect("valid month start");
    first_next.pred_opt().expect("month has a last day").day()
}

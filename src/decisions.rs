use chrono::{Duration, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};

use crate::error::{PennyError, Result};
use crate::fmt::round2;
use crate::models::{Decision, DepositDecision, LargeExpenseDecision, Txn};
use crate::sync::map_txn_row;

/// Installment count when the caller doesn't choose one.
pub const DEFAULT_INSTALLMENT_PERIODS: u32 = 4;

/// Bi-weekly spacing for installment due dates.
pub const INSTALLMENT_SPACING_DAYS: i64 = 14;

#[derive(Debug)]
pub struct DecisionOutcome {
    pub decision: &'static str,
    pub counted_as_income: bool,
    pub balance: Option<f64>,
}

/// Apply a user's decision to a transaction they own. Balance effects are
/// at-most-once: re-applying the same decision is a no-op, guarded by the
/// `counted_as_income` / `large_expense_handled` flags. The whole operation
/// runs in one immediate transaction so concurrent mutators of the same
/// user's balance serialize.
pub fn apply_decision(
    conn: &mut Connection,
    user_id: i64,
    transaction_id: i64,
    decision: &Decision,
) -> Result<DecisionOutcome> {
    let db = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Ownership check folded into the lookup: a row that exists but belongs
    // to someone else reads the same as one that doesn't exist.
    let txn: Txn = db
        .query_row(
            "SELECT id, user_id, external_id, account_id, amount, date, name, merchant_name, \
             pending, suggested_kind, user_decision, counted_as_income, \
             is_large_expense_candidate, large_expense_handled \
             FROM transactions WHERE id = ?1 AND user_id = ?2",
            [transaction_id, user_id],
            map_txn_row,
        )
        .map_err(|_| PennyError::NotFound(format!("transaction {transaction_id}")))?;

    let mut counted = txn.counted_as_income;

    match decision {
        Decision::Deposit(d) => {
            if !txn.is_deposit() {
                return Err(PennyError::InvalidArgument(
                    "deposit decision applied to a non-deposit transaction".into(),
                ));
            }
            match d {
                DepositDecision::TreatAsIncome => {
                    if !counted {
                        add_to_balance(&db, user_id, txn.amount)?;
                        counted = true;
                    }
                }
                DepositDecision::IgnoreForDynamic
                | DepositDecision::DebtPayment
                | DepositDecision::SavingsFunded => {
                    // Change of mind: back the amount out exactly once.
                    if counted {
                        add_to_balance(&db, user_id, -txn.amount)?;
                        counted = false;
                    }
                }
            }
            db.execute(
                "UPDATE transactions SET user_decision = ?1, counted_as_income = ?2, \
                 updated_at = datetime('now') WHERE id = ?3",
                rusqlite::params![d.code(), counted, transaction_id],
            )?;
        }
        Decision::LargeExpense(d) => {
            if txn.is_deposit() {
                return Err(PennyError::InvalidArgument(
                    "large-expense decision applied to a deposit".into(),
                ));
            }
            if !txn.is_large_expense_candidate && !txn.large_expense_handled {
                return Err(PennyError::InvalidArgument(
                    "transaction was never flagged as a large expense".into(),
                ));
            }
            match d {
                LargeExpenseDecision::TreatAsVariableSpend => {
                    // The hit already happened at sync; nothing to refund.
                }
                LargeExpenseDecision::FromSavings => {
                    if !txn.large_expense_handled {
                        add_to_balance(&db, user_id, txn.amount)?;
                    }
                }
                LargeExpenseDecision::ToFixedCost {
                    periods,
                    per_period_amount,
                    name,
                    first_due_date,
                } => {
                    let periods = periods.unwrap_or(DEFAULT_INSTALLMENT_PERIODS);
                    if periods == 0 {
                        return Err(PennyError::InvalidArgument(
                            "installment periods must be at least 1".into(),
                        ));
                    }
                    if !txn.large_expense_handled {
                        add_to_balance(&db, user_id, txn.amount)?;
                        create_installments(&db, &txn, periods, *per_period_amount, name.as_deref(), *first_due_date)?;
                    }
                }
            }
            db.execute(
                "UPDATE transactions SET user_decision = ?1, is_large_expense_candidate = 0, \
                 large_expense_handled = 1, updated_at = datetime('now') WHERE id = ?2",
                rusqlite::params![d.code(), transaction_id],
            )?;
        }
    }

    let balance: Option<f64> = db
        .query_row("SELECT amount FROM balances WHERE user_id = ?1", [user_id], |r| r.get(0))
        .ok();

    db.commit()?;

    Ok(DecisionOutcome {
        decision: decision.code(),
        counted_as_income: counted,
        balance,
    })
}

fn add_to_balance(db: &rusqlite::Transaction, user_id: i64, delta: f64) -> Result<()> {
    db.execute(
        "UPDATE balances SET amount = amount + ?1, updated_at = datetime('now') WHERE user_id = ?2",
        rusqlite::params![delta, user_id],
    )?;
    Ok(())
}

fn create_installments(
    db: &rusqlite::Transaction,
    txn: &Txn,
    periods: u32,
    per_period_amount: Option<f64>,
    name: Option<&str>,
    first_due_date: Option<NaiveDate>,
) -> Result<()> {
    let per_period = match per_period_amount {
        Some(a) if a > 0.0 => a,
        _ => round2(txn.amount / periods as f64),
    };
    let merchant = txn.merchant_name.as_deref().unwrap_or(&txn.name);
    let cost_name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("Installment: {merchant}"));

    let base = NaiveDate::parse_from_str(&txn.date, "%Y-%m-%d")
        .map_err(|_| PennyError::InvalidArgument(format!("bad transaction date '{}'", txn.date)))?;

    for i in 0..periods {
        let due = match first_due_date {
            Some(first) => first + Duration::days(INSTALLMENT_SPACING_DAYS * i as i64),
            None => base + Duration::days(INSTALLMENT_SPACING_DAYS * (i as i64 + 1)),
        };
        db.execute(
            "INSERT INTO fixed_costs (user_id, name, amount, category, kind, merchant_name, \
             account_id, next_due_date) VALUES (?1, ?2, ?3, 'Installment', 'large_expense_plan', ?4, ?5, ?6)",
            rusqlite::params![
                txn.user_id,
                cost_name,
                per_period,
                txn.merchant_name,
                txn.account_id,
                due.format("%Y-%m-%d").to_string(),
            ],
        )?;
    }
    Ok(())
}

/// Deposits awaiting a user decision, newest first.
pub fn pending_deposits(conn: &Connection, user_id: i64) -> Result<Vec<Txn>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, external_id, account_id, amount, date, name, merchant_name, pending, \
         suggested_kind, user_decision, counted_as_income, is_large_expense_candidate, \
         large_expense_handled FROM transactions \
         WHERE user_id = ?1 AND suggested_kind != 'unknown' AND user_decision = 'undecided' \
         ORDER BY date DESC",
    )?;
    let rows = stmt
        .query_map([user_id], map_txn_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Flagged large expenses not yet dispositioned, newest first.
pub fn pending_large_expenses(conn: &Connection, user_id: i64) -> Result<Vec<Txn>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, external_id, account_id, amount, date, name, merchant_name, pending, \
         suggested_kind, user_decision, counted_as_income, is_large_expense_candidate, \
         large_expense_handled FROM transactions \
         WHERE user_id = ?1 AND is_large_expense_candidate = 1 AND large_expense_handled = 0 \
         ORDER BY date DESC",
    )?;
    let rows = stmt
        .query_map([user_id], map_txn_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn seed_user(conn: &Connection, balance: f64) -> i64 {
        conn.execute(
            "INSERT INTO users (name, email, onboarding_complete) VALUES ('Alice', 'alice@example.com', 1)",
            [],
        )
        .unwrap();
        let user_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO balances (user_id, amount) VALUES (?1, ?2)",
            rusqlite::params![user_id, balance],
        )
        .unwrap();
        user_id
    }

    fn insert_deposit(conn: &Connection, user_id: i64, ext: &str, amount: f64) -> i64 {
        conn.execute(
            "INSERT INTO transactions (user_id, external_id, account_id, amount, date, name, \
             merchant_name, suggested_kind) VALUES (?1, ?2, 'acct', ?3, '2025-02-15', 'deposit', \
             'ACME PAYROLL', 'paycheck')",
            rusqlite::params![user_id, ext, amount],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn insert_large_expense(conn: &Connection, user_id: i64, ext: &str, amount: f64) -> i64 {
        conn.execute(
            "INSERT INTO transactions (user_id, external_id, account_id, amount, date, name, \
             merchant_name, is_large_expense_candidate) \
             VALUES (?1, ?2, 'acct', ?3, '2025-02-10', 'purchase', 'Electronics Hut', 1)",
            rusqlite::params![user_id, ext, amount],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn balance_of(conn: &Connection, user_id: i64) -> f64 {
        conn.query_row("SELECT amount FROM balances WHERE user_id = ?1", [user_id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn treat_as_income_counts_exactly_once() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 100.0);
        let tx_id = insert_deposit(&conn, user_id, "d1", 3000.0);

        let income = Decision::Deposit(DepositDecision::TreatAsIncome);
        let out = apply_decision(&mut conn, user_id, tx_id, &income).unwrap();
        assert!(out.counted_as_income);
        assert_eq!(balance_of(&conn, user_id), 3100.0);

        // Re-application adds nothing.
        apply_decision(&mut conn, user_id, tx_id, &income).unwrap();
        assert_eq!(balance_of(&conn, user_id), 3100.0);
    }

    #[test]
    fn changing_mind_subtracts_exactly_once() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 100.0);
        let tx_id = insert_deposit(&conn, user_id, "d1", 3000.0);

        apply_decision(&mut conn, user_id, tx_id, &Decision::Deposit(DepositDecision::TreatAsIncome))
            .unwrap();
        let ignore = Decision::Deposit(DepositDecision::IgnoreForDynamic);
        let out = apply_decision(&mut conn, user_id, tx_id, &ignore).unwrap();
        assert!(!out.counted_as_income);
        assert_eq!(balance_of(&conn, user_id), 100.0);

        apply_decision(&mut conn, user_id, tx_id, &ignore).unwrap();
        assert_eq!(balance_of(&conn, user_id), 100.0);
    }

    #[test]
    fn ignore_without_prior_count_changes_nothing() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 100.0);
        let tx_id = insert_deposit(&conn, user_id, "d1", 3000.0);

        apply_decision(&mut conn, user_id, tx_id, &Decision::Deposit(DepositDecision::SavingsFunded))
            .unwrap();
        assert_eq!(balance_of(&conn, user_id), 100.0);
        let decision: String = conn
            .query_row("SELECT user_decision FROM transactions WHERE id = ?1", [tx_id], |r| r.get(0))
            .unwrap();
        assert_eq!(decision, "savings_funded");
    }

    #[test]
    fn from_savings_refunds_exactly_once() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 500.0);
        let tx_id = insert_large_expense(&conn, user_id, "le1", 1200.0);

        let dec = Decision::LargeExpense(LargeExpenseDecision::FromSavings);
        apply_decision(&mut conn, user_id, tx_id, &dec).unwrap();
        assert_eq!(balance_of(&conn, user_id), 1700.0);

        apply_decision(&mut conn, user_id, tx_id, &dec).unwrap();
        assert_eq!(balance_of(&conn, user_id), 1700.0);

        let (candidate, handled): (bool, bool) = conn
            .query_row(
                "SELECT is_large_expense_candidate, large_expense_handled FROM transactions WHERE id = ?1",
                [tx_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert!(!candidate);
        assert!(handled);
    }

    #[test]
    fn treat_as_variable_spend_leaves_balance_alone() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 500.0);
        let tx_id = insert_large_expense(&conn, user_id, "le1", 1200.0);

        apply_decision(
            &mut conn,
            user_id,
            tx_id,
            &Decision::LargeExpense(LargeExpenseDecision::TreatAsVariableSpend),
        )
        .unwrap();
        assert_eq!(balance_of(&conn, user_id), 500.0);
    }

    #[test]
    fn installments_sum_to_purchase_and_space_biweekly() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let tx_id = insert_large_expense(&conn, user_id, "le1", 1000.0);

        apply_decision(
            &mut conn,
            user_id,
            tx_id,
            &Decision::LargeExpense(LargeExpenseDecision::ToFixedCost {
                periods: Some(3),
                per_period_amount: None,
                name: None,
                first_due_date: None,
            }),
        )
        .unwrap();

        // Refund landed.
        assert_eq!(balance_of(&conn, user_id), 1000.0);

        let rows: Vec<(f64, String)> = conn
            .prepare("SELECT amount, next_due_date FROM fixed_costs WHERE user_id = ?1 ORDER BY next_due_date")
            .unwrap()
            .query_map([user_id], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows.len(), 3);
        let total: f64 = rows.iter().map(|(a, _)| a).sum();
        assert!((total - 1000.0).abs() <= 0.02, "sum {total} drifts past rounding tolerance");
        // tx date 2025-02-10 + 14/28/42 days
        assert_eq!(rows[0].1, "2025-02-24");
        assert_eq!(rows[1].1, "2025-03-10");
        assert_eq!(rows[2].1, "2025-03-24");
    }

    #[test]
    fn installments_use_explicit_amount_and_first_due() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let tx_id = insert_large_expense(&conn, user_id, "le1", 900.0);

        apply_decision(
            &mut conn,
            user_id,
            tx_id,
            &Decision::LargeExpense(LargeExpenseDecision::ToFixedCost {
                periods: Some(2),
                per_period_amount: Some(400.0),
                name: Some("TV plan".into()),
                first_due_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            }),
        )
        .unwrap();

        let rows: Vec<(String, f64, String)> = conn
            .prepare("SELECT name, amount, next_due_date FROM fixed_costs ORDER BY next_due_date")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("TV plan".into(), 400.0, "2025-03-01".into()));
        assert_eq!(rows[1], ("TV plan".into(), 400.0, "2025-03-15".into()));
    }

    #[test]
    fn re_applying_to_fixed_cost_creates_no_duplicate_plan() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let tx_id = insert_large_expense(&conn, user_id, "le1", 1000.0);

        let dec = Decision::LargeExpense(LargeExpenseDecision::ToFixedCost {
            periods: Some(4),
            per_period_amount: None,
            name: None,
            first_due_date: None,
        });
        apply_decision(&mut conn, user_id, tx_id, &dec).unwrap();
        apply_decision(&mut conn, user_id, tx_id, &dec).unwrap();

        assert_eq!(balance_of(&conn, user_id), 1000.0);
        let count: i64 = conn
            .query_row("SELECT count(*) FROM fixed_costs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn zero_periods_is_invalid() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let tx_id = insert_large_expense(&conn, user_id, "le1", 1000.0);

        let err = apply_decision(
            &mut conn,
            user_id,
            tx_id,
            &Decision::LargeExpense(LargeExpenseDecision::ToFixedCost {
                periods: Some(0),
                per_period_amount: None,
                name: None,
                first_due_date: None,
            }),
        )
        .unwrap_err();
        assert!(matches!(err, PennyError::InvalidArgument(_)));
        assert_eq!(balance_of(&conn, user_id), 0.0);
    }

    #[test]
    fn deposit_decision_on_debit_is_rejected() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let tx_id = insert_large_expense(&conn, user_id, "le1", 1000.0);

        let err = apply_decision(
            &mut conn,
            user_id,
            tx_id,
            &Decision::Deposit(DepositDecision::TreatAsIncome),
        )
        .unwrap_err();
        assert!(matches!(err, PennyError::InvalidArgument(_)));
        assert_eq!(balance_of(&conn, user_id), 0.0);
    }

    #[test]
    fn large_expense_decision_on_deposit_is_rejected() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let tx_id = insert_deposit(&conn, user_id, "d1", 3000.0);

        let err = apply_decision(
            &mut conn,
            user_id,
            tx_id,
            &Decision::LargeExpense(LargeExpenseDecision::FromSavings),
        )
        .unwrap_err();
        assert!(matches!(err, PennyError::InvalidArgument(_)));
    }

    #[test]
    fn unflagged_debit_rejects_large_expense_decision() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        conn.execute(
            "INSERT INTO transactions (user_id, external_id, account_id, amount, date, name) \
             VALUES (?1, 'small', 'acct', 6.0, '2025-02-10', 'latte')",
            [user_id],
        )
        .unwrap();
        let tx_id = conn.last_insert_rowid();

        let err = apply_decision(
            &mut conn,
            user_id,
            tx_id,
            &Decision::LargeExpense(LargeExpenseDecision::FromSavings),
        )
        .unwrap_err();
        assert!(matches!(err, PennyError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_transaction_is_not_found() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let err = apply_decision(
            &mut conn,
            user_id,
            999,
            &Decision::Deposit(DepositDecision::TreatAsIncome),
        )
        .unwrap_err();
        assert!(matches!(err, PennyError::NotFound(_)));
    }

    #[test]
    fn someone_elses_transaction_reads_as_not_found() {
        let (_dir, mut conn) = test_db();
        let alice = seed_user(&conn, 0.0);
        conn.execute("INSERT INTO users (name, email) VALUES ('Bob', 'bob@example.com')", [])
            .unwrap();
        let bob = conn.last_insert_rowid();
        let tx_id = insert_deposit(&conn, alice, "d1", 3000.0);

        let err = apply_decision(
            &mut conn,
            bob,
            tx_id,
            &Decision::Deposit(DepositDecision::TreatAsIncome),
        )
        .unwrap_err();
        assert!(matches!(err, PennyError::NotFound(_)));
    }

    #[test]
    fn pending_queries_filter_and_order() {
        let (_dir, mut conn) = test_db();
        let user_id = seed_user(&conn, 0.0);
        let d1 = insert_deposit(&conn, user_id, "d1", 3000.0);
        insert_deposit(&conn, user_id, "d2", 500.0);
        insert_large_expense(&conn, user_id, "le1", 1200.0);

        assert_eq!(pending_deposits(&conn, user_id).unwrap().len(), 2);
        assert_eq!(pending_large_expenses(&conn, user_id).unwrap().len(), 1);

        apply_decision(&mut conn, user_id, d1, &Decision::Deposit(DepositDecision::TreatAsIncome))
            .unwrap();
        assert_eq!(pending_deposits(&conn, user_id).unwrap().len(), 1);
    }
}

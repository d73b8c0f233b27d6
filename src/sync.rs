use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};

use crate::classifier::{classify_deposit, is_large_expense, DepositContext};
use crate::error::{PennyError, Result};
use crate::models::{split_signed_amount, SuggestedKind, Txn};
use crate::notifier::Notifier;
use crate::provider::TransactionSource;

/// Records fetched per sync call.
pub const PAGE_SIZE: usize = 100;

#[derive(Debug)]
pub struct SyncOutcome {
    pub added: usize,
    pub has_more: bool,
    pub balance: Option<f64>,
}

struct ItemRow {
    user_id: i64,
    access_token: String,
    cursor: Option<String>,
}

struct UserConfig {
    pay_day_1: u32,
    pay_day_2: u32,
    expected_paycheck_amount: f64,
}

/// Pull one page of new records for an item, classify and store them, and
/// debit the owning user's balance by the period's variable spend. New rows,
/// the cursor advance, and the balance delta commit together or not at all.
pub fn sync_item<S: TransactionSource, N: Notifier>(
    conn: &mut Connection,
    source: &S,
    notifier: &N,
    item_id: &str,
) -> Result<SyncOutcome> {
    let item = conn
        .query_row(
            "SELECT user_id, access_token, cursor FROM items WHERE item_id = ?1",
            [item_id],
            |row| {
                Ok(ItemRow {
                    user_id: row.get(0)?,
                    access_token: row.get(1)?,
                    cursor: row.get(2)?,
                })
            },
        )
        .map_err(|_| PennyError::NotFound(format!("item {item_id}")))?;

    let user = conn
        .query_row(
            "SELECT pay_day_1, pay_day_2, expected_paycheck_amount FROM users WHERE id = ?1",
            [item.user_id],
            |row| {
                Ok(UserConfig {
                    pay_day_1: row.get(0)?,
                    pay_day_2: row.get(1)?,
                    expected_paycheck_amount: row.get(2)?,
                })
            },
        )
        .map_err(|_| PennyError::Unauthorized("user linked to this item not found".into()))?;

    let fixed_merchants: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT merchant_name FROM fixed_costs WHERE user_id = ?1 AND merchant_name IS NOT NULL",
        )?;
        let rows = stmt
            .query_map([item.user_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    // Upstream failure aborts before any write.
    let page = source.fetch_new(&item.access_token, item.cursor.as_deref(), PAGE_SIZE)?;

    let mut variable_spend = 0.0_f64;
    let mut added = 0usize;
    let mut inserted_ids: Vec<i64> = Vec::new();

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    for rec in &page.added {
        // Idempotent ingestion: a re-delivered record adds nothing.
        let exists: bool = tx
            .prepare_cached("SELECT 1 FROM transactions WHERE external_id = ?1")?
            .exists([&rec.external_id])?;
        if exists {
            continue;
        }

        let (is_credit, abs_amount) = split_signed_amount(rec.amount);
        let merchant = rec.merchant_name.as_deref().unwrap_or(&rec.name);

        let mut suggested_kind = SuggestedKind::Unknown;
        let mut large_candidate = false;

        if is_credit {
            // Deposits are classified but never touch the balance here; that
            // takes an explicit user decision later.
            let date = NaiveDate::parse_from_str(&rec.date, "%Y-%m-%d").map_err(|_| {
                PennyError::Upstream(format!("bad date '{}' on {}", rec.date, rec.external_id))
            })?;
            suggested_kind = classify_deposit(&DepositContext {
                amount: abs_amount,
                date,
                merchant_name: Some(merchant),
                pay_day_1: user.pay_day_1,
                pay_day_2: user.pay_day_2,
                expected_paycheck_amount: user.expected_paycheck_amount,
            });
        } else {
            let matches_fixed = fixed_merchants
                .iter()
                .any(|m| m.eq_ignore_ascii_case(merchant));
            if matches_fixed {
                // Known recurring bill, already accounted for in period
                // proration: the row is still stored (so re-delivery stays
                // idempotent) but it never debits the balance or gets
                // flagged.
            } else {
                variable_spend += abs_amount;
                if user.expected_paycheck_amount > 0.0
                    && is_large_expense(abs_amount, user.expected_paycheck_amount)
                {
                    // Flag for disposition; the debit still lands this period
                    // and is only refunded by a later explicit decision.
                    large_candidate = true;
                }
            }
        }

        tx.execute(
            "INSERT INTO transactions (user_id, external_id, account_id, amount, date, name, \
             merchant_name, pending, suggested_kind, is_large_expense_candidate) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                item.user_id,
                rec.external_id,
                rec.account_id,
                abs_amount,
                rec.date,
                rec.name,
                rec.merchant_name,
                rec.pending,
                suggested_kind.code(),
                large_candidate,
            ],
        )?;
        inserted_ids.push(tx.last_insert_rowid());
        added += 1;
    }

    // One balance update per sync call, not per transaction. No balance row
    // (pre-onboarding) means no debit, matching the rest of the engine.
    if variable_spend > 0.0 {
        tx.execute(
            "UPDATE balances SET amount = amount - ?1, updated_at = datetime('now') WHERE user_id = ?2",
            rusqlite::params![variable_spend, item.user_id],
        )?;
    }

    tx.execute(
        "UPDATE items SET cursor = ?1, updated_at = datetime('now') WHERE item_id = ?2",
        rusqlite::params![page.next_cursor, item_id],
    )?;

    tx.commit()?;

    let balance: Option<f64> = conn
        .query_row(
            "SELECT amount FROM balances WHERE user_id = ?1",
            [item.user_id],
            |row| row.get(0),
        )
        .ok();

    // Best-effort notifications for posted rows; failures never fail the
    // sync. Pre-onboarding (no balance row) the message reports 0.
    let remaining = balance.unwrap_or(0.0);
    for tx_id in &inserted_ids {
        let row = get_txn(conn, *tx_id)?;
        if row.pending {
            continue;
        }
        if let Err(e) = notifier.notify_transaction(&row, remaining) {
            eprintln!("notification failed for {}: {e}", row.external_id);
        }
    }

    Ok(SyncOutcome {
        added,
        has_more: page.has_more,
        balance,
    })
}

pub fn get_txn(conn: &Connection, id: i64) -> Result<Txn> {
    conn.query_row(
        "SELECT id, user_id, external_id, account_id, amount, date, name, merchant_name, pending, \
         suggested_kind, user_decision, counted_as_income, is_large_expense_candidate, \
         large_expense_handled FROM transactions WHERE id = ?1",
        [id],
        map_txn_row,
    )
    .map_err(|_| PennyError::NotFound(format!("transaction {id}")))
}

pub fn map_txn_row(row: &rusqlite::Row) -> rusqlite::Result<Txn> {
    Ok(Txn {
        id: row.get(0)?,
        user_id: row.get(1)?,
        external_id: row.get(2)?,
        account_id: row.get(3)?,
        amount: row.get(4)?,
        date: row.get(5)?,
        name: row.get(6)?,
        merchant_name: row.get(7)?,
        pending: row.get(8)?,
        suggested_kind: crate::models::SuggestedKind::from_code(&row.get::<_, String>(9)?),
        user_decision: row.get(10)?,
        counted_as_income: row.get(11)?,
        is_large_expense_candidate: row.get(12)?,
        large_expense_handled: row.get(13)?,
    })
}

pub mod balance;
pub mod demo;
pub mod deposits;
pub mod expenses;
pub mod fixed_costs;
pub mod init;
pub mod link;
pub mod onboard;
pub mod status;
pub mod sync;
pub mod transactions;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::error::{PennyError, Result};
use crate::settings::load_settings;

/// Resolve the user configured in settings.json. Every command that touches
/// the ledger scopes its queries to this user.
pub(crate) fn current_user(conn: &Connection) -> Result<i64> {
    let settings = load_settings();
    if settings.user_email.is_empty() {
        return Err(PennyError::Settings(
            "no user configured; run `penny init` first".to_string(),
        ));
    }
    conn.query_row(
        "SELECT id FROM users WHERE email = ?1",
        [&settings.user_email],
        |r| r.get(0),
    )
    .map_err(|_| PennyError::NotFound(format!("user {}", settings.user_email)))
}

#[derive(Parser)]
#[command(name = "penny", about = "Pay-cycle budget tracker with a dynamic spendable balance.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Penny: choose a data directory, initialize the database, create your user.
    Init {
        /// Your name
        #[arg(long)]
        name: String,
        /// Your email (identifies your ledger)
        #[arg(long)]
        email: String,
        /// Path for Penny data (default: ~/Documents/penny)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Link a transaction feed so `penny sync` can pull from it.
    Link {
        /// Identifier for the linked feed, e.g. 'bofa-checking'
        item_id: String,
        /// Path to the JSON feed file
        #[arg(long)]
        feed: String,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
    },
    /// Pull new transactions from linked feeds and update the balance.
    Sync {
        /// Sync only this feed (default: all linked feeds)
        #[arg(long)]
        item: Option<String>,
    },
    /// Declare your pay schedule and seed the dynamic balance for this cycle.
    Onboard {
        /// Net paycheck amount
        #[arg(long)]
        paycheck: f64,
        /// First pay day of the month (1-31)
        #[arg(long = "pay-day-1")]
        pay_day_1: u32,
        /// Second pay day of the month (1-31)
        #[arg(long = "pay-day-2")]
        pay_day_2: u32,
        /// Next paycheck date: YYYY-MM-DD
        #[arg(long = "next-paycheck")]
        next_paycheck: String,
        /// Debt payment reserved per paycheck
        #[arg(long)]
        debt: Option<f64>,
    },
    /// Review deposits waiting for a decision.
    Deposits {
        #[command(subcommand)]
        command: DepositsCommands,
    },
    /// Review flagged large expenses.
    Expenses {
        #[command(subcommand)]
        command: ExpensesCommands,
    },
    /// Manage recurring fixed costs.
    FixedCosts {
        #[command(subcommand)]
        command: FixedCostsCommands,
    },
    /// Show or set the spendable balance.
    Balance {
        #[command(subcommand)]
        command: BalanceCommands,
    },
    /// List synced transactions.
    Transactions {
        /// Month filter: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
    /// Load sample data (user, fixed costs, a demo feed) to explore Penny.
    Demo,
}

#[derive(Subcommand)]
pub enum DepositsCommands {
    /// List deposits that have not been decided yet.
    List,
    /// Record a decision for a deposit.
    Decide {
        /// Transaction ID (shown in `penny deposits list`)
        id: i64,
        /// Decision: income, ignore, debt, savings
        decision: String,
    },
}

#[derive(Subcommand)]
pub enum ExpensesCommands {
    /// List large expenses that have not been decided yet.
    List,
    /// Record a decision for a large expense.
    Decide {
        /// Transaction ID (shown in `penny expenses list`)
        id: i64,
        /// Decision: spend, savings, installments
        decision: String,
        /// Number of installments (installments only)
        #[arg(long)]
        periods: Option<u32>,
        /// Name for the installment plan
        #[arg(long)]
        name: Option<String>,
        /// Per-installment amount (default: total / periods)
        #[arg(long)]
        amount: Option<f64>,
        /// First due date: YYYY-MM-DD
        #[arg(long = "first-due")]
        first_due: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FixedCostsCommands {
    /// Add a recurring fixed cost.
    Add {
        /// Cost name, e.g. 'Rent'
        name: String,
        /// Amount per period
        #[arg(long)]
        amount: f64,
        /// Category, e.g. 'Housing' or 'Savings'
        #[arg(long, default_value = "other")]
        category: String,
        /// Merchant name to match during sync
        #[arg(long)]
        merchant: Option<String>,
        /// Next due date: YYYY-MM-DD
        #[arg(long = "due")]
        next_due: Option<String>,
    },
    /// List fixed costs.
    List,
    /// Delete a fixed cost by ID.
    Delete {
        /// Fixed cost ID (shown in `penny fixed-costs list`)
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Show the current spendable balance.
    Show,
    /// Overwrite the spendable balance.
    Set {
        /// New balance amount
        amount: f64,
    },
}

pub(crate) fn parse_date(s: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| PennyError::InvalidArgument(format!("invalid date: {s} (expected YYYY-MM-DD)")))
}

mod classifier;
mod cli;
mod db;
mod decisions;
mod error;
mod fmt;
mod models;
mod notifier;
mod period;
mod provider;
mod settings;
mod sync;

use clap::Parser;

use cli::{BalanceCommands, Cli, Commands, DepositsCommands, ExpensesCommands, FixedCostsCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { name, email, data_dir } => cli::init::run(&name, &email, data_dir),
        Commands::Link { item_id, feed, institution } => {
            cli::link::run(&item_id, &feed, institution.as_deref())
        }
        Commands::Sync { item } => cli::sync::run(item.as_deref()),
        Commands::Onboard {
            paycheck,
            pay_day_1,
            pay_day_2,
            next_paycheck,
            debt,
        } => cli::onboard::run(paycheck, pay_day_1, pay_day_2, &next_paycheck, debt),
        Commands::Deposits { command } => match command {
            DepositsCommands::List => cli::deposits::list(),
            DepositsCommands::Decide { id, decision } => cli::deposits::decide(id, &decision),
        },
        Commands::Expenses { command } => match command {
            ExpensesCommands::List => cli::expenses::list(),
            ExpensesCommands::Decide {
                id,
                decision,
                periods,
                name,
                amount,
                first_due,
            } => cli::expenses::decide(id, &decision, periods, name, amount, first_due.as_deref()),
        },
        Commands::FixedCosts { command } => match command {
            FixedCostsCommands::Add {
                name,
                amount,
                category,
                merchant,
                next_due,
            } => cli::fixed_costs::add(&name, amount, &category, merchant.as_deref(), next_due.as_deref()),
            FixedCostsCommands::List => cli::fixed_costs::list(),
            FixedCostsCommands::Delete { id } => cli::fixed_costs::delete(id),
        },
        Commands::Balance { command } => match command {
            BalanceCommands::Show => cli::balance::show(),
            BalanceCommands::Set { amount } => cli::balance::set(amount),
        },
        Commands::Transactions { month } => cli::transactions::run(month.as_deref()),
        Commands::Status => cli::status::run(),
        Commands::Demo => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

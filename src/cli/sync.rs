use colored::Colorize;

use crate::db::get_connection;
use crate::error::{PennyError, Result};
use crate::fmt::money;
use crate::notifier::ConsoleNotifier;
use crate::provider::FeedSource;
use crate::settings::get_data_dir;
use crate::sync::sync_item;

pub fn run(item: Option<&str>) -> Result<()> {
    let mut conn = get_connection(&get_data_dir().join("penny.db"))?;

    let item_ids: Vec<String> = match item {
        Some(id) => vec![id.to_string()],
        None => {
            let mut stmt = conn.prepare("SELECT item_id FROM items ORDER BY item_id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids
        }
    };
    if item_ids.is_empty() {
        return Err(PennyError::NotFound(
            "no linked feeds; run `penny link` first".to_string(),
        ));
    }

    let source = FeedSource;
    let notifier = ConsoleNotifier;
    for item_id in &item_ids {
        loop {
            let outcome = sync_item(&mut conn, &source, &notifier, item_id)?;
            println!(
                "{}: {} new transaction{}",
                item_id.bold(),
                outcome.added,
                if outcome.added == 1 { "" } else { "s" }
            );
            if let Some(balance) = outcome.balance {
                println!("  Spendable balance: {}", money(balance));
            }
            if !outcome.has_more {
                break;
            }
        }
    }
    Ok(())
}

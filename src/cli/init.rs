use std::path::PathBuf;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(name: &str, email: &str, data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    settings.user_email = email.to_string();

    let dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join("penny.db");
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    conn.execute(
        "INSERT INTO users (name, email) VALUES (?1, ?2) \
         ON CONFLICT(email) DO UPDATE SET name = excluded.name, updated_at = datetime('now')",
        rusqlite::params![name, email],
    )?;

    save_settings(&settings)?;

    println!("{}", "Penny is ready.".green());
    println!("  Data dir:  {}", dir.display());
    println!("  Database:  {}", db_path.display());
    println!("  User:      {name} <{email}>");
    println!();
    println!("Next steps:");
    println!("  penny fixed-costs add Rent --amount 1200 --due 2026-09-01");
    println!("  penny onboard --paycheck 3000 --pay-day-1 1 --pay-day-2 15 --next-paycheck 2026-09-15");
    println!("  penny link my-bank --feed ~/Downloads/feed.json");
    Ok(())
}

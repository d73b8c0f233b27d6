use crate::cli::current_user;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{get_data_dir, shellexpand_path};

pub fn run(item_id: &str, feed: &str, institution: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("penny.db"))?;
    let user_id = current_user(&conn)?;
    let feed_path = shellexpand_path(feed);

    conn.execute(
        "INSERT INTO items (user_id, item_id, access_token, institution) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(item_id) DO UPDATE SET access_token = excluded.access_token, \
         institution = excluded.institution, updated_at = datetime('now')",
        rusqlite::params![user_id, item_id, feed_path, institution],
    )?;

    println!("Linked feed '{item_id}' -> {feed_path}");
    println!("Run `penny sync` to pull transactions.");
    Ok(())
}

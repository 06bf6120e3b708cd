pub mod market;
pub mod migrations;
pub mod queries;

use std::path::Path;

use anyhow::Context;
use rusqlite::Connection;

/// Opens a SQLite database and applies every `.sql` file in `migrations_dir`.
pub fn init_db(path: &str, migrations_dir: impl AsRef<Path>) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn, migrations_dir.as_ref())?;

    Ok(conn)
}

/// Studio database: accounts, sessions, subscriptions, payment notifications.
pub fn init_studio_db(path: &str, migrations_root: &str) -> anyhow::Result<Connection> {
    init_db(path, Path::new(migrations_root).join("studio"))
}

/// Market database: products and invoices.
pub fn init_market_db(path: &str, migrations_root: &str) -> anyhow::Result<Connection> {
    init_db(path, Path::new(migrations_root).join("market"))
}

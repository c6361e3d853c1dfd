// src/db/mod.rs

//! SQLite persistence for templates and machines

pub mod models;
pub mod schema;
mod store;

pub use store::SqliteStore;

use crate::error::Result;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::{debug, info};

/// Create the database file (and parent directory) and apply the schema
pub fn init(db_path: &str) -> Result<()> {
    info!("Initializing database at: {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = open(db_path)?;
    schema::migrate(&conn)?;
    Ok(())
}

/// Open a database connection, migrating the schema if needed
pub fn open(db_path: &str) -> Result<Connection> {
    debug!("Opening database: {}", db_path);
    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Open a private in-memory database
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// Run `f` inside a transaction, committing on success
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

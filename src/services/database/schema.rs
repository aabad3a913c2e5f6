use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_schedules_table(conn)?;
    run_schedules_migrations(conn)?;
    Ok(())
}

fn create_schedules_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedules (
            id TEXT PRIMARY KEY,
            schedule TEXT NOT NULL,
            entities TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create schedules table")?;

    Ok(())
}

fn run_schedules_migrations(conn: &Connection) -> Result<()> {
    // Early stores kept the device list outside the schedule record.
    migrations::ensure_column(conn, "schedules", "entities", "TEXT NOT NULL DEFAULT '[]'")?;

    Ok(())
}

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Whether `table` already has `column`.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            params![table, column],
            |row| row.get(0),
        )
        .with_context(|| format!("Failed to inspect columns of {}", table))?;

    Ok(count > 0)
}

/// Add `column` with the given SQL definition unless the table has it.
/// Returns whether the column was added.
pub fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<bool> {
    if column_exists(conn, table, column)? {
        return Ok(false);
    }

    log::info!("Migrating {}: adding column {}", table, column);
    conn.execute(
        &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition),
        [],
    )
    .with_context(|| format!("Failed to add {}.{}", table, column))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schedules (id TEXT PRIMARY KEY, schedule TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_column_exists() {
        let conn = legacy_table();
        assert!(column_exists(&conn, "schedules", "schedule").unwrap());
        assert!(!column_exists(&conn, "schedules", "entities").unwrap());
        assert!(!column_exists(&conn, "missing_table", "id").unwrap());
    }

    #[test]
    fn test_ensure_column_adds_once_with_default() {
        let conn = legacy_table();
        conn.execute(
            "INSERT INTO schedules (id, schedule) VALUES ('living', '[]')",
            [],
        )
        .unwrap();

        let definition = "TEXT NOT NULL DEFAULT '[]'";
        assert!(ensure_column(&conn, "schedules", "entities", definition).unwrap());
        assert!(!ensure_column(&conn, "schedules", "entities", definition).unwrap());

        let entities: String = conn
            .query_row("SELECT entities FROM schedules WHERE id = 'living'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(entities, "[]");
    }
}

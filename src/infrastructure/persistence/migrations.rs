use rusqlite::Connection;

/// Initialize the database schema, creating tables if they don't exist.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS samples (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at  TEXT    NOT NULL,
            device_id    TEXT    NOT NULL,
            channel      TEXT    NOT NULL,
            label        TEXT    NOT NULL,
            voltage      REAL,
            resistance   REAL,
            temperature  REAL
        );

        CREATE INDEX IF NOT EXISTS idx_samples_device_time ON samples(device_id, recorded_at);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[allow(clippy::expect_used)]
    #[test]
    fn initialize_schema_creates_samples_table() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert!(initialize_schema(&conn).is_ok());

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='samples'",
                [],
                |row| row.get(0),
            )
            .expect("query sqlite_master");
        assert_eq!(count, 1);
    }

    #[allow(clippy::expect_used)]
    #[test]
    fn initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert!(initialize_schema(&conn).is_ok());
        assert!(initialize_schema(&conn).is_ok());
    }
}

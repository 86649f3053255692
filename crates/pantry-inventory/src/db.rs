use rusqlite::Connection;

use crate::error::Result;

/// Open a connection with the pragmas every inventory connection needs.
pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Initialise the inventory schema.
///
/// Safe to call on every startup, uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS foods (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT    NOT NULL,
            category_id     INTEGER NOT NULL REFERENCES categories(id),
            admission_date  TEXT    NOT NULL   -- YYYY-MM-DD
        );

        -- Expiry window scans: WHERE admission_date BETWEEN ? AND ?
        CREATE INDEX IF NOT EXISTS idx_foods_admission_date
            ON foods(admission_date);",
    )?;
    Ok(())
}

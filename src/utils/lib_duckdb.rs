use std::path::Path;

use duckdb::{params, Connection};

use crate::error::SyncError;

/// Open a DuckDB file, creating the parent directory if needed.
pub fn open(duckdb_path: &Path) -> Result<Connection, SyncError> {
    if let Some(dir) = duckdb_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(Connection::open(duckdb_path)?)
}

/// Check the catalog for a table in the current schema.  Table names are
/// compared case-insensitively, same as DuckDB resolves identifiers.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, duckdb::Error> {
    let n: i64 = conn.query_row(
        r"
SELECT COUNT(*) FROM information_schema.tables
WHERE table_schema = current_schema()
    AND lower(table_name) = lower(?);",
        params![table],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

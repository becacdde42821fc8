//! Persistence of the last applied dump marker.
//!
//! The marker lives in a single table, `SDE_HASH(hash)`, holding at most one
//! row.  A missing table means nothing has been loaded yet and reads as an
//! empty marker.  Any other failure is reported.

use std::path::Path;

use duckdb::{params, Connection};
use log::info;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
    MySqlPool,
};
use tokio::runtime::{Builder, Runtime};

use crate::{config::DbConfig, error::SyncError, utils::lib_duckdb};

pub const MARKER_TABLE: &str = "SDE_HASH";

// Exact name match: MySQL table names are case sensitive on most Linux
// servers, and the queries below name `SDE_HASH` as written.
const MYSQL_TABLE_EXISTS: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = ?";

pub trait MarkerStore {
    /// The last stored marker, or `""` if none was ever written.
    fn read_marker(&mut self) -> Result<String, SyncError>;

    /// Replace the stored marker.  Exactly one row remains on success.
    fn write_marker(&mut self, marker: &str) -> Result<(), SyncError>;
}

/// Marker kept in the target MySQL database, next to the loaded dump.
pub struct MysqlMarkerStore {
    pool: MySqlPool,
    rt: Runtime,
}

impl MysqlMarkerStore {
    /// Connects lazily: nothing touches the server until the first query.
    pub fn connect(db: &DbConfig) -> Result<Self, SyncError> {
        let rt = Builder::new_current_thread().enable_all().build()?;
        let options = MySqlConnectOptions::new()
            .host(&db.address)
            .port(db.port)
            .username(&db.user)
            .password(db.password())
            .database(&db.database);
        let pool = {
            let _guard = rt.enter();
            MySqlPoolOptions::new()
                .max_connections(1)
                .connect_lazy_with(options)
        };
        info!(
            "marker store: mysql {}:{}/{}",
            db.address, db.port, db.database
        );
        Ok(MysqlMarkerStore { pool, rt })
    }
}

impl MarkerStore for MysqlMarkerStore {
    fn read_marker(&mut self) -> Result<String, SyncError> {
        self.rt.block_on(read_mysql_marker(&self.pool))
    }

    fn write_marker(&mut self, marker: &str) -> Result<(), SyncError> {
        self.rt.block_on(write_mysql_marker(&self.pool, marker))
    }
}

async fn read_mysql_marker(pool: &MySqlPool) -> Result<String, SyncError> {
    let n: i64 = sqlx::query_scalar(MYSQL_TABLE_EXISTS)
    .bind(MARKER_TABLE)
    .fetch_one(pool)
    .await?;
    if n == 0 {
        return Ok(String::new());
    }
    let hash: Option<Option<String>> = sqlx::query_scalar("SELECT hash FROM SDE_HASH LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(hash.flatten().unwrap_or_default())
}

async fn write_mysql_marker(pool: &MySqlPool, marker: &str) -> Result<(), SyncError> {
    // DDL commits implicitly in MySQL, keep it out of the transaction
    sqlx::query("CREATE TABLE IF NOT EXISTS SDE_HASH (hash VARCHAR(255))")
        .execute(pool)
        .await?;
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM SDE_HASH").execute(&mut *tx).await?;
    sqlx::query("INSERT INTO SDE_HASH (hash) VALUES (?)")
        .bind(marker)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Marker kept in a DuckDB file, for targets where the loader account may
/// not create tables.
pub struct DuckDbMarkerStore {
    conn: Connection,
}

impl DuckDbMarkerStore {
    pub fn open(duckdb_path: &Path) -> Result<Self, SyncError> {
        info!("marker store: duckdb {}", duckdb_path.display());
        Ok(DuckDbMarkerStore {
            conn: lib_duckdb::open(duckdb_path)?,
        })
    }

    pub fn in_memory() -> Result<Self, SyncError> {
        Ok(DuckDbMarkerStore {
            conn: Connection::open_in_memory()?,
        })
    }
}

impl MarkerStore for DuckDbMarkerStore {
    fn read_marker(&mut self) -> Result<String, SyncError> {
        if !lib_duckdb::table_exists(&self.conn, MARKER_TABLE)? {
            return Ok(String::new());
        }
        let mut stmt = self.conn.prepare("SELECT hash FROM SDE_HASH LIMIT 1;")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let hash: Option<String> = row.get(0)?;
                Ok(hash.unwrap_or_default())
            }
            None => Ok(String::new()),
        }
    }

    fn write_marker(&mut self, marker: &str) -> Result<(), SyncError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            r"
CREATE TABLE IF NOT EXISTS SDE_HASH (hash VARCHAR(255));
DELETE FROM SDE_HASH;",
        )?;
        tx.execute("INSERT INTO SDE_HASH (hash) VALUES (?);", params![marker])?;
        tx.commit()?;
        Ok(())
    }
}

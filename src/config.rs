//! Settings for one synchronization run, read from environment variables
//! (optionally seeded from a `.env/<name>.env` file by the binary).

use std::{env, path::PathBuf, time::Duration};

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_CHECKSUM_URL: &str = "https://www.fuzzwork.co.uk/dump/mysql-latest.tar.bz2.md5";
pub const DEFAULT_DUMP_URL: &str = "https://www.fuzzwork.co.uk/dump/mysql-latest.tar.bz2";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Connection parameters of the target MySQL database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub address: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub database: String,
}

impl DbConfig {
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub db: DbConfig,
    pub checksum_url: String,
    pub dump_url: String,
    /// Directory receiving the compressed and decompressed dump files.
    pub work_dir: PathBuf,
    /// Path or name of the mysql client executable.
    pub mysql_bin: String,
    pub http_timeout: Duration,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.  Missing keys get
    /// their defaults, and so do numeric values that fail to parse.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = lookup("DB_PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_MYSQL_PORT);
        let timeout_secs = lookup("HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(30);

        SyncConfig {
            db: DbConfig {
                address: get("DB_ADDR", "127.0.0.1"),
                port,
                user: get("DB_USER", "root"),
                password: SecretString::new(get("DB_PASS", "password")),
                database: get("DB_DATABASE", "sde"),
            },
            checksum_url: get("SDE_CHECKSUM_URL", DEFAULT_CHECKSUM_URL),
            dump_url: get("SDE_DUMP_URL", DEFAULT_DUMP_URL),
            work_dir: PathBuf::from(get("SDE_WORK_DIR", ".")),
            mysql_bin: get("MYSQL_BIN", "mysql"),
            http_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

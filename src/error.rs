use std::process::ExitStatus;

use thiserror::Error;

/// Everything that can abort a synchronization run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote fetch failed: transport error, non-success status or an
    /// unusable response body.
    #[error("network error: {0}")]
    Network(String),

    /// Local file read/write failure, including corrupt compressed input.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Marker store query or schema failure.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("{program} {}: {stderr}", describe_status(.status))]
    ExternalProcess {
        program: String,
        status: Option<ExitStatus>,
        stderr: String,
    },
}

fn describe_status(status: &Option<ExitStatus>) -> String {
    match status {
        Some(s) => match s.code() {
            Some(code) => format!("exited with code {}", code),
            None => "was terminated by a signal".to_string(),
        },
        None => "could not be started".to_string(),
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}

impl From<duckdb::Error> for SyncError {
    fn from(e: duckdb::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}

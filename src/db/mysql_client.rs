use std::{
    fs::File,
    path::Path,
    process::{Command, Stdio},
};

use log::{error, info};

use crate::{config::DbConfig, error::SyncError, pipeline::DumpLoader};

/// Loads a SQL file by piping it into the `mysql` command line client.
///
/// The password is handed over through `MYSQL_PWD` so it never shows up in
/// the argument list or in the logs.
pub struct MysqlClient {
    pub program: String,
    pub db: DbConfig,
}

impl MysqlClient {
    pub fn new(program: &str, db: &DbConfig) -> Self {
        MysqlClient {
            program: program.to_string(),
            db: db.clone(),
        }
    }

    /// Client arguments, without the password.  `--force` keeps going past
    /// failing statements, `--binary-mode` accepts the raw dump content.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.db.address.clone(),
            "-P".to_string(),
            self.db.port.to_string(),
            "-u".to_string(),
            self.db.user.clone(),
            "--binary-mode".to_string(),
            "--force".to_string(),
            self.db.database.clone(),
        ]
    }

    /// Printable form of the invocation, safe to log.
    pub fn display_command(&self, dump: &Path) -> String {
        format!(
            "MYSQL_PWD=**** {} {} < {}",
            self.program,
            self.args().join(" "),
            dump.display()
        )
    }
}

impl DumpLoader for MysqlClient {
    fn load(&self, dump: &Path) -> Result<(), SyncError> {
        let input = File::open(dump)?;
        info!("Executing command: {}", self.display_command(dump));

        let output = Command::new(&self.program)
            .args(self.args())
            .env("MYSQL_PWD", self.db.password())
            .stdin(Stdio::from(input))
            .output()
            .map_err(|e| SyncError::ExternalProcess {
                program: self.program.clone(),
                status: None,
                stderr: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() {
            if !stdout.trim().is_empty() {
                info!("{}", stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                info!("{}", stderr.trim_end());
            }
            info!("done");
            Ok(())
        } else {
            error!("Failed to load {}: {}", dump.display(), stderr.trim_end());
            Err(SyncError::ExternalProcess {
                program: self.program.clone(),
                status: Some(output.status),
                stderr: stderr.trim_end().to_string(),
            })
        }
    }
}

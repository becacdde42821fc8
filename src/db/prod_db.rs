use std::path::Path;

use crate::{config::SyncConfig, error::SyncError};

use super::{
    fuzzwork::sde_archive::SdeArchive,
    marker_store::{DuckDbMarkerStore, MarkerStore, MysqlMarkerStore},
    mysql_client::MysqlClient,
};

/// Production wiring of the pieces of a run.
pub struct ProdDb {}

impl ProdDb {
    pub fn sde_archive(config: &SyncConfig) -> Result<SdeArchive, SyncError> {
        SdeArchive::new(config)
    }

    pub fn mysql_client(config: &SyncConfig) -> MysqlClient {
        MysqlClient::new(&config.mysql_bin, &config.db)
    }

    /// The marker goes in the target database unless a DuckDB file is given.
    pub fn marker_store(
        config: &SyncConfig,
        duckdb_path: Option<&Path>,
    ) -> Result<Box<dyn MarkerStore>, SyncError> {
        match duckdb_path {
            Some(path) => Ok(Box::new(DuckDbMarkerStore::open(path)?)),
            None => Ok(Box::new(MysqlMarkerStore::connect(&config.db)?)),
        }
    }
}

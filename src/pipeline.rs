//! The synchronization run: compare markers, and on a change fetch,
//! decompress, load and record the new marker.
//!
//! Any failing stage aborts the run.  The stored marker is only written
//! after the loader reports success.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::{
    db::{
        fuzzwork::sde_archive::{decompress_with_logging, DumpFiles},
        marker_store::MarkerStore,
    },
    error::SyncError,
};

/// Where the dump comes from.
pub trait DumpSource {
    /// Marker identifying the latest published dump.
    fn latest_marker(&self) -> Result<String, SyncError>;

    /// Save the compressed dump at `dest`, returning the bytes written.
    fn download(&self, dest: &Path) -> Result<u64, SyncError>;
}

/// Applies a decompressed SQL dump to the target database.
pub trait DumpLoader {
    fn load(&self, dump: &Path) -> Result<(), SyncError>;
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub work_dir: PathBuf,
    /// Reload even when the stored marker matches the remote one.
    pub force: bool,
    /// Keep the temporary files after a successful run.
    pub keep_files: bool,
}

impl RunOptions {
    pub fn new(work_dir: &Path) -> Self {
        RunOptions {
            work_dir: work_dir.to_path_buf(),
            force: false,
            keep_files: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    UpToDate {
        marker: String,
    },
    Updated {
        marker: String,
        downloaded: u64,
        decompressed: u64,
    },
}

pub fn is_up_to_date(remote: &str, stored: &str) -> bool {
    remote == stored
}

pub fn run<S, M, L>(
    source: &S,
    store: &mut M,
    loader: &L,
    options: &RunOptions,
) -> Result<Outcome, SyncError>
where
    S: DumpSource + ?Sized,
    M: MarkerStore + ?Sized,
    L: DumpLoader + ?Sized,
{
    info!("Getting hash from fuzzwork");
    let remote = source.latest_marker()?;
    info!("Fuzzwork returned hash: {}", remote);

    let stored = store.read_marker()?;
    info!("Stored hash: {}", stored);

    if is_up_to_date(&remote, &stored) {
        if !options.force {
            info!("SDE is already up to date");
            return Ok(Outcome::UpToDate { marker: stored });
        }
        info!("SDE is up to date, reloading anyway");
    }

    let files = DumpFiles::in_dir(&options.work_dir);

    info!("Downloading SDE dump to {}", files.compressed.display());
    let downloaded = source.download(&files.compressed)?;
    info!("Downloaded {} bytes", downloaded);

    info!("Decompressing dump to {}", files.plain.display());
    let decompressed = decompress_with_logging(&files.compressed, &files.plain)?;
    info!("Wrote {} bytes to uncompressed file", decompressed);

    info!("Executing mysql to load file into database");
    loader.load(&files.plain)?;

    store.write_marker(&remote)?;
    info!("Stored hash updated to {}", remote);

    if !options.keep_files {
        if let Err(e) = files.remove() {
            warn!("could not remove temporary files: {}", e);
        }
    }

    Ok(Outcome::Updated {
        marker: remote,
        downloaded,
        decompressed,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        error::Error,
        fs::{self, File},
        io::Write,
    };

    use bzip2::{write::BzEncoder, Compression};

    use crate::db::marker_store::DuckDbMarkerStore;

    use super::*;

    const SQL: &str = "CREATE TABLE invTypes (typeID INT);\nINSERT INTO invTypes VALUES (34);\n";

    struct FakeSource {
        marker: String,
        downloads: Cell<u32>,
        fail_download: bool,
    }

    impl FakeSource {
        fn new(marker: &str) -> Self {
            FakeSource {
                marker: marker.to_string(),
                downloads: Cell::new(0),
                fail_download: false,
            }
        }
    }

    impl DumpSource for FakeSource {
        fn latest_marker(&self) -> Result<String, SyncError> {
            Ok(self.marker.clone())
        }

        fn download(&self, dest: &Path) -> Result<u64, SyncError> {
            self.downloads.set(self.downloads.get() + 1);
            if self.fail_download {
                return Err(SyncError::Network("connection reset".to_string()));
            }
            let mut encoder = BzEncoder::new(File::create(dest)?, Compression::default());
            encoder.write_all(SQL.as_bytes())?;
            encoder.finish()?;
            Ok(fs::metadata(dest)?.len())
        }
    }

    #[derive(Default)]
    struct FakeLoader {
        loaded: RefCell<Vec<String>>,
        fail: bool,
    }

    impl DumpLoader for FakeLoader {
        fn load(&self, dump: &Path) -> Result<(), SyncError> {
            self.loaded.borrow_mut().push(fs::read_to_string(dump)?);
            if self.fail {
                return Err(SyncError::ExternalProcess {
                    program: "mysql".to_string(),
                    status: None,
                    stderr: "ERROR 2002 (HY000): Can't connect".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn comparator() {
        assert!(is_up_to_date("abc123", "abc123"));
        assert!(is_up_to_date("", ""));
        assert!(!is_up_to_date("abc123", ""));
        assert!(!is_up_to_date("abc123", "ABC123"));
    }

    #[test]
    fn first_run_loads_and_stores_marker() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let source = FakeSource::new("abc123");
        let loader = FakeLoader::default();
        let mut store = DuckDbMarkerStore::in_memory()?;

        let outcome = run(&source, &mut store, &loader, &RunOptions::new(dir.path()))?;

        match outcome {
            Outcome::Updated {
                marker,
                downloaded,
                decompressed,
            } => {
                assert_eq!(marker, "abc123");
                assert!(downloaded > 0);
                assert_eq!(decompressed, SQL.len() as u64);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(source.downloads.get(), 1);
        assert_eq!(*loader.loaded.borrow(), vec![SQL.to_string()]);
        assert_eq!(store.read_marker()?, "abc123");
        Ok(())
    }

    #[test]
    fn equal_markers_skip_everything() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let source = FakeSource::new("abc123");
        let loader = FakeLoader::default();
        let mut store = DuckDbMarkerStore::in_memory()?;
        store.write_marker("abc123")?;

        let outcome = run(&source, &mut store, &loader, &RunOptions::new(dir.path()))?;

        assert_eq!(
            outcome,
            Outcome::UpToDate {
                marker: "abc123".to_string()
            }
        );
        assert_eq!(source.downloads.get(), 0);
        assert!(loader.loaded.borrow().is_empty());
        assert!(!DumpFiles::in_dir(dir.path()).compressed.exists());
        Ok(())
    }

    #[test]
    fn changed_marker_runs_each_stage_once() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let source = FakeSource::new("def456");
        let loader = FakeLoader::default();
        let mut store = DuckDbMarkerStore::in_memory()?;
        store.write_marker("abc123")?;

        run(&source, &mut store, &loader, &RunOptions::new(dir.path()))?;

        assert_eq!(source.downloads.get(), 1);
        assert_eq!(loader.loaded.borrow().len(), 1);
        assert_eq!(store.read_marker()?, "def456");

        // a second run sees the new marker and does nothing
        run(&source, &mut store, &loader, &RunOptions::new(dir.path()))?;
        assert_eq!(source.downloads.get(), 1);
        assert_eq!(loader.loaded.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn failed_load_keeps_old_marker() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let source = FakeSource::new("def456");
        let loader = FakeLoader {
            fail: true,
            ..Default::default()
        };
        let mut store = DuckDbMarkerStore::in_memory()?;
        store.write_marker("abc123")?;

        let res = run(&source, &mut store, &loader, &RunOptions::new(dir.path()));

        assert!(matches!(res, Err(SyncError::ExternalProcess { .. })));
        assert_eq!(store.read_marker()?, "abc123");
        // files are kept around for inspection
        let files = DumpFiles::in_dir(dir.path());
        assert!(files.compressed.exists());
        assert!(files.plain.exists());
        Ok(())
    }

    #[test]
    fn failed_download_stops_before_load() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut source = FakeSource::new("def456");
        source.fail_download = true;
        let loader = FakeLoader::default();
        let mut store = DuckDbMarkerStore::in_memory()?;

        let res = run(&source, &mut store, &loader, &RunOptions::new(dir.path()));

        assert!(matches!(res, Err(SyncError::Network(_))));
        assert!(loader.loaded.borrow().is_empty());
        assert_eq!(store.read_marker()?, "");
        Ok(())
    }

    #[test]
    fn temporary_files_removed_unless_kept() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let files = DumpFiles::in_dir(dir.path());
        let loader = FakeLoader::default();
        let mut store = DuckDbMarkerStore::in_memory()?;

        run(
            &FakeSource::new("abc123"),
            &mut store,
            &loader,
            &RunOptions::new(dir.path()),
        )?;
        assert!(!files.compressed.exists());
        assert!(!files.plain.exists());

        let options = RunOptions {
            keep_files: true,
            ..RunOptions::new(dir.path())
        };
        run(&FakeSource::new("def456"), &mut store, &loader, &options)?;
        assert!(files.compressed.exists());
        assert_eq!(fs::read_to_string(&files.plain)?, SQL);
        Ok(())
    }

    #[test]
    fn force_reloads_when_up_to_date() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let source = FakeSource::new("abc123");
        let loader = FakeLoader::default();
        let mut store = DuckDbMarkerStore::in_memory()?;
        store.write_marker("abc123")?;

        let options = RunOptions {
            force: true,
            ..RunOptions::new(dir.path())
        };
        let outcome = run(&source, &mut store, &loader, &options)?;

        assert!(matches!(outcome, Outcome::Updated { .. }));
        assert_eq!(source.downloads.get(), 1);
        assert_eq!(store.read_marker()?, "abc123");
        Ok(())
    }
}

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use bzip2::read::MultiBzDecoder;
use log::info;
use reqwest::blocking::Client;

use crate::{
    config::SyncConfig,
    error::SyncError,
    pipeline::DumpSource,
    utils::progress::{log_every_pct, ProgressReader},
};

use super::lib_fuzzwork;

pub const COMPRESSED_FILENAME: &str = "sde_dump.sql.tar.bz2";
pub const DUMP_FILENAME: &str = "sde_dump.sql";

/// Local paths of the downloaded archive and of its decompressed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpFiles {
    pub compressed: PathBuf,
    pub plain: PathBuf,
}

impl DumpFiles {
    pub fn in_dir(dir: &Path) -> Self {
        DumpFiles {
            compressed: dir.join(COMPRESSED_FILENAME),
            plain: dir.join(DUMP_FILENAME),
        }
    }

    /// Delete both files.  Missing files are not an error.
    pub fn remove(&self) -> io::Result<()> {
        for path in [&self.compressed, &self.plain] {
            match fs::remove_file(path) {
                Ok(()) => info!("removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// The Fuzzwork mysql dump of the EVE static data export.
pub struct SdeArchive {
    pub checksum_url: String,
    pub dump_url: String,
    client: Client,
}

impl SdeArchive {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(SdeArchive {
            checksum_url: config.checksum_url.clone(),
            dump_url: config.dump_url.clone(),
            client: lib_fuzzwork::http_client(config.http_timeout)?,
        })
    }
}

impl DumpSource for SdeArchive {
    /// The md5 of the latest dump, as published next to it.
    fn latest_marker(&self) -> Result<String, SyncError> {
        let body = lib_fuzzwork::fetch_text(&self.client, &self.checksum_url)?;
        marker_from_body(&body, &self.checksum_url)
    }

    fn download(&self, dest: &Path) -> Result<u64, SyncError> {
        lib_fuzzwork::download_file(&self.client, &self.dump_url, dest)
    }
}

/// First whitespace delimited token of a checksum file, e.g.
/// `"d41d8cd9...  mysql-latest.tar.bz2"`.
pub fn parse_marker(body: &str) -> Option<&str> {
    body.split_whitespace().next()
}

/// The marker of a checksum response fetched from `url`.  A body without
/// any token is a `Network` error.
pub fn marker_from_body(body: &str, url: &str) -> Result<String, SyncError> {
    match parse_marker(body) {
        Some(marker) => Ok(marker.to_string()),
        None => Err(SyncError::Network(format!(
            "empty checksum response from {}",
            url
        ))),
    }
}

/// Decompress the bzip2 file `src` into `dst`.  `on_progress(read, total)`
/// sees how much of the compressed input has been consumed.  Returns the
/// number of decompressed bytes written.
pub fn decompress_file<F>(src: &Path, dst: &Path, on_progress: F) -> Result<u64, SyncError>
where
    F: FnMut(u64, u64),
{
    let file = File::open(src)?;
    let total = file.metadata()?.len();
    let reader = ProgressReader::new(BufReader::new(file), total, on_progress);
    let mut decoder = MultiBzDecoder::new(reader);

    let mut out = BufWriter::new(File::create(dst)?);
    let written = io::copy(&mut decoder, &mut out)?;
    out.flush()?;
    Ok(written)
}

/// `decompress_file` with progress logged every 10%.
pub fn decompress_with_logging(src: &Path, dst: &Path) -> Result<u64, SyncError> {
    decompress_file(src, dst, log_every_pct("decompressing", 10))
}

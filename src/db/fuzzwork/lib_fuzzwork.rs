use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::Path,
    time::Duration,
};

use reqwest::blocking::Client;

use crate::error::SyncError;

/// One client for every request of a run, with a fixed per-request timeout.
pub fn http_client(timeout: Duration) -> Result<Client, SyncError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(client)
}

/// GET `url` and return the body as text.  Non-success statuses are errors.
pub fn fetch_text(client: &Client, url: &str) -> Result<String, SyncError> {
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.text()?)
}

/// Stream the body of `url` into `file_path`, creating the parent
/// directory if needed.  Returns the number of bytes written.
pub fn download_file(client: &Client, url: &str, file_path: &Path) -> Result<u64, SyncError> {
    let mut response = client.get(url).send()?.error_for_status()?;
    write_stream(&mut response, file_path)
}

pub(crate) fn write_stream<R: Read>(body: &mut R, file_path: &Path) -> Result<u64, SyncError> {
    if let Some(dir) = file_path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut out = BufWriter::new(File::create(file_path)?);
    let written = io::copy(body, &mut out)?;
    out.flush()?;
    Ok(written)
}

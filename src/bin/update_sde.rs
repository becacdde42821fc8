use std::{
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use log::{error, info, warn};
use sde_sync::{
    config::SyncConfig,
    db::prod_db::ProdDb,
    error::SyncError,
    pipeline::{self, Outcome, RunOptions},
};

#[derive(Parser, Debug)]
#[command(version, about = "Load the latest Fuzzwork SDE dump into MySQL", long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Keep the downloaded and decompressed dump files
    #[arg(long)]
    keep_files: bool,

    /// Reload the dump even if the stored hash is current
    #[arg(long)]
    force: bool,

    /// Keep the hash in this DuckDB file instead of the target database
    #[arg(long)]
    marker_db: Option<PathBuf>,
}

fn update(args: &Args) -> Result<Outcome, SyncError> {
    let config = SyncConfig::from_env();
    let archive = ProdDb::sde_archive(&config)?;
    let loader = ProdDb::mysql_client(&config);
    info!("Connecting to DB");
    let mut store = ProdDb::marker_store(&config, args.marker_db.as_deref())?;

    let options = RunOptions {
        work_dir: config.work_dir.clone(),
        force: args.force,
        keep_files: args.keep_files,
    };
    pipeline::run(&archive, store.as_mut(), &loader, &options)
}

/// Run this job once a day, the dump is republished after each patch.
fn main() {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        if let Err(e) = dotenvy::from_path(Path::new(&env_file)) {
            error!("Failed to read {}: {}", env_file, e);
            process::exit(1);
        }
    } else {
        warn!("{} not found, using process environment", env_file);
    }

    match update(&args) {
        Ok(Outcome::UpToDate { marker }) => info!("Nothing to do, hash {}", marker),
        Ok(Outcome::Updated { marker, .. }) => info!("SDE updated to hash {}", marker),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

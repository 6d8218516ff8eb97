use std::path::PathBuf;

use clap::Parser;
use fpload::{config::Config, loader, store, Result};
use log::info;

#[derive(Parser)]
struct Cli {
    /// The TOML file describing the database, the source and destination
    /// tables, and the fingerprint parameters. Every setting has a default, so
    /// this can be omitted. The FPLOAD_BACKEND environment variable overrides
    /// the configured backend.
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            info!("loading config from {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    }
    .with_env()?;

    let mut store = store::open(&config)?;
    let mut stdout = std::io::stdout().lock();
    let summary = loader::run(&mut *store, &config, &mut stdout)?;
    info!("finished {} rows", summary.rows);

    Ok(())
}

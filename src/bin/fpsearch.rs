//! rank the fingerprints stored by fpload by similarity to a query molecule

use std::path::PathBuf;

use clap::Parser;
use fpload::{config::Config, search::search, store, Result};
use log::info;

#[derive(Parser)]
struct Cli {
    /// The same TOML config passed to fpload.
    config: PathBuf,

    /// The SMILES of the query molecule.
    smiles: String,

    /// The number of hits to print.
    #[arg(short, long, default_value_t = 10)]
    number: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?.with_env()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()?;

    let mut store = store::open(&config)?;
    let hits = search(&mut *store, &config, &cli.smiles, cli.number)?;
    info!("{} hits", hits.len());
    for hit in hits {
        println!("{}\t{:.4}", hit.id, hit.similarity);
    }

    Ok(())
}

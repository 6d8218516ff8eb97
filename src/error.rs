use std::{io, path::PathBuf};

use thiserror::Error;

use crate::chem::{bitvector::PickleError, smiles::SmilesError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config {path:?}: {source}")]
    ReadConfig { path: PathBuf, source: io::Error },

    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// a table or column name that can't be safely spliced into SQL
    #[error("`{0}` is not a valid SQL identifier")]
    Identifier(String),

    #[error("failed to parse SMILES {smiles:?} for {id}: {source}")]
    Smiles {
        id: String,
        smiles: String,
        source: SmilesError,
    },

    #[error("failed to decode fingerprint for {id}: {source}")]
    Pickle { id: String, source: PickleError },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "pgsql")]
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("the {0} backend was not compiled in")]
    BackendUnavailable(&'static str),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

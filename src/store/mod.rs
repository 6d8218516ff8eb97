//! the database driver abstraction. each backend knows its own binary column
//! type and how to fetch, insert, and commit

use log::info;

use crate::config::{Backend, Config};
use crate::error::{Error, Result};

#[cfg(feature = "pgsql")]
pub mod pg;
pub mod sqlite;

/// one (identifier, SMILES) row from the source table
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub smiles: String,
}

pub trait Store {
    /// the column type used for serialized fingerprints
    fn binary_type_name(&self) -> &'static str;

    /// create `table` with the column definitions in `columns` if it does not
    /// exist. with `replace`, any existing table is dropped first. this
    /// commits immediately, outside of [Store::begin]
    fn add_table(
        &mut self,
        table: &str,
        columns: &str,
        replace: bool,
    ) -> Result<()>;

    /// every (identifier, SMILES) row of `table`, in table order
    fn get_data(
        &mut self,
        table: &str,
        id_column: &str,
        smiles_column: &str,
    ) -> Result<Vec<SourceRecord>>;

    /// start the transaction that [Store::insert_data] writes into
    fn begin(&mut self) -> Result<()>;

    fn insert_data(
        &mut self,
        table: &str,
        columns: (&str, &str),
        id: &str,
        blob: &[u8],
    ) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// every (identifier, blob) row of `table`, in table order
    fn get_blobs(
        &mut self,
        table: &str,
        id_column: &str,
        blob_column: &str,
    ) -> Result<Vec<(String, Vec<u8>)>>;
}

/// table and column names are spliced into SQL text, so they are limited to
/// plain identifiers
pub fn check_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let head = chars.next();
    let ok = matches!(head, Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(Error::Identifier(name.to_owned()))
    }
}

/// connect to the backend selected by `config`
pub fn open(config: &Config) -> Result<Box<dyn Store>> {
    info!("opening {:?} database {}", config.backend, config.database);
    match config.backend {
        Backend::Sqlite => {
            Ok(Box::new(sqlite::SqliteStore::open(&config.database)?))
        }
        #[cfg(feature = "pgsql")]
        Backend::Postgres => {
            Ok(Box::new(pg::PostgresStore::open(&config.database)?))
        }
        #[cfg(not(feature = "pgsql"))]
        Backend::Postgres => Err(Error::BackendUnavailable("postgres")),
    }
}

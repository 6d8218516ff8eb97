use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::chem::bitvector::MAX_SIZE;
use crate::chem::fingerprint::{FingerprintFlags, FingerprintParams};
use crate::error::{Error, Result};

/// environment variable that overrides [Config::backend]
pub const BACKEND_VAR: &str = "FPLOAD_BACKEND";

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Postgres,
}

impl std::str::FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "pgsql" => Ok(Backend::Postgres),
            _ => Err(Error::InvalidConfig(format!("unknown backend `{s}`"))),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fingerprint {
    /// The smallest subgraph, in bonds, to include in the fingerprint.
    pub min_path: u32,

    /// The largest subgraph, in bonds, to include in the fingerprint.
    pub max_path: u32,

    /// The number of bits in each fingerprint.
    pub fp_size: u32,

    /// How many bits each subgraph sets.
    pub bits_per_hash: u32,

    /// Hash branched subgraphs as well as linear paths.
    pub branched_paths: bool,

    /// Distinguish bond orders when hashing.
    pub use_bond_order: bool,

    /// Include bonds to hydrogens written as explicit atoms.
    pub use_hs: bool,
}

impl Default for Fingerprint {
    fn default() -> Self {
        let p = FingerprintParams::default();
        Self {
            min_path: p.min_path,
            max_path: p.max_path,
            fp_size: p.fp_size,
            bits_per_hash: p.bits_per_hash,
            branched_paths: true,
            use_bond_order: true,
            use_hs: true,
        }
    }
}

impl Fingerprint {
    pub fn params(&self) -> Result<FingerprintParams> {
        if self.min_path == 0 || self.min_path > self.max_path {
            return Err(Error::InvalidConfig(format!(
                "need 0 < min_path <= max_path, got {} and {}",
                self.min_path, self.max_path
            )));
        }
        if self.fp_size == 0 || self.bits_per_hash == 0 {
            return Err(Error::InvalidConfig(
                "fp_size and bits_per_hash must be positive".to_owned(),
            ));
        }
        if self.fp_size as usize > MAX_SIZE {
            return Err(Error::InvalidConfig(format!(
                "fp_size {} is larger than the maximum of {MAX_SIZE}",
                self.fp_size
            )));
        }
        let mut flags = FingerprintFlags::empty();
        flags.set(FingerprintFlags::BRANCHED_PATHS, self.branched_paths);
        flags.set(FingerprintFlags::USE_BOND_ORDER, self.use_bond_order);
        flags.set(FingerprintFlags::USE_HS, self.use_hs);
        Ok(FingerprintParams {
            min_path: self.min_path,
            max_path: self.max_path,
            fp_size: self.fp_size,
            bits_per_hash: self.bits_per_hash,
            flags,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Which database driver to use.
    pub backend: Backend,

    /// The database to connect to: a SQLite file path, `:memory:`, or a
    /// PostgreSQL connection string.
    pub database: String,

    /// The table holding the molecules to fingerprint.
    pub source_table: String,

    /// The table to create and fill with fingerprints.
    pub dest_table: String,

    /// The identifier column, shared by the source and destination tables.
    pub id_column: String,

    /// The SMILES column in the source table.
    pub smiles_column: String,

    /// The fingerprint column in the destination table.
    pub fp_column: String,

    /// Drop and recreate the destination table instead of appending to it.
    pub replace: bool,

    /// The number of threads to use for similarity search. Defaults to the
    /// number of logical CPUs as detected by rayon.
    pub threads: usize,

    pub fingerprint: Fingerprint,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            database: "data.sqlt".to_owned(),
            source_table: "simple_mols1".to_owned(),
            dest_table: "simple_mols1_fp".to_owned(),
            id_column: "id".to_owned(),
            smiles_column: "smiles".to_owned(),
            fp_column: "autofragmentfp".to_owned(),
            replace: false,
            threads: 0,
            fingerprint: Fingerprint::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_owned(),
            source,
        })?;
        Ok(toml::from_str(&s)?)
    }

    /// applies the [BACKEND_VAR] override, if it is set
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(backend) = std::env::var(BACKEND_VAR) {
            self.backend = backend.parse()?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.backend, Backend::Sqlite);
        assert_eq!(cfg.source_table, "simple_mols1");
        assert_eq!(cfg.dest_table, "simple_mols1_fp");
        assert_eq!(cfg.fp_column, "autofragmentfp");
        assert_eq!(
            cfg.fingerprint.params().unwrap(),
            FingerprintParams::default()
        );
    }

    #[test]
    fn shipped_example() {
        let cfg: Config =
            toml::from_str(include_str!("../fpload.toml")).unwrap();
        assert_eq!(cfg.database, Config::default().database);
        assert_eq!(
            cfg.fingerprint.params().unwrap(),
            FingerprintParams::default()
        );
    }

    #[test]
    fn full() {
        let cfg: Config = toml::from_str(
            r#"
backend = "postgres"
database = "host=localhost dbname=RDTests"
source_table = "mols"
dest_table = "mols_fp"
replace = true
threads = 4

[fingerprint]
max_path = 5
fp_size = 1024
branched_paths = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.backend, Backend::Postgres);
        assert!(cfg.replace);
        assert_eq!(cfg.threads, 4);
        let params = cfg.fingerprint.params().unwrap();
        assert_eq!(params.max_path, 5);
        assert_eq!(params.fp_size, 1024);
        assert_eq!(params.min_path, 1);
        assert!(!params.flags.contains(FingerprintFlags::BRANCHED_PATHS));
        assert!(params.flags.contains(FingerprintFlags::USE_BOND_ORDER));
    }

    #[test]
    fn rejects() {
        assert!(toml::from_str::<Config>("colour = 1").is_err());
        assert!(toml::from_str::<Config>("backend = \"oracle\"").is_err());

        let cfg: Config =
            toml::from_str("[fingerprint]\nmin_path = 4\nmax_path = 2")
                .unwrap();
        assert!(matches!(
            cfg.fingerprint.params(),
            Err(Error::InvalidConfig(_))
        ));

        let cfg: Config =
            toml::from_str("[fingerprint]\nfp_size = 1000000000").unwrap();
        assert!(matches!(
            cfg.fingerprint.params(),
            Err(Error::InvalidConfig(_))
        ));
        let cfg: Config =
            toml::from_str(&format!("[fingerprint]\nfp_size = {MAX_SIZE}"))
                .unwrap();
        let params = cfg.fingerprint.params().unwrap();
        assert_eq!(params.fp_size as usize, MAX_SIZE);
    }

    #[test]
    fn backend_names() {
        assert_eq!("SQLite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("pgsql".parse::<Backend>().unwrap(), Backend::Postgres);
        assert!("oracle".parse::<Backend>().is_err());
    }
}

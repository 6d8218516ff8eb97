//! fpload: fingerprint the molecules in one database table and store the
//! serialized fingerprints in another

pub mod chem;
pub mod config;
pub mod error;
pub mod loader;
pub mod search;
pub mod store;

pub use error::{Error, Result};

//! the batch loader: fingerprint every source row into the destination table
//! and commit once at the end

use std::io::Write;

use log::{debug, info, warn};

use crate::chem::{
    fingerprint::{rdk_fingerprint, FingerprintParams},
    Molecule,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{check_identifier, SourceRecord, Store};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadSummary {
    /// destination rows written, one per source row
    pub rows: usize,
}

/// parse `record`, fingerprint it, and serialize the fingerprint
pub fn fingerprint_blob(
    record: &SourceRecord,
    params: &FingerprintParams,
) -> Result<Vec<u8>> {
    let mol = Molecule::from_smiles(&record.smiles).map_err(|source| {
        Error::Smiles {
            id: record.id.clone(),
            smiles: record.smiles.clone(),
            source,
        }
    })?;
    let fp = rdk_fingerprint(&mol, params);
    debug!(
        "{}: {} atoms, {} bits set",
        record.id,
        mol.num_atoms(),
        fp.count_ones()
    );
    Ok(fp.to_binary())
}

/// create the destination table, then insert a fingerprint for every source
/// row in a single transaction. each row's identifier and SMILES are echoed
/// to `trace` as they are processed. on any error the transaction is rolled
/// back and the error returned
pub fn run<S: Store + ?Sized>(
    store: &mut S,
    config: &Config,
    trace: &mut impl Write,
) -> Result<LoadSummary> {
    let params = config.fingerprint.params()?;
    let id_column = check_identifier(&config.id_column)?;
    let fp_column = check_identifier(&config.fp_column)?;

    let columns = format!(
        "{id_column} varchar(10), {fp_column} {}",
        store.binary_type_name()
    );
    store.add_table(&config.dest_table, &columns, config.replace)?;

    let records =
        store.get_data(&config.source_table, id_column, &config.smiles_column)?;
    info!(
        "fetched {} rows from {}",
        records.len(),
        config.source_table
    );

    store.begin()?;
    let res = insert_all(store, config, &params, &records, trace);
    match res {
        Ok(rows) => {
            store.commit()?;
            info!("committed {rows} rows to {}", config.dest_table);
            Ok(LoadSummary { rows })
        }
        Err(e) => {
            if let Err(re) = store.rollback() {
                warn!("rollback failed: {re}");
            }
            Err(e)
        }
    }
}

fn insert_all<S: Store + ?Sized>(
    store: &mut S,
    config: &Config,
    params: &FingerprintParams,
    records: &[SourceRecord],
    trace: &mut impl Write,
) -> Result<usize> {
    let columns = (config.id_column.as_str(), config.fp_column.as_str());
    for record in records {
        writeln!(trace, "{:?} {:?}", record.id, record.smiles)?;
        let blob = fingerprint_blob(record, params)?;
        store.insert_data(&config.dest_table, columns, &record.id, &blob)?;
    }
    Ok(records.len())
}

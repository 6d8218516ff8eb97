//! similarity search over a table of stored fingerprints

use std::cmp::Ordering;

use log::{info, warn};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::chem::{
    bitvector::BitVector,
    fingerprint::{rdk_fingerprint, tanimoto},
    Molecule,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::Store;

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub id: String,
    pub similarity: f64,
}

/// decode the stored (identifier, blob) pairs from the destination table
pub fn load_fingerprints<S: Store + ?Sized>(
    store: &mut S,
    config: &Config,
) -> Result<Vec<(String, BitVector)>> {
    let blobs = store.get_blobs(
        &config.dest_table,
        &config.id_column,
        &config.fp_column,
    )?;
    info!("decoding {} fingerprints", blobs.len());
    blobs
        .into_par_iter()
        .map(|(id, blob)| match BitVector::from_binary(&blob) {
            Ok(fp) => Ok((id, fp)),
            Err(source) => Err(Error::Pickle { id, source }),
        })
        .collect()
}

/// rank `fps` by Tanimoto similarity to `query`, highest first, keeping the
/// top `n`. ties keep their order in `fps`. fingerprints of a different size
/// than `query` can't be compared and are skipped
pub fn rank(
    query: &BitVector,
    fps: &[(String, BitVector)],
    n: usize,
) -> Vec<Hit> {
    let scores: Vec<Option<f64>> = fps
        .into_par_iter()
        .map(|(id, fp)| {
            if fp.len() != query.len() {
                warn!(
                    "skipping {id}: {} bits, expected {}",
                    fp.len(),
                    query.len()
                );
                return None;
            }
            Some(tanimoto(query, fp))
        })
        .collect();
    let mut order: Vec<usize> =
        (0..fps.len()).filter(|&i| scores[i].is_some()).collect();
    order.sort_by(|&a, &b| {
        scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal)
    });
    order
        .into_iter()
        .take(n)
        .filter_map(|i| {
            Some(Hit {
                id: fps[i].0.clone(),
                similarity: scores[i]?,
            })
        })
        .collect()
}

/// fingerprint `smiles` with the configured parameters and search the
/// destination table for its `n` nearest neighbors
pub fn search<S: Store + ?Sized>(
    store: &mut S,
    config: &Config,
    smiles: &str,
    n: usize,
) -> Result<Vec<Hit>> {
    let params = config.fingerprint.params()?;
    let mol = Molecule::from_smiles(smiles).map_err(|source| Error::Smiles {
        id: "query".to_owned(),
        smiles: smiles.to_owned(),
        source,
    })?;
    let query = rdk_fingerprint(&mol, &params);
    let fps = load_fingerprints(store, config)?;
    Ok(rank(&query, &fps, n))
}

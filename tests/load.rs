use fpload::{
    chem::{
        bitvector::BitVector,
        fingerprint::{rdk_fingerprint, FingerprintParams},
        Molecule,
    },
    config::Config,
    loader,
    store::{self, Store},
    Error,
};
use rusqlite::Connection;

fn seed(path: &std::path::Path, rows: &[(&str, &str)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE simple_mols1 (id, smiles)")
        .unwrap();
    for (id, smiles) in rows {
        conn.execute("INSERT INTO simple_mols1 VALUES (?1, ?2)", [id, smiles])
            .unwrap();
    }
}

fn config(path: &std::path::Path) -> Config {
    Config {
        database: path.to_str().unwrap().to_owned(),
        ..Default::default()
    }
}

/// rows as another connection sees them after the loader is gone
fn durable_rows(path: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let conn = Connection::open(path).unwrap();
    let sql = "SELECT id, autofragmentfp FROM simple_mols1_fp ORDER BY rowid";
    let mut stmt = conn.prepare(sql).unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

#[test]
fn ethanol_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.sqlt");
    seed(&path, &[("m1", "CCO")]);

    let cfg = config(&path);
    {
        let mut store = store::open(&cfg).unwrap();
        assert_eq!(store.binary_type_name(), "blob");
        let summary =
            loader::run(&mut *store, &cfg, &mut std::io::sink()).unwrap();
        assert_eq!(summary.rows, 1);
    }

    let rows = durable_rows(&path);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "m1");
    let ethanol = Molecule::from_smiles("CCO").unwrap();
    let want = rdk_fingerprint(&ethanol, &FingerprintParams::default());
    assert_eq!(BitVector::from_binary(&rows[0].1).unwrap(), want);
}

#[test]
fn source_order_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.sqlt");
    let source: Vec<(String, String)> = (0..25)
        .map(|i| (format!("mol{i}"), "C".repeat(i % 6 + 1)))
        .collect();
    let refs: Vec<(&str, &str)> = source
        .iter()
        .map(|(id, smi)| (id.as_str(), smi.as_str()))
        .collect();
    seed(&path, &refs);

    let cfg = config(&path);
    let mut store = store::open(&cfg).unwrap();
    loader::run(&mut *store, &cfg, &mut std::io::sink()).unwrap();
    drop(store);

    let ids: Vec<String> =
        durable_rows(&path).into_iter().map(|(id, _)| id).collect();
    let want: Vec<String> = source.into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, want);
}

#[test]
fn failed_run_is_not_visible() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.sqlt");
    seed(&path, &[("m1", "CCO"), ("m2", "CC(C")]);

    let cfg = config(&path);
    let mut store = store::open(&cfg).unwrap();
    let err = loader::run(&mut *store, &cfg, &mut std::io::sink()).unwrap_err();
    assert!(matches!(err, Error::Smiles { ref id, .. } if id == "m2"));
    drop(store);

    assert!(durable_rows(&path).is_empty());
}

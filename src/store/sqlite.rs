use log::{debug, trace};
use rusqlite::{params, types::ValueRef, Connection, Row, Statement};

use super::{check_identifier, SourceRecord, Store};
use crate::error::Result;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// open the database file at `path`, or a private in-memory database for
    /// `:memory:`
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        trace!("{sql}");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// select two columns from `table` in insertion order. views and
    /// `WITHOUT ROWID` tables have no rowid, so those are read in whatever
    /// order SQLite scans them
    fn select(
        &self,
        table: &str,
        first: &str,
        second: &str,
    ) -> Result<Statement<'_>> {
        let sql = format!(
            "SELECT {}, {} FROM {}",
            check_identifier(first)?,
            check_identifier(second)?,
            check_identifier(table)?,
        );
        let ordered = format!("{sql} ORDER BY rowid");
        trace!("{ordered}");
        match self.conn.prepare(&ordered) {
            Ok(stmt) => Ok(stmt),
            Err(e) => {
                debug!("{e}, retrying without ORDER BY");
                trace!("{sql}");
                Ok(self.conn.prepare(&sql)?)
            }
        }
    }
}

/// read column `idx` as a string. integer identifiers are common in source
/// tables, so those are rendered in decimal
fn text_column(row: &Row, idx: usize, name: &str) -> rusqlite::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Text(_) => row.get(idx),
        ValueRef::Integer(i) => Ok(i.to_string()),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            name.to_owned(),
            other.data_type(),
        )),
    }
}

impl Store for SqliteStore {
    fn binary_type_name(&self) -> &'static str {
        "blob"
    }

    fn add_table(
        &mut self,
        table: &str,
        columns: &str,
        replace: bool,
    ) -> Result<()> {
        let table = check_identifier(table)?;
        if replace {
            self.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
        }
        self.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} ({columns})"
        ))
    }

    fn get_data(
        &mut self,
        table: &str,
        id_column: &str,
        smiles_column: &str,
    ) -> Result<Vec<SourceRecord>> {
        let mut stmt = self.select(table, id_column, smiles_column)?;
        let rows = stmt.query_map([], |row| {
            Ok(SourceRecord {
                id: text_column(row, 0, id_column)?,
                smiles: text_column(row, 1, smiles_column)?,
            })
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn begin(&mut self) -> Result<()> {
        self.execute_batch("BEGIN")
    }

    fn insert_data(
        &mut self,
        table: &str,
        (id_column, blob_column): (&str, &str),
        id: &str,
        blob: &[u8],
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            check_identifier(table)?,
            check_identifier(id_column)?,
            check_identifier(blob_column)?,
        );
        self.conn.prepare_cached(&sql)?.execute(params![id, blob])?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.execute_batch("ROLLBACK")
    }

    fn get_blobs(
        &mut self,
        table: &str,
        id_column: &str,
        blob_column: &str,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let mut stmt = self.select(table, id_column, blob_column)?;
        let rows = stmt.query_map([], |row| {
            Ok((text_column(row, 0, id_column)?, row.get(1)?))
        })?;
        let blobs = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(blobs)
    }
}

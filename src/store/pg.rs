use log::trace;
use postgres::{types::Type, Client, NoTls, Row};

use super::{check_identifier, SourceRecord, Store};
use crate::error::Result;

pub struct PostgresStore {
    client: Client,
    in_transaction: bool,
}

impl PostgresStore {
    /// connect with a libpq style connection string such as
    /// `host=localhost dbname=RDTests`
    pub fn open(params: &str) -> Result<Self> {
        Ok(Self {
            client: Client::connect(params, NoTls)?,
            in_transaction: false,
        })
    }

    fn batch_execute(&mut self, sql: &str) -> Result<()> {
        trace!("{sql}");
        self.client.batch_execute(sql)?;
        Ok(())
    }
}

/// like the SQLite store, integer identifiers are rendered in decimal
fn text_column(row: &Row, idx: usize) -> Result<String> {
    let ty = row.columns()[idx].type_();
    Ok(if *ty == Type::INT4 {
        row.try_get::<_, i32>(idx)?.to_string()
    } else if *ty == Type::INT8 {
        row.try_get::<_, i64>(idx)?.to_string()
    } else {
        row.try_get(idx)?
    })
}

impl Store for PostgresStore {
    fn binary_type_name(&self) -> &'static str {
        "bytea"
    }

    fn add_table(
        &mut self,
        table: &str,
        columns: &str,
        replace: bool,
    ) -> Result<()> {
        let table = check_identifier(table)?;
        if replace {
            let sql = format!("DROP TABLE IF EXISTS {table} CASCADE");
            self.batch_execute(&sql)?;
        }
        self.batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {table} ({columns})"
        ))
    }

    fn get_data(
        &mut self,
        table: &str,
        id_column: &str,
        smiles_column: &str,
    ) -> Result<Vec<SourceRecord>> {
        let sql = format!(
            "SELECT {}, {} FROM {}",
            check_identifier(id_column)?,
            check_identifier(smiles_column)?,
            check_identifier(table)?,
        );
        trace!("{sql}");
        self.client
            .query(&sql, &[])?
            .iter()
            .map(|row| {
                Ok(SourceRecord {
                    id: text_column(row, 0)?,
                    smiles: text_column(row, 1)?,
                })
            })
            .collect()
    }

    fn begin(&mut self) -> Result<()> {
        self.batch_execute("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn insert_data(
        &mut self,
        table: &str,
        (id_column, blob_column): (&str, &str),
        id: &str,
        blob: &[u8],
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
            check_identifier(table)?,
            check_identifier(id_column)?,
            check_identifier(blob_column)?,
        );
        self.client.execute(&sql, &[&id, &blob])?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.batch_execute("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.batch_execute("ROLLBACK")
    }

    fn get_blobs(
        &mut self,
        table: &str,
        id_column: &str,
        blob_column: &str,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let sql = format!(
            "SELECT {}, {} FROM {}",
            check_identifier(id_column)?,
            check_identifier(blob_column)?,
            check_identifier(table)?,
        );
        trace!("{sql}");
        self.client
            .query(&sql, &[])?
            .iter()
            .map(|row| Ok((text_column(row, 0)?, row.try_get(1)?)))
            .collect()
    }
}

// File: src/database/binary_data.rs

//! Datum and reference-script payloads

use rusqlite::{Connection, OptionalExtension, params};

use super::transaction::Transaction;
use crate::error::StoreResult;
use crate::events::QueryTrace;
use crate::model::{BinaryData, ScriptReference};

pub(crate) fn upsert_binary_data_row(conn: &Connection, datum: &BinaryData) -> StoreResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO binary_data (binary_data_hash, binary_data) VALUES (?1, ?2)",
        params![datum.binary_data_hash, datum.binary_data],
    )?;
    Ok(())
}

pub(crate) fn upsert_script_row(conn: &Connection, script: &ScriptReference) -> StoreResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO scripts (script_hash, script) VALUES (?1, ?2)",
        params![script.script_hash, script.script],
    )?;
    Ok(())
}

impl Transaction<'_> {
    pub fn insert_binary_data<'a>(
        &self,
        data: impl IntoIterator<Item = &'a BinaryData>,
    ) -> StoreResult<()> {
        let _query = QueryTrace::new("insert_binary_data");
        for datum in data {
            upsert_binary_data_row(self.conn, datum)?;
        }
        Ok(())
    }

    pub fn get_binary_data(&self, binary_data_hash: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let _query = QueryTrace::new("get_binary_data");
        self.conn
            .query_row(
                "SELECT binary_data FROM binary_data WHERE binary_data_hash = ?1",
                params![binary_data_hash],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Collect binary-data rows no input refers to anymore. Returns the
    /// number of collected rows.
    pub fn prune_binary_data(&self) -> StoreResult<usize> {
        let _query = QueryTrace::new("prune_binary_data");
        // The ORDER BY looks useless but steers the planner onto both the
        // binary_data primary key and inputsByDatumHash. Without it, the
        // subquery degenerates into a full nested scan that takes hours on
        // a mainnet-sized table.
        self.conn
            .execute(
                "DELETE FROM binary_data WHERE binary_data_hash IN (\
                 SELECT binary_data.binary_data_hash FROM binary_data \
                 LEFT OUTER JOIN inputs ON inputs.datum_hash = binary_data.binary_data_hash \
                 WHERE inputs.ext_output_reference IS NULL \
                 ORDER BY inputs.datum_hash\
                 )",
                [],
            )
            .map_err(Into::into)
    }

    pub fn insert_scripts<'a>(
        &self,
        scripts: impl IntoIterator<Item = &'a ScriptReference>,
    ) -> StoreResult<()> {
        let _query = QueryTrace::new("insert_scripts");
        for script in scripts {
            upsert_script_row(self.conn, script)?;
        }
        Ok(())
    }

    pub fn get_script(&self, script_hash: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let _query = QueryTrace::new("get_script");
        self.conn
            .query_row(
                "SELECT script FROM scripts WHERE script_hash = ?1",
                params![script_hash],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }
}

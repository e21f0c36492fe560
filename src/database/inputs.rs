// File: src/database/inputs.rs

//! Input operations

use rusqlite::{params, params_from_iter};

use super::convert;
use super::indexes::with_temporary_index;
use super::migrations;
use super::transaction::Transaction;
use crate::config::StoreStats;
use crate::error::{StoreError, StoreResult};
use crate::events::QueryTrace;
use crate::model::{FoldedInput, Policy, ResolvedInput};
use crate::pattern::{Pattern, SortDirection, StatusFlag};

const INSERT_INPUT: &str = "INSERT OR IGNORE INTO inputs \
     (ext_output_reference, address, value, datum_hash, script_hash, \
      payment_credential, transaction_index, output_index, created_at, spent_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

impl Transaction<'_> {
    /// Ingest a batch of inputs, upserting their datum and script payloads
    /// alongside when present. Idempotent per `ext_output_reference`.
    pub fn insert_inputs<'a>(
        &self,
        inputs: impl IntoIterator<Item = &'a ResolvedInput>,
    ) -> StoreResult<()> {
        let _query = QueryTrace::new("insert_inputs");
        let mut stmt = self.conn.prepare(INSERT_INPUT)?;
        for resolved in inputs {
            stmt.execute(params_from_iter(convert::input_to_row(&resolved.input)))?;
            if let Some(datum) = &resolved.datum {
                super::binary_data::upsert_binary_data_row(self.conn, datum)?;
            }
            if let Some(script) = &resolved.script {
                super::binary_data::upsert_script_row(self.conn, script)?;
            }
        }
        Ok(())
    }

    /// Associate inputs with the monetary policies their values carry.
    /// Rows follow their input: deleting the input cascades here.
    pub fn insert_policies<'a>(
        &self,
        policies: impl IntoIterator<Item = &'a Policy>,
    ) -> StoreResult<()> {
        let _query = QueryTrace::new("insert_policies");
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO policies (output_reference, policy_id) VALUES (?1, ?2)",
        )?;
        for policy in policies {
            stmt.execute(params![policy.output_reference, policy.policy_id])?;
        }
        Ok(())
    }

    /// Delete every input matching any of the patterns; returns the number
    /// of deleted rows.
    pub fn delete_inputs(&self, patterns: &[Pattern]) -> StoreResult<usize> {
        let _query = QueryTrace::new("delete_inputs");
        let mut total = 0;
        for pattern in patterns {
            total += self
                .conn
                .execute(&format!("DELETE FROM inputs WHERE {}", pattern.to_sql()), [])?;
        }
        Ok(total)
    }

    /// Mark every input matching any of the patterns as spent at `slot`;
    /// returns the number of updated rows.
    pub fn mark_inputs(&self, slot: u64, patterns: &[Pattern]) -> StoreResult<usize> {
        let _query = QueryTrace::new("mark_inputs");
        let mut total = 0;
        for pattern in patterns {
            total += self.conn.execute(
                &format!(
                    "UPDATE inputs SET spent_at = ?1 WHERE {}",
                    pattern.to_sql()
                ),
                params![slot as i64],
            )?;
        }
        Ok(total)
    }

    /// Delete inputs spent before the retention window, `tip - k`. Returns
    /// the number of pruned rows.
    pub fn prune_inputs(&self) -> StoreResult<usize> {
        let _query = QueryTrace::new("prune_inputs");
        let k = self.longest_rollback.get();
        with_temporary_index(self.conn, "inputsBySpentAt", || {
            self.conn
                .execute(
                    "DELETE FROM inputs \
                     WHERE spent_at < ((SELECT MAX(slot_no) FROM checkpoints) - ?1)",
                    params![k as i64],
                )
                .map_err(Into::into)
        })
    }

    /// Stream every input matching `pattern`, narrowed by `status`, in the
    /// stable `(created_at, transaction_index, output_index)` order. Rows
    /// are handed to `on_row` one at a time; the result set is never
    /// materialized.
    pub fn fold_inputs(
        &self,
        pattern: &Pattern,
        status: StatusFlag,
        direction: SortDirection,
        mut on_row: impl FnMut(FoldedInput),
    ) -> StoreResult<()> {
        let _query = QueryTrace::new("fold_inputs");
        let dir = direction.as_sql();
        let sql = format!(
            "SELECT inputs.ext_output_reference, inputs.address, inputs.value, \
             inputs.datum_hash, inputs.script_hash, inputs.payment_credential, \
             inputs.transaction_index, inputs.output_index, inputs.created_at, \
             inputs.spent_at, created_block.header_hash, spent_block.header_hash \
             FROM inputs \
             JOIN checkpoints AS created_block ON created_block.slot_no = inputs.created_at \
             LEFT OUTER JOIN checkpoints AS spent_block ON spent_block.slot_no = inputs.spent_at \
             WHERE {}{} \
             ORDER BY inputs.created_at {dir}, inputs.transaction_index {dir}, \
             inputs.output_index {dir}",
            pattern.to_sql(),
            status.to_sql(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let folded = convert::row_to_folded_input(row).map_err(|_| {
                StoreError::UnexpectedRow {
                    context: "fold_inputs",
                    rows: convert::render_row(row, 12),
                }
            })?;
            on_row(folded);
        }
        Ok(())
    }

    /// Row counts and version information for the maintenance CLI.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let _query = QueryTrace::new("stats");
        let count = |table: &str| -> StoreResult<u64> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n as u64)
                .map_err(Into::into)
        };
        Ok(StoreStats {
            schema_version: migrations::current_version(self.conn)?,
            tip: self.max_slot("stats")?,
            input_count: count("inputs")?,
            checkpoint_count: count("checkpoints")?,
            pattern_count: count("patterns")?,
            binary_data_count: count("binary_data")?,
            script_count: count("scripts")?,
        })
    }
}

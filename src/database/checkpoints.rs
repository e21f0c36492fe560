// File: src/database/checkpoints.rs

//! Checkpoint operations and rollback

use std::collections::BTreeMap;

use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};

use super::convert;
use super::indexes::with_temporary_index;
use super::transaction::Transaction;
use crate::error::{StoreError, StoreResult};
use crate::events::QueryTrace;
use crate::model::Checkpoint;

impl Transaction<'_> {
    /// Record the points of ingested blocks. Idempotent per slot.
    pub fn insert_checkpoints<'a>(
        &self,
        points: impl IntoIterator<Item = &'a Checkpoint>,
    ) -> StoreResult<()> {
        let _query = QueryTrace::new("insert_checkpoints");
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO checkpoints (slot_no, header_hash) VALUES (?1, ?2)",
        )?;
        for point in points {
            stmt.execute(params_from_iter(convert::checkpoint_to_row(point)))?;
        }
        Ok(())
    }

    /// The checkpoint with the greatest slot, if any.
    pub fn newest_checkpoint(&self) -> StoreResult<Option<Checkpoint>> {
        let _query = QueryTrace::new("newest_checkpoint");
        self.conn
            .query_row(
                "SELECT slot_no, header_hash FROM checkpoints \
                 ORDER BY slot_no DESC LIMIT 1",
                [],
                convert::row_to_checkpoint,
            )
            .optional()
            .map_err(Into::into)
    }

    /// A sparse, tip-dense sample of the checkpoint list, descending.
    ///
    /// Chain-sync clients intersect against this ladder to find a common
    /// point without the server scanning every checkpoint: offsets from the
    /// tip grow exponentially, so density decays going backward while the
    /// most recent history stays fully covered.
    pub fn list_checkpoints_desc(&self) -> StoreResult<Vec<Checkpoint>> {
        let _query = QueryTrace::new("list_checkpoints_desc");
        let tip = match self.max_slot("list_checkpoints_desc")? {
            Some(tip) => tip,
            None => return Ok(Vec::new()),
        };

        let mut stmt = self.conn.prepare(
            "SELECT slot_no, header_hash FROM checkpoints \
             WHERE slot_no >= ?1 ORDER BY slot_no ASC LIMIT 1",
        )?;
        let mut by_slot: BTreeMap<u64, Checkpoint> = BTreeMap::new();
        for offset in sample_offsets(self.longest_rollback.get()) {
            let target = tip.saturating_sub(offset);
            let found = stmt
                .query_row(params![target as i64], convert::row_to_checkpoint)
                .optional()?;
            if let Some(point) = found {
                by_slot.entry(point.slot_no).or_insert(point);
            }
        }
        Ok(by_slot.into_values().rev().collect())
    }

    /// Up to `n` checkpoints strictly before `slot`, descending.
    pub fn list_ancestors_desc(&self, slot: u64, n: u64) -> StoreResult<Vec<Checkpoint>> {
        let _query = QueryTrace::new("list_ancestors_desc");
        let mut stmt = self.conn.prepare(
            "SELECT slot_no, header_hash FROM checkpoints \
             WHERE slot_no < ?1 ORDER BY slot_no DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![slot as i64, n as i64],
            convert::row_to_checkpoint,
        )?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Roll the store back to `target`: forget inputs created after it,
    /// un-spend inputs spent after it, drop checkpoints beyond it. Returns
    /// the new tip slot, or `None` when no checkpoint remains.
    ///
    /// Rolling back to the current tip is the common restart path and
    /// performs no DML at all.
    pub fn rollback_to(&self, target: u64) -> StoreResult<Option<u64>> {
        let _query = QueryTrace::new("rollback_to");
        let tip = self.max_slot("rollback_to")?;
        if tip == Some(target) {
            return Ok(tip);
        }

        with_temporary_index(self.conn, "inputsBySpentAt", || {
            with_temporary_index(self.conn, "inputsByCreatedAt", || {
                self.conn.execute(
                    "DELETE FROM inputs WHERE created_at > ?1",
                    params![target as i64],
                )?;
                self.conn.execute(
                    "UPDATE inputs SET spent_at = NULL WHERE spent_at > ?1",
                    params![target as i64],
                )?;
                self.conn.execute(
                    "DELETE FROM checkpoints WHERE slot_no > ?1",
                    params![target as i64],
                )?;
                Ok(())
            })
        })?;

        // Rewriting a large slice of the table invalidates the planner's
        // statistics.
        self.conn.execute_batch("PRAGMA optimize")?;

        self.max_slot("rollback_to")
    }

    /// `MAX(slot_no)` over checkpoints; `None` when the table is empty.
    pub(crate) fn max_slot(&self, context: &'static str) -> StoreResult<Option<u64>> {
        let value: Value =
            self.conn
                .query_row("SELECT MAX(slot_no) FROM checkpoints", [], |row| row.get(0))?;
        match value {
            Value::Integer(slot) if slot >= 0 => Ok(Some(slot as u64)),
            Value::Null => Ok(None),
            other => Err(StoreError::UnexpectedRow {
                context,
                rows: vec![format!("{:?}", other)],
            }),
        }
    }
}

/// Offsets from the tip probed by `list_checkpoints_desc`.
///
/// For `k <= 10` every slot within the window is sampled. Beyond that, with
/// `n = ceil(log2 k)`: a short arithmetic run near the tip, then the
/// halving ladder `k / 2^i` out to `k` itself. Duplicate offsets are fine,
/// the result is deduplicated by slot.
fn sample_offsets(k: u64) -> Vec<u64> {
    if k <= 10 {
        return (0..=k).collect();
    }
    let n = 64 - (k - 1).leading_zeros();
    let mut offsets: Vec<u64> = (0..=(k >> n)).step_by(10).collect();
    for i in (0..n).rev() {
        offsets.push(k >> i);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_windows_sample_every_slot() {
        assert_eq!(sample_offsets(1), vec![0, 1]);
        assert_eq!(sample_offsets(4), vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_offsets(10), (0..=10).collect::<Vec<u64>>());
    }

    #[test]
    fn test_large_windows_decay_exponentially() {
        let offsets = sample_offsets(2160);
        assert_eq!(offsets[0], 0);
        assert_eq!(*offsets.last().unwrap(), 2160, "reaches the whole window");

        // Exponential halving from the far end of the window.
        for pair in offsets[1..].windows(2) {
            assert!(pair[0] <= pair[1] && pair[1] <= pair[0] * 2 + 1);
        }
    }

    #[test]
    fn test_offsets_stay_within_the_window() {
        for k in [11, 100, 2160, 1 << 20] {
            for offset in sample_offsets(k) {
                assert!(offset <= k, "offset {offset} beyond window {k}");
            }
        }
    }
}

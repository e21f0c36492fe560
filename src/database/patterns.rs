// File: src/database/patterns.rs

//! Pattern persistence
//!
//! Patterns are user-managed: interactive pattern management inserts and
//! deletes them from short-lived read-write connections, under the lock
//! coordinator like any other write.

use rusqlite::params;

use super::transaction::Transaction;
use crate::error::StoreResult;
use crate::events::QueryTrace;
use crate::pattern::Pattern;

impl Transaction<'_> {
    pub fn insert_patterns<'a>(
        &self,
        patterns: impl IntoIterator<Item = &'a Pattern>,
    ) -> StoreResult<()> {
        let _query = QueryTrace::new("insert_patterns");
        let mut stmt = self
            .conn
            .prepare("INSERT OR IGNORE INTO patterns (pattern) VALUES (?1)")?;
        for pattern in patterns {
            stmt.execute(params![pattern.to_string()])?;
        }
        Ok(())
    }

    /// Returns 1 when the pattern existed, 0 otherwise.
    pub fn delete_pattern(&self, pattern: &Pattern) -> StoreResult<usize> {
        let _query = QueryTrace::new("delete_pattern");
        self.conn
            .execute(
                "DELETE FROM patterns WHERE pattern = ?1",
                params![pattern.to_string()],
            )
            .map_err(Into::into)
    }

    /// Every persisted pattern. A row that no longer parses surfaces as
    /// `InvalidPattern`.
    pub fn list_patterns(&self) -> StoreResult<Vec<Pattern>> {
        let _query = QueryTrace::new("list_patterns");
        let mut stmt = self.conn.prepare("SELECT pattern FROM patterns")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.map(|text| text.map_err(Into::into).and_then(|text| text.parse::<Pattern>()))
            .collect()
    }
}

// File: src/database/migrations.rs

//! Schema migrations
//!
//! A monotonically numbered ladder of SQL scripts embedded at build time.
//! `PRAGMA user_version` records how many have been applied; on opening the
//! long-lived connection every script beyond that count runs, each inside
//! its own write transaction. A script's first statement is the
//! `PRAGMA user_version = N` bump, so a committed script and its version
//! are inseparable and no mixed-version state is ever observable.

use rusqlite::Connection;
use rusqlite::types::Value;

use crate::error::{StoreError, StoreResult};
use crate::events::DatabaseEvent;

const MIGRATIONS: &[&str] = &[
    include_str!("migrations/001.sql"),
    include_str!("migrations/002.sql"),
];

/// Schema version a freshly migrated database ends up at.
pub const SCHEMA_VERSION: u64 = MIGRATIONS.len() as u64;

/// Bring the database up to [`SCHEMA_VERSION`], running any pending scripts.
///
/// Fails with `UnexpectedUserVersion` when the persisted version is
/// unreadable or ahead of this build. Any statement failure aborts the
/// in-flight script, rolls it back and surfaces to the caller.
pub(crate) fn run_migrations(conn: &Connection) -> StoreResult<()> {
    let version = current_version(conn)?;
    DatabaseEvent::CurrentVersion { version }.emit();

    if version > SCHEMA_VERSION {
        return Err(StoreError::UnexpectedUserVersion(format!(
            "database version {} is ahead of the latest known migration {}",
            version, SCHEMA_VERSION
        )));
    }
    if version == SCHEMA_VERSION {
        DatabaseEvent::NoMigrationNeeded.emit();
        return Ok(());
    }

    DatabaseEvent::RunningMigration {
        from: version,
        to: SCHEMA_VERSION,
    }
    .emit();
    for script in &MIGRATIONS[version as usize..] {
        execute_migration(conn, script)?;
    }
    Ok(())
}

/// Read `PRAGMA user_version`, insisting on an integer cell.
pub(crate) fn current_version(conn: &Connection) -> StoreResult<u64> {
    let value: Value = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StoreError::UnexpectedUserVersion("user_version returned no row".to_string())
            }
            e => e.into(),
        })?;
    match value {
        Value::Integer(version) if version >= 0 => Ok(version as u64),
        other => Err(StoreError::UnexpectedUserVersion(format!(
            "user_version is not a non-negative integer: {:?}",
            other
        ))),
    }
}

/// Run one script inside a single write transaction.
fn execute_migration(conn: &Connection, script: &str) -> StoreResult<()> {
    conn.execute_batch("BEGIN IMMEDIATE TRANSACTION")?;
    for statement in split_statements(script) {
        if let Err(e) = conn.execute_batch(statement) {
            let _ = conn.execute_batch("ROLLBACK TRANSACTION");
            return Err(e.into());
        }
    }
    if let Err(e) = conn.execute_batch("COMMIT TRANSACTION") {
        let _ = conn.execute_batch("ROLLBACK TRANSACTION");
        return Err(e.into());
    }
    Ok(())
}

/// Statements are separated by `;`, empty segments dropped.
fn split_statements(script: &str) -> impl Iterator<Item = &str> {
    script
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}

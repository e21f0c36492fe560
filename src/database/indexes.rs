// File: src/database/indexes.rs

//! Index management
//!
//! The query workload falls off a performance cliff without the `inputs`
//! indexes, but maintaining them during bulk ingest roughly doubles write
//! amplification. Two regimes: install the whole set at startup, or defer
//! the non-essential ones and let bulk operations create what they need as
//! a temporary index, dropped when the operation finishes.

use rusqlite::Connection;

use crate::config::DeferIndexes;
use crate::error::StoreResult;
use crate::events::{ConnectionEvent, DatabaseEvent};

/// The permanent index set, name to definition.
const INDEXES: &[(&str, &str)] = &[
    (
        "inputsByAddress",
        "CREATE INDEX IF NOT EXISTS inputsByAddress \
         ON inputs(address COLLATE NOCASE, spent_at)",
    ),
    (
        "inputsByPaymentCredential",
        "CREATE INDEX IF NOT EXISTS inputsByPaymentCredential \
         ON inputs(payment_credential COLLATE NOCASE, spent_at)",
    ),
    (
        "inputsByDatumHash",
        "CREATE INDEX IF NOT EXISTS inputsByDatumHash ON inputs(datum_hash)",
    ),
    (
        "inputsBySpentAt",
        "CREATE INDEX IF NOT EXISTS inputsBySpentAt ON inputs(spent_at)",
    ),
    (
        "inputsByCreatedAt",
        "CREATE INDEX IF NOT EXISTS inputsByCreatedAt ON inputs(created_at)",
    ),
];

/// Install (or skip) the permanent index set at long-lived startup.
pub(crate) fn install_indexes(conn: &Connection, defer: DeferIndexes) -> StoreResult<()> {
    match defer {
        DeferIndexes::SkipNonEssential => {
            DatabaseEvent::DeferIndexes {
                warning: "non-essential indexes are deferred, queries will be slow \
                          until they are installed",
            }
            .emit();
            Ok(())
        }
        DeferIndexes::InstallIfNotExist => {
            for &(name, definition) in INDEXES {
                if index_exists(conn, name)? {
                    DatabaseEvent::IndexAlreadyExists { name }.emit();
                } else {
                    DatabaseEvent::CreateIndex { name }.emit();
                    conn.execute_batch(definition)?;
                }
            }
            Ok(())
        }
    }
}

/// `PRAGMA index_info` replies with one row per indexed column; a non-empty
/// reply implies presence.
pub(crate) fn index_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA index_info({})", name))?;
    let mut rows = stmt.query([])?;
    Ok(rows.next()?.is_some())
}

/// Run `body` with the named index present, creating and dropping it around
/// the call when it was not already installed. Tracing announces the index
/// only when it is temporary.
pub(crate) fn with_temporary_index<T>(
    conn: &Connection,
    name: &'static str,
    body: impl FnOnce() -> StoreResult<T>,
) -> StoreResult<T> {
    let definition = INDEXES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, definition)| *definition)
        .unwrap_or_else(|| unreachable!("unknown index {name}"));

    let pre_existing = index_exists(conn, name)?;
    if !pre_existing {
        ConnectionEvent::CreateTemporaryIndex { name }.emit();
        conn.execute_batch(definition)?;
    }
    let result = body()?;
    if !pre_existing {
        ConnectionEvent::RemoveTemporaryIndex { name }.emit();
        conn.execute_batch(&format!("DROP INDEX IF EXISTS {}", name))?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations::run_migrations;

    fn migrated_connection() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory database");
        run_migrations(&conn).expect("migrations");
        conn
    }

    #[test]
    fn test_install_creates_all_indexes() {
        let conn = migrated_connection();
        install_indexes(&conn, DeferIndexes::InstallIfNotExist).expect("install");
        for (name, _) in INDEXES {
            assert!(index_exists(&conn, name).unwrap(), "{name} should exist");
        }
    }

    #[test]
    fn test_skip_non_essential_installs_nothing() {
        let conn = migrated_connection();
        install_indexes(&conn, DeferIndexes::SkipNonEssential).expect("skip");
        for (name, _) in INDEXES {
            assert!(!index_exists(&conn, name).unwrap(), "{name} should be absent");
        }
    }

    #[test]
    fn test_install_twice_is_idempotent() {
        let conn = migrated_connection();
        install_indexes(&conn, DeferIndexes::InstallIfNotExist).expect("first");
        install_indexes(&conn, DeferIndexes::InstallIfNotExist).expect("second");
    }

    #[test]
    fn test_temporary_index_is_dropped_after_use() {
        let conn = migrated_connection();
        with_temporary_index(&conn, "inputsBySpentAt", || {
            assert!(index_exists(&conn, "inputsBySpentAt")?);
            Ok(())
        })
        .expect("bracketed body");
        assert!(!index_exists(&conn, "inputsBySpentAt").unwrap());
    }

    #[test]
    fn test_pre_existing_index_survives_the_bracket() {
        let conn = migrated_connection();
        install_indexes(&conn, DeferIndexes::InstallIfNotExist).expect("install");
        with_temporary_index(&conn, "inputsBySpentAt", || Ok(())).expect("bracketed body");
        assert!(index_exists(&conn, "inputsBySpentAt").unwrap());
    }
}

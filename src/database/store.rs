// File: src/database/store.rs

//! Connection factory and lifecycle
//!
//! Two bracketed lifetimes. The long-lived connection is the process's one
//! privileged writer: opened at startup, migrated, indexed, and kept until
//! shutdown. Short-lived connections serve a single request or worker task
//! and close on scope exit. Both are plain values owned by their scope;
//! dropping the handle closes the connection.

use std::sync::Arc;

use rusqlite::{Connection, OpenFlags};

use super::lock::ConnectionLock;
use super::{indexes, migrations};
use crate::config::{ConnectionType, DatabaseFile, DeferIndexes, LongestRollback};
use crate::error::StoreResult;
use crate::events::{ConnectionEvent, DatabaseEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifetime {
    ShortLived,
    LongLived,
}

/// A handle on one SQLite connection, the unit of parallelism: the engine
/// is synchronous per connection, concurrent work uses one `Database` per
/// task.
pub struct Database {
    pub(crate) conn: Connection,
    pub(crate) mode: ConnectionType,
    pub(crate) lifetime: Lifetime,
    pub(crate) longest_rollback: LongestRollback,
    pub(crate) lock: Arc<ConnectionLock>,
}

impl Database {
    /// Open a short-lived connection.
    pub fn short_lived(
        file: &DatabaseFile,
        mode: ConnectionType,
        longest_rollback: LongestRollback,
        lock: Arc<ConnectionLock>,
    ) -> StoreResult<Self> {
        let conn = open_connection(file, mode)?;
        if mode == ConnectionType::ReadOnly {
            // Readers must not block on the writer's WAL tail.
            conn.pragma_update(None, "read_uncommitted", 1)?;
        }
        ConnectionEvent::CreateShortLived { mode }.emit();
        Ok(Self {
            conn,
            mode,
            lifetime: Lifetime::ShortLived,
            longest_rollback,
            lock,
        })
    }

    /// Open the long-lived writer: connect, migrate, install indexes.
    pub fn long_lived(
        file: &DatabaseFile,
        longest_rollback: LongestRollback,
        defer_indexes: DeferIndexes,
        lock: Arc<ConnectionLock>,
    ) -> StoreResult<Self> {
        if file.is_in_memory() {
            DatabaseEvent::RunningInMemory.emit();
        }
        let conn = open_connection(file, ConnectionType::ReadWrite)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&conn)?;
        indexes::install_indexes(&conn, defer_indexes)?;

        Ok(Self {
            conn,
            mode: ConnectionType::ReadWrite,
            lifetime: Lifetime::LongLived,
            longest_rollback,
            lock,
        })
    }

    pub fn mode(&self) -> ConnectionType {
        self.mode
    }

    pub fn longest_rollback(&self) -> LongestRollback {
        self.longest_rollback
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.lifetime == Lifetime::ShortLived {
            ConnectionEvent::DestroyShortLived { mode: self.mode }.emit();
        }
    }
}

fn open_connection(file: &DatabaseFile, mode: ConnectionType) -> StoreResult<Connection> {
    let uri = file.connection_uri(mode);
    DatabaseEvent::Connection { uri: uri.clone() }.emit();

    let access = match mode {
        ConnectionType::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
        ConnectionType::ReadWrite => {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    };
    let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = Connection::open_with_flags(&uri, flags)?;
    conn.pragma_update(None, "page_size", 16184)?;
    conn.pragma_update(None, "cache_size", -50_000)?;
    Ok(conn)
}

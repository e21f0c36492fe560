//! Structured trace events
//!
//! Two streams: database-level events emitted while opening and migrating,
//! and connection-level events emitted per transaction and query. Events go
//! straight to `tracing` and never block the caller.

use std::time::Duration;

use tracing::Level;

use crate::config::ConnectionType;

/// Events around opening, migrating and indexing the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEvent {
    Connection { uri: String },
    CurrentVersion { version: u64 },
    NoMigrationNeeded,
    RunningMigration { from: u64, to: u64 },
    CreateIndex { name: &'static str },
    IndexAlreadyExists { name: &'static str },
    DeferIndexes { warning: &'static str },
    RunningInMemory,
}

impl DatabaseEvent {
    pub fn severity(&self) -> Level {
        match self {
            DatabaseEvent::Connection { .. } => Level::DEBUG,
            DatabaseEvent::CurrentVersion { .. } => Level::INFO,
            DatabaseEvent::NoMigrationNeeded => Level::DEBUG,
            DatabaseEvent::RunningMigration { .. } => Level::INFO,
            DatabaseEvent::CreateIndex { .. } => Level::INFO,
            DatabaseEvent::IndexAlreadyExists { .. } => Level::DEBUG,
            DatabaseEvent::DeferIndexes { .. } => Level::WARN,
            DatabaseEvent::RunningInMemory => Level::WARN,
        }
    }

    pub fn emit(&self) {
        match self {
            DatabaseEvent::Connection { uri } => {
                tracing::debug!(uri = %uri, "database connection")
            }
            DatabaseEvent::CurrentVersion { version } => {
                tracing::info!(version, "database current version")
            }
            DatabaseEvent::NoMigrationNeeded => tracing::debug!("no migration needed"),
            DatabaseEvent::RunningMigration { from, to } => {
                tracing::info!(from, to, "running migration")
            }
            DatabaseEvent::CreateIndex { name } => tracing::info!(name, "creating index"),
            DatabaseEvent::IndexAlreadyExists { name } => {
                tracing::debug!(name, "index already exists")
            }
            DatabaseEvent::DeferIndexes { warning } => tracing::warn!("{warning}"),
            DatabaseEvent::RunningInMemory => {
                tracing::warn!("running in-memory, data is not persisted across restarts")
            }
        }
    }
}

/// Events emitted by individual connections while they run transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    CreateShortLived { mode: ConnectionType },
    DestroyShortLived { mode: ConnectionType },
    Locked { retry_in: Duration },
    Busy { retry_in: Duration },
    BeginQuery { name: &'static str },
    ExitQuery { name: &'static str },
    CreateTemporaryIndex { name: &'static str },
    RemoveTemporaryIndex { name: &'static str },
}

impl ConnectionEvent {
    pub fn severity(&self) -> Level {
        match self {
            ConnectionEvent::CreateShortLived { .. } => Level::DEBUG,
            ConnectionEvent::DestroyShortLived { .. } => Level::DEBUG,
            ConnectionEvent::Locked { .. } => Level::WARN,
            ConnectionEvent::Busy { .. } => Level::WARN,
            ConnectionEvent::BeginQuery { .. } => Level::DEBUG,
            ConnectionEvent::ExitQuery { .. } => Level::DEBUG,
            ConnectionEvent::CreateTemporaryIndex { .. } => Level::INFO,
            ConnectionEvent::RemoveTemporaryIndex { .. } => Level::INFO,
        }
    }

    pub fn emit(&self) {
        match self {
            ConnectionEvent::CreateShortLived { mode } => {
                tracing::debug!(mode = mode.as_str(), "create short-lived connection")
            }
            ConnectionEvent::DestroyShortLived { mode } => {
                tracing::debug!(mode = mode.as_str(), "destroy short-lived connection")
            }
            ConnectionEvent::Locked { retry_in } => {
                tracing::warn!(retry_in_ms = retry_in.as_millis() as u64, "database locked")
            }
            ConnectionEvent::Busy { retry_in } => {
                tracing::warn!(retry_in_ms = retry_in.as_millis() as u64, "database busy")
            }
            ConnectionEvent::BeginQuery { name } => tracing::debug!(name, "begin query"),
            ConnectionEvent::ExitQuery { name } => tracing::debug!(name, "exit query"),
            ConnectionEvent::CreateTemporaryIndex { name } => {
                tracing::info!(name, "creating temporary index, this may take a while")
            }
            ConnectionEvent::RemoveTemporaryIndex { name } => {
                tracing::info!(name, "removing temporary index")
            }
        }
    }
}

/// Emits `BeginQuery` on construction and `ExitQuery` when dropped, so
/// every exit path of a query is traced.
pub(crate) struct QueryTrace {
    name: &'static str,
}

impl QueryTrace {
    pub(crate) fn new(name: &'static str) -> Self {
        ConnectionEvent::BeginQuery { name }.emit();
        Self { name }
    }
}

impl Drop for QueryTrace {
    fn drop(&mut self) {
        ConnectionEvent::ExitQuery { name: self.name }.emit();
    }
}

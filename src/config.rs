//! Store configuration

use std::path::PathBuf;

/// Location of the index database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseFile {
    /// A regular file on disk, created on first open.
    OnDisk(PathBuf),
    /// An in-memory database. `Some(name)` opens a named database with a
    /// shared cache so several connections see the same data; `None` opens
    /// an isolated database visible to a single connection only.
    InMemory(Option<String>),
}

impl DatabaseFile {
    /// Build the SQLite URI filename for this location and access mode.
    pub fn connection_uri(&self, mode: ConnectionType) -> String {
        match self {
            DatabaseFile::OnDisk(path) => {
                format!("file:{}?mode={}", path.display(), mode.uri_mode())
            }
            DatabaseFile::InMemory(Some(name)) => {
                format!("file:{}?mode=memory&cache=shared", name)
            }
            DatabaseFile::InMemory(None) => ":memory:".to_string(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, DatabaseFile::InMemory(_))
    }
}

/// Access mode of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    ReadOnly,
    ReadWrite,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::ReadOnly => "read-only",
            ConnectionType::ReadWrite => "read-write",
        }
    }

    fn uri_mode(&self) -> &'static str {
        match self {
            ConnectionType::ReadOnly => "ro",
            ConnectionType::ReadWrite => "rwc",
        }
    }
}

/// Whether to install the full index set at startup.
///
/// Deferring the non-essential indexes speeds up bulk ingest considerably;
/// queries that need one get it as a temporary index in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeferIndexes {
    #[default]
    InstallIfNotExist,
    SkipNonEssential,
}

/// The maximum number of slots the store guarantees can be rolled back.
///
/// Drives checkpoint retention, input pruning and binary-data collection:
/// anything older than `tip - k` is eligible for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongestRollback(u64);

impl LongestRollback {
    /// Returns `None` for a zero window, which would make every row
    /// immediately prunable.
    pub fn new(slots: u64) -> Option<Self> {
        if slots == 0 {
            None
        } else {
            Some(Self(slots))
        }
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for LongestRollback {
    fn default() -> Self {
        Self(2160)
    }
}

/// Row counts and version information, as reported by the maintenance CLI.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub schema_version: u64,
    pub tip: Option<u64>,
    pub input_count: u64,
    pub checkpoint_count: u64,
    pub pattern_count: u64,
    pub binary_data_count: u64,
    pub script_count: u64,
}

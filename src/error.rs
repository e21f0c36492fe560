//! Store error types

use thiserror::Error;

/// Failures surfaced by the storage engine.
///
/// Busy/locked contention never escapes through this type: the transaction
/// runner retries it internally. Everything else propagates to the caller
/// with the store left in its pre-call state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite database error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The persisted `user_version` cell is missing, non-integer, or ahead
    /// of every migration known to this build.
    #[error("unexpected database version: {0}")]
    UnexpectedUserVersion(String),

    /// A query produced a row whose shape the caller cannot decode.
    #[error("unexpected row while {context}: {rows:?}")]
    UnexpectedRow {
        context: &'static str,
        rows: Vec<String>,
    },

    /// A row in the `patterns` table no longer parses.
    #[error("invalid pattern {text:?}: {reason}")]
    InvalidPattern { text: String, reason: &'static str },
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Busy/locked conditions, the only errors the transaction runner
    /// retries.
    pub fn is_transient(&self) -> bool {
        self.contention_code().is_some()
    }

    /// Which contention condition this error carries, if any.
    pub(crate) fn contention_code(&self) -> Option<rusqlite::ErrorCode> {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Some(e.code)
            }
            _ => None,
        }
    }
}

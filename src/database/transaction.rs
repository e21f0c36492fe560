// File: src/database/transaction.rs

//! Transaction runner
//!
//! Every operation against the store runs inside an explicit
//! BEGIN/COMMIT bracket with rollback on failure, including failure of the
//! COMMIT itself: a commit can fail with BUSY and leave the connection in
//! an ambiguous state unless rolled back. Busy/locked conditions retry the
//! whole transaction after a fixed backoff; everything else rolls back and
//! propagates, leaving the store in its pre-call state.
//!
//! Transactions never nest. A read-write bracket also holds the
//! coordinator section for its lifetime, so the long-lived writer and
//! short-lived writers never overlap (see `lock`).

use std::time::Duration;

use rusqlite::Connection;

use super::store::{Database, Lifetime};
use crate::config::{ConnectionType, LongestRollback};
use crate::error::StoreResult;
use crate::events::ConnectionEvent;

const RETRY_DELAY: Duration = Duration::from_millis(100);

/// The in-transaction interface. All typed operations (inputs, checkpoints,
/// patterns, binary data, scripts) hang off this handle, so a single
/// closure composes any number of them atomically.
pub struct Transaction<'conn> {
    pub(crate) conn: &'conn Connection,
    pub(crate) longest_rollback: LongestRollback,
}

impl Database {
    /// Run `body` inside one transaction, retrying the whole of it on
    /// busy/locked contention. `body` may therefore run more than once;
    /// side effects outside the transaction should be idempotent.
    ///
    /// Read-only connections open a DEFERRED transaction and skip the
    /// coordinator entirely. Read-write connections take their coordinator
    /// section first, then open an IMMEDIATE transaction so the reserved
    /// lock is acquired eagerly and lock upgrades cannot deadlock.
    pub fn transaction<T>(
        &self,
        mut body: impl FnMut(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        match (self.lifetime, self.mode) {
            (Lifetime::ShortLived, ConnectionType::ReadOnly) => {
                self.run_with_retry("BEGIN DEFERRED TRANSACTION", &mut body)
            }
            (Lifetime::ShortLived, ConnectionType::ReadWrite) => {
                let _section = self.lock.short_lived_section();
                self.run_with_retry("BEGIN IMMEDIATE TRANSACTION", &mut body)
            }
            (Lifetime::LongLived, _) => {
                let _section = self.lock.long_lived_section();
                self.run_with_retry("BEGIN IMMEDIATE TRANSACTION", &mut body)
            }
        }
    }

    fn run_with_retry<T>(
        &self,
        begin: &str,
        body: &mut impl FnMut(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let tx = Transaction {
            conn: &self.conn,
            longest_rollback: self.longest_rollback,
        };
        loop {
            match self.run_once(begin, body, &tx) {
                Err(e) if e.is_transient() => {
                    match e.contention_code() {
                        Some(rusqlite::ErrorCode::DatabaseLocked) => {
                            ConnectionEvent::Locked {
                                retry_in: RETRY_DELAY,
                            }
                            .emit();
                        }
                        _ => {
                            ConnectionEvent::Busy {
                                retry_in: RETRY_DELAY,
                            }
                            .emit();
                        }
                    }
                    std::thread::sleep(RETRY_DELAY);
                }
                done => return done,
            }
        }
    }

    fn run_once<T>(
        &self,
        begin: &str,
        body: &mut impl FnMut(&Transaction<'_>) -> StoreResult<T>,
        tx: &Transaction<'_>,
    ) -> StoreResult<T> {
        self.conn.execute_batch(begin)?;
        match body(tx) {
            Ok(value) => match self.conn.execute_batch("COMMIT TRANSACTION") {
                Ok(()) => Ok(value),
                Err(e) => {
                    let _ = self.conn.execute_batch("ROLLBACK TRANSACTION");
                    Err(e.into())
                }
            },
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK TRANSACTION");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseFile, DeferIndexes};
    use crate::database::lock::ConnectionLock;
    use crate::error::StoreError;
    use std::sync::Arc;

    fn open_writer() -> Database {
        Database::long_lived(
            &DatabaseFile::InMemory(None),
            LongestRollback::default(),
            DeferIndexes::InstallIfNotExist,
            Arc::new(ConnectionLock::new()),
        )
        .expect("open long-lived")
    }

    #[test]
    fn test_transaction_commits() {
        let db = open_writer();
        db.transaction(|tx| {
            tx.conn
                .execute(
                    "INSERT INTO checkpoints (slot_no, header_hash) VALUES (1, x'aa')",
                    [],
                )
                .map_err(Into::into)
                .map(|_| ())
        })
        .expect("transaction");

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM checkpoints", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_failed_body_rolls_back() {
        let db = open_writer();
        let result: StoreResult<()> = db.transaction(|tx| {
            tx.conn
                .execute(
                    "INSERT INTO checkpoints (slot_no, header_hash) VALUES (1, x'aa')",
                    [],
                )
                .map_err(StoreError::from)?;
            Err(StoreError::UnexpectedRow {
                context: "test",
                rows: vec![],
            })
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM checkpoints", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "write should have been rolled back");
    }

    #[test]
    fn test_transactions_compose_operations() {
        let db = open_writer();
        db.transaction(|tx| {
            tx.conn
                .execute(
                    "INSERT INTO checkpoints (slot_no, header_hash) VALUES (1, x'aa')",
                    [],
                )
                .map_err(StoreError::from)?;
            tx.conn
                .execute(
                    "INSERT INTO checkpoints (slot_no, header_hash) VALUES (2, x'bb')",
                    [],
                )
                .map_err(StoreError::from)?;
            Ok(())
        })
        .expect("composed transaction");

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM checkpoints", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}

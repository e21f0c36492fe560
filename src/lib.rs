//! chaindex - storage core for a pattern-queryable UTXO chain index
//!
//! One privileged long-lived writer ingests inputs and checkpoints while a
//! pool of short-lived connections serves queries, all against a single
//! SQLite file. The store guarantees bounded rollback: any slot within
//! `longest_rollback` of the tip can be returned to, and everything older
//! is eligible for pruning.

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod model;
pub mod pattern;

// Re-exports
pub use config::{ConnectionType, DatabaseFile, DeferIndexes, LongestRollback, StoreStats};
pub use database::{ConnectionLock, Database, Transaction};
pub use error::{StoreError, StoreResult};
pub use model::{
    BinaryData, Checkpoint, FoldedInput, Input, Policy, ResolvedInput, ScriptReference,
};
pub use pattern::{Pattern, SortDirection, StatusFlag};

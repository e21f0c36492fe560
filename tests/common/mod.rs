//! Common test fixtures
//!
//! Builders for domain records and helpers to open stores backed by
//! isolated in-memory databases or shared on-disk files.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chaindex::{
    BinaryData, Checkpoint, ConnectionLock, ConnectionType, Database, DatabaseFile, DeferIndexes,
    Input, LongestRollback, ResolvedInput,
};

/// Open a long-lived store on an isolated in-memory database.
pub fn open_isolated(longest_rollback: u64) -> Database {
    Database::long_lived(
        &DatabaseFile::InMemory(None),
        LongestRollback::new(longest_rollback).expect("non-zero rollback window"),
        DeferIndexes::InstallIfNotExist,
        Arc::new(ConnectionLock::new()),
    )
    .expect("open long-lived store")
}

/// Open a long-lived store on a file, sharing the given coordinator.
pub fn open_on_disk(path: &Path, longest_rollback: u64, lock: Arc<ConnectionLock>) -> Database {
    Database::long_lived(
        &DatabaseFile::OnDisk(path.to_path_buf()),
        LongestRollback::new(longest_rollback).expect("non-zero rollback window"),
        DeferIndexes::InstallIfNotExist,
        lock,
    )
    .expect("open long-lived store")
}

/// Open a short-lived connection on a file, sharing the given coordinator.
pub fn open_short_lived(
    path: &Path,
    mode: ConnectionType,
    longest_rollback: u64,
    lock: Arc<ConnectionLock>,
) -> Database {
    Database::short_lived(
        &DatabaseFile::OnDisk(path.to_path_buf()),
        mode,
        LongestRollback::new(longest_rollback).expect("non-zero rollback window"),
        lock,
    )
    .expect("open short-lived connection")
}

pub fn mk_checkpoint(slot_no: u64) -> Checkpoint {
    Checkpoint {
        slot_no,
        header_hash: slot_no.to_be_bytes().to_vec(),
    }
}

pub fn mk_input(reference: u8, address: &str, created_at: u64, spent_at: Option<u64>) -> Input {
    Input {
        ext_output_reference: vec![reference; 34],
        address: address.to_string(),
        value: vec![0, reference],
        datum_hash: None,
        script_hash: None,
        payment_credential: hex_credential(address),
        transaction_index: 0,
        output_index: reference as u32,
        created_at,
        spent_at,
    }
}

pub fn mk_resolved(reference: u8, address: &str, created_at: u64) -> ResolvedInput {
    ResolvedInput {
        input: mk_input(reference, address, created_at, None),
        datum: None,
        script: None,
    }
}

/// A resolved input carrying an inline datum payload.
pub fn mk_resolved_with_datum(
    reference: u8,
    address: &str,
    created_at: u64,
    datum: &[u8],
) -> ResolvedInput {
    let datum = BinaryData {
        binary_data_hash: vec![reference; 32],
        binary_data: datum.to_vec(),
    };
    let mut input = mk_input(reference, address, created_at, None);
    input.datum_hash = Some(datum.binary_data_hash.clone());
    ResolvedInput {
        input,
        datum: Some(datum),
        script: None,
    }
}

/// A deterministic credential derived from the address, so distinct
/// addresses get distinct credentials.
fn hex_credential(address: &str) -> String {
    let mut sum: u64 = 0;
    for b in address.bytes() {
        sum = sum.wrapping_mul(31).wrapping_add(b as u64);
    }
    format!("{:016x}", sum)
}

//! Writer/reader interleaving on a shared database file
//!
//! One long-lived writer ingests blocks while short-lived workers manage
//! patterns and query concurrently. The runs are bounded; the assertions
//! check for lost updates and torn state, not timing.

mod common;

use std::sync::Arc;
use std::thread;

use chaindex::{ConnectionLock, ConnectionType, Pattern, SortDirection, StatusFlag};
use common::*;

const BLOCKS: u64 = 25;
const PATTERNS_PER_WORKER: usize = 10;

#[test]
fn test_concurrent_writer_and_workers_converge() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("concurrent.sqlite3");
    let lock = Arc::new(ConnectionLock::new());

    // Open (and thereby migrate) the store before anyone else touches the
    // file; the handle moves into the writer thread.
    let writer_db = open_on_disk(&path, 100, Arc::clone(&lock));

    let mut handles = Vec::new();

    // The long-lived writer: one block per iteration, each block a
    // checkpoint plus an input.
    {
        handles.push(thread::spawn(move || {
            let db = writer_db;
            for block in 1..=BLOCKS {
                let slot = block * 10;
                db.transaction(|tx| {
                    tx.insert_checkpoints(&[mk_checkpoint(slot)])?;
                    tx.insert_inputs(&[mk_resolved(block as u8, "addr1ingested", slot)])?;
                    Ok(())
                })
                .expect("writer transaction");
            }
        }));
    }

    // Two short-lived read-write workers managing disjoint pattern sets
    // and interleaving reads.
    for worker in 0..2u8 {
        let path = path.clone();
        let lock = Arc::clone(&lock);
        handles.push(thread::spawn(move || {
            for i in 0..PATTERNS_PER_WORKER {
                let db = open_short_lived(&path, ConnectionType::ReadWrite, 100, Arc::clone(&lock));
                let pattern = Pattern::Address(format!("addr1worker{}n{}", worker, i));
                db.transaction(|tx| tx.insert_patterns(std::slice::from_ref(&pattern)))
                    .expect("insert pattern");
                db.transaction(|tx| tx.list_checkpoints_desc())
                    .expect("list checkpoints");
            }

            // A read-only pass over whatever has been ingested so far.
            let db = open_short_lived(&path, ConnectionType::ReadOnly, 100, lock);
            db.transaction(|tx| {
                tx.fold_inputs(&Pattern::Any, StatusFlag::Any, SortDirection::Asc, |_| {})
            })
            .expect("fold inputs");
        }));
    }

    for handle in handles {
        handle.join().expect("no worker may panic or deadlock");
    }

    // Post-state must match the serialized application of all operations.
    let db = open_on_disk(&path, 100, lock);
    let stats = db.transaction(|tx| tx.stats()).unwrap();
    assert_eq!(stats.checkpoint_count, BLOCKS);
    assert_eq!(stats.input_count, BLOCKS);
    assert_eq!(stats.tip, Some(BLOCKS * 10));
    assert_eq!(
        stats.pattern_count as usize,
        2 * PATTERNS_PER_WORKER,
        "every pattern insert must survive"
    );

    let patterns = db.transaction(|tx| tx.list_patterns()).unwrap();
    for worker in 0..2u8 {
        for i in 0..PATTERNS_PER_WORKER {
            let expected = Pattern::Address(format!("addr1worker{}n{}", worker, i));
            assert!(patterns.contains(&expected), "missing {expected}");
        }
    }
}

#[test]
fn test_disjoint_short_lived_writers_union() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("patterns.sqlite3");
    let lock = Arc::new(ConnectionLock::new());
    {
        let _db = open_on_disk(&path, 10, Arc::clone(&lock));
    }

    let mut handles = Vec::new();
    for worker in 0..2u8 {
        let path = path.clone();
        let lock = Arc::clone(&lock);
        handles.push(thread::spawn(move || {
            let db = open_short_lived(&path, ConnectionType::ReadWrite, 10, lock);
            db.transaction(|tx| {
                tx.insert_patterns(&[Pattern::Address(format!("addr1disjoint{}", worker))])
            })
            .expect("insert");
        }));
    }
    for handle in handles {
        handle.join().expect("no deadlock");
    }

    let db = open_on_disk(&path, 10, lock);
    let mut listed = db.transaction(|tx| tx.list_patterns()).unwrap();
    listed.sort();
    assert_eq!(
        listed,
        vec![
            Pattern::Address("addr1disjoint0".into()),
            Pattern::Address("addr1disjoint1".into()),
        ]
    );
}

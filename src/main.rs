//! chaindex - maintenance CLI for the index database
//!
//! Operations an operator runs against the store while the indexer itself
//! is stopped: inspect, prune, roll back.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chaindex::{ConnectionLock, Database, DatabaseFile, DeferIndexes, LongestRollback};

#[derive(Parser, Debug)]
#[command(name = "chaindex")]
#[command(about = "Maintenance operations for a chaindex database")]
struct Args {
    /// Path to the index database
    #[arg(long, env = "CHAINDEX_DATABASE", default_value = "./chaindex.sqlite3")]
    database: PathBuf,

    /// Rollback window, in slots
    #[arg(long, env = "CHAINDEX_LONGEST_ROLLBACK", default_value = "2160")]
    longest_rollback: u64,

    /// Skip installing non-essential indexes on open
    #[arg(long, env = "CHAINDEX_DEFER_INDEXES")]
    defer_indexes: bool,

    /// Log level
    #[arg(long, env = "CHAINDEX_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print schema version, tip and row counts
    Info,
    /// Delete inputs and binary data outside the retention window
    Prune,
    /// Roll the store back to a slot within the rollback window
    Rollback {
        #[arg(long)]
        slot: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let longest_rollback = LongestRollback::new(args.longest_rollback)
        .ok_or_else(|| anyhow::anyhow!("--longest-rollback must be at least 1"))?;
    let defer_indexes = if args.defer_indexes {
        DeferIndexes::SkipNonEssential
    } else {
        DeferIndexes::InstallIfNotExist
    };

    tracing::info!(database = %args.database.display(), "opening index database");
    let file = DatabaseFile::OnDisk(args.database);
    let lock = Arc::new(ConnectionLock::new());
    let db = Database::long_lived(&file, longest_rollback, defer_indexes, lock)?;

    match args.command {
        Command::Info => {
            let stats = db.transaction(|tx| tx.stats())?;
            println!("schema version : {}", stats.schema_version);
            match stats.tip {
                Some(tip) => println!("tip            : slot {}", tip),
                None => println!("tip            : none (empty store)"),
            }
            println!("inputs         : {}", stats.input_count);
            println!("checkpoints    : {}", stats.checkpoint_count);
            println!("patterns       : {}", stats.pattern_count);
            println!("binary data    : {}", stats.binary_data_count);
            println!("scripts        : {}", stats.script_count);
        }
        Command::Prune => {
            let (inputs, binary_data) = db.transaction(|tx| {
                let inputs = tx.prune_inputs()?;
                let binary_data = tx.prune_binary_data()?;
                Ok((inputs, binary_data))
            })?;
            tracing::info!(inputs, binary_data, "pruned");
            println!("pruned {} inputs, {} binary data rows", inputs, binary_data);
        }
        Command::Rollback { slot } => {
            let new_tip = db.transaction(|tx| tx.rollback_to(slot))?;
            match new_tip {
                Some(tip) => println!("rolled back, tip is now slot {}", tip),
                None => println!("rolled back, store is empty"),
            }
        }
    }

    Ok(())
}

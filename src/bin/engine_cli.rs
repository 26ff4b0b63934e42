//! Diagnostic CLI for the state engine.
//!
//! Opens a store and prints its current height, total balance and
//! diagnostic hash, or a single account's balance. Not a wallet, not an
//! HTTP API — a smoke-test entry point, the same role `inspect_db.rs`
//! and `check_heights.rs` play for the block indexer.
//!
//! ```bash
//! ledgerstate-cli --db-path ./data/state.db height
//! ledgerstate-cli --db-path ./data/state.db balance <hex-address>
//! ```

use clap::{Parser, Subcommand};
use ledgerstate::{Address, Engine, EngineConfig};

#[derive(Parser, Debug)]
#[clap(name = "ledgerstate-cli")]
#[clap(about = "Inspect a state-engine store", long_about = None)]
struct Args {
    /// Path to the RocksDB store directory. Omit to inspect an empty
    /// in-memory store (useful only for smoke-testing the CLI itself).
    #[clap(long)]
    db_path: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current height marker.
    Height,
    /// Print total balance and the diagnostic hash at the current height.
    Summary,
    /// Print one account's balance.
    Balance {
        /// Hex-encoded address.
        address: String,
    },
}

fn main() {
    ledgerstate::telemetry::init_tracing(ledgerstate::telemetry::TelemetryConfig::default())
        .expect("failed to initialize logging");

    let args = Args::parse();
    let config = match &args.db_path {
        Some(path) => EngineConfig::on_disk(path.clone()),
        None => EngineConfig::in_memory(),
    };

    let engine = match Engine::open(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("failed to open store: {e}");
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Command::Height => engine.state_height().map(|h| println!("height: {h}")),
        Command::Summary => engine.total_balance().and_then(|total| {
            engine.hash().map(|hash| {
                println!("height: {}", engine.state_height().unwrap_or(0));
                println!("total_balance: {total}");
                println!("hash: {hash}");
            })
        }),
        Command::Balance { address } => match hex::decode(&address) {
            Ok(bytes) => engine.balance(&Address::new(bytes), None).map(|b| println!("balance: {b}")),
            Err(e) => {
                eprintln!("invalid hex address: {e}");
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

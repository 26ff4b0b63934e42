//! Persistent, rollback-capable account-balance state engine for a
//! linear blockchain: ingests blocks, maintains per-account balances via
//! a backward-linked change-record chain, tracks transaction inclusion,
//! validates candidate transaction batches, and rolls back atomically
//! to any prior height.

pub mod applier;
pub mod balance;
pub mod block;
pub mod chain;
pub mod config;
pub mod error;
pub mod rollback;
pub mod store;
pub mod telemetry;
pub mod transaction;
pub mod types;
pub mod validator;

pub use block::{Block, ConsensusModule, FixedFeeDistribution};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use transaction::{Transaction, ValidationResult};
pub use types::{Address, ChangeRecord, Fingerprint, Height};

use store::{MemStore, RocksStore, Store};

/// The engine is a single owned object; there is no process-wide
/// singleton (§9). Callers instantiate one per store path and hold it
/// behind whatever lock their own concurrency model requires — the
/// engine itself enforces single-writer discipline only via `&mut self`
/// on the mutating operations.
pub struct Engine {
    store: Box<dyn Store>,
}

impl Engine {
    /// Opens (creating if needed) the store described by `config`. If a
    /// prior run left an uncommitted marker behind, it is discarded
    /// before this returns (§4.1).
    pub fn open(config: &EngineConfig) -> EngineResult<Self> {
        let store: Box<dyn Store> = match &config.db_path {
            Some(path) => Box::new(RocksStore::open(path)?),
            None => Box::new(MemStore::new()),
        };
        Ok(Self { store })
    }

    pub fn open_in_memory() -> Self {
        Self {
            store: Box::new(MemStore::new()),
        }
    }

    /// Releases the store. Buffered transactions never outlive a single
    /// `process_block`/`rollback_to` call, so there is nothing to flush
    /// beyond dropping the handle.
    pub fn close(self) {
        drop(self.store);
    }

    /// Applies a block: fee-seeds, folds transaction deltas, enforces
    /// non-negativity, writes a new height worth of change records, and
    /// commits atomically. On error, nothing was persisted — the engine
    /// is left exactly as it was before the call (§4.5, §7).
    pub fn process_block(&mut self, block: &block::Block, consensus: &dyn block::ConsensusModule) -> EngineResult<()> {
        let txn = applier::process_block(self.store.as_ref(), block, consensus)?;
        let tx_count = block.transactions.len();
        self.store.commit(txn)?;
        let height = chain::height_marker(self.store.as_ref())?;
        tracing::info!(height, tx_count, "block applied");
        Ok(())
    }

    /// Reverts to `target`, unwinding every touched account's chain and
    /// its inclusion entries, then resets the height marker (§4.7).
    /// Idempotent: rolling back to the current height is a no-op.
    pub fn rollback_to(&mut self, target: Height) -> EngineResult<()> {
        let txn = rollback::rollback_to(self.store.as_ref(), target)?;
        self.store.commit(txn)?;
        tracing::info!(height = target, "rolled back");
        Ok(())
    }

    pub fn balance(&self, address: &Address, at_height: Option<Height>) -> EngineResult<u64> {
        balance::balance(self.store.as_ref(), address, at_height)
    }

    pub fn balance_with_confirmations(&self, address: &Address, confirmations: u32) -> EngineResult<u64> {
        balance::balance_with_confirmations(self.store.as_ref(), address, confirmations)
    }

    /// `Some(h)` iff `fingerprint` was first included at a height
    /// strictly below `upper_bound` (default: unbounded).
    pub fn included(&self, fingerprint: &Fingerprint, upper_bound: Option<Height>) -> EngineResult<Option<Height>> {
        let ceiling = upper_bound.unwrap_or(Height::MAX);
        Ok(chain::included(self.store.as_ref(), fingerprint)?.filter(|&h| h < ceiling))
    }

    /// Returns the largest subset of `candidates` that is
    /// simultaneously valid: authorship-correct, individually
    /// well-formed, not already included, and non-negative-balance
    /// when jointly applied (§4.6).
    pub fn validate(&self, candidates: &[Transaction], at_height: Option<Height>) -> EngineResult<Vec<Transaction>> {
        validator::validate(self.store.as_ref(), candidates, at_height)
    }

    /// All transactions ever touching `address`, newest first.
    pub fn account_transactions(&self, address: &Address) -> EngineResult<Vec<Transaction>> {
        balance::account_transactions(self.store.as_ref(), address)
    }

    pub fn state_height(&self) -> EngineResult<Height> {
        chain::height_marker(self.store.as_ref())
    }

    pub fn total_balance(&self) -> EngineResult<u64> {
        let addresses = chain::all_addresses(self.store.as_ref())?;
        balance::total_balance(self.store.as_ref(), addresses)
    }

    /// Diagnostic fingerprint, not a commitment (§6).
    pub fn hash(&self) -> EngineResult<i32> {
        let addresses = chain::all_addresses(self.store.as_ref())?;
        balance::hash(self.store.as_ref(), addresses)
    }
}

/// Error taxonomy surfaced by the engine (spec §6/§7).
///
/// `DuplicateInclusion`, `NegativeBalance` and `UnknownTransactionVariant` are
/// returned to the caller and typically cause the enclosing block-storage
/// layer to reject the block. `Store` wraps the persistent-store adapter's
/// own failures and is fatal for the engine instance (§7: the caller must
/// close and reopen). `Corruption` surfaces a violated read-path invariant
/// (I2/I3) — the engine fails loudly rather than returning a misleading
/// balance.
use thiserror::Error;

use crate::types::{Address, Fingerprint};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("transaction {0} already included")]
    DuplicateInclusion(Fingerprint),

    #[error("account {0} would go negative")]
    NegativeBalance(Address),

    #[error("unknown transaction variant")]
    UnknownTransactionVariant,

    #[error("store error: {0}")]
    Store(#[from] rocksdb::Error),

    #[error("store corruption: {0}")]
    Corruption(String),

    #[error("column family not found: {0}")]
    MissingColumnFamily(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Core data model (spec §3): opaque addresses and transaction
/// fingerprints, the signed-balance working type, and the change-record
/// chain that threads through the persistent store.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

/// Opaque byte-string account identifier. Equality by bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub Vec<u8>);

impl Address {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0))
    }
}

/// Opaque transaction fingerprint (its signature suffices).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub Vec<u8>);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(&self.0))
    }
}

/// Non-negative integer labeling each applied block; 0 means pre-genesis.
pub type Height = u32;

/// Signed-only so the working map can detect underflow during computation;
/// persisted values must always be >= 0 (invariant I3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: i64,
}

impl AccountState {
    pub fn new(balance: i64) -> Self {
        Self { balance }
    }
}

/// A single entry in a change record's `reason` list: either a transaction
/// that touched the account, or a synthetic fee-credit marker. Fee credits
/// are kept distinct from transactions so the rollback controller's
/// inclusion-index cleanup (§4.7) never mistakes one for a fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReasonEntry {
    Tx(Transaction),
    FeeCredit(u64),
}

pub type Reason = Vec<ReasonEntry>;

/// Immutable tuple stored per `(address, height)`. `prev_height = 0` means
/// "no prior change" (invariant I2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub state: AccountState,
    pub reason: Reason,
    pub prev_height: Height,
}

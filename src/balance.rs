/// Balance Engine (§4.4): point-in-time balance queries by walking the
/// per-account chain backwards. Also hosts the diagnostic `hash()` and
/// `account_transactions` surfaced on the public `Engine` API.
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::chain;
use crate::error::EngineResult;
use crate::store::Store;
use crate::transaction::Transaction;
use crate::types::{Address, Height, ReasonEntry};

/// Walks backwards from `last_change_height[a]` for the first record at
/// height `<= at_height`, defaulting to the current height marker.
pub fn balance(store: &dyn Store, address: &Address, at_height: Option<Height>) -> EngineResult<u64> {
    let ceiling = match at_height {
        Some(h) => h,
        None => chain::height_marker(store)?,
    };

    let mut height = chain::last_change_height(store, address)?;
    while height > 0 {
        if height <= ceiling {
            let record = chain::require_change_record(store, address, height)?;
            return Ok(record.state.balance.max(0) as u64);
        }
        let record = chain::require_change_record(store, address, height)?;
        height = record.prev_height;
    }
    Ok(0)
}

pub fn balance_with_confirmations(store: &dyn Store, address: &Address, confirmations: u32) -> EngineResult<u64> {
    let current = chain::height_marker(store)?;
    let target = if confirmations as u64 >= current as u64 {
        1
    } else {
        current - confirmations
    };
    let target = target.max(1);
    balance(store, address, Some(target))
}

/// Sum of `balance(a)` across every address ever touched.
pub fn total_balance(store: &dyn Store, addresses: impl IntoIterator<Item = Address>) -> EngineResult<u64> {
    let mut total: u64 = 0;
    for address in addresses {
        total = total.saturating_add(balance(store, &address, None)?);
    }
    Ok(total)
}

/// Walks the full chain for `address`, newest first, collecting every
/// `Payment`-typed reason entry — a generalization of address-history
/// indexing onto this engine's reason-chain representation.
pub fn account_transactions(store: &dyn Store, address: &Address) -> EngineResult<Vec<Transaction>> {
    let mut out = Vec::new();
    let mut height = chain::last_change_height(store, address)?;
    while height > 0 {
        let record = chain::require_change_record(store, address, height)?;
        for entry in &record.reason {
            if let ReasonEntry::Tx(tx) = entry {
                if !tx.is_genesis() {
                    out.push(tx.clone());
                }
            }
        }
        height = record.prev_height;
    }
    Ok(out)
}

/// Diagnostic fingerprint (§6): a stable hash of the sorted
/// `(address, balance)` pairs for all non-zero balances. Not a
/// commitment, purely for test/equivalence checks.
pub fn hash(store: &dyn Store, addresses: impl IntoIterator<Item = Address>) -> EngineResult<i32> {
    let mut sorted: BTreeMap<Address, u64> = BTreeMap::new();
    for address in addresses {
        let b = balance(store, &address, None)?;
        if b > 0 {
            sorted.insert(address, b);
        }
    }

    let mut hasher = DefaultHasher::new();
    for (address, bal) in &sorted {
        address.as_bytes().hash(&mut hasher);
        bal.hash(&mut hasher);
    }
    Ok(hasher.finish() as i32)
}

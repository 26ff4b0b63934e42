/// Block Applier (§4.5): folds a block's transactions and fee
/// distribution into a working change map, enforces non-negativity, and
/// writes a new height worth of change records in one atomic commit.
use std::collections::HashMap;

use crate::block::Block;
use crate::chain;
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, StoreTransaction};
use crate::types::{AccountState, ChangeRecord, Height, Reason, ReasonEntry};

struct WorkingEntry {
    balance: i64,
    reason: Reason,
}

/// Genesis transactions are only meaningful as the very first block
/// (§4.8); a Genesis transaction reaching the applier at any other
/// height has no valid interpretation, so it is rejected the same way
/// a transaction of an unrecognized variant would be.
pub fn genesis_allowed_at(height: Height) -> bool {
    height == 0
}

pub fn process_block(store: &dyn Store, block: &Block, consensus: &dyn crate::block::ConsensusModule) -> EngineResult<StoreTransaction> {
    let current_height = chain::height_marker(store)?;

    for tx in &block.transactions {
        if tx.is_genesis() && !genesis_allowed_at(current_height) {
            return Err(EngineError::UnknownTransactionVariant);
        }
        let fp = tx.fingerprint();
        if chain::included(store, &fp)?.is_some() {
            return Err(EngineError::DuplicateInclusion(fp));
        }
    }

    let mut working: HashMap<crate::types::Address, WorkingEntry> = HashMap::new();

    let fee_dist = consensus.fee_distribution(block);
    for (address, fee_amount) in fee_dist {
        let base = crate::balance::balance(store, &address, None)? as i64;
        working.insert(
            address,
            WorkingEntry {
                balance: base + fee_amount as i64,
                reason: vec![ReasonEntry::FeeCredit(fee_amount)],
            },
        );
    }

    for tx in &block.transactions {
        for (address, delta) in tx.balance_changes() {
            if !working.contains_key(&address) {
                let base = crate::balance::balance(store, &address, None)? as i64;
                working.insert(
                    address.clone(),
                    WorkingEntry {
                        balance: base,
                        reason: Vec::new(),
                    },
                );
            }
            let entry = working.get_mut(&address).expect("just inserted above");
            entry.balance += delta;
            entry.reason.insert(0, ReasonEntry::Tx(tx.clone()));
        }
    }

    for (address, entry) in &working {
        if entry.balance < 0 {
            return Err(EngineError::NegativeBalance(address.clone()));
        }
    }

    let new_height = current_height + 1;
    let mut txn = StoreTransaction::new();
    for (address, entry) in working {
        let prev = chain::last_change_height(store, &address)?;
        let record = ChangeRecord {
            state: AccountState::new(entry.balance),
            reason: entry.reason.clone(),
            prev_height: prev,
        };
        for reason_entry in &entry.reason {
            if let ReasonEntry::Tx(tx) = reason_entry {
                chain::set_included(&mut txn, &tx.fingerprint(), new_height);
            }
        }
        chain::put_change_record(&mut txn, &address, new_height, &record);
        chain::set_last_change_height(&mut txn, &address, new_height);
    }
    chain::set_height_marker(&mut txn, new_height);

    Ok(txn)
}

/// Rollback Controller (§4.7): reverts state to a target height by
/// unwinding every account's history chain, removing inclusion entries,
/// and resetting the height marker. Idempotent — rolling back to the
/// current height (or to a height already at or below every account's
/// chain) is a no-op per address.
use crate::chain;
use crate::error::EngineResult;
use crate::store::{Store, StoreTransaction};
use crate::types::{Height, ReasonEntry};

pub fn rollback_to(store: &dyn Store, target: Height) -> EngineResult<StoreTransaction> {
    let mut txn = StoreTransaction::new();

    for address in chain::all_addresses(store)? {
        let mut height = chain::last_change_height(store, &address)?;
        while height > target {
            let record = chain::require_change_record(store, &address, height)?;
            for entry in &record.reason {
                if let ReasonEntry::Tx(tx) = entry {
                    chain::delete_included(&mut txn, &tx.fingerprint());
                }
            }
            chain::delete_change_record(&mut txn, &address, height);
            height = record.prev_height;
        }

        let current = chain::last_change_height(store, &address)?;
        if current != height {
            if height == 0 {
                chain::delete_last_change_height(&mut txn, &address);
            } else {
                chain::set_last_change_height(&mut txn, &address, height);
            }
        }
    }

    chain::set_height_marker(&mut txn, target);
    Ok(txn)
}

/// Batch Validator (§4.6): fixed-point removal of the minimum number of
/// candidate transactions needed to restore non-negative balances,
/// removing largest-amount-first per offending sender.
use std::collections::{HashMap, HashSet};

use crate::applier::genesis_allowed_at;
use crate::balance;
use crate::chain;
use crate::error::EngineResult;
use crate::store::Store;
use crate::transaction::{Transaction, ValidationResult};
use crate::types::{Address, Fingerprint, Height};

pub fn validate(store: &dyn Store, candidates: &[Transaction], at_height: Option<Height>) -> EngineResult<Vec<Transaction>> {
    let ceiling = match at_height {
        Some(h) => h,
        None => chain::height_marker(store)?,
    };

    let mut txs: Vec<Transaction> = Vec::with_capacity(candidates.len());
    for tx in candidates {
        if tx.is_genesis() && !genesis_allowed_at(ceiling) {
            continue;
        }
        if tx.validate() != ValidationResult::Ok {
            continue;
        }
        if !tx.authorship_ok() {
            continue;
        }
        if let Some(h) = chain::included(store, &tx.fingerprint())? {
            if h <= ceiling {
                continue;
            }
        }
        txs.push(tx.clone());
    }

    loop {
        let working = fold_deltas(store, &txs, ceiling)?;
        let offenders: Vec<Address> = working
            .iter()
            .filter(|(_, &bal)| bal < 0)
            .map(|(a, _)| a.clone())
            .collect();

        if offenders.is_empty() {
            return Ok(txs);
        }

        let mut to_remove: HashSet<Fingerprint> = HashSet::new();
        for offender in &offenders {
            // Stable sort: ties keep the candidates' original relative order.
            let mut payments: Vec<&Transaction> = txs
                .iter()
                .filter(|t| t.sender().map_or(false, |s| s == offender))
                .collect();
            payments.sort_by(|a, b| b.amount().cmp(&a.amount()));

            let mut running = *working.get(offender).unwrap_or(&0);
            for t in payments {
                if running >= 0 {
                    break;
                }
                to_remove.insert(t.fingerprint());
                running += t.amount() as i64 + t.fee() as i64;
            }
        }

        txs.retain(|t| !to_remove.contains(&t.fingerprint()));
        if txs.is_empty() {
            return Ok(Vec::new());
        }
    }
}

fn fold_deltas(store: &dyn Store, txs: &[Transaction], at_height: Height) -> EngineResult<HashMap<Address, i64>> {
    let mut working: HashMap<Address, i64> = HashMap::new();
    for t in txs {
        for (address, delta) in t.balance_changes() {
            if !working.contains_key(&address) {
                let base = balance::balance(store, &address, Some(at_height))? as i64;
                working.insert(address.clone(), base);
            }
            *working.get_mut(&address).unwrap() += delta;
        }
    }
    Ok(working)
}

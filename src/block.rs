/// Block and consensus-module collaborator contracts (§6). The engine
/// depends only on this trait surface, never on consensus internals
/// (§9 "Consensus module coupling").
use std::collections::HashMap;

use crate::types::Address;
use crate::transaction::Transaction;

/// Pure function of a block: who receives its collected fees.
pub trait ConsensusModule {
    fn fee_distribution(&self, block: &Block) -> HashMap<Address, u64>;
}

/// A fixed fee split, useful for tests and for chains where fee
/// distribution doesn't depend on anything beyond the block itself.
pub struct FixedFeeDistribution(pub HashMap<Address, u64>);

impl ConsensusModule for FixedFeeDistribution {
    fn fee_distribution(&self, _block: &Block) -> HashMap<Address, u64> {
        self.0.clone()
    }
}

pub struct Block {
    pub transactions: Vec<Transaction>,
    pub reference: Option<Vec<u8>>,
}

impl Block {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            reference: None,
        }
    }

    pub fn with_reference(transactions: Vec<Transaction>, reference: Vec<u8>) -> Self {
        Self {
            transactions,
            reference: Some(reference),
        }
    }
}

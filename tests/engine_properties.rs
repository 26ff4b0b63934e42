//! Integration tests exercising the concrete scenarios and property-style
//! checks from spec.md §8, through the public `Engine` API only.

use std::collections::HashMap;

use ledgerstate::{Address, Block, Engine, EngineError, FixedFeeDistribution, Transaction};
use ripemd160::Ripemd160;
use secp256k1::{Message, Secp256k1};
use sha2::{Digest, Sha256};

fn addr(byte: u8) -> Address {
    Address::new(vec![byte; 20])
}

fn hash160(data: &[u8]) -> Vec<u8> {
    Ripemd160::digest(&Sha256::digest(data)).to_vec()
}

/// Deterministic xorshift RNG so signed test fixtures don't need a real
/// entropy source or an extra dev-dependency.
struct Xorshift(u64);
impl secp256k1::rand::RngCore for Xorshift {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), secp256k1::rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// A signing key, deterministically derived from `seed`, plus the
/// address that its hash160 resolves to.
struct SenderKey {
    secp: Secp256k1<secp256k1::All>,
    sk: secp256k1::SecretKey,
    address: Address,
}

fn sender_key(seed: u64) -> SenderKey {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut Xorshift(seed));
    let address = Address::new(hash160(&pk.serialize()));
    SenderKey { secp, sk, address }
}

/// Builds a properly-signed payment from `key` so `authorship_ok()`
/// passes against the engine's real signature-recovery check.
fn signed_payment(key: &SenderKey, recipient: Address, amount: u64, fee: u64) -> Transaction {
    let message = Transaction::signing_message(&key.address, &recipient, amount, fee, 0);
    let msg = Message::from_slice(&message).unwrap();
    let (recid, sig) = key.secp.sign_ecdsa_recoverable(&msg, &key.sk).serialize_compact();
    let mut signature = sig.to_vec();
    signature.push(recid.to_i32() as u8);
    Transaction::payment(key.address.clone(), recipient, amount, fee, 0, signature)
}

fn genesis_block(accounts: &[(u8, u64)]) -> Block {
    let transactions = accounts
        .iter()
        .map(|&(a, amount)| Transaction::genesis(addr(a), amount, 0))
        .collect();
    Block::new(transactions)
}

fn genesis_block_for(account: &Address, amount: u64) -> Block {
    Block::new(vec![Transaction::genesis(account.clone(), amount, 0)])
}

fn no_fees() -> FixedFeeDistribution {
    FixedFeeDistribution(HashMap::new())
}

fn self_fee(account: u8, amount: u64) -> FixedFeeDistribution {
    let mut fees = HashMap::new();
    fees.insert(addr(account), amount);
    FixedFeeDistribution(fees)
}

/// S3: a validator candidate list whose combined outflow overdraws the
/// sender must trim the single largest-amount transaction and keep the
/// rest in their original relative order.
#[test]
fn validator_trims_the_minimum_overdraft_transaction() {
    let mut engine = Engine::open_in_memory();

    let key = sender_key(1);
    engine
        .process_block(&genesis_block_for(&key.address, 1_000_000), &no_fees())
        .unwrap();

    let t1 = signed_payment(&key, addr(1), 600_000, 1);
    let t2 = signed_payment(&key, addr(2), 500_000, 1);
    let t3 = signed_payment(&key, addr(3), 100, 1);

    let candidates = vec![t1.clone(), t2.clone(), t3.clone()];
    let accepted = engine.validate(&candidates, None).unwrap();

    assert_eq!(accepted.len(), 2);
    assert!(!accepted.iter().any(|t| t.amount() == 600_000));
    // Stable order preserved: t2 (500_000) still precedes t3 (100).
    assert_eq!(accepted[0].amount(), 500_000);
    assert_eq!(accepted[1].amount(), 100);
}

/// P5: validator soundness. The accepted subset applies cleanly as a
/// block, and re-adding the rejected transaction on top of it would
/// overdraw the sender again.
#[test]
fn validator_accepted_subset_applies_and_rejected_member_would_not() {
    let mut engine = Engine::open_in_memory();
    let key = sender_key(2);
    engine
        .process_block(&genesis_block_for(&key.address, 1_000_000), &no_fees())
        .unwrap();

    let t1 = signed_payment(&key, addr(1), 700_000, 1);
    let t2 = signed_payment(&key, addr(2), 400_000, 1);

    let candidates = vec![t1.clone(), t2.clone()];
    let accepted = engine.validate(&candidates, None).unwrap();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].amount(), 400_000);

    engine.process_block(&Block::new(accepted), &no_fees()).unwrap();
    assert_eq!(engine.balance(&key.address, None).unwrap(), 1_000_000 - 400_000 - 1);

    let rejected_block = Block::new(vec![t1]);
    let err = engine.process_block(&rejected_block, &no_fees()).unwrap_err();
    assert!(matches!(err, EngineError::NegativeBalance(_)));
}

/// P1: conservation. Summing a genesis seed, then applying payment
/// blocks that redistribute value and fees within themselves, never
/// changes `total_balance()`.
#[test]
fn conservation_holds_across_payment_blocks() {
    let mut engine = Engine::open_in_memory();
    let seed = genesis_block(&[(0, 1_000_000), (1, 1_000_000), (2, 1_000_000)]);
    engine.process_block(&seed, &no_fees()).unwrap();
    let total_at_genesis = engine.total_balance().unwrap();
    assert_eq!(total_at_genesis, 3_000_000);

    let p1 = Transaction::payment(addr(0), addr(1), 1_000, 5, 0, vec![1u8; 65]);
    engine
        .process_block(&Block::new(vec![p1]), &self_fee(0, 5))
        .unwrap();
    assert_eq!(engine.total_balance().unwrap(), total_at_genesis);

    let p2 = Transaction::payment(addr(1), addr(2), 2_000, 7, 0, vec![2u8; 65]);
    engine
        .process_block(&Block::new(vec![p2]), &self_fee(1, 7))
        .unwrap();
    assert_eq!(engine.total_balance().unwrap(), total_at_genesis);
}

/// P2: inclusion monotonicity. A committed transaction stays included at
/// its original height until a rollback unwinds past it.
#[test]
fn inclusion_is_monotonic_until_rollback() {
    let mut engine = Engine::open_in_memory();
    engine
        .process_block(&genesis_block(&[(0, 1_000_000)]), &no_fees())
        .unwrap();

    let payment = Transaction::payment(addr(0), addr(1), 500, 10, 0, vec![9u8; 65]);
    let fp = payment.fingerprint();
    engine
        .process_block(&Block::new(vec![payment]), &self_fee(0, 10))
        .unwrap();

    assert_eq!(engine.included(&fp, None).unwrap(), Some(2));

    // Unrelated further blocks don't disturb a settled inclusion entry.
    engine
        .process_block(&Block::new(vec![]), &no_fees())
        .unwrap();
    assert_eq!(engine.included(&fp, None).unwrap(), Some(2));

    engine.rollback_to(1).unwrap();
    assert!(engine.included(&fp, None).unwrap().is_none());
}

/// P3: rollback is a left-inverse. Applying a block and then rolling
/// back to the height before it reproduces that height's balances,
/// inclusion state and height marker exactly.
#[test]
fn rollback_is_a_left_inverse() {
    let mut engine = Engine::open_in_memory();
    engine
        .process_block(&genesis_block(&[(0, 1_000_000), (1, 1_000_000)]), &no_fees())
        .unwrap();

    let snapshot_height = engine.state_height().unwrap();
    let snapshot_hash = engine.hash().unwrap();
    let snapshot_total = engine.total_balance().unwrap();

    let payment = Transaction::payment(addr(0), addr(1), 250, 5, 0, vec![4u8; 65]);
    engine
        .process_block(&Block::new(vec![payment]), &self_fee(0, 5))
        .unwrap();
    assert_ne!(engine.hash().unwrap(), snapshot_hash);

    engine.rollback_to(snapshot_height).unwrap();

    assert_eq!(engine.state_height().unwrap(), snapshot_height);
    assert_eq!(engine.hash().unwrap(), snapshot_hash);
    assert_eq!(engine.total_balance().unwrap(), snapshot_total);
}

/// P4: no committed operation leaves a negative balance observable
/// through the public API, whether the block succeeds or is rejected.
#[test]
fn no_negative_balance_survives_a_rejected_block() {
    let mut engine = Engine::open_in_memory();
    engine
        .process_block(&genesis_block(&[(0, 100)]), &no_fees())
        .unwrap();

    let overdraft = Transaction::payment(addr(0), addr(1), 1_000, 1, 0, vec![5u8; 65]);
    let err = engine
        .process_block(&Block::new(vec![overdraft]), &no_fees())
        .unwrap_err();
    assert!(matches!(err, EngineError::NegativeBalance(_)));

    assert_eq!(engine.balance(&addr(0), None).unwrap(), 100);
    assert_eq!(engine.state_height().unwrap(), 1);
}

/// P6: double-include rejection leaves the state untouched.
#[test]
fn duplicate_inclusion_rejected_and_state_unchanged() {
    let mut engine = Engine::open_in_memory();
    engine
        .process_block(&genesis_block(&[(0, 1_000_000)]), &no_fees())
        .unwrap();

    let payment = Transaction::payment(addr(0), addr(1), 500, 10, 0, vec![6u8; 65]);
    engine
        .process_block(&Block::new(vec![payment.clone()]), &self_fee(0, 10))
        .unwrap();
    let hash_before = engine.hash().unwrap();

    let err = engine
        .process_block(&Block::new(vec![payment]), &self_fee(0, 10))
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateInclusion(_)));
    assert_eq!(engine.hash().unwrap(), hash_before);
    assert_eq!(engine.state_height().unwrap(), 2);
}

/// P7: rolling back twice to the same height is idempotent.
#[test]
fn rollback_twice_to_same_height_is_idempotent() {
    let mut engine = Engine::open_in_memory();
    engine
        .process_block(&genesis_block(&[(0, 1_000_000)]), &no_fees())
        .unwrap();

    let payment = Transaction::payment(addr(0), addr(1), 500, 10, 0, vec![7u8; 65]);
    engine
        .process_block(&Block::new(vec![payment]), &self_fee(0, 10))
        .unwrap();

    engine.rollback_to(1).unwrap();
    let height_after_first = engine.state_height().unwrap();
    let hash_after_first = engine.hash().unwrap();

    engine.rollback_to(1).unwrap();
    assert_eq!(engine.state_height().unwrap(), height_after_first);
    assert_eq!(engine.hash().unwrap(), hash_after_first);
}

/// `account_transactions` surfaces every payment that ever touched an
/// address, newest first, across multiple blocks.
#[test]
fn account_transactions_collects_payment_history_newest_first() {
    let mut engine = Engine::open_in_memory();
    engine
        .process_block(&genesis_block(&[(0, 1_000_000), (1, 0)]), &no_fees())
        .unwrap();

    let p1 = Transaction::payment(addr(0), addr(1), 100, 1, 0, vec![8u8; 65]);
    let p1_fp = p1.fingerprint();
    engine
        .process_block(&Block::new(vec![p1]), &self_fee(0, 1))
        .unwrap();

    let p2 = Transaction::payment(addr(0), addr(1), 200, 1, 0, vec![9u8; 65]);
    let p2_fp = p2.fingerprint();
    engine
        .process_block(&Block::new(vec![p2]), &self_fee(0, 1))
        .unwrap();

    let history = engine.account_transactions(&addr(1)).unwrap();
    let fingerprints: Vec<_> = history.iter().map(Transaction::fingerprint).collect();
    assert_eq!(fingerprints, vec![p2_fp, p1_fp]);
}

/// `balance_with_confirmations` clamps to height 1 rather than going
/// below genesis when asked for more confirmations than the chain has.
#[test]
fn balance_with_confirmations_clamps_to_genesis() {
    let mut engine = Engine::open_in_memory();
    engine
        .process_block(&genesis_block(&[(0, 1_000_000)]), &no_fees())
        .unwrap();

    let payment = Transaction::payment(addr(0), addr(1), 500, 10, 0, vec![10u8; 65]);
    engine
        .process_block(&Block::new(vec![payment]), &self_fee(0, 10))
        .unwrap();

    assert_eq!(engine.balance_with_confirmations(&addr(0), 100).unwrap(), 1_000_000);
    assert_eq!(engine.balance_with_confirmations(&addr(0), 1).unwrap(), 1_000_000);
}

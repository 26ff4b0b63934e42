/// Transaction model (spec §3, §9 "Polymorphism over transaction
/// variants"): a small tagged enum rather than a class hierarchy. Every
/// variant exposes a fingerprint, its balance-change list, an authorship
/// check, and a static `validate()`.
use ripemd160::Ripemd160;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Address, Fingerprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Ok,
    InvalidAddress,
    NegativeAmount,
    NegativeFee,
    NoBalance,
}

/// PIVX/Bitcoin-style hash160 address length; kept as the one concrete
/// assumption this engine makes about wire-level address encoding so
/// `validate()` has something to check against (§4.6(b)).
const ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Transaction {
    /// Valid only at height 0 (§4.8).
    Genesis {
        recipient: Address,
        amount: u64,
        timestamp: u64,
    },
    Payment {
        sender: Address,
        recipient: Address,
        amount: u64,
        fee: u64,
        timestamp: u64,
        /// 65-byte recoverable ECDSA signature (64-byte sig + 1-byte
        /// recovery id) over `signing_message()`.
        signature: Vec<u8>,
    },
}

impl Transaction {
    pub fn genesis(recipient: Address, amount: u64, timestamp: u64) -> Self {
        Transaction::Genesis {
            recipient,
            amount,
            timestamp,
        }
    }

    pub fn payment(
        sender: Address,
        recipient: Address,
        amount: u64,
        fee: u64,
        timestamp: u64,
        signature: Vec<u8>,
    ) -> Self {
        Transaction::Payment {
            sender,
            recipient,
            amount,
            fee,
            timestamp,
            signature,
        }
    }

    /// Opaque unique identifier. For a Payment this is its signature's
    /// hash (the signature suffices, per the glossary); Genesis
    /// transactions have no signature, so the fingerprint is a hash of
    /// their defining fields instead.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        match self {
            Transaction::Genesis {
                recipient,
                amount,
                timestamp,
            } => {
                hasher.update(b"genesis");
                hasher.update(recipient.as_bytes());
                hasher.update(amount.to_le_bytes());
                hasher.update(timestamp.to_le_bytes());
            }
            Transaction::Payment { signature, .. } => {
                hasher.update(b"payment");
                hasher.update(signature);
            }
        }
        Fingerprint(hasher.finalize().to_vec())
    }

    /// `(address, signed_delta)` balance changes this transaction
    /// produces: `(-amount-fee, +amount)` on `(sender, recipient)` for a
    /// payment; `(+amount)` on `recipient` for genesis.
    pub fn balance_changes(&self) -> Vec<(Address, i64)> {
        match self {
            Transaction::Genesis {
                recipient, amount, ..
            } => vec![(recipient.clone(), *amount as i64)],
            Transaction::Payment {
                sender,
                recipient,
                amount,
                fee,
                ..
            } => {
                let total = (*amount as i64).saturating_add(*fee as i64);
                if sender == recipient {
                    // net effect on self is just the fee
                    vec![(sender.clone(), -(*fee as i64))]
                } else {
                    vec![(sender.clone(), -total), (recipient.clone(), *amount as i64)]
                }
            }
        }
    }

    /// The message a Payment's signature is computed over: the
    /// concatenation of every field but the signature itself, double
    /// hashed (Bitcoin/PIVX style, §9).
    pub fn signing_message(sender: &Address, recipient: &Address, amount: u64, fee: u64, timestamp: u64) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(sender.as_bytes());
        hasher.update(recipient.as_bytes());
        hasher.update(amount.to_le_bytes());
        hasher.update(fee.to_le_bytes());
        hasher.update(timestamp.to_le_bytes());
        let once = hasher.finalize();
        Sha256::digest(once).into()
    }

    /// Genesis transactions have nothing to authenticate; Payment
    /// transactions must recover to a pubkey whose hash160 equals the
    /// claimed sender address.
    pub fn authorship_ok(&self) -> bool {
        match self {
            Transaction::Genesis { .. } => true,
            Transaction::Payment {
                sender,
                recipient,
                amount,
                fee,
                timestamp,
                signature,
            } => {
                if signature.len() != 65 {
                    return false;
                }
                let recovery_id = match RecoveryId::from_i32(signature[64] as i32) {
                    Ok(id) => id,
                    Err(_) => return false,
                };
                let recoverable = match RecoverableSignature::from_compact(&signature[..64], recovery_id) {
                    Ok(sig) => sig,
                    Err(_) => return false,
                };
                let message = Self::signing_message(sender, recipient, *amount, *fee, *timestamp);
                let msg = match Message::from_slice(&message) {
                    Ok(m) => m,
                    Err(_) => return false,
                };
                let secp = Secp256k1::verification_only();
                let pubkey = match secp.recover_ecdsa(&msg, &recoverable) {
                    Ok(pk) => pk,
                    Err(_) => return false,
                };
                hash160(&pubkey.serialize()) == sender.as_bytes()
            }
        }
    }

    /// Pure, state-independent validity check (§3, §4.6(b)).
    pub fn validate(&self) -> ValidationResult {
        match self {
            Transaction::Genesis { recipient, amount, .. } => {
                if recipient.as_bytes().len() != ADDRESS_LEN {
                    return ValidationResult::InvalidAddress;
                }
                if *amount == 0 {
                    return ValidationResult::NoBalance;
                }
                if *amount > i64::MAX as u64 {
                    return ValidationResult::NegativeAmount;
                }
                ValidationResult::Ok
            }
            Transaction::Payment {
                sender,
                recipient,
                amount,
                fee,
                ..
            } => {
                if sender.as_bytes().len() != ADDRESS_LEN || recipient.as_bytes().len() != ADDRESS_LEN {
                    return ValidationResult::InvalidAddress;
                }
                if *amount == 0 {
                    return ValidationResult::NoBalance;
                }
                if *amount > i64::MAX as u64 {
                    return ValidationResult::NegativeAmount;
                }
                if *fee > i64::MAX as u64 {
                    return ValidationResult::NegativeFee;
                }
                ValidationResult::Ok
            }
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Transaction::Genesis { .. })
    }

    pub fn sender(&self) -> Option<&Address> {
        match self {
            Transaction::Genesis { .. } => None,
            Transaction::Payment { sender, .. } => Some(sender),
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Transaction::Genesis { amount, .. } => *amount,
            Transaction::Payment { amount, .. } => *amount,
        }
    }

    pub fn fee(&self) -> u64 {
        match self {
            Transaction::Genesis { .. } => 0,
            Transaction::Payment { fee, .. } => *fee,
        }
    }
}

/// Hash160: RIPEMD160(SHA256(data)) — PIVX/Bitcoin address derivation.
fn hash160(data: &[u8]) -> Vec<u8> {
    let sha_hash = Sha256::digest(data);
    Ripemd160::digest(&sha_hash).to_vec()
}

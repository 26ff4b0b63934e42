/// Account History Chain (§4.2) and Inclusion Index (§4.3): key encoding
/// and typed accessors layered over the raw `Store`. Every read here
/// observes committed state only; every write is buffered into a
/// caller-supplied `StoreTransaction` until the caller commits.
use crate::error::{EngineError, EngineResult};
use crate::store::{Map, Store, StoreTransaction};
use crate::types::{Address, ChangeRecord, Fingerprint, Height};

const HEIGHT_MARKER_KEY: &[u8] = b"height";

fn changes_key(address: &Address, height: Height) -> Vec<u8> {
    let mut key = address.as_bytes().to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub fn height_marker(store: &dyn Store) -> EngineResult<Height> {
    match store.get(Map::HeightMarker, HEIGHT_MARKER_KEY)? {
        Some(bytes) => decode_height(&bytes),
        None => Ok(0),
    }
}

pub fn set_height_marker(txn: &mut StoreTransaction, height: Height) {
    txn.put(Map::HeightMarker, HEIGHT_MARKER_KEY.to_vec(), height.to_le_bytes().to_vec());
}

pub fn last_change_height(store: &dyn Store, address: &Address) -> EngineResult<Height> {
    match store.get(Map::LastChangeHeight, address.as_bytes())? {
        Some(bytes) => decode_height(&bytes),
        None => Ok(0),
    }
}

pub fn set_last_change_height(txn: &mut StoreTransaction, address: &Address, height: Height) {
    txn.put(
        Map::LastChangeHeight,
        address.as_bytes().to_vec(),
        height.to_le_bytes().to_vec(),
    );
}

pub fn delete_last_change_height(txn: &mut StoreTransaction, address: &Address) {
    txn.delete(Map::LastChangeHeight, address.as_bytes().to_vec());
}

/// Every address that has ever had a change record (§4.4 `total_balance`,
/// §4.7 rollback, §6 `hash`): the keys of `last_change_height`.
pub fn all_addresses(store: &dyn Store) -> EngineResult<Vec<Address>> {
    Ok(store
        .keys(Map::LastChangeHeight)?
        .into_iter()
        .map(Address::new)
        .collect())
}

/// I2: a missing record where one was expected by a `prev_height`/
/// `last_change_height` link is store corruption, not a plain `None`.
pub fn change_record(store: &dyn Store, address: &Address, height: Height) -> EngineResult<Option<ChangeRecord>> {
    if height == 0 {
        return Ok(None);
    }
    match store.get(Map::Changes, &changes_key(address, height))? {
        Some(bytes) => {
            let record: ChangeRecord = bincode::deserialize(&bytes)
                .map_err(|e| EngineError::Corruption(format!("change record decode failed: {e}")))?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Like [`change_record`] but treats an absent record as corruption —
/// for callers that already established (via a chain link) that it
/// must exist.
pub fn require_change_record(store: &dyn Store, address: &Address, height: Height) -> EngineResult<ChangeRecord> {
    change_record(store, address, height)?.ok_or_else(|| {
        EngineError::Corruption(format!(
            "missing change record for {address} at height {height}"
        ))
    })
}

pub fn put_change_record(txn: &mut StoreTransaction, address: &Address, height: Height, record: &ChangeRecord) {
    let bytes = bincode::serialize(record).expect("ChangeRecord serialization is infallible");
    txn.put(Map::Changes, changes_key(address, height), bytes);
}

pub fn delete_change_record(txn: &mut StoreTransaction, address: &Address, height: Height) {
    txn.delete(Map::Changes, changes_key(address, height));
}

pub fn included(store: &dyn Store, fingerprint: &Fingerprint) -> EngineResult<Option<Height>> {
    match store.get(Map::Included, fingerprint.as_bytes())? {
        Some(bytes) => Ok(Some(decode_height(&bytes)?)),
        None => Ok(None),
    }
}

pub fn set_included(txn: &mut StoreTransaction, fingerprint: &Fingerprint, height: Height) {
    txn.put(Map::Included, fingerprint.as_bytes().to_vec(), height.to_le_bytes().to_vec());
}

pub fn delete_included(txn: &mut StoreTransaction, fingerprint: &Fingerprint) {
    txn.delete(Map::Included, fingerprint.as_bytes().to_vec());
}

fn decode_height(bytes: &[u8]) -> EngineResult<Height> {
    let array: [u8; 4] = bytes
        .try_into()
        .map_err(|_| EngineError::Corruption("malformed height value".to_string()))?;
    Ok(Height::from_le_bytes(array))
}

/// Store Adapter (§4.1): named ordered key-value maps over a single
/// backing file, atomic commit, discard-of-uncommitted-changes. Mirrors
/// `atomic_writer.rs`'s buffer-then-flush discipline: nothing reaches the
/// backing engine until `commit()` builds one atomic write.
use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};

use crate::error::{EngineError, EngineResult};

/// One named map per §3's persisted layout, plus `Meta` for the
/// crash-recovery marker (§10.1 of the ambient stack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Map {
    HeightMarker,
    LastChangeHeight,
    Changes,
    Included,
    Meta,
}

impl Map {
    pub const ALL: [Map; 5] = [
        Map::HeightMarker,
        Map::LastChangeHeight,
        Map::Changes,
        Map::Included,
        Map::Meta,
    ];

    pub fn cf_name(self) -> &'static str {
        match self {
            Map::HeightMarker => "height_marker",
            Map::LastChangeHeight => "last_change_height",
            Map::Changes => "changes",
            Map::Included => "included",
            Map::Meta => "meta",
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Put(Map, Vec<u8>, Vec<u8>),
    Delete(Map, Vec<u8>),
}

/// Accumulates writes in memory; nothing is visible to readers of the
/// backing store until `Store::commit` flushes it as one atomic batch.
#[derive(Debug, Default)]
pub struct StoreTransaction {
    ops: Vec<Op>,
}

impl StoreTransaction {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn put(&mut self, map: Map, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(Op::Put(map, key.into(), value.into()));
    }

    pub fn delete(&mut self, map: Map, key: impl Into<Vec<u8>>) {
        self.ops.push(Op::Delete(map, key.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// The persistent-store contract (§4.1): named maps, atomic commit,
/// discard. Implemented by a RocksDB-backed store and a pure in-memory
/// store sharing the same trait.
pub trait Store: Send + Sync {
    fn get(&self, map: Map, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Durably publishes every op buffered in `txn`. No effect is
    /// observable to `get()` before this returns `Ok`.
    fn commit(&self, txn: StoreTransaction) -> EngineResult<()>;

    /// Drops the buffered ops without touching the backing store.
    fn discard(&self, _txn: StoreTransaction) {}

    /// All keys currently present in `map`, in ascending byte order.
    /// Used to enumerate every address ever touched (§4.4 `total_balance`,
    /// §4.7 rollback, §6 `hash`) without a secondary index.
    fn keys(&self, map: Map) -> EngineResult<Vec<Vec<u8>>>;
}

const OPEN_MARKER_KEY: &[u8] = b"open_txn";

/// RocksDB-backed store: one column family per `Map`.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs: Vec<ColumnFamilyDescriptor> = Map::ALL
            .iter()
            .map(|m| ColumnFamilyDescriptor::new(m.cf_name(), Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        let store = Self { db };
        store.recover_from_unclean_shutdown()?;
        Ok(store)
    }

    /// §4.1: on open, uncommitted changes from a prior crashed run are
    /// discarded. Because writes only ever leave the in-memory
    /// transaction as a single atomic batch, a crash before that batch
    /// lands can never leave partial state in the other column
    /// families — so clearing the marker is the whole job.
    fn recover_from_unclean_shutdown(&self) -> EngineResult<()> {
        if self.get(Map::Meta, OPEN_MARKER_KEY)?.is_some() {
            tracing::warn!("detected uncommitted marker from a prior run, discarding");
            let cf = self.cf_handle(Map::Meta)?;
            self.db.delete_cf(cf, OPEN_MARKER_KEY)?;
        }
        Ok(())
    }

    fn cf_handle(&self, map: Map) -> EngineResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(map.cf_name())
            .ok_or(EngineError::MissingColumnFamily(map.cf_name()))
    }
}

impl Store for RocksStore {
    fn get(&self, map: Map, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let cf = self.cf_handle(map)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn commit(&self, txn: StoreTransaction) -> EngineResult<()> {
        if txn.ops.is_empty() {
            return Ok(());
        }
        let mut batch = rocksdb::WriteBatch::default();
        for op in &txn.ops {
            match op {
                Op::Put(map, key, value) => {
                    let cf = self.cf_handle(*map)?;
                    batch.put_cf(cf, key, value);
                }
                Op::Delete(map, key) => {
                    let cf = self.cf_handle(*map)?;
                    batch.delete_cf(cf, key);
                }
            }
        }
        let meta_cf = self.cf_handle(Map::Meta)?;
        batch.delete_cf(meta_cf, OPEN_MARKER_KEY);
        self.db.write(batch)?;
        Ok(())
    }

    fn keys(&self, map: Map) -> EngineResult<Vec<Vec<u8>>> {
        let cf = self.cf_handle(map)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, _) = item?;
            out.push(key.to_vec());
        }
        Ok(out)
    }
}

/// Pure in-memory store (no RocksDB, no file), for embedders that don't
/// want a file and for the engine's own test suite.
#[derive(Default)]
pub struct MemStore {
    maps: RwLock<BTreeMap<(u8, Vec<u8>), Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(BTreeMap::new()),
        }
    }

    fn tag(map: Map) -> u8 {
        match map {
            Map::HeightMarker => 0,
            Map::LastChangeHeight => 1,
            Map::Changes => 2,
            Map::Included => 3,
            Map::Meta => 4,
        }
    }
}

impl Store for MemStore {
    fn get(&self, map: Map, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.maps.read().get(&(Self::tag(map), key.to_vec())).cloned())
    }

    fn commit(&self, txn: StoreTransaction) -> EngineResult<()> {
        let mut maps = self.maps.write();
        for op in txn.ops {
            match op {
                Op::Put(map, key, value) => {
                    maps.insert((Self::tag(map), key), value);
                }
                Op::Delete(map, key) => {
                    maps.remove(&(Self::tag(map), key));
                }
            }
        }
        Ok(())
    }

    fn keys(&self, map: Map) -> EngineResult<Vec<Vec<u8>>> {
        let tag = Self::tag(map);
        Ok(self
            .maps
            .read()
            .range((tag, Vec::new())..)
            .take_while(|((t, _), _)| *t == tag)
            .map(|((_, key), _)| key.clone())
            .collect())
    }
}

//! Embedded ordered key/value store with ACID transactions.
//!
//! All state lives in one database file: primary tables keyed by encoded
//! entity id plus multimap tables for the parent/child walks. Every operation
//! runs inside an explicit [`Txn`] handed in by the caller, so multi-step
//! updates commit or roll back as a unit.

mod codec;
mod repositories;
mod tables;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use redb::{
    Database, MultimapTableDefinition, ReadTransaction, ReadableMultimapTable, ReadableTable,
    TableDefinition, WriteTransaction,
};
use tracing::info;

pub use codec::CodecError;

/// Initial storage quota, and the step every capacity increase adds.
pub const DEFAULT_CAPACITY: u64 = 10 * 1024 * 1024;

type Def = TableDefinition<'static, &'static [u8], &'static [u8]>;
type MultiDef = MultimapTableDefinition<'static, &'static [u8], &'static [u8]>;

/// Failure inside the persistence engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write would push stored data past the configured quota. Callers
    /// recover by closing the transaction, raising capacity and retrying.
    #[error("storage capacity exhausted: {used} of {capacity} bytes in use")]
    CapacityExhausted { used: u64, capacity: u64 },
    #[error("write attempted through a read-only transaction")]
    ReadOnlyTransaction,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("store i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] redb::DatabaseError),
    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),
    #[error(transparent)]
    Table(#[from] redb::TableError),
    #[error(transparent)]
    Storage(#[from] redb::StorageError),
    #[error(transparent)]
    Commit(#[from] redb::CommitError),
}

/// Store tuning applied at open time.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Storage quota in bytes for user data.
    pub capacity: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}

/// Handle to the database file. Cheap to clone; all clones share the same
/// underlying database and capacity setting.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
    capacity: Arc<AtomicU64>,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and makes sure every
    /// table exists, so later read-only transactions never miss one.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        let store = Self {
            db: Arc::new(db),
            capacity: Arc::new(AtomicU64::new(options.capacity)),
        };
        store.ensure_tables()?;
        info!(path = %path.display(), capacity = store.capacity(), "store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        txn.open_table(tables::CATEGORIES)?;
        txn.open_table(tables::DOMAINS)?;
        txn.open_table(tables::KEYWORDS)?;
        txn.open_table(tables::RANKINGS)?;
        txn.open_multimap_table(tables::CATEGORY_DOMAINS)?;
        txn.open_multimap_table(tables::DOMAIN_KEYWORDS)?;
        txn.open_multimap_table(tables::KEYWORD_RANKINGS)?;
        txn.commit()?;
        Ok(())
    }

    /// Starts a transaction. The current capacity is snapshotted into it, so
    /// a concurrent raise applies only to transactions begun afterwards.
    pub fn begin(&self, mode: TxnMode) -> Result<Txn, StoreError> {
        let quota = self.capacity();
        let inner = match mode {
            TxnMode::ReadOnly => TxnInner::Read(self.db.begin_read()?),
            TxnMode::ReadWrite => TxnInner::Write(self.db.begin_write()?),
        };
        Ok(Txn { inner, quota })
    }

    /// Raises the storage quota by one [`DEFAULT_CAPACITY`] step and returns
    /// the new value. Transactions already open keep the quota they started
    /// with; callers retry in a fresh one.
    pub fn increase_capacity(&self) -> u64 {
        let grown = self.capacity.fetch_add(DEFAULT_CAPACITY, Ordering::AcqRel) + DEFAULT_CAPACITY;
        info!(capacity = grown, "storage capacity raised");
        grown
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity.load(Ordering::Acquire)
    }
}

enum TxnInner {
    Read(ReadTransaction),
    Write(WriteTransaction),
}

/// One transaction over the store. Read-only transactions see a stable
/// snapshot; read-write transactions buffer changes until [`Txn::commit`].
/// Dropping a transaction without committing rolls it back.
pub struct Txn {
    inner: TxnInner,
    quota: u64,
}

impl Txn {
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self.inner, TxnInner::Read(_))
    }

    /// Publishes buffered writes. For a read-only transaction this just
    /// releases the snapshot.
    pub fn commit(self) -> Result<(), StoreError> {
        match self.inner {
            TxnInner::Read(txn) => Ok(txn.close()?),
            TxnInner::Write(txn) => Ok(txn.commit()?),
        }
    }

    /// Discards buffered writes and releases the transaction.
    pub fn rollback(self) -> Result<(), StoreError> {
        match self.inner {
            TxnInner::Read(txn) => Ok(txn.close()?),
            TxnInner::Write(txn) => Ok(txn.abort()?),
        }
    }

    fn write_txn(&self) -> Result<&WriteTransaction, StoreError> {
        match &self.inner {
            TxnInner::Write(txn) => Ok(txn),
            TxnInner::Read(_) => Err(StoreError::ReadOnlyTransaction),
        }
    }

    /// Fails with [`StoreError::CapacityExhausted`] when stored bytes plus
    /// the incoming write would cross the quota this transaction carries.
    fn check_quota(&self, txn: &WriteTransaction, incoming: u64) -> Result<(), StoreError> {
        let used = txn.stats()?.stored_bytes();
        if used + incoming > self.quota {
            return Err(StoreError::CapacityExhausted { used, capacity: self.quota });
        }
        Ok(())
    }

    pub(crate) fn get(&self, table: Def, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match &self.inner {
            TxnInner::Read(txn) => get_value(&txn.open_table(table)?, key),
            TxnInner::Write(txn) => get_value(&txn.open_table(table)?, key),
        }
    }

    /// Every value in a table, in key order.
    pub(crate) fn scan_values(&self, table: Def) -> Result<Vec<Vec<u8>>, StoreError> {
        match &self.inner {
            TxnInner::Read(txn) => all_values(&txn.open_table(table)?),
            TxnInner::Write(txn) => all_values(&txn.open_table(table)?),
        }
    }

    /// Value of the greatest key inside `lower..upper`, if any. Lets ranking
    /// lookups step back in time without leaving their keyword/engine stream.
    pub(crate) fn latest_below(
        &self,
        table: Def,
        lower: &[u8],
        upper: &[u8],
    ) -> Result<Option<Vec<u8>>, StoreError> {
        match &self.inner {
            TxnInner::Read(txn) => last_in_range(&txn.open_table(table)?, lower, upper),
            TxnInner::Write(txn) => last_in_range(&txn.open_table(table)?, lower, upper),
        }
    }

    pub(crate) fn put(&self, table: Def, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let txn = self.write_txn()?;
        self.check_quota(txn, (key.len() + value.len()) as u64)?;
        let mut table = txn.open_table(table)?;
        table.insert(key, value)?;
        Ok(())
    }

    /// Removes a key. Returns `false` when it was not present.
    pub(crate) fn delete(&self, table: Def, key: &[u8]) -> Result<bool, StoreError> {
        let txn = self.write_txn()?;
        let mut table = txn.open_table(table)?;
        Ok(table.remove(key)?.is_some())
    }

    /// Child values under `key`, ascending by value bytes.
    pub(crate) fn children(&self, table: MultiDef, key: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        match &self.inner {
            TxnInner::Read(txn) => child_values(&txn.open_multimap_table(table)?, key),
            TxnInner::Write(txn) => child_values(&txn.open_multimap_table(table)?, key),
        }
    }

    /// Number of children under `key`; zero when the key is absent.
    pub(crate) fn children_count(&self, table: MultiDef, key: &[u8]) -> Result<u64, StoreError> {
        match &self.inner {
            TxnInner::Read(txn) => child_count(&txn.open_multimap_table(table)?, key),
            TxnInner::Write(txn) => child_count(&txn.open_multimap_table(table)?, key),
        }
    }

    /// Greatest child value under `key`, if any.
    pub(crate) fn last_child(
        &self,
        table: MultiDef,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StoreError> {
        match &self.inner {
            TxnInner::Read(txn) => last_child_value(&txn.open_multimap_table(table)?, key),
            TxnInner::Write(txn) => last_child_value(&txn.open_multimap_table(table)?, key),
        }
    }

    pub(crate) fn add_child(
        &self,
        table: MultiDef,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StoreError> {
        let txn = self.write_txn()?;
        self.check_quota(txn, (key.len() + value.len()) as u64)?;
        let mut table = txn.open_multimap_table(table)?;
        table.insert(key, value)?;
        Ok(())
    }

    /// Removes one key/value pair. Returns `false` when it was not present.
    pub(crate) fn remove_child(
        &self,
        table: MultiDef,
        key: &[u8],
        value: &[u8],
    ) -> Result<bool, StoreError> {
        let txn = self.write_txn()?;
        let mut table = txn.open_multimap_table(table)?;
        Ok(table.remove(key, value)?)
    }

    /// Removes every child under `key`.
    pub(crate) fn remove_children(&self, table: MultiDef, key: &[u8]) -> Result<(), StoreError> {
        let txn = self.write_txn()?;
        let mut table = txn.open_multimap_table(table)?;
        table.remove_all(key)?;
        Ok(())
    }
}

fn get_value<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
}

fn all_values<T>(table: &T) -> Result<Vec<Vec<u8>>, StoreError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut values = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        values.push(value.value().to_vec());
    }
    Ok(values)
}

fn last_in_range<T>(table: &T, lower: &[u8], upper: &[u8]) -> Result<Option<Vec<u8>>, StoreError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut range = table.range(lower..upper)?;
    Ok(range
        .next_back()
        .transpose()?
        .map(|(_, value)| value.value().to_vec()))
}

fn child_values<T>(table: &T, key: &[u8]) -> Result<Vec<Vec<u8>>, StoreError>
where
    T: ReadableMultimapTable<&'static [u8], &'static [u8]>,
{
    let mut values = Vec::new();
    for value in table.get(key)? {
        values.push(value?.value().to_vec());
    }
    Ok(values)
}

fn child_count<T>(table: &T, key: &[u8]) -> Result<u64, StoreError>
where
    T: ReadableMultimapTable<&'static [u8], &'static [u8]>,
{
    let mut count = 0;
    for value in table.get(key)? {
        value?;
        count += 1;
    }
    Ok(count)
}

fn last_child_value<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>
where
    T: ReadableMultimapTable<&'static [u8], &'static [u8]>,
{
    let mut last = None;
    for value in table.get(key)? {
        last = Some(value?.value().to_vec());
    }
    Ok(last)
}

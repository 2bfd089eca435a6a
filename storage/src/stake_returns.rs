//! Sled-backed stake-return ledger
//!
//! One tree maps a big-endian u64 height to the JSON list of returns
//! maturing there. A second tree holds bookkeeping markers.

use std::path::Path;

use rosetta_core::PendingStakeReturn;
use tracing::debug;

use crate::{StorageError, StorageResult};

const RETURNS_TREE: &str = "return_stakes";
const META_TREE: &str = "meta";
const BACKFILL_MARKER: &[u8] = b"snapshot_backfill_done";

#[derive(Debug, Clone)]
pub struct StakeReturnLedger {
    db: sled::Db,
    returns: sled::Tree,
    meta: sled::Tree,
}

fn height_key(height: u64) -> [u8; 8] {
    height.to_be_bytes()
}

fn decode_list(bytes: &[u8]) -> StorageResult<Vec<PendingStakeReturn>> {
    Ok(serde_json::from_slice(bytes)?)
}

impl StakeReturnLedger {
    /// Open or create the ledger at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory ledger that disappears on drop
    pub fn temporary() -> StorageResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> StorageResult<Self> {
        let returns = db.open_tree(RETURNS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        Ok(Self { db, returns, meta })
    }

    /// Merge `returns` into the list stored at `height`, skipping any whose
    /// hash is already there. Concurrent writers to the same height retry on
    /// conflict, so no write is lost. Returns how many records were added.
    pub fn put(&self, height: u64, returns: &[PendingStakeReturn]) -> StorageResult<usize> {
        let key = height_key(height);
        let mut current = self.returns.get(key)?;

        loop {
            let mut merged = match &current {
                Some(bytes) => decode_list(bytes)?,
                None => Vec::new(),
            };
            let before = merged.len();
            for ret in returns {
                if !merged.iter().any(|r| r.tx_hash == ret.tx_hash) {
                    merged.push(ret.clone());
                }
            }
            let added = merged.len() - before;
            if added == 0 {
                return Ok(0);
            }

            let encoded = serde_json::to_vec(&merged)?;
            match self
                .returns
                .compare_and_swap(key, current.as_ref(), Some(encoded))?
            {
                Ok(()) => {
                    self.returns.flush()?;
                    debug!(height, added, "stake returns stored");
                    return Ok(added);
                }
                Err(conflict) => current = conflict.current,
            }
        }
    }

    /// Returns maturing at `height`
    pub fn get(&self, height: u64) -> StorageResult<Vec<PendingStakeReturn>> {
        match self.returns.get(height_key(height))? {
            Some(bytes) => decode_list(&bytes),
            None => Err(StorageError::NotFound(height)),
        }
    }

    /// Like `get`, with a missing height read as no returns
    pub fn get_or_empty(&self, height: u64) -> StorageResult<Vec<PendingStakeReturn>> {
        match self.get(height) {
            Err(StorageError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    pub fn is_backfilled(&self) -> StorageResult<bool> {
        Ok(self.meta.contains_key(BACKFILL_MARKER)?)
    }

    pub fn mark_backfilled(&self) -> StorageResult<()> {
        self.meta.insert(BACKFILL_MARKER, &[1u8][..])?;
        self.meta.flush()?;
        Ok(())
    }

    pub fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

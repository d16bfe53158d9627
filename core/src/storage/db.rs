use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use shade_privacy::{Anchor, CommitmentTree, Nullifier};

use crate::storage::state::{LedgerChanges, LedgerView, NullifierStatus};

const CF_ANCHORS: &str = "anchors";
const CF_NULLIFIERS: &str = "nullifiers";
const CF_META: &str = "meta";

const KEY_BEST_ANCHOR: &[u8] = b"best_anchor";

/// A thread-safe RocksDB ledger. Every anchor ever committed stays
/// resolvable until it is rolled back.
#[derive(Clone)]
pub struct RocksLedger {
    db: Arc<DB>,
}

impl RocksLedger {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_ANCHORS, Options::default()),
            ColumnFamilyDescriptor::new(CF_NULLIFIERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        info!("Opened ledger at {}", path.as_ref().display());
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("{} CF missing", name))
    }
}

impl LedgerView for RocksLedger {
    fn get_anchor_snapshot(&self, anchor: &Anchor) -> Result<Option<CommitmentTree>> {
        if *anchor == Anchor::empty() {
            return Ok(Some(CommitmentTree::new()));
        }
        match self.db.get_cf(self.cf(CF_ANCHORS)?, anchor.as_bytes())? {
            Some(bytes) => {
                let tree = bincode::deserialize(&bytes).context("corrupt anchor snapshot")?;
                Ok(Some(tree))
            }
            None => Ok(None),
        }
    }

    fn get_nullifier_status(&self, nullifier: &Nullifier) -> Result<NullifierStatus> {
        let spent = self
            .db
            .get_cf(self.cf(CF_NULLIFIERS)?, nullifier.as_bytes())?
            .is_some();
        Ok(if spent {
            NullifierStatus::Spent
        } else {
            NullifierStatus::Unspent
        })
    }

    fn current_best_anchor(&self) -> Result<Anchor> {
        match self.db.get_cf(self.cf(CF_META)?, KEY_BEST_ANCHOR)? {
            Some(bytes) => {
                let arr: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .context("invalid best anchor length")?;
                Ok(Anchor(arr))
            }
            None => Ok(Anchor::empty()),
        }
    }

    fn commit(&self, changes: LedgerChanges) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_anchors = self.cf(CF_ANCHORS)?;
        let cf_nullifiers = self.cf(CF_NULLIFIERS)?;
        let cf_meta = self.cf(CF_META)?;

        let anchor_count = changes.anchors.len();
        let nullifier_count = changes.nullifiers.len();

        // Anchors
        for (anchor, entry) in &changes.anchors {
            if entry.entered {
                let bytes = bincode::serialize(&entry.tree)?;
                batch.put_cf(cf_anchors, anchor.as_bytes(), bytes);
            } else {
                batch.delete_cf(cf_anchors, anchor.as_bytes());
            }
        }

        // Nullifiers
        for (nullifier, entry) in &changes.nullifiers {
            if entry.entered {
                batch.put_cf(cf_nullifiers, nullifier.as_bytes(), []);
            } else {
                batch.delete_cf(cf_nullifiers, nullifier.as_bytes());
            }
        }

        if let Some(best) = changes.best_anchor {
            batch.put_cf(cf_meta, KEY_BEST_ANCHOR, best.as_bytes());
        }

        self.db.write(batch).context("Failed to commit ledger batch")?;
        info!(
            "Committed {} anchor and {} nullifier changes",
            anchor_count, nullifier_count
        );
        Ok(())
    }
}

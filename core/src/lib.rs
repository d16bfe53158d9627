//! Shade Core
//!
//! Binds JoinSplits to a ledger: anchor snapshots, the nullifier set and
//! block assembly.
//!
//! ```text
//! JSDescription[] ──► LedgerCache::admit_joinsplits ──► flush ──► LedgerView::commit
//!                          │                                      ├── MemoryLedger
//!                          └── have_joinsplit_requirements        └── RocksLedger
//! ```

use std::sync::Arc;

use anyhow::Result;
use shade_config::{LedgerBackend, LedgerConfig};

pub mod block;
pub mod error;
pub mod storage;

pub use block::{LedgerCache, ProveRequest, ProverService};
pub use error::LedgerError;
pub use storage::{
    AnchorEntry, LedgerChanges, LedgerView, MemoryLedger, NullifierEntry, NullifierStatus,
    RocksLedger,
};

/// Open the ledger selected by the configuration.
pub fn open_ledger(config: &LedgerConfig) -> Result<Arc<dyn LedgerView>> {
    Ok(match config.backend {
        LedgerBackend::Memory => Arc::new(MemoryLedger::new(config.anchor_history)),
        LedgerBackend::Rocksdb => Arc::new(RocksLedger::open(&config.path)?),
    })
}

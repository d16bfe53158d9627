pub mod db;
pub mod memory;
pub mod state;

pub use db::RocksLedger;
pub use memory::MemoryLedger;
pub use state::{AnchorEntry, LedgerChanges, LedgerView, NullifierEntry, NullifierStatus};

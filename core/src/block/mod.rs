pub mod cache;
pub mod prover;

pub use cache::LedgerCache;
pub use prover::{ProveRequest, ProverService};

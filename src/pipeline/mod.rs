//! Pipeline entry points for harvester operations.
//!
//! - `Harvester`: discover (or take) result URLs, fetch, extract, persist
//! - `run_reindex`: rebuild collections from per-draw files on disk

pub mod harvest;
pub mod reindex;

pub use harvest::{Harvester, ItemOutcome, RunSummary};
pub use reindex::run_reindex;

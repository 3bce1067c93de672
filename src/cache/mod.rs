//! Cache Module
//!
//! Versioned response partitions with capture-time stamping and
//! age/count eviction.

mod entry;
pub mod eviction;
mod order;
mod partition;
pub mod snapshot;
mod stats;
mod storage;
mod store;
pub mod tagger;


// Re-export public types
pub use entry::ResponseSnapshot;
pub use eviction::{EvictionReport, Policy};
pub use order::InsertionIndex;
pub use partition::Partition;
pub use stats::CacheStats;
pub use storage::{PartitionHandle, PartitionStore};
pub use store::{CacheStore, Lookup, PartitionKind, PartitionStats};

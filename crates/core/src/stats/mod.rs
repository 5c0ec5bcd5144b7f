//! Reseed statistics: key-value persistence and the append-only aggregator.

mod aggregator;
mod sqlite;
mod store;
mod types;

pub use aggregator::{ReclassifyReport, StatsAggregator, MAPPING_KEY, RETENTION_DAYS, STATS_KEY};
pub use sqlite::SqliteKvStore;
pub use store::{KvStore, StoreError};
pub use types::*;

pub mod cache;
pub mod history_service;
pub mod snapshot_service;

pub use cache::{CacheEntry, CacheStats, Lookup, TtlCache};
pub use history_service::HistorySeriesService;
pub use snapshot_service::PriceSnapshotService;

pub mod error;
pub mod level_cache;
pub mod tier;
pub mod types;

pub use error::{LevelCacheError, Operation, Result};
pub use level_cache::LevelCache;
pub use tier::Tier;
pub use types::{CacheStats, CacheStatus, EvictionPolicy, LevelInfo, TierSnapshot};

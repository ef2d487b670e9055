//! Multi-level in-process key/value cache.
//!
//! A [`LevelCache`] is a stack of bounded levels (L1..Ln), each with its own
//! LRU or LFU engine. Writes always land in L1; whatever a full level evicts
//! cascades into the level below until it finds room or falls off the
//! bottom of the stack.
//!
//! ```
//! use levelcache::{CacheConfig, LevelCache};
//!
//! let config = CacheConfig::builder()
//!     .cache_name("example")
//!     .level(3, "LRU")
//!     .level(2, "LFU")
//!     .build();
//! let cache = LevelCache::new(config)?;
//!
//! cache.put("a", "1")?;
//! assert_eq!(cache.get("a")?, Some("1".to_string()));
//! assert_eq!(cache.get("missing")?, None);
//! # Ok::<(), levelcache::LevelCacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod core;

// Re-export commonly used types
pub use cache::{Engine, LfuEngine, LruEngine, StorageEngine};
pub use config::{CacheConfig, CacheConfigBuilder, LevelConfig};
pub use core::{
    CacheStats, CacheStatus, EvictionPolicy, LevelCache, LevelCacheError, LevelInfo, Operation,
    Result, Tier, TierSnapshot,
};

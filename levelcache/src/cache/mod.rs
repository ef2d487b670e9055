//! Storage Engines
//!
//! Each cache level owns exactly one engine that holds its entries and
//! decides what to evict:
//! - LRU: intrusive recency list over a slot arena
//! - LFU: frequency buckets with a tracked minimum
//!
//! Engines are selected through the closed [`EvictionPolicy`] set and
//! driven through the [`StorageEngine`] capability trait.

use crate::core::EvictionPolicy;

pub mod lfu;
pub mod lru;

pub use lfu::LfuEngine;
pub use lru::LruEngine;

/// Capability interface shared by every eviction engine.
///
/// An insertion into a full engine evicts exactly one entry and parks it as
/// the pending evicted pair; the caller drains it with [`take_evicted`]
/// before the next insertion.
///
/// [`take_evicted`]: StorageEngine::take_evicted
pub trait StorageEngine {
    /// Insert or overwrite a pair. Returns true when the key was already
    /// resident, in which case nothing is evicted.
    fn insert(&mut self, key: String, value: String) -> bool;

    /// Look up a key, applying the policy's access bookkeeping.
    fn find(&mut self, key: &str) -> Option<String>;

    /// Return and clear the pair evicted by the last insertion, if any.
    fn take_evicted(&mut self) -> Option<(String, String)>;

    /// Drop a key without recording it as evicted.
    fn remove(&mut self, key: &str) -> Option<String>;

    /// Membership test that leaves the eviction order untouched.
    fn contains(&self, key: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Resident pairs in eviction-order, for diagnostics.
    fn snapshot(&self) -> Vec<(String, String)>;
}

/// Engine selected by a level's eviction policy
#[derive(Debug)]
pub enum Engine {
    Lru(LruEngine),
    Lfu(LfuEngine),
}

impl Engine {
    pub fn new(policy: EvictionPolicy, capacity: usize) -> Self {
        match policy {
            EvictionPolicy::Lru => Self::Lru(LruEngine::new(capacity)),
            EvictionPolicy::Lfu => Self::Lfu(LfuEngine::new(capacity)),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        match self {
            Self::Lru(_) => EvictionPolicy::Lru,
            Self::Lfu(_) => EvictionPolicy::Lfu,
        }
    }

    fn as_engine(&self) -> &dyn StorageEngine {
        match self {
            Self::Lru(engine) => engine,
            Self::Lfu(engine) => engine,
        }
    }

    fn as_engine_mut(&mut self) -> &mut dyn StorageEngine {
        match self {
            Self::Lru(engine) => engine,
            Self::Lfu(engine) => engine,
        }
    }
}

impl StorageEngine for Engine {
    fn insert(&mut self, key: String, value: String) -> bool {
        self.as_engine_mut().insert(key, value)
    }

    fn find(&mut self, key: &str) -> Option<String> {
        self.as_engine_mut().find(key)
    }

    fn take_evicted(&mut self) -> Option<(String, String)> {
        self.as_engine_mut().take_evicted()
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.as_engine_mut().remove(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.as_engine().contains(key)
    }

    fn len(&self) -> usize {
        self.as_engine().len()
    }

    fn capacity(&self) -> usize {
        self.as_engine().capacity()
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        self.as_engine().snapshot()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Eviction policy governing a single cache level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum EvictionPolicy {
    /// Least Recently Used
    #[default]
    Lru,
    /// Least Frequently Used
    Lfu,
}

impl EvictionPolicy {
    /// Upper-case policy name as used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lru => "LRU",
            Self::Lfu => "LFU",
        }
    }
}

/// Case-insensitive match on "LFU"; every other name selects LRU.
impl From<&str> for EvictionPolicy {
    fn from(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("lfu") {
            Self::Lfu
        } else {
            Self::Lru
        }
    }
}

impl From<String> for EvictionPolicy {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a cache instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// No levels exist yet; reads and writes fail
    Uninitialized,
    /// At least one level exists
    Available,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that found the key somewhere in the stack
    pub hits: u64,
    /// Reads for keys absent from the key index
    pub misses: u64,
    /// Writes of keys that were not resident in level 1
    pub inserts: u64,
    /// Writes that overwrote a key already in level 1
    pub updates: u64,
    /// Entries evicted from any level
    pub evictions: u64,
    /// Evicted entries re-inserted into a lower level
    pub cascades: u64,
    /// Entries that fell off the last level
    pub dropped: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shape of one level in the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub id: usize,
    pub capacity: usize,
    pub policy: EvictionPolicy,
    pub len: usize,
}

/// Resident entries of one level, in the engine's eviction order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSnapshot {
    pub id: usize,
    pub capacity: usize,
    pub policy: EvictionPolicy,
    pub entries: Vec<(String, String)>,
}

impl fmt::Display for TierSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L{} [{}, {}/{}]: {{",
            self.id,
            self.policy,
            self.entries.len(),
            self.capacity
        )?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        f.write_str("}")
    }
}

use super::error::{LevelCacheError, Operation, Result};
use super::tier::Tier;
use super::types::{CacheStats, CacheStatus, EvictionPolicy, LevelInfo, TierSnapshot};
use crate::config::CacheConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Multi-level cache: a stack of bounded levels where entries evicted from
/// one level cascade into the next.
///
/// All composite state (level table and key index) sits behind a single
/// reader/writer lock. Writers (`put`, `put_all`, `remove`, `add_level`,
/// `remove_level`, `clear`) take it exclusively; readers share it and rely
/// on each level's own mutex for the reordering a lookup performs. Every
/// write therefore serializes on one lock; sharding keys across
/// independent stacks would lift that ceiling.
///
/// Handles are cheap to clone and share the same underlying cache.
#[derive(Clone)]
pub struct LevelCache {
    config: Arc<CacheConfig>,
    state: Arc<RwLock<LevelState>>,
    stats: Arc<RwLock<CacheStats>>,
}

/// Level table plus the key -> level id index.
/// Level `n` lives at `tiers[n - 1]`; ids stay contiguous.
#[derive(Default)]
struct LevelState {
    tiers: Vec<Tier>,
    key_index: HashMap<String, usize>,
}

/// What a single insertion did to the stack
#[derive(Debug, Default)]
struct CascadeOutcome {
    updated: bool,
    evictions: u64,
    cascades: u64,
    dropped: u64,
}

impl LevelState {
    fn level_count(&self) -> usize {
        self.tiers.len()
    }

    fn tier(&self, id: usize) -> Option<&Tier> {
        id.checked_sub(1).and_then(|idx| self.tiers.get(idx))
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let id = *self.key_index.get(key)?;
        self.tier(id)?.find(key)
    }

    /// Insert into level 1 and push evicted pairs down the stack until one
    /// lands in a level with room or falls off the bottom.
    fn insert_and_cascade(&mut self, key: String, value: String) -> CascadeOutcome {
        let mut outcome = CascadeOutcome::default();

        // A key lives in one level only: pull it out of a lower level first
        let resident_level = self.key_index.get(&key).copied().filter(|&level| level > 1);
        if let Some(level) = resident_level {
            if let Some(tier) = self.tier(level) {
                tier.remove(&key);
            }
            debug!("Moving key={} from L{} back to L1", key, level);
        }

        let Some((first, lower)) = self.tiers.split_first() else {
            return outcome;
        };

        let (updated, mut pending) = first.insert(key.clone(), value);
        outcome.updated = updated;

        for tier in lower {
            let Some((evicted_key, evicted_value)) = pending.take() else {
                break;
            };
            outcome.evictions += 1;
            outcome.cascades += 1;
            debug!(
                "Cascading key={} from L{} to L{}",
                evicted_key,
                tier.id() - 1,
                tier.id()
            );

            self.key_index.insert(evicted_key.clone(), tier.id());
            let (_, next) = tier.insert(evicted_key, evicted_value);
            pending = next;
        }

        if let Some((evicted_key, _)) = pending {
            outcome.evictions += 1;
            outcome.dropped += 1;
            debug!("Key={} fell off the last level", evicted_key);
            self.key_index.remove(&evicted_key);
        }

        self.key_index.insert(key, 1);
        outcome
    }
}

impl LevelCache {
    /// Create a cache from a validated configuration, building any levels
    /// the configuration declares.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing level cache name={}, max_levels={}, concurrency={}",
            config.cache_name, config.max_levels, config.concurrency_level
        );

        let levels = config.levels.clone();
        let cache = Self::empty(config);
        for level in levels {
            cache.add_level(level.capacity, level.policy)?;
        }
        Ok(cache)
    }

    /// Create a cache with the default configuration and no levels
    pub fn with_defaults() -> Self {
        Self::empty(CacheConfig::default())
    }

    fn empty(config: CacheConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(LevelState::default())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    /// Append a level below the current ones. Returns the new level's id.
    pub fn add_level(&self, capacity: usize, policy: impl Into<EvictionPolicy>) -> Result<usize> {
        let policy = policy.into();
        let mut state = self.state.write();

        if capacity < 1 {
            return Err(LevelCacheError::LevelCreation(capacity));
        }
        let current = state.level_count();
        if current >= self.config.max_levels {
            return Err(LevelCacheError::LevelLimitExceeded {
                current,
                max: self.config.max_levels,
            });
        }

        let id = current + 1;
        state.tiers.push(Tier::new(id, capacity, policy));
        info!(
            "Added level L{} (capacity={}, policy={})",
            id, capacity, policy
        );
        Ok(id)
    }

    /// Remove a level. Entries it held become misses; levels below it move
    /// up one id so ids stay contiguous and level 1 remains the entry point.
    pub fn remove_level(&self, id: usize) -> Result<()> {
        let mut state = self.state.write();

        if id == 0 || id > state.level_count() {
            return Err(LevelCacheError::UnknownTier(id));
        }

        let removed = state.tiers.remove(id - 1);
        for key in removed.keys() {
            state.key_index.remove(&key);
        }

        for (idx, tier) in state.tiers.iter_mut().enumerate().skip(id - 1) {
            tier.set_id(idx + 1);
        }
        for level in state.key_index.values_mut() {
            if *level > id {
                *level -= 1;
            }
        }

        info!(
            "Removed level L{} ({} entries dropped, {} levels left)",
            id,
            removed.len(),
            state.level_count()
        );
        Ok(())
    }

    /// Get a value. A key absent from every level is a miss, not an error.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.read();
        if state.level_count() == 0 {
            return Err(LevelCacheError::NoTiers(Operation::Read));
        }

        let value = state.lookup(key);
        let mut stats = self.stats.write();
        match value {
            Some(_) => stats.record_hit(),
            None => {
                stats.record_miss();
                debug!("Cache MISS for key: {}", key);
            }
        }
        Ok(value)
    }

    /// Put a value into level 1, cascading whatever it evicts
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let mut state = self.state.write();
        if state.level_count() == 0 {
            return Err(LevelCacheError::NoTiers(Operation::Write));
        }

        debug!("PUT key={}, size={}", key, value.len());
        let outcome = state.insert_and_cascade(key, value);
        self.record(&outcome);
        Ok(())
    }

    /// Get several values; the result lines up with `keys`, `None` per miss
    pub fn get_all<I, S>(&self, keys: I) -> Result<Vec<Option<String>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = self.state.read();
        if state.level_count() == 0 {
            return Err(LevelCacheError::NoTiers(Operation::BulkRead));
        }

        let values: Vec<Option<String>> = keys
            .into_iter()
            .map(|key| state.lookup(key.as_ref()))
            .collect();

        let mut stats = self.stats.write();
        for value in &values {
            match value {
                Some(_) => stats.record_hit(),
                None => stats.record_miss(),
            }
        }
        Ok(values)
    }

    /// Put several pairs in iteration order, each with its own cascade
    pub fn put_all<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut state = self.state.write();
        if state.level_count() == 0 {
            return Err(LevelCacheError::NoTiers(Operation::BulkWrite));
        }

        let mut count = 0usize;
        for (key, value) in entries {
            let outcome = state.insert_and_cascade(key.into(), value.into());
            self.record(&outcome);
            count += 1;
        }
        debug!("PUT_ALL {} entries", count);
        Ok(())
    }

    /// Drop a key from whichever level holds it
    pub fn remove(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.write();
        if state.level_count() == 0 {
            return Err(LevelCacheError::NoTiers(Operation::Write));
        }

        let Some(level) = state.key_index.remove(key) else {
            return Ok(None);
        };
        debug!("DELETE key={} from L{}", key, level);
        Ok(state.tier(level).and_then(|tier| tier.remove(key)))
    }

    /// Drop every level and entry
    pub fn clear(&self) {
        let mut state = self.state.write();
        let entries = state.key_index.len();
        state.tiers.clear();
        state.key_index.clear();
        info!("Cleared level cache ({} entries)", entries);
    }

    pub fn level_count(&self) -> usize {
        self.state.read().level_count()
    }

    pub fn levels(&self) -> Vec<LevelInfo> {
        self.state.read().tiers.iter().map(Tier::info).collect()
    }

    /// Resident entries of every level, top to bottom
    pub fn snapshot(&self) -> Vec<TierSnapshot> {
        self.state.read().tiers.iter().map(Tier::snapshot).collect()
    }

    /// Human-readable per-level dump, one line per level
    pub fn display(&self) -> String {
        self.snapshot()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of keys resident anywhere in the stack
    pub fn len(&self) -> usize {
        self.state.read().key_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Membership test that does not count as an access
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().key_index.contains_key(key)
    }

    /// Id of the level currently holding `key`
    pub fn level_of(&self, key: &str) -> Option<usize> {
        self.state.read().key_index.get(key).copied()
    }

    pub fn status(&self) -> CacheStatus {
        if self.level_count() == 0 {
            CacheStatus::Uninitialized
        } else {
            CacheStatus::Available
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    pub fn reset_stats(&self) {
        self.stats.write().reset();
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn max_levels(&self) -> usize {
        self.config.max_levels
    }

    pub fn concurrency_level(&self) -> usize {
        self.config.concurrency_level
    }

    fn record(&self, outcome: &CascadeOutcome) {
        let mut stats = self.stats.write();
        if outcome.updated {
            stats.updates += 1;
        } else {
            stats.inserts += 1;
        }
        stats.evictions += outcome.evictions;
        stats.cascades += outcome.cascades;
        stats.dropped += outcome.dropped;
    }
}

impl std::fmt::Debug for LevelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelCache")
            .field("name", &self.config.cache_name)
            .field("levels", &self.levels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> LevelCache {
        LevelCache::new(CacheConfig::builder().cache_name("test-cache").build()).unwrap()
    }

    /// Key index and engine membership agree, and every key lives in one level
    fn assert_consistent(cache: &LevelCache) {
        let state = cache.state.read();
        let mut resident = 0;
        for tier in &state.tiers {
            assert!(tier.len() <= tier.capacity());
            for key in tier.keys() {
                assert_eq!(state.key_index.get(&key), Some(&tier.id()), "key {}", key);
                resident += 1;
            }
        }
        assert_eq!(resident, state.key_index.len());
    }

    #[test]
    fn test_cascade_scenario() {
        let cache = cache();
        cache.add_level(3, "LRU").unwrap();
        cache.add_level(2, "LRU").unwrap();

        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();
        cache.put("c", "3").unwrap();
        cache.put("d", "4").unwrap();
        assert_eq!(cache.level_of("a"), Some(2));
        assert_eq!(cache.get("a").unwrap(), Some("1".to_string()));
        assert_consistent(&cache);

        cache.put("e", "5").unwrap();
        cache.put("f", "6").unwrap();
        assert_eq!(cache.get("a").unwrap(), None);
        assert_eq!(cache.level_of("b"), Some(2));
        assert_eq!(cache.level_of("c"), Some(2));
        assert_consistent(&cache);

        let stats = cache.stats();
        assert_eq!(stats.inserts, 6);
        assert_eq!(stats.cascades, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.evictions, 4);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_update_in_level_one_keeps_index() {
        let cache = cache();
        cache.add_level(2, "LRU").unwrap();
        cache.add_level(2, "LRU").unwrap();

        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();
        cache.put("a", "3").unwrap();

        assert_eq!(cache.level_of("a"), Some(1));
        assert_eq!(cache.level_of("b"), Some(1));
        assert_eq!(cache.get("a").unwrap(), Some("3".to_string()));
        assert_eq!(cache.stats().updates, 1);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_put_of_lower_level_key_moves_it_up() {
        let cache = cache();
        cache.add_level(1, "LRU").unwrap();
        cache.add_level(2, "LRU").unwrap();

        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();
        assert_eq!(cache.level_of("a"), Some(2));

        cache.put("a", "10").unwrap();
        assert_eq!(cache.level_of("a"), Some(1));
        assert_eq!(cache.level_of("b"), Some(2));
        assert_eq!(cache.get("a").unwrap(), Some("10".to_string()));
        assert_consistent(&cache);

        // The stale copy must not resurface when level 2 overflows later
        cache.put("c", "3").unwrap();
        cache.put("d", "4").unwrap();
        assert_consistent(&cache);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_single_level_drops_evictions() {
        let cache = cache();
        cache.add_level(2, "LFU").unwrap();

        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();
        cache.get("a").unwrap();
        cache.put("c", "3").unwrap();

        assert_eq!(cache.get("b").unwrap(), None);
        assert_eq!(cache.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(cache.len(), 2);
        assert_consistent(&cache);
    }

    #[test]
    fn test_remove_level_renumbers() {
        let cache = cache();
        cache.add_level(1, "LRU").unwrap();
        cache.add_level(1, "LRU").unwrap();
        cache.add_level(1, "LFU").unwrap();

        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();
        cache.put("c", "3").unwrap();
        assert_eq!(cache.level_of("a"), Some(3));
        assert_eq!(cache.level_of("b"), Some(2));
        assert_eq!(cache.level_of("c"), Some(1));

        cache.remove_level(2).unwrap();
        assert_eq!(cache.level_count(), 2);
        assert_eq!(cache.level_of("b"), None);
        assert_eq!(cache.level_of("a"), Some(2));
        assert_eq!(cache.get("a").unwrap(), Some("1".to_string()));

        let ids: Vec<usize> = cache.levels().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(cache.levels()[1].policy, EvictionPolicy::Lfu);
        assert_consistent(&cache);
    }

    #[test]
    fn test_remove_first_level_promotes_next() {
        let cache = cache();
        cache.add_level(1, "LRU").unwrap();
        cache.add_level(4, "LRU").unwrap();

        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();
        cache.remove_level(1).unwrap();

        assert_eq!(cache.level_count(), 1);
        assert_eq!(cache.level_of("a"), Some(1));
        assert_eq!(cache.get("b").unwrap(), None);

        cache.put("c", "3").unwrap();
        assert_eq!(cache.level_of("c"), Some(1));
        assert_consistent(&cache);
    }

    #[test]
    fn test_remove_unknown_level() {
        let cache = cache();
        cache.add_level(1, "LRU").unwrap();

        assert_eq!(
            cache.remove_level(0),
            Err(LevelCacheError::UnknownTier(0))
        );
        assert_eq!(
            cache.remove_level(2),
            Err(LevelCacheError::UnknownTier(2))
        );
        assert_eq!(cache.level_count(), 1);
    }

    #[test]
    fn test_remove_key() {
        let cache = cache();
        cache.add_level(1, "LRU").unwrap();
        cache.add_level(1, "LFU").unwrap();

        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();

        assert_eq!(cache.remove("a").unwrap(), Some("1".to_string()));
        assert_eq!(cache.remove("a").unwrap(), None);
        assert!(!cache.contains_key("a"));
        assert!(cache.contains_key("b"));
        assert_consistent(&cache);
    }

    #[test]
    fn test_clones_share_state() {
        let cache = cache();
        let other = cache.clone();
        cache.add_level(2, "LRU").unwrap();
        other.put("k", "v").unwrap();

        assert_eq!(cache.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(other.level_count(), 1);
    }
}

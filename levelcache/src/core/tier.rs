use crate::cache::{Engine, StorageEngine};
use crate::core::types::{EvictionPolicy, LevelInfo, TierSnapshot};
use parking_lot::Mutex;

/// One level of the cache hierarchy.
///
/// The engine sits behind its own mutex: even a logical read reorders the
/// engine, and several readers may reach the same level while the stack is
/// only share-locked.
#[derive(Debug)]
pub struct Tier {
    id: usize,
    capacity: usize,
    engine: Mutex<Engine>,
}

impl Tier {
    pub fn new(id: usize, capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            id,
            capacity,
            engine: Mutex::new(Engine::new(policy, capacity)),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.engine.lock().policy()
    }

    pub fn len(&self) -> usize {
        self.engine.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a pair and report what the engine evicted to make room.
    /// Returns `(was_update, evicted)`.
    pub fn insert(&self, key: String, value: String) -> (bool, Option<(String, String)>) {
        let mut engine = self.engine.lock();
        let updated = engine.insert(key, value);
        let evicted = engine.take_evicted();
        (updated, evicted)
    }

    pub fn find(&self, key: &str) -> Option<String> {
        self.engine.lock().find(key)
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.engine.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.engine.lock().contains(key)
    }

    /// Keys resident in this level
    pub fn keys(&self) -> Vec<String> {
        self.engine
            .lock()
            .snapshot()
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    pub fn info(&self) -> LevelInfo {
        let engine = self.engine.lock();
        LevelInfo {
            id: self.id,
            capacity: self.capacity,
            policy: engine.policy(),
            len: engine.len(),
        }
    }

    pub fn snapshot(&self) -> TierSnapshot {
        let engine = self.engine.lock();
        TierSnapshot {
            id: self.id,
            capacity: self.capacity,
            policy: engine.policy(),
            entries: engine.snapshot(),
        }
    }
}

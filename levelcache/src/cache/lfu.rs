//! LFU (Least Frequently Used) Storage Engine
//!
//! Classic O(1) LFU: every frequency owns an insertion-ordered bucket of
//! entries, and the engine tracks the smallest non-empty frequency. Buckets
//! are intrusive lists over a slot arena, so moving an entry between
//! frequencies and evicting the oldest entry of the minimum bucket are both
//! constant time.

use super::StorageEngine;
use std::collections::HashMap;
use std::mem;

type NodeIndex = usize;

const NIL: NodeIndex = usize::MAX;

/// Entry in the LFU arena with its frequency counter
#[derive(Debug)]
struct LfuNode {
    key: String,
    value: String,
    frequency: u64,
    /// Entry that joined the same bucket earlier
    prev: NodeIndex,
    /// Entry that joined the same bucket later
    next: NodeIndex,
}

/// Entries sharing one frequency, oldest at the head
#[derive(Debug, Clone, Copy)]
struct Bucket {
    head: NodeIndex,
    tail: NodeIndex,
}

/// LFU engine - evicts the least frequently used entry, oldest first on ties
#[derive(Debug)]
pub struct LfuEngine {
    capacity: usize,
    nodes: Vec<LfuNode>,
    free: Vec<NodeIndex>,
    map: HashMap<String, NodeIndex>,
    buckets: HashMap<u64, Bucket>,
    min_frequency: u64,
    evicted: Option<(String, String)>,
}

impl LfuEngine {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "level capacity must be positive");
        Self {
            capacity,
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            map: HashMap::with_capacity(capacity),
            buckets: HashMap::new(),
            min_frequency: 0,
            evicted: None,
        }
    }

    /// Current access frequency of a resident key
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.map.get(key).map(|&idx| self.nodes[idx].frequency)
    }

    /// Append a node to the tail of its frequency bucket
    fn push_back(&mut self, idx: NodeIndex) {
        let frequency = self.nodes[idx].frequency;
        let bucket = self.buckets.entry(frequency).or_insert(Bucket {
            head: NIL,
            tail: NIL,
        });

        let old_tail = bucket.tail;
        bucket.tail = idx;
        if old_tail == NIL {
            bucket.head = idx;
        }

        self.nodes[idx].prev = old_tail;
        self.nodes[idx].next = NIL;
        if old_tail != NIL {
            self.nodes[old_tail].next = idx;
        }
    }

    /// Detach a node from its frequency bucket, dropping the bucket once empty.
    /// Returns true when the bucket was removed.
    fn unlink(&mut self, idx: NodeIndex) -> bool {
        let (frequency, prev, next) = {
            let node = &self.nodes[idx];
            (node.frequency, node.prev, node.next)
        };

        if prev != NIL {
            self.nodes[prev].next = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;

        let emptied = match self.buckets.get_mut(&frequency) {
            Some(bucket) => {
                if bucket.head == idx {
                    bucket.head = next;
                }
                if bucket.tail == idx {
                    bucket.tail = prev;
                }
                bucket.head == NIL
            }
            None => false,
        };

        if emptied {
            self.buckets.remove(&frequency);
        }
        emptied
    }

    /// Move an entry to the next frequency bucket
    fn touch(&mut self, idx: NodeIndex) {
        let frequency = self.nodes[idx].frequency;
        let emptied = self.unlink(idx);
        if emptied && frequency == self.min_frequency {
            self.min_frequency = frequency + 1;
        }

        self.nodes[idx].frequency = frequency + 1;
        self.push_back(idx);
    }

    /// Remove the oldest entry of the minimum-frequency bucket
    fn evict(&mut self) {
        let idx = match self.buckets.get(&self.min_frequency) {
            Some(bucket) => bucket.head,
            None => return,
        };

        self.unlink(idx);
        let node = &mut self.nodes[idx];
        let key = mem::take(&mut node.key);
        let value = mem::take(&mut node.value);
        self.map.remove(&key);
        self.free.push(idx);
        self.evicted = Some((key, value));
    }

    fn allocate(&mut self, key: String, value: String) -> NodeIndex {
        let node = LfuNode {
            key,
            value,
            frequency: 1,
            prev: NIL,
            next: NIL,
        };

        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }
}

impl StorageEngine for LfuEngine {
    fn insert(&mut self, key: String, value: String) -> bool {
        if let Some(&idx) = self.map.get(&key) {
            self.nodes[idx].value = value;
            self.touch(idx);
            return true;
        }

        if self.map.len() >= self.capacity {
            self.evict();
        }

        let idx = self.allocate(key.clone(), value);
        self.push_back(idx);
        self.map.insert(key, idx);
        self.min_frequency = 1;
        false
    }

    fn find(&mut self, key: &str) -> Option<String> {
        let idx = *self.map.get(key)?;
        self.touch(idx);
        Some(self.nodes[idx].value.clone())
    }

    fn take_evicted(&mut self) -> Option<(String, String)> {
        self.evicted.take()
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.map.remove(key)?;
        let frequency = self.nodes[idx].frequency;
        if self.unlink(idx) && frequency == self.min_frequency {
            self.min_frequency = self.buckets.keys().min().copied().unwrap_or(0);
        }
        self.free.push(idx);
        let node = &mut self.nodes[idx];
        node.key.clear();
        Some(mem::take(&mut node.value))
    }

    fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        let mut frequencies: Vec<u64> = self.buckets.keys().copied().collect();
        frequencies.sort_unstable();

        let mut entries = Vec::with_capacity(self.map.len());
        for frequency in frequencies {
            let mut idx = self.buckets[&frequency].head;
            while idx != NIL {
                let node = &self.nodes[idx];
                entries.push((node.key.clone(), node.value.clone()));
                idx = node.next;
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfu_basic() {
        let mut engine = LfuEngine::new(3);

        engine.insert("a".into(), "1".into());
        engine.insert("b".into(), "2".into());
        engine.insert("c".into(), "3".into());

        assert_eq!(engine.find("a"), Some("1".to_string())); // freq=2
        assert_eq!(engine.find("a"), Some("1".to_string())); // freq=3
        assert_eq!(engine.find("b"), Some("2".to_string())); // freq=2

        // Insert d, should evict c (freq=1, least frequent)
        engine.insert("d".into(), "4".into());
        assert_eq!(engine.take_evicted(), Some(("c".into(), "3".into())));

        assert_eq!(engine.find("c"), None);
        assert_eq!(engine.find("a"), Some("1".to_string()));
        assert_eq!(engine.find("d"), Some("4".to_string()));
    }

    #[test]
    fn test_lfu_tie_evicts_oldest_in_bucket() {
        let mut engine = LfuEngine::new(3);
        engine.insert("a".into(), "1".into());
        engine.insert("b".into(), "2".into());
        engine.insert("c".into(), "3".into());

        engine.insert("d".into(), "4".into());
        assert_eq!(engine.take_evicted(), Some(("a".into(), "1".into())));

        engine.insert("e".into(), "5".into());
        assert_eq!(engine.take_evicted(), Some(("b".into(), "2".into())));
    }

    #[test]
    fn test_lfu_bucket_order_follows_arrival() {
        let mut engine = LfuEngine::new(3);
        engine.insert("a".into(), "1".into());
        engine.insert("b".into(), "2".into());
        engine.insert("c".into(), "3".into());

        // b reaches frequency 2 before a does
        engine.find("b");
        engine.find("a");
        // c is alone at frequency 1
        engine.insert("d".into(), "4".into());
        assert_eq!(engine.take_evicted(), Some(("c".into(), "3".into())));

        // d alone at frequency 1
        engine.find("d");
        // frequency 2 bucket is now [b, a, d]
        engine.insert("e".into(), "5".into());
        assert_eq!(engine.take_evicted(), Some(("b".into(), "2".into())));
    }

    #[test]
    fn test_lfu_access_increments_by_one() {
        let mut engine = LfuEngine::new(2);
        engine.insert("a".into(), "1".into());
        assert_eq!(engine.frequency("a"), Some(1));

        engine.find("a");
        assert_eq!(engine.frequency("a"), Some(2));

        // Re-put counts as an access
        assert!(engine.insert("a".into(), "10".into()));
        assert_eq!(engine.frequency("a"), Some(3));
        assert_eq!(engine.find("a"), Some("10".to_string()));
        assert_eq!(engine.frequency("a"), Some(4));
        assert_eq!(engine.frequency("missing"), None);
    }

    #[test]
    fn test_lfu_min_frequency_advances() {
        let mut engine = LfuEngine::new(2);
        engine.insert("a".into(), "1".into());
        engine.insert("b".into(), "2".into());

        engine.find("a");
        engine.find("b");
        engine.find("b");
        // a=2, b=3; minimum moved past the emptied bucket 1
        assert_eq!(engine.min_frequency, 2);

        engine.insert("c".into(), "3".into());
        assert_eq!(engine.take_evicted(), Some(("a".into(), "1".into())));
        assert_eq!(engine.min_frequency, 1);
        assert!(engine.contains("b"));
        assert!(engine.contains("c"));
    }

    #[test]
    fn test_lfu_update_does_not_evict() {
        let mut engine = LfuEngine::new(1);
        engine.insert("a".into(), "1".into());
        engine.insert("a".into(), "2".into());

        assert_eq!(engine.take_evicted(), None);
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.find("a"), Some("2".to_string()));
    }

    #[test]
    fn test_lfu_remove_recomputes_minimum() {
        let mut engine = LfuEngine::new(3);
        engine.insert("a".into(), "1".into());
        engine.insert("b".into(), "2".into());
        engine.insert("c".into(), "3".into());
        engine.find("b");
        engine.find("c");
        engine.find("c");

        // a was the only entry at frequency 1
        assert_eq!(engine.remove("a"), Some("1".to_string()));
        assert_eq!(engine.min_frequency, 2);
        assert_eq!(engine.remove("a"), None);
        assert_eq!(engine.len(), 2);

        engine.insert("d".into(), "4".into());
        assert_eq!(engine.take_evicted(), None);
        engine.insert("e".into(), "5".into());
        assert_eq!(engine.take_evicted(), Some(("d".into(), "4".into())));
    }

    #[test]
    fn test_lfu_snapshot_order() {
        let mut engine = LfuEngine::new(4);
        engine.insert("a".into(), "1".into());
        engine.insert("b".into(), "2".into());
        engine.insert("c".into(), "3".into());
        engine.find("a");
        engine.find("a");
        engine.find("c");

        let keys: Vec<String> = engine.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_lfu_size_bounded_by_capacity() {
        let capacity = 4;
        let mut engine = LfuEngine::new(capacity);

        for i in 0..25 {
            engine.insert(format!("k{}", i), i.to_string());
            if i >= capacity {
                assert!(engine.take_evicted().is_some());
            } else {
                assert!(engine.take_evicted().is_none());
            }
            assert_eq!(engine.len(), (i + 1).min(capacity));
        }
        assert_eq!(engine.nodes.len(), capacity);
    }
}

//! LRU (Least Recently Used) Storage Engine
//!
//! Entries live in a slot arena and are threaded into a doubly linked
//! recency list by index. The head is the most recently used entry, the
//! tail the least recently used one. Evicted slots are recycled through a
//! free list so a full level never reallocates.

use super::StorageEngine;
use std::collections::HashMap;
use std::mem;

/// Index into the node arena
type NodeIndex = usize;

/// Sentinel for a missing link
const NIL: NodeIndex = usize::MAX;

/// Arena slot holding one resident pair
#[derive(Debug)]
struct LruNode {
    key: String,
    value: String,
    /// More recently used neighbour
    prev: NodeIndex,
    /// Less recently used neighbour
    next: NodeIndex,
}

/// LRU engine - evicts the least recently touched entry
#[derive(Debug)]
pub struct LruEngine {
    capacity: usize,
    nodes: Vec<LruNode>,
    free: Vec<NodeIndex>,
    map: HashMap<String, NodeIndex>,
    head: NodeIndex,
    tail: NodeIndex,
    evicted: Option<(String, String)>,
}

impl LruEngine {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "level capacity must be positive");
        Self {
            capacity,
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            map: HashMap::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            evicted: None,
        }
    }

    /// Detach a node from the recency list, leaving its slot allocated
    fn unlink(&mut self, idx: NodeIndex) {
        let (prev, next) = {
            let node = &self.nodes[idx];
            (node.prev, node.next)
        };

        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }

        let node = &mut self.nodes[idx];
        node.prev = NIL;
        node.next = NIL;
    }

    /// Link a detached node in front of the current head
    fn push_front(&mut self, idx: NodeIndex) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;

        if self.head == NIL {
            self.tail = idx;
        } else {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
    }

    fn move_to_front(&mut self, idx: NodeIndex) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    /// Remove the tail entry and remember it as the pending evicted pair
    fn evict_tail(&mut self) {
        let idx = self.tail;
        if idx == NIL {
            return;
        }

        self.unlink(idx);
        let node = &mut self.nodes[idx];
        let key = mem::take(&mut node.key);
        let value = mem::take(&mut node.value);
        self.map.remove(&key);
        self.free.push(idx);
        self.evicted = Some((key, value));
    }

    fn allocate(&mut self, key: String, value: String) -> NodeIndex {
        let node = LruNode {
            key,
            value,
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

impl StorageEngine for LruEngine {
    fn insert(&mut self, key: String, value: String) -> bool {
        if let Some(&idx) = self.map.get(&key) {
            self.nodes[idx].value = value;
            self.move_to_front(idx);
            return true;
        }

        if self.map.len() >= self.capacity {
            self.evict_tail();
        }

        let idx = self.allocate(key.clone(), value);
        self.push_front(idx);
        self.map.insert(key, idx);
        false
    }

    fn find(&mut self, key: &str) -> Option<String> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        Some(self.nodes[idx].value.clone())
    }

    fn take_evicted(&mut self) -> Option<(String, String)> {
        self.evicted.take()
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
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
        let mut entries = Vec::with_capacity(self.map.len());
        let mut idx = self.head;
        while idx != NIL {
            let node = &self.nodes[idx];
            entries.push((node.key.clone(), node.value.clone()));
            idx = node.next;
        }
        entries
    }
}

//! SIEVE Eviction
//!
//! In-tree SIEVE cache (Zhang et al., NSDI '24).
//!
//! Entries live in a FIFO queue (head = newest). A hit only flips the entry's
//! `visited` bit; nothing moves. On eviction the hand walks from the tail
//! toward the head, clearing `visited` bits until it finds an unvisited entry,
//! which is evicted. The hand then stays where it stopped.
//!
//! # Concurrency
//! `visited` is an atomic so hits only need the read lock. Inserts and
//! evictions take the write lock.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::CacheKey;
use crate::cache::Cache;

const NIL: usize = usize::MAX;

struct Node<K> {
    key: K,
    value: K,
    visited: AtomicBool,
    /// Toward the head (newer)
    prev: usize,
    /// Toward the tail (older)
    next: usize,
}

struct SieveState<K> {
    index: HashMap<K, usize>,
    nodes: Vec<Node<K>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    hand: usize,
}

pub struct SieveCache<K: CacheKey> {
    state: RwLock<SieveState<K>>,
    capacity: usize,
}

impl<K: CacheKey> SieveCache<K> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(SieveState {
                index: HashMap::with_capacity(capacity),
                nodes: Vec::with_capacity(capacity),
                free: Vec::new(),
                head: NIL,
                tail: NIL,
                hand: NIL,
            }),
            capacity,
        }
    }
}

impl<K: CacheKey> SieveState<K> {
    fn push_head(&mut self, key: K, value: K) -> usize {
        let node = Node {
            key,
            value,
            visited: AtomicBool::new(false),
            prev: NIL,
            next: self.head,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
        slot
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn evict(&mut self) {
        let mut cursor = if self.hand == NIL { self.tail } else { self.hand };
        while cursor != NIL {
            let node = &self.nodes[cursor];
            if !node.visited.swap(false, Ordering::Relaxed) {
                break;
            }
            cursor = if node.prev == NIL { self.tail } else { node.prev };
        }
        if cursor == NIL {
            return;
        }

        self.hand = self.nodes[cursor].prev;
        self.unlink(cursor);
        let victim = self.nodes[cursor].key.clone();
        self.index.remove(&victim);
        self.free.push(cursor);
    }
}

impl<K: CacheKey> Cache<K> for SieveCache<K> {
    fn get(&self, key: &K) -> Option<K> {
        let state = self.state.read();
        let slot = *state.index.get(key)?;
        let node = &state.nodes[slot];
        node.visited.store(true, Ordering::Relaxed);
        Some(node.value.clone())
    }

    fn set(&self, key: K, value: K) {
        let mut state = self.state.write();
        if let Some(&slot) = state.index.get(&key) {
            let node = &mut state.nodes[slot];
            node.value = value;
            node.visited.store(true, Ordering::Relaxed);
            return;
        }

        if state.index.len() >= self.capacity {
            state.evict();
        }
        let slot = state.push_head(key.clone(), value);
        state.index.insert(key, slot);
    }

    fn name(&self) -> &str {
        "sieve"
    }

    fn len(&self) -> usize {
        self.state.read().index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visited_entries_survive_eviction() {
        let cache = SieveCache::<u64>::new(3);
        cache.set(1, 1);
        cache.set(2, 2);
        cache.set(3, 3);
        assert!(cache.get(&1).is_some());

        // 1 is visited, so the hand skips it and evicts 2
        cache.set(4, 4);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&3), Some(3));
        assert_eq!(cache.get(&4), Some(4));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn all_visited_degrades_to_fifo() {
        let cache = SieveCache::<u64>::new(2);
        cache.set(1, 1);
        cache.set(2, 2);
        cache.get(&1);
        cache.get(&2);

        cache.set(3, 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn slots_are_reused_after_eviction() {
        let cache = SieveCache::<u64>::new(4);
        for i in 0..1_000 {
            cache.set(i, i);
        }
        assert_eq!(cache.len(), 4);
        assert!(cache.state.read().nodes.len() <= 4);
    }
}

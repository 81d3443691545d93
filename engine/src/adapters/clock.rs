//! In-tree CLOCK (second-chance) cache.
//!
//! Fixed ring of `capacity` slots with a reference bit per slot. A hit sets
//! the bit under the read lock; on a miss with a full ring the hand sweeps,
//! clearing bits, and replaces the first slot whose bit was already clear.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::CacheKey;
use crate::cache::Cache;

struct Slot<K> {
    key: K,
    value: K,
    referenced: AtomicBool,
}

struct ClockState<K> {
    index: HashMap<K, usize>,
    ring: Vec<Slot<K>>,
    hand: usize,
}

pub struct ClockCache<K: CacheKey> {
    state: RwLock<ClockState<K>>,
    capacity: usize,
}

impl<K: CacheKey> ClockCache<K> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(ClockState {
                index: HashMap::with_capacity(capacity),
                ring: Vec::with_capacity(capacity),
                hand: 0,
            }),
            capacity,
        }
    }
}

impl<K: CacheKey> ClockState<K> {
    /// Advance the hand to the next victim and return its slot.
    fn sweep(&mut self) -> usize {
        loop {
            let slot = self.hand;
            self.hand = (self.hand + 1) % self.ring.len();
            if !self.ring[slot].referenced.swap(false, Ordering::Relaxed) {
                return slot;
            }
        }
    }
}

impl<K: CacheKey> Cache<K> for ClockCache<K> {
    fn get(&self, key: &K) -> Option<K> {
        let state = self.state.read();
        let slot = &state.ring[*state.index.get(key)?];
        slot.referenced.store(true, Ordering::Relaxed);
        Some(slot.value.clone())
    }

    fn set(&self, key: K, value: K) {
        let mut state = self.state.write();
        if let Some(&idx) = state.index.get(&key) {
            let slot = &mut state.ring[idx];
            slot.value = value;
            slot.referenced.store(true, Ordering::Relaxed);
            return;
        }

        let fresh = Slot {
            key: key.clone(),
            value,
            referenced: AtomicBool::new(false),
        };
        if state.ring.len() < self.capacity {
            state.ring.push(fresh);
            let idx = state.ring.len() - 1;
            state.index.insert(key, idx);
            return;
        }

        let idx = state.sweep();
        let old = std::mem::replace(&mut state.ring[idx], fresh);
        state.index.remove(&old.key);
        state.index.insert(key, idx);
    }

    fn name(&self) -> &str {
        "clock"
    }

    fn len(&self) -> usize {
        self.state.read().index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_slot_gets_second_chance() {
        let cache = ClockCache::<u64>::new(2);
        cache.set(1, 1);
        cache.set(2, 2);
        cache.get(&1);

        cache.set(3, 3);
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwrite_does_not_grow() {
        let cache = ClockCache::<u64>::new(4);
        for _ in 0..10 {
            cache.set(9, 9);
        }
        assert_eq!(cache.len(), 1);
    }
}

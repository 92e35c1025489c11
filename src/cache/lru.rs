//! LRU Index Module
//!
//! Implements size-bounded Least Recently Used tracking for cache eviction.

use std::collections::HashMap;

use crate::error::{CacheError, Result};

/// Null link in the recency list.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    key: String,
    size: u64,
    prev: usize,
    next: usize,
}

// == LRU Index ==
/// Tracks write recency and per-key sizes against a memory ceiling.
///
/// Nodes live in an arena and link to each other by slot index:
/// - `head` = most recently written
/// - `tail` = least recently written, the next eviction victim
///
/// Freed slots are recycled through `free`.
#[derive(Debug)]
pub struct LruIndex {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    map: HashMap<String, usize>,
    head: usize,
    tail: usize,
    current_size: u64,
    max_size: u64,
}

impl LruIndex {
    // == Constructor ==
    /// Creates an empty index with the given ceiling in bytes.
    pub fn new(max_size: u64) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            map: HashMap::new(),
            head: NIL,
            tail: NIL,
            current_size: 0,
            max_size,
        }
    }

    /// Sum of the sizes of all tracked keys.
    pub fn size(&self) -> u64 {
        self.current_size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Size recorded for `key`.
    pub fn size_of(&self, key: &str) -> Option<u64> {
        self.map.get(key).map(|&slot| self.node(slot).size)
    }

    // == Set Max Size ==
    /// Changes the ceiling, evicting least recently written keys until the
    /// tracked size fits under it.
    ///
    /// Raising the ceiling never evicts. The new ceiling is committed only
    /// after eviction has finished.
    pub fn set_max_size(&mut self, max_size: u64) -> Result<Vec<String>> {
        if max_size == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        if max_size >= self.max_size {
            self.max_size = max_size;
            return Ok(Vec::new());
        }

        let evicted = self.evict_at_least(self.current_size.saturating_sub(max_size));
        self.max_size = max_size;
        Ok(evicted)
    }

    // == Add Or Update ==
    /// Records a write of `key` with the given size and makes it the most
    /// recently used key.
    ///
    /// An existing key is dropped first so its old size no longer counts.
    /// Least recently written keys are evicted until the new size fits, and
    /// their names are returned. Nothing changes if `size` alone exceeds the
    /// ceiling.
    pub fn add_or_update(&mut self, key: &str, size: u64) -> Result<Vec<String>> {
        if size > self.max_size {
            return Err(CacheError::EntryTooLarge {
                key: key.to_string(),
                size,
                max_size: self.max_size,
            });
        }

        self.remove(key);

        // current_size <= max_size holds here, so the headroom cannot underflow
        let needed = size.saturating_sub(self.max_size - self.current_size);
        let evicted = self.evict_at_least(needed);
        self.push_front(key.to_string(), size);
        Ok(evicted)
    }

    // == Remove ==
    /// Stops tracking `key`, returning the size it held.
    pub fn remove(&mut self, key: &str) -> Option<u64> {
        let slot = self.map.remove(key)?;
        self.unlink(slot);
        let node = self.release(slot);
        self.current_size -= node.size;
        Some(node.size)
    }

    /// Returns the least recently written key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&str> {
        (self.tail != NIL).then(|| self.node(self.tail).key.as_str())
    }

    /// Iterates keys from most to least recently written.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let node = self.node(cursor);
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    // == Internal Helpers ==
    /// Evicts from the tail until at least `bytes` have been freed.
    fn evict_at_least(&mut self, bytes: u64) -> Vec<String> {
        let mut evicted = Vec::new();
        if bytes == 0 {
            return evicted;
        }
        assert!(
            bytes <= self.current_size,
            "LRU index asked to free {} bytes but only tracks {}",
            bytes,
            self.current_size
        );

        let mut freed = 0;
        while freed < bytes {
            let slot = self.tail;
            assert!(slot != NIL, "LRU index tail missing with {} bytes tracked", self.current_size);

            self.unlink(slot);
            let node = self.release(slot);
            self.map.remove(&node.key);
            self.current_size -= node.size;
            freed += node.size;
            evicted.push(node.key);
        }
        evicted
    }

    fn push_front(&mut self, key: String, size: u64) {
        let node = Node {
            key: key.clone(),
            size,
            prev: NIL,
            next: self.head,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        if self.head != NIL {
            self.node_mut(self.head).prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }

        self.map.insert(key, slot);
        self.current_size += size;
    }

    /// Detaches `slot` from the list, relinking its neighbours.
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node(slot);
            (node.prev, node.next)
        };

        if prev != NIL {
            self.node_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn release(&mut self, slot: usize) -> Node {
        let node = self.slots[slot]
            .take()
            .unwrap_or_else(|| unreachable!("LRU slot {} released twice", slot));
        self.free.push(slot);
        node
    }

    fn node(&self, slot: usize) -> &Node {
        self.slots[slot]
            .as_ref()
            .unwrap_or_else(|| unreachable!("LRU slot {} is vacant", slot))
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        self.slots[slot]
            .as_mut()
            .unwrap_or_else(|| unreachable!("LRU slot {} is vacant", slot))
    }
}

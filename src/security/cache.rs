//! Bounded LRU cache with a time-to-live, split into independently locked
//! shards.
//!
//! Capacity is divided evenly between shards, so the least recently used
//! entry of the *shard* is evicted on overflow. Expired entries are dropped
//! lazily on access and in bulk by [`ShardedTtlCache::purge_expired`], which
//! locks one shard at a time.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

const MAX_SHARDS: usize = 16;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    written_at: Instant,
}

/// Thread-safe LRU + TTL cache.
pub struct ShardedTtlCache<K, V> {
    shards: Box<[Mutex<LruCache<K, Entry<V>>>]>,
    hasher: RandomState,
    ttl: Duration,
}

impl<K: Hash + Eq + Clone, V: Clone> ShardedTtlCache<K, V> {
    /// Create a cache holding at most `capacity` entries for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        let shard_count = capacity.min(MAX_SHARDS);
        let per_shard = NonZeroUsize::new(capacity.div_ceil(shard_count)).unwrap_or(NonZeroUsize::MIN);
        let shards = (0..shard_count)
            .map(|_| Mutex::new(LruCache::new(per_shard)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            hasher: RandomState::new(),
            ttl,
        }
    }

    fn shard(&self, key: &K) -> &Mutex<LruCache<K, Entry<V>>> {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }

    fn is_fresh(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.duration_since(entry.written_at) < self.ttl
    }

    /// Fresh value for `key`, marking it recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut shard = self.shard(key).lock();
        match shard.get(key) {
            Some(entry) if self.is_fresh(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                shard.pop(key);
                None
            }
            None => None,
        }
    }

    /// Fresh value for `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let shard = self.shard(key).lock();
        shard
            .peek(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        let now = Instant::now();
        let shard = self.shard(key).lock();
        shard.peek(key).is_some_and(|entry| self.is_fresh(entry, now))
    }

    pub fn insert(&self, key: K, value: V) {
        let written_at = Instant::now();
        self.shard(&key).lock().put(key, Entry { value, written_at });
    }

    /// Insert `value` unless a fresh entry already exists; returns the value now cached.
    pub fn insert_if_absent(&self, key: K, value: V) -> V {
        self.upsert(key, || value, |current| current.clone())
    }

    /// Read-modify-write `key` under its shard lock.
    ///
    /// A missing or expired entry is first replaced with `seed()`. The write
    /// refreshes the entry's TTL.
    pub fn upsert<R>(&self, key: K, seed: impl FnOnce() -> V, update: impl FnOnce(&mut V) -> R) -> R {
        let now = Instant::now();
        let mut shard = self.shard(&key).lock();

        let fresh = shard.get(&key).is_some_and(|entry| self.is_fresh(entry, now));
        if fresh {
            if let Some(entry) = shard.get_mut(&key) {
                entry.written_at = now;
                return update(&mut entry.value);
            }
        }

        let mut value = seed();
        let result = update(&mut value);
        shard.put(key, Entry { value, written_at: now });
        result
    }

    /// Mutate a fresh entry in place without refreshing its TTL.
    pub fn modify<R>(&self, key: &K, update: impl FnOnce(&mut V) -> R) -> Option<R> {
        let now = Instant::now();
        let mut shard = self.shard(key).lock();
        match shard.peek_mut(key) {
            Some(entry) if self.is_fresh(entry, now) => Some(update(&mut entry.value)),
            _ => None,
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).lock().pop(key).map(|entry| entry.value)
    }

    /// Drop expired entries, one shard at a time.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            let expired: Vec<K> = shard
                .iter()
                .filter(|(_, entry)| !self.is_fresh(entry, now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                shard.pop(&key);
                removed += 1;
            }
        }
        removed
    }

    /// Entries currently held, including ones not yet purged.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().cap().get()).sum()
    }
}

//! Shared snapshot cache
//!
//! Holds the latest snapshot per view domain so a view opened later can
//! render immediately instead of starting blank. The cache is an injected
//! handle, cloned into every writer and reader. It is not a process-wide
//! global.
//!
//! Writes replace the whole entry and bump its generation. Concurrent writers
//! to one key resolve last-write-wins. A reader always gets a complete snapshot
//! and never a mix of two writes.

use dashmap::DashMap;
use std::sync::Arc;
use strum::{EnumIter, IntoEnumIterator};

use crate::document::DataSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CacheKey {
    Frontpage,
    WhalesFull,
    WoiFull,
    ArbitrageFutures,
    ArbitrageSpot,
    ArbitrageDex,
}

impl CacheKey {
    pub fn all() -> impl Iterator<Item = CacheKey> {
        CacheKey::iter()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Arc<DataSnapshot>,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot for `key` and returns its new generation.
    pub fn write(&self, key: CacheKey, snapshot: Arc<DataSnapshot>) -> u64 {
        let mut entry = self.entries.entry(key).or_insert_with(|| CacheEntry {
            snapshot: Arc::new(DataSnapshot::empty()),
            generation: 0,
        });
        entry.snapshot = snapshot;
        entry.generation += 1;
        log::debug!("Cached {} (generation {})", key, entry.generation);
        entry.generation
    }

    /// Latest snapshot for `key`, or an empty snapshot when nothing was
    /// written yet.
    pub fn read(&self, key: CacheKey) -> Arc<DataSnapshot> {
        self.entries
            .get(&key)
            .map(|entry| Arc::clone(&entry.snapshot))
            .unwrap_or_else(|| Arc::new(DataSnapshot::empty()))
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of writes `key` has seen. Zero when never written.
    pub fn generation(&self, key: CacheKey) -> u64 {
        self.entries.get(&key).map(|entry| entry.generation).unwrap_or(0)
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        CacheKey::all().filter(|key| self.contains(*key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::sources::Source;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Arc<DataSnapshot> {
        Arc::new(DataSnapshot::from_entries([(Source::Frontpage, Document::new(value))]))
    }

    #[test]
    fn test_missing_key_reads_empty() {
        let cache = SharedCache::new();
        assert!(cache.read(CacheKey::WoiFull).is_empty());
        assert!(!cache.contains(CacheKey::WoiFull));
        assert_eq!(cache.generation(CacheKey::WoiFull), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = SharedCache::new();
        assert_eq!(cache.write(CacheKey::Frontpage, snapshot(json!({"v": 1}))), 1);
        assert_eq!(cache.write(CacheKey::Frontpage, snapshot(json!({"v": 2}))), 2);

        let read = cache.read(CacheKey::Frontpage);
        assert_eq!(read.get(&Source::Frontpage).unwrap().get("v"), Some(&json!(2)));
        assert_eq!(cache.keys(), vec![CacheKey::Frontpage]);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = SharedCache::new();
        let writer = cache.clone();
        writer.write(CacheKey::ArbitrageDex, snapshot(json!({"pairs": []})));
        assert!(cache.contains(CacheKey::ArbitrageDex));
    }

    #[test]
    fn test_reader_keeps_snapshot_it_read() {
        let cache = SharedCache::new();
        cache.write(CacheKey::WhalesFull, snapshot(json!({"v": "old"})));
        let held = cache.read(CacheKey::WhalesFull);
        cache.write(CacheKey::WhalesFull, snapshot(json!({"v": "new"})));

        assert_eq!(held.get(&Source::Frontpage).unwrap().get("v"), Some(&json!("old")));
    }

    #[test]
    fn test_concurrent_writers_leave_one_complete_snapshot() {
        let cache = SharedCache::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        cache.write(CacheKey::WoiFull, snapshot(json!({"writer": i})));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.generation(CacheKey::WoiFull), 400);
        let read = cache.read(CacheKey::WoiFull);
        assert_eq!(read.len(), 1);
        assert!(read.get(&Source::Frontpage).unwrap().get("writer").is_some());
    }
}

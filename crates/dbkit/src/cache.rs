//! Structural statement cache.
//!
//! Maps a [`Request`] to its compiled [`CommandText`]. Lookups hash the
//! request to pick a shard, then compare keys with full structural equality,
//! so a hash collision can never return another request's text.
//!
//! - Compilation runs outside any lock; concurrent misses on the same shape
//!   may both compile, and the first insert wins
//! - Entries are never evicted individually; [`StatementCache::clear`] drops
//!   everything

use crate::config::StatementCacheConfig;
use crate::error::DbResult;
use crate::query_builder::CommandText;
use crate::request::Request;
use std::collections::HashMap;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type Shard = RwLock<HashMap<Request, Arc<CommandText>>>;

/// Sharded, first-writer-wins cache of compiled statements.
#[derive(Debug)]
pub struct StatementCache {
    enabled: bool,
    shards: Box<[Shard]>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheProbe {
    Disabled,
    Hit(Arc<CommandText>),
    Miss,
}

impl StatementCache {
    pub fn new(config: StatementCacheConfig) -> Self {
        let shards = (0..config.shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            enabled: config.enabled,
            shards,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a request without compiling; counts a hit or a miss.
    pub fn probe(&self, request: &Request) -> CacheProbe {
        if !self.enabled {
            return CacheProbe::Disabled;
        }
        let found = self
            .shard(request)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request)
            .cloned();
        match found {
            Some(cmd) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                CacheProbe::Hit(cmd)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                CacheProbe::Miss
            }
        }
    }

    /// Store a compiled statement unless one is already present; returns the
    /// entry that ends up cached.
    pub fn insert_if_absent(&self, request: &Request, cmd: CommandText) -> Arc<CommandText> {
        let cmd = Arc::new(cmd);
        if !self.enabled {
            return cmd;
        }
        let mut shard = self
            .shard(request)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match shard.entry(request.clone()) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => Arc::clone(slot.insert(cmd)),
        }
    }

    /// Return the cached statement for `request`, compiling it on a miss.
    pub fn get_or_try_insert<F>(&self, request: &Request, compile: F) -> DbResult<Arc<CommandText>>
    where
        F: FnOnce(&Request) -> DbResult<CommandText>,
    {
        match self.probe(request) {
            CacheProbe::Hit(cmd) => Ok(cmd),
            CacheProbe::Disabled => compile(request).map(Arc::new),
            CacheProbe::Miss => {
                let cmd = compile(request)?;
                Ok(self.insert_if_absent(request, cmd))
            }
        }
    }

    /// Drop every cached statement.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Number of cached statements.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn shard(&self, request: &Request) -> &Shard {
        let mut hasher = DefaultHasher::new();
        request.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new(StatementCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::field::Field;
    use crate::request::QueryAllRequest;
    use std::sync::atomic::AtomicUsize;

    fn request(table: &str) -> Request {
        QueryAllRequest::new(table, Field::from_names(["A"])).into()
    }

    fn compiled(text: &str) -> CommandText {
        CommandText {
            text: text.to_string(),
            parameters: Vec::new(),
        }
    }

    #[test]
    fn miss_then_hit() {
        let cache = StatementCache::default();
        let calls = AtomicUsize::new(0);
        let compile = |_: &Request| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(compiled("x"))
        };

        let first = cache.get_or_try_insert(&request("T"), compile).unwrap();
        let second = cache.get_or_try_insert(&request("T"), compile).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_requests_miss() {
        let cache = StatementCache::default();
        cache
            .get_or_try_insert(&request("T"), |_| Ok(compiled("t")))
            .unwrap();
        let other = cache
            .get_or_try_insert(&request("U"), |_| Ok(compiled("u")))
            .unwrap();
        assert_eq!(other.text, "u");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn first_writer_wins() {
        let cache = StatementCache::default();
        let winner = cache.insert_if_absent(&request("T"), compiled("first"));
        let loser = cache.insert_if_absent(&request("T"), compiled("second"));
        assert_eq!(loser.text, "first");
        assert!(Arc::ptr_eq(&winner, &loser));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = StatementCache::default();
        let err = cache
            .get_or_try_insert(&request("T"), |_| Err(DbError::MissingTableName))
            .unwrap_err();
        assert_eq!(err, DbError::MissingTableName);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = StatementCache::new(StatementCacheConfig {
            enabled: true,
            shards: 2,
        });
        for table in ["A", "B", "C"] {
            cache
                .get_or_try_insert(&request(table), |_| Ok(compiled(table)))
                .unwrap();
        }
        assert_eq!(cache.len(), 3);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_cache_always_compiles() {
        let cache = StatementCache::new(StatementCacheConfig {
            enabled: false,
            shards: 4,
        });
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            cache
                .get_or_try_insert(&request("T"), |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(compiled("x"))
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn concurrent_misses_converge_on_one_entry() {
        let cache = Arc::new(StatementCache::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .get_or_try_insert(&request("T"), |_| Ok(compiled(&format!("t{i}"))))
                        .unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let first = &results[0];
        assert!(results.iter().all(|r| r.text == first.text));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn hit_ratio() {
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
        assert_eq!(CacheStats { hits: 3, misses: 1 }.hit_ratio(), 0.75);
    }
}

//! Kernel value cache for the SMO solver
//!
//! Sequence kernels are expensive (edit distance is quadratic in the input
//! length, the subsequence kernel cubic), so evaluated entries of the Gram
//! matrix are kept in an LRU cache. The matrix is symmetric: only K(i, j)
//! with i <= j is stored.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Bytes charged per cached entry: two indices, the value and LRU links
const ENTRY_BYTES: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    i: usize,
    j: usize,
}

impl CacheKey {
    fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { i, j }
        } else {
            Self { i: j, j: i }
        }
    }
}

pub struct KernelCache {
    cache: LruCache<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Cache holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Cache sized from a memory budget in bytes
    pub fn with_memory_limit(memory_bytes: usize) -> Self {
        Self::new(memory_bytes / ENTRY_BYTES)
    }

    /// Cache able to hold the full Gram matrix of `n` samples, if the budget allows
    pub fn for_problem(n: usize, memory_bytes: usize) -> Self {
        let full = n.saturating_mul(n + 1) / 2;
        Self::new(full.min(memory_bytes / ENTRY_BYTES))
    }

    pub fn get(&mut self, i: usize, j: usize) -> Option<f64> {
        let key = CacheKey::new(i, j);
        match self.cache.get(&key) {
            Some(&value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, i: usize, j: usize, value: f64) {
        self.cache.put(CacheKey::new(i, j), value);
    }

    /// Cached K(i, j), evaluating and storing it on a miss
    pub fn get_or_compute<F>(&mut self, i: usize, j: usize, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        if let Some(value) = self.get(i, j) {
            return value;
        }
        let value = compute();
        self.put(i, j, value);
        value
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_lookup() {
        let mut cache = KernelCache::new(3);

        assert_eq!(cache.get(0, 1), None);
        assert_eq!(cache.stats().misses, 1);

        cache.put(0, 1, 5.0);
        assert_eq!(cache.get(1, 0), Some(5.0));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = KernelCache::new(2);

        cache.put(0, 1, 1.0);
        cache.put(1, 2, 2.0);
        cache.put(2, 3, 3.0);

        assert_eq!(cache.get(0, 1), None);
        assert_eq!(cache.get(1, 2), Some(2.0));
        assert_eq!(cache.get(3, 2), Some(3.0));
    }

    #[test]
    fn test_get_or_compute_evaluates_once() {
        let mut cache = KernelCache::new(10);
        let mut calls = 0;

        let first = cache.get_or_compute(4, 2, || {
            calls += 1;
            0.25
        });
        let second = cache.get_or_compute(2, 4, || {
            calls += 1;
            99.0
        });

        assert_eq!(first, 0.25);
        assert_eq!(second, 0.25);
        assert_eq!(calls, 1);
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn test_problem_sizing() {
        let cache = KernelCache::for_problem(10, 100 * 1024 * 1024);
        assert_eq!(cache.stats().capacity, 55);

        let tiny = KernelCache::with_memory_limit(0);
        assert_eq!(tiny.stats().capacity, 1);
    }
}

//! Request cache: fingerprints requests and stores raw response payloads.

use super::backend::CacheBackend;
use super::key::{CacheKey, CacheKeyGenerator};
use crate::types::ProcessRequest;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entry_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entry_size: 10 * 1024 * 1024,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A cached response as handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Value,
    pub cached: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Maps request fingerprints to previously fetched payloads.
///
/// No TTL and no invalidation: an entry lives until the backend evicts it or
/// it is overwritten by a later store of the same key.
pub struct RequestCache {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    keys: CacheKeyGenerator,
    stats: AtomicStats,
}

impl RequestCache {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            keys: CacheKeyGenerator::new(),
            stats: AtomicStats::default(),
        }
    }

    /// SHA-256 fingerprint of `request`; equal requests always share a key.
    pub fn key(&self, request: &ProcessRequest) -> CacheKey {
        self.keys.generate(request)
    }

    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        if !self.config.enabled {
            return Ok(None);
        }
        match self.backend.get(key).await {
            Ok(Some(data)) => match serde_json::from_slice::<Value>(&data) {
                Ok(payload) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    Ok(Some(CacheEntry {
                        payload,
                        cached: true,
                    }))
                }
                Err(e) => {
                    // unreadable entries count as misses and get refetched
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(key = %key, error = %e, "discarding corrupt cache entry");
                    Ok(None)
                }
            },
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Store a payload; overwrites any previous entry for `key`.
    pub async fn store(&self, key: &CacheKey, payload: &Value) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let data = serde_json::to_vec(payload)?;
        if data.len() > self.config.max_entry_size {
            tracing::debug!(key = %key, size = data.len(), "payload too large to cache");
            return Ok(());
        }
        match self.backend.set(key, &data).await {
            Ok(()) => {
                self.stats.stores.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn len(&self) -> Result<usize> {
        self.backend.len().await
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

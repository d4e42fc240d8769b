//! 响应缓存模块：按请求内容哈希缓存远端响应，避免重复调用。
//!
//! # Response Caching Module
//!
//! Responses from the text-processing service are cached by a SHA-256
//! fingerprint of the `(mode, text, options)` triple, so repeating the same
//! request is served without network access.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestCache`] | Fingerprinting, lookup and store with statistics |
//! | [`CacheConfig`] | Enable switch, entry size limit |
//! | [`CacheBackend`] | Trait for implementing custom cache backends |
//! | [`MemoryCache`] | In-memory LRU cache |
//! | [`FileCache`] | One JSON file per entry on disk |
//! | [`NullCache`] | No-op cache for disabling caching |
//! | [`CacheKey`] | Hex digest of a request |
//!
//! ## Example
//!
//! ```rust
//! use neurodrive_relay::cache::{CacheConfig, MemoryCache, RequestCache};
//!
//! let cache = RequestCache::new(CacheConfig::default(), Box::new(MemoryCache::new(1000)));
//! assert_eq!(cache.backend_name(), "memory");
//! ```
//!
//! The cache layer itself has no TTL and no size bound; eviction is left to
//! the backend.

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, FileCache, MemoryCache, NullCache};
pub use key::{CacheKey, CacheKeyGenerator};
pub use manager::{CacheConfig, CacheEntry, CacheStats, RequestCache};

//! Coalescing of identical in-flight fetches.

use crate::cache::CacheKey;
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type FlightResult<T> = std::result::Result<T, Arc<Error>>;

type SharedFetch<T> = Shared<BoxFuture<'static, FlightResult<T>>>;

/// At most one fetch per key at a time; later callers await the first one's result.
///
/// The entry is removed when the leading caller finishes or is dropped, so a
/// failed fetch is never replayed to callers that arrive afterwards.
pub struct SingleFlight<T> {
    inflight: Mutex<HashMap<CacheKey, SharedFetch<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F>(&self, key: CacheKey, fetch: F) -> FlightResult<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (shared, _leader) = {
            let mut inflight = self.lock();
            match inflight.get(&key) {
                Some(existing) => {
                    tracing::debug!(key = %key, "joining in-flight request");
                    (existing.clone(), None)
                }
                None => {
                    let fut = fetch.map(|r| r.map_err(Arc::new)).boxed().shared();
                    inflight.insert(key.clone(), fut.clone());
                    (fut, Some(LeaderGuard { flights: self, key }))
                }
            }
        };
        shared.await
    }

    /// Number of distinct keys currently being fetched.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

impl<T> SingleFlight<T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, SharedFetch<T>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LeaderGuard<'a, T> {
    flights: &'a SingleFlight<T>,
    key: CacheKey,
}

impl<T> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        self.flights.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn identical_keys_share_one_fetch() {
        let flights = Arc::new(SingleFlight::<serde_json::Value>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let flights = flights.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                flights
                    .run(CacheKey::from("same"), async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(serde_json::json!({"output": "shared"}))
                    })
                    .await
            }));
        }
        for t in tasks {
            assert_eq!(t.await.unwrap().unwrap()["output"], "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn failures_are_not_replayed() {
        let flights = SingleFlight::<serde_json::Value>::new();
        let first = flights
            .run(CacheKey::from("k"), async {
                Err(Error::Api {
                    status: 503,
                    body: "cold start".into(),
                })
            })
            .await;
        assert!(first.is_err());
        let second = flights
            .run(CacheKey::from("k"), async { Ok(serde_json::json!({"output": "warm"})) })
            .await;
        assert_eq!(second.unwrap()["output"], "warm");
    }
}

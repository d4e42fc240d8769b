use super::envelope::Envelope;
use super::flight::SingleFlight;
use crate::cache::{CacheConfig, CacheKey, FileCache, MemoryCache, RequestCache};
use crate::config::RelayConfig;
use crate::settings::{FileSettings, SettingsStore};
use crate::transport::{ApiClient, ProcessApi};
use crate::types::{Mode, OptionsBag, ProcessRequest};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

pub const DEFAULT_MAX_TEXT_BYTES: usize = 102_400;

#[derive(Debug, Clone)]
struct Fetched {
    payload: Value,
    cached: bool,
}

/// Orchestrates settings, cache and the remote API for one request.
///
/// This is the error boundary of the relay: [`RelayController::process`]
/// always returns an [`Envelope`], never an `Err`.
pub struct RelayController {
    settings: Arc<SettingsStore>,
    cache: Arc<RequestCache>,
    api: Arc<dyn ProcessApi>,
    flights: Option<SingleFlight<Fetched>>,
    max_text_bytes: usize,
}

impl RelayController {
    pub fn builder() -> RelayControllerBuilder {
        RelayControllerBuilder::new()
    }

    /// File-backed settings and cache under the configured data dir, HTTP API client.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let mut api = ApiClient::builder()
            .base_url(&config.api_url)
            .timeout(config.timeout());
        if let Some(key) = &config.api_key {
            api = api.api_key(key);
        }
        let settings = SettingsStore::new(Arc::new(FileSettings::new(config.settings_path()?)));
        let cache = RequestCache::new(
            CacheConfig::default(),
            Box::new(FileCache::new(config.cache_dir()?)),
        );
        Self::builder()
            .api(Arc::new(api.build()?))
            .settings(Arc::new(settings))
            .cache(Arc::new(cache))
            .coalesce_in_flight(config.coalesce_in_flight)
            .max_text_bytes(config.max_text_bytes)
            .build()
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<RequestCache> {
        &self.cache
    }

    /// Run one `(mode, text)` request through settings, cache and API.
    pub async fn process(&self, mode: Mode, text: &str) -> Envelope {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("relay.process", %request_id, %mode);
        match self.try_process(mode, text).instrument(span).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(%request_id, %mode, error = %e, "process failed");
                Envelope::failure(&e)
            }
        }
    }

    async fn try_process(&self, mode: Mode, text: &str) -> Result<Envelope> {
        self.validate_text(text)?;

        let settings = self.settings.get().await;
        let request = ProcessRequest::new(mode, text, OptionsBag::from(&settings));
        let key = self.cache.key(&request);

        if let Some(entry) = self.cache.lookup(&key).await? {
            info!(key = %key, "cache hit");
            return Ok(Envelope::success(mark_cached(entry.payload), settings, true));
        }

        let fetched = self.fetch(key, request).await?;
        Ok(Envelope::success(fetched.payload, settings, fetched.cached))
    }

    /// Network call plus cache store, shared between identical concurrent callers
    /// when coalescing is on.
    async fn fetch(&self, key: CacheKey, request: ProcessRequest) -> Result<Fetched> {
        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let store_key = key.clone();
        let recheck = self.flights.is_some();
        let fetch = async move {
            // A flight for this key may have stored and finished since our miss.
            if recheck {
                if let Some(entry) = cache.lookup(&store_key).await? {
                    info!(key = %store_key, "stored by an earlier flight");
                    return Ok(Fetched {
                        payload: mark_cached(entry.payload),
                        cached: true,
                    });
                }
            }
            let started = std::time::Instant::now();
            let payload = api.process(&request).await?;
            cache.store(&store_key, &payload).await?;
            info!(
                key = %store_key,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "fetched and cached"
            );
            Ok(Fetched {
                payload,
                cached: false,
            })
        };
        match &self.flights {
            Some(flights) => flights.run(key, fetch).await.map_err(Error::from_shared),
            None => fetch.await,
        }
    }

    fn validate_text(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::validation_with_context(
                "no text to process; select some text and try again",
                ErrorContext::new().with_field_path("text"),
            ));
        }
        if text.len() > self.max_text_bytes {
            return Err(Error::validation_with_context(
                format!(
                    "text too large ({} bytes, limit {})",
                    text.len(),
                    self.max_text_bytes
                ),
                ErrorContext::new().with_field_path("text"),
            ));
        }
        Ok(())
    }
}

fn mark_cached(mut payload: Value) -> Value {
    if let Value::Object(ref mut map) = payload {
        map.insert("cached".to_string(), Value::Bool(true));
    }
    payload
}

pub struct RelayControllerBuilder {
    settings: Option<Arc<SettingsStore>>,
    cache: Option<Arc<RequestCache>>,
    api: Option<Arc<dyn ProcessApi>>,
    coalesce_in_flight: bool,
    max_text_bytes: usize,
}

impl RelayControllerBuilder {
    pub fn new() -> Self {
        Self {
            settings: None,
            cache: None,
            api: None,
            coalesce_in_flight: true,
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
        }
    }

    pub fn settings(mut self, settings: Arc<SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn cache(mut self, cache: Arc<RequestCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn api(mut self, api: Arc<dyn ProcessApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Share one network call between identical concurrent requests (default on).
    pub fn coalesce_in_flight(mut self, enable: bool) -> Self {
        self.coalesce_in_flight = enable;
        self
    }

    pub fn max_text_bytes(mut self, n: usize) -> Self {
        self.max_text_bytes = n.max(1);
        self
    }

    pub fn build(self) -> Result<RelayController> {
        let api = self
            .api
            .ok_or_else(|| Error::configuration("a processing API must be specified"))?;
        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(SettingsStore::in_memory()));
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(RequestCache::new(
                CacheConfig::default(),
                Box::new(MemoryCache::new(1024)),
            ))
        });
        Ok(RelayController {
            settings,
            cache,
            api,
            flights: self.coalesce_in_flight.then(SingleFlight::new),
            max_text_bytes: self.max_text_bytes,
        })
    }
}

impl Default for RelayControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

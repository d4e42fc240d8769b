//! Mock processing service for integration tests

use mockito::{Matcher, Mock, Server, ServerGuard};
use neurodrive_relay::cache::{CacheConfig, FileCache, RequestCache};
use neurodrive_relay::settings::{FileSettings, SettingsStore};
use neurodrive_relay::{ApiClient, RelayController};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_KEY: &str = "test-key";

/// Test fixture that owns a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    pub fn client(&self, timeout: Duration) -> ApiClient {
        ApiClient::builder()
            .base_url(&self.base_url)
            .api_key(TEST_KEY)
            .timeout(timeout)
            .build()
            .expect("client builds")
    }

    /// Relay with settings and cache under `dir`, talking to this server.
    pub fn relay(&self, dir: &Path) -> RelayController {
        relay_for(self.client(Duration::from_secs(10)), dir)
    }

    /// POST /process answered with `status` and `body`, expected `hits` times.
    pub async fn mock_process(&mut self, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("POST", "/process")
            .match_header("x-api-key", TEST_KEY)
            .match_header("content-type", "application/json")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// One POST /process whose JSON body contains `expected`.
    pub async fn mock_process_matching(
        &mut self,
        expected: serde_json::Value,
        response: &str,
    ) -> Mock {
        self.server
            .mock("POST", "/process")
            .match_body(Matcher::PartialJson(expected))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response)
            .expect(1)
            .create_async()
            .await
    }
}

pub fn relay_for(client: ApiClient, dir: &Path) -> RelayController {
    let settings = SettingsStore::new(Arc::new(FileSettings::new(dir.join("settings.json"))));
    let cache = RequestCache::new(
        CacheConfig::default(),
        Box::new(FileCache::new(dir.join("cache"))),
    );
    RelayController::builder()
        .api(Arc::new(client))
        .settings(Arc::new(settings))
        .cache(Arc::new(cache))
        .build()
        .expect("relay builds")
}

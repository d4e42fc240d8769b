//! Settings persistence backends and the store facade.

use super::{resolve, PartialSettings, Settings, SettingsNotice};
use crate::utils::write_atomic;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// A persistent key/value bag holding the user's stored preferences.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Read the stored bag. A missing bag is empty, not an error.
    async fn load(&self) -> Result<PartialSettings>;
    /// Persist the given fields, leaving fields absent from `partial` untouched.
    async fn save(&self, partial: &PartialSettings) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// In-process bag, mostly for tests and one-shot CLI runs.
#[derive(Default)]
pub struct MemorySettings {
    bag: Mutex<PartialSettings>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stored(stored: PartialSettings) -> Self {
        Self {
            bag: Mutex::new(stored),
        }
    }
}

#[async_trait]
impl SettingsBackend for MemorySettings {
    async fn load(&self) -> Result<PartialSettings> {
        Ok(self.bag.lock().await.clone())
    }

    async fn save(&self, partial: &PartialSettings) -> Result<()> {
        self.bag.lock().await.merge(partial.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// JSON document on disk; saves are read-modify-write then atomic rename.
pub struct FileSettings {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_bag(&self) -> Result<PartialSettings> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PartialSettings::default())
            }
            Err(e) => {
                return Err(Error::SettingsRead {
                    message: format!("{}: {}", self.path.display(), e),
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(PartialSettings::default());
        }
        serde_json::from_str(&raw).map_err(|e| Error::SettingsRead {
            message: format!("{}: {}", self.path.display(), e),
        })
    }
}

#[async_trait]
impl SettingsBackend for FileSettings {
    async fn load(&self) -> Result<PartialSettings> {
        self.read_bag().await
    }

    async fn save(&self, partial: &PartialSettings) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        // A corrupt bag is replaced rather than blocking every future save.
        let mut bag = match self.read_bag().await {
            Ok(bag) => bag,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable settings bag");
                PartialSettings::default()
            }
        };
        bag.merge(partial.clone());
        let data = serde_json::to_vec_pretty(&bag)?;
        write_atomic(&self.path, &data).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Facade over a [`SettingsBackend`]: resolves defaults on every read and
/// broadcasts page-level notices on save.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    defaults: Settings,
    notices: broadcast::Sender<SettingsNotice>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            backend,
            defaults: Settings::default(),
            notices,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettings::new()))
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Resolved settings. An unreadable backend yields the defaults.
    pub async fn get(&self) -> Settings {
        match self.try_get().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "settings unavailable, using defaults"
                );
                self.defaults.clone()
            }
        }
    }

    pub async fn try_get(&self) -> Result<Settings> {
        let stored = self.backend.load().await?;
        Ok(resolve(&stored, &self.defaults))
    }

    /// Persist `partial` and return the resolved result.
    pub async fn set(&self, partial: PartialSettings) -> Result<Settings> {
        self.backend.save(&partial).await?;
        for notice in SettingsNotice::for_saved(&partial) {
            // no subscribers is fine
            let _ = self.notices.send(notice);
        }
        tracing::debug!(backend = self.backend.name(), "settings saved");
        Ok(self.get().await)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingsNotice> {
        self.notices.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ColorBlindnessMode;

    struct BrokenBackend;

    #[async_trait]
    impl SettingsBackend for BrokenBackend {
        async fn load(&self) -> Result<PartialSettings> {
            Err(Error::SettingsRead {
                message: "storage offline".into(),
            })
        }
        async fn save(&self, _: &PartialSettings) -> Result<()> {
            Err(Error::SettingsRead {
                message: "storage offline".into(),
            })
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn unreadable_backend_falls_back_to_defaults() {
        let store = SettingsStore::new(Arc::new(BrokenBackend));
        assert_eq!(store.get().await, Settings::default());
        assert!(store.try_get().await.is_err());
        assert!(store.set(PartialSettings::default()).await.is_err());
    }

    #[tokio::test]
    async fn stored_bag_overlays_defaults() {
        let store = SettingsStore::new(Arc::new(MemorySettings::with_stored(PartialSettings {
            audience: Some("kids".into()),
            high_contrast: Some(false),
            ..Default::default()
        })));
        let settings = store.get().await;
        assert_eq!(settings.audience, "kids");
        assert!(!settings.high_contrast);
        assert_eq!(settings.reading_level, store.defaults().reading_level);
    }

    #[tokio::test]
    async fn set_leaves_other_fields_untouched() {
        let store = SettingsStore::in_memory();
        store
            .set(PartialSettings {
                reading_level: Some("college".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let resolved = store
            .set(PartialSettings {
                bullets: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resolved.reading_level, "college");
        assert!(!resolved.bullets);
    }

    #[tokio::test]
    async fn set_broadcasts_notices() {
        let store = SettingsStore::in_memory();
        let mut rx = store.subscribe();
        store
            .set(PartialSettings {
                color_blindness_mode: Some(ColorBlindnessMode::Protanopia),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            SettingsNotice::ColorBlindnessMode {
                mode: ColorBlindnessMode::Protanopia
            }
        );
    }
}

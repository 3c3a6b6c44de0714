//! # Core Configuration Module
//!
//! Provides configuration management for the player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all bridges and settings the core needs. It enforces
//! fail-fast validation so a missing capability is reported at startup with an
//! actionable message instead of surfacing later as a silent no-op.
//!
//! ## Required Dependencies
//!
//! - `PlaybackEngine` - Host audio engine
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - Catalog and artwork requests (desktop default: reqwest)
//! - `FileSystemAccess` - Media cache (desktop default: tokio fs)
//! - `SettingsStore` - Durable preferences (desktop default: SQLite)
//! - `PreferenceApi` - Remote like/dislike reconciliation (no default)
//! - `NowPlayingCenter` - Lock screen metadata and remote commands (no default)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .data_dir("/path/to/data")
//!     .cache_dir("/path/to/cache")
//!     .playback_engine(Arc::new(MyEngine::new(engine_events_tx)))
//!     .preference_api(Arc::new(MyPreferenceApi))
//!     .enable_remote_preferences(true)
//!     .build()
//!     .await?;
//! ```
//!
//! ## Error Handling
//!
//! Missing paths and invalid values yield [`Error::Config`]; missing bridges
//! yield [`Error::CapabilityMissing`] naming the capability and how to supply it.

use crate::error::{Error, Result};
use bridge_traits::{
    FileSystemAccess, HttpClient, NowPlayingCenter, PlaybackEngine, PreferenceApi, SettingsStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default backend serving the catalog and like/dislike endpoints.
pub const DEFAULT_API_BASE_URL: &str = "https://music-back-g2u6.onrender.com";

/// Path of the per-user song catalog endpoint.
pub const CATALOG_PATH: &str = "/api/v1/songs/user";

const DEFAULT_EVENT_BUFFER_SIZE: usize = crate::events::DEFAULT_EVENT_BUFFER_SIZE;
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Core configuration
///
/// Construct through [`CoreConfig::builder`].
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory for durable state (settings database).
    pub data_dir: PathBuf,

    /// Directory for the media cache.
    pub cache_dir: PathBuf,

    /// Backend base URL without a trailing slash.
    pub api_base_url: String,

    /// Capacity of the event bus broadcast channel.
    pub event_buffer_size: usize,

    pub request_timeout: Duration,

    pub http_client: Arc<dyn HttpClient>,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub settings_store: Arc<dyn SettingsStore>,

    pub playback_engine: Arc<dyn PlaybackEngine>,

    pub preference_api: Option<Arc<dyn PreferenceApi>>,

    pub now_playing: Option<Arc<dyn NowPlayingCenter>>,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("data_dir", &self.data_dir)
            .field("cache_dir", &self.cache_dir)
            .field("api_base_url", &self.api_base_url)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("request_timeout", &self.request_timeout)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("playback_engine", &"PlaybackEngine { ... }")
            .field(
                "preference_api",
                &self.preference_api.as_ref().map(|_| "PreferenceApi { ... }"),
            )
            .field(
                "now_playing",
                &self.now_playing.as_ref().map(|_| "NowPlayingCenter { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

/// Optional behaviours toggled by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Reconcile like/dislike toggles with the server (needs `PreferenceApi`).
    pub enable_remote_preferences: bool,

    /// Push metadata and accept remote commands (needs `NowPlayingCenter`).
    pub enable_now_playing: bool,

    /// Keep downloaded artwork and audio on disk.
    pub enable_media_cache: bool,

    /// Restore shuffle and repeat mode across launches.
    pub persist_playback_settings: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_remote_preferences: false,
            enable_now_playing: false,
            enable_media_cache: true,
            persist_playback_settings: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Full URL of the song catalog endpoint.
    pub fn catalog_url(&self) -> String {
        format!("{}{}", self.api_base_url, CATALOG_PATH)
    }

    /// Location of the default SQLite settings database.
    pub fn settings_db_path(&self) -> PathBuf {
        settings_db_path(&self.data_dir)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if paths are empty, numeric settings are out of range,
    /// or a feature is enabled without the bridge it requires.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }

        if self.event_buffer_size == 0 || self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size must be between 1 and {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.features.enable_remote_preferences && self.preference_api.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "PreferenceApi".to_string(),
                message: "Remote preferences enabled but no PreferenceApi provided. \
                         Disable the feature or inject a PreferenceApi implementation."
                    .to_string(),
            });
        }

        if self.features.enable_now_playing && self.now_playing.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "NowPlayingCenter".to_string(),
                message: "Now-playing integration enabled but no NowPlayingCenter provided. \
                         Disable the feature or inject the platform media centre."
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn settings_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.db")
}

fn playback_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "PlaybackEngine".to_string(),
        message: "A PlaybackEngine implementation is required to play audio. \
                 Inject the platform audio engine (AVPlayer, ExoPlayer, rodio) with .playback_engine()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new(timeout)
        .map_err(|e| Error::Internal(format!("Failed to initialize default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for the song catalog. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject the platform-native HTTP adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(data_dir: &Path, cache_dir: &Path) -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    Ok(Arc::new(TokioFileSystem::with_directories(
        cache_dir.to_path_buf(),
        data_dir.to_path_buf(),
    )))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(
    _data_dir: &Path,
    _cache_dir: &Path,
) -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the media cache. \
                 Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
                 Mobile: inject sandboxed app-directory access."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_settings_store(data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;

    let store = SqliteSettingsStore::new(settings_db_path(data_dir))
        .await
        .map_err(|e| Error::Internal(format!("Failed to initialize default SettingsStore: {}", e)))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_settings_store(_data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for liked/disliked songs. \
                 Desktop: enable the 'desktop-shims' feature to use SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    })
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    data_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    api_base_url: Option<String>,
    event_buffer_size: Option<usize>,
    request_timeout: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    playback_engine: Option<Arc<dyn PlaybackEngine>>,
    preference_api: Option<Arc<dyn PreferenceApi>>,
    now_playing: Option<Arc<dyn NowPlayingCenter>>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn playback_engine(mut self, engine: Arc<dyn PlaybackEngine>) -> Self {
        self.playback_engine = Some(engine);
        self
    }

    pub fn preference_api(mut self, api: Arc<dyn PreferenceApi>) -> Self {
        self.preference_api = Some(api);
        self
    }

    pub fn now_playing(mut self, center: Arc<dyn NowPlayingCenter>) -> Self {
        self.now_playing = Some(center);
        self
    }

    pub fn enable_remote_preferences(mut self, enabled: bool) -> Self {
        self.features.enable_remote_preferences = enabled;
        self
    }

    pub fn enable_now_playing(mut self, enabled: bool) -> Self {
        self.features.enable_now_playing = enabled;
        self
    }

    pub fn enable_media_cache(mut self, enabled: bool) -> Self {
        self.features.enable_media_cache = enabled;
        self
    }

    pub fn persist_playback_settings(mut self, enabled: bool) -> Self {
        self.features.persist_playback_settings = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// Async because the default SQLite settings store is opened here.
    pub async fn build(self) -> Result<CoreConfig> {
        let data_dir = self.data_dir.ok_or_else(|| {
            Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
        })?;

        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let playback_engine = self
            .playback_engine
            .ok_or_else(playback_engine_missing_error)?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(&data_dir, &cache_dir)?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&data_dir).await?,
        };

        let api_base_url = self
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let config = CoreConfig {
            data_dir,
            cache_dir,
            api_base_url,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            request_timeout,
            http_client,
            file_system,
            settings_store,
            playback_engine,
            preference_api: self.preference_api,
            now_playing: self.now_playing,
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

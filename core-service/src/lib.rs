//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (playback engine,
//! now-playing surface, HTTP, filesystem, settings) into the shared Rust core.
//! Desktop apps typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) so that only the playback engine has to be supplied.
//!
//! ```ignore
//! use bridge_traits::engine_event_channel;
//! use core_runtime::CoreConfig;
//! use core_service::CoreService;
//!
//! let (engine_events, receiver) = engine_event_channel();
//! let engine = Arc::new(MyEngine::new(engine_events));
//! let config = CoreConfig::builder()
//!     .data_dir("/tmp/player/data")
//!     .cache_dir("/tmp/player/cache")
//!     .playback_engine(engine)
//!     .build()
//!     .await?;
//!
//! let core = CoreService::bootstrap(config, receiver).await?;
//! let songs = core.refresh_catalog().await;
//! core.handle().play_song(songs[0].clone(), Some(songs))?;
//! ```

pub mod error;
pub mod runner;

pub use error::{CoreError, Result};
pub use runner::{
    load_playback_modes, SessionCommand, SessionHandle, SessionRunner, REPEAT_MODE_KEY,
    SHUFFLE_KEY,
};

use std::sync::Arc;

use bridge_traits::media_session::NowPlayingCenter;
use bridge_traits::playback::EngineEventReceiver;
use core_library::{CatalogService, MediaCache, Song};
use core_playback::{PlaybackSession, PreferenceStore};
use core_runtime::events::{EventBus, EventStream};
use core_runtime::CoreConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Primary façade exposed to host applications.
pub struct CoreService {
    config: CoreConfig,
    event_bus: EventBus,
    catalog: Arc<CatalogService>,
    preferences: Arc<PreferenceStore>,
    cache: Option<Arc<MediaCache>>,
    now_playing: Option<Arc<dyn NowPlayingCenter>>,
    handle: SessionHandle,
    runner: JoinHandle<()>,
}

impl CoreService {
    /// Wire every component and start the session runner.
    ///
    /// `engine_events` is the receiving end of the channel the host engine
    /// reports into. Saved preferences and playback modes are restored before
    /// the runner starts; unreadable saved state is logged and ignored.
    pub async fn bootstrap(config: CoreConfig, engine_events: EngineEventReceiver) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);

        let mut preferences = PreferenceStore::new()
            .with_settings(Arc::clone(&config.settings_store))
            .with_event_bus(event_bus.clone());
        if config.features.enable_remote_preferences {
            if let Some(api) = &config.preference_api {
                preferences = preferences.with_api(Arc::clone(api));
            }
        }
        if let Err(error) = preferences.load().await {
            warn!(%error, "Ignoring unreadable saved preferences");
        }
        let preferences = Arc::new(preferences);

        let catalog = Arc::new(
            CatalogService::new(Arc::clone(&config.http_client), config.catalog_url())
                .with_event_bus(event_bus.clone()),
        );

        let cache = config.features.enable_media_cache.then(|| {
            Arc::new(
                MediaCache::new(Arc::clone(&config.file_system), config.cache_dir.join("media"))
                    .with_http_client(Arc::clone(&config.http_client))
                    .with_event_bus(event_bus.clone()),
            )
        });

        let now_playing = if config.features.enable_now_playing {
            config.now_playing.clone()
        } else {
            None
        };

        let mut session = PlaybackSession::new(
            Arc::clone(&config.playback_engine),
            Arc::clone(&preferences),
            event_bus.clone(),
        );
        if let Some(center) = &now_playing {
            session = session.with_now_playing(Arc::clone(center));
        }
        if config.features.persist_playback_settings {
            let (shuffle, repeat) = load_playback_modes(config.settings_store.as_ref()).await;
            session.restore_modes(shuffle, repeat);
        }

        let (handle, commands) = SessionHandle::channel();
        let mut runner = SessionRunner::new(session, commands, engine_events, event_bus.subscribe());
        if config.features.persist_playback_settings {
            runner = runner.with_settings(Arc::clone(&config.settings_store));
        }
        if let Some(center) = &now_playing {
            let (sender, receiver) = mpsc::unbounded_channel();
            center.register_command_handler(sender);
            runner = runner.with_media_commands(receiver);
        }

        let runner = tokio::spawn(runner.run());

        info!(
            api = %config.api_base_url,
            remote_preferences = preferences.has_remote(),
            now_playing = now_playing.is_some(),
            media_cache = cache.is_some(),
            "Core service started"
        );

        Ok(Self {
            config,
            event_bus,
            catalog,
            preferences,
            cache,
            now_playing,
            handle,
            runner,
        })
    }

    /// Command surface for the playback session.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    /// Fetch the catalog, falling back to the bundled songs.
    pub async fn refresh_catalog(&self) -> Vec<Song> {
        self.catalog.refresh().await
    }

    pub fn preferences(&self) -> Arc<PreferenceStore> {
        Arc::clone(&self.preferences)
    }

    /// Media cache, when enabled.
    pub fn cache(&self) -> Option<Arc<MediaCache>> {
        self.cache.clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Liked songs from the current catalog, by title.
    pub fn liked_songs(&self) -> Vec<Song> {
        self.preferences.liked_songs(&self.catalog.songs())
    }

    /// Disliked songs from the current catalog, by title.
    pub fn disliked_songs(&self) -> Vec<Song> {
        self.preferences.disliked_songs(&self.catalog.songs())
    }

    /// Stop the session runner and clear the now-playing surface.
    pub async fn shutdown(self) -> Result<()> {
        // The runner may already be gone if every handle was dropped.
        self.handle.shutdown().ok();
        self.runner
            .await
            .map_err(|e| CoreError::TaskFailed(e.to_string()))?;

        if let Some(center) = &self.now_playing {
            center.clear();
        }
        info!("Core service stopped");
        Ok(())
    }
}

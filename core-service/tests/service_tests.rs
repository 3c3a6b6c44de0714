//! End-to-end tests for the core service
//!
//! Bootstraps the full stack against in-memory bridges and drives it through
//! the session handle, the engine event channel and the media-control surface.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media_session::{MediaCommand, NowPlayingCenter, NowPlayingInfo};
use bridge_traits::playback::{engine_event_channel, EngineEvent, EngineEventSender, PlaybackEngine};
use bridge_traits::remote::{PreferenceApi, SongLikeStatus};
use bridge_traits::storage::{FileMetadata, FileSystemAccess, SettingsStore};
use bytes::Bytes;
use core_library::Song;
use core_playback::{PlaybackSnapshot, RepeatMode, LIKED_SONGS_KEY};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use core_runtime::CoreConfig;
use core_service::{CoreService, SessionHandle, REPEAT_MODE_KEY, SHUFFLE_KEY};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// In-memory bridges
// ============================================================================

#[derive(Default)]
struct RecordingEngine {
    loads: Mutex<Vec<String>>,
}

impl PlaybackEngine for RecordingEngine {
    fn load(&self, url: &str) -> BridgeResult<()> {
        self.loads.lock().unwrap().push(url.to_string());
        Ok(())
    }
    fn play(&self) {}
    fn pause(&self) {}
    fn seek(&self, _seconds: f64) {}
    fn stop(&self) {}
}

struct StaticHttp {
    body: &'static str,
}

#[async_trait]
impl HttpClient for StaticHttp {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from_static(self.body.as_bytes()),
        })
    }
}

struct EmptyFs;

#[async_trait]
impl FileSystemAccess for EmptyFs {
    async fn get_cache_directory(&self) -> BridgeResult<PathBuf> {
        Ok(PathBuf::from("/cache"))
    }
    async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
        Ok(PathBuf::from("/data"))
    }
    async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
        Ok(false)
    }
    async fn metadata(&self, _path: &Path) -> BridgeResult<FileMetadata> {
        Ok(FileMetadata {
            size: 0,
            created_at: None,
            modified_at: None,
            is_directory: false,
        })
    }
    async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }
    async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
        Ok(Bytes::new())
    }
    async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
        Ok(())
    }
    async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }
    async fn delete_dir_all(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }
    async fn list_directory(&self, _path: &Path) -> BridgeResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }
    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.set_string(key, if value { "true" } else { "false" }).await
    }
    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(key)
            .map(|value| value == "true"))
    }
    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
    async fn has_key(&self, key: &str) -> BridgeResult<bool> {
        Ok(self.values.lock().unwrap().contains_key(key))
    }
    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.values.lock().unwrap().keys().cloned().collect())
    }
    async fn clear_all(&self) -> BridgeResult<()> {
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

/// Server that reports every song as liked.
struct LikesEverythingApi;

#[async_trait]
impl PreferenceApi for LikesEverythingApi {
    async fn like(&self, _user_id: &str, _song_id: &str) -> BridgeResult<()> {
        Ok(())
    }
    async fn dislike(&self, _user_id: &str, _song_id: &str) -> BridgeResult<()> {
        Ok(())
    }
    async fn status(&self, _song_id: &str, _user_id: &str) -> BridgeResult<SongLikeStatus> {
        Ok(SongLikeStatus {
            is_liked: true,
            ..Default::default()
        })
    }
}

#[derive(Default)]
struct CapturingNowPlaying {
    updates: Mutex<Vec<NowPlayingInfo>>,
    commands: Mutex<Option<mpsc::UnboundedSender<MediaCommand>>>,
    cleared: Mutex<bool>,
}

impl NowPlayingCenter for CapturingNowPlaying {
    fn update(&self, info: NowPlayingInfo) {
        self.updates.lock().unwrap().push(info);
    }
    fn clear(&self) {
        *self.cleared.lock().unwrap() = true;
    }
    fn register_command_handler(&self, commands: mpsc::UnboundedSender<MediaCommand>) {
        *self.commands.lock().unwrap() = Some(commands);
    }
}

// ============================================================================
// Helpers
// ============================================================================

const REMOTE_CATALOG: &str = r#"[
    {"id": "r1", "artist": "Shubh", "title": "one love", "cover": "https://c/1", "audio_url": "https://a/1.mp3"},
    {"id": "r2", "artist": "B Praak", "title": "Duppatta", "cover": "https://c/2", "audio_url": "https://a/2.mp3"},
    {"id": "r3", "artist": "Jasleen Royal", "title": "Heeriye", "cover": "https://c/3", "audio_url": "https://a/3.mp3"}
]"#;

struct Stack {
    core: CoreService,
    engine: Arc<RecordingEngine>,
    engine_events: EngineEventSender,
}

fn builder(settings: Arc<MemorySettings>) -> core_runtime::CoreConfigBuilder {
    CoreConfig::builder()
        .data_dir("/data")
        .cache_dir("/cache")
        .http_client(Arc::new(StaticHttp {
            body: REMOTE_CATALOG,
        }))
        .file_system(Arc::new(EmptyFs))
        .settings_store(settings)
}

async fn start(config: core_runtime::CoreConfigBuilder) -> Stack {
    let engine = Arc::new(RecordingEngine::default());
    let (engine_events, receiver) = engine_event_channel();
    let config = config.playback_engine(engine.clone()).build().await.unwrap();
    let core = CoreService::bootstrap(config, receiver).await.unwrap();
    Stack {
        core,
        engine,
        engine_events,
    }
}

async fn eventually<F>(handle: &SessionHandle, check: F) -> PlaybackSnapshot
where
    F: Fn(&PlaybackSnapshot) -> bool,
{
    for _ in 0..200 {
        let snapshot = handle.snapshot().await.unwrap();
        if check(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never reached the expected state");
}

fn titles(songs: &[Song]) -> Vec<&str> {
    songs.iter().map(|s| s.title.as_str()).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_commands_drive_session() {
    let stack = start(builder(Arc::default())).await;
    let songs = stack.core.refresh_catalog().await;
    let handle = stack.core.handle();

    handle.play_song(songs[0].clone(), Some(songs.clone())).unwrap();
    handle.next().unwrap();
    let snapshot = handle.snapshot().await.unwrap();

    assert_eq!(snapshot.current_song.unwrap().id.as_str(), "r2");
    assert_eq!(snapshot.current_index, Some(1));
    assert!(snapshot.is_playing);
    assert_eq!(
        *stack.engine.loads.lock().unwrap(),
        vec!["https://a/1.mp3", "https://a/2.mp3"]
    );
}

#[tokio::test]
async fn test_engine_events_advance_playlist() {
    let stack = start(builder(Arc::default())).await;
    let songs = stack.core.refresh_catalog().await;
    let handle = stack.core.handle();

    handle.play_song(songs[2].clone(), Some(songs.clone())).unwrap();
    handle.cycle_repeat_mode().unwrap();
    handle.snapshot().await.unwrap();

    stack
        .engine_events
        .send(EngineEvent::DurationUpdated(200.0))
        .unwrap();
    stack.engine_events.send(EngineEvent::Finished).unwrap();

    let snapshot = eventually(&handle, |s| {
        s.current_song.as_ref().map(|song| song.id.as_str()) == Some("r1")
    })
    .await;
    assert_eq!(snapshot.repeat_mode, RepeatMode::All);
    assert_eq!(snapshot.current_index, Some(0));
}

#[tokio::test]
async fn test_playback_modes_survive_restart() {
    let settings = Arc::new(MemorySettings::default());

    let stack = start(builder(settings.clone())).await;
    let handle = stack.core.handle();
    handle.toggle_shuffle().unwrap();
    handle.cycle_repeat_mode().unwrap();
    handle.snapshot().await.unwrap();
    stack.core.shutdown().await.unwrap();

    assert_eq!(settings.get_bool(SHUFFLE_KEY).await.unwrap(), Some(false));
    assert_eq!(
        settings.get_string(REPEAT_MODE_KEY).await.unwrap().as_deref(),
        Some("all")
    );

    // Shuffle only flips with a song loaded; store it directly for the restart.
    settings.set_bool(SHUFFLE_KEY, true).await.unwrap();

    let restarted = start(builder(settings)).await;
    let snapshot = restarted.core.handle().snapshot().await.unwrap();
    assert!(snapshot.is_shuffling);
    assert_eq!(snapshot.repeat_mode, RepeatMode::All);
}

#[tokio::test]
async fn test_media_commands_reach_session() {
    let center = Arc::new(CapturingNowPlaying::default());
    let stack = start(
        builder(Arc::default())
            .now_playing(center.clone())
            .enable_now_playing(true),
    )
    .await;
    let songs = stack.core.refresh_catalog().await;
    let handle = stack.core.handle();

    handle.play_song(songs[1].clone(), Some(songs)).unwrap();
    handle.snapshot().await.unwrap();

    let remote = center.commands.lock().unwrap().clone().unwrap();
    remote.send(MediaCommand::Pause).unwrap();
    eventually(&handle, |s| !s.is_playing).await;

    remote.send(MediaCommand::Next).unwrap();
    let snapshot = eventually(&handle, |s| s.current_index == Some(2)).await;
    assert_eq!(snapshot.current_song.unwrap().title, "Heeriye");

    {
        let updates = center.updates.lock().unwrap();
        assert_eq!(updates.first().unwrap().title, "Duppatta");
        assert_eq!(updates.last().unwrap().title, "Heeriye");
    }

    stack.core.shutdown().await.unwrap();
    assert!(*center.cleared.lock().unwrap());
}

#[tokio::test]
async fn test_liked_songs_follow_catalog_and_toggles() {
    let stack = start(builder(Arc::default())).await;
    let songs = stack.core.refresh_catalog().await;
    let handle = stack.core.handle();

    handle.play_song(songs[0].clone(), Some(songs.clone())).unwrap();
    handle.toggle_like().unwrap();
    handle.next().unwrap();
    handle.toggle_like().unwrap();
    handle.next().unwrap();
    handle.toggle_dislike().unwrap();
    let snapshot = handle.snapshot().await.unwrap();

    assert!(snapshot.is_disliked);
    assert_eq!(titles(&stack.core.liked_songs()), vec!["Duppatta", "one love"]);
    assert_eq!(titles(&stack.core.disliked_songs()), vec!["Heeriye"]);
}

#[tokio::test]
async fn test_saved_preferences_restored_on_bootstrap() {
    let settings = Arc::new(MemorySettings::default());
    settings
        .set_string(LIKED_SONGS_KEY, r#"["sample-2","sample-12"]"#)
        .await
        .unwrap();

    let stack = start(builder(settings)).await;

    // No refresh yet: the bundled catalog is in use
    assert_eq!(titles(&stack.core.liked_songs()), vec!["Hai Kude", "One Love"]);
}

#[tokio::test]
async fn test_status_refresh_republishes_snapshot() {
    let stack = start(
        builder(Arc::default())
            .preference_api(Arc::new(LikesEverythingApi))
            .enable_remote_preferences(true),
    )
    .await;
    let mut events = stack.core.subscribe().filter(|event| {
        matches!(event, CoreEvent::Playback(PlaybackEvent::StateChanged(status)) if status.is_liked)
    });
    let songs = stack.core.refresh_catalog().await;
    let handle = stack.core.handle();

    handle.set_user(Some("user-7".to_string())).unwrap();
    handle.play_song(songs[0].clone(), None).unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("liked snapshot published")
        .unwrap();
    match event {
        CoreEvent::Playback(PlaybackEvent::StateChanged(status)) => {
            assert_eq!(status.song_id.as_deref(), Some("r1"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() {
    let stack = start(builder(Arc::default())).await;
    let handle = stack.core.handle();
    stack.core.shutdown().await.unwrap();

    assert!(handle.play().is_err());
}

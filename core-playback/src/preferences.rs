//! # Song Preferences
//!
//! Like/dislike membership with optimistic local updates and best-effort
//! server reconciliation.
//!
//! Every toggle flips local state immediately. When a user is signed in and a
//! [`PreferenceApi`] is configured, the store then calls the server and
//! overwrites local membership with the authoritative status; if either call
//! fails the pre-toggle value is restored. Failures are logged and published
//! as [`PreferenceEvent::RolledBack`], never returned to the caller.
//!
//! Overlapping toggles for the same song are not sequenced. A slow response
//! from an earlier toggle can overwrite a later optimistic flip.
//!
//! The sets are persisted through [`SettingsStore`] after every change so they
//! survive restarts.

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::remote::{PreferenceApi, SongLikeStatus};
use bridge_traits::storage::SettingsStore;
use core_library::models::{Song, SongId};
use core_runtime::events::{CoreEvent, EventBus, PreferenceEvent};
use core_runtime::logging::user_label;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};

/// Settings key holding the JSON array of liked song ids.
pub const LIKED_SONGS_KEY: &str = "preferences.liked_song_ids";
/// Settings key holding the JSON array of disliked song ids.
pub const DISLIKED_SONGS_KEY: &str = "preferences.disliked_song_ids";

// ============================================================================
// Preference Set
// ============================================================================

/// Per-song preference state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SongPreference {
    #[default]
    Neutral,
    Liked,
    Disliked,
}

impl SongPreference {
    pub fn is_liked(self) -> bool {
        self == SongPreference::Liked
    }

    pub fn is_disliked(self) -> bool {
        self == SongPreference::Disliked
    }
}

impl From<SongLikeStatus> for SongPreference {
    fn from(status: SongLikeStatus) -> Self {
        if status.is_liked {
            SongPreference::Liked
        } else if status.is_disliked {
            SongPreference::Disliked
        } else {
            SongPreference::Neutral
        }
    }
}

/// Which toggle the user pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceAction {
    Like,
    Dislike,
}

impl PreferenceAction {
    fn target(self) -> SongPreference {
        match self {
            PreferenceAction::Like => SongPreference::Liked,
            PreferenceAction::Dislike => SongPreference::Disliked,
        }
    }
}

/// Two disjoint sets of song ids.
///
/// All mutation goes through [`set`](Self::set), which clears the id from
/// both sets before inserting, so `liked ∩ disliked` stays empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceSet {
    liked: HashSet<SongId>,
    disliked: HashSet<SongId>,
}

impl PreferenceSet {
    pub fn preference(&self, id: &SongId) -> SongPreference {
        if self.liked.contains(id) {
            SongPreference::Liked
        } else if self.disliked.contains(id) {
            SongPreference::Disliked
        } else {
            SongPreference::Neutral
        }
    }

    pub fn set(&mut self, id: &SongId, preference: SongPreference) {
        self.liked.remove(id);
        self.disliked.remove(id);
        match preference {
            SongPreference::Liked => {
                self.liked.insert(id.clone());
            }
            SongPreference::Disliked => {
                self.disliked.insert(id.clone());
            }
            SongPreference::Neutral => {}
        }
    }

    /// Apply a toggle and return the value it replaced.
    pub fn toggle(&mut self, id: &SongId, action: PreferenceAction) -> SongPreference {
        let previous = self.preference(id);
        let target = action.target();
        let next = if previous == target {
            SongPreference::Neutral
        } else {
            target
        };
        self.set(id, next);
        previous
    }

    pub fn liked(&self) -> &HashSet<SongId> {
        &self.liked
    }

    pub fn disliked(&self) -> &HashSet<SongId> {
        &self.disliked
    }

    fn sorted_ids(ids: &HashSet<SongId>) -> Vec<&str> {
        let mut ids: Vec<&str> = ids.iter().map(SongId::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

// ============================================================================
// Preference Store
// ============================================================================

/// Shared like/dislike state.
pub struct PreferenceStore {
    state: RwLock<PreferenceSet>,
    api: Option<Arc<dyn PreferenceApi>>,
    settings: Option<Arc<dyn SettingsStore>>,
    /// Serialises writers so a stale copy never lands after a newer one.
    persist_lock: AsyncMutex<()>,
    event_bus: Option<EventBus>,
}

impl PreferenceStore {
    /// Local-only store with no persistence.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PreferenceSet::default()),
            api: None,
            settings: None,
            persist_lock: AsyncMutex::new(()),
            event_bus: None,
        }
    }

    pub fn with_api(mut self, api: Arc<dyn PreferenceApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn has_remote(&self) -> bool {
        self.api.is_some()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_liked(&self, id: &SongId) -> bool {
        self.state.read().liked.contains(id)
    }

    pub fn is_disliked(&self, id: &SongId) -> bool {
        self.state.read().disliked.contains(id)
    }

    pub fn preference(&self, id: &SongId) -> SongPreference {
        self.state.read().preference(id)
    }

    /// Copy of the current sets.
    pub fn snapshot(&self) -> PreferenceSet {
        self.state.read().clone()
    }

    /// Liked songs from `catalog`, ordered by title ignoring case.
    pub fn liked_songs(&self, catalog: &[Song]) -> Vec<Song> {
        let state = self.state.read();
        sorted_by_title(catalog.iter().filter(|song| state.liked.contains(&song.id)))
    }

    /// Disliked songs from `catalog`, ordered by title ignoring case.
    pub fn disliked_songs(&self, catalog: &[Song]) -> Vec<Song> {
        let state = self.state.read();
        sorted_by_title(catalog.iter().filter(|song| state.disliked.contains(&song.id)))
    }

    // ========================================================================
    // Toggles
    // ========================================================================

    /// Flip like locally and return the value to restore on failure.
    pub fn toggle_like_local(&self, id: &SongId) -> SongPreference {
        self.toggle_local(id, PreferenceAction::Like)
    }

    /// Flip dislike locally and return the value to restore on failure.
    pub fn toggle_dislike_local(&self, id: &SongId) -> SongPreference {
        self.toggle_local(id, PreferenceAction::Dislike)
    }

    /// Optimistic like followed by reconciliation.
    pub async fn toggle_like(&self, id: &SongId, user_id: Option<&str>) {
        let previous = self.toggle_like_local(id);
        self.reconcile(PreferenceAction::Like, id, user_id, previous)
            .await;
    }

    /// Optimistic dislike followed by reconciliation.
    pub async fn toggle_dislike(&self, id: &SongId, user_id: Option<&str>) {
        let previous = self.toggle_dislike_local(id);
        self.reconcile(PreferenceAction::Dislike, id, user_id, previous)
            .await;
    }

    fn toggle_local(&self, id: &SongId, action: PreferenceAction) -> SongPreference {
        let (previous, current) = {
            let mut state = self.state.write();
            let previous = state.toggle(id, action);
            (previous, state.preference(id))
        };

        debug!(song_id = %id, ?action, ?previous, ?current, "Toggled preference locally");
        self.emit(PreferenceEvent::Toggled {
            song_id: id.to_string(),
            is_liked: current.is_liked(),
            is_disliked: current.is_disliked(),
        });
        previous
    }

    /// Settle a local toggle against the server.
    ///
    /// Without a user or API the local value stands and is only persisted.
    #[instrument(skip(self, user_id), fields(song_id = %id, user = user_label(user_id)))]
    pub async fn reconcile(
        &self,
        action: PreferenceAction,
        id: &SongId,
        user_id: Option<&str>,
        previous: SongPreference,
    ) {
        if let (Some(api), Some(user_id)) = (&self.api, user_id) {
            match self.sync_remote(api.as_ref(), action, id, user_id).await {
                Ok(status) => {
                    let current = self.apply(id, status.into());
                    info!(?current, "Preference reconciled with server");
                    self.emit(PreferenceEvent::Reconciled {
                        song_id: id.to_string(),
                        is_liked: current.is_liked(),
                        is_disliked: current.is_disliked(),
                    });
                }
                Err(error) => {
                    warn!(%error, ?previous, "Preference sync failed; rolling back");
                    let current = self.apply(id, previous);
                    self.emit(PreferenceEvent::RolledBack {
                        song_id: id.to_string(),
                        is_liked: current.is_liked(),
                        is_disliked: current.is_disliked(),
                        message: error.to_string(),
                    });
                }
            }
        }

        self.persist_logged().await;
    }

    async fn sync_remote(
        &self,
        api: &dyn PreferenceApi,
        action: PreferenceAction,
        id: &SongId,
        user_id: &str,
    ) -> Result<SongLikeStatus> {
        let to_sync_error = |e: bridge_traits::error::BridgeError| PlaybackError::PreferenceSync {
            song_id: id.to_string(),
            message: e.to_string(),
        };

        let sent = match action {
            PreferenceAction::Like => api.like(user_id, id.as_str()).await,
            PreferenceAction::Dislike => api.dislike(user_id, id.as_str()).await,
        };
        sent.map_err(to_sync_error)?;

        api.status(id.as_str(), user_id)
            .await
            .map_err(to_sync_error)
    }

    /// Refresh one song from the server. No-op without a user or API.
    ///
    /// On failure local state is left as it was.
    #[instrument(skip(self, user_id), fields(song_id = %id, user = user_label(user_id)))]
    pub async fn check_status(&self, id: &SongId, user_id: Option<&str>) {
        let (Some(api), Some(user_id)) = (&self.api, user_id) else {
            return;
        };

        match api.status(id.as_str(), user_id).await {
            Ok(status) => {
                let current = self.apply(id, status.into());
                debug!(?current, "Preference status refreshed");
                self.emit(PreferenceEvent::StatusRefreshed {
                    song_id: id.to_string(),
                    is_liked: current.is_liked(),
                    is_disliked: current.is_disliked(),
                });
                self.persist_logged().await;
            }
            Err(error) => {
                warn!(%error, "Preference status check failed");
            }
        }
    }

    fn apply(&self, id: &SongId, preference: SongPreference) -> SongPreference {
        self.state.write().set(id, preference);
        preference
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Restore persisted sets. Without a settings store this does nothing.
    pub async fn load(&self) -> Result<()> {
        let Some(settings) = &self.settings else {
            return Ok(());
        };

        let liked = read_ids(settings.as_ref(), LIKED_SONGS_KEY).await?;
        let disliked = read_ids(settings.as_ref(), DISLIKED_SONGS_KEY).await?;

        let mut restored = PreferenceSet::default();
        for id in disliked {
            restored.set(&SongId::from(id), SongPreference::Disliked);
        }
        for id in liked {
            restored.set(&SongId::from(id), SongPreference::Liked);
        }

        info!(
            liked = restored.liked.len(),
            disliked = restored.disliked.len(),
            "Restored song preferences"
        );
        *self.state.write() = restored;
        Ok(())
    }

    /// Write both sets to the settings store.
    ///
    /// Writers take turns and each copies the sets only once it holds the
    /// turn, so the last write always carries the newest state.
    pub async fn persist(&self) -> Result<()> {
        let Some(settings) = &self.settings else {
            return Ok(());
        };

        let _turn = self.persist_lock.lock().await;
        let (liked, disliked) = {
            let state = self.state.read();
            (
                serde_json::to_string(&PreferenceSet::sorted_ids(&state.liked))?,
                serde_json::to_string(&PreferenceSet::sorted_ids(&state.disliked))?,
            )
        };

        settings.set_string(LIKED_SONGS_KEY, &liked).await?;
        settings.set_string(DISLIKED_SONGS_KEY, &disliked).await?;
        Ok(())
    }

    async fn persist_logged(&self) {
        if let Err(error) = self.persist().await {
            warn!(%error, "Failed to persist song preferences");
        }
    }

    fn emit(&self, event: PreferenceEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Preference(event)).ok();
        }
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_ids(settings: &dyn SettingsStore, key: &str) -> Result<Vec<String>> {
    match settings.get_string(key).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn sorted_by_title<'a>(songs: impl Iterator<Item = &'a Song>) -> Vec<Song> {
    let mut songs: Vec<Song> = songs.cloned().collect();
    songs.sort_by_cached_key(Song::title_sort_key);
    songs
}

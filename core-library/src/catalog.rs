//! Song catalog
//!
//! [`CatalogService`] fetches the user's song list from the backend and keeps
//! the bundled default catalog as a floor: any failure, including an empty
//! response, leaves the app with something to play.

use std::sync::Arc;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::{LibraryError, Result};
use crate::models::{Song, SongId};

const SAMPLE_AUDIO_BASE: &str = "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-";
const SAMPLE_COVER_BASE: &str = "https://picsum.photos/200?random=";

const SAMPLE_SONGS: &[(&str, &str)] = &[
    ("Diljit Dosanjh", "GOAT"),
    ("Arijit Singh", "Hai Kude"),
    ("Armaan Malik", "Making Memories"),
    ("Jasleen Royal", "Heeriye"),
    ("Jordan Sandhu", "Hateraan"),
    ("B Praak", "Duppatta"),
    ("Arijit Singh", "Just Friend"),
    ("Darshan Raval", "Tera Zikr"),
    ("Karan Randhawa", "Pulkaari"),
    ("Parmish Verma", "Teri Aakh"),
    ("Neha Kakkar", "Distance Love"),
    ("Shubh", "One Love"),
];

/// The catalog bundled with the app.
///
/// Ids are stable (`sample-1` .. `sample-12`) so preferences recorded against
/// them survive restarts.
pub fn default_catalog() -> Vec<Song> {
    SAMPLE_SONGS
        .iter()
        .enumerate()
        .map(|(index, (artist, title))| {
            let n = index + 1;
            Song::new(
                format!("sample-{}", n),
                *artist,
                *title,
                format!("{}{}", SAMPLE_COVER_BASE, n),
                format!("{}{}.mp3", SAMPLE_AUDIO_BASE, n),
            )
        })
        .collect()
}

/// Where the current catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Bundled,
    Remote,
}

/// Remote song catalog with bundled fallback.
pub struct CatalogService {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
    songs: RwLock<Vec<Song>>,
    source: RwLock<CatalogSource>,
    event_bus: Option<EventBus>,
}

impl CatalogService {
    /// Create a service serving the bundled catalog until [`refresh`](Self::refresh) succeeds.
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            songs: RwLock::new(default_catalog()),
            source: RwLock::new(CatalogSource::Bundled),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Snapshot of the current catalog.
    pub fn songs(&self) -> Vec<Song> {
        self.songs.read().clone()
    }

    pub fn source(&self) -> CatalogSource {
        *self.source.read()
    }

    pub fn find(&self, id: &SongId) -> Option<Song> {
        self.songs.read().iter().find(|song| &song.id == id).cloned()
    }

    /// Fetch the remote catalog, falling back to the bundled songs on any failure.
    ///
    /// Never fails; the returned list is also stored as the current catalog.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn refresh(&self) -> Vec<Song> {
        let (songs, source) = match self.fetch_remote().await {
            Ok(songs) => {
                info!(count = songs.len(), "Loaded remote catalog");
                (songs, CatalogSource::Remote)
            }
            Err(error) => {
                warn!(%error, "Catalog fetch failed; using bundled songs");
                (default_catalog(), CatalogSource::Bundled)
            }
        };

        *self.songs.write() = songs.clone();
        *self.source.write() = source;

        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Library(LibraryEvent::CatalogLoaded {
                song_count: songs.len(),
                from_fallback: source == CatalogSource::Bundled,
            }))
            .ok();
        }

        songs
    }

    /// Fetch and decode the remote catalog without touching local state.
    pub async fn fetch_remote(&self) -> Result<Vec<Song>> {
        let request = HttpRequest::new(HttpMethod::Get, self.endpoint.clone())
            .header("Accept", "application/json");

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await?;

        if !response.is_success() {
            return Err(LibraryError::HttpStatus {
                status: response.status,
            });
        }

        let songs: Vec<Song> = serde_json::from_slice(&response.body).map_err(|e| {
            LibraryError::Decode {
                what: "song catalog".to_string(),
                message: e.to_string(),
            }
        })?;

        let songs: Vec<Song> = songs
            .into_iter()
            .filter(|song| match song.validate() {
                Ok(()) => true,
                Err(reason) => {
                    debug!(%reason, "Skipping invalid catalog entry");
                    false
                }
            })
            .collect();

        if songs.is_empty() {
            return Err(LibraryError::EmptyCatalog);
        }

        Ok(songs)
    }
}

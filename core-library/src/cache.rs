//! # Media Cache
//!
//! File-backed cache for artwork and audio downloaded by the player.
//!
//! Entries live under `<root>/images` and `<root>/audio`, named by the SHA-256
//! of their source URL. The cache is an ordinary value handed to whoever needs
//! it; there is no process-wide instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_runtime::events::{CacheScope, CoreEvent, EventBus, LibraryEvent};
use core_runtime::logging::file_label;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::error::{LibraryError, Result};

const IMAGES_DIR: &str = "images";
const AUDIO_DIR: &str = "audio";

/// Bytes used by each cache area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUsage {
    pub images_bytes: u64,
    pub audio_bytes: u64,
}

impl CacheUsage {
    pub fn total(&self) -> u64 {
        self.images_bytes + self.audio_bytes
    }
}

/// Artwork and audio cache keyed by source URL.
pub struct MediaCache {
    fs: Arc<dyn FileSystemAccess>,
    http_client: Option<Arc<dyn HttpClient>>,
    root: PathBuf,
    event_bus: Option<EventBus>,
}

impl MediaCache {
    /// Create a cache rooted at `root`. Directories are created lazily on first write.
    pub fn new(fs: Arc<dyn FileSystemAccess>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            http_client: None,
            root: root.into(),
            event_bus: None,
        }
    }

    /// Enable [`fetch_image`](Self::fetch_image) downloads.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // Images
    // =========================================================================

    pub async fn cache_image(&self, url: &str, data: Bytes) -> Result<PathBuf> {
        self.store(IMAGES_DIR, url, "jpg", data).await
    }

    pub async fn cached_image(&self, url: &str) -> Result<Option<Bytes>> {
        let path = self.entry_path(IMAGES_DIR, url, "jpg");
        if !self.fs.exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(self.fs.read_file(&path).await?))
    }

    pub async fn has_cached_image(&self, url: &str) -> Result<bool> {
        Ok(self.fs.exists(&self.entry_path(IMAGES_DIR, url, "jpg")).await?)
    }

    /// Return cached artwork, downloading and storing it on a miss.
    #[instrument(skip(self))]
    pub async fn fetch_image(&self, url: &str) -> Result<Bytes> {
        if let Some(data) = self.cached_image(url).await? {
            debug!("Artwork cache hit");
            return Ok(data);
        }

        let http_client = self
            .http_client
            .as_ref()
            .ok_or_else(|| LibraryError::CacheError("no HTTP client for downloads".into()))?;

        let response = http_client
            .execute(HttpRequest::new(HttpMethod::Get, url))
            .await?;
        if !response.is_success() {
            return Err(LibraryError::HttpStatus {
                status: response.status,
            });
        }

        self.cache_image(url, response.body.clone()).await?;
        Ok(response.body)
    }

    // =========================================================================
    // Audio
    // =========================================================================

    pub async fn cache_audio(&self, url: &str, data: Bytes) -> Result<PathBuf> {
        self.store(AUDIO_DIR, url, "mp3", data).await
    }

    /// Local file for `url`, if cached.
    pub async fn cached_audio_path(&self, url: &str) -> Result<Option<PathBuf>> {
        let path = self.entry_path(AUDIO_DIR, url, "mp3");
        Ok(self.fs.exists(&path).await?.then_some(path))
    }

    pub async fn has_cached_audio(&self, url: &str) -> Result<bool> {
        Ok(self.cached_audio_path(url).await?.is_some())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    pub async fn usage(&self) -> Result<CacheUsage> {
        Ok(CacheUsage {
            images_bytes: self.area_size(IMAGES_DIR).await?,
            audio_bytes: self.area_size(AUDIO_DIR).await?,
        })
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.clear_area(IMAGES_DIR).await?;
        self.clear_area(AUDIO_DIR).await?;
        self.notify_cleared(CacheScope::All);
        Ok(())
    }

    pub async fn clear_images(&self) -> Result<()> {
        self.clear_area(IMAGES_DIR).await?;
        self.notify_cleared(CacheScope::Images);
        Ok(())
    }

    pub async fn clear_audio(&self) -> Result<()> {
        self.clear_area(AUDIO_DIR).await?;
        self.notify_cleared(CacheScope::Audio);
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn entry_path(&self, area: &str, url: &str, extension: &str) -> PathBuf {
        self.root
            .join(area)
            .join(format!("{}.{}", cache_key(url), extension))
    }

    async fn store(&self, area: &str, url: &str, extension: &str, data: Bytes) -> Result<PathBuf> {
        if url.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "url".to_string(),
                message: "cannot cache an empty URL".to_string(),
            });
        }

        self.fs.create_dir_all(&self.root.join(area)).await?;
        let path = self.entry_path(area, url, extension);
        let size = data.len();
        self.fs.write_file(&path, data).await?;
        debug!(area, size, file = %file_label(&path), "Stored cache entry");
        Ok(path)
    }

    async fn area_size(&self, area: &str) -> Result<u64> {
        let dir = self.root.join(area);
        if !self.fs.exists(&dir).await? {
            return Ok(0);
        }
        Ok(self.fs.directory_size(&dir).await?)
    }

    async fn clear_area(&self, area: &str) -> Result<()> {
        let dir = self.root.join(area);
        if self.fs.exists(&dir).await? {
            self.fs.delete_dir_all(&dir).await?;
        }
        info!(area, "Cleared media cache");
        Ok(())
    }

    fn notify_cleared(&self, scope: CacheScope) {
        if let Some(bus) = &self.event_bus {
            if bus
                .emit(CoreEvent::Library(LibraryEvent::CacheCleared { scope }))
                .is_err()
            {
                warn!(?scope, "No subscribers for cache event");
            }
        }
    }
}

/// SHA-256 hex digest of a source URL.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bridge_traits::storage::FileMetadata;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryFs {
        files: Mutex<HashMap<PathBuf, Bytes>>,
    }

    #[async_trait]
    impl FileSystemAccess for MemoryFs {
        async fn get_cache_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/cache"))
        }

        async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/data"))
        }

        async fn exists(&self, path: &Path) -> BridgeResult<bool> {
            Ok(self.files.lock().unwrap().keys().any(|p| p.starts_with(path)))
        }

        async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
            let files = self.files.lock().unwrap();
            Ok(FileMetadata {
                size: files.get(path).map(|b| b.len() as u64).unwrap_or(0),
                created_at: None,
                modified_at: None,
                is_directory: !files.contains_key(path),
            })
        }

        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }

        async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| BridgeError::NotAvailable(path.display().to_string()))
        }

        async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
            self.files.lock().unwrap().insert(path.to_path_buf(), data);
            Ok(())
        }

        async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }

        async fn delete_dir_all(&self, path: &Path) -> BridgeResult<()> {
            self.files.lock().unwrap().retain(|p, _| !p.starts_with(path));
            Ok(())
        }

        async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
            let files = self.files.lock().unwrap();
            let mut entries: Vec<PathBuf> = files
                .keys()
                .filter_map(|p| {
                    let rest = p.strip_prefix(path).ok()?;
                    let first = rest.components().next()?;
                    Some(path.join(first))
                })
                .collect();
            entries.sort();
            entries.dedup();
            Ok(entries)
        }
    }

    struct CountingHttp {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for CountingHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(b"jpeg-bytes"),
            })
        }
    }

    fn cache() -> MediaCache {
        MediaCache::new(Arc::new(MemoryFs::default()), "/cache/media")
    }

    #[test]
    fn test_cache_key_is_sha256_hex() {
        let key = cache_key("https://picsum.photos/200?random=1");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key("https://picsum.photos/200?random=1"));
        assert_ne!(key, cache_key("https://picsum.photos/200?random=2"));
    }

    #[tokio::test]
    async fn test_image_roundtrip_and_layout() {
        let cache = cache();
        let url = "https://picsum.photos/200?random=3";

        assert!(!cache.has_cached_image(url).await.unwrap());
        let path = cache.cache_image(url, Bytes::from_static(b"img")).await.unwrap();

        assert_eq!(
            path,
            PathBuf::from("/cache/media/images").join(format!("{}.jpg", cache_key(url)))
        );
        assert!(cache.has_cached_image(url).await.unwrap());
        assert_eq!(
            cache.cached_image(url).await.unwrap(),
            Some(Bytes::from_static(b"img"))
        );
    }

    #[tokio::test]
    async fn test_fetch_image_downloads_once() {
        let http = Arc::new(CountingHttp {
            calls: AtomicUsize::new(0),
        });
        let cache = cache().with_http_client(http.clone());
        let url = "https://cdn/cover.jpg";

        assert_eq!(cache.fetch_image(url).await.unwrap(), "jpeg-bytes");
        assert_eq!(cache.fetch_image(url).await.unwrap(), "jpeg-bytes");
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_image_without_client_fails_on_miss() {
        let result = cache().fetch_image("https://cdn/missing.jpg").await;
        assert!(matches!(result, Err(LibraryError::CacheError(_))));
    }

    #[tokio::test]
    async fn test_audio_path_and_usage() {
        let cache = cache();
        let url = "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3";

        assert_eq!(cache.cached_audio_path(url).await.unwrap(), None);
        cache.cache_audio(url, Bytes::from(vec![0u8; 100])).await.unwrap();
        cache.cache_image("https://cdn/a.jpg", Bytes::from(vec![0u8; 10])).await.unwrap();

        let path = cache.cached_audio_path(url).await.unwrap().unwrap();
        assert!(path.to_string_lossy().ends_with(".mp3"));

        let usage = cache.usage().await.unwrap();
        assert_eq!(usage, CacheUsage { images_bytes: 10, audio_bytes: 100 });
        assert_eq!(usage.total(), 110);
    }

    #[tokio::test]
    async fn test_clear_scopes_emit_events() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let cache = cache().with_event_bus(bus);

        cache.cache_image("https://cdn/a.jpg", Bytes::from_static(b"a")).await.unwrap();
        cache.cache_audio("https://cdn/a.mp3", Bytes::from_static(b"b")).await.unwrap();

        cache.clear_images().await.unwrap();
        assert!(!cache.has_cached_image("https://cdn/a.jpg").await.unwrap());
        assert!(cache.has_cached_audio("https://cdn/a.mp3").await.unwrap());

        cache.clear_all().await.unwrap();
        assert_eq!(cache.usage().await.unwrap().total(), 0);

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Library(LibraryEvent::CacheCleared { scope: CacheScope::Images })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Library(LibraryEvent::CacheCleared { scope: CacheScope::All })
        );
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let result = cache().cache_audio("  ", Bytes::new()).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }
}

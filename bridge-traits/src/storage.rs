//! Storage and File System Abstractions
//!
//! Platform-agnostic traits for file I/O (media cache) and key-value settings
//! (durable preferences, playback settings).

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub created_at: Option<i64>,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app directories
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn cache_artwork(fs: &dyn FileSystemAccess, data: &[u8]) -> Result<()> {
///     let cache_dir = fs.get_cache_directory().await?;
///     let file_path = cache_dir.join("media/images/cover.jpg");
///     fs.write_file(&file_path, data.to_vec().into()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's cache directory
    ///
    /// This directory is suitable for files that can be deleted
    /// by the system when storage is low.
    async fn get_cache_directory(&self) -> Result<PathBuf>;

    /// Get the application's data directory
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get file metadata
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or truncating it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Delete a directory and all its contents
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// List entries of a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Calculate total size of a directory recursively
    async fn directory_size(&self, path: &Path) -> Result<u64> {
        let mut total = 0u64;
        let entries = self.list_directory(path).await?;

        for entry in entries {
            let metadata = self.metadata(&entry).await?;
            if metadata.is_directory {
                total += self.directory_size(&entry).await?;
            } else {
                total += metadata.size;
            }
        }

        Ok(total)
    }
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite-backed store
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_playback_settings(store: &dyn SettingsStore) -> Result<()> {
///     store.set_bool("playback.shuffle", true).await?;
///     store.set_string("playback.repeat_mode", "all").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryFs {
        files: Mutex<HashMap<PathBuf, u64>>,
    }

    #[async_trait]
    impl FileSystemAccess for MemoryFs {
        async fn get_cache_directory(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/cache"))
        }

        async fn get_data_directory(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/data"))
        }

        async fn exists(&self, path: &Path) -> Result<bool> {
            Ok(self.files.lock().unwrap().contains_key(path))
        }

        async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
            let files = self.files.lock().unwrap();
            let is_directory = files.keys().any(|p| p.parent() == Some(path));
            Ok(FileMetadata {
                size: files.get(path).copied().unwrap_or(0),
                created_at: None,
                modified_at: None,
                is_directory,
            })
        }

        async fn create_dir_all(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        async fn read_file(&self, _path: &Path) -> Result<Bytes> {
            Ok(Bytes::new())
        }

        async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), data.len() as u64);
            Ok(())
        }

        async fn delete_file(&self, path: &Path) -> Result<()> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }

        async fn delete_dir_all(&self, path: &Path) -> Result<()> {
            self.files.lock().unwrap().retain(|p, _| !p.starts_with(path));
            Ok(())
        }

        async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
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

    #[test]
    fn test_file_metadata() {
        let metadata = FileMetadata {
            size: 1024,
            created_at: Some(1234567890),
            modified_at: Some(1234567900),
            is_directory: false,
        };

        assert_eq!(metadata.size, 1024);
        assert!(!metadata.is_directory);
    }

    #[tokio::test]
    async fn test_directory_size_recurses() {
        let fs = MemoryFs {
            files: Mutex::new(HashMap::new()),
        };
        fs.write_file(Path::new("/cache/media/images/a.jpg"), Bytes::from_static(b"1234"))
            .await
            .unwrap();
        fs.write_file(Path::new("/cache/media/audio/b.mp3"), Bytes::from_static(b"123456"))
            .await
            .unwrap();

        let total = fs.directory_size(Path::new("/cache/media")).await.unwrap();
        assert_eq!(total, 10);
    }
}

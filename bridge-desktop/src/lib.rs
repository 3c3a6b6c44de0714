//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux):
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs` and `dirs`
//! - `SettingsStore` using an SQLite-backed key-value table
//!
//! The playback engine, now-playing centre and preference API are always
//! supplied by the host application.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore, TokioFileSystem};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new(Duration::from_secs(30))?;
//!     let fs = TokioFileSystem::new();
//!     let settings = SqliteSettingsStore::new("settings.db".into()).await?;
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;
mod settings;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;

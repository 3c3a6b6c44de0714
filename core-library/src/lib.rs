//! # Library Module
//!
//! Owns the song catalog the player draws from.
//!
//! ## Overview
//!
//! This module manages:
//! - The [`Song`] model and its wire format
//! - Fetching the user's catalog with a bundled fallback
//! - A file-backed cache for artwork and audio

pub mod cache;
pub mod catalog;
pub mod error;
pub mod models;

pub use cache::{CacheUsage, MediaCache};
pub use catalog::{default_catalog, CatalogService, CatalogSource};
pub use error::{LibraryError, Result};
pub use models::{Song, SongId};

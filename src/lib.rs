//! Workspace umbrella crate.
//!
//! Re-exports the core service so host applications can depend on
//! `player-core` alone and pick the bridge set through features.

pub use core_service::*;

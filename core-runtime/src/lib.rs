//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the player core:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast bridge validation
//! - Event bus system
//!
//! Every other core crate depends on this one for its event types and for
//! the conventions established here (structured `tracing` fields, typed
//! broadcast events, builder-validated configuration).

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};

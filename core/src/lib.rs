//! Berth Core - Foundational Types and Abstractions
//!
//! This module provides the configuration, error, and logging types
//! used across the Berth ecosystem.

pub mod config;
pub mod error;
pub mod log;

// Re-export commonly used types
pub use config::{
    AuthEntry, BerthConfig, ImageDecryption, LogLevel, Mirror, RegistryConfig,
    RegistryHostConfig, RuntimeConfig, DEFAULT_SANDBOX_IMAGE, DEFAULT_SNAPSHOTTER, KEY_MODEL_NODE,
};
pub use error::{BerthError, Result};

/// Berth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

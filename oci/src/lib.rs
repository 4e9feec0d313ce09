//! Berth OCI - Image model and store.
//!
//! This module provides the image-side building blocks for the CRI
//! layer: reference parsing and normalization, the in-memory image
//! store, chain-ID derivation, and the pull client interface that
//! registry transports implement.

pub mod image;
pub mod pull;
pub mod reference;
pub mod store;

// Re-export common types
pub use image::{chain_id, Image};
pub use oci_spec::image::ImageConfiguration;
pub use pull::{PullClient, PullOptions, PulledImage, RegistryCredentials, UnpackOpt};
pub use reference::{is_image_id, ImageReference};
pub use store::ImageStore;

/// Berth OCI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Berth CRI - Kubernetes Container Runtime Interface image surface.
//!
//! Maps CRI image operations to Berth primitives:
//! - PullImage → mirror/credential resolution and a walk of the endpoint list
//! - ImageStatus/ListImages/RemoveImage → lookups against the image store
//!
//! The message types live in [`api`]; no transport is attached here.

pub mod api;
pub mod image_service;
pub mod labels;
pub mod pull;
pub mod status;

// Re-export commonly used types
pub use image_service::{BerthImageService, ImageService};

//! CRI v1 message types for the image service surface.
//!
//! Plain Rust forms of the Kubernetes CRI image messages. No transport
//! is attached; callers hand these to [`crate::image_service::ImageService`]
//! directly.

use std::collections::HashMap;

/// Specification of an image, by reference or ID.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageSpec {
    /// Image reference (`busybox:1.36`, `ghcr.io/org/app@sha256:...`)
    /// or image ID
    pub image: String,
    /// Unstructured key-value map holding arbitrary metadata
    pub annotations: HashMap<String, String>,
}

/// Registry credentials attached to a pull request.
///
/// Empty strings mean unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// Base64-encoded "username:password"
    pub auth: String,
    /// Registry these credentials are scoped to; empty applies anywhere
    pub server_address: String,
    /// Token minted by the registry from prior OAuth exchange
    pub identity_token: String,
    /// Bearer token for the registry; accepted but not consumed
    pub registry_token: String,
}

/// Pod sandbox metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PodSandboxMetadata {
    pub name: String,
    pub uid: String,
    pub namespace: String,
    pub attempt: u32,
}

/// Pod-level configuration accompanying image pulls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PodSandboxConfig {
    pub metadata: Option<PodSandboxMetadata>,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

/// Wrapper for an i64 whose absence is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Int64Value {
    pub value: i64,
}

/// Wrapper for a u64 whose absence is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UInt64Value {
    pub value: u64,
}

/// An image as reported to kubelet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    /// Image ID
    pub id: String,
    /// References with tags (`name:tag`)
    pub repo_tags: Vec<String>,
    /// References with digests (`name@digest`)
    pub repo_digests: Vec<String>,
    /// Total size in bytes
    pub size: u64,
    /// UID the image runs as, when numeric
    pub uid: Option<Int64Value>,
    /// Username the image runs as, when not numeric
    pub username: String,
    /// Spec the image was pulled with
    pub spec: Option<ImageSpec>,
    /// Pinned images are exempt from garbage collection
    pub pinned: bool,
}

/// Filter for ListImages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageFilter {
    pub image: Option<ImageSpec>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PullImageRequest {
    pub image: Option<ImageSpec>,
    pub auth: Option<AuthConfig>,
    pub sandbox_config: Option<PodSandboxConfig>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PullImageResponse {
    /// Reference to the pulled image: the image ID
    pub image_ref: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageStatusRequest {
    pub image: Option<ImageSpec>,
    /// Ask for extra runtime-specific detail in the info map
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageStatusResponse {
    /// Status of the image; None when the image is not present
    pub image: Option<Image>,
    /// Verbose runtime detail, keyed by info kind
    pub info: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListImagesRequest {
    pub filter: Option<ImageFilter>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListImagesResponse {
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoveImageRequest {
    pub image: Option<ImageSpec>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoveImageResponse {}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageFsInfoRequest {}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageFsInfoResponse {
    /// One entry per filesystem holding image data
    pub image_filesystems: Vec<FilesystemUsage>,
}

/// Identifies a filesystem by mountpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilesystemIdentifier {
    pub mountpoint: String,
}

/// Usage of a filesystem at a point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilesystemUsage {
    /// Nanoseconds since the epoch at collection time
    pub timestamp: i64,
    pub fs_id: Option<FilesystemIdentifier>,
    pub used_bytes: Option<UInt64Value>,
    pub inodes_used: Option<UInt64Value>,
}

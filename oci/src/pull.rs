//! Pull client interface and pull-time options.
//!
//! The image service resolves endpoints, credentials, and unpack options,
//! then hands the transfer itself to a [`PullClient`]. Transports plug in
//! behind the trait; the service never talks to a registry directly.

use std::collections::HashMap;

use async_trait::async_trait;
use berth_core::error::Result;
use oci_spec::image::ImageConfiguration;

use super::reference::ImageReference;

/// Credentials for a single pull attempt.
///
/// Empty strings mean unset. A bearer token travels as the secret with
/// an empty username.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub secret: String,
}

impl RegistryCredentials {
    /// No credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Username and secret pair.
    pub fn basic(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// True when no credential material is present.
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.secret.is_empty()
    }
}

/// Unpack behavior applied while layers are written to the snapshotter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackOpt {
    /// Decrypt encrypted layers with node-local keys
    Decrypt,
}

/// Options for a single pull attempt.
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Snapshotter the image unpacks into
    pub snapshotter: String,

    /// Unpack options, in application order
    pub unpack_opts: Vec<UnpackOpt>,

    /// Labels attached to the stored image
    pub labels: HashMap<String, String>,
}

/// Result of a completed pull.
#[derive(Debug, Clone)]
pub struct PulledImage {
    /// Image ID: digest of the image configuration blob
    pub id: String,

    /// Total compressed content size in bytes
    pub size_bytes: u64,

    /// Parsed OCI image configuration
    pub config: ImageConfiguration,
}

/// Transfers image content from one registry endpoint.
#[async_trait]
pub trait PullClient: Send + Sync {
    /// Pull `reference` through `endpoint`, authenticating with `credentials`.
    ///
    /// The endpoint is a base URL such as `https://registry-1.docker.io`;
    /// the reference keeps its original registry so the client can set the
    /// Host header a mirror expects.
    async fn pull(
        &self,
        reference: &ImageReference,
        endpoint: &str,
        credentials: &RegistryCredentials,
        options: &PullOptions,
    ) -> Result<PulledImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_credentials() {
        let creds = RegistryCredentials::anonymous();
        assert!(creds.is_anonymous());
        assert_eq!(creds.username, "");
        assert_eq!(creds.secret, "");
    }

    #[test]
    fn test_basic_credentials() {
        let creds = RegistryCredentials::basic("user", "pass");
        assert!(!creds.is_anonymous());
        assert_eq!(creds.username, "user");
        assert_eq!(creds.secret, "pass");
    }

    #[test]
    fn test_token_credentials_have_empty_username() {
        let creds = RegistryCredentials::basic("", "bearer-token");
        assert!(!creds.is_anonymous());
        assert_eq!(creds.username, "");
        assert_eq!(creds.secret, "bearer-token");
    }
}

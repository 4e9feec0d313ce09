//! OCI image reference parsing.
//!
//! Parses image references like `ghcr.io/berth/agent:v0.2.0` into structured
//! components, applying Docker-style normalization: bare names gain the
//! `docker.io` registry and `library/` namespace, and untagged references
//! without a digest default to `latest`.

use berth_core::error::{BerthError, Result};

/// Default registry when none is specified.
const DEFAULT_REGISTRY: &str = "docker.io";

/// Default tag when none is specified.
const DEFAULT_TAG: &str = "latest";

/// True when `s` is a full image ID (`sha256:` followed by 64 lowercase
/// hex characters).
pub fn is_image_id(s: &str) -> bool {
    match s.strip_prefix("sha256:") {
        Some(hex_part) => {
            hex_part.len() == 64 && hex_part.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
        }
        None => false,
    }
}

/// Parsed OCI image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname (e.g., "ghcr.io", "docker.io")
    pub registry: String,
    /// Repository path (e.g., "library/nginx", "berth/agent")
    pub repository: String,
    /// Tag (e.g., "latest", "v0.2.0")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:abc123...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// Supports formats:
    /// - `nginx` → docker.io/library/nginx:latest
    /// - `nginx:1.25` → docker.io/library/nginx:1.25
    /// - `myuser/myimage` → docker.io/myuser/myimage:latest
    /// - `ghcr.io/org/image:tag` → ghcr.io/org/image:tag
    /// - `ghcr.io/org/image@sha256:abc...` → ghcr.io/org/image@sha256:abc...
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(BerthError::InvalidImageReference(
                "empty reference".to_string(),
            ));
        }

        // Split off digest first (@ separator)
        let (name_tag, digest) = if let Some(at_pos) = reference.rfind('@') {
            let digest_part = &reference[at_pos + 1..];
            if !digest_part.contains(':') {
                return Err(BerthError::InvalidImageReference(format!(
                    "bad digest in '{}': expected algorithm:hex",
                    reference
                )));
            }
            (&reference[..at_pos], Some(digest_part.to_string()))
        } else {
            (reference, None)
        };

        // Tag is whatever follows the last colon after the last slash.
        // A colon before the last slash belongs to a registry port.
        let (name, tag) = {
            let slash_pos = name_tag.rfind('/');
            match name_tag.rfind(':') {
                Some(colon_pos) if slash_pos.map_or(true, |s| colon_pos > s) => (
                    name_tag[..colon_pos].to_string(),
                    Some(name_tag[colon_pos + 1..].to_string()),
                ),
                _ => (name_tag.to_string(), None),
            }
        };

        if name.is_empty() {
            return Err(BerthError::InvalidImageReference(format!(
                "missing name in '{}'",
                reference
            )));
        }
        if tag.as_deref() == Some("") {
            return Err(BerthError::InvalidImageReference(format!(
                "empty tag in '{}'",
                reference
            )));
        }

        // Determine registry and repository
        let (registry, repository) = Self::split_registry_repository(&name)?;

        // Apply default tag if no tag and no digest
        let tag = if tag.is_none() && digest.is_none() {
            Some(DEFAULT_TAG.to_string())
        } else {
            tag
        };

        Ok(ImageReference {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Split a name into registry and repository components.
    fn split_registry_repository(name: &str) -> Result<(String, String)> {
        // The first component is a registry hostname when it contains a
        // dot or colon, or is "localhost"
        if let Some(slash_pos) = name.find('/') {
            let first = &name[..slash_pos];
            if first.contains('.') || first.contains(':') || first == "localhost" {
                let registry = normalize_registry(first);
                let repo = &name[slash_pos + 1..];
                if repo.is_empty() {
                    return Err(BerthError::InvalidImageReference(format!(
                        "empty repository in '{}'",
                        name
                    )));
                }
                // Docker Hub single-segment repos live under library/
                let repository = if registry == DEFAULT_REGISTRY && !repo.contains('/') {
                    format!("library/{}", repo)
                } else {
                    repo.to_string()
                };
                return Ok((registry, repository));
            }
        }

        // No registry detected, use the default
        let repository = if name.contains('/') {
            name.to_string()
        } else {
            // Single name like "nginx" → "library/nginx" for Docker Hub
            format!("library/{}", name)
        };

        Ok((DEFAULT_REGISTRY.to_string(), repository))
    }

    /// Registry-qualified name without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Get the full reference string.
    pub fn full_reference(&self) -> String {
        let mut s = self.name();
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }

    /// True when both references identify the same image.
    ///
    /// Registry and repository must agree. When both sides carry a
    /// digest, the digests decide; otherwise the tags must match, and a
    /// digest-only reference (tag `None`) never matches a tagged one.
    pub fn same_image(&self, other: &ImageReference) -> bool {
        if self.registry != other.registry || self.repository != other.repository {
            return false;
        }
        match (&self.digest, &other.digest) {
            (Some(a), Some(b)) => a == b,
            _ => self.tag == other.tag,
        }
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

/// Fold Docker Hub hostname aliases onto the canonical registry.
fn normalize_registry(registry: &str) -> String {
    let r = registry.to_lowercase();
    if r == "index.docker.io" || r == "registry-1.docker.io" {
        DEFAULT_REGISTRY.to_string()
    } else {
        r
    }
}

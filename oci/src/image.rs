//! In-memory image record and layer chain-ID derivation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use oci_spec::image::ImageConfiguration;
use sha2::{Digest, Sha256};

/// An image known to the store.
#[derive(Debug, Clone)]
pub struct Image {
    /// Image ID: the digest of the image configuration blob
    pub id: String,

    /// Normalized references that resolve to this image
    pub references: Vec<String>,

    /// Total compressed content size in bytes
    pub size_bytes: u64,

    /// Parsed OCI image configuration
    pub config: ImageConfiguration,

    /// When the image was pulled
    pub pulled_at: DateTime<Utc>,

    /// Labels attached to the stored image
    pub labels: HashMap<String, String>,

    /// Pinned images survive garbage collection
    pub pinned: bool,
}

impl Image {
    /// Chain ID of the image's layer stack.
    pub fn chain_id(&self) -> String {
        chain_id(self.config.rootfs().diff_ids())
    }
}

/// Compute the layer chain ID from ordered diff IDs.
///
/// An empty stack yields an empty string and a single layer is its own
/// chain ID. Deeper stacks fold left: each step hashes
/// `"<parent> <diff_id>"` and prefixes the hex digest with `sha256:`.
pub fn chain_id(diff_ids: &[String]) -> String {
    match diff_ids {
        [] => String::new(),
        [first, rest @ ..] => {
            let mut chain = first.clone();
            for diff_id in rest {
                let mut hasher = Sha256::new();
                hasher.update(chain.as_bytes());
                hasher.update(b" ");
                hasher.update(diff_id.as_bytes());
                chain = format!("sha256:{}", hex::encode(hasher.finalize()));
            }
            chain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oci_spec::image::{ConfigBuilder, ImageConfigurationBuilder, RootFsBuilder};

    fn diff(n: u8) -> String {
        format!("sha256:{}", hex::encode([n; 32]))
    }

    #[test]
    fn test_chain_id_empty() {
        assert_eq!(chain_id(&[]), "");
    }

    #[test]
    fn test_chain_id_single_layer_is_identity() {
        let d = diff(1);
        assert_eq!(chain_id(&[d.clone()]), d);
    }

    #[test]
    fn test_chain_id_two_layers() {
        let chain = chain_id(&[diff(1), diff(2)]);
        assert!(chain.starts_with("sha256:"));
        assert_eq!(chain.len(), "sha256:".len() + 64);
        assert_ne!(chain, diff(1));
        assert_ne!(chain, diff(2));
    }

    #[test]
    fn test_chain_id_deterministic() {
        let a = chain_id(&[diff(1), diff(2), diff(3)]);
        let b = chain_id(&[diff(1), diff(2), diff(3)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chain_id_order_sensitive() {
        let a = chain_id(&[diff(1), diff(2)]);
        let b = chain_id(&[diff(2), diff(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_chain_id_folds_left() {
        // The chain of [a, b, c] extends the chain of [a, b] by one step
        let prefix = chain_id(&[diff(1), diff(2)]);
        let full = chain_id(&[diff(1), diff(2), diff(3)]);
        assert_eq!(chain_id(&[prefix, diff(3)]), full);
    }

    #[test]
    fn test_image_chain_id_reads_rootfs() {
        let rootfs = RootFsBuilder::default()
            .typ("layers")
            .diff_ids(vec![diff(7)])
            .build()
            .unwrap();
        let config = ImageConfigurationBuilder::default()
            .architecture("amd64")
            .os("linux")
            .rootfs(rootfs)
            .config(ConfigBuilder::default().build().unwrap())
            .build()
            .unwrap();

        let image = Image {
            id: diff(9),
            references: vec!["docker.io/library/busybox:latest".to_string()],
            size_bytes: 1024,
            config,
            pulled_at: Utc::now(),
            labels: HashMap::new(),
            pinned: false,
        };
        assert_eq!(image.chain_id(), diff(7));
    }
}

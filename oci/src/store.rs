//! In-memory image store.
//!
//! Tracks pulled images by ID with a reference index mapping normalized
//! reference strings to image IDs. Lookups accept IDs, references, or
//! anything a caller believes identifies an image; see [`ImageStore::resolve`].

use std::collections::HashMap;
use std::sync::Arc;

use berth_core::error::{BerthError, Result};
use tokio::sync::RwLock;

use super::image::Image;
use super::reference::{is_image_id, ImageReference};

#[derive(Default)]
struct Inner {
    /// Image ID → image
    images: HashMap<String, Image>,
    /// Normalized reference → image ID
    references: HashMap<String, String>,
}

/// In-memory image store with a reference index.
#[derive(Default)]
pub struct ImageStore {
    inner: Arc<RwLock<Inner>>,
}

impl ImageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image, merging with any existing record for the same ID.
    ///
    /// References accumulate across adds and a reference that moved from
    /// another image is detached from it. Pinning is sticky: once pinned,
    /// an image stays pinned.
    pub async fn add(&self, image: Image) {
        let mut inner = self.inner.write().await;

        for reference in &image.references {
            let previous = inner
                .references
                .insert(reference.clone(), image.id.clone());
            if let Some(old_id) = previous {
                if old_id != image.id {
                    if let Some(old) = inner.images.get_mut(&old_id) {
                        old.references.retain(|r| r != reference);
                    }
                }
            }
        }

        match inner.images.get_mut(&image.id) {
            Some(existing) => {
                for reference in image.references {
                    if !existing.references.contains(&reference) {
                        existing.references.push(reference);
                    }
                }
                existing.size_bytes = image.size_bytes;
                existing.config = image.config;
                existing.pulled_at = image.pulled_at;
                existing.labels.extend(image.labels);
                existing.pinned = existing.pinned || image.pinned;
            }
            None => {
                inner.images.insert(image.id.clone(), image);
            }
        }
    }

    /// Get an image by its ID.
    pub async fn get(&self, id: &str) -> Option<Image> {
        let inner = self.inner.read().await;
        inner.images.get(id).cloned()
    }

    /// Resolve a reference or image ID to a stored image.
    ///
    /// Inputs shaped like a full image ID are looked up directly.
    /// Anything else is normalized and resolved through the reference
    /// index, with the raw input tried as a literal ID last.
    pub async fn resolve(&self, ref_or_id: &str) -> Result<Image> {
        let inner = self.inner.read().await;

        if is_image_id(ref_or_id) {
            return inner
                .images
                .get(ref_or_id)
                .cloned()
                .ok_or_else(|| BerthError::ImageNotFound(ref_or_id.to_string()));
        }

        if let Ok(parsed) = ImageReference::parse(ref_or_id) {
            if let Some(id) = inner.references.get(&parsed.full_reference()) {
                if let Some(image) = inner.images.get(id) {
                    return Ok(image.clone());
                }
            }
        }

        // Last resort: the input may be an ID in a form parse rejected
        inner
            .images
            .get(ref_or_id)
            .cloned()
            .ok_or_else(|| BerthError::ImageNotFound(ref_or_id.to_string()))
    }

    /// Remove an image by ID, detaching all of its references.
    ///
    /// Returns the removed image.
    pub async fn remove(&self, id: &str) -> Result<Image> {
        let mut inner = self.inner.write().await;
        let image = inner
            .images
            .remove(id)
            .ok_or_else(|| BerthError::ImageNotFound(id.to_string()))?;
        inner.references.retain(|_, image_id| image_id != id);
        Ok(image)
    }

    /// List all stored images.
    pub async fn list(&self) -> Vec<Image> {
        let inner = self.inner.read().await;
        inner.images.values().cloned().collect()
    }

    /// Total size of all stored images in bytes.
    pub async fn total_size(&self) -> u64 {
        let inner = self.inner.read().await;
        inner.images.values().map(|img| img.size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use oci_spec::image::{ConfigBuilder, ImageConfigurationBuilder, RootFsBuilder};

    fn image_id(n: u8) -> String {
        format!("sha256:{}", hex::encode([n; 32]))
    }

    fn test_image(id_byte: u8, references: &[&str]) -> Image {
        let rootfs = RootFsBuilder::default()
            .typ("layers")
            .diff_ids(vec![format!("sha256:{}", hex::encode([id_byte ^ 0xff; 32]))])
            .build()
            .unwrap();
        let config = ImageConfigurationBuilder::default()
            .architecture("amd64")
            .os("linux")
            .rootfs(rootfs)
            .config(ConfigBuilder::default().build().unwrap())
            .build()
            .unwrap();

        Image {
            id: image_id(id_byte),
            references: references.iter().map(|r| r.to_string()).collect(),
            size_bytes: 1000 + id_byte as u64,
            config,
            pulled_at: Utc::now(),
            labels: HashMap::new(),
            pinned: false,
        }
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/busybox:latest"]))
            .await;

        let image = store.get(&image_id(1)).await.unwrap();
        assert_eq!(image.id, image_id(1));
        assert_eq!(image.references, vec!["docker.io/library/busybox:latest"]);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = ImageStore::new();
        assert!(store.get(&image_id(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_by_id() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/busybox:latest"]))
            .await;

        let image = store.resolve(&image_id(1)).await.unwrap();
        assert_eq!(image.id, image_id(1));
    }

    #[tokio::test]
    async fn test_resolve_normalizes_reference() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/busybox:latest"]))
            .await;

        // Short form normalizes onto the stored reference
        let image = store.resolve("busybox").await.unwrap();
        assert_eq!(image.id, image_id(1));

        let image = store.resolve("busybox:latest").await.unwrap();
        assert_eq!(image.id, image_id(1));
    }

    #[tokio::test]
    async fn test_resolve_digest_reference() {
        let digest = image_id(9);
        let store = ImageStore::new();
        let reference = format!("ghcr.io/berth/agent@{}", digest);
        store.add(test_image(1, &[reference.as_str()])).await;

        let image = store.resolve(&reference).await.unwrap();
        assert_eq!(image.id, image_id(1));
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_is_not_found() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/busybox:latest"]))
            .await;

        let err = store.resolve(&image_id(2)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_unknown_reference_is_not_found() {
        let store = ImageStore::new();
        let err = store.resolve("ghcr.io/berth/missing:v1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_add_merges_references() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/busybox:latest"]))
            .await;
        store
            .add(test_image(1, &["docker.io/library/busybox:1.36"]))
            .await;

        let image = store.get(&image_id(1)).await.unwrap();
        assert_eq!(image.references.len(), 2);
        assert!(image
            .references
            .contains(&"docker.io/library/busybox:latest".to_string()));
        assert!(image
            .references
            .contains(&"docker.io/library/busybox:1.36".to_string()));
    }

    #[tokio::test]
    async fn test_add_keeps_pinned_sticky() {
        let store = ImageStore::new();
        let mut pinned = test_image(1, &["registry.k8s.io/pause:3.9"]);
        pinned.pinned = true;
        store.add(pinned).await;

        // A later unpinned add of the same image must not unpin it
        store.add(test_image(1, &["registry.k8s.io/pause:3.9"])).await;
        assert!(store.get(&image_id(1)).await.unwrap().pinned);
    }

    #[tokio::test]
    async fn test_add_merges_labels() {
        let store = ImageStore::new();
        let mut labeled = test_image(1, &["registry.k8s.io/pause:3.9"]);
        labeled
            .labels
            .insert("io.cri.image.managed".to_string(), "managed".to_string());
        store.add(labeled).await;

        let mut update = test_image(1, &["registry.k8s.io/pause:3.9"]);
        update
            .labels
            .insert("io.cri.image.pinned".to_string(), "pinned".to_string());
        store.add(update).await;

        let image = store.get(&image_id(1)).await.unwrap();
        assert_eq!(
            image.labels.get("io.cri.image.managed").map(String::as_str),
            Some("managed")
        );
        assert_eq!(
            image.labels.get("io.cri.image.pinned").map(String::as_str),
            Some("pinned")
        );
    }

    #[tokio::test]
    async fn test_reference_moves_between_images() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/app:latest"]))
            .await;
        // The tag now points at different content
        store
            .add(test_image(2, &["docker.io/library/app:latest"]))
            .await;

        let resolved = store.resolve("app").await.unwrap();
        assert_eq!(resolved.id, image_id(2));

        // The old image lost the reference but is still present by ID
        let old = store.get(&image_id(1)).await.unwrap();
        assert!(old.references.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/busybox:latest"]))
            .await;

        let removed = store.remove(&image_id(1)).await.unwrap();
        assert_eq!(removed.id, image_id(1));
        assert!(store.get(&image_id(1)).await.is_none());

        let err = store.resolve("busybox").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_nonexistent() {
        let store = ImageStore::new();
        let err = store.remove(&image_id(1)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_and_total_size() {
        let store = ImageStore::new();
        store
            .add(test_image(1, &["docker.io/library/busybox:latest"]))
            .await;
        store
            .add(test_image(2, &["docker.io/library/alpine:3.18"]))
            .await;

        let images = store.list().await;
        assert_eq!(images.len(), 2);
        assert_eq!(store.total_size().await, 1001 + 1002);
    }
}

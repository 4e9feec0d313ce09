//! CRI image service backed by the in-memory image store.
//!
//! Implements the image half of the CRI runtime surface: pulls resolve
//! registry mirrors and credentials, walk the endpoint list in order, and
//! record the result in the store; the query operations convert stored
//! images back into CRI messages.

use std::sync::Arc;

use async_trait::async_trait;
use berth_core::{BerthConfig, BerthError, Result};
use berth_oci::{Image, ImageReference, ImageStore, PullClient, PullOptions};
use chrono::Utc;
use parking_lot::RwLock;
use url::Url;

use crate::api::{
    FilesystemIdentifier, FilesystemUsage, ImageFsInfoRequest, ImageFsInfoResponse,
    ImageStatusRequest, ImageStatusResponse, ListImagesRequest, ListImagesResponse,
    PullImageRequest, PullImageResponse, RemoveImageRequest, RemoveImageResponse, UInt64Value,
};
use crate::labels::{image_labels, PINNED_IMAGE_LABEL_KEY};
use crate::pull::{
    authority, encrypted_images_pull_opts, registry_endpoints, resolve_credentials,
    snapshotter_from_sandbox_config,
};
use crate::status::{to_cri_image, to_cri_image_info};

/// The image half of the CRI runtime service.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Pulls an image, trying each resolved registry endpoint in order.
    async fn pull_image(&self, request: PullImageRequest) -> Result<PullImageResponse>;

    /// Reports the status of an image. Absent images yield an empty
    /// response, not an error.
    async fn image_status(&self, request: ImageStatusRequest) -> Result<ImageStatusResponse>;

    /// Lists the images currently in the store.
    async fn list_images(&self, request: ListImagesRequest) -> Result<ListImagesResponse>;

    /// Removes an image. Removing an absent image succeeds.
    async fn remove_image(&self, request: RemoveImageRequest) -> Result<RemoveImageResponse>;

    /// Reports filesystem usage for the image store.
    async fn image_fs_info(&self, request: ImageFsInfoRequest) -> Result<ImageFsInfoResponse>;
}

/// [`ImageService`] over the in-memory store and a pluggable registry
/// transport.
pub struct BerthImageService {
    config: RwLock<Arc<BerthConfig>>,
    store: Arc<ImageStore>,
    client: Arc<dyn PullClient>,
}

impl BerthImageService {
    /// Create a new BerthImageService.
    pub fn new(config: BerthConfig, store: Arc<ImageStore>, client: Arc<dyn PullClient>) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            store,
            client,
        }
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> Arc<BerthConfig> {
        self.config.read().clone()
    }

    /// Swaps in a new configuration for subsequent operations. In-flight
    /// pulls keep the snapshot they started with.
    pub fn update_config(&self, config: BerthConfig) {
        *self.config.write() = Arc::new(config);
    }
}

#[async_trait]
impl ImageService for BerthImageService {
    async fn pull_image(&self, request: PullImageRequest) -> Result<PullImageResponse> {
        let spec = request
            .image
            .as_ref()
            .ok_or_else(|| BerthError::Other("image spec required".to_string()))?;
        let reference = ImageReference::parse(&spec.image)?;
        let config = self.config();

        tracing::info!(image = %spec.image, "CRI PullImage");

        let snapshotter = snapshotter_from_sandbox_config(
            &config,
            &spec.image,
            request.sandbox_config.as_ref(),
        )?;
        let labels = image_labels(&config.sandbox_image, &reference);
        let pinned = labels.contains_key(PINNED_IMAGE_LABEL_KEY);
        let options = PullOptions {
            snapshotter,
            unpack_opts: encrypted_images_pull_opts(&config),
            labels: labels.clone(),
        };

        let endpoints = registry_endpoints(&config.registry, &reference.registry)?;
        tracing::debug!(
            image = %reference,
            endpoints = ?endpoints,
            "Resolved pull endpoints"
        );

        let mut last_error = None;
        for endpoint in &endpoints {
            let url = Url::parse(endpoint).map_err(|err| BerthError::MalformedEndpoint {
                endpoint: endpoint.clone(),
                message: err.to_string(),
            })?;
            let host = authority(&url);
            let credentials = resolve_credentials(&config.registry, &host, request.auth.as_ref())?;

            match self
                .client
                .pull(&reference, endpoint, &credentials, &options)
                .await
            {
                Ok(pulled) => {
                    self.store
                        .add(Image {
                            id: pulled.id.clone(),
                            references: vec![reference.full_reference()],
                            size_bytes: pulled.size_bytes,
                            config: pulled.config,
                            pulled_at: Utc::now(),
                            labels: labels.clone(),
                            pinned,
                        })
                        .await;
                    tracing::info!(
                        image = %reference,
                        id = %pulled.id,
                        endpoint = %endpoint,
                        "Pulled image"
                    );
                    return Ok(PullImageResponse {
                        image_ref: pulled.id,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        image = %reference,
                        endpoint = %endpoint,
                        error = %err,
                        "Pull attempt failed, trying next endpoint"
                    );
                    last_error = Some(err);
                }
            }
        }

        let message = match last_error {
            Some(err) => format!("pull failed on all {} endpoints: {}", endpoints.len(), err),
            None => "no endpoints resolved".to_string(),
        };
        Err(BerthError::RegistryError {
            registry: reference.registry,
            message,
        })
    }

    async fn image_status(&self, request: ImageStatusRequest) -> Result<ImageStatusResponse> {
        let spec = request
            .image
            .as_ref()
            .ok_or_else(|| BerthError::Other("image spec required".to_string()))?;
        let image = match self.store.resolve(&spec.image).await {
            Ok(image) => image,
            Err(err) if err.is_not_found() => return Ok(ImageStatusResponse::default()),
            Err(err) => return Err(err),
        };
        let info = to_cri_image_info(&image, request.verbose);
        Ok(ImageStatusResponse {
            image: Some(to_cri_image(&image)),
            info,
        })
    }

    async fn list_images(&self, _request: ListImagesRequest) -> Result<ListImagesResponse> {
        // TODO: apply the ListImages filter to the result.
        let images = self.store.list().await;
        Ok(ListImagesResponse {
            images: images.iter().map(to_cri_image).collect(),
        })
    }

    async fn remove_image(&self, request: RemoveImageRequest) -> Result<RemoveImageResponse> {
        let spec = request
            .image
            .as_ref()
            .ok_or_else(|| BerthError::Other("image spec required".to_string()))?;

        tracing::info!(image = %spec.image, "CRI RemoveImage");

        let image = match self.store.resolve(&spec.image).await {
            Ok(image) => image,
            Err(err) if err.is_not_found() => return Ok(RemoveImageResponse::default()),
            Err(err) => return Err(err),
        };
        match self.store.remove(&image.id).await {
            Ok(removed) => {
                tracing::info!(id = %removed.id, "Removed image");
                Ok(RemoveImageResponse::default())
            }
            // A concurrent removal already took it out.
            Err(err) if err.is_not_found() => Ok(RemoveImageResponse::default()),
            Err(err) => Err(err),
        }
    }

    async fn image_fs_info(&self, _request: ImageFsInfoRequest) -> Result<ImageFsInfoResponse> {
        let config = self.config();
        let usage = FilesystemUsage {
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or(0),
            fs_id: Some(FilesystemIdentifier {
                mountpoint: config.image_fs_path.to_string_lossy().to_string(),
            }),
            used_bytes: Some(UInt64Value {
                value: self.store.total_size().await,
            }),
            inodes_used: None,
        };
        Ok(ImageFsInfoResponse {
            image_filesystems: vec![usage],
        })
    }
}

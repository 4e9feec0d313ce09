//! Image labels and pod annotations the CRI layer owns.
//!
//! Every image pulled through the CRI layer carries the managed label so
//! garbage collection can tell CRI images apart from those created by
//! other clients. The configured sandbox image additionally carries the
//! pinned label, which exempts it from garbage collection.
//!
//! # Label Schema
//!
//! - `io.berth.image` = "managed" - image was pulled by the CRI layer
//! - `io.berth.pinned` = "pinned" - image must survive garbage collection

use std::collections::HashMap;

use berth_oci::ImageReference;

/// Label key marking images the CRI layer manages.
pub const IMAGE_LABEL_KEY: &str = "io.berth.image";

/// Value stored under [`IMAGE_LABEL_KEY`].
pub const IMAGE_LABEL_VALUE: &str = "managed";

/// Label key marking images exempt from garbage collection.
pub const PINNED_IMAGE_LABEL_KEY: &str = "io.berth.pinned";

/// Value stored under [`PINNED_IMAGE_LABEL_KEY`].
pub const PINNED_IMAGE_LABEL_VALUE: &str = "pinned";

/// Pod annotation naming the runtime handler the pod was scheduled with.
pub const RUNTIME_HANDLER_ANNOTATION: &str = "io.berth.cri.runtime-handler";

/// Labels to attach to a pulled image.
///
/// Always contains the managed label. The pinned label is added when the
/// pulled reference identifies the configured sandbox image. A sandbox
/// image that fails to parse is logged and skipped, never blocking the
/// pull.
pub fn image_labels(sandbox_image: &str, pulled: &ImageReference) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert(IMAGE_LABEL_KEY.to_string(), IMAGE_LABEL_VALUE.to_string());

    let sandbox_ref = match ImageReference::parse(sandbox_image) {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(
                sandbox_image = %sandbox_image,
                error = %err,
                "Failed to parse configured sandbox image"
            );
            return labels;
        }
    };

    if sandbox_ref.same_image(pulled) {
        labels.insert(
            PINNED_IMAGE_LABEL_KEY.to_string(),
            PINNED_IMAGE_LABEL_VALUE.to_string(),
        );
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_for(sandbox_image: &str, pulled: &str) -> HashMap<String, String> {
        image_labels(sandbox_image, &ImageReference::parse(pulled).unwrap())
    }

    fn managed_only() -> HashMap<String, String> {
        HashMap::from([(IMAGE_LABEL_KEY.to_string(), IMAGE_LABEL_VALUE.to_string())])
    }

    fn managed_and_pinned() -> HashMap<String, String> {
        HashMap::from([
            (IMAGE_LABEL_KEY.to_string(), IMAGE_LABEL_VALUE.to_string()),
            (
                PINNED_IMAGE_LABEL_KEY.to_string(),
                PINNED_IMAGE_LABEL_VALUE.to_string(),
            ),
        ])
    }

    #[test]
    fn test_sandbox_image_is_pinned() {
        let labels = labels_for("registry.k8s.io/pause:3.9", "registry.k8s.io/pause:3.9");
        assert_eq!(labels, managed_and_pinned());
    }

    #[test]
    fn test_sandbox_image_without_tag_is_pinned() {
        // Both sides normalize to :latest
        let labels = labels_for("registry.k8s.io/pause", "registry.k8s.io/pause:latest");
        assert_eq!(labels, managed_and_pinned());
    }

    #[test]
    fn test_sandbox_image_digest_wins_over_tag() {
        let digest = "sha256:7031c1b283388d2c2e09b57badb803c05ebed362dc88d84b480cc47f72a21097";
        let labels = labels_for(
            &format!("registry.k8s.io/pause:3.9@{}", digest),
            &format!("registry.k8s.io/pause@{}", digest),
        );
        assert_eq!(labels, managed_and_pinned());
    }

    #[test]
    fn test_sandbox_image_by_digest_is_pinned() {
        let digest = "sha256:7031c1b283388d2c2e09b57badb803c05ebed362dc88d84b480cc47f72a21097";
        let labels = labels_for(
            &format!("registry.k8s.io/pause@{}", digest),
            &format!("registry.k8s.io/pause@{}", digest),
        );
        assert_eq!(labels, managed_and_pinned());
    }

    #[test]
    fn test_other_image_is_not_pinned() {
        let labels = labels_for("registry.k8s.io/pause:3.9", "registry.k8s.io/random:latest");
        assert_eq!(labels, managed_only());
    }

    #[test]
    fn test_unparseable_sandbox_image_keeps_managed_label() {
        let labels = image_labels("", &ImageReference::parse("busybox").unwrap());
        assert_eq!(labels, managed_only());
    }
}

//! Conversion of stored images into CRI status messages.

use std::collections::HashMap;

use berth_oci::{Image, ImageConfiguration, ImageReference};
use serde::Serialize;

use crate::api;

/// JSON payload behind the `info` key of a verbose `ImageStatus` response.
#[derive(Serialize)]
struct VerboseImageInfo<'a> {
    #[serde(rename = "chainID")]
    chain_id: String,
    #[serde(rename = "imageSpec")]
    image_spec: &'a ImageConfiguration,
}

/// Splits stored references into the CRI `repo_tags` and `repo_digests`
/// lists. A reference carrying both a tag and a digest contributes to both;
/// references that fail to parse are skipped.
pub fn parse_image_references(references: &[String]) -> (Vec<String>, Vec<String>) {
    let mut repo_tags = Vec::new();
    let mut repo_digests = Vec::new();
    for reference in references {
        let parsed = match ImageReference::parse(reference) {
            Ok(parsed) => parsed,
            Err(_) => continue,
        };
        if let Some(tag) = &parsed.tag {
            repo_tags.push(format!("{}:{}", parsed.name(), tag));
        }
        if let Some(digest) = &parsed.digest {
            repo_digests.push(format!("{}@{}", parsed.name(), digest));
        }
    }
    (repo_tags, repo_digests)
}

/// Extracts the uid or username from an image config `User` field. Numeric
/// users become uids; at most one of the two is returned.
pub fn get_user_from_image(user: &str) -> (Option<i64>, String) {
    if user.is_empty() {
        return (None, String::new());
    }
    // Strip any group suffix ("user:group").
    let user = match user.split_once(':') {
        Some((name, _)) => name,
        None => user,
    };
    match user.parse::<i64>() {
        Ok(uid) => (Some(uid), String::new()),
        Err(_) => (None, user.to_string()),
    }
}

/// Converts a stored image into the CRI `Image` message.
pub fn to_cri_image(image: &Image) -> api::Image {
    let (repo_tags, repo_digests) = parse_image_references(&image.references);
    let user = image
        .config
        .config()
        .as_ref()
        .and_then(|config| config.user().clone())
        .unwrap_or_default();
    let (uid, username) = get_user_from_image(&user);
    api::Image {
        id: image.id.clone(),
        repo_tags,
        repo_digests,
        size: image.size_bytes,
        uid: uid.map(|value| api::Int64Value { value }),
        username,
        spec: None,
        pinned: image.pinned,
    }
}

/// Builds the info map for an `ImageStatus` response. Populated only for
/// verbose requests; a serialization failure is reported inside the map
/// instead of failing the status call.
pub fn to_cri_image_info(image: &Image, verbose: bool) -> HashMap<String, String> {
    let mut info = HashMap::new();
    if !verbose {
        return info;
    }
    let payload = VerboseImageInfo {
        chain_id: image.chain_id(),
        image_spec: &image.config,
    };
    match serde_json::to_string(&payload) {
        Ok(body) => {
            info.insert("info".to_string(), body);
        }
        Err(err) => {
            tracing::error!(
                image = %image.id,
                error = %err,
                "Failed to serialize verbose image info"
            );
            info.insert("info".to_string(), err.to_string());
        }
    }
    info
}

//! Manifest list publication

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::fetch::SourceEntry;
use crate::constants::media_type;
use crate::manifest::ImageIndex;
use crate::reference::ImageReference;
use crate::registry::{copy_blobs, RawManifest, Registry};

/// Write `index` under `target`, returning the digest of the published list.
///
/// Entries living in another repository are copied into the target repository
/// by digest first; the list itself is a single manifest write.
pub async fn publish(
    registry: &dyn Registry,
    target: &ImageReference,
    entries: &[SourceEntry],
    index: &ImageIndex,
) -> Result<String> {
    write_manifest_list(registry, target, entries, index)
        .await
        .context("failed to write manifest list")
}

async fn write_manifest_list(
    registry: &dyn Registry,
    target: &ImageReference,
    entries: &[SourceEntry],
    index: &ImageIndex,
) -> Result<String> {
    for entry in entries {
        if entry.reference.same_repository(target) {
            continue;
        }
        debug!(
            "Copying {} from {} into {}",
            entry.manifest.digest,
            entry.reference,
            target.repository_path()
        );
        let manifest = entry.manifest.image_manifest()?;
        copy_blobs(registry, &entry.reference, target, &manifest).await?;
        registry
            .put_manifest(&target.with_digest(&entry.manifest.digest), &entry.manifest)
            .await?;
    }

    let raw = RawManifest::from_value(index, media_type::DOCKER_MANIFEST_LIST)?;
    registry.put_manifest(target, &raw).await?;

    info!(
        "Published manifest list {} with {} entries to {}",
        raw.digest,
        index.manifests.len(),
        target
    );
    Ok(raw.digest)
}

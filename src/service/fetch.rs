//! Platform metadata fetcher

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::error::Error;
use crate::manifest::Platform;
use crate::reference::ImageReference;
use crate::registry::{RawManifest, Registry};

/// One source image of a manifest list, with the platform it was built for
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub reference: ImageReference,
    pub manifest: RawManifest,
    pub platform: Platform,
}

/// Resolve `source` and decode the platform from its image config
pub async fn fetch_source(registry: &dyn Registry, source: &str) -> Result<SourceEntry> {
    let reference = ImageReference::parse(source)
        .with_context(|| format!("failed to parse manifest tag {}", source))?;

    let manifest = registry
        .get_manifest(&reference)
        .await
        .with_context(|| format!("failed to access remote image {}", source))?;

    if manifest.is_index() {
        return Err(Error::MetadataParse(format!(
            "{} is a manifest list, expected a single-platform image",
            source
        )))
        .with_context(|| format!("failed to access remote image {}", source));
    }
    debug!("Resolved {} to {}", source, manifest.digest);

    let config_digest = manifest
        .image_manifest()
        .with_context(|| format!("failed to get config file of {}", source))?
        .config
        .digest;
    let config = registry
        .get_blob(&reference, &config_digest)
        .await
        .with_context(|| format!("failed to get config file of {}", source))?;

    let platform = Platform::from_config(&config)
        .with_context(|| format!("failed to unmarshal config file of {}", source))?;

    info!("Fetched platform {} for {}", platform, source);
    Ok(SourceEntry {
        reference,
        manifest,
        platform,
    })
}

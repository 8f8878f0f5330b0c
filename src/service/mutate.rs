//! Rewrite an image's entrypoint and/or append a layer, publishing the result
//! under a new tag

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::Error;
use crate::image::{layer_media_type, parse_entrypoint, rebuild_manifest, ImageConfig, Layer};
use crate::manifest::Platform;
use crate::reference::ImageReference;
use crate::registry::{copy_blobs, RawManifest, Registry};

/// Configuration for a mutate operation
#[derive(Debug, Clone, Default)]
pub struct MutateConfig {
    /// `os/arch[/variant][:osversion]` to select when the base is a manifest list
    pub platform: String,
    /// Comma-separated entrypoint; empty keeps the base entrypoint
    pub entrypoint: String,
    /// Tar archive to append as a new layer
    pub append: Option<PathBuf>,
    pub base: String,
    pub target: String,
}

/// Service for mutating images
pub struct MutateService;

impl MutateService {
    /// Apply the mutation and push the new image; returns its manifest digest
    pub async fn mutate(registry: &dyn Registry, config: &MutateConfig) -> Result<String> {
        Self::run(registry, config)
            .await
            .context("failed to execute mutate command")
    }

    async fn run(registry: &dyn Registry, config: &MutateConfig) -> Result<String> {
        let platform: Platform = config.platform.parse().with_context(|| {
            format!(
                "failed to parse platform {} for target {}",
                config.platform, config.target
            )
        })?;
        let base_ref = ImageReference::parse(&config.base)
            .with_context(|| format!("failed to parse base image {}", config.base))?;
        let target_ref = ImageReference::parse_tag(&config.target)
            .with_context(|| format!("failed to parse tag {}", config.target))?;

        let base = Self::resolve_base(registry, &base_ref, &platform).await?;
        let manifest = base.image_manifest()?;

        let config_blob = registry
            .get_blob(&base_ref, &manifest.config.digest)
            .await
            .with_context(|| format!("failed to get config file of {}", config.base))?;
        let mut image_config = ImageConfig::parse(&config_blob)
            .with_context(|| format!("failed to unmarshal config file of {}", config.base))?;

        if let Some(entrypoint) = parse_entrypoint(&config.entrypoint) {
            image_config.set_entrypoint(entrypoint);
        }

        let layer = match &config.append {
            Some(path) => {
                let layer = Layer::from_archive(path, layer_media_type(&manifest))?;
                image_config.append_layer(
                    &layer,
                    &format!("multiarch mutate --append {}", path.display()),
                );
                Some(layer)
            }
            None => None,
        };

        let config_data = image_config.to_bytes()?;
        let new_manifest = rebuild_manifest(&manifest, &config_data, layer.as_ref());

        copy_blobs(registry, &base_ref, &target_ref, &manifest)
            .await
            .with_context(|| format!("failed to copy layers of {}", config.base))?;

        debug!("Pushing config {}", new_manifest.config.digest);
        registry
            .put_blob(&target_ref, &new_manifest.config.digest, config_data)
            .await?;
        if let Some(layer) = layer {
            debug!("Pushing layer {}", layer.digest);
            registry.put_blob(&target_ref, &layer.digest, layer.data).await?;
        }

        let raw = RawManifest::from_value(&new_manifest, &base.media_type)?;
        registry
            .put_manifest(&target_ref, &raw)
            .await
            .with_context(|| format!("failed to write image {}", target_ref))?;

        info!("Pushed {}@{}", target_ref, raw.digest);
        Ok(raw.digest)
    }

    /// The single-platform manifest to start from
    async fn resolve_base(
        registry: &dyn Registry,
        base: &ImageReference,
        platform: &Platform,
    ) -> Result<RawManifest> {
        let manifest = registry
            .get_manifest(base)
            .await
            .with_context(|| format!("failed to access remote image {}", base))?;
        if !manifest.is_index() {
            return Ok(manifest);
        }

        let index = manifest.index()?;
        let Some(child) = index
            .manifests
            .iter()
            .find(|m| m.platform.satisfies(platform))
        else {
            let available: Vec<String> = index
                .manifests
                .iter()
                .map(|m| m.platform.to_string())
                .collect();
            return Err(Error::NotFound(format!(
                "no image for platform {} in {}, available platforms: {}",
                platform,
                base,
                available.join(", ")
            ))
            .into());
        };

        debug!("Selected {} for platform {}", child.digest, platform);
        registry
            .get_manifest(&base.with_digest(&child.digest))
            .await
            .with_context(|| format!("failed to access remote image {}@{}", base, child.digest))
    }
}

//! Assemble a multi-platform manifest list from single-platform images

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use super::coordinator::run_all;
use super::index::IndexBuilder;
use super::publish::publish;
use crate::error::Error;
use crate::reference::ImageReference;
use crate::registry::Registry;

/// Service for creating manifest lists
pub struct ManifestListService;

impl ManifestListService {
    /// Publish a manifest list at `target` referencing every image in `sources`.
    ///
    /// Either every source resolves and the whole list is written, or nothing
    /// is written at all. Returns the digest of the published list.
    pub async fn create(
        registry: Arc<dyn Registry>,
        target: &str,
        sources: &[String],
    ) -> Result<String> {
        let target_ref = ImageReference::parse_tag(target)
            .with_context(|| format!("failed to parse tag {}", target))?;

        if sources.is_empty() {
            return Err(Error::invalid_reference("", "no source images given"))
                .context("failed to add manifest to manifest list");
        }

        info!(
            "Creating manifest list {} from {} source(s)",
            target_ref,
            sources.len()
        );

        let entries = run_all(Arc::clone(&registry), sources)
            .await
            .context("failed to add manifest to manifest list")?;

        let mut builder = IndexBuilder::new();
        for entry in &entries {
            builder.add(entry);
        }
        let index = builder.build();

        publish(registry.as_ref(), &target_ref, &entries, &index).await
    }
}

/// Split a comma-separated source list.
///
/// Blank input means no sources. Otherwise every segment is kept, blank ones
/// included, so a stray comma fails reference parsing instead of vanishing.
pub fn split_sources(sources: &str) -> Vec<String> {
    if sources.trim().is_empty() {
        return Vec::new();
    }
    sources.split(',').map(|s| s.trim().to_string()).collect()
}

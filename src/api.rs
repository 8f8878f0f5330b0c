//! Entry points taking plain string arguments.
//!
//! Each call loads [`Config`], talks to the real registries and returns the
//! failure as a context chain; [`crate::error::describe`] renders it as text.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::registry::RegistryClient;
use crate::service::{split_sources, LoginService, ManifestListService, MutateConfig, MutateService};

/// Store credentials for `registry` for use by later operations
pub fn authenticate(registry: &str, username: &str, password: &str) -> Result<()> {
    let config = Config::load()?;
    let store = config.credential_store()?;
    LoginService::login(&store, registry, username, password)
}

/// Replace the entrypoint and/or append a layer to `base`, publishing as `target`.
///
/// An empty `entrypoint` keeps the base entrypoint; an empty `append` adds no layer.
pub async fn mutate_image(
    platform: &str,
    entrypoint: &str,
    append: &str,
    base: &str,
    target: &str,
) -> Result<()> {
    let config = Config::load()?;
    let registry = RegistryClient::new(&config);

    let mutate = MutateConfig {
        platform: platform.to_string(),
        entrypoint: entrypoint.to_string(),
        append: (!append.trim().is_empty()).then(|| PathBuf::from(append)),
        base: base.to_string(),
        target: target.to_string(),
    };
    MutateService::mutate(&registry, &mutate).await?;
    Ok(())
}

/// Publish a manifest list at `target` from a comma-separated list of images
pub async fn create_manifest_list(target: &str, sources: &str) -> Result<()> {
    let config = Config::load()?;
    let registry = Arc::new(RegistryClient::new(&config));

    ManifestListService::create(registry, target, &split_sources(sources)).await?;
    Ok(())
}

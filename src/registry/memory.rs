//! In-memory registry
//!
//! Content-addressed like a real distribution server: manifests and blobs
//! are stored per repository by digest, tags point at manifest digests, and
//! writes are validated against the blobs and manifests they reference.
//! Failures and latency can be injected per reference.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{sha256_digest, RawManifest, Registry};
use crate::constants::media_type;
use crate::error::{Error, ErrorKind, Result};
use crate::manifest::{Descriptor, ImageManifest};
use crate::reference::ImageReference;

#[derive(Default)]
struct Repository {
    manifests: HashMap<String, RawManifest>,
    tags: HashMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
struct State {
    repositories: HashMap<String, Repository>,
    failures: HashMap<String, ErrorKind>,
    delays: HashMap<String, Duration>,
    write_failure: Option<ErrorKind>,
}

#[derive(Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
    manifest_reads: AtomicUsize,
    manifest_writes: AtomicUsize,
    blob_uploads: AtomicUsize,
    blob_mounts: AtomicUsize,
}

fn injected(kind: ErrorKind, what: &str) -> Error {
    let message = format!("injected failure for {}", what);
    match kind {
        ErrorKind::InvalidReference => Error::invalid_reference(what, message),
        ErrorKind::NotFound => Error::NotFound(message),
        ErrorKind::MetadataParse => Error::MetadataParse(message),
        ErrorKind::Network => Error::Network(message),
        ErrorKind::Auth => Error::Auth(message),
        ErrorKind::RegistryRejected => Error::RegistryRejected(message),
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of manifest fetches served (or failed)
    pub fn manifest_reads(&self) -> usize {
        self.manifest_reads.load(Ordering::SeqCst)
    }

    /// Number of manifest writes attempted
    pub fn manifest_writes(&self) -> usize {
        self.manifest_writes.load(Ordering::SeqCst)
    }

    /// Number of blobs received by upload
    pub fn blob_uploads(&self) -> usize {
        self.blob_uploads.load(Ordering::SeqCst)
    }

    /// Number of blobs made available by cross-repository mount
    pub fn blob_mounts(&self) -> usize {
        self.blob_mounts.load(Ordering::SeqCst)
    }

    /// Make manifest fetches of `reference` fail with `kind`
    pub fn fail_reads_of(&self, reference: &ImageReference, kind: ErrorKind) {
        self.state().failures.insert(reference.to_string(), kind);
    }

    /// Make every manifest write fail with `kind`
    pub fn fail_writes(&self, kind: ErrorKind) {
        self.state().write_failure = Some(kind);
    }

    /// Delay manifest fetches of `reference`
    pub fn delay_reads_of(&self, reference: &ImageReference, delay: Duration) {
        self.state().delays.insert(reference.to_string(), delay);
    }

    /// Store a blob, returning its descriptor
    pub fn insert_blob(&self, reference: &ImageReference, media_type: &str, data: Vec<u8>) -> Descriptor {
        let digest = sha256_digest(&data);
        let descriptor = Descriptor {
            media_type: media_type.to_string(),
            size: data.len() as i64,
            digest: digest.clone(),
        };
        self.state()
            .repositories
            .entry(reference.repository_path())
            .or_default()
            .blobs
            .insert(digest, data);
        descriptor
    }

    /// Store a manifest and point the reference's tag (if any) at it, bypassing
    /// validation
    pub fn insert_manifest(&self, reference: &ImageReference, manifest: RawManifest) {
        let mut state = self.state();
        let repository = state
            .repositories
            .entry(reference.repository_path())
            .or_default();
        if let Some(tag) = reference.tag() {
            repository
                .tags
                .insert(tag.to_string(), manifest.digest.clone());
        }
        repository
            .manifests
            .insert(manifest.digest.clone(), manifest);
    }

    /// Seed a single-layer Docker image with the given raw config
    pub fn insert_image(
        &self,
        reference: &ImageReference,
        config: &[u8],
        layer: &[u8],
    ) -> Result<RawManifest> {
        let config = self.insert_blob(reference, media_type::DOCKER_CONFIG, config.to_vec());
        let layer = self.insert_blob(reference, media_type::DOCKER_LAYER_GZIP, layer.to_vec());

        let manifest = ImageManifest {
            schema_version: 2,
            media_type: Some(media_type::DOCKER_MANIFEST.to_string()),
            config,
            layers: vec![layer],
            annotations: None,
        };
        let raw = RawManifest::from_value(&manifest, media_type::DOCKER_MANIFEST)?;
        self.insert_manifest(reference, raw.clone());
        Ok(raw)
    }

    /// Manifest currently stored under the reference's tag or digest
    pub fn resolve(&self, reference: &ImageReference) -> Option<RawManifest> {
        let state = self.state();
        let repository = state.repositories.get(&reference.repository_path())?;
        let digest = match (reference.digest(), reference.tag()) {
            (Some(digest), _) => digest.to_string(),
            (None, Some(tag)) => repository.tags.get(tag)?.clone(),
            (None, None) => return None,
        };
        repository.manifests.get(&digest).cloned()
    }

    pub fn has_blob(&self, reference: &ImageReference, digest: &str) -> bool {
        self.state()
            .repositories
            .get(&reference.repository_path())
            .is_some_and(|r| r.blobs.contains_key(digest))
    }

    fn validate_references(repository: &Repository, manifest: &RawManifest) -> Result<()> {
        if manifest.is_index() {
            for child in manifest.index()?.manifests {
                if !repository.manifests.contains_key(&child.digest) {
                    return Err(Error::RegistryRejected(format!(
                        "manifest unknown: {}",
                        child.digest
                    )));
                }
            }
        } else {
            let image = manifest.image_manifest()?;
            for blob in std::iter::once(&image.config).chain(image.layers.iter()) {
                if !repository.blobs.contains_key(&blob.digest) {
                    return Err(Error::RegistryRejected(format!(
                        "blob unknown: {}",
                        blob.digest
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn get_manifest(&self, reference: &ImageReference) -> Result<RawManifest> {
        self.manifest_reads.fetch_add(1, Ordering::SeqCst);

        let key = reference.to_string();
        let (delay, failure) = {
            let state = self.state();
            (
                state.delays.get(&key).copied(),
                state.failures.get(&key).copied(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(kind) = failure {
            return Err(injected(kind, &key));
        }

        self.resolve(reference)
            .ok_or_else(|| Error::NotFound(format!("manifest unknown: {}", reference)))
    }

    async fn get_blob(&self, reference: &ImageReference, digest: &str) -> Result<Vec<u8>> {
        self.state()
            .repositories
            .get(&reference.repository_path())
            .and_then(|r| r.blobs.get(digest).cloned())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "blob unknown: {} in {}",
                    digest,
                    reference.repository_path()
                ))
            })
    }

    async fn put_blob(
        &self,
        reference: &ImageReference,
        digest: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        if sha256_digest(&data) != digest {
            return Err(Error::RegistryRejected(format!(
                "digest invalid: content does not match {}",
                digest
            )));
        }
        self.blob_uploads.fetch_add(1, Ordering::SeqCst);
        self.state()
            .repositories
            .entry(reference.repository_path())
            .or_default()
            .blobs
            .insert(digest.to_string(), data);
        Ok(())
    }

    async fn mount_blob(
        &self,
        target: &ImageReference,
        source: &ImageReference,
        digest: &str,
    ) -> Result<()> {
        if source.registry() != target.registry() {
            return Err(Error::RegistryRejected(format!(
                "cannot mount {} across registries",
                digest
            )));
        }

        let mut state = self.state();
        let data = state
            .repositories
            .get(&source.repository_path())
            .and_then(|r| r.blobs.get(digest).cloned())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "blob unknown: {} in {}",
                    digest,
                    source.repository_path()
                ))
            })?;
        state
            .repositories
            .entry(target.repository_path())
            .or_default()
            .blobs
            .insert(digest.to_string(), data);
        self.blob_mounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put_manifest(
        &self,
        reference: &ImageReference,
        manifest: &RawManifest,
    ) -> Result<()> {
        self.manifest_writes.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state();
        if let Some(kind) = state.write_failure {
            return Err(injected(kind, &reference.to_string()));
        }
        if let Some(digest) = reference.digest() {
            if digest != manifest.digest {
                return Err(Error::RegistryRejected(format!(
                    "digest invalid: manifest is {}, pushed as {}",
                    manifest.digest, digest
                )));
            }
        }

        let repository = state
            .repositories
            .entry(reference.repository_path())
            .or_default();
        Self::validate_references(repository, manifest)?;

        if let Some(tag) = reference.tag() {
            repository
                .tags
                .insert(tag.to_string(), manifest.digest.clone());
        }
        repository
            .manifests
            .insert(manifest.digest.clone(), manifest.clone());
        Ok(())
    }
}

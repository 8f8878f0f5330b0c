use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::errors::OciDistributionError;
use oci_distribution::manifest::OciDescriptor;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, RegistryOperation};
use tracing::{debug, info};

use crate::auth::Keychain;
use crate::config::Config;
use crate::constants::media_type;
use crate::error::{Error, Result};
use crate::manifest::{sniff_media_type, ImageIndex, ImageManifest};
use crate::reference::ImageReference;

pub mod memory;

#[cfg(test)]
mod tests;

/// A manifest document exactly as stored in the registry
#[derive(Debug, Clone, PartialEq)]
pub struct RawManifest {
    pub data: Vec<u8>,
    pub digest: String,
    pub media_type: String,
}

impl RawManifest {
    /// Wrap manifest bytes, computing digest and media type from the content
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let media_type = sniff_media_type(&data)?;
        Ok(Self::with_media_type(data, &media_type))
    }

    pub fn with_media_type(data: Vec<u8>, media_type: &str) -> Self {
        Self {
            digest: sha256_digest(&data),
            data,
            media_type: media_type.to_string(),
        }
    }

    /// Serialize a manifest value; `media_type` is the Content-Type to push with
    pub fn from_value<T: serde::Serialize>(value: &T, media_type: &str) -> Result<Self> {
        let data = serde_json::to_vec(value)
            .map_err(|e| Error::MetadataParse(format!("cannot serialize manifest: {}", e)))?;
        Ok(Self::with_media_type(data, media_type))
    }

    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }

    pub fn is_index(&self) -> bool {
        media_type::is_index(&self.media_type)
    }

    pub fn image_manifest(&self) -> Result<ImageManifest> {
        serde_json::from_slice(&self.data)
            .map_err(|e| Error::MetadataParse(format!("malformed image manifest: {}", e)))
    }

    pub fn index(&self) -> Result<ImageIndex> {
        serde_json::from_slice(&self.data)
            .map_err(|e| Error::MetadataParse(format!("malformed manifest list: {}", e)))
    }
}

/// `sha256:<hex>` digest of some content
pub fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", sha256::digest(data))
}

/// The slice of the distribution API the crate needs
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the manifest `reference` points at (by tag or digest)
    async fn get_manifest(&self, reference: &ImageReference) -> Result<RawManifest>;

    /// Fetch a blob from the repository of `reference`
    async fn get_blob(&self, reference: &ImageReference, digest: &str) -> Result<Vec<u8>>;

    /// Upload a blob into the repository of `reference`
    async fn put_blob(&self, reference: &ImageReference, digest: &str, data: Vec<u8>)
        -> Result<()>;

    /// Make a blob of `source` available in the repository of `target` without
    /// transferring it. Only meaningful within one registry.
    async fn mount_blob(
        &self,
        target: &ImageReference,
        source: &ImageReference,
        digest: &str,
    ) -> Result<()>;

    /// Write a manifest under `reference`, replacing whatever the tag pointed at
    async fn put_manifest(&self, reference: &ImageReference, manifest: &RawManifest)
        -> Result<()>;
}

/// Make an image's config and layers available in another repository.
///
/// Within one registry blobs are mounted from the source repository; a copy
/// through memory is the fallback when the registry declines the mount or
/// the repositories live on different registries.
pub async fn copy_blobs(
    registry: &dyn Registry,
    source: &ImageReference,
    target: &ImageReference,
    manifest: &ImageManifest,
) -> Result<()> {
    if source.same_repository(target) {
        return Ok(());
    }

    let descriptors = std::iter::once(&manifest.config).chain(manifest.layers.iter());
    for descriptor in descriptors {
        if source.registry() == target.registry() {
            match registry.mount_blob(target, source, &descriptor.digest).await {
                Ok(()) => {
                    debug!(
                        "Mounted blob {} from {} into {}",
                        descriptor.digest,
                        source.repository_path(),
                        target.repository_path()
                    );
                    continue;
                }
                Err(e) => debug!("Mount of {} declined, copying instead: {}", descriptor.digest, e),
            }
        }

        debug!(
            "Copying blob {} from {} to {}",
            descriptor.digest,
            source.repository_path(),
            target.repository_path()
        );
        let data = registry.get_blob(source, &descriptor.digest).await?;
        registry.put_blob(target, &descriptor.digest, data).await?;
    }

    Ok(())
}

/// Registry client backed by `oci-distribution`, with credentials from a keychain
pub struct RegistryClient {
    client: Client,
    keychain: Box<dyn Keychain>,
}

impl RegistryClient {
    pub fn new(config: &Config) -> Self {
        let protocol = if config.insecure_registries.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(config.insecure_registries.clone())
        };

        let client = Client::new(ClientConfig {
            protocol,
            ..Default::default()
        });

        Self {
            client,
            keychain: Box::new(config.keychain()),
        }
    }

    fn registry_auth(&self, reference: &ImageReference) -> Result<RegistryAuth> {
        self.keychain
            .resolve(reference.registry())
            .map(|auth| auth.to_registry_auth())
            .map_err(|e| Error::Auth(format!("{:#}", e)))
    }

    async fn authenticate(
        &self,
        reference: &ImageReference,
        operation: RegistryOperation,
    ) -> Result<(oci_distribution::Reference, RegistryAuth)> {
        let oci_ref = reference.to_oci();
        let auth = self.registry_auth(reference)?;
        self.client
            .auth(&oci_ref, &auth, operation)
            .await
            .map_err(|e| classify(e, Direction::Read))?;
        Ok((oci_ref, auth))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Direction {
    Read,
    Write,
}

/// Map a transport error onto the crate's taxonomy
fn classify(err: OciDistributionError, direction: Direction) -> Error {
    match err {
        OciDistributionError::AuthenticationFailure(reason) => Error::Auth(reason),
        OciDistributionError::UnauthorizedError { url } => {
            Error::Auth(format!("{} requires authentication", url))
        }
        OciDistributionError::ImageManifestNotFoundError(reason) => Error::NotFound(reason),
        e @ OciDistributionError::RegistryError { .. } => match direction {
            Direction::Read => Error::NotFound(e.to_string()),
            Direction::Write => Error::RegistryRejected(e.to_string()),
        },
        OciDistributionError::ServerError { code, url, message } => {
            let detail = format!("{} returned {}: {}", url, code, message.trim());
            match (code, direction) {
                (401 | 403, _) => Error::Auth(detail),
                (400..=499, Direction::Read) => Error::NotFound(detail),
                (400..=499, Direction::Write) => Error::RegistryRejected(detail),
                _ => Error::Network(detail),
            }
        }
        other => Error::Network(other.to_string()),
    }
}

#[async_trait]
impl Registry for RegistryClient {
    async fn get_manifest(&self, reference: &ImageReference) -> Result<RawManifest> {
        debug!("Fetching manifest for {}", reference);
        let (oci_ref, auth) = self.authenticate(reference, RegistryOperation::Pull).await?;

        let (data, digest) = self
            .client
            .pull_manifest_raw(&oci_ref, &auth, media_type::ACCEPTED_MANIFESTS)
            .await
            .map_err(|e| classify(e, Direction::Read))?;

        let media_type = sniff_media_type(&data)?;
        debug!("Fetched {} ({}) for {}", digest, media_type, reference);
        Ok(RawManifest {
            data,
            digest,
            media_type,
        })
    }

    async fn get_blob(&self, reference: &ImageReference, digest: &str) -> Result<Vec<u8>> {
        debug!("Fetching blob {} from {}", digest, reference.repository_path());
        let (oci_ref, _) = self.authenticate(reference, RegistryOperation::Pull).await?;

        let descriptor = OciDescriptor {
            digest: digest.to_string(),
            size: 0,
            media_type: String::new(),
            urls: None,
            annotations: None,
        };

        let mut data = Vec::new();
        self.client
            .pull_blob(&oci_ref, &descriptor, &mut data)
            .await
            .map_err(|e| classify(e, Direction::Read))?;

        let actual = sha256_digest(&data);
        if actual != digest {
            return Err(Error::Network(format!(
                "blob {} arrived with digest {}",
                digest, actual
            )));
        }
        Ok(data)
    }

    async fn put_blob(
        &self,
        reference: &ImageReference,
        digest: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        debug!(
            "Pushing blob {} ({} bytes) to {}",
            digest,
            data.len(),
            reference.repository_path()
        );
        let (oci_ref, _) = self.authenticate(reference, RegistryOperation::Push).await?;

        self.client
            .push_blob(&oci_ref, &data, digest)
            .await
            .map_err(|e| classify(e, Direction::Write))?;
        Ok(())
    }

    async fn mount_blob(
        &self,
        target: &ImageReference,
        source: &ImageReference,
        digest: &str,
    ) -> Result<()> {
        let (oci_ref, _) = self.authenticate(target, RegistryOperation::Push).await?;

        self.client
            .mount_blob(&oci_ref, &source.to_oci(), digest)
            .await
            .map_err(|e| classify(e, Direction::Write))
    }

    async fn put_manifest(
        &self,
        reference: &ImageReference,
        manifest: &RawManifest,
    ) -> Result<()> {
        let (oci_ref, _) = self.authenticate(reference, RegistryOperation::Push).await?;

        let content_type = http::HeaderValue::from_str(&manifest.media_type).map_err(|e| {
            Error::RegistryRejected(format!("invalid media type {}: {}", manifest.media_type, e))
        })?;

        let url = self
            .client
            .push_manifest_raw(&oci_ref, manifest.data.clone(), content_type)
            .await
            .map_err(|e| classify(e, Direction::Write))?;

        info!("Pushed {} to {}", manifest.digest, url);
        Ok(())
    }
}

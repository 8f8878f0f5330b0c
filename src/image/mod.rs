use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::constants::media_type;
use crate::manifest::{Descriptor, ImageManifest};
use crate::registry::sha256_digest;


const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Image config. Fields we do not edit are carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub rootfs: RootFs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<History>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "Entrypoint", default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(rename = "Cmd", default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub fs_type: String,
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

impl Default for RootFs {
    fn default() -> Self {
        Self {
            fs_type: "layers".to_string(),
            diff_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_layer: Option<bool>,
}

impl ImageConfig {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).context("Failed to parse image config")
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn set_entrypoint(&mut self, entrypoint: Vec<String>) {
        debug!("Setting entrypoint to {:?}", entrypoint);
        self.config.entrypoint = Some(entrypoint);
    }

    /// Record a layer in rootfs and history
    pub fn append_layer(&mut self, layer: &Layer, created_by: &str) {
        self.rootfs.diff_ids.push(layer.diff_id.clone());
        self.history.push(History {
            created: Some(chrono::Utc::now().to_rfc3339()),
            created_by: Some(created_by.to_string()),
            comment: None,
            empty_layer: None,
        });
    }
}

/// Parse a comma-separated entrypoint override. Empty means "leave as is".
pub fn parse_entrypoint(entrypoint: &str) -> Option<Vec<String>> {
    if entrypoint.trim().is_empty() {
        return None;
    }
    Some(entrypoint.split(',').map(str::to_string).collect())
}

/// A compressed filesystem layer ready to upload
#[derive(Debug, Clone)]
pub struct Layer {
    pub data: Vec<u8>,
    pub digest: String,
    pub diff_id: String,
    pub media_type: String,
}

impl Layer {
    /// Build a layer from a tar archive on disk, gzipped or not
    pub fn from_archive(path: &Path, media_type: &str) -> Result<Self> {
        debug!("Creating layer from archive: {}", path.display());
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read archive {}", path.display()))?;
        Self::from_bytes(content, media_type)
            .with_context(|| format!("Invalid layer archive {}", path.display()))
    }

    pub fn from_bytes(content: Vec<u8>, media_type: &str) -> Result<Self> {
        let (tar_data, compressed) = if content.starts_with(&GZIP_MAGIC) {
            let mut tar_data = Vec::new();
            GzDecoder::new(&content[..])
                .read_to_end(&mut tar_data)
                .context("Failed to decompress archive")?;
            (tar_data, Some(content))
        } else {
            (content, None)
        };

        let entries = validate_tar(&tar_data)?;

        // Calculate diff_id (digest of uncompressed tar)
        let diff_id = sha256_digest(&tar_data);

        let data = match compressed {
            Some(data) => data,
            None => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&tar_data)?;
                encoder.finish()?
            }
        };

        let digest = sha256_digest(&data);
        info!("Prepared layer {} with {} entries", digest, entries);

        Ok(Self {
            digest,
            diff_id,
            data,
            media_type: media_type.to_string(),
        })
    }

    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            media_type: self.media_type.clone(),
            size: self.data.len() as i64,
            digest: self.digest.clone(),
        }
    }
}

fn validate_tar(tar_data: &[u8]) -> Result<usize> {
    let mut archive = tar::Archive::new(tar_data);
    let mut count = 0;
    for entry in archive.entries().context("Archive is not a tar file")? {
        entry.context("Archive is not a tar file")?;
        count += 1;
    }
    Ok(count)
}

/// Layer media type matching the manifest flavor of the base image
pub fn layer_media_type(manifest: &ImageManifest) -> &'static str {
    match manifest.media_type.as_deref() {
        Some(media_type::DOCKER_MANIFEST) => media_type::DOCKER_LAYER_GZIP,
        _ => media_type::OCI_LAYER_GZIP,
    }
}

/// The edited manifest: new config, base layers plus any appended layer
pub fn rebuild_manifest(
    base: &ImageManifest,
    config_data: &[u8],
    appended: Option<&Layer>,
) -> ImageManifest {
    let mut manifest = base.clone();
    manifest.config = Descriptor {
        media_type: base.config.media_type.clone(),
        size: config_data.len() as i64,
        digest: sha256_digest(config_data),
    };
    if let Some(layer) = appended {
        manifest.layers.push(layer.descriptor());
    }
    manifest
}

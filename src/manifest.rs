use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::media_type;
use crate::error::{Error, Result};

/// Image index (manifest list) for multi-arch support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageIndex {
    #[serde(rename = "schemaVersion")]
    pub schema_version: i32,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub manifests: Vec<ManifestDescriptor>,
}

/// Descriptor for a platform-specific manifest in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub size: i64,
    pub digest: String,
    #[serde(default)]
    pub platform: Platform,
}

/// Platform information for a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(rename = "os.version", default, skip_serializing_if = "String::is_empty")]
    pub os_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,
}

impl ImageIndex {
    pub fn new(media_type: &str) -> Self {
        Self {
            schema_version: 2,
            media_type: media_type.to_string(),
            manifests: Vec::new(),
        }
    }
}

impl Platform {
    pub fn new(os: &str, architecture: &str) -> Self {
        Self {
            architecture: architecture.to_string(),
            os: os.to_string(),
            ..Default::default()
        }
    }

    /// Decode the platform fields of a raw image config document.
    ///
    /// Architecture and os are required; os version and variant default to
    /// empty when the document does not carry them.
    pub fn from_config(raw: &[u8]) -> Result<Self> {
        #[derive(Deserialize)]
        struct ConfigPlatform {
            #[serde(default)]
            architecture: String,
            #[serde(default)]
            os: String,
            #[serde(rename = "os.version", default)]
            os_version: Option<String>,
            #[serde(default)]
            variant: Option<String>,
        }

        let decoded: ConfigPlatform = serde_json::from_slice(raw)
            .map_err(|e| Error::MetadataParse(format!("malformed image config: {}", e)))?;

        if decoded.architecture.is_empty() || decoded.os.is_empty() {
            return Err(Error::MetadataParse(
                "image config does not declare both architecture and os".to_string(),
            ));
        }

        Ok(Self {
            architecture: decoded.architecture,
            os: decoded.os,
            os_version: decoded.os_version.unwrap_or_default(),
            variant: decoded.variant.unwrap_or_default(),
        })
    }

    /// Whether `self` (a concrete image platform) satisfies a requested platform
    pub fn satisfies(&self, wanted: &Platform) -> bool {
        self.os == wanted.os
            && self.architecture == wanted.architecture
            && (wanted.variant.is_empty() || self.variant == wanted.variant)
            && (wanted.os_version.is_empty() || self.os_version == wanted.os_version)
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    /// Parse `os/arch[/variant][:osversion]`
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (spec, os_version) = match s.split_once(':') {
            Some((spec, version)) => (spec, version),
            None => (s, ""),
        };

        let parts: Vec<&str> = spec.split('/').collect();
        if parts.len() < 2 || parts.len() > 3 || parts.iter().any(|p| p.trim().is_empty()) {
            anyhow::bail!("Invalid platform format: {}", s);
        }

        Ok(Self {
            os: parts[0].to_string(),
            architecture: parts[1].to_string(),
            variant: parts.get(2).map(|v| v.to_string()).unwrap_or_default(),
            os_version: os_version.to_string(),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if !self.variant.is_empty() {
            write!(f, "/{}", self.variant)?;
        }
        if !self.os_version.is_empty() {
            write!(f, ":{}", self.os_version)?;
        }
        Ok(())
    }
}

/// Single-platform image manifest (Docker schema 2 or OCI)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageManifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: i32,
    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub config: Descriptor,
    pub layers: Vec<Descriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Content descriptor of a blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub size: i64,
    pub digest: String,
}

/// Work out the media type of a raw manifest document.
///
/// Registries are not obliged to echo `mediaType` in the body (OCI made it
/// optional), so a document with a `manifests` array is taken to be an index.
pub fn sniff_media_type(raw: &[u8]) -> Result<String> {
    #[derive(Deserialize)]
    struct Probe {
        #[serde(rename = "mediaType", default)]
        media_type: Option<String>,
        #[serde(default)]
        manifests: Option<serde_json::Value>,
    }

    let probe: Probe = serde_json::from_slice(raw)
        .map_err(|e| Error::MetadataParse(format!("malformed manifest: {}", e)))?;

    Ok(match probe.media_type {
        Some(media_type) => media_type,
        None if probe.manifests.is_some() => media_type::OCI_INDEX.to_string(),
        None => media_type::OCI_MANIFEST.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_config() {
        let config = br#"{"architecture":"arm","os":"linux","variant":"v7","os.version":"5.10","config":{}}"#;
        let platform = Platform::from_config(config).unwrap();
        assert_eq!(platform.architecture, "arm");
        assert_eq!(platform.os, "linux");
        assert_eq!(platform.variant, "v7");
        assert_eq!(platform.os_version, "5.10");
    }

    #[test]
    fn test_platform_from_config_missing_optional_fields() {
        let config = br#"{"architecture":"amd64","os":"linux"}"#;
        let platform = Platform::from_config(config).unwrap();
        assert_eq!(platform, Platform::new("linux", "amd64"));
        assert!(platform.os_version.is_empty());
        assert!(platform.variant.is_empty());
    }

    #[test]
    fn test_platform_from_config_missing_os() {
        let err = Platform::from_config(br#"{"architecture":"amd64"}"#).unwrap_err();
        assert!(matches!(err, Error::MetadataParse(_)));
    }

    #[test]
    fn test_platform_from_config_not_json() {
        let err = Platform::from_config(b"not json").unwrap_err();
        assert!(matches!(err, Error::MetadataParse(_)));
    }

    #[test]
    fn test_parse_platform() {
        let platform: Platform = "linux/arm/v7".parse().unwrap();
        assert_eq!(platform.os, "linux");
        assert_eq!(platform.architecture, "arm");
        assert_eq!(platform.variant, "v7");

        let platform: Platform = "windows/amd64:10.0.17763.1234".parse().unwrap();
        assert_eq!(platform.os_version, "10.0.17763.1234");
        assert_eq!(platform.to_string(), "windows/amd64:10.0.17763.1234");
    }

    #[test]
    fn test_parse_platform_invalid() {
        assert!("linux".parse::<Platform>().is_err());
        assert!("linux/".parse::<Platform>().is_err());
        assert!("a/b/c/d".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_satisfies() {
        let image = Platform {
            architecture: "arm64".to_string(),
            os: "linux".to_string(),
            os_version: String::new(),
            variant: "v8".to_string(),
        };
        assert!(image.satisfies(&"linux/arm64".parse().unwrap()));
        assert!(image.satisfies(&"linux/arm64/v8".parse().unwrap()));
        assert!(!image.satisfies(&"linux/arm64/v9".parse().unwrap()));
        assert!(!image.satisfies(&"linux/amd64".parse().unwrap()));
    }

    #[test]
    fn test_index_serialization_omits_empty_fields() {
        let mut index = ImageIndex::new(media_type::DOCKER_MANIFEST_LIST);
        index.manifests.push(ManifestDescriptor {
            media_type: media_type::DOCKER_MANIFEST.to_string(),
            size: 528,
            digest: "sha256:abc".to_string(),
            platform: Platform::new("linux", "amd64"),
        });

        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["schemaVersion"], 2);
        assert_eq!(json["mediaType"], media_type::DOCKER_MANIFEST_LIST);
        let platform = &json["manifests"][0]["platform"];
        assert_eq!(platform["os"], "linux");
        assert!(platform.get("variant").is_none());
        assert!(platform.get("os.version").is_none());
    }

    #[test]
    fn test_sniff_media_type() {
        assert_eq!(
            sniff_media_type(br#"{"mediaType":"application/vnd.docker.distribution.manifest.v2+json"}"#)
                .unwrap(),
            media_type::DOCKER_MANIFEST
        );
        assert_eq!(
            sniff_media_type(br#"{"schemaVersion":2,"manifests":[]}"#).unwrap(),
            media_type::OCI_INDEX
        );
        assert_eq!(
            sniff_media_type(br#"{"schemaVersion":2,"config":{},"layers":[]}"#).unwrap(),
            media_type::OCI_MANIFEST
        );
    }
}

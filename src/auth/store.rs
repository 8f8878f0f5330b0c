//! Persisting credentials, the write side of the keychain

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::keychain::{is_docker_hub, DefaultKeychain};
use super::{helper, DockerAuthEntry, DockerConfig};
use crate::constants::docker;

/// Key under which credentials for `registry` are stored
pub fn auth_key(registry: &str) -> String {
    if is_docker_hub(registry) {
        docker::HUB_AUTH_KEY.to_string()
    } else {
        registry.to_string()
    }
}

/// A Docker config file that credentials are written to
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file `docker login` would write to: the first existing config in
    /// the lookup order, otherwise `$DOCKER_CONFIG/config.json` or
    /// `~/.docker/config.json`.
    pub fn locate() -> Result<Self> {
        let paths = DefaultKeychain::config_paths();
        if let Some(existing) = paths.iter().find(|p| p.exists()) {
            return Ok(Self::new(existing));
        }

        if let Ok(docker_config) = std::env::var("DOCKER_CONFIG") {
            return Ok(Self::new(PathBuf::from(docker_config).join("config.json")));
        }

        let home = dirs::home_dir().context("Cannot determine home directory")?;
        Ok(Self::new(home.join(".docker").join("config.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<DockerConfig> {
        if !self.path.exists() {
            return Ok(DockerConfig::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(DockerConfig::default());
        }
        DockerConfig::parse(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Store credentials for a registry host
    pub fn store(&self, registry: &str, username: &str, password: &str) -> Result<()> {
        let mut config = self.load()?;
        let key = auth_key(registry);

        if let Some(helper_name) = config.helper_for(registry) {
            info!("Storing credentials for {} in {}", key, helper_name);
            helper::store(helper_name, &key, username, password)?;
            // The helper owns the secret now; leave only a marker behind.
            config.auths.insert(key, DockerAuthEntry::default());
        } else {
            debug!("Storing credentials for {} in {}", key, self.path.display());
            config
                .auths
                .insert(key, DockerAuthEntry::basic(username, password));
        }

        self.save(&config)
    }

    fn save(&self, config: &DockerConfig) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, config)?;
        file.write_all(b"\n")?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

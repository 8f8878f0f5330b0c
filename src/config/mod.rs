use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::{CredentialStore, DefaultKeychain};


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Registries reached over plain HTTP (e.g. `localhost:5000`)
    #[serde(default)]
    pub insecure_registries: Vec<String>,

    /// Docker config file holding registry credentials. Defaults to the
    /// Docker lookup order.
    pub docker_config: Option<PathBuf>,
}

impl Config {
    /// Location of the user config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("multiarch").join("config.toml"))
    }

    pub fn load() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Keychain honoring `docker_config`
    pub fn keychain(&self) -> DefaultKeychain {
        match &self.docker_config {
            Some(path) => DefaultKeychain::with_config_file(path),
            None => DefaultKeychain::new(),
        }
    }

    /// Credential store honoring `docker_config`
    pub fn credential_store(&self) -> anyhow::Result<CredentialStore> {
        match &self.docker_config {
            Some(path) => Ok(CredentialStore::new(path)),
            None => CredentialStore::locate(),
        }
    }
}

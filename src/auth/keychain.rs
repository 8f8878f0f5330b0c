//! Keychain implementation for credential management

use super::{helper, AuthConfig, DockerAuthEntry, DockerConfig};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::constants::docker;

/// Trait for types that can resolve authentication for a registry host
pub trait Keychain: Send + Sync {
    /// Resolve credentials for a registry host (e.g. `ghcr.io`, `localhost:5000`)
    fn resolve(&self, registry: &str) -> Result<AuthConfig>;
}

/// Default keychain implementation that checks Docker config files
pub struct DefaultKeychain {
    /// Explicit config file, bypassing the usual lookup order
    config_file: Option<PathBuf>,
    /// Cached config to avoid re-reading files
    config_cache: OnceLock<DockerConfig>,
}

impl DefaultKeychain {
    /// Create a new DefaultKeychain
    pub fn new() -> Self {
        Self {
            config_file: None,
            config_cache: OnceLock::new(),
        }
    }

    /// Keychain reading a single, explicit Docker config file
    pub fn with_config_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_file: Some(path.into()),
            config_cache: OnceLock::new(),
        }
    }

    /// Get paths to check for Docker config
    pub(crate) fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Check DOCKER_CONFIG environment variable
        if let Ok(docker_config) = std::env::var("DOCKER_CONFIG") {
            paths.push(PathBuf::from(docker_config).join("config.json"));
        }

        // Check REGISTRY_AUTH_FILE environment variable
        if let Ok(auth_file) = std::env::var("REGISTRY_AUTH_FILE") {
            paths.push(PathBuf::from(auth_file));
        }

        // Check XDG_RUNTIME_DIR for containers auth
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            paths.push(PathBuf::from(xdg_runtime).join("containers/auth.json"));
        }

        // Check default Docker config location
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".docker/config.json"));
        }

        paths
    }

    fn candidate_paths(&self) -> Vec<PathBuf> {
        match &self.config_file {
            Some(path) => vec![path.clone()],
            None => Self::config_paths(),
        }
    }

    /// Load Docker config from disk
    fn load_config(&self) -> &DockerConfig {
        self.config_cache.get_or_init(|| {
            for path in self.candidate_paths() {
                if !path.exists() {
                    continue;
                }
                debug!("Checking Docker config at: {}", path.display());
                match std::fs::read_to_string(&path) {
                    Ok(content) => match DockerConfig::parse(&content) {
                        Ok(config) => {
                            debug!("Loaded Docker config from: {}", path.display());
                            return config;
                        }
                        Err(e) => {
                            warn!("Failed to parse Docker config at {}: {}", path.display(), e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read Docker config at {}: {}", path.display(), e);
                    }
                }
            }

            DockerConfig::default()
        })
    }

    /// Normalize registry URL for matching
    fn normalize_registry(registry: &str) -> Vec<String> {
        let mut variants = vec![registry.to_string()];

        if is_docker_hub(registry) {
            variants.push("docker.io".to_string());
            variants.push("index.docker.io".to_string());
            variants.push(docker::HUB_AUTH_KEY.to_string());
            variants.push("https://index.docker.io/v2/".to_string());
        } else if !registry.starts_with("http://") && !registry.starts_with("https://") {
            variants.push(format!("https://{}", registry));
            variants.push(format!("http://{}", registry));
            variants.push(format!("https://{}/v1/", registry));
            variants.push(format!("https://{}/v2/", registry));
        }

        variants
    }

    /// Find auth entry for a registry
    fn find_auth_entry<'a>(
        config: &'a DockerConfig,
        registry: &str,
    ) -> Option<&'a DockerAuthEntry> {
        Self::normalize_registry(registry)
            .iter()
            .find_map(|variant| config.auths.get(variant))
    }
}

pub(crate) fn is_docker_hub(registry: &str) -> bool {
    matches!(
        registry,
        "docker.io" | "index.docker.io" | "registry-1.docker.io"
    )
}

impl Default for DefaultKeychain {
    fn default() -> Self {
        Self::new()
    }
}

impl Keychain for DefaultKeychain {
    fn resolve(&self, registry: &str) -> Result<AuthConfig> {
        let config = self.load_config();

        debug!("Resolving auth for registry: {}", registry);

        if let Some(auth_entry) = Self::find_auth_entry(config, registry) {
            let auth_config = auth_entry.to_auth_config();
            if !auth_config.is_anonymous() {
                debug!("Found auth entry for {}", registry);
                return Ok(auth_config);
            }
            if auth_config.registry_token.is_some() {
                warn!("Ignoring registry token for {}, it cannot be used as credentials", registry);
            }
        }

        if let Some(helper_name) = config.helper_for(registry) {
            debug!("Trying credential helper: {} for {}", helper_name, registry);
            match helper::get(helper_name, &super::auth_key(registry)) {
                Ok(auth_config) => return Ok(auth_config),
                Err(e) => warn!("Credential helper failed: {}", e),
            }
        }

        debug!("No credentials found for {}, using anonymous", registry);
        Ok(AuthConfig::anonymous())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_registry() {
        let variants = DefaultKeychain::normalize_registry("docker.io");
        assert!(variants.contains(&"docker.io".to_string()));
        assert!(variants.contains(&"index.docker.io".to_string()));
        assert!(variants.contains(&docker::HUB_AUTH_KEY.to_string()));

        let variants = DefaultKeychain::normalize_registry("gcr.io");
        assert!(variants.contains(&"gcr.io".to_string()));
        assert!(variants.contains(&"https://gcr.io".to_string()));
    }

    #[test]
    fn test_resolve_from_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"auths": {"https://index.docker.io/v1/": {"auth": "dXNlcjpwYXNz"}}}"#,
        )
        .unwrap();

        let keychain = DefaultKeychain::with_config_file(&path);
        let auth = keychain.resolve("docker.io").unwrap();
        assert_eq!(
            auth.credentials(),
            Some(("user".to_string(), "pass".to_string()))
        );

        let auth = keychain.resolve("quay.io").unwrap();
        assert!(auth.is_anonymous());
    }

    #[test]
    fn test_resolve_registry_token_only_entry_is_anonymous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"auths": {"registry.example.com": {"registrytoken": "bearer-token"}}}"#,
        )
        .unwrap();

        let auth = DefaultKeychain::with_config_file(&path)
            .resolve("registry.example.com")
            .unwrap();
        assert!(auth.is_anonymous());
        assert_eq!(auth.registry_token, None);
    }

    #[test]
    fn test_resolve_missing_file_is_anonymous() {
        let dir = TempDir::new().unwrap();
        let keychain = DefaultKeychain::with_config_file(dir.path().join("absent.json"));
        assert!(keychain.resolve("ghcr.io").unwrap().is_anonymous());
    }
}

//! Authentication module for container registries
//!
//! Credentials are read from and written to Docker config files, with
//! credential helpers taking over where the config designates one.

use anyhow::Result;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod helper;
mod keychain;
mod store;

pub use keychain::{DefaultKeychain, Keychain};
pub use store::{auth_key, CredentialStore};

/// Authentication configuration containing credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_token: Option<String>,
}

impl AuthConfig {
    /// Create an anonymous AuthConfig
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Check if this carries nothing we can authenticate with. A registry
    /// token alone does not count; it is not exchangeable for a session.
    pub fn is_anonymous(&self) -> bool {
        self.credentials().is_none() && self.identity_token.is_none()
    }

    /// Username and password, decoding the `auth` field when that is all we have
    pub fn credentials(&self) -> Option<(String, String)> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Some((username.clone(), password.clone()));
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(self.auth.as_ref()?)
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some((user.to_string(), pass.to_string()))
    }

    /// Convert to oci-distribution RegistryAuth
    pub fn to_registry_auth(&self) -> oci_distribution::secrets::RegistryAuth {
        use oci_distribution::secrets::RegistryAuth;

        if let Some((username, password)) = self.credentials() {
            return RegistryAuth::Basic(username, password);
        }

        // An identity token is exchanged by the token endpoint like a password
        // for the fixed `<token>` user.
        if let Some(token) = &self.identity_token {
            return RegistryAuth::Basic("<token>".to_string(), token.clone());
        }

        RegistryAuth::Anonymous
    }
}

/// Docker config file structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub auths: HashMap<String, DockerAuthEntry>,
    #[serde(rename = "credHelpers", default, skip_serializing_if = "HashMap::is_empty")]
    pub cred_helpers: HashMap<String, String>,
    #[serde(rename = "credsStore", skip_serializing_if = "Option::is_none")]
    pub creds_store: Option<String>,
    /// Settings owned by other tools, written back untouched
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Entry in the Docker config auths section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerAuthEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "identitytoken", skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
    #[serde(rename = "registrytoken", skip_serializing_if = "Option::is_none")]
    pub registry_token: Option<String>,
}

impl DockerAuthEntry {
    /// Entry in the form `docker login` writes: base64 `user:password`
    pub fn basic(username: &str, password: &str) -> Self {
        Self {
            auth: Some(
                base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password)),
            ),
            ..Default::default()
        }
    }

    /// Convert to AuthConfig
    pub fn to_auth_config(&self) -> AuthConfig {
        AuthConfig {
            username: self.username.clone(),
            password: self.password.clone(),
            auth: self.auth.clone(),
            identity_token: self.identity_token.clone(),
            registry_token: self.registry_token.clone(),
        }
    }
}

impl DockerConfig {
    /// Credential helper responsible for a registry, if any
    pub fn helper_for(&self, registry: &str) -> Option<&str> {
        self.cred_helpers
            .get(registry)
            .or(self.creds_store.as_ref())
            .map(String::as_str)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests;

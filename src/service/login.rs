//! Store registry credentials for later operations

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::auth::CredentialStore;
use crate::error::Error;

/// Service for registry logins
pub struct LoginService;

impl LoginService {
    pub fn login(
        store: &CredentialStore,
        registry: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        Self::store(store, registry, username, password).with_context(|| {
            format!(
                "failed to login to registry {} with username {} and given password",
                registry, username
            )
        })
    }

    fn store(store: &CredentialStore, registry: &str, username: &str, password: &str) -> Result<()> {
        let registry = registry.trim();
        if registry.is_empty() || registry.chars().any(char::is_whitespace) {
            return Err(Error::invalid_reference(registry, "registry host is empty or malformed").into());
        }
        if username.trim().is_empty() {
            bail!("username is empty");
        }

        store.store(registry, username, password)?;
        info!("Stored credentials for {} in {}", registry, store.path().display());
        Ok(())
    }
}

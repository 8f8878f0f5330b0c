//! Docker credential helper protocol (`docker-credential-<name> get|store`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

use super::AuthConfig;

#[derive(Deserialize)]
struct HelperResponse {
    #[serde(rename = "Username")]
    username: Option<String>,
    #[serde(rename = "Secret")]
    secret: Option<String>,
}

#[derive(Serialize)]
struct HelperCredentials<'a> {
    #[serde(rename = "ServerURL")]
    server_url: &'a str,
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "Secret")]
    secret: &'a str,
}

fn run(helper: &str, verb: &str, input: &[u8]) -> Result<Vec<u8>> {
    let helper_name = format!("docker-credential-{}", helper);
    debug!("Executing credential helper: {} {}", helper_name, verb);

    let mut child = Command::new(&helper_name)
        .arg(verb)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn credential helper: {}", helper_name))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input)?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        anyhow::bail!(
            "Credential helper {} failed: {}{}",
            helper_name,
            stderr.trim(),
            stdout.trim()
        );
    }

    Ok(output.stdout)
}

/// Ask a helper for the credentials of `server_url`
pub(crate) fn get(helper: &str, server_url: &str) -> Result<AuthConfig> {
    let stdout = run(helper, "get", format!("{}\n", server_url).as_bytes())?;
    let response: HelperResponse =
        serde_json::from_slice(&stdout).context("Failed to parse credential helper response")?;

    Ok(AuthConfig {
        username: response.username,
        password: response.secret,
        ..Default::default()
    })
}

/// Hand credentials for `server_url` to a helper
pub(crate) fn store(helper: &str, server_url: &str, username: &str, secret: &str) -> Result<()> {
    let payload = serde_json::to_vec(&HelperCredentials {
        server_url,
        username,
        secret,
    })?;
    run(helper, "store", &payload)?;
    Ok(())
}

//! Tests for the auth module

use super::*;
use oci_distribution::secrets::RegistryAuth;
use tempfile::TempDir;

#[test]
fn test_docker_config_parsing() {
    let config_json = r#"{
        "auths": {
            "docker.io": {
                "auth": "dXNlcjpwYXNz"
            },
            "gcr.io": {
                "username": "oauth2accesstoken",
                "password": "ya29.token",
                "registrytoken": "bearer-token"
            }
        },
        "credHelpers": {
            "ecr.amazonaws.com": "ecr-login"
        },
        "credsStore": "osxkeychain",
        "currentContext": "desktop-linux"
    }"#;

    let config = DockerConfig::parse(config_json).unwrap();

    assert_eq!(config.auths.len(), 2);
    assert_eq!(
        config.auths["docker.io"].auth,
        Some("dXNlcjpwYXNz".to_string())
    );
    assert_eq!(
        config.auths["gcr.io"].registry_token,
        Some("bearer-token".to_string())
    );

    assert_eq!(config.helper_for("ecr.amazonaws.com"), Some("ecr-login"));
    assert_eq!(config.helper_for("ghcr.io"), Some("osxkeychain"));
    assert_eq!(config.other["currentContext"], "desktop-linux");
}

#[test]
fn test_auth_config_anonymous() {
    let auth = AuthConfig::anonymous();
    assert!(auth.is_anonymous());
    assert!(matches!(auth.to_registry_auth(), RegistryAuth::Anonymous));
}

#[test]
fn test_registry_token_alone_is_anonymous() {
    let entry = DockerAuthEntry {
        registry_token: Some("bearer-token".to_string()),
        ..Default::default()
    };

    let config = entry.to_auth_config();
    assert!(config.is_anonymous());
    assert!(matches!(config.to_registry_auth(), RegistryAuth::Anonymous));
}

#[test]
fn test_username_without_password_is_anonymous() {
    let config = AuthConfig {
        username: Some("alice".to_string()),
        ..Default::default()
    };
    assert!(config.is_anonymous());
}

#[test]
fn test_auth_config_decodes_auth_field() {
    let entry = DockerAuthEntry {
        auth: Some("dXNlcjpwYXNz".to_string()),
        ..Default::default()
    };

    let config = entry.to_auth_config();
    assert_eq!(
        config.credentials(),
        Some(("user".to_string(), "pass".to_string()))
    );
    match config.to_registry_auth() {
        RegistryAuth::Basic(user, pass) => {
            assert_eq!(user, "user");
            assert_eq!(pass, "pass");
        }
        _ => panic!("expected basic auth"),
    }
}

#[test]
fn test_basic_entry_round_trips_through_keychain() {
    let entry = DockerAuthEntry::basic("alice", "s3cr:et");
    let config = entry.to_auth_config();
    assert_eq!(
        config.credentials(),
        Some(("alice".to_string(), "s3cr:et".to_string()))
    );
}

#[test]
fn test_auth_key_for_docker_hub() {
    assert_eq!(auth_key("docker.io"), "https://index.docker.io/v1/");
    assert_eq!(auth_key("index.docker.io"), "https://index.docker.io/v1/");
    assert_eq!(auth_key("ghcr.io"), "ghcr.io");
}

#[test]
fn test_store_creates_config_and_keychain_reads_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let store = CredentialStore::new(&path);
    store.store("localhost:5000", "bob", "hunter2").unwrap();

    let keychain = DefaultKeychain::with_config_file(&path);
    let auth = keychain.resolve("localhost:5000").unwrap();
    assert_eq!(
        auth.credentials(),
        Some(("bob".to_string(), "hunter2".to_string()))
    );
}

#[test]
fn test_store_preserves_existing_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"auths": {"quay.io": {"auth": "cTpx"}}, "experimental": "enabled"}"#,
    )
    .unwrap();

    CredentialStore::new(&path)
        .store("ghcr.io", "carol", "token")
        .unwrap();

    let written = DockerConfig::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(written.auths.contains_key("quay.io"));
    assert!(written.auths.contains_key("ghcr.io"));
    assert_eq!(written.other["experimental"], "enabled");
}

#[test]
fn test_store_overwrites_previous_credentials() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let store = CredentialStore::new(&path);

    store.store("ghcr.io", "old", "old").unwrap();
    store.store("ghcr.io", "new", "new").unwrap();

    let auth = DefaultKeychain::with_config_file(&path)
        .resolve("ghcr.io")
        .unwrap();
    assert_eq!(auth.credentials(), Some(("new".to_string(), "new".to_string())));
}

#[cfg(test)]
mod tests {
    use super::super::memory::MemoryRegistry;
    use super::super::*;
    use crate::error::ErrorKind;

    fn reference(s: &str) -> ImageReference {
        ImageReference::parse(s).unwrap()
    }

    #[test]
    fn test_raw_manifest_digest_and_media_type() {
        let raw = RawManifest::new(br#"{"schemaVersion":2,"manifests":[]}"#.to_vec()).unwrap();
        assert!(raw.is_index());
        assert_eq!(raw.digest, sha256_digest(&raw.data));
        assert_eq!(raw.size(), raw.data.len() as i64);
    }

    #[test]
    fn test_classify_server_errors() {
        let unauthorized = OciDistributionError::ServerError {
            code: 401,
            url: "https://r.example/v2/".to_string(),
            message: "denied".to_string(),
        };
        assert_eq!(classify(unauthorized, Direction::Read).kind(), ErrorKind::Auth);

        let missing = OciDistributionError::ServerError {
            code: 404,
            url: "https://r.example/v2/a/manifests/x".to_string(),
            message: String::new(),
        };
        assert_eq!(classify(missing, Direction::Read).kind(), ErrorKind::NotFound);

        let invalid = OciDistributionError::ServerError {
            code: 400,
            url: "https://r.example/v2/a/manifests/x".to_string(),
            message: "MANIFEST_INVALID".to_string(),
        };
        assert_eq!(
            classify(invalid, Direction::Write).kind(),
            ErrorKind::RegistryRejected
        );

        let unavailable = OciDistributionError::ServerError {
            code: 503,
            url: "https://r.example/v2/".to_string(),
            message: String::new(),
        };
        assert_eq!(classify(unavailable, Direction::Write).kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_memory_registry_round_trip() {
        let registry = MemoryRegistry::new();
        let image = reference("example.com/app:v1");
        let seeded = registry.insert_image(&image, br#"{"architecture":"amd64","os":"linux"}"#, b"layer").unwrap();

        let fetched = registry.get_manifest(&image).await.unwrap();
        assert_eq!(fetched, seeded);
        assert_eq!(registry.manifest_reads(), 1);

        let by_digest = registry
            .get_manifest(&image.with_digest(&seeded.digest))
            .await
            .unwrap();
        assert_eq!(by_digest.digest, seeded.digest);

        let manifest = fetched.image_manifest().unwrap();
        let config = registry.get_blob(&image, &manifest.config.digest).await.unwrap();
        assert_eq!(config, br#"{"architecture":"amd64","os":"linux"}"#.to_vec());
    }

    #[tokio::test]
    async fn test_memory_registry_missing_manifest() {
        let registry = MemoryRegistry::new();
        let err = registry
            .get_manifest(&reference("example.com/app:nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_memory_registry_rejects_dangling_manifest() {
        let registry = MemoryRegistry::new();
        let source = reference("example.com/app:v1");
        let seeded = registry.insert_image(&source, br#"{"architecture":"amd64","os":"linux"}"#, b"layer").unwrap();

        // Same manifest pushed into a repository that lacks its blobs
        let err = registry
            .put_manifest(&reference("example.com/other:v1"), &seeded)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegistryRejected);
        assert!(err.to_string().contains("blob unknown"));
    }

    #[tokio::test]
    async fn test_copy_blobs_between_repositories() {
        let registry = MemoryRegistry::new();
        let source = reference("example.com/app:v1");
        let target = reference("example.com/mirror:v1");
        let seeded = registry.insert_image(&source, br#"{"architecture":"amd64","os":"linux"}"#, b"layer").unwrap();
        let manifest = seeded.image_manifest().unwrap();

        copy_blobs(&registry, &source, &target, &manifest).await.unwrap();

        assert!(registry.has_blob(&target, &manifest.config.digest));
        assert!(registry.has_blob(&target, &manifest.layers[0].digest));
        registry.put_manifest(&target, &seeded).await.unwrap();

        // Same registry, so nothing went over the wire
        assert_eq!(registry.blob_mounts(), 2);
        assert_eq!(registry.blob_uploads(), 0);
    }

    #[tokio::test]
    async fn test_copy_blobs_across_registries_uploads() {
        let registry = MemoryRegistry::new();
        let source = reference("example.com/app:v1");
        let target = reference("mirror.example.com/app:v1");
        let seeded = registry
            .insert_image(&source, br#"{"architecture":"amd64","os":"linux"}"#, b"layer")
            .unwrap();
        let manifest = seeded.image_manifest().unwrap();

        copy_blobs(&registry, &source, &target, &manifest).await.unwrap();

        assert!(registry.has_blob(&target, &manifest.layers[0].digest));
        assert_eq!(registry.blob_mounts(), 0);
        assert_eq!(registry.blob_uploads(), 2);
    }

    #[tokio::test]
    async fn test_mount_blob_missing_in_source() {
        let registry = MemoryRegistry::new();
        let err = registry
            .mount_blob(
                &reference("example.com/mirror:v1"),
                &reference("example.com/app:v1"),
                "sha256:0000",
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!registry.has_blob(&reference("example.com/mirror:v1"), "sha256:0000"));
    }

    #[tokio::test]
    async fn test_put_blob_verifies_digest() {
        let registry = MemoryRegistry::new();
        let err = registry
            .put_blob(&reference("example.com/app:v1"), "sha256:0000", b"data".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegistryRejected);
    }
}

/// Media types understood by the registry layer
pub mod media_type {
    /// Docker schema 2 image manifest
    pub const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";

    /// Docker schema 2 manifest list
    pub const DOCKER_MANIFEST_LIST: &str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// Docker image config
    pub const DOCKER_CONFIG: &str = "application/vnd.docker.container.image.v1+json";

    /// Docker gzip layer
    pub const DOCKER_LAYER_GZIP: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

    /// OCI image manifest
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index
    pub const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

    /// OCI gzip layer
    pub const OCI_LAYER_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";

    /// Every manifest media type we ask registries for
    pub const ACCEPTED_MANIFESTS: &[&str] =
        &[DOCKER_MANIFEST, DOCKER_MANIFEST_LIST, OCI_MANIFEST, OCI_INDEX];

    /// Whether the media type names a multi-platform list
    pub fn is_index(media_type: &str) -> bool {
        media_type == DOCKER_MANIFEST_LIST || media_type == OCI_INDEX
    }
}

/// Platform constants for container images
pub mod platform {
    /// Platform picked from a manifest list base when none is given
    pub const DEFAULT: &str = "linux/amd64";
}

/// Container image tag constants
pub mod tag {
    /// Tag used when a reference names neither a tag nor a digest
    pub const DEFAULT: &str = "latest";
}

/// Docker credential store constants
pub mod docker {
    /// Key Docker uses for Docker Hub credentials
    pub const HUB_AUTH_KEY: &str = "https://index.docker.io/v1/";
}

//! Manifest list assembly

use std::collections::HashSet;
use tracing::warn;

use super::fetch::SourceEntry;
use crate::constants::media_type;
use crate::manifest::{ImageIndex, ManifestDescriptor, Platform};

/// Accumulates source entries into a manifest list, in whatever order they arrive
pub struct IndexBuilder {
    index: ImageIndex,
    seen: HashSet<Platform>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self {
            index: ImageIndex::new(media_type::DOCKER_MANIFEST_LIST),
            seen: HashSet::new(),
        }
    }

    pub fn add(&mut self, entry: &SourceEntry) {
        debug_assert!(
            !entry.platform.architecture.is_empty() && !entry.platform.os.is_empty(),
            "source entry without a platform"
        );

        if !self.seen.insert(entry.platform.clone()) {
            warn!(
                "Platform {} appears more than once in the manifest list ({})",
                entry.platform, entry.reference
            );
        }

        self.index.manifests.push(ManifestDescriptor {
            media_type: entry.manifest.media_type.clone(),
            size: entry.manifest.size(),
            digest: entry.manifest.digest.clone(),
            platform: entry.platform.clone(),
        });
    }

    pub fn build(self) -> ImageIndex {
        self.index
    }
}

//! Image reference parsing
//!
//! Grammar and Docker Hub normalization come from `oci_distribution::Reference`;
//! this wrapper adds the tag default and the tag-only form required for
//! manifest list targets.

use oci_distribution::Reference;
use std::fmt;
use std::str::FromStr;

use crate::constants::tag;
use crate::error::{Error, Result};


/// Validated `registry/repository[:tag][@digest]` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    registry: String,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parse a tag or digest reference. A reference naming neither gets the
    /// default tag.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::invalid_reference(s, "reference is empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(Error::invalid_reference(s, "reference contains whitespace"));
        }

        let parsed = Reference::from_str(s).map_err(|e| Error::invalid_reference(s, e))?;

        let registry = parsed.registry().to_string();
        let repository = parsed.repository().to_string();
        if registry.is_empty() || repository.is_empty() {
            return Err(Error::invalid_reference(
                s,
                "reference must name a registry and a repository",
            ));
        }

        let digest = parsed.digest().map(str::to_string);
        let tag = match (parsed.tag(), &digest) {
            (Some(t), _) => Some(t.to_string()),
            (None, Some(_)) => None,
            (None, None) => Some(tag::DEFAULT.to_string()),
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Parse a reference that must be addressable by tag
    pub fn parse_tag(s: &str) -> Result<Self> {
        let reference = Self::parse(s)?;
        if reference.digest.is_some() {
            return Err(Error::invalid_reference(
                s,
                "expected a tag reference, got a digest",
            ));
        }
        Ok(reference)
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Same repository, addressed by digest
    pub fn with_digest(&self, digest: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            digest: Some(digest.to_string()),
        }
    }

    /// Whether both references live in the same repository of the same registry
    pub fn same_repository(&self, other: &ImageReference) -> bool {
        self.registry == other.registry && self.repository == other.repository
    }

    /// `registry/repository`, without tag or digest
    pub fn repository_path(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Transport form of the reference. A digest, when present, wins over the tag.
    pub(crate) fn to_oci(&self) -> Reference {
        match (&self.digest, &self.tag) {
            (Some(digest), _) => Reference::with_digest(
                self.registry.clone(),
                self.repository.clone(),
                digest.clone(),
            ),
            (None, Some(tag)) => {
                Reference::with_tag(self.registry.clone(), self.repository.clone(), tag.clone())
            }
            (None, None) => Reference::with_tag(
                self.registry.clone(),
                self.repository.clone(),
                tag::DEFAULT.to_string(),
            ),
        }
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

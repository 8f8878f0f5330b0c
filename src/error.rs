//! Error taxonomy shared by every operation.
//!
//! Operations return [`anyhow::Result`] and wrap failures with the phase that
//! produced them. The innermost cause is one of the [`Error`] variants below,
//! which callers can recover from a wrapped chain with [`kind_of`].

use thiserror::Error as ThisError;

/// Result type for the registry and parsing layers
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes surfaced by the crate
#[derive(Debug, ThisError)]
pub enum Error {
    /// Malformed target or source reference
    #[error("invalid reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The artifact does not exist or is not accessible
    #[error("not found: {0}")]
    NotFound(String),

    /// The image metadata lacks platform fields or is not a single-platform image
    #[error("{0}")]
    MetadataParse(String),

    /// Transport failure talking to a registry
    #[error("network error: {0}")]
    Network(String),

    /// The registry refused our credentials
    #[error("unauthorized: {0}")]
    Auth(String),

    /// The registry accepted the request but refused the content
    #[error("registry rejected the request: {0}")]
    RegistryRejected(String),
}

/// Discriminant of [`Error`], convenient for matching on wrapped chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidReference,
    NotFound,
    MetadataParse,
    Network,
    Auth,
    RegistryRejected,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidReference { .. } => ErrorKind::InvalidReference,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::MetadataParse(_) => ErrorKind::MetadataParse,
            Error::Network(_) => ErrorKind::Network,
            Error::Auth(_) => ErrorKind::Auth,
            Error::RegistryRejected(_) => ErrorKind::RegistryRejected,
        }
    }

    pub(crate) fn invalid_reference(reference: &str, reason: impl ToString) -> Self {
        Error::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Find the classified cause inside a context-wrapped error
pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::kind)
}

/// Render an error chain as a single line, outermost phase first
pub fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_kind_survives_context() {
        let err: anyhow::Result<()> = Err(Error::NotFound("manifest unknown".to_string()))
            .context("failed to access remote image repo/a:amd64")
            .context("failed to add manifest to manifest list");
        let err = err.unwrap_err();

        assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
        assert_eq!(
            describe(&err),
            "failed to add manifest to manifest list: failed to access remote image repo/a:amd64: not found: manifest unknown"
        );
    }

    #[test]
    fn test_kind_of_unclassified() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(kind_of(&err), None);
    }
}

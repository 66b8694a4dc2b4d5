//! Error types for registry operations

use http::StatusCode;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Error types for registry operations
///
/// Absence of a blob, manifest, or upload session is not an error; the
/// stores report it as `None`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// Invalid digest format
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    /// Invalid tag name
    #[error("invalid tag name: {0}")]
    InvalidTag(String),

    /// Invalid repository name
    #[error("invalid repository name: {0}")]
    InvalidRepository(String),

    /// Invalid manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Digest mismatch
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Expected digest
        expected: String,
        /// Actual digest
        actual: String,
    },

    /// Blob upload session is missing or corrupt
    #[error("blob upload invalid: {0}")]
    BlobUploadInvalid(String),

    /// Operation not supported by this repository kind
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// Remote registry answered with a status this client cannot translate
    #[error("unexpected status from remote registry: {0}")]
    UnexpectedStatus(StatusCode),

    /// Remote registry transport failure
    #[error("remote registry error: {0}")]
    Remote(String),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

impl RegistryError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::InvalidDigest(_)
            | RegistryError::InvalidTag(_)
            | RegistryError::InvalidRepository(_)
            | RegistryError::InvalidManifest(_)
            | RegistryError::DigestMismatch { .. }
            | RegistryError::BlobUploadInvalid(_) => StatusCode::BAD_REQUEST,
            RegistryError::Unsupported(_) => StatusCode::METHOD_NOT_ALLOWED,
            RegistryError::UnexpectedStatus(_) | RegistryError::Remote(_) => {
                StatusCode::BAD_GATEWAY
            }
            RegistryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for OCI error responses
    pub fn error_code(&self) -> &'static str {
        match self {
            RegistryError::InvalidDigest(_) | RegistryError::DigestMismatch { .. } => {
                "DIGEST_INVALID"
            }
            RegistryError::InvalidTag(_) => "TAG_INVALID",
            RegistryError::InvalidRepository(_) => "NAME_INVALID",
            RegistryError::InvalidManifest(_) => "MANIFEST_INVALID",
            RegistryError::BlobUploadInvalid(_) => "BLOB_UPLOAD_INVALID",
            RegistryError::Unsupported(_) => "UNSUPPORTED",
            RegistryError::UnexpectedStatus(_)
            | RegistryError::Remote(_)
            | RegistryError::Storage(_) => "UNKNOWN",
        }
    }

    pub(crate) fn remote<E: std::fmt::Display>(err: E) -> Self {
        RegistryError::Remote(err.to_string())
    }
}

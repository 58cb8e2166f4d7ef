use error_common::codes;
use thiserror::Error;

use crate::repository::RepositoryError;
use crate::storage::BlobStoreError;

/// Failures of the ingestion pipeline and the operations around it
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Malformed archive or manifest
    #[error("Failed to parse package: {0}")]
    Parse(String),

    #[error("Invalid version format '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Version {version} of {package} already exists")]
    DuplicateVersion { package: String, version: String },

    /// Blob store failure
    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// Relational store failure
    #[error("Persistence operation failed: {0}")]
    Persistence(String),

    #[error("Invalid config schema: {0}")]
    Schema(String),

    #[error("Config schema not found")]
    SchemaMissing,

    /// Submitted configuration rejected; `field` names the first offending key
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RegistryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the caller can fix the request and retry
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Persistence(_))
    }

    /// Stable code for API envelopes
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => codes::package::MALFORMED_ARCHIVE,
            Self::InvalidVersion { .. } => codes::package::INVALID_VERSION,
            Self::DuplicateVersion { .. } => codes::package::DUPLICATE_VERSION,
            Self::Storage(_) => codes::storage::OBJECT_STORE_FAILED,
            Self::Persistence(_) => codes::database::QUERY_FAILED,
            Self::Schema(_) => codes::package::SCHEMA_INVALID,
            Self::SchemaMissing => codes::package::SCHEMA_MISSING,
            Self::Validation { .. } => codes::validation::INVALID_INPUT,
            Self::NotFound(_) => codes::resource::NOT_FOUND,
            Self::InvalidRequest(_) => codes::validation::INVALID_FORMAT,
        }
    }
}

impl From<BlobStoreError> for RegistryError {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::NotFound(key) => Self::NotFound(format!("Object {key}")),
            BlobStoreError::Backend(message) => Self::Storage(message),
        }
    }
}

impl From<RepositoryError> for RegistryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            RepositoryError::UniqueViolation(message) | RepositoryError::Backend(message) => {
                Self::Persistence(message)
            }
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

//! Cross-entity lifecycle rules for facilities, accounts, assignments and documents.
//!
//! Every operation receives the three backing stores explicitly through [`Stores`]. None of
//! the stores share a transaction, so multi-store operations run as ordered steps and either
//! compensate ([`provisioning`]) or continue best-effort ([`decommission`]) on failure.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::credentials::{CredentialError, CredentialStore};
use crate::metadata::{ConflictKind, MetadataError, MetadataStore};
use crate::storage::{ObjectStorage, StorageError};

pub mod assignments;
pub mod decommission;
pub mod documents;
pub mod facilities;
pub mod gate;
pub mod guard;
pub mod provisioning;

pub const ACTIVE_DOCUMENT_CONFLICT: &str = "facility already has an active document";
pub const ASSIGNMENT_CONFLICT: &str = "facility already has an assigned account";

#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub objects: Arc<dyn ObjectStorage>,
}

impl Stores {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        metadata: Arc<dyn MetadataStore>,
        objects: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            credentials,
            metadata,
            objects,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("object storage error: {0}")]
    Storage(String),
    #[error("credential store error: {0}")]
    CredentialStore(String),
    #[error("metadata store error: {0}")]
    Metadata(String),
    #[error("account {identity_id} needs manual cleanup: {compensation} (after: {cause})")]
    CompensationFailure {
        identity_id: Uuid,
        cause: String,
        compensation: String,
    },
    #[error("{operation} incomplete after [{}]: {message}", .completed.join(", "))]
    Incomplete {
        operation: &'static str,
        completed: Vec<&'static str>,
        message: String,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<StorageError> for EngineError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Missing(_) => EngineError::NotFound("stored file"),
            other => EngineError::Storage(other.to_string()),
        }
    }
}

impl From<MetadataError> for EngineError {
    fn from(value: MetadataError) -> Self {
        match value {
            MetadataError::Conflict(ConflictKind::ActiveDocument) => {
                EngineError::Conflict(ACTIVE_DOCUMENT_CONFLICT.to_string())
            }
            MetadataError::Conflict(ConflictKind::Assignment) => {
                EngineError::Conflict(ASSIGNMENT_CONFLICT.to_string())
            }
            MetadataError::Conflict(ConflictKind::Other(detail)) => {
                EngineError::Conflict(format!("uniqueness conflict: {detail}"))
            }
            MetadataError::NotFound(what) => EngineError::NotFound(what),
            MetadataError::MissingReference(detail) => {
                EngineError::Validation(format!("referenced record does not exist: {detail}"))
            }
            other => EngineError::Metadata(other.to_string()),
        }
    }
}

impl From<CredentialError> for EngineError {
    fn from(value: CredentialError) -> Self {
        match value {
            CredentialError::DuplicateEmail(email) => {
                EngineError::Conflict(format!("an account with email {email} already exists"))
            }
            CredentialError::NotFound => EngineError::NotFound("identity"),
            CredentialError::InvalidCredentials | CredentialError::InvalidToken => {
                EngineError::Unauthenticated
            }
            other => EngineError::CredentialStore(other.to_string()),
        }
    }
}

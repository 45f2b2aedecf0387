//! Service-level error vocabulary shared by both facades.

use crate::model::{RecordId, ValidationError};
use crate::repo::record_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Required field missing/blank or malformed input; caller re-prompts.
    Validation(ValidationError),
    /// Natural key already held by another active row.
    DuplicateKey {
        entity: &'static str,
        natural_key: String,
    },
    /// Id resolves to no active row.
    NotFound {
        entity: &'static str,
        id: RecordId,
    },
    /// Request contradicts current state (e.g. detaching a link the owner
    /// does not hold).
    InvalidState(String),
    /// Underlying store failed.
    Persistence(RepoError),
    /// Detach protocol stopped after the owner was detached: the linked row
    /// is still active and now unreferenced by this owner.
    PartialFailure {
        owner_id: RecordId,
        linked_id: RecordId,
        source: RepoError,
    },
}

impl ServiceError {
    /// True for residue the system knowingly tolerates (orphaned linked
    /// rows); such errors never indicate a dangling reference.
    pub fn is_tolerated(&self) -> bool {
        matches!(self, Self::PartialFailure { .. })
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateKey {
                entity,
                natural_key,
            } => write!(f, "an active {entity} already uses key `{natural_key}`"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidState(details) => write!(f, "invalid state: {details}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::PartialFailure {
                owner_id,
                linked_id,
                source,
            } => write!(
                f,
                "owner {owner_id} was detached but linked row {linked_id} could not be deleted: {source}"
            ),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) | Self::PartialFailure { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }
}

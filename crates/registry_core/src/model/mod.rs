//! Domain model for owners (people, orders) and their shared linked records
//! (addresses, shipments).
//!
//! # Responsibility
//! - Define the canonical records persisted by the repository layer.
//! - Expose identity and soft-delete state through the `Record` capability.
//! - Validate required fields before any write reaches storage.
//!
//! # Invariants
//! - `id == None` means the record has never been persisted.
//! - Ids are assigned by storage and never reused.
//! - `is_active == false` is terminal; inactive rows are tombstones.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod order;
pub mod person;

/// Storage-assigned row identifier.
pub type RecordId = i64;

/// Identity and soft-delete accessors shared by every persisted entity.
pub trait Record {
    /// Entity name used in errors and log events.
    const ENTITY: &'static str;

    fn id(&self) -> Option<RecordId>;
    fn set_id(&mut self, id: RecordId);
    fn is_active(&self) -> bool;

    /// Returns whether storage has already assigned an id.
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}

/// Required-field validation applied before insert/update.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// An owner holding an optional link to a shared record.
///
/// The in-memory link is absent, a persisted reference (`id` set), or a
/// freshly built value waiting to be inserted (`id == None`).
pub trait Owner: Record + Validate {
    type Linked: Record + Validate;

    /// User-supplied key that must be unique among active rows.
    fn natural_key(&self) -> &str;
    fn linked(&self) -> Option<&Self::Linked>;
    fn linked_mut(&mut self) -> Option<&mut Self::Linked>;
    fn set_linked(&mut self, linked: Option<Self::Linked>);

    /// Foreign key that a write of this owner would persist.
    fn linked_id(&self) -> Option<RecordId> {
        self.linked().and_then(Record::id)
    }
}

/// Validation failures for domain records and facade inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is missing or blank after trim.
    BlankField(&'static str),
    /// Numeric field must be strictly positive.
    NonPositive(&'static str),
    /// Identifier supplied by a caller is zero or negative.
    NonPositiveId(RecordId),
    /// Update was requested for a record that has no storage id.
    Unpersisted(&'static str),
    /// Field is present but not in the accepted format.
    InvalidFormat {
        field: &'static str,
        expected: &'static str,
    },
    /// Free-text search filter is blank.
    BlankFilter,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::NonPositive(field) => write!(f, "{field} must be greater than 0"),
            Self::NonPositiveId(id) => write!(f, "id must be greater than 0, got {id}"),
            Self::Unpersisted(entity) => write!(f, "{entity} has no id; insert it first"),
            Self::InvalidFormat { field, expected } => {
                write!(f, "{field} must match {expected}")
            }
            Self::BlankFilter => write!(f, "search filter must not be blank"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

/// Rejects non-positive ids before they reach storage.
pub fn require_positive_id(id: RecordId) -> Result<RecordId, ValidationError> {
    if id <= 0 {
        return Err(ValidationError::NonPositiveId(id));
    }
    Ok(id)
}

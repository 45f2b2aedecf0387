//! Person and Address records.
//!
//! # Invariants
//! - `national_id` is unique among active people.
//! - One address may be shared by several people (e.g. a household).
//! - Deleting a person never deletes the address it references.

use super::{require_text, Owner, Record, RecordId, Validate, ValidationError};
use serde::{Deserialize, Serialize};

/// Postal address shared by zero or more people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Option<RecordId>,
    pub street: String,
    /// Street number kept as text ("5B", "s/n").
    pub number: String,
    pub is_active: bool,
}

impl Address {
    /// Builds an unpersisted address.
    pub fn new(street: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: None,
            street: street.into(),
            number: number.into(),
            is_active: true,
        }
    }
}

impl Record for Address {
    const ENTITY: &'static str = "address";

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Validate for Address {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("street", &self.street)?;
        require_text("number", &self.number)
    }
}

/// Person identified by a national id number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Option<RecordId>,
    pub first_name: String,
    pub last_name: String,
    /// Natural key.
    pub national_id: String,
    /// Loaded eagerly on reads; `is_active == false` here means the
    /// reference is dangling.
    pub address: Option<Address>,
    pub is_active: bool,
}

impl Person {
    /// Builds an unpersisted person without an address.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        national_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            national_id: national_id.into(),
            address: None,
            is_active: true,
        }
    }

    /// Builder-style helper attaching a new or existing address.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Person {
    const ENTITY: &'static str = "person";

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Validate for Person {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("national_id", &self.national_id)
    }
}

impl Owner for Person {
    type Linked = Address;

    fn natural_key(&self) -> &str {
        &self.national_id
    }

    fn linked(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    fn linked_mut(&mut self) -> Option<&mut Address> {
        self.address.as_mut()
    }

    fn set_linked(&mut self, linked: Option<Address>) {
        self.address = linked;
    }
}

#[cfg(test)]
mod tests {
    use super::{Address, Person};
    use crate::model::{Owner, Record, Validate, ValidationError};

    #[test]
    fn new_person_is_unpersisted_and_active() {
        let person = Person::new("Ana", "Diaz", "30111222");
        assert!(!person.is_persisted());
        assert!(person.is_active());
        assert_eq!(person.linked_id(), None);
    }

    #[test]
    fn validation_names_first_blank_field() {
        let person = Person::new("Ana", " ", "30111222");
        assert_eq!(
            person.validate(),
            Err(ValidationError::BlankField("last_name"))
        );

        let address = Address::new("Main St", "");
        assert_eq!(address.validate(), Err(ValidationError::BlankField("number")));
    }

    #[test]
    fn linked_id_reflects_persisted_address_only() {
        let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
        assert_eq!(person.linked_id(), None);

        person.linked_mut().unwrap().set_id(12);
        assert_eq!(person.linked_id(), Some(12));

        person.set_linked(None);
        assert!(person.linked().is_none());
    }
}

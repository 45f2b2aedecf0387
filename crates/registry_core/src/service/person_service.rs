//! Person/address use-case facade.
//!
//! # Responsibility
//! - Reject non-positive caller ids before any coordinator call.
//! - Apply "keep current value" patches to freshly read rows.
//! - Compose coordinator steps into the operations callers invoke.
//!
//! # Invariants
//! - Owner edits never rewrite the address row; address content changes go
//!   through `update_address` or `update_person_address` only.
//! - Writes are read back so callers see what storage holds.

use crate::model::person::{Address, Person};
use crate::model::{require_positive_id, Owner, RecordId, ValidationError};
use crate::repo::record_repo::{OwnerRepository, RecordRepository};
use crate::service::coordinator::{DetachOutcome, SharedEntityCoordinator};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::patch::{AddressPatch, PersonPatch};
use log::info;

/// Facade over the person and address repositories.
pub struct PersonService<P, A> {
    coordinator: SharedEntityCoordinator<Person, P, A>,
}

impl<P, A> PersonService<P, A>
where
    P: OwnerRepository<Person>,
    A: RecordRepository<Address>,
{
    /// Creates a service using the provided repository implementations.
    pub fn new(people: P, addresses: A) -> Self {
        Self {
            coordinator: SharedEntityCoordinator::new(people, addresses),
        }
    }

    pub fn coordinator(&self) -> &SharedEntityCoordinator<Person, P, A> {
        &self.coordinator
    }

    /// Creates a person, inserting or reusing the carried address.
    pub fn create_person(&self, mut person: Person) -> ServiceResult<Person> {
        let person_id = self.coordinator.insert_owner(&mut person)?;
        self.read_back_person(person_id, "created person not found in read-back")
    }

    pub fn get_person(&self, person_id: RecordId) -> ServiceResult<Option<Person>> {
        let person_id = require_positive_id(person_id)?;
        Ok(self.coordinator.owners().get_by_id(person_id)?)
    }

    pub fn list_people(&self) -> ServiceResult<Vec<Person>> {
        Ok(self.coordinator.owners().get_all()?)
    }

    pub fn find_by_national_id(&self, national_id: &str) -> ServiceResult<Option<Person>> {
        if national_id.trim().is_empty() {
            return Err(ValidationError::BlankField("national_id").into());
        }
        Ok(self.coordinator.owners().find_by_natural_key(national_id)?)
    }

    /// Case-insensitive first/last name substring search.
    pub fn search_people(&self, filter: &str) -> ServiceResult<Vec<Person>> {
        if filter.trim().is_empty() {
            return Err(ValidationError::BlankFilter.into());
        }
        Ok(self.coordinator.owners().search(filter)?)
    }

    /// Applies `patch` to the stored person; the address link is untouched.
    pub fn update_person(&self, person_id: RecordId, patch: &PersonPatch) -> ServiceResult<Person> {
        let person_id = require_positive_id(person_id)?;
        let mut person = self.coordinator.require_owner(person_id)?;
        patch.apply_to(&mut person);
        self.coordinator.update_owner(&person)?;
        self.read_back_person(person_id, "updated person not found in read-back")
    }

    /// Soft-deletes a person. The address row it referenced stays active.
    pub fn delete_person(&self, person_id: RecordId) -> ServiceResult<()> {
        let person_id = require_positive_id(person_id)?;
        self.coordinator.owners().soft_delete(person_id)?;
        info!("event=person_delete module=service status=ok person_id={person_id}");
        Ok(())
    }

    /// Points a person at an existing active address.
    pub fn attach_address(
        &self,
        person_id: RecordId,
        address_id: RecordId,
    ) -> ServiceResult<Person> {
        let person_id = require_positive_id(person_id)?;
        let address_id = require_positive_id(address_id)?;

        let mut person = self.coordinator.require_owner(person_id)?;
        let address = self.coordinator.require_active_linked(address_id)?;
        person.set_linked(Some(address));
        self.coordinator.update_owner(&person)?;
        self.read_back_person(person_id, "attached person not found in read-back")
    }

    /// Edits the address the person currently references. Every person
    /// sharing that address observes the change.
    pub fn update_person_address(
        &self,
        person_id: RecordId,
        patch: &AddressPatch,
    ) -> ServiceResult<Address> {
        let person_id = require_positive_id(person_id)?;
        let person = self.coordinator.require_owner(person_id)?;
        let address_id = person.linked_id().ok_or_else(|| {
            ServiceError::InvalidState(format!("person {person_id} has no address"))
        })?;
        self.update_address(address_id, patch)
    }

    /// Clears the person's address, then deletes it once unreferenced.
    pub fn detach_and_delete_address(
        &self,
        person_id: RecordId,
        address_id: RecordId,
    ) -> ServiceResult<DetachOutcome<Person>> {
        let person_id = require_positive_id(person_id)?;
        let address_id = require_positive_id(address_id)?;
        self.coordinator
            .detach_and_delete_linked(person_id, address_id)
    }

    /// Inserts an address no person references yet.
    pub fn create_address(&self, address: Address) -> ServiceResult<Address> {
        let address_id = self.coordinator.linked().insert(&address)?;
        info!("event=address_insert module=service status=ok address_id={address_id}");
        self.coordinator.require_active_linked(address_id)
    }

    pub fn get_address(&self, address_id: RecordId) -> ServiceResult<Option<Address>> {
        let address_id = require_positive_id(address_id)?;
        Ok(self.coordinator.linked().get_by_id(address_id)?)
    }

    /// Loads an active address for reuse by a new or edited person.
    pub fn require_address(&self, address_id: RecordId) -> ServiceResult<Address> {
        let address_id = require_positive_id(address_id)?;
        self.coordinator.require_active_linked(address_id)
    }

    pub fn list_addresses(&self) -> ServiceResult<Vec<Address>> {
        Ok(self.coordinator.linked().get_all()?)
    }

    pub fn update_address(
        &self,
        address_id: RecordId,
        patch: &AddressPatch,
    ) -> ServiceResult<Address> {
        let address_id = require_positive_id(address_id)?;
        let mut address = self.coordinator.require_active_linked(address_id)?;
        patch.apply_to(&mut address);
        self.coordinator.update_linked(&address)?;
        self.coordinator.require_active_linked(address_id)
    }

    /// Deletes an address without checking who references it.
    pub fn delete_address_unsafe(&self, address_id: RecordId) -> ServiceResult<()> {
        let address_id = require_positive_id(address_id)?;
        self.coordinator.delete_linked_unsafe(address_id)
    }

    fn read_back_person(
        &self,
        person_id: RecordId,
        details: &'static str,
    ) -> ServiceResult<Person> {
        self.coordinator
            .owners()
            .get_by_id(person_id)?
            .ok_or_else(|| ServiceError::InvalidState(details.to_string()))
    }
}

use registry_core::db::open_db_in_memory;
use registry_core::{
    Address, Order, Owner, OwnerRepository, Person, RecordId, RecordRepository, RepoError,
    RepoResult, ServiceError, SharedEntityCoordinator, Shipment, SqliteAddressRepository,
    SqliteOrderRepository, SqlitePersonRepository, SqliteShipmentRepository,
};
use rusqlite::Connection;

type PersonCoordinator<'conn> =
    SharedEntityCoordinator<Person, SqlitePersonRepository<'conn>, SqliteAddressRepository<'conn>>;

fn person_coordinator(conn: &Connection) -> PersonCoordinator<'_> {
    SharedEntityCoordinator::new(
        SqlitePersonRepository::try_new(conn).unwrap(),
        SqliteAddressRepository::try_new(conn).unwrap(),
    )
}

/// Inserts A (with a new address) and B sharing it; returns (a, b, address).
fn seed_shared_address(coordinator: &PersonCoordinator<'_>) -> (Person, Person, RecordId) {
    let mut a = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    coordinator.insert_owner(&mut a).unwrap();
    let address = a.address.clone().unwrap();

    let mut b = Person::new("Eva", "Sol", "2").with_address(address.clone());
    coordinator.insert_owner(&mut b).unwrap();

    (a, b, address.id.unwrap())
}

#[test]
fn second_owner_with_same_natural_key_is_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    coordinator
        .insert_owner(&mut Person::new("Ana", "Diaz", "1"))
        .unwrap();
    let err = coordinator
        .insert_owner(&mut Person::new("Eva", "Sol", " 1 "))
        .unwrap_err();

    match err {
        ServiceError::DuplicateKey {
            entity,
            natural_key,
        } => {
            assert_eq!(entity, "person");
            assert_eq!(natural_key, "1");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(coordinator.owners().get_all().unwrap().len(), 1);
}

#[test]
fn duplicate_check_runs_before_link_insert() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    coordinator
        .insert_owner(&mut Person::new("Ana", "Diaz", "1"))
        .unwrap();
    let mut clash = Person::new("Eva", "Sol", "1").with_address(Address::new("Main St", "5"));
    assert!(coordinator.insert_owner(&mut clash).is_err());

    assert!(coordinator.linked().get_all().unwrap().is_empty());
}

#[test]
fn update_with_own_unchanged_key_is_not_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    let mut person = Person::new("Ana", "Diaz", "1");
    coordinator.insert_owner(&mut person).unwrap();
    person.last_name = "Ruiz".to_string();
    coordinator.update_owner(&person).unwrap();

    let stored = coordinator
        .owners()
        .get_by_id(person.id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_name, "Ruiz");
}

#[test]
fn update_to_another_owners_key_is_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    coordinator
        .insert_owner(&mut Person::new("Ana", "Diaz", "1"))
        .unwrap();
    let mut eva = Person::new("Eva", "Sol", "2");
    coordinator.insert_owner(&mut eva).unwrap();
    eva.national_id = "1".to_string();

    assert!(matches!(
        coordinator.update_owner(&eva),
        Err(ServiceError::DuplicateKey { .. })
    ));
}

#[test]
fn insert_with_new_link_roundtrips() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    let person_id = coordinator.insert_owner(&mut person).unwrap();

    let address_id = person.linked_id().unwrap();
    assert_eq!(person.id, Some(person_id));

    let stored = coordinator.owners().get_by_id(person_id).unwrap().unwrap();
    let address = stored.address.unwrap();
    assert_eq!(address.id, Some(address_id));
    assert_eq!(address.street, "Main St");
    assert_eq!(address.number, "5");
    assert!(address.is_active);
}

#[test]
fn insert_with_persisted_link_updates_it_in_place() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);
    let (a, _, address_id) = seed_shared_address(&coordinator);

    let mut edited = coordinator.linked().get_by_id(address_id).unwrap().unwrap();
    edited.number = "9".to_string();
    let mut c = Person::new("Luis", "Perez", "3").with_address(edited);
    coordinator.insert_owner(&mut c).unwrap();

    let a = coordinator.owners().get_by_id(a.id.unwrap()).unwrap().unwrap();
    assert_eq!(a.address.unwrap().number, "9");
    assert_eq!(coordinator.linked().get_all().unwrap().len(), 1);
}

#[test]
fn update_owner_never_rewrites_linked_content() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);
    let (mut a, b, address_id) = seed_shared_address(&coordinator);

    a.address.as_mut().unwrap().street = "Changed".to_string();
    a.first_name = "Anabel".to_string();
    coordinator.update_owner(&a).unwrap();

    let b = coordinator.owners().get_by_id(b.id.unwrap()).unwrap().unwrap();
    assert_eq!(b.address.unwrap().street, "Main St");
    let address = coordinator.linked().get_by_id(address_id).unwrap().unwrap();
    assert_eq!(address.street, "Main St");
}

#[test]
fn update_owner_rejects_unpersisted_or_inactive_new_link() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    let mut person = Person::new("Ana", "Diaz", "1");
    coordinator.insert_owner(&mut person).unwrap();

    person.set_linked(Some(Address::new("Main St", "5")));
    assert!(matches!(
        coordinator.update_owner(&person),
        Err(ServiceError::InvalidState(_))
    ));

    let mut gone = Address::new("Old Rd", "1");
    gone.id = Some(coordinator.linked().insert(&gone).unwrap());
    coordinator.linked().soft_delete(gone.id.unwrap()).unwrap();
    person.set_linked(Some(gone.clone()));
    assert!(matches!(
        coordinator.update_owner(&person),
        Err(ServiceError::NotFound { entity: "address", id }) if Some(id) == gone.id
    ));
}

#[test]
fn update_linked_fans_out_to_every_owner() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);
    let (a, b, address_id) = seed_shared_address(&coordinator);

    let mut address = coordinator.linked().get_by_id(address_id).unwrap().unwrap();
    address.street = "Elm St".to_string();
    coordinator.update_linked(&address).unwrap();

    for owner_id in [a.id.unwrap(), b.id.unwrap()] {
        let owner = coordinator.owners().get_by_id(owner_id).unwrap().unwrap();
        assert_eq!(owner.address.unwrap().street, "Elm St");
    }
}

#[test]
fn unsafe_delete_leaves_dangling_reference() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);
    let (a, _, address_id) = seed_shared_address(&coordinator);

    coordinator.delete_linked_unsafe(address_id).unwrap();

    let a = coordinator.owners().get_by_id(a.id.unwrap()).unwrap().unwrap();
    let address = a.address.unwrap();
    assert_eq!(address.id, Some(address_id));
    assert!(!address.is_active);
    assert!(coordinator.linked().get_by_id(address_id).unwrap().is_none());
}

#[test]
fn detach_deletes_unshared_linked_row() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    let person_id = coordinator.insert_owner(&mut person).unwrap();
    let address_id = person.linked_id().unwrap();

    let outcome = coordinator
        .detach_and_delete_linked(person_id, address_id)
        .unwrap();
    assert!(outcome.linked_deleted);
    assert_eq!(outcome.remaining_referrers, 0);
    assert!(outcome.owner.address.is_none());

    let stored = coordinator.owners().get_by_id(person_id).unwrap().unwrap();
    assert!(stored.address.is_none());
    assert!(coordinator.linked().get_by_id(address_id).unwrap().is_none());
}

#[test]
fn detach_keeps_linked_row_shared_with_other_owner() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);
    let (a, b, address_id) = seed_shared_address(&coordinator);
    let a_id = a.id.unwrap();

    let outcome = coordinator.detach_and_delete_linked(a_id, address_id).unwrap();
    assert!(!outcome.linked_deleted);
    assert_eq!(outcome.remaining_referrers, 1);

    let a = coordinator.owners().get_by_id(a_id).unwrap().unwrap();
    assert!(a.address.is_none());
    let b = coordinator.owners().get_by_id(b.id.unwrap()).unwrap().unwrap();
    assert!(b.address.unwrap().is_active);
    assert!(coordinator.linked().get_by_id(address_id).unwrap().is_some());

    assert!(matches!(
        coordinator.detach_and_delete_linked(a_id, address_id),
        Err(ServiceError::InvalidState(_))
    ));
}

#[test]
fn detach_with_mismatched_link_is_invalid_state() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    let mut a = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    coordinator.insert_owner(&mut a).unwrap();
    let mut b = Person::new("Eva", "Sol", "2").with_address(Address::new("Elm St", "8"));
    coordinator.insert_owner(&mut b).unwrap();

    let result = coordinator.detach_and_delete_linked(a.id.unwrap(), b.linked_id().unwrap());
    assert!(matches!(result, Err(ServiceError::InvalidState(_))));

    let a = coordinator.owners().get_by_id(a.id.unwrap()).unwrap().unwrap();
    assert!(a.address.is_some());
    assert!(coordinator
        .linked()
        .get_by_id(b.linked_id().unwrap())
        .unwrap()
        .is_some());
}

#[test]
fn detach_for_missing_owner_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    assert!(matches!(
        coordinator.detach_and_delete_linked(77, 1),
        Err(ServiceError::NotFound {
            entity: "person",
            id: 77
        })
    ));
}

/// Linked repository whose soft-delete always fails.
struct FailingSoftDelete<R>(R);

impl<R: RecordRepository<Address>> RecordRepository<Address> for FailingSoftDelete<R> {
    fn insert(&self, record: &Address) -> RepoResult<RecordId> {
        self.0.insert(record)
    }

    fn update(&self, record: &Address) -> RepoResult<()> {
        self.0.update(record)
    }

    fn soft_delete(&self, _id: RecordId) -> RepoResult<()> {
        Err(RepoError::InvalidData("injected soft-delete failure".to_string()))
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Address>> {
        self.0.get_by_id(id)
    }

    fn get_all(&self) -> RepoResult<Vec<Address>> {
        self.0.get_all()
    }
}

#[test]
fn failed_linked_delete_after_detach_is_tolerated_partial_failure() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = SharedEntityCoordinator::new(
        SqlitePersonRepository::try_new(&conn).unwrap(),
        FailingSoftDelete(SqliteAddressRepository::try_new(&conn).unwrap()),
    );

    let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    let person_id = coordinator.insert_owner(&mut person).unwrap();
    let address_id = person.linked_id().unwrap();

    let err = coordinator
        .detach_and_delete_linked(person_id, address_id)
        .unwrap_err();
    assert!(err.is_tolerated());
    assert!(matches!(
        err,
        ServiceError::PartialFailure { owner_id, linked_id, .. }
            if owner_id == person_id && linked_id == address_id
    ));

    let stored = coordinator.owners().get_by_id(person_id).unwrap().unwrap();
    assert!(stored.address.is_none());
    assert!(coordinator.linked().get_by_id(address_id).unwrap().is_some());
}

/// Owner repository whose insert always fails.
struct FailingOwnerInsert<R>(R);

impl<R: RecordRepository<Person>> RecordRepository<Person> for FailingOwnerInsert<R> {
    fn insert(&self, _record: &Person) -> RepoResult<RecordId> {
        Err(RepoError::InvalidData("injected insert failure".to_string()))
    }

    fn update(&self, record: &Person) -> RepoResult<()> {
        self.0.update(record)
    }

    fn soft_delete(&self, id: RecordId) -> RepoResult<()> {
        self.0.soft_delete(id)
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Person>> {
        self.0.get_by_id(id)
    }

    fn get_all(&self) -> RepoResult<Vec<Person>> {
        self.0.get_all()
    }
}

impl<R: OwnerRepository<Person>> OwnerRepository<Person> for FailingOwnerInsert<R> {
    fn find_by_natural_key(&self, natural_key: &str) -> RepoResult<Option<Person>> {
        self.0.find_by_natural_key(natural_key)
    }

    fn search(&self, filter: &str) -> RepoResult<Vec<Person>> {
        self.0.search(filter)
    }

    fn find_by_linked_id(&self, linked_id: RecordId) -> RepoResult<Vec<Person>> {
        self.0.find_by_linked_id(linked_id)
    }
}

#[test]
fn failed_owner_insert_leaves_orphaned_link_only() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = SharedEntityCoordinator::new(
        FailingOwnerInsert(SqlitePersonRepository::try_new(&conn).unwrap()),
        SqliteAddressRepository::try_new(&conn).unwrap(),
    );

    let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    let err = coordinator.insert_owner(&mut person).unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(RepoError::InvalidData(_))));
    assert!(person.id.is_none());

    let orphans = coordinator.linked().get_all().unwrap();
    assert_eq!(orphans.len(), 1);
    assert!(orphans[0].is_active);
    assert!(coordinator.owners().get_all().unwrap().is_empty());
}

#[test]
fn order_pair_follows_same_protocol() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = SharedEntityCoordinator::new(
        SqliteOrderRepository::try_new(&conn).unwrap(),
        SqliteShipmentRepository::try_new(&conn).unwrap(),
    );

    let mut first =
        Order::new("A-1", "Oak chairs", 2, 30.0).with_shipment(Shipment::new("Lima", "2026-10-14"));
    coordinator.insert_owner(&mut first).unwrap();
    let shipment = first.shipment.clone().unwrap();
    let mut second = Order::new("A-2", "Pine table", 1, 90.0).with_shipment(shipment.clone());
    coordinator.insert_owner(&mut second).unwrap();

    assert!(matches!(
        coordinator.insert_owner(&mut Order::new("A-1", "Again", 1, 1.0)),
        Err(ServiceError::DuplicateKey { entity: "order", .. })
    ));

    let shipment_id = shipment.id.unwrap();
    let outcome = coordinator
        .detach_and_delete_linked(first.id.unwrap(), shipment_id)
        .unwrap();
    assert!(!outcome.linked_deleted);

    let outcome = coordinator
        .detach_and_delete_linked(second.id.unwrap(), shipment_id)
        .unwrap();
    assert!(outcome.linked_deleted);
    assert!(coordinator.linked().get_by_id(shipment_id).unwrap().is_none());
}

#[test]
fn detach_of_dangling_link_completes_without_partial_failure() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = person_coordinator(&conn);

    let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    let person_id = coordinator.insert_owner(&mut person).unwrap();
    let address_id = person.linked_id().unwrap();
    coordinator.delete_linked_unsafe(address_id).unwrap();

    let outcome = coordinator
        .detach_and_delete_linked(person_id, address_id)
        .unwrap();
    assert!(outcome.linked_deleted);
    assert_eq!(outcome.remaining_referrers, 0);

    let stored = coordinator.owners().get_by_id(person_id).unwrap().unwrap();
    assert!(stored.address.is_none());
    assert!(coordinator.linked().get_by_id(address_id).unwrap().is_none());
}

/// Owner repository whose update always fails.
struct FailingOwnerUpdate<R>(R);

impl<R: RecordRepository<Person>> RecordRepository<Person> for FailingOwnerUpdate<R> {
    fn insert(&self, record: &Person) -> RepoResult<RecordId> {
        self.0.insert(record)
    }

    fn update(&self, _record: &Person) -> RepoResult<()> {
        Err(RepoError::InvalidData("injected update failure".to_string()))
    }

    fn soft_delete(&self, id: RecordId) -> RepoResult<()> {
        self.0.soft_delete(id)
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Person>> {
        self.0.get_by_id(id)
    }

    fn get_all(&self) -> RepoResult<Vec<Person>> {
        self.0.get_all()
    }
}

impl<R: OwnerRepository<Person>> OwnerRepository<Person> for FailingOwnerUpdate<R> {
    fn find_by_natural_key(&self, natural_key: &str) -> RepoResult<Option<Person>> {
        self.0.find_by_natural_key(natural_key)
    }

    fn search(&self, filter: &str) -> RepoResult<Vec<Person>> {
        self.0.search(filter)
    }

    fn find_by_linked_id(&self, linked_id: RecordId) -> RepoResult<Vec<Person>> {
        self.0.find_by_linked_id(linked_id)
    }
}

#[test]
fn failed_owner_detach_write_never_deletes_linked_row() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = SharedEntityCoordinator::new(
        FailingOwnerUpdate(SqlitePersonRepository::try_new(&conn).unwrap()),
        SqliteAddressRepository::try_new(&conn).unwrap(),
    );

    let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main St", "5"));
    let person_id = coordinator.insert_owner(&mut person).unwrap();
    let address_id = person.linked_id().unwrap();

    let err = coordinator
        .detach_and_delete_linked(person_id, address_id)
        .unwrap_err();
    assert!(!err.is_tolerated());
    assert!(matches!(err, ServiceError::Persistence(RepoError::InvalidData(_))));

    let address = coordinator.linked().get_by_id(address_id).unwrap().unwrap();
    assert!(address.is_active);
    let stored = coordinator.owners().get_by_id(person_id).unwrap().unwrap();
    assert_eq!(stored.linked_id(), Some(address_id));
}

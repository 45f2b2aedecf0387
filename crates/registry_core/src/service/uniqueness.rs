//! Natural-key uniqueness check run before owner writes.
//!
//! This is advisory: nothing locks the key between the check and the write.
//! The partial unique indexes in storage stay the authoritative guard.

use crate::model::{Owner, RecordId};
use crate::repo::record_repo::OwnerRepository;
use crate::service::error::{ServiceError, ServiceResult};

/// Fails with `DuplicateKey` when another active row already holds
/// `natural_key`.
///
/// `exclude_id` is the caller's own id on update, so a row may keep its
/// unchanged key.
pub fn assert_unique<O, R>(
    repo: &R,
    natural_key: &str,
    exclude_id: Option<RecordId>,
) -> ServiceResult<()>
where
    O: Owner,
    R: OwnerRepository<O>,
{
    match repo.find_by_natural_key(natural_key)? {
        Some(existing) if exclude_id.is_none() || existing.id() != exclude_id => {
            Err(ServiceError::DuplicateKey {
                entity: O::ENTITY,
                natural_key: natural_key.trim().to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::assert_unique;
    use crate::db::open_db_in_memory;
    use crate::model::person::Person;
    use crate::repo::person_repo::SqlitePersonRepository;
    use crate::repo::record_repo::RecordRepository;
    use crate::service::error::ServiceError;

    #[test]
    fn own_id_is_excluded_but_others_collide() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePersonRepository::try_new(&conn).unwrap();
        let id = repo.insert(&Person::new("Ana", "Diaz", "100")).unwrap();

        assert!(assert_unique(&repo, "100", Some(id)).is_ok());
        assert!(assert_unique(&repo, "200", None).is_ok());

        let err = assert_unique(&repo, "100", None).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::DuplicateKey { entity: "person", ref natural_key } if natural_key == "100"
        ));
        assert!(matches!(
            assert_unique(&repo, "100", Some(id + 1)),
            Err(ServiceError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn soft_deleted_rows_release_their_key() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePersonRepository::try_new(&conn).unwrap();
        let id = repo.insert(&Person::new("Ana", "Diaz", "100")).unwrap();
        repo.soft_delete(id).unwrap();

        assert!(assert_unique(&repo, "100", None).is_ok());
    }
}

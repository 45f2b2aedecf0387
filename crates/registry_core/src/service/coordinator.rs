//! Coordinates writes across an owner table and the linked table it
//! references.
//!
//! # Responsibility
//! - Insert-or-reuse the linked record before persisting its owner.
//! - Keep owner edits from rewriting shared linked rows.
//! - Run the detach-then-delete protocol for shared linked rows.
//!
//! # Invariants
//! - No transaction spans a multi-step sequence; each repository call is
//!   atomic on its own. Sequences are ordered so the worst intermediate
//!   state is an orphaned (active, unreferenced) linked row, never a
//!   dangling reference.
//! - A failed sequence is retried from the start with fresh reads, never
//!   resumed from the middle.

use crate::model::{Owner, Record, RecordId, Validate, ValidationError};
use crate::repo::record_repo::{OwnerRepository, RecordRepository, RepoError};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::uniqueness::assert_unique;
use log::{info, warn};
use std::marker::PhantomData;

/// Result of a completed detach-then-delete run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachOutcome<O> {
    /// Owner as persisted, with its link cleared.
    pub owner: O,
    /// False when other active owners still reference the linked row.
    pub linked_deleted: bool,
    pub remaining_referrers: usize,
}

/// Owner/linked write coordinator, generic over one entity pair.
pub struct SharedEntityCoordinator<O, OR, LR> {
    owners: OR,
    linked: LR,
    _owner: PhantomData<fn() -> O>,
}

impl<O, OR, LR> SharedEntityCoordinator<O, OR, LR>
where
    O: Owner,
    OR: OwnerRepository<O>,
    LR: RecordRepository<O::Linked>,
{
    pub fn new(owners: OR, linked: LR) -> Self {
        Self {
            owners,
            linked,
            _owner: PhantomData,
        }
    }

    pub fn owners(&self) -> &OR {
        &self.owners
    }

    pub fn linked(&self) -> &LR {
        &self.linked
    }

    /// Persists a new owner, inserting or updating its linked record first.
    ///
    /// On success `owner` and its link carry their assigned ids.
    ///
    /// # Contract
    /// - Validation and the uniqueness check run before any write.
    /// - An unpersisted link is inserted; a persisted link is updated in
    ///   place, which rewrites that row for every owner sharing it.
    /// - If the owner write fails after a fresh link insert, the link row is
    ///   left orphaned and the owner error is returned.
    pub fn insert_owner(&self, owner: &mut O) -> ServiceResult<RecordId> {
        owner.validate()?;
        if let Some(linked) = owner.linked() {
            linked.validate()?;
        }
        assert_unique(&self.owners, owner.natural_key(), None)?;

        let mut inserted_link = None;
        if let Some(linked) = owner.linked_mut() {
            match linked.id() {
                None => {
                    let linked_id = self.linked.insert(linked)?;
                    linked.set_id(linked_id);
                    inserted_link = Some(linked_id);
                }
                Some(_) => self.linked.update(linked)?,
            }
        }

        let owner_id = match self.owners.insert(owner) {
            Ok(owner_id) => owner_id,
            Err(err) => {
                if let Some(linked_id) = inserted_link {
                    warn!(
                        "event=owner_insert module=coordinator status=warn entity={} linked_entity={} linked_id={linked_id} residue=orphaned_linked error={err}",
                        O::ENTITY,
                        <O::Linked as Record>::ENTITY
                    );
                }
                return Err(owner_write_error(err, owner.natural_key()));
            }
        };
        owner.set_id(owner_id);

        info!(
            "event=owner_insert module=coordinator status=ok entity={} id={owner_id} linked_id={:?}",
            O::ENTITY,
            owner.linked_id()
        );
        Ok(owner_id)
    }

    /// Persists owner scalar fields and its foreign key as given.
    ///
    /// Never writes the linked record's own content. A link that differs
    /// from the stored one must reference an active linked row.
    pub fn update_owner(&self, owner: &O) -> ServiceResult<()> {
        owner.validate()?;
        let owner_id = owner
            .id()
            .ok_or(ValidationError::Unpersisted(O::ENTITY))?;
        assert_unique(&self.owners, owner.natural_key(), Some(owner_id))?;

        if owner.linked().is_some() && owner.linked_id().is_none() {
            return Err(ServiceError::InvalidState(format!(
                "{} {owner_id} carries an unpersisted {}; insert it first",
                O::ENTITY,
                <O::Linked as Record>::ENTITY
            )));
        }

        let stored = self
            .owners
            .get_by_id(owner_id)?
            .ok_or(ServiceError::NotFound {
                entity: O::ENTITY,
                id: owner_id,
            })?;
        if let Some(linked_id) = owner.linked_id() {
            if stored.linked_id() != Some(linked_id) {
                self.require_active_linked(linked_id)?;
            }
        }

        self.owners
            .update(owner)
            .map_err(|err| owner_write_error(err, owner.natural_key()))?;

        info!(
            "event=owner_update module=coordinator status=ok entity={} id={owner_id} linked_id={:?}",
            O::ENTITY,
            owner.linked_id()
        );
        Ok(())
    }

    /// Rewrites a linked row by id; every owner referencing it sees the
    /// change on its next read.
    pub fn update_linked(&self, linked: &O::Linked) -> ServiceResult<()> {
        linked.validate()?;
        let linked_id = linked
            .id()
            .ok_or(ValidationError::Unpersisted(<O::Linked as Record>::ENTITY))?;
        self.linked.update(linked)?;

        info!(
            "event=linked_update module=coordinator status=ok entity={} id={linked_id}",
            <O::Linked as Record>::ENTITY
        );
        Ok(())
    }

    /// Soft-deletes a linked row without checking for active referrers.
    ///
    /// Owners still pointing at `linked_id` are left with a dangling
    /// reference; prefer `detach_and_delete_linked`.
    pub fn delete_linked_unsafe(&self, linked_id: RecordId) -> ServiceResult<()> {
        self.linked.soft_delete(linked_id)?;

        warn!(
            "event=linked_delete module=coordinator status=ok mode=unchecked entity={} id={linked_id}",
            <O::Linked as Record>::ENTITY
        );
        Ok(())
    }

    /// Clears the owner's link, then soft-deletes the linked row once no
    /// other active owner references it.
    ///
    /// # Contract
    /// - `NotFound` when the owner is absent or inactive.
    /// - `InvalidState` when the owner holds no link or a different one.
    /// - The owner's foreign key is cleared before anything else is written.
    /// - A linked row still shared by other active owners stays active, so
    ///   they never end up with a dangling reference.
    /// - A linked row that is already inactive (dangling link) counts as
    ///   deleted.
    /// - Any failure after the owner write is surfaced as `PartialFailure`
    ///   and not rolled back: the owner stays detached and the linked row
    ///   stays active.
    pub fn detach_and_delete_linked(
        &self,
        owner_id: RecordId,
        linked_id: RecordId,
    ) -> ServiceResult<DetachOutcome<O>> {
        let mut owner = self.require_owner(owner_id)?;

        match owner.linked_id() {
            None => {
                return Err(ServiceError::InvalidState(format!(
                    "{} {owner_id} has no {}",
                    O::ENTITY,
                    <O::Linked as Record>::ENTITY
                )))
            }
            Some(current) if current != linked_id => {
                return Err(ServiceError::InvalidState(format!(
                    "{} {linked_id} does not belong to {} {owner_id}",
                    <O::Linked as Record>::ENTITY,
                    O::ENTITY
                )))
            }
            Some(_) => {}
        }

        owner.set_linked(None);
        self.owners
            .update(&owner)
            .map_err(|err| owner_write_error(err, owner.natural_key()))?;

        let partial = |source: RepoError| {
            warn!(
                "event=linked_detach_delete module=coordinator status=warn entity={} owner_id={owner_id} linked_id={linked_id} residue=orphaned_linked error={source}",
                O::ENTITY
            );
            ServiceError::PartialFailure {
                owner_id,
                linked_id,
                source,
            }
        };

        let remaining_referrers = self
            .owners
            .find_by_linked_id(linked_id)
            .map_err(partial)?
            .len();
        if remaining_referrers > 0 {
            info!(
                "event=linked_detach_delete module=coordinator status=ok entity={} owner_id={owner_id} linked_id={linked_id} linked_deleted=false remaining_referrers={remaining_referrers}",
                O::ENTITY
            );
            return Ok(DetachOutcome {
                owner,
                linked_deleted: false,
                remaining_referrers,
            });
        }

        // A dangling link means the row is already inactive; step 5 is done.
        let already_inactive = self.linked.get_by_id(linked_id).map_err(partial)?.is_none();
        if !already_inactive {
            match self.linked.soft_delete(linked_id) {
                Ok(()) | Err(RepoError::NotFound { .. }) => {}
                Err(err) => return Err(partial(err)),
            }
        }

        info!(
            "event=linked_detach_delete module=coordinator status=ok entity={} owner_id={owner_id} linked_id={linked_id} linked_deleted=true already_inactive={already_inactive}",
            O::ENTITY
        );
        Ok(DetachOutcome {
            owner,
            linked_deleted: true,
            remaining_referrers: 0,
        })
    }

    /// Loads an active linked row or fails `NotFound`.
    pub fn require_active_linked(&self, linked_id: RecordId) -> ServiceResult<O::Linked> {
        self.linked
            .get_by_id(linked_id)?
            .ok_or(ServiceError::NotFound {
                entity: <O::Linked as Record>::ENTITY,
                id: linked_id,
            })
    }

    /// Loads an active owner or fails `NotFound`.
    pub fn require_owner(&self, owner_id: RecordId) -> ServiceResult<O> {
        self.owners
            .get_by_id(owner_id)?
            .ok_or(ServiceError::NotFound {
                entity: O::ENTITY,
                id: owner_id,
            })
    }
}

/// Storage unique-index violations on owner writes are duplicate keys that
/// slipped past the advisory check.
fn owner_write_error(err: RepoError, natural_key: &str) -> ServiceError {
    match err {
        RepoError::UniqueViolation { entity, .. } => ServiceError::DuplicateKey {
            entity,
            natural_key: natural_key.trim().to_string(),
        },
        other => other.into(),
    }
}

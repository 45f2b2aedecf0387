//! Persistence adapters, one per entity table.
//!
//! # Responsibility
//! - Implement the single-row CRUD contract over SQLite.
//! - Keep SQL inside this layer; services only see records and ids.
//!
//! # Invariants
//! - Repositories borrow one migrated connection; several repositories may
//!   share it.
//! - Inactive rows are invisible to every lookup.

pub mod address_repo;
pub mod order_repo;
pub mod person_repo;
pub mod record_repo;
pub mod shipment_repo;

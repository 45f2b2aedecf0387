//! Core of the people/orders registry.
//! Owns the data model, SQLite persistence and the write-coordination rules
//! that keep shared linked rows consistent under soft deletes.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::order::{Order, OrderStatus, Shipment};
pub use model::person::{Address, Person};
pub use model::{Owner, Record, RecordId, Validate, ValidationError};
pub use repo::address_repo::SqliteAddressRepository;
pub use repo::order_repo::SqliteOrderRepository;
pub use repo::person_repo::SqlitePersonRepository;
pub use repo::record_repo::{OwnerRepository, RecordRepository, RepoError, RepoResult};
pub use repo::shipment_repo::SqliteShipmentRepository;
pub use service::coordinator::{DetachOutcome, SharedEntityCoordinator};
pub use service::error::{ServiceError, ServiceResult};
pub use service::order_service::OrderService;
pub use service::patch::{AddressPatch, OrderPatch, PersonPatch, ShipmentPatch};
pub use service::person_service::PersonService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

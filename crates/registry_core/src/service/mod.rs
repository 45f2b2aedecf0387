//! Use-case services over the persistence adapters.
//!
//! # Responsibility
//! - Enforce natural-key uniqueness ahead of owner writes.
//! - Order multi-step owner/linked writes so no step introduces a dangling
//!   reference.
//! - Expose one facade per entity pair to callers.

pub mod coordinator;
pub mod error;
pub mod order_service;
pub mod patch;
pub mod person_service;
pub mod uniqueness;

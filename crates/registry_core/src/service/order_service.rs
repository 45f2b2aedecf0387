//! Order/shipment use-case facade.
//!
//! Mirrors `person_service` for the order pair. Orders are keyed by
//! `order_number`; shipments may be shared by several orders.

use crate::model::order::{Order, Shipment};
use crate::model::{require_positive_id, Owner, RecordId, ValidationError};
use crate::repo::record_repo::{OwnerRepository, RecordRepository};
use crate::service::coordinator::{DetachOutcome, SharedEntityCoordinator};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::patch::{OrderPatch, ShipmentPatch};
use log::info;

/// Facade over the order and shipment repositories.
pub struct OrderService<O, S> {
    coordinator: SharedEntityCoordinator<Order, O, S>,
}

impl<O, S> OrderService<O, S>
where
    O: OwnerRepository<Order>,
    S: RecordRepository<Shipment>,
{
    pub fn new(orders: O, shipments: S) -> Self {
        Self {
            coordinator: SharedEntityCoordinator::new(orders, shipments),
        }
    }

    pub fn coordinator(&self) -> &SharedEntityCoordinator<Order, O, S> {
        &self.coordinator
    }

    pub fn create_order(&self, mut order: Order) -> ServiceResult<Order> {
        let order_id = self.coordinator.insert_owner(&mut order)?;
        self.read_back_order(order_id, "created order not found in read-back")
    }

    pub fn get_order(&self, order_id: RecordId) -> ServiceResult<Option<Order>> {
        let order_id = require_positive_id(order_id)?;
        Ok(self.coordinator.owners().get_by_id(order_id)?)
    }

    pub fn list_orders(&self) -> ServiceResult<Vec<Order>> {
        Ok(self.coordinator.owners().get_all()?)
    }

    pub fn find_by_order_number(&self, order_number: &str) -> ServiceResult<Option<Order>> {
        if order_number.trim().is_empty() {
            return Err(ValidationError::BlankField("order_number").into());
        }
        Ok(self.coordinator.owners().find_by_natural_key(order_number)?)
    }

    /// Exact order number or description substring.
    pub fn search_orders(&self, filter: &str) -> ServiceResult<Vec<Order>> {
        if filter.trim().is_empty() {
            return Err(ValidationError::BlankFilter.into());
        }
        Ok(self.coordinator.owners().search(filter)?)
    }

    pub fn update_order(&self, order_id: RecordId, patch: &OrderPatch) -> ServiceResult<Order> {
        let order_id = require_positive_id(order_id)?;
        let mut order = self.coordinator.require_owner(order_id)?;
        patch.apply_to(&mut order);
        self.coordinator.update_owner(&order)?;
        self.read_back_order(order_id, "updated order not found in read-back")
    }

    pub fn delete_order(&self, order_id: RecordId) -> ServiceResult<()> {
        let order_id = require_positive_id(order_id)?;
        self.coordinator.owners().soft_delete(order_id)?;
        info!("event=order_delete module=service status=ok order_id={order_id}");
        Ok(())
    }

    pub fn attach_shipment(
        &self,
        order_id: RecordId,
        shipment_id: RecordId,
    ) -> ServiceResult<Order> {
        let order_id = require_positive_id(order_id)?;
        let shipment_id = require_positive_id(shipment_id)?;

        let mut order = self.coordinator.require_owner(order_id)?;
        let shipment = self.coordinator.require_active_linked(shipment_id)?;
        order.set_linked(Some(shipment));
        self.coordinator.update_owner(&order)?;
        self.read_back_order(order_id, "attached order not found in read-back")
    }

    /// Edits the order's current shipment; fan-out applies.
    pub fn update_order_shipment(
        &self,
        order_id: RecordId,
        patch: &ShipmentPatch,
    ) -> ServiceResult<Shipment> {
        let order_id = require_positive_id(order_id)?;
        let order = self.coordinator.require_owner(order_id)?;
        let shipment_id = order.linked_id().ok_or_else(|| {
            ServiceError::InvalidState(format!("order {order_id} has no shipment"))
        })?;
        self.update_shipment(shipment_id, patch)
    }

    pub fn detach_and_delete_shipment(
        &self,
        order_id: RecordId,
        shipment_id: RecordId,
    ) -> ServiceResult<DetachOutcome<Order>> {
        let order_id = require_positive_id(order_id)?;
        let shipment_id = require_positive_id(shipment_id)?;
        self.coordinator
            .detach_and_delete_linked(order_id, shipment_id)
    }

    pub fn create_shipment(&self, shipment: Shipment) -> ServiceResult<Shipment> {
        let shipment_id = self.coordinator.linked().insert(&shipment)?;
        info!("event=shipment_insert module=service status=ok shipment_id={shipment_id}");
        self.coordinator.require_active_linked(shipment_id)
    }

    pub fn get_shipment(&self, shipment_id: RecordId) -> ServiceResult<Option<Shipment>> {
        let shipment_id = require_positive_id(shipment_id)?;
        Ok(self.coordinator.linked().get_by_id(shipment_id)?)
    }

    /// Loads an active shipment for reuse by a new or edited order.
    pub fn require_shipment(&self, shipment_id: RecordId) -> ServiceResult<Shipment> {
        let shipment_id = require_positive_id(shipment_id)?;
        self.coordinator.require_active_linked(shipment_id)
    }

    pub fn list_shipments(&self) -> ServiceResult<Vec<Shipment>> {
        Ok(self.coordinator.linked().get_all()?)
    }

    pub fn update_shipment(
        &self,
        shipment_id: RecordId,
        patch: &ShipmentPatch,
    ) -> ServiceResult<Shipment> {
        let shipment_id = require_positive_id(shipment_id)?;
        let mut shipment = self.coordinator.require_active_linked(shipment_id)?;
        patch.apply_to(&mut shipment);
        self.coordinator.update_linked(&shipment)?;
        self.coordinator.require_active_linked(shipment_id)
    }

    pub fn delete_shipment_unsafe(&self, shipment_id: RecordId) -> ServiceResult<()> {
        let shipment_id = require_positive_id(shipment_id)?;
        self.coordinator.delete_linked_unsafe(shipment_id)
    }

    fn read_back_order(&self, order_id: RecordId, details: &'static str) -> ServiceResult<Order> {
        self.coordinator
            .owners()
            .get_by_id(order_id)?
            .ok_or_else(|| ServiceError::InvalidState(details.to_string()))
    }
}

//! Order and Shipment records.
//!
//! # Invariants
//! - `order_number` is unique among active orders.
//! - `quantity` and `unit_price` are strictly positive.
//! - `ship_date` is an ISO calendar date (`YYYY-MM-DD`).

use super::{require_text, Owner, Record, RecordId, Validate, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid date regex"));

/// Order lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Strict parser for stored and user-supplied values.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipment that one or more orders may travel on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Option<RecordId>,
    pub destination: String,
    pub ship_date: String,
    pub carrier: Option<String>,
    pub is_active: bool,
}

impl Shipment {
    pub fn new(destination: impl Into<String>, ship_date: impl Into<String>) -> Self {
        Self {
            id: None,
            destination: destination.into(),
            ship_date: ship_date.into(),
            carrier: None,
            is_active: true,
        }
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }
}

impl Record for Shipment {
    const ENTITY: &'static str = "shipment";

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

impl Validate for Shipment {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("destination", &self.destination)?;
        require_text("ship_date", &self.ship_date)?;
        if !ISO_DATE_RE.is_match(self.ship_date.trim()) {
            return Err(ValidationError::InvalidFormat {
                field: "ship_date",
                expected: "YYYY-MM-DD",
            });
        }
        Ok(())
    }
}

/// Customer order with an optional shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<RecordId>,
    /// Natural key.
    pub order_number: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub status: OrderStatus,
    pub shipment: Option<Shipment>,
    pub is_active: bool,
}

impl Order {
    pub fn new(
        order_number: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        unit_price: f64,
    ) -> Self {
        Self {
            id: None,
            order_number: order_number.into(),
            description: description.into(),
            quantity,
            unit_price,
            status: OrderStatus::default(),
            shipment: None,
            is_active: true,
        }
    }

    pub fn with_shipment(mut self, shipment: Shipment) -> Self {
        self.shipment = Some(shipment);
        self
    }

    pub fn total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

impl Record for Order {
    const ENTITY: &'static str = "order";

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

impl Validate for Order {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("order_number", &self.order_number)?;
        require_text("description", &self.description)?;
        if self.quantity <= 0 {
            return Err(ValidationError::NonPositive("quantity"));
        }
        if !self.unit_price.is_finite() || self.unit_price <= 0.0 {
            return Err(ValidationError::NonPositive("unit_price"));
        }
        Ok(())
    }
}

impl Owner for Order {
    type Linked = Shipment;

    fn natural_key(&self) -> &str {
        &self.order_number
    }

    fn linked(&self) -> Option<&Shipment> {
        self.shipment.as_ref()
    }

    fn linked_mut(&mut self) -> Option<&mut Shipment> {
        self.shipment.as_mut()
    }

    fn set_linked(&mut self, linked: Option<Shipment>) {
        self.shipment = linked;
    }
}

#[cfg(test)]
mod tests {
    use super::{Order, OrderStatus, Shipment};
    use crate::model::{Validate, ValidationError};

    #[test]
    fn status_parse_is_case_insensitive_and_strict() {
        assert_eq!(OrderStatus::parse(" Shipped "), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::parse("lost"), None);
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn order_rejects_non_positive_amounts() {
        let order = Order::new("A-1", "chairs", 0, 10.0);
        assert_eq!(order.validate(), Err(ValidationError::NonPositive("quantity")));

        let order = Order::new("A-1", "chairs", 2, f64::NAN);
        assert_eq!(
            order.validate(),
            Err(ValidationError::NonPositive("unit_price"))
        );

        let order = Order::new("A-1", "chairs", 2, 12.5);
        assert!(order.validate().is_ok());
        assert!((order.total() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shipment_requires_iso_ship_date() {
        let shipment = Shipment::new("Warehouse 3", "14/10/2026");
        assert!(matches!(
            shipment.validate(),
            Err(ValidationError::InvalidFormat {
                field: "ship_date",
                ..
            })
        ));

        let shipment = Shipment::new("Warehouse 3", "2026-10-14").with_carrier("Andreani");
        assert!(shipment.validate().is_ok());
    }

    #[test]
    fn order_serializes_status_as_snake_case() {
        let order = Order::new("A-1", "chairs", 1, 1.0);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json["shipment"].is_null());
    }
}

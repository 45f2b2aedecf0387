//! Partial-update inputs for facade edit operations.
//!
//! A `None` field, or text that is blank after trim, keeps the stored value.
//! Patches are applied by the facades to a freshly read row and never reach
//! the coordinator themselves.

use crate::model::order::{Order, OrderStatus, Shipment};
use crate::model::person::{Address, Person};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub national_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPatch {
    pub street: Option<String>,
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub order_number: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPatch {
    pub destination: Option<String>,
    pub ship_date: Option<String>,
    pub carrier: Option<String>,
}

/// Returns the trimmed replacement, or `None` when the input means "keep".
pub fn replacement(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn replace_text(target: &mut String, value: Option<&String>) {
    if let Some(value) = replacement(value.map(String::as_str)) {
        *target = value;
    }
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        [&self.first_name, &self.last_name, &self.national_id]
            .iter()
            .all(|value| replacement(value.as_deref()).is_none())
    }

    /// Applies scalar fields only; the address link is untouched.
    pub fn apply_to(&self, person: &mut Person) {
        replace_text(&mut person.first_name, self.first_name.as_ref());
        replace_text(&mut person.last_name, self.last_name.as_ref());
        replace_text(&mut person.national_id, self.national_id.as_ref());
    }
}

impl AddressPatch {
    pub fn is_empty(&self) -> bool {
        replacement(self.street.as_deref()).is_none()
            && replacement(self.number.as_deref()).is_none()
    }

    pub fn apply_to(&self, address: &mut Address) {
        replace_text(&mut address.street, self.street.as_ref());
        replace_text(&mut address.number, self.number.as_ref());
    }
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        replacement(self.order_number.as_deref()).is_none()
            && replacement(self.description.as_deref()).is_none()
            && self.quantity.is_none()
            && self.unit_price.is_none()
            && self.status.is_none()
    }

    /// Applies scalar fields only; the shipment link is untouched.
    pub fn apply_to(&self, order: &mut Order) {
        replace_text(&mut order.order_number, self.order_number.as_ref());
        replace_text(&mut order.description, self.description.as_ref());
        if let Some(quantity) = self.quantity {
            order.quantity = quantity;
        }
        if let Some(unit_price) = self.unit_price {
            order.unit_price = unit_price;
        }
        if let Some(status) = self.status {
            order.status = status;
        }
    }
}

impl ShipmentPatch {
    pub fn is_empty(&self) -> bool {
        [&self.destination, &self.ship_date, &self.carrier]
            .iter()
            .all(|value| replacement(value.as_deref()).is_none())
    }

    pub fn apply_to(&self, shipment: &mut Shipment) {
        replace_text(&mut shipment.destination, self.destination.as_ref());
        replace_text(&mut shipment.ship_date, self.ship_date.as_ref());
        if let Some(carrier) = replacement(self.carrier.as_deref()) {
            shipment.carrier = Some(carrier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{replacement, AddressPatch, OrderPatch, PersonPatch};
    use crate::model::order::{Order, OrderStatus};
    use crate::model::person::{Address, Person};

    #[test]
    fn blank_input_keeps_current_value() {
        assert_eq!(replacement(Some("   ")), None);
        assert_eq!(replacement(None), None);
        assert_eq!(replacement(Some(" Ana ")), Some("Ana".to_string()));
    }

    #[test]
    fn person_patch_only_replaces_supplied_fields() {
        let mut person = Person::new("Ana", "Diaz", "1").with_address(Address::new("Main", "5"));
        let patch = PersonPatch {
            first_name: Some("Anabel".to_string()),
            last_name: Some("".to_string()),
            national_id: None,
        };
        patch.apply_to(&mut person);

        assert_eq!(person.first_name, "Anabel");
        assert_eq!(person.last_name, "Diaz");
        assert_eq!(person.national_id, "1");
        assert_eq!(person.address.as_ref().unwrap().street, "Main");
    }

    #[test]
    fn empty_patches_are_detected() {
        assert!(PersonPatch::default().is_empty());
        assert!(AddressPatch {
            street: Some(" ".to_string()),
            number: None
        }
        .is_empty());
        assert!(!OrderPatch {
            status: Some(OrderStatus::Shipped),
            ..OrderPatch::default()
        }
        .is_empty());
    }

    #[test]
    fn order_patch_replaces_numbers_and_status() {
        let mut order = Order::new("A-1", "chairs", 2, 10.0);
        OrderPatch {
            quantity: Some(4),
            status: Some(OrderStatus::Confirmed),
            ..OrderPatch::default()
        }
        .apply_to(&mut order);

        assert_eq!(order.quantity, 4);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.description, "chairs");
    }
}

//! SQLite adapter for the `orders` table.
//!
//! # Invariants
//! - `shipment_id` is written from the in-memory link's id only.
//! - Status text round-trips through `OrderStatus`; unknown values are
//!   reported as invalid data instead of being defaulted.

use crate::model::order::{Order, OrderStatus, Shipment};
use crate::model::{Owner, Record, RecordId, Validate};
use crate::repo::record_repo::{
    contains_pattern, ensure_table_ready, expect_one_row, map_write_error, parse_active_flag,
    require_id, OwnerRepository, RecordRepository, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, Params, Row};

const ORDER_SELECT_SQL: &str = "SELECT
    o.id,
    o.order_number,
    o.description,
    o.quantity,
    o.unit_price,
    o.status,
    o.shipment_id,
    o.is_active,
    s.destination AS shipment_destination,
    s.ship_date AS shipment_ship_date,
    s.carrier AS shipment_carrier,
    s.is_active AS shipment_is_active
FROM orders o
LEFT JOIN shipments s ON s.id = o.shipment_id";

const ORDER_COLUMNS: &[&str] = &[
    "id",
    "order_number",
    "description",
    "quantity",
    "unit_price",
    "status",
    "shipment_id",
    "is_active",
];

/// SQLite-backed order repository.
pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "orders", ORDER_COLUMNS)?;
        ensure_table_ready(
            conn,
            "shipments",
            &["id", "destination", "ship_date", "carrier", "is_active"],
        )?;
        Ok(Self { conn })
    }

    fn query_orders(&self, where_sql: &str, params: impl Params) -> RepoResult<Vec<Order>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ORDER_SELECT_SQL} {where_sql} ORDER BY o.id ASC;"))?;
        let mut rows = stmt.query(params)?;
        let mut orders = Vec::new();
        while let Some(row) = rows.next()? {
            orders.push(parse_order_row(row)?);
        }
        Ok(orders)
    }
}

impl RecordRepository<Order> for SqliteOrderRepository<'_> {
    fn insert(&self, order: &Order) -> RepoResult<RecordId> {
        order.validate()?;

        self.conn
            .execute(
                "INSERT INTO orders (
                    order_number,
                    description,
                    quantity,
                    unit_price,
                    status,
                    shipment_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    order.order_number.trim(),
                    order.description.trim(),
                    order.quantity,
                    order.unit_price,
                    order.status.as_str(),
                    order.linked_id(),
                ],
            )
            .map_err(|err| map_write_error(Order::ENTITY, err))?;

        let id = self.conn.last_insert_rowid();
        debug!(
            "event=order_insert module=repo status=ok order_id={id} shipment_id={:?}",
            order.linked_id()
        );
        Ok(id)
    }

    fn update(&self, order: &Order) -> RepoResult<()> {
        order.validate()?;
        let id = require_id(order)?;

        let changed = self
            .conn
            .execute(
                "UPDATE orders
                 SET
                    order_number = ?1,
                    description = ?2,
                    quantity = ?3,
                    unit_price = ?4,
                    status = ?5,
                    shipment_id = ?6,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?7
                   AND is_active = 1;",
                params![
                    order.order_number.trim(),
                    order.description.trim(),
                    order.quantity,
                    order.unit_price,
                    order.status.as_str(),
                    order.linked_id(),
                    id,
                ],
            )
            .map_err(|err| map_write_error(Order::ENTITY, err))?;

        expect_one_row(Order::ENTITY, id, changed)
    }

    fn soft_delete(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE orders
             SET
                is_active = 0,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND is_active = 1;",
            [id],
        )?;

        expect_one_row(Order::ENTITY, id, changed)
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Order>> {
        let mut orders = self.query_orders("WHERE o.id = ?1 AND o.is_active = 1", [id])?;
        Ok(orders.pop())
    }

    fn get_all(&self) -> RepoResult<Vec<Order>> {
        self.query_orders("WHERE o.is_active = 1", [])
    }
}

impl OwnerRepository<Order> for SqliteOrderRepository<'_> {
    fn find_by_natural_key(&self, order_number: &str) -> RepoResult<Option<Order>> {
        let mut orders = self.query_orders(
            "WHERE o.order_number = ?1 AND o.is_active = 1",
            [order_number.trim()],
        )?;
        if orders.len() > 1 {
            return Err(RepoError::InvalidData(format!(
                "{} active orders share one order_number",
                orders.len()
            )));
        }
        Ok(orders.pop())
    }

    /// Exact order number, or description substring. Case folding is
    /// SQLite `LIKE`'s, which covers ASCII letters only.
    fn search(&self, filter: &str) -> RepoResult<Vec<Order>> {
        let exact = filter.trim().to_string();
        let pattern = contains_pattern(filter);
        self.query_orders(
            "WHERE o.is_active = 1
               AND (o.order_number = ?1 OR o.description LIKE ?2 ESCAPE '\\')",
            [exact, pattern],
        )
    }

    fn find_by_linked_id(&self, shipment_id: RecordId) -> RepoResult<Vec<Order>> {
        self.query_orders("WHERE o.is_active = 1 AND o.shipment_id = ?1", [shipment_id])
    }
}

fn parse_order_row(row: &Row<'_>) -> RepoResult<Order> {
    let id: RecordId = row.get("id")?;

    let status_text: String = row.get("status")?;
    let status = OrderStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid order status `{status_text}` in orders.status"))
    })?;

    let shipment = match row.get::<_, Option<RecordId>>("shipment_id")? {
        Some(shipment_id) => Some(parse_joined_shipment(row, id, shipment_id)?),
        None => None,
    };

    Ok(Order {
        id: Some(id),
        order_number: row.get("order_number")?,
        description: row.get("description")?,
        quantity: row.get("quantity")?,
        unit_price: row.get("unit_price")?,
        status,
        shipment,
        is_active: parse_active_flag("orders", row.get("is_active")?)?,
    })
}

fn parse_joined_shipment(
    row: &Row<'_>,
    order_id: RecordId,
    shipment_id: RecordId,
) -> RepoResult<Shipment> {
    let destination: Option<String> = row.get("shipment_destination")?;
    let ship_date: Option<String> = row.get("shipment_ship_date")?;
    let is_active: Option<i64> = row.get("shipment_is_active")?;

    match (destination, ship_date, is_active) {
        (Some(destination), Some(ship_date), Some(is_active)) => Ok(Shipment {
            id: Some(shipment_id),
            destination,
            ship_date,
            carrier: row.get("shipment_carrier")?,
            is_active: parse_active_flag("shipments", is_active)?,
        }),
        _ => Err(RepoError::InvalidData(format!(
            "order {order_id} references missing shipment {shipment_id}"
        ))),
    }
}

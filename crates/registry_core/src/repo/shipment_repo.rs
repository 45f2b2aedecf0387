//! SQLite adapter for the `shipments` table.

use crate::model::order::Shipment;
use crate::model::{Record, RecordId, Validate};
use crate::repo::record_repo::{
    ensure_table_ready, expect_one_row, map_write_error, parse_active_flag, require_id,
    RecordRepository, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SHIPMENT_SELECT_SQL: &str =
    "SELECT id, destination, ship_date, carrier, is_active FROM shipments";

/// SQLite-backed shipment repository.
pub struct SqliteShipmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteShipmentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "shipments",
            &["id", "destination", "ship_date", "carrier", "is_active"],
        )?;
        Ok(Self { conn })
    }
}

impl RecordRepository<Shipment> for SqliteShipmentRepository<'_> {
    fn insert(&self, shipment: &Shipment) -> RepoResult<RecordId> {
        shipment.validate()?;

        self.conn
            .execute(
                "INSERT INTO shipments (destination, ship_date, carrier) VALUES (?1, ?2, ?3);",
                params![
                    shipment.destination.trim(),
                    shipment.ship_date.trim(),
                    normalized_carrier(shipment),
                ],
            )
            .map_err(|err| map_write_error(Shipment::ENTITY, err))?;

        let id = self.conn.last_insert_rowid();
        debug!("event=shipment_insert module=repo status=ok shipment_id={id}");
        Ok(id)
    }

    fn update(&self, shipment: &Shipment) -> RepoResult<()> {
        shipment.validate()?;
        let id = require_id(shipment)?;

        let changed = self
            .conn
            .execute(
                "UPDATE shipments
                 SET
                    destination = ?1,
                    ship_date = ?2,
                    carrier = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4
                   AND is_active = 1;",
                params![
                    shipment.destination.trim(),
                    shipment.ship_date.trim(),
                    normalized_carrier(shipment),
                    id,
                ],
            )
            .map_err(|err| map_write_error(Shipment::ENTITY, err))?;

        expect_one_row(Shipment::ENTITY, id, changed)
    }

    fn soft_delete(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE shipments
             SET
                is_active = 0,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND is_active = 1;",
            [id],
        )?;

        expect_one_row(Shipment::ENTITY, id, changed)
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Shipment>> {
        let shipment = self
            .conn
            .query_row(
                &format!("{SHIPMENT_SELECT_SQL} WHERE id = ?1 AND is_active = 1;"),
                [id],
                read_shipment_columns,
            )
            .optional()?;

        shipment.map(into_shipment).transpose()
    }

    fn get_all(&self) -> RepoResult<Vec<Shipment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SHIPMENT_SELECT_SQL} WHERE is_active = 1 ORDER BY id ASC;"
        ))?;
        let rows = stmt
            .query_map([], read_shipment_columns)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_shipment).collect()
    }
}

/// Blank carrier text is stored as NULL.
fn normalized_carrier(shipment: &Shipment) -> Option<&str> {
    shipment
        .carrier
        .as_deref()
        .map(str::trim)
        .filter(|carrier| !carrier.is_empty())
}

type ShipmentColumns = (RecordId, String, String, Option<String>, i64);

fn read_shipment_columns(row: &Row<'_>) -> rusqlite::Result<ShipmentColumns> {
    Ok((
        row.get("id")?,
        row.get("destination")?,
        row.get("ship_date")?,
        row.get("carrier")?,
        row.get("is_active")?,
    ))
}

fn into_shipment(
    (id, destination, ship_date, carrier, is_active): ShipmentColumns,
) -> RepoResult<Shipment> {
    Ok(Shipment {
        id: Some(id),
        destination,
        ship_date,
        carrier,
        is_active: parse_active_flag("shipments", is_active)?,
    })
}

//! SQLite adapter for the `addresses` table.

use crate::model::person::Address;
use crate::model::{Record, RecordId, Validate};
use crate::repo::record_repo::{
    ensure_table_ready, expect_one_row, map_write_error, parse_active_flag, require_id,
    RecordRepository, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ADDRESS_SELECT_SQL: &str = "SELECT id, street, number, is_active FROM addresses";

const ADDRESS_COLUMNS: &[&str] = &["id", "street", "number", "is_active", "updated_at"];

/// SQLite-backed address repository.
pub struct SqliteAddressRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAddressRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "addresses", ADDRESS_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl RecordRepository<Address> for SqliteAddressRepository<'_> {
    fn insert(&self, address: &Address) -> RepoResult<RecordId> {
        address.validate()?;

        self.conn
            .execute(
                "INSERT INTO addresses (street, number) VALUES (?1, ?2);",
                params![address.street.trim(), address.number.trim()],
            )
            .map_err(|err| map_write_error(Address::ENTITY, err))?;

        let id = self.conn.last_insert_rowid();
        debug!("event=address_insert module=repo status=ok address_id={id}");
        Ok(id)
    }

    fn update(&self, address: &Address) -> RepoResult<()> {
        address.validate()?;
        let id = require_id(address)?;

        let changed = self
            .conn
            .execute(
                "UPDATE addresses
                 SET
                    street = ?1,
                    number = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?3
                   AND is_active = 1;",
                params![address.street.trim(), address.number.trim(), id],
            )
            .map_err(|err| map_write_error(Address::ENTITY, err))?;

        expect_one_row(Address::ENTITY, id, changed)
    }

    fn soft_delete(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE addresses
             SET
                is_active = 0,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND is_active = 1;",
            [id],
        )?;

        expect_one_row(Address::ENTITY, id, changed)
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Address>> {
        let row = self
            .conn
            .query_row(
                &format!("{ADDRESS_SELECT_SQL} WHERE id = ?1 AND is_active = 1;"),
                [id],
                read_address_columns,
            )
            .optional()?;

        row.map(into_address).transpose()
    }

    fn get_all(&self) -> RepoResult<Vec<Address>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ADDRESS_SELECT_SQL} WHERE is_active = 1 ORDER BY id ASC;"))?;
        let rows = stmt
            .query_map([], read_address_columns)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_address).collect()
    }
}

type AddressColumns = (RecordId, String, String, i64);

fn read_address_columns(row: &Row<'_>) -> rusqlite::Result<AddressColumns> {
    Ok((
        row.get("id")?,
        row.get("street")?,
        row.get("number")?,
        row.get("is_active")?,
    ))
}

fn into_address((id, street, number, is_active): AddressColumns) -> RepoResult<Address> {
    Ok(Address {
        id: Some(id),
        street,
        number,
        is_active: parse_active_flag("addresses", is_active)?,
    })
}

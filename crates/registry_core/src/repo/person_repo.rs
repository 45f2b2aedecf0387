//! SQLite adapter for the `people` table.
//!
//! # Invariants
//! - Writes persist `address_id` from the in-memory link's id, never the
//!   address content.
//! - Reads join the referenced address regardless of its `is_active`, so a
//!   dangling reference shows up as an inactive linked address.

use crate::model::person::{Address, Person};
use crate::model::{Owner, Record, RecordId, Validate};
use crate::repo::record_repo::{
    contains_pattern, ensure_table_ready, expect_one_row, map_write_error, parse_active_flag,
    require_id, OwnerRepository, RecordRepository, RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, Params, Row};

const PERSON_SELECT_SQL: &str = "SELECT
    p.id,
    p.first_name,
    p.last_name,
    p.national_id,
    p.address_id,
    p.is_active,
    a.street AS address_street,
    a.number AS address_number,
    a.is_active AS address_is_active
FROM people p
LEFT JOIN addresses a ON a.id = p.address_id";

const PERSON_COLUMNS: &[&str] = &[
    "id",
    "first_name",
    "last_name",
    "national_id",
    "address_id",
    "is_active",
    "updated_at",
];

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "people", PERSON_COLUMNS)?;
        ensure_table_ready(conn, "addresses", &["id", "street", "number", "is_active"])?;
        Ok(Self { conn })
    }

    fn query_people(&self, where_sql: &str, params: impl Params) -> RepoResult<Vec<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} {where_sql} ORDER BY p.id ASC;"))?;
        let mut rows = stmt.query(params)?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }
        Ok(people)
    }
}

impl RecordRepository<Person> for SqlitePersonRepository<'_> {
    fn insert(&self, person: &Person) -> RepoResult<RecordId> {
        person.validate()?;

        self.conn
            .execute(
                "INSERT INTO people (first_name, last_name, national_id, address_id)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    person.first_name.trim(),
                    person.last_name.trim(),
                    person.national_id.trim(),
                    person.linked_id(),
                ],
            )
            .map_err(|err| map_write_error(Person::ENTITY, err))?;

        let id = self.conn.last_insert_rowid();
        debug!(
            "event=person_insert module=repo status=ok person_id={id} address_id={:?}",
            person.linked_id()
        );
        Ok(id)
    }

    fn update(&self, person: &Person) -> RepoResult<()> {
        person.validate()?;
        let id = require_id(person)?;

        let changed = self
            .conn
            .execute(
                "UPDATE people
                 SET
                    first_name = ?1,
                    last_name = ?2,
                    national_id = ?3,
                    address_id = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?5
                   AND is_active = 1;",
                params![
                    person.first_name.trim(),
                    person.last_name.trim(),
                    person.national_id.trim(),
                    person.linked_id(),
                    id,
                ],
            )
            .map_err(|err| map_write_error(Person::ENTITY, err))?;

        expect_one_row(Person::ENTITY, id, changed)
    }

    fn soft_delete(&self, id: RecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE people
             SET
                is_active = 0,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND is_active = 1;",
            [id],
        )?;

        expect_one_row(Person::ENTITY, id, changed)
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Person>> {
        let mut people = self.query_people("WHERE p.id = ?1 AND p.is_active = 1", [id])?;
        Ok(people.pop())
    }

    fn get_all(&self) -> RepoResult<Vec<Person>> {
        self.query_people("WHERE p.is_active = 1", [])
    }
}

impl OwnerRepository<Person> for SqlitePersonRepository<'_> {
    fn find_by_natural_key(&self, national_id: &str) -> RepoResult<Option<Person>> {
        let mut people = self.query_people(
            "WHERE p.national_id = ?1 AND p.is_active = 1",
            [national_id.trim()],
        )?;
        if people.len() > 1 {
            return Err(RepoError::InvalidData(format!(
                "{} active people share one national_id",
                people.len()
            )));
        }
        Ok(people.pop())
    }

    /// Case-insensitive substring match on first or last name.
    fn search(&self, filter: &str) -> RepoResult<Vec<Person>> {
        let pattern = contains_pattern(filter);
        self.query_people(
            "WHERE p.is_active = 1
               AND (p.first_name LIKE ?1 ESCAPE '\\' OR p.last_name LIKE ?1 ESCAPE '\\')",
            [pattern],
        )
    }

    fn find_by_linked_id(&self, address_id: RecordId) -> RepoResult<Vec<Person>> {
        self.query_people("WHERE p.is_active = 1 AND p.address_id = ?1", [address_id])
    }
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let id: RecordId = row.get("id")?;
    let address = match row.get::<_, Option<RecordId>>("address_id")? {
        Some(address_id) => Some(parse_joined_address(row, id, address_id)?),
        None => None,
    };

    Ok(Person {
        id: Some(id),
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        national_id: row.get("national_id")?,
        address,
        is_active: parse_active_flag("people", row.get("is_active")?)?,
    })
}

fn parse_joined_address(
    row: &Row<'_>,
    person_id: RecordId,
    address_id: RecordId,
) -> RepoResult<Address> {
    let street: Option<String> = row.get("address_street")?;
    let number: Option<String> = row.get("address_number")?;
    let is_active: Option<i64> = row.get("address_is_active")?;

    match (street, number, is_active) {
        (Some(street), Some(number), Some(is_active)) => Ok(Address {
            id: Some(address_id),
            street,
            number,
            is_active: parse_active_flag("addresses", is_active)?,
        }),
        _ => Err(RepoError::InvalidData(format!(
            "person {person_id} references missing address {address_id}"
        ))),
    }
}

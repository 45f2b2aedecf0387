//! Persistence adapter contracts shared by every entity repository.
//!
//! # Responsibility
//! - Define the per-row CRUD contract the service layer composes.
//! - Translate SQLite failures into semantic repository errors.
//! - Reject connections that were not migrated by `db::open_db*`.
//!
//! # Invariants
//! - Every call is atomic for a single row; no call spans two tables' writes.
//! - Reads and writes only ever see active (`is_active = 1`) rows.
//! - Zero rows affected on update/soft-delete is `RepoError::NotFound`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::{Owner, Record, RecordId, ValidationError};
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all entity adapters.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// No active row matched the id.
    NotFound {
        entity: &'static str,
        id: RecordId,
    },
    /// Storage-level unique constraint rejected the write.
    UniqueViolation {
        entity: &'static str,
        message: String,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UniqueViolation { entity, message } => {
                write!(f, "{entity} unique constraint violated: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "repository requires column `{column}` in table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Single-row CRUD contract for one entity type.
pub trait RecordRepository<T: Record> {
    /// Inserts an unpersisted record and returns the id storage assigned.
    fn insert(&self, record: &T) -> RepoResult<RecordId>;
    /// Rewrites an active row by id.
    fn update(&self, record: &T) -> RepoResult<()>;
    /// Marks an active row inactive.
    fn soft_delete(&self, id: RecordId) -> RepoResult<()>;
    fn get_by_id(&self, id: RecordId) -> RepoResult<Option<T>>;
    /// All active rows in id order.
    fn get_all(&self) -> RepoResult<Vec<T>>;
}

/// Owner adapters add natural-key and free-text lookups.
pub trait OwnerRepository<O: Owner>: RecordRepository<O> {
    /// Exact natural-key match among active rows.
    fn find_by_natural_key(&self, natural_key: &str) -> RepoResult<Option<O>>;
    /// Partial text match; semantics are entity specific.
    fn search(&self, filter: &str) -> RepoResult<Vec<O>>;
    /// Active owners whose foreign key points at `linked_id`.
    fn find_by_linked_id(&self, linked_id: RecordId) -> RepoResult<Vec<O>>;
}

/// Maps a write failure, promoting unique-constraint errors.
pub(crate) fn map_write_error(entity: &'static str, err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(ffi_err, message) = &err {
        if ffi_err.code == ErrorCode::ConstraintViolation
            && ffi_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            return RepoError::UniqueViolation {
                entity,
                message: message.clone().unwrap_or_else(|| ffi_err.to_string()),
            };
        }
    }
    err.into()
}

/// Fails unless `changed` is exactly the one row the caller expected.
pub(crate) fn expect_one_row(entity: &'static str, id: RecordId, changed: usize) -> RepoResult<()> {
    match changed {
        0 => Err(RepoError::NotFound { entity, id }),
        1 => Ok(()),
        other => Err(RepoError::InvalidData(format!(
            "{entity} write for id {id} touched {other} rows"
        ))),
    }
}

/// Requires an assigned id on records passed to `update`.
pub(crate) fn require_id<T: Record>(record: &T) -> RepoResult<RecordId> {
    record
        .id()
        .ok_or(RepoError::Validation(ValidationError::Unpersisted(T::ENTITY)))
}

pub(crate) fn parse_active_flag(table: &str, value: i64) -> RepoResult<bool> {
    match value {
        1 => Ok(true),
        0 => Ok(false),
        other => Err(RepoError::InvalidData(format!(
            "invalid is_active value `{other}` in {table}.is_active"
        ))),
    }
}

/// Builds a `LIKE` pattern matching `filter` anywhere, with `\` as escape.
pub(crate) fn contains_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for ch in filter.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Verifies schema version and the presence of `table` with `columns`.
pub(crate) fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable(table));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    for column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{contains_pattern, expect_one_row, parse_active_flag, RepoError};

    #[test]
    fn contains_pattern_escapes_like_wildcards() {
        assert_eq!(contains_pattern(" ana "), "%ana%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn expect_one_row_maps_zero_rows_to_not_found() {
        assert!(matches!(
            expect_one_row("address", 9, 0),
            Err(RepoError::NotFound {
                entity: "address",
                id: 9
            })
        ));
        assert!(expect_one_row("address", 9, 1).is_ok());
    }

    #[test]
    fn parse_active_flag_rejects_out_of_range_values() {
        assert!(matches!(
            parse_active_flag("people", 2),
            Err(RepoError::InvalidData(_))
        ));
        assert!(!parse_active_flag("people", 0).unwrap());
    }
}

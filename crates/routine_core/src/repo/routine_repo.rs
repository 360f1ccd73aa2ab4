//! Daily routine repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/find/replace/list APIs over `daily_routines` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `DailyRoutineRecord::validate()` before SQL mutations.
//! - `replace_routine` is a single conditional `UPDATE` keyed on `version`;
//!   a stale version never overwrites newer data.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::ensure_schema_ready;
use crate::db::DbError;
use crate::model::routine::{
    DailyRoutineRecord, RoutineId, RoutineSlot, RoutineValidationError, SlotStatus,
    ROUTINE_DATE_FORMAT,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ROUTINE_SELECT_SQL: &str = "SELECT
    uuid,
    user_id,
    routine_date,
    morning_content,
    morning_status,
    day_content,
    day_status,
    evening_content,
    evening_status,
    version
FROM daily_routines";

const ROUTINES_DEFAULT_LIMIT: u32 = 31;
const ROUTINES_LIMIT_MAX: u32 = 366;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for routine and key-value persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(RoutineValidationError),
    Db(DbError),
    NotFound {
        user_id: String,
        date: NaiveDate,
    },
    AlreadyExists {
        user_id: String,
        date: NaiveDate,
    },
    /// Stored version moved on since the caller read the record.
    Conflict {
        expected: i64,
        actual: i64,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { user_id, date } => {
                write!(f, "daily routine not found: user={user_id} date={date}")
            }
            Self::AlreadyExists { user_id, date } => {
                write!(f, "daily routine already exists: user={user_id} date={date}")
            }
            Self::Conflict { expected, actual } => write!(
                f,
                "daily routine was modified concurrently: expected version {expected}, found {actual}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::AlreadyExists { .. }
            | Self::Conflict { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<RoutineValidationError> for RepoError {
    fn from(value: RoutineValidationError) -> Self {
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

/// Query options for listing one user's routines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutineListQuery {
    pub user_id: String,
    /// Inclusive lower date bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub to: Option<NaiveDate>,
    /// Maximum rows to return. Defaults to 31 and clamps to 366.
    pub limit: Option<u32>,
}

/// Persistence gateway for daily routine records.
pub trait RoutineRepository {
    /// Inserts a new record. Fails with `AlreadyExists` for a taken `(user_id, date)`.
    fn create_routine(&self, record: &DailyRoutineRecord) -> RepoResult<RoutineId>;
    /// Loads the record for `(user_id, date)`, if any.
    fn find_routine(&self, user_id: &str, date: NaiveDate)
        -> RepoResult<Option<DailyRoutineRecord>>;
    /// Atomically replaces slot data when the stored version still equals
    /// `expected_version`. Returns the new stored version.
    fn replace_routine(
        &self,
        user_id: &str,
        date: NaiveDate,
        expected_version: i64,
        record: &DailyRoutineRecord,
    ) -> RepoResult<i64>;
    /// Lists a user's routines, newest date first.
    fn list_routines(&self, query: &RoutineListQuery) -> RepoResult<Vec<DailyRoutineRecord>>;
}

/// SQLite-backed routine repository.
pub struct SqliteRoutineRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRoutineRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RoutineRepository for SqliteRoutineRepository<'_> {
    fn create_routine(&self, record: &DailyRoutineRecord) -> RepoResult<RoutineId> {
        record.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO daily_routines (
                uuid,
                user_id,
                routine_date,
                morning_content,
                morning_status,
                day_content,
                day_status,
                evening_content,
                evening_status,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                record.uuid.to_string(),
                record.user_id.as_str(),
                date_to_db(record.date),
                record.morning.content.as_str(),
                record.morning.status.as_str(),
                record.day.content.as_str(),
                record.day.status.as_str(),
                record.evening.content.as_str(),
                record.evening.status.as_str(),
                record.version,
            ],
        );

        match inserted {
            Ok(_) => Ok(record.uuid),
            Err(err) if is_constraint_violation(&err) => Err(RepoError::AlreadyExists {
                user_id: record.user_id.clone(),
                date: record.date,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn find_routine(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> RepoResult<Option<DailyRoutineRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ROUTINE_SELECT_SQL}
             WHERE user_id = ?1
               AND routine_date = ?2;"
        ))?;

        let mut rows = stmt.query(params![user_id, date_to_db(date)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_routine_row(row)?));
        }

        Ok(None)
    }

    fn replace_routine(
        &self,
        user_id: &str,
        date: NaiveDate,
        expected_version: i64,
        record: &DailyRoutineRecord,
    ) -> RepoResult<i64> {
        record.validate()?;
        if record.user_id != user_id || record.date != date {
            return Err(RepoError::InvalidData(format!(
                "replacement record key ({}, {}) does not match target ({user_id}, {date})",
                record.user_id, record.date
            )));
        }

        let changed = self.conn.execute(
            "UPDATE daily_routines
             SET
                morning_content = ?4,
                morning_status = ?5,
                day_content = ?6,
                day_status = ?7,
                evening_content = ?8,
                evening_status = ?9,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE user_id = ?1
               AND routine_date = ?2
               AND version = ?3;",
            params![
                user_id,
                date_to_db(date),
                expected_version,
                record.morning.content.as_str(),
                record.morning.status.as_str(),
                record.day.content.as_str(),
                record.day.status.as_str(),
                record.evening.content.as_str(),
                record.evening.status.as_str(),
            ],
        )?;

        if changed == 1 {
            return Ok(expected_version + 1);
        }

        let actual = self
            .conn
            .query_row(
                "SELECT version FROM daily_routines WHERE user_id = ?1 AND routine_date = ?2;",
                params![user_id, date_to_db(date)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match actual {
            Some(actual) => Err(RepoError::Conflict {
                expected: expected_version,
                actual,
            }),
            None => Err(RepoError::NotFound {
                user_id: user_id.to_string(),
                date,
            }),
        }
    }

    fn list_routines(&self, query: &RoutineListQuery) -> RepoResult<Vec<DailyRoutineRecord>> {
        let mut sql = format!("{ROUTINE_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(query.user_id.clone())];

        if let Some(from) = query.from {
            sql.push_str(" AND routine_date >= ?");
            bind_values.push(Value::Text(date_to_db(from)));
        }
        if let Some(to) = query.to {
            sql.push_str(" AND routine_date <= ?");
            bind_values.push(Value::Text(date_to_db(to)));
        }

        sql.push_str(" ORDER BY routine_date DESC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_routine_limit(
            query.limit,
        ))));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut routines = Vec::new();
        while let Some(row) = rows.next()? {
            routines.push(parse_routine_row(row)?);
        }

        Ok(routines)
    }
}

/// Applies default and upper bound to a routine list limit.
pub fn normalize_routine_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => ROUTINES_DEFAULT_LIMIT,
        Some(value) => value.min(ROUTINES_LIMIT_MAX),
    }
}

fn parse_routine_row(row: &Row<'_>) -> RepoResult<DailyRoutineRecord> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in daily_routines.uuid"
        ))
    })?;

    let date_text: String = row.get("routine_date")?;
    let date = NaiveDate::parse_from_str(&date_text, ROUTINE_DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid date `{date_text}` in daily_routines.routine_date"
        ))
    })?;

    let record = DailyRoutineRecord {
        uuid,
        user_id: row.get("user_id")?,
        date,
        morning: parse_slot(row, "morning_content", "morning_status")?,
        day: parse_slot(row, "day_content", "day_status")?,
        evening: parse_slot(row, "evening_content", "evening_status")?,
        version: row.get("version")?,
    };
    record.validate()?;
    Ok(record)
}

fn parse_slot(row: &Row<'_>, content_col: &str, status_col: &str) -> RepoResult<RoutineSlot> {
    let status_text: String = row.get(status_col)?;
    let status = SlotStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid slot status `{status_text}` in daily_routines.{status_col}"
        ))
    })?;
    Ok(RoutineSlot {
        content: row.get(content_col)?,
        status,
    })
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(ROUTINE_DATE_FORMAT).to_string()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

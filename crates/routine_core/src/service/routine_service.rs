//! Daily routine use-case service.
//!
//! # Responsibility
//! - Apply the per-slot edit rule to stored routines.
//! - Run terminal status transitions (submit/complete/miss) for single slots.
//! - Persist every change through a version-checked replace.
//!
//! # Invariants
//! - Locked slots never change through `edit_daily_routine`.
//! - A terminal slot never leaves its terminal status.
//! - Every write is conditional on the version that was read; conflicts are
//!   reported, never overwritten.
//! - Logs carry metadata only, never slot text.

use crate::config::EditPolicy;
use crate::model::routine::{
    validate_user_id, DailyRoutineRecord, RoutineValidationError, SlotContents, SlotKind,
    SlotStatus,
};
use crate::repo::routine_repo::{RepoError, RoutineListQuery, RoutineRepository};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Applies an edit proposal to a routine record.
///
/// Pending slots take the proposed text and stay pending; locked slots are
/// carried over untouched. Identity, date and version are copied from
/// `existing`. The function is pure.
pub fn apply_edit(existing: &DailyRoutineRecord, proposed: &SlotContents) -> DailyRoutineRecord {
    let mut updated = existing.clone();
    for kind in SlotKind::ALL {
        *updated.slot_mut(kind) = existing.slot(kind).apply_proposed(proposed.get(kind));
    }
    updated
}

/// Edit intent submitted by a client edit surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRoutineRequest {
    pub user_id: String,
    pub date: NaiveDate,
    pub proposed: SlotContents,
    /// Version the client last read. `None` skips the early check; the
    /// write is still conditional on the version read by the service.
    pub expected_version: Option<i64>,
}

/// Terminal transition for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSlotRequest {
    pub user_id: String,
    pub date: NaiveDate,
    pub slot: SlotKind,
    /// Must be terminal.
    pub status: SlotStatus,
    pub expected_version: Option<i64>,
}

/// Service error for routine use-cases.
#[derive(Debug)]
pub enum RoutineServiceError {
    /// No routine stored for the key.
    NotFound { user_id: String, date: NaiveDate },
    /// A routine already exists for the key.
    AlreadyExists { user_id: String, date: NaiveDate },
    /// Malformed input.
    Validation(RoutineValidationError),
    /// Stored routine changed since it was read.
    Conflict { expected: i64, actual: i64 },
    /// Strict policy rejected changes to these locked slots, or a terminal
    /// slot was asked to transition again.
    LockedSlot { slots: Vec<SlotKind> },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl RoutineServiceError {
    /// Status code for a REST binding.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::AlreadyExists { .. } | Self::Conflict { .. } | Self::LockedSlot { .. } => 409,
            Self::Repo(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "routine_not_found",
            Self::AlreadyExists { .. } => "routine_exists",
            Self::Validation(_) => "invalid_edit",
            Self::Conflict { .. } => "version_conflict",
            Self::LockedSlot { .. } => "slot_locked",
            Self::Repo(_) => "storage_failure",
        }
    }
}

impl Display for RoutineServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { user_id, date } => {
                write!(f, "daily routine not found: user={user_id} date={date}")
            }
            Self::AlreadyExists { user_id, date } => {
                write!(f, "daily routine already exists: user={user_id} date={date}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict { expected, actual } => write!(
                f,
                "daily routine changed since it was read (expected version {expected}, found {actual}); reload and retry"
            ),
            Self::LockedSlot { slots } => write!(
                f,
                "slot(s) locked and cannot be changed: {}",
                slot_names(slots)
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RoutineServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RoutineServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { user_id, date } => Self::NotFound { user_id, date },
            RepoError::AlreadyExists { user_id, date } => Self::AlreadyExists { user_id, date },
            RepoError::Conflict { expected, actual } => Self::Conflict { expected, actual },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<RoutineValidationError> for RoutineServiceError {
    fn from(value: RoutineValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type RoutineServiceResult<T> = Result<T, RoutineServiceError>;

/// Routine service facade over a persistence gateway.
pub struct RoutineService<R: RoutineRepository> {
    repo: R,
    policy: EditPolicy,
}

impl<R: RoutineRepository> RoutineService<R> {
    /// Creates a service with the lenient default edit policy.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, EditPolicy::default())
    }

    pub fn with_policy(repo: R, policy: EditPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    /// Establishes the plan for a date with every slot pending.
    pub fn create_daily_routine(
        &self,
        user_id: &str,
        date: NaiveDate,
        plan: &SlotContents,
    ) -> RoutineServiceResult<DailyRoutineRecord> {
        let started_at = Instant::now();
        let result = DailyRoutineRecord::new(user_id, date, plan)
            .map_err(RoutineServiceError::from)
            .and_then(|record| {
                self.repo.create_routine(&record)?;
                Ok(record)
            });
        log_outcome("routine_create", date, started_at, &result);
        result
    }

    /// Loads the routine for `(user_id, date)`.
    pub fn get_daily_routine(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> RoutineServiceResult<DailyRoutineRecord> {
        validate_user_id(user_id)?;
        self.repo
            .find_routine(user_id, date)?
            .ok_or_else(|| RoutineServiceError::NotFound {
                user_id: user_id.to_string(),
                date,
            })
    }

    /// Lists a user's routines, newest date first.
    pub fn list_daily_routines(
        &self,
        query: &RoutineListQuery,
    ) -> RoutineServiceResult<Vec<DailyRoutineRecord>> {
        validate_user_id(&query.user_id)?;
        Ok(self.repo.list_routines(query)?)
    }

    /// Fetches, applies the edit rule and persists with a version check.
    ///
    /// # Errors
    /// - `NotFound` when nothing is stored for the key.
    /// - `Conflict` when `expected_version` is stale, or another write lands
    ///   between read and replace.
    /// - `LockedSlot` under strict policy when a locked slot's text differs.
    pub fn edit_daily_routine(
        &self,
        request: &EditRoutineRequest,
    ) -> RoutineServiceResult<DailyRoutineRecord> {
        let started_at = Instant::now();
        let result = self.edit_inner(request);
        log_outcome("routine_edit", request.date, started_at, &result);
        result
    }

    /// Moves one pending slot to a terminal status.
    pub fn mark_slot(&self, request: &MarkSlotRequest) -> RoutineServiceResult<DailyRoutineRecord> {
        let started_at = Instant::now();
        let result = self.mark_inner(request);
        log_outcome("routine_mark_slot", request.date, started_at, &result);
        result
    }

    fn edit_inner(&self, request: &EditRoutineRequest) -> RoutineServiceResult<DailyRoutineRecord> {
        let existing =
            self.load_for_write(&request.user_id, request.date, request.expected_version)?;

        let locked = existing.locked_changes(&request.proposed);
        if !locked.is_empty() {
            if self.policy.strict_locked_slot_edits {
                return Err(RoutineServiceError::LockedSlot { slots: locked });
            }
            info!(
                "event=routine_edit module=service status=locked_ignored date={} slots={}",
                request.date,
                slot_names(&locked)
            );
        }

        let mut updated = apply_edit(&existing, &request.proposed);
        updated.version = self.repo.replace_routine(
            &request.user_id,
            request.date,
            existing.version,
            &updated,
        )?;
        Ok(updated)
    }

    fn mark_inner(&self, request: &MarkSlotRequest) -> RoutineServiceResult<DailyRoutineRecord> {
        if request.status.is_pending() {
            return Err(RoutineValidationError::NotTerminal(request.slot).into());
        }

        let existing =
            self.load_for_write(&request.user_id, request.date, request.expected_version)?;
        if !existing.slot(request.slot).is_editable() {
            return Err(RoutineServiceError::LockedSlot {
                slots: vec![request.slot],
            });
        }

        let mut updated = existing.clone();
        updated.slot_mut(request.slot).status = request.status;
        updated.version = self.repo.replace_routine(
            &request.user_id,
            request.date,
            existing.version,
            &updated,
        )?;
        Ok(updated)
    }

    fn load_for_write(
        &self,
        user_id: &str,
        date: NaiveDate,
        expected_version: Option<i64>,
    ) -> RoutineServiceResult<DailyRoutineRecord> {
        let existing = self.get_daily_routine(user_id, date)?;
        if let Some(expected) = expected_version {
            if expected != existing.version {
                return Err(RoutineServiceError::Conflict {
                    expected,
                    actual: existing.version,
                });
            }
        }
        Ok(existing)
    }
}

fn slot_names(slots: &[SlotKind]) -> String {
    slots
        .iter()
        .map(|slot| slot.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn log_outcome(
    event: &str,
    date: NaiveDate,
    started_at: Instant,
    result: &RoutineServiceResult<DailyRoutineRecord>,
) {
    match result {
        Ok(record) => info!(
            "event={event} module=service status=ok date={date} version={} duration_ms={}",
            record.version,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={event} module=service status=error date={date} duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.error_code()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_edit, RoutineServiceError};
    use crate::model::routine::{
        DailyRoutineRecord, RoutineValidationError, SlotContents, SlotKind, SlotStatus,
    };
    use chrono::NaiveDate;

    fn record() -> DailyRoutineRecord {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        DailyRoutineRecord::new("user-1", date, &SlotContents::new("run", "work", "rest")).unwrap()
    }

    #[test]
    fn apply_edit_keeps_identity_fields() {
        let existing = record();
        let updated = apply_edit(&existing, &SlotContents::new("gym", "work", "read"));
        assert_eq!(updated.uuid, existing.uuid);
        assert_eq!(updated.user_id, existing.user_id);
        assert_eq!(updated.date, existing.date);
        assert_eq!(updated.version, existing.version);
    }

    #[test]
    fn apply_edit_skips_locked_slot() {
        let mut existing = record();
        existing.slot_mut(SlotKind::Day).status = SlotStatus::Submitted;
        let updated = apply_edit(&existing, &SlotContents::new("gym", "nap", "read"));
        assert_eq!(updated.day, existing.day);
        assert_eq!(updated.morning.content, "gym");
    }

    #[test]
    fn errors_map_to_rest_status_codes() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let not_found = RoutineServiceError::NotFound {
            user_id: "u".to_string(),
            date,
        };
        let invalid =
            RoutineServiceError::Validation(RoutineValidationError::MissingSlot(SlotKind::Day));
        let conflict = RoutineServiceError::Conflict {
            expected: 1,
            actual: 2,
        };
        assert_eq!(not_found.http_status(), 404);
        assert_eq!(invalid.http_status(), 400);
        assert_eq!(conflict.http_status(), 409);
        assert_eq!(conflict.error_code(), "version_conflict");
    }

    #[test]
    fn locked_slot_error_lists_slot_names() {
        let err = RoutineServiceError::LockedSlot {
            slots: vec![SlotKind::Morning, SlotKind::Evening],
        };
        assert!(err.to_string().ends_with("morning,evening"));
    }
}

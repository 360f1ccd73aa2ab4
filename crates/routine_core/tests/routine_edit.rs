use chrono::NaiveDate;
use routine_core::db::{open_db, open_db_in_memory};
use routine_core::{
    DailyRoutineRecord, EditPolicy, EditRoutineRequest, MarkSlotRequest, RepoResult, RoutineId,
    RoutineListQuery, RoutineRepository, RoutineService, RoutineServiceError,
    RoutineValidationError, SlotContents, SlotKind, SlotStatus, SqliteRoutineRepository,
};
use rusqlite::Connection;
use std::cell::Cell;

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn edit(proposed: SlotContents) -> EditRoutineRequest {
    EditRoutineRequest {
        user_id: "u1".to_string(),
        date: may_first(),
        proposed,
        expected_version: None,
    }
}

fn mark(slot: SlotKind, status: SlotStatus) -> MarkSlotRequest {
    MarkSlotRequest {
        user_id: "u1".to_string(),
        date: may_first(),
        slot,
        status,
        expected_version: None,
    }
}

fn seeded_service(
    conn: &Connection,
    policy: EditPolicy,
) -> RoutineService<SqliteRoutineRepository<'_>> {
    let repo = SqliteRoutineRepository::try_new(conn).unwrap();
    let service = RoutineService::with_policy(repo, policy);
    service
        .create_daily_routine("u1", may_first(), &SlotContents::new("run", "work", "rest"))
        .unwrap();
    service
}

#[test]
fn pending_slots_take_new_content_and_stay_pending() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());

    let updated = service
        .edit_daily_routine(&edit(SlotContents::new("gym", "work", "read")))
        .unwrap();

    assert_eq!(updated.morning.content, "gym");
    assert_eq!(updated.morning.status, SlotStatus::Pending);
    assert_eq!(updated.day.content, "work");
    assert_eq!(updated.day.status, SlotStatus::Pending);
    assert_eq!(updated.evening.content, "read");
    assert_eq!(updated.evening.status, SlotStatus::Pending);
    assert_eq!(updated.version, 2);
}

#[test]
fn completed_slot_is_not_changed_by_lenient_edit() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::lenient());
    service
        .mark_slot(&mark(SlotKind::Morning, SlotStatus::Completed))
        .unwrap();

    let updated = service
        .edit_daily_routine(&edit(SlotContents::new("gym", "work", "read")))
        .unwrap();

    assert_eq!(updated.morning.content, "run");
    assert_eq!(updated.morning.status, SlotStatus::Completed);
    assert_eq!(updated.evening.content, "read");
}

#[test]
fn strict_policy_rejects_locked_slot_changes_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::strict());
    service
        .mark_slot(&mark(SlotKind::Morning, SlotStatus::Completed))
        .unwrap();
    service
        .mark_slot(&mark(SlotKind::Evening, SlotStatus::Missed))
        .unwrap();

    let err = service
        .edit_daily_routine(&edit(SlotContents::new("gym", "meetings", "read")))
        .unwrap_err();
    match &err {
        RoutineServiceError::LockedSlot { slots } => {
            assert_eq!(slots, &vec![SlotKind::Morning, SlotKind::Evening]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.error_code(), "slot_locked");

    let stored = service.get_daily_routine("u1", may_first()).unwrap();
    assert_eq!(stored.day.content, "work");
    assert_eq!(stored.version, 3);
}

#[test]
fn strict_policy_allows_resending_locked_text() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::strict());
    service
        .mark_slot(&mark(SlotKind::Morning, SlotStatus::Submitted))
        .unwrap();

    let updated = service
        .edit_daily_routine(&edit(SlotContents::new("run", "meetings", "rest")))
        .unwrap();
    assert_eq!(updated.morning.status, SlotStatus::Submitted);
    assert_eq!(updated.day.content, "meetings");
}

#[test]
fn edit_of_missing_routine_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRoutineRepository::try_new(&conn).unwrap();
    let service = RoutineService::new(repo);

    let err = service
        .edit_daily_routine(&edit(SlotContents::new("gym", "work", "read")))
        .unwrap_err();
    assert!(matches!(err, RoutineServiceError::NotFound { .. }));
    assert_eq!(err.http_status(), 404);
}

#[test]
fn stale_expected_version_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());

    let mut first = edit(SlotContents::new("gym", "work", "rest"));
    first.expected_version = Some(1);
    service.edit_daily_routine(&first).unwrap();

    let mut second = edit(SlotContents::new("swim", "work", "rest"));
    second.expected_version = Some(1);
    let err = service.edit_daily_routine(&second).unwrap_err();
    assert!(matches!(
        err,
        RoutineServiceError::Conflict {
            expected: 1,
            actual: 2
        }
    ));
    assert_eq!(err.http_status(), 409);

    let stored = service.get_daily_routine("u1", may_first()).unwrap();
    assert_eq!(stored.morning.content, "gym");
}

#[test]
fn two_connections_editing_same_day_conflict_on_second_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routine.db");
    let conn_a = open_db(&path).unwrap();
    let conn_b = open_db(&path).unwrap();
    let service_a = seeded_service(&conn_a, EditPolicy::default());
    let service_b = RoutineService::new(SqliteRoutineRepository::try_new(&conn_b).unwrap());

    let read_by_b = service_b.get_daily_routine("u1", may_first()).unwrap();

    let mut from_a = edit(SlotContents::new("gym", "work", "rest"));
    from_a.expected_version = Some(read_by_b.version);
    service_a.edit_daily_routine(&from_a).unwrap();

    let mut from_b = edit(SlotContents::new("swim", "work", "rest"));
    from_b.expected_version = Some(read_by_b.version);
    let err = service_b.edit_daily_routine(&from_b).unwrap_err();
    assert!(matches!(err, RoutineServiceError::Conflict { .. }));
}

/// Lands a competing write between the service's read and its replace.
struct InterleavingRepo<'conn> {
    inner: SqliteRoutineRepository<'conn>,
    interfered: Cell<bool>,
}

impl RoutineRepository for InterleavingRepo<'_> {
    fn create_routine(&self, record: &DailyRoutineRecord) -> RepoResult<RoutineId> {
        self.inner.create_routine(record)
    }

    fn find_routine(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> RepoResult<Option<DailyRoutineRecord>> {
        self.inner.find_routine(user_id, date)
    }

    fn replace_routine(
        &self,
        user_id: &str,
        date: NaiveDate,
        expected_version: i64,
        record: &DailyRoutineRecord,
    ) -> RepoResult<i64> {
        if !self.interfered.replace(true) {
            let mut competing = record.clone();
            competing.day.content = "competing write".to_string();
            self.inner
                .replace_routine(user_id, date, expected_version, &competing)?;
        }
        self.inner
            .replace_routine(user_id, date, expected_version, record)
    }

    fn list_routines(&self, query: &RoutineListQuery) -> RepoResult<Vec<DailyRoutineRecord>> {
        self.inner.list_routines(query)
    }
}

#[test]
fn write_between_read_and_replace_is_detected() {
    let conn = open_db_in_memory().unwrap();
    let repo = InterleavingRepo {
        inner: SqliteRoutineRepository::try_new(&conn).unwrap(),
        interfered: Cell::new(false),
    };
    let service = RoutineService::new(repo);
    service
        .create_daily_routine("u1", may_first(), &SlotContents::new("run", "work", "rest"))
        .unwrap();

    let err = service
        .edit_daily_routine(&edit(SlotContents::new("gym", "work", "rest")))
        .unwrap_err();
    assert!(matches!(
        err,
        RoutineServiceError::Conflict {
            expected: 1,
            actual: 2
        }
    ));

    let stored = service.get_daily_routine("u1", may_first()).unwrap();
    assert_eq!(stored.day.content, "competing write");
    assert_eq!(stored.version, 2);
}

#[test]
fn persisted_edit_matches_returned_record() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());

    let returned = service
        .edit_daily_routine(&edit(SlotContents::new("gym", "", "read")))
        .unwrap();
    let fetched = service.get_daily_routine("u1", may_first()).unwrap();
    assert_eq!(fetched, returned);
}

#[test]
fn unchanged_edit_still_writes_a_new_version() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());

    let once = service
        .edit_daily_routine(&edit(SlotContents::new("run", "work", "rest")))
        .unwrap();
    let twice = service
        .edit_daily_routine(&edit(SlotContents::new("run", "work", "rest")))
        .unwrap();
    assert_eq!(once.contents(), twice.contents());
    assert_eq!(twice.version, once.version + 1);
}

#[test]
fn mark_slot_locks_slot_and_preserves_terminal_status() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());

    let marked = service
        .mark_slot(&mark(SlotKind::Day, SlotStatus::Submitted))
        .unwrap();
    assert_eq!(marked.day.status, SlotStatus::Submitted);
    assert!(!marked.day.is_editable());

    let again = service
        .mark_slot(&mark(SlotKind::Day, SlotStatus::Completed))
        .unwrap_err();
    assert!(matches!(
        again,
        RoutineServiceError::LockedSlot { ref slots } if slots == &vec![SlotKind::Day]
    ));

    let stored = service.get_daily_routine("u1", may_first()).unwrap();
    assert_eq!(stored.day.status, SlotStatus::Submitted);
}

#[test]
fn mark_slot_requires_terminal_status() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());

    let err = service
        .mark_slot(&mark(SlotKind::Evening, SlotStatus::Pending))
        .unwrap_err();
    assert!(matches!(
        err,
        RoutineServiceError::Validation(RoutineValidationError::NotTerminal(SlotKind::Evening))
    ));
    assert_eq!(err.http_status(), 400);
}

#[test]
fn create_twice_for_same_day_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());

    let err = service
        .create_daily_routine("u1", may_first(), &SlotContents::default())
        .unwrap_err();
    assert!(matches!(err, RoutineServiceError::AlreadyExists { .. }));
    assert_eq!(err.error_code(), "routine_exists");
}

#[test]
fn invalid_user_id_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let service = RoutineService::new(SqliteRoutineRepository::try_new(&conn).unwrap());

    let err = service
        .get_daily_routine("../etc", may_first())
        .unwrap_err();
    assert!(matches!(
        err,
        RoutineServiceError::Validation(RoutineValidationError::InvalidUserId(_))
    ));
}

#[test]
fn list_returns_only_requested_user() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, EditPolicy::default());
    service
        .create_daily_routine("u2", may_first(), &SlotContents::default())
        .unwrap();

    let listed = service
        .list_daily_routines(&RoutineListQuery {
            user_id: "u1".to_string(),
            ..RoutineListQuery::default()
        })
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_id, "u1");
}

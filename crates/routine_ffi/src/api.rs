//! FFI use-case API for the mobile edit surface.
//!
//! # Responsibility
//! - Expose routine, journal and mood use-cases to Dart via FRB.
//! - Flatten core errors into envelopes with REST-style status and codes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every routine response carries `http_status` and, on failure, a stable
//!   `error_code` the UI can branch on.

use chrono::NaiveDate;
use routine_core::db::open_db;
use routine_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    parse_routine_date, ping as ping_inner, DailyRoutineRecord, EditPolicy, EditRoutineRequest,
    EntryServiceError, JournalEntry, JournalService, MarkSlotRequest, MoodLevel, MoodService,
    RepoError, RoutineService, RoutineServiceError, RoutineSlot, SlotContents, SlotKind,
    SlotStatus, SqliteKeyValueStore, SqliteRoutineRepository,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::OnceLock;

const ROUTINE_DB_FILE_NAME: &str = "routine_core.sqlite3";
static ROUTINE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Slot as rendered by the edit screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub content: String,
    /// `pending|submitted|completed|missed`.
    pub status: String,
    /// Whether the text input for this slot should be enabled.
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineView {
    pub routine_id: String,
    pub user_id: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub morning: SlotView,
    pub day: SlotView,
    pub evening: SlotView,
    /// Send back as `expected_version` on the next edit.
    pub version: i64,
}

/// Response envelope for routine calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineResponse {
    pub ok: bool,
    /// REST-equivalent status (200/201 on success, 400/404/409/500 on failure).
    pub http_status: u16,
    pub error_code: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
    pub routine: Option<RoutineView>,
}

impl RoutineResponse {
    fn success(http_status: u16, message: impl Into<String>, record: &DailyRoutineRecord) -> Self {
        Self {
            ok: true,
            http_status,
            error_code: None,
            message: message.into(),
            routine: Some(to_routine_view(record)),
        }
    }

    fn failure(operation: &str, err: &RoutineServiceError) -> Self {
        Self {
            ok: false,
            http_status: err.http_status(),
            error_code: Some(err.error_code().to_string()),
            message: format!("{operation} failed: {err}"),
            routine: None,
        }
    }

    fn from_result(
        operation: &str,
        http_status: u16,
        message: &str,
        result: Result<DailyRoutineRecord, RoutineServiceError>,
    ) -> Self {
        match result {
            Ok(record) => Self::success(http_status, message, &record),
            Err(err) => Self::failure(operation, &err),
        }
    }
}

/// Generic action response envelope for journal and mood writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryActionResponse {
    pub ok: bool,
    /// Created entry ID when the action creates one.
    pub entry_id: Option<String>,
    pub message: String,
}

impl EntryActionResponse {
    fn success(message: impl Into<String>, entry_id: Option<String>) -> Self {
        Self {
            ok: true,
            entry_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            entry_id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalItem {
    pub entry_id: String,
    pub date: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalListResponse {
    pub items: Vec<JournalItem>,
    pub message: String,
}

/// Establishes a day's plan with every slot pending.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `date` must be `YYYY-MM-DD`.
/// - Returns 201 on success and 409 (`routine_exists`) for a taken day.
#[flutter_rust_bridge::frb(sync)]
pub fn routine_create(
    user_id: String,
    date: String,
    morning: String,
    day: String,
    evening: String,
) -> RoutineResponse {
    let plan = SlotContents::new(morning, day, evening);
    let result = parse_date(&date).and_then(|date| {
        with_routine_service(|service| service.create_daily_routine(user_id.trim(), date, &plan))
    });
    RoutineResponse::from_result("routine_create", 201, "Routine created.", result)
}

/// Loads one day's routine for the edit screen.
#[flutter_rust_bridge::frb(sync)]
pub fn routine_get(user_id: String, date: String) -> RoutineResponse {
    let result = parse_date(&date).and_then(|date| {
        with_routine_service(|service| service.get_daily_routine(user_id.trim(), date))
    });
    RoutineResponse::from_result("routine_get", 200, "Routine loaded.", result)
}

/// Submits an edit intent from the edit screen.
///
/// `payload_json` must carry `morning`, `day` and `evening`, each as text
/// or as `{"content": text, ...}`. Text for locked slots is ignored, or
/// rejected with 409 `slot_locked` when strict edits are enabled through
/// `ROUTINE_STRICT_EDITS`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - 400 for malformed payloads, 404 for a missing day, 409 when
///   `expected_version` is stale.
#[flutter_rust_bridge::frb(sync)]
pub fn routine_edit(
    user_id: String,
    date: String,
    payload_json: String,
    expected_version: Option<i64>,
) -> RoutineResponse {
    let result = parse_date(&date).and_then(|date| {
        let proposed =
            SlotContents::from_json_str(&payload_json).map_err(RoutineServiceError::from)?;
        let request = EditRoutineRequest {
            user_id: user_id.trim().to_string(),
            date,
            proposed,
            expected_version,
        };
        with_routine_service(|service| service.edit_daily_routine(&request))
    });
    RoutineResponse::from_result("routine_edit", 200, "Routine updated successfully.", result)
}

/// Moves one pending slot to `submitted|completed|missed`.
#[flutter_rust_bridge::frb(sync)]
pub fn routine_mark_slot(
    user_id: String,
    date: String,
    slot: String,
    status: String,
    expected_version: Option<i64>,
) -> RoutineResponse {
    let Some(slot_kind) = SlotKind::parse(&slot) else {
        return invalid_argument("routine_mark_slot", format!("unknown slot `{slot}`"));
    };
    let Some(slot_status) = SlotStatus::parse(&status) else {
        return invalid_argument("routine_mark_slot", format!("unknown status `{status}`"));
    };

    let result = parse_date(&date).and_then(|date| {
        let request = MarkSlotRequest {
            user_id: user_id.trim().to_string(),
            date,
            slot: slot_kind,
            status: slot_status,
            expected_version,
        };
        with_routine_service(|service| service.mark_slot(&request))
    });
    RoutineResponse::from_result("routine_mark_slot", 200, "Slot status updated.", result)
}

/// Adds a journal entry for a date.
#[flutter_rust_bridge::frb(sync)]
pub fn journal_add(
    user_id: String,
    date: String,
    title: String,
    body: String,
) -> EntryActionResponse {
    let Ok(date) = parse_routine_date(&date) else {
        return EntryActionResponse::failure(format!("journal_add failed: invalid date `{date}`"));
    };
    match with_entry_store(|store| {
        JournalService::new(store).add_entry(user_id.trim(), date, &title, &body)
    }) {
        Ok(entry) => {
            EntryActionResponse::success("Journal entry saved.", Some(entry.uuid.to_string()))
        }
        Err(err) => EntryActionResponse::failure(format!("journal_add failed: {err}")),
    }
}

/// Lists journal entries for one date.
#[flutter_rust_bridge::frb(sync)]
pub fn journal_list_for_date(user_id: String, date: String) -> JournalListResponse {
    let Ok(parsed) = parse_routine_date(&date) else {
        return JournalListResponse {
            items: Vec::new(),
            message: format!("journal_list_for_date failed: invalid date `{date}`"),
        };
    };
    match with_entry_store(|store| {
        JournalService::new(store).entries_for_date(user_id.trim(), parsed)
    }) {
        Ok(entries) => {
            let items = entries.into_iter().map(to_journal_item).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No journal entries.".to_string()
            } else {
                format!("Found {} entr(ies).", items.len())
            };
            JournalListResponse { items, message }
        }
        Err(err) => JournalListResponse {
            items: Vec::new(),
            message: format!("journal_list_for_date failed: {err}"),
        },
    }
}

/// Records the day's mood, replacing an earlier check-in for that date.
#[flutter_rust_bridge::frb(sync)]
pub fn mood_check_in(
    user_id: String,
    date: String,
    mood: String,
    note: Option<String>,
) -> EntryActionResponse {
    let Ok(date) = parse_routine_date(&date) else {
        return EntryActionResponse::failure(format!(
            "mood_check_in failed: invalid date `{date}`"
        ));
    };
    let Some(level) = MoodLevel::parse(&mood) else {
        return EntryActionResponse::failure(format!(
            "mood_check_in failed: unknown mood `{mood}`"
        ));
    };
    match with_entry_store(|store| {
        MoodService::new(store).record_check_in(user_id.trim(), date, level, note.as_deref())
    }) {
        Ok(_) => EntryActionResponse::success("Mood recorded.", None),
        Err(err) => EntryActionResponse::failure(format!("mood_check_in failed: {err}")),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, RoutineServiceError> {
    parse_routine_date(raw).map_err(RoutineServiceError::from)
}

fn invalid_argument(operation: &str, message: String) -> RoutineResponse {
    RoutineResponse {
        ok: false,
        http_status: 400,
        error_code: Some("invalid_edit".to_string()),
        message: format!("{operation} failed: {message}"),
        routine: None,
    }
}

fn resolve_routine_db_path() -> PathBuf {
    ROUTINE_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("ROUTINE_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(ROUTINE_DB_FILE_NAME)
        })
        .clone()
}

fn resolve_edit_policy() -> EditPolicy {
    let strict = std::env::var("ROUTINE_STRICT_EDITS")
        .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    EditPolicy {
        strict_locked_slot_edits: strict,
    }
}

fn open_routine_db() -> Result<Connection, RepoError> {
    open_db(resolve_routine_db_path()).map_err(|err| {
        log::error!("event=ffi_db_open module=ffi status=error error={err}");
        RepoError::from(err)
    })
}

fn with_routine_service(
    f: impl FnOnce(
        &RoutineService<SqliteRoutineRepository<'_>>,
    ) -> Result<DailyRoutineRecord, RoutineServiceError>,
) -> Result<DailyRoutineRecord, RoutineServiceError> {
    let conn = open_routine_db()?;
    let repo = SqliteRoutineRepository::try_new(&conn)?;
    let service = RoutineService::with_policy(repo, resolve_edit_policy());
    f(&service)
}

fn with_entry_store<T>(
    f: impl FnOnce(SqliteKeyValueStore<'_>) -> Result<T, EntryServiceError>,
) -> Result<T, EntryServiceError> {
    let conn = open_routine_db()?;
    let store = SqliteKeyValueStore::try_new(&conn)?;
    f(store)
}

fn to_routine_view(record: &DailyRoutineRecord) -> RoutineView {
    RoutineView {
        routine_id: record.uuid.to_string(),
        user_id: record.user_id.clone(),
        date: record.date.to_string(),
        morning: to_slot_view(&record.morning),
        day: to_slot_view(&record.day),
        evening: to_slot_view(&record.evening),
        version: record.version,
    }
}

fn to_slot_view(slot: &RoutineSlot) -> SlotView {
    SlotView {
        content: slot.content.clone(),
        status: slot.status.as_str().to_string(),
        editable: slot.is_editable(),
    }
}

fn to_journal_item(entry: JournalEntry) -> JournalItem {
    JournalItem {
        entry_id: entry.uuid.to_string(),
        date: entry.date.to_string(),
        title: entry.title,
        body: entry.body,
    }
}

//! Daily routine domain model.
//!
//! # Responsibility
//! - Define the routine record, its three slots and their statuses.
//! - Provide the single per-slot edit rule used by every slot.
//! - Parse client edit payloads into validated slot contents.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another record.
//! - `user_id` matches `[A-Za-z0-9_-]{1,64}`.
//! - `version` starts at 1 and only grows.
//! - A slot whose status is not `pending` never changes content through an edit.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static USER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid user id regex"));

/// Stable identifier for one routine record.
pub type RoutineId = Uuid;

/// Wire/storage format for routine dates.
pub const ROUTINE_DATE_FORMAT: &str = "%Y-%m-%d";

/// One of the three daily routine slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Morning,
    Day,
    Evening,
}

impl SlotKind {
    /// All slots in display order.
    pub const ALL: [SlotKind; 3] = [SlotKind::Morning, SlotKind::Day, SlotKind::Evening];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Day => "day",
            Self::Evening => "evening",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(Self::Morning),
            "day" => Some(Self::Day),
            "evening" => Some(Self::Evening),
            _ => None,
        }
    }
}

impl Display for SlotKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot lifecycle state.
///
/// `Pending` is the only editable state. Every other variant is terminal
/// and is reached through an explicit status transition, never an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Open for edits. Older mobile builds send this as `pending..`.
    #[serde(alias = "pending..")]
    Pending,
    /// Plan was submitted for the slot.
    Submitted,
    /// Plan was carried out.
    Completed,
    /// Slot passed without the plan being carried out.
    Missed,
}

impl SlotStatus {
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }

    pub fn is_terminal(self) -> bool {
        !self.is_pending()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Completed => "completed",
            Self::Missed => "missed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "pending.." => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            "completed" => Some(Self::Completed),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }
}

impl Display for SlotStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content and status for one slot of a daily routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineSlot {
    /// User-authored plan text.
    pub content: String,
    pub status: SlotStatus,
}

impl RoutineSlot {
    /// Creates an open slot with the given plan text.
    pub fn pending(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: SlotStatus::Pending,
        }
    }

    /// Returns whether user edits may change this slot.
    pub fn is_editable(&self) -> bool {
        self.status.is_pending()
    }

    /// Applies one edit proposal to this slot.
    ///
    /// Pending slots take the proposed text and stay pending. Locked slots
    /// come back unchanged whatever the proposal says.
    pub fn apply_proposed(&self, proposed: &str) -> Self {
        if self.is_editable() {
            Self::pending(proposed)
        } else {
            self.clone()
        }
    }

    /// Returns whether `proposed` would try to change a locked slot.
    ///
    /// Re-sending the current text of a locked slot is not a change.
    pub fn rejects(&self, proposed: &str) -> bool {
        !self.is_editable() && self.content != proposed
    }
}

/// Plan text for all three slots.
///
/// Used both as the initial plan for a new record and as an edit proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotContents {
    pub morning: String,
    pub day: String,
    pub evening: String,
}

impl SlotContents {
    pub fn new(
        morning: impl Into<String>,
        day: impl Into<String>,
        evening: impl Into<String>,
    ) -> Self {
        Self {
            morning: morning.into(),
            day: day.into(),
            evening: evening.into(),
        }
    }

    pub fn get(&self, kind: SlotKind) -> &str {
        match kind {
            SlotKind::Morning => &self.morning,
            SlotKind::Day => &self.day,
            SlotKind::Evening => &self.evening,
        }
    }

    pub fn get_mut(&mut self, kind: SlotKind) -> &mut String {
        match kind {
            SlotKind::Morning => &mut self.morning,
            SlotKind::Day => &mut self.day,
            SlotKind::Evening => &mut self.evening,
        }
    }

    /// Parses an edit payload from JSON text.
    ///
    /// See [`SlotContents::from_json`] for the accepted shapes.
    pub fn from_json_str(raw: &str) -> Result<Self, RoutineValidationError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| RoutineValidationError::InvalidPayload(err.to_string()))?;
        Self::from_json(&value)
    }

    /// Parses an edit payload, requiring every slot key.
    ///
    /// Each slot accepts either plain text (`"morning": "run"`) or the
    /// mobile client object shape (`"morning": {"content": "run", "status": ...}`).
    /// A client-sent `status` is ignored; statuses are always recomputed.
    pub fn from_json(value: &Value) -> Result<Self, RoutineValidationError> {
        let object = value.as_object().ok_or_else(|| {
            RoutineValidationError::InvalidPayload("edit payload must be a JSON object".to_string())
        })?;

        let mut contents = Self::default();
        for kind in SlotKind::ALL {
            let raw = object
                .get(kind.as_str())
                .ok_or(RoutineValidationError::MissingSlot(kind))?;
            let text = match raw {
                Value::String(text) => text.clone(),
                Value::Object(fields) => match fields.get("content") {
                    Some(Value::String(text)) => text.clone(),
                    _ => return Err(RoutineValidationError::InvalidSlotValue(kind)),
                },
                _ => return Err(RoutineValidationError::InvalidSlotValue(kind)),
            };
            *contents.get_mut(kind) = text;
        }

        Ok(contents)
    }
}

/// One user's plan for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoutineRecordWire")]
pub struct DailyRoutineRecord {
    /// Stable record ID used for auditing and storage identity.
    pub uuid: RoutineId,
    /// Owning identity from the user domain.
    pub user_id: String,
    /// Calendar date, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub morning: RoutineSlot,
    pub day: RoutineSlot,
    pub evening: RoutineSlot,
    /// Optimistic concurrency revision. Bumped by every persisted write.
    pub version: i64,
}

impl DailyRoutineRecord {
    /// Creates a version-1 record with every slot pending.
    pub fn new(
        user_id: impl Into<String>,
        date: NaiveDate,
        plan: &SlotContents,
    ) -> Result<Self, RoutineValidationError> {
        Self::with_id(Uuid::new_v4(), user_id, date, plan)
    }

    /// Creates a version-1 record with a caller-provided stable ID.
    pub fn with_id(
        uuid: RoutineId,
        user_id: impl Into<String>,
        date: NaiveDate,
        plan: &SlotContents,
    ) -> Result<Self, RoutineValidationError> {
        let record = Self {
            uuid,
            user_id: user_id.into(),
            date,
            morning: RoutineSlot::pending(plan.morning.as_str()),
            day: RoutineSlot::pending(plan.day.as_str()),
            evening: RoutineSlot::pending(plan.evening.as_str()),
            version: 1,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn slot(&self, kind: SlotKind) -> &RoutineSlot {
        match kind {
            SlotKind::Morning => &self.morning,
            SlotKind::Day => &self.day,
            SlotKind::Evening => &self.evening,
        }
    }

    pub fn slot_mut(&mut self, kind: SlotKind) -> &mut RoutineSlot {
        match kind {
            SlotKind::Morning => &mut self.morning,
            SlotKind::Day => &mut self.day,
            SlotKind::Evening => &mut self.evening,
        }
    }

    /// Slots a proposal would try to change while they are locked.
    pub fn locked_changes(&self, proposed: &SlotContents) -> Vec<SlotKind> {
        SlotKind::ALL
            .into_iter()
            .filter(|kind| self.slot(*kind).rejects(proposed.get(*kind)))
            .collect()
    }

    /// Current slot text as an edit proposal.
    pub fn contents(&self) -> SlotContents {
        SlotContents::new(
            self.morning.content.as_str(),
            self.day.content.as_str(),
            self.evening.content.as_str(),
        )
    }

    /// Validates record invariants that do not depend on storage.
    pub fn validate(&self) -> Result<(), RoutineValidationError> {
        if self.uuid.is_nil() {
            return Err(RoutineValidationError::NilUuid);
        }
        validate_user_id(&self.user_id)?;
        if self.version < 1 {
            return Err(RoutineValidationError::InvalidVersion(self.version));
        }
        Ok(())
    }
}

/// Checks an owning user identity.
pub fn validate_user_id(user_id: &str) -> Result<(), RoutineValidationError> {
    if USER_ID_RE.is_match(user_id) {
        Ok(())
    } else {
        Err(RoutineValidationError::InvalidUserId(user_id.to_string()))
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_routine_date(value: &str) -> Result<NaiveDate, RoutineValidationError> {
    NaiveDate::parse_from_str(value.trim(), ROUTINE_DATE_FORMAT)
        .map_err(|_| RoutineValidationError::InvalidDate(value.to_string()))
}

/// Validation failures for routine records and edit payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutineValidationError {
    NilUuid,
    InvalidUserId(String),
    InvalidDate(String),
    InvalidVersion(i64),
    /// Edit payload has no key for this slot.
    MissingSlot(SlotKind),
    /// Slot value is neither text nor an object with text `content`.
    InvalidSlotValue(SlotKind),
    /// Payload is not a JSON object or is not JSON at all.
    InvalidPayload(String),
    /// A status transition must target a terminal status.
    NotTerminal(SlotKind),
}

impl Display for RoutineValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "routine uuid must not be nil"),
            Self::InvalidUserId(value) => write!(
                f,
                "invalid user id `{value}`; expected 1-64 chars of [A-Za-z0-9_-]"
            ),
            Self::InvalidDate(value) => {
                write!(f, "invalid routine date `{value}`; expected YYYY-MM-DD")
            }
            Self::InvalidVersion(value) => write!(f, "routine version must be >= 1, got {value}"),
            Self::MissingSlot(kind) => write!(f, "edit payload is missing slot `{kind}`"),
            Self::InvalidSlotValue(kind) => {
                write!(f, "edit payload slot `{kind}` must be text or {{\"content\": text}}")
            }
            Self::InvalidPayload(message) => write!(f, "invalid edit payload: {message}"),
            Self::NotTerminal(kind) => {
                write!(f, "slot `{kind}` can only move to a terminal status")
            }
        }
    }
}

impl Error for RoutineValidationError {}

#[derive(Deserialize)]
struct RoutineRecordWire {
    uuid: RoutineId,
    user_id: String,
    date: NaiveDate,
    morning: RoutineSlot,
    day: RoutineSlot,
    evening: RoutineSlot,
    version: i64,
}

impl TryFrom<RoutineRecordWire> for DailyRoutineRecord {
    type Error = RoutineValidationError;

    fn try_from(wire: RoutineRecordWire) -> Result<Self, Self::Error> {
        let record = Self {
            uuid: wire.uuid,
            user_id: wire.user_id,
            date: wire.date,
            morning: wire.morning,
            day: wire.day,
            evening: wire.evening,
            version: wire.version,
        };
        record.validate()?;
        Ok(record)
    }
}

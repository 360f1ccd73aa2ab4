//! Core domain logic for daily routines, journals and mood check-ins.
//! This crate is the single source of truth for routine slot invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, EditPolicy};
pub use logging::{default_log_level, init_logging, init_logging_from_config};
pub use model::routine::{
    parse_routine_date, DailyRoutineRecord, RoutineId, RoutineSlot, RoutineValidationError,
    SlotContents, SlotKind, SlotStatus,
};
pub use repo::kv_repo::{KeyValueStore, SqliteKeyValueStore};
pub use repo::routine_repo::{
    RepoError, RepoResult, RoutineListQuery, RoutineRepository, SqliteRoutineRepository,
};
pub use service::journal_service::{JournalDay, JournalEntry, JournalService};
pub use service::mood_service::{MoodCheckIn, MoodLevel, MoodService};
pub use service::routine_service::{
    apply_edit, EditRoutineRequest, MarkSlotRequest, RoutineService, RoutineServiceError,
    RoutineServiceResult,
};
pub use service::{EntryResult, EntryServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

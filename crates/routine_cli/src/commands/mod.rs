//! Subcommand implementations and shared CLI plumbing.

pub mod journal;
pub mod routine;

use chrono::{Local, NaiveDate};
use routine_core::db::open_db;
use routine_core::{
    init_logging_from_config, parse_routine_date, CoreConfig, JournalService, RoutineService,
    RoutineValidationError, SqliteKeyValueStore, SqliteRoutineRepository,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

const DB_FILE_NAME: &str = "routine_core.sqlite3";

/// Resolved configuration for one CLI invocation.
pub struct CliContext {
    pub config: CoreConfig,
    pub db_path: PathBuf,
}

impl CliContext {
    /// Loads config, starts logging when `[logging] dir` is set and picks the DB file.
    pub fn load(db: Option<PathBuf>, config_path: Option<PathBuf>) -> CliResult<Self> {
        let config = match config_path {
            Some(path) => CoreConfig::load(path)?,
            None => CoreConfig::default(),
        };
        init_logging_from_config(&config.logging)?;
        let db_path = resolve_db_path(db, std::env::var("ROUTINE_DB_PATH").ok(), &config);
        Ok(Self { config, db_path })
    }

    pub fn with_routine_service<T>(
        &self,
        f: impl FnOnce(&RoutineService<SqliteRoutineRepository<'_>>) -> CliResult<T>,
    ) -> CliResult<T> {
        let conn = open_db(&self.db_path)?;
        let repo = SqliteRoutineRepository::try_new(&conn)?;
        let service = RoutineService::with_policy(repo, self.config.edit);
        f(&service)
    }

    pub fn with_journal_service<T>(
        &self,
        f: impl FnOnce(&JournalService<SqliteKeyValueStore<'_>>) -> CliResult<T>,
    ) -> CliResult<T> {
        let conn = open_db(&self.db_path)?;
        let store = SqliteKeyValueStore::try_new(&conn)?;
        f(&JournalService::new(store))
    }
}

/// Precedence: `--db`, then `ROUTINE_DB_PATH`, then `[storage] db_path`,
/// then a file in the temp directory.
fn resolve_db_path(flag: Option<PathBuf>, env: Option<String>, config: &CoreConfig) -> PathBuf {
    flag.or_else(|| {
        env.map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
    })
    .or_else(|| config.storage.db_path.clone())
    .unwrap_or_else(|| std::env::temp_dir().join(DB_FILE_NAME))
}

/// Parses `YYYY-MM-DD`, or returns the local date when absent.
pub fn date_or_today(raw: Option<&str>) -> Result<NaiveDate, RoutineValidationError> {
    match raw {
        Some(raw) => parse_routine_date(raw),
        None => Ok(Local::now().date_naive()),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

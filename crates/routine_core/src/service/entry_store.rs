//! Per-user JSON collections stored in a `KeyValueStore`.
//!
//! Journal entries and mood check-ins each live under one key per user
//! (`<namespace>:<user_id>`) as a JSON array.

use crate::model::routine::{validate_user_id, RoutineValidationError};
use crate::repo::kv_repo::KeyValueStore;
use crate::repo::routine_repo::RepoError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Error for journal and mood use-cases.
#[derive(Debug)]
pub enum EntryServiceError {
    Validation(RoutineValidationError),
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// `from` is after `to`.
    InvalidRange,
    EntryNotFound(Uuid),
    /// Stored collection is not valid JSON for its type.
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
    Repo(RepoError),
}

impl Display for EntryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidRange => write!(f, "date range start must not be after its end"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::Corrupt { key, source } => {
                write!(f, "stored collection `{key}` is corrupt: {source}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EntryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Corrupt { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EntryServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<RoutineValidationError> for EntryServiceError {
    fn from(value: RoutineValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type EntryResult<T> = Result<T, EntryServiceError>;

pub(crate) fn collection_key(namespace: &str, user_id: &str) -> EntryResult<String> {
    validate_user_id(user_id)?;
    Ok(format!("{namespace}:{user_id}"))
}

pub(crate) fn load_collection<T: DeserializeOwned>(
    store: &impl KeyValueStore,
    key: &str,
) -> EntryResult<Vec<T>> {
    decode_collection(key, store.get(key)?.as_deref())
}

/// Loads the collection, applies `change` and stores the result in one
/// atomic update. Nothing is written when `change` fails.
pub(crate) fn modify_collection<T, R>(
    store: &impl KeyValueStore,
    key: &str,
    change: impl FnOnce(&mut Vec<T>) -> EntryResult<R>,
) -> EntryResult<R>
where
    T: Serialize + DeserializeOwned,
{
    store.update(key, |raw| {
        let mut items: Vec<T> = decode_collection(key, raw.as_deref())?;
        let output = change(&mut items)?;
        let encoded = serde_json::to_string(&items).map_err(|source| corrupt(key, source))?;
        Ok((encoded, output))
    })
}

fn decode_collection<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> EntryResult<Vec<T>> {
    match raw {
        Some(raw) => serde_json::from_str(raw).map_err(|source| corrupt(key, source)),
        None => Ok(Vec::new()),
    }
}

fn corrupt(key: &str, source: serde_json::Error) -> EntryServiceError {
    EntryServiceError::Corrupt {
        key: key.to_string(),
        source,
    }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> EntryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EntryServiceError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

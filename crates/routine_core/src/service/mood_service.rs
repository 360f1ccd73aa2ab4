//! Mood check-in use-case service.
//!
//! # Invariants
//! - At most one check-in per user and date; recording again replaces it.
//! - Range queries are inclusive and ordered by date.

use crate::repo::kv_repo::KeyValueStore;
use crate::service::entry_store::{
    collection_key, load_collection, modify_collection, EntryResult, EntryServiceError,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const MOOD_NAMESPACE: &str = "mood";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodLevel {
    Great,
    Good,
    Okay,
    Low,
    Bad,
}

impl MoodLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Good => "good",
            Self::Okay => "okay",
            Self::Low => "low",
            Self::Bad => "bad",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "great" => Some(Self::Great),
            "good" => Some(Self::Good),
            "okay" | "ok" => Some(Self::Okay),
            "low" => Some(Self::Low),
            "bad" => Some(Self::Bad),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodCheckIn {
    pub date: NaiveDate,
    pub mood: MoodLevel,
    pub note: Option<String>,
    /// Unix epoch milliseconds of the latest recording.
    pub recorded_at_ms: i64,
}

pub struct MoodService<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> MoodService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records the mood for `date`, replacing an earlier check-in that day.
    pub fn record_check_in(
        &self,
        user_id: &str,
        date: NaiveDate,
        mood: MoodLevel,
        note: Option<&str>,
    ) -> EntryResult<MoodCheckIn> {
        let key = collection_key(MOOD_NAMESPACE, user_id)?;
        let check_in = MoodCheckIn {
            date,
            mood,
            note: note
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            recorded_at_ms: Utc::now().timestamp_millis(),
        };

        modify_collection(&self.store, &key, |check_ins: &mut Vec<MoodCheckIn>| {
            check_ins.retain(|existing| existing.date != date);
            check_ins.push(check_in.clone());
            check_ins.sort_by_key(|existing| existing.date);
            Ok(())
        })?;
        Ok(check_in)
    }

    pub fn check_ins_between(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EntryResult<Vec<MoodCheckIn>> {
        if from > to {
            return Err(EntryServiceError::InvalidRange);
        }
        let key = collection_key(MOOD_NAMESPACE, user_id)?;
        let mut check_ins: Vec<MoodCheckIn> = load_collection(&self.store, &key)?;
        check_ins.retain(|check_in| check_in.date >= from && check_in.date <= to);
        check_ins.sort_by_key(|check_in| check_in.date);
        Ok(check_ins)
    }
}

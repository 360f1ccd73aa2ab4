//! Journal use-case service.
//!
//! # Responsibility
//! - Add, update, delete and list a user's journal entries.
//! - Build the seven-day strip shown above the journal list.
//!
//! # Invariants
//! - Entries for one user live under `journal:<user_id>`.
//! - Entry titles are trimmed and never blank.
//! - Per-date listings are ordered by creation time.

use crate::repo::kv_repo::KeyValueStore;
use crate::service::entry_store::{
    collection_key, load_collection, modify_collection, require_text, EntryResult,
    EntryServiceError,
};
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const JOURNAL_NAMESPACE: &str = "journal";
const WEEK_STRIP_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub uuid: Uuid,
    pub date: NaiveDate,
    pub title: String,
    pub body: String,
    /// Unix epoch milliseconds.
    pub created_at_ms: i64,
}

/// One day in the journal week strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JournalDay {
    pub date: NaiveDate,
    pub entry_count: usize,
    pub is_today: bool,
}

pub struct JournalService<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> JournalService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn add_entry(
        &self,
        user_id: &str,
        date: NaiveDate,
        title: &str,
        body: &str,
    ) -> EntryResult<JournalEntry> {
        let key = collection_key(JOURNAL_NAMESPACE, user_id)?;
        let entry = JournalEntry {
            uuid: Uuid::new_v4(),
            date,
            title: require_text("title", title)?,
            body: body.to_string(),
            created_at_ms: Utc::now().timestamp_millis(),
        };

        modify_collection(&self.store, &key, |entries: &mut Vec<JournalEntry>| {
            entries.push(entry.clone());
            Ok(())
        })?;
        Ok(entry)
    }

    /// Replaces title and body of an existing entry. Date and identity stay.
    pub fn update_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        title: &str,
        body: &str,
    ) -> EntryResult<JournalEntry> {
        let key = collection_key(JOURNAL_NAMESPACE, user_id)?;
        let title = require_text("title", title)?;
        modify_collection(&self.store, &key, |entries: &mut Vec<JournalEntry>| {
            let entry = entries
                .iter_mut()
                .find(|entry| entry.uuid == entry_id)
                .ok_or(EntryServiceError::EntryNotFound(entry_id))?;
            entry.title = title;
            entry.body = body.to_string();
            Ok(entry.clone())
        })
    }

    pub fn delete_entry(&self, user_id: &str, entry_id: Uuid) -> EntryResult<()> {
        let key = collection_key(JOURNAL_NAMESPACE, user_id)?;
        modify_collection(&self.store, &key, |entries: &mut Vec<JournalEntry>| {
            let before = entries.len();
            entries.retain(|entry| entry.uuid != entry_id);
            if entries.len() == before {
                return Err(EntryServiceError::EntryNotFound(entry_id));
            }
            Ok(())
        })
    }

    pub fn entries_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> EntryResult<Vec<JournalEntry>> {
        let key = collection_key(JOURNAL_NAMESPACE, user_id)?;
        let mut entries: Vec<JournalEntry> = load_collection(&self.store, &key)?;
        entries.retain(|entry| entry.date == date);
        entries.sort_by_key(|entry| entry.created_at_ms);
        Ok(entries)
    }

    /// Past six days plus `today`, oldest first, with entry counts.
    ///
    /// Fails with `InvalidRange` when the window would start before the
    /// earliest representable date.
    pub fn week_strip(&self, user_id: &str, today: NaiveDate) -> EntryResult<Vec<JournalDay>> {
        let key = collection_key(JOURNAL_NAMESPACE, user_id)?;
        let entries: Vec<JournalEntry> = load_collection(&self.store, &key)?;
        (0..WEEK_STRIP_DAYS)
            .rev()
            .map(|offset| {
                let date = today
                    .checked_sub_days(Days::new(offset))
                    .ok_or(EntryServiceError::InvalidRange)?;
                Ok(JournalDay {
                    date,
                    entry_count: entries.iter().filter(|entry| entry.date == date).count(),
                    is_today: offset == 0,
                })
            })
            .collect()
    }
}

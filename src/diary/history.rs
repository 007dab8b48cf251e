use crate::diary::clock::TimeContext;
use crate::diary::config::QueryMode;
use crate::diary::entry::Entry;
use crate::diary::store::{EntryStore, RawRecords};
use crate::diary::warn;
use crate::error::DiaryError;

/// Entries of one day, oldest first.
#[derive(Debug, Clone)]
pub struct DayContext {
    pub date_key: String,
    pub display_date: String,
    pub entries: Vec<Entry>,
}

pub struct HistoryReader<'a> {
    store: &'a dyn EntryStore,
    query_mode: QueryMode,
}

impl<'a> HistoryReader<'a> {
    pub fn new(store: &'a dyn EntryStore, query_mode: QueryMode) -> Self {
        Self { store, query_mode }
    }

    pub fn day(&self, time: &TimeContext) -> DayContext {
        DayContext {
            date_key: time.date_key.clone(),
            display_date: time.display_date.clone(),
            entries: self.fetch(&time.date_key),
        }
    }

    /// Never fails: a broken store reads as an empty day.
    pub fn fetch(&self, date_key: &str) -> Vec<Entry> {
        match self.try_fetch(date_key) {
            Ok(entries) => entries,
            Err(err) => {
                warn::emit(warn::WarnEvent {
                    code: err.code(),
                    stage: "history",
                    action: "fetch-day",
                    date: date_key,
                    source: &self.store.label(),
                    retry: "treat-as-empty",
                    reason: "store-read-failed",
                    err: &err.to_string(),
                });
                Vec::new()
            }
        }
    }

    pub fn try_fetch(&self, date_key: &str) -> Result<Vec<Entry>, DiaryError> {
        let raw = match self.query_mode {
            QueryMode::Server => match self.store.query_equal("dateKey", date_key) {
                Ok(raw) => raw,
                Err(err) => {
                    warn::emit(warn::WarnEvent {
                        code: err.code(),
                        stage: "history",
                        action: "server-query",
                        date: date_key,
                        source: &self.store.label(),
                        retry: "client-scan",
                        reason: "server-filter-rejected",
                        err: &err.to_string(),
                    });
                    self.store.read_all()?
                }
            },
            QueryMode::Client => self.store.read_all()?,
        };
        Ok(select_day(raw, date_key))
    }
}

/// Parse, keep only `date_key`, and order by timestamp. Server-filtered
/// results go through the same filter since the index may be stale.
pub fn select_day(raw: RawRecords, date_key: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    for (id, value) in raw {
        match Entry::from_value(&id, value) {
            Ok(entry) if entry.date_key == date_key => entries.push(entry),
            Ok(_) => {}
            Err(err) => warn::emit(warn::WarnEvent {
                code: err.code(),
                stage: "history",
                action: "parse-record",
                date: date_key,
                source: &id,
                retry: "skip-record",
                reason: "malformed-record",
                err: &err.to_string(),
            }),
        }
    }
    // Stable sort keeps store-key order for equal (or missing) timestamps.
    entries.sort_by_key(|e| e.timestamp_ms);
    entries
}

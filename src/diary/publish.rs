use crate::diary::config::{PublishMode, QueryMode};
use crate::diary::entry::Entry;
use crate::diary::history::HistoryReader;
use crate::diary::store::EntryStore;
use crate::diary::warn;
use crate::error::DiaryErrorCode;

#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub entry: Entry,
    pub skip_if_duplicate: bool,
    pub mode: PublishMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Written { id: String },
    SkippedDuplicate { existing_id: String },
    Failed { reason: String },
}

impl PublishOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PublishOutcome::Written { .. } => "written",
            PublishOutcome::SkippedDuplicate { .. } => "skipped_duplicate",
            PublishOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PublishOutcome::Failed { .. })
    }
}

pub struct Publisher<'a> {
    store: &'a dyn EntryStore,
    query_mode: QueryMode,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn EntryStore, query_mode: QueryMode) -> Self {
        Self { store, query_mode }
    }

    /// Single write, no retry. The duplicate check and the write are two
    /// separate requests, so concurrent runs can both pass the check.
    pub fn publish(&self, request: &PublishRequest) -> PublishOutcome {
        let entry = &request.entry;

        if request.skip_if_duplicate
            && let Some(existing_id) = self.find_same_author(entry)
        {
            return PublishOutcome::SkippedDuplicate { existing_id };
        }

        let record = entry.to_record();
        let written = match request.mode {
            PublishMode::Append => self.store.append(&record),
            PublishMode::OverwriteDay => self
                .store
                .put(&entry.date_key, &record)
                .map(|()| entry.date_key.clone()),
        };

        match written {
            Ok(id) => PublishOutcome::Written { id },
            Err(err) => {
                warn::emit(warn::WarnEvent {
                    code: DiaryErrorCode::E005PublishFailed,
                    stage: "publish",
                    action: request.mode.label(),
                    date: &entry.date_key,
                    source: &self.store.label(),
                    retry: "none",
                    reason: err.code().as_str(),
                    err: &err.to_string(),
                });
                PublishOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn find_same_author(&self, entry: &Entry) -> Option<String> {
        let today = HistoryReader::new(self.store, self.query_mode).fetch(&entry.date_key);
        same_author_entry(&today, &entry.author)
    }
}

/// Store id of the first entry in `entries` written by `author`. Records
/// written by overwrite-day carry no push id and answer with their date key.
pub fn same_author_entry(entries: &[Entry], author: &str) -> Option<String> {
    entries
        .iter()
        .find(|existing| existing.author == author)
        .map(|existing| existing.id.clone().unwrap_or_else(|| existing.date_key.clone()))
}

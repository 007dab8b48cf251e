use crate::diary::entry::Entry;
use crate::diary::sanitize::truncate_with_marker;

pub const NO_HISTORY_SNIPPET: &str = "No entries yet today.";
pub const SNIPPET_SEPARATOR: &str = " / ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub count: usize,
    pub snippet: String,
}

impl Digest {
    pub fn has_history(&self) -> bool {
        self.count > 0
    }
}

/// Bounds how much of the day's log reaches the prompt.
#[derive(Debug, Clone, Copy)]
pub struct Summarizer {
    pub max_entries: usize,
    pub entry_chars: usize,
}

impl Summarizer {
    pub fn new(max_entries: usize, entry_chars: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entry_chars,
        }
    }

    /// Upper bound on `Digest::snippet` length in chars for non-empty input.
    pub fn max_snippet_chars(&self) -> usize {
        self.max_entries * self.entry_chars
            + (self.max_entries - 1) * SNIPPET_SEPARATOR.chars().count()
    }

    fn recent<'e>(&self, entries: &'e [Entry]) -> &'e [Entry] {
        let start = entries.len().saturating_sub(self.max_entries);
        &entries[start..]
    }

    fn line(&self, entry: &Entry) -> String {
        let content = collapse_whitespace(&entry.content);
        let line = format!("{}: {}", entry.author.trim(), content);
        truncate_with_marker(&line, self.entry_chars)
    }

    pub fn summarize(&self, entries: &[Entry]) -> Digest {
        if entries.is_empty() {
            return Digest {
                count: 0,
                snippet: NO_HISTORY_SNIPPET.to_string(),
            };
        }
        let lines: Vec<String> = self.recent(entries).iter().map(|e| self.line(e)).collect();
        let snippet = lines.join(SNIPPET_SEPARATOR);
        debug_assert!(snippet.chars().count() <= self.max_snippet_chars());
        Digest {
            count: entries.len(),
            snippet,
        }
    }

    /// One recent line chosen with the caller's RNG, for quoting.
    pub fn excerpt(&self, entries: &[Entry], rng: &mut fastrand::Rng) -> Option<String> {
        let recent = self.recent(entries);
        if recent.is_empty() {
            return None;
        }
        let entry = &recent[rng.usize(..recent.len())];
        let content = truncate_with_marker(&collapse_whitespace(&entry.content), self.entry_chars);
        if content.is_empty() { None } else { Some(content) }
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

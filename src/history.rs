//! Size-capped browse history.
//!
//! Entries are keyed by path: revisiting a page refreshes its entry and moves
//! it to the front. The list serializes to JSON so a caller can persist it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default cap on retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Note,
    Post,
    User,
    Category,
    Search,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub kind: PageKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub path: String,
    pub visited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

/// A page visit to record; id and timestamp are assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub kind: PageKind,
    pub title: String,
    pub description: Option<String>,
    pub path: String,
    pub params: Map<String, Value>,
}

impl Visit {
    pub fn new(kind: PageKind, title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
            path: path.into(),
            params: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewHistory {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
    #[serde(skip)]
    sequence: u64,
}

impl Default for ViewHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl ViewHistory {
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
            sequence: 0,
        }
    }

    /// Changes the cap, dropping the oldest entries if needed.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        self.entries.truncate(self.max_entries);
    }

    /// Restores a history from its JSON form.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let mut history: Self = serde_json::from_str(raw)?;
        history.set_max_entries(history.max_entries);
        Ok(history)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn record(&mut self, visit: Visit) {
        self.record_at(visit, Utc::now());
    }

    /// Records a visit at `now`, replacing any entry with the same path.
    pub fn record_at(&mut self, visit: Visit, now: DateTime<Utc>) {
        let entry = match self.entries.iter().position(|entry| entry.path == visit.path) {
            Some(index) => {
                let mut existing = self.entries.remove(index);
                existing.kind = visit.kind;
                existing.title = visit.title;
                existing.description = visit.description.or(existing.description);
                existing.params.extend(visit.params);
                existing.visited_at = now;
                existing
            }
            None => HistoryEntry {
                id: self.next_id(now),
                kind: visit.kind,
                title: visit.title,
                description: visit.description,
                path: visit.path,
                visited_at: now,
                params: visit.params,
            },
        };

        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
    }

    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        self.sequence += 1;
        format!("{}{:04}", now.timestamp_millis(), self.sequence)
    }

    /// Newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn recent(&self, count: usize) -> &[HistoryEntry] {
        &self.entries[..count.min(self.entries.len())]
    }

    pub fn by_kind(&self, kind: PageKind) -> Vec<&HistoryEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .collect()
    }

    /// Case-insensitive match against title and description.
    pub fn search(&self, keyword: &str) -> Vec<&HistoryEntry> {
        let keyword = keyword.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                entry.title.to_lowercase().contains(&keyword)
                    || entry
                        .description
                        .as_deref()
                        .is_some_and(|description| description.to_lowercase().contains(&keyword))
            })
            .collect()
    }

    /// Returns whether an entry was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
